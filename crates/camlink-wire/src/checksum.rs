//! Firmware checksum variants used at the two framing layers.
//!
//! Both are reflected CRCs seeded with 0x3AA3 and no output XOR. These are
//! protocol constants recovered from captured traffic, not a generic CRC
//! choice — `crc32fast` and friends cannot express the non-standard seed, so
//! the loops live here where the parameters are auditable.

/// Register seed shared by both checksum widths.
pub const CHECKSUM_INIT: u16 = 0x3AA3;

const POLY16: u16 = 0xA001; // reversed 0x8005
const POLY32: u32 = 0xEDB8_8320; // reversed 0x04C11DB7

/// 16-bit header checksum.
///
/// Zero-length input yields the seed value.
pub fn checksum16(data: &[u8]) -> u16 {
    let mut crc = CHECKSUM_INIT;
    for &byte in data {
        crc ^= u16::from(byte);
        for _ in 0..8 {
            crc = if crc & 1 != 0 {
                (crc >> 1) ^ POLY16
            } else {
                crc >> 1
            };
        }
    }
    crc
}

/// 32-bit whole-frame checksum.
///
/// Zero-length input yields the seed value.
pub fn checksum32(data: &[u8]) -> u32 {
    let mut crc = u32::from(CHECKSUM_INIT);
    for &byte in data {
        crc ^= u32::from(byte);
        for _ in 0..8 {
            crc = if crc & 1 != 0 {
                (crc >> 1) ^ POLY32
            } else {
                crc >> 1
            };
        }
    }
    crc
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_yields_seed() {
        assert_eq!(checksum16(&[]), 0x3AA3);
        assert_eq!(checksum32(&[]), 0x0000_3AA3);
    }

    #[test]
    fn deterministic() {
        let data = b"camlink";
        assert_eq!(checksum16(data), checksum16(data));
        assert_eq!(checksum32(data), checksum32(data));
    }

    #[test]
    fn single_bit_flip_changes_value() {
        let mut data = b"status frame payload".to_vec();
        let c16 = checksum16(&data);
        let c32 = checksum32(&data);
        for byte in 0..data.len() {
            for bit in 0..8 {
                data[byte] ^= 1 << bit;
                assert_ne!(checksum16(&data), c16, "crc16 missed flip at {byte}:{bit}");
                assert_ne!(checksum32(&data), c32, "crc32 missed flip at {byte}:{bit}");
                data[byte] ^= 1 << bit;
            }
        }
    }

    #[test]
    fn length_extension_changes_value() {
        let short = checksum16(b"ab");
        let long = checksum16(b"ab\0");
        assert_ne!(short, long);
    }

    #[test]
    fn matches_table_driven_reference() {
        // Cross-check the bitwise loops against the classic table formulation
        // used by the firmware.
        fn table16() -> [u16; 256] {
            let mut table = [0u16; 256];
            let mut i = 0;
            while i < 256 {
                let mut crc = i as u16;
                let mut bit = 0;
                while bit < 8 {
                    crc = if crc & 1 != 0 {
                        (crc >> 1) ^ POLY16
                    } else {
                        crc >> 1
                    };
                    bit += 1;
                }
                table[i] = crc;
                i += 1;
            }
            table
        }

        let table = table16();
        let data = b"\xAA\x1A\x00\x21\x00\x00\x00\x00\x07\x00";
        let mut crc = CHECKSUM_INIT;
        for &b in data.iter() {
            let idx = ((crc ^ u16::from(b)) & 0xFF) as usize;
            crc = table[idx] ^ (crc >> 8);
        }
        assert_eq!(checksum16(data), crc);
    }
}

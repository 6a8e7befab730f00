use bytes::{BufMut, Bytes, BytesMut};

use crate::checksum::{checksum16, checksum32};
use crate::error::{ChecksumRegion, Result, WireError};

/// Start-of-frame marker.
pub const MAGIC: u8 = 0xAA;

/// Fixed header size: SOF (1) + ver/length (2) + cmd-type (1) + enc (1) +
/// reserved (3) + sequence (2) + header CRC16 (2).
pub const HEADER_SIZE: usize = 12;

/// Offset of the commandSet byte (start of the data region).
pub const DATA_OFFSET: usize = HEADER_SIZE;

/// Smallest valid frame: header + commandSet + commandId + frame CRC32.
pub const MIN_FRAME_SIZE: usize = HEADER_SIZE + 2 + 4;

/// The length field is 10 bits wide; the upper 6 bits carry the protocol
/// version (currently 0).
const LENGTH_MASK: u16 = 0x03FF;

/// Maximum payload the length field can express.
pub const MAX_PAYLOAD: usize = LENGTH_MASK as usize - MIN_FRAME_SIZE;

/// Cmd-type bit 5 distinguishes replies from requests/pushes.
const REPLY_FLAG: u8 = 0x20;

/// Cmd-type bits 4..0: acknowledgement requested but not mandatory.
const ACK_REQUESTED: u8 = 0x01;

/// One checksummed, length-delimited unit of the wire protocol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Functional domain selector.
    pub command_set: u8,
    /// Operation selector within the set.
    pub command_id: u8,
    /// Per-request identifier used to match replies to requests.
    pub sequence: u16,
    /// True for replies, false for requests and unsolicited pushes.
    pub is_reply: bool,
    /// Command payload.
    pub payload: Bytes,
}

impl Frame {
    /// Create a request frame.
    pub fn request(command_set: u8, command_id: u8, sequence: u16, payload: impl Into<Bytes>) -> Self {
        Self {
            command_set,
            command_id,
            sequence,
            is_reply: false,
            payload: payload.into(),
        }
    }

    /// Create a reply frame (used to acknowledge camera-initiated requests).
    pub fn reply(command_set: u8, command_id: u8, sequence: u16, payload: impl Into<Bytes>) -> Self {
        Self {
            command_set,
            command_id,
            sequence,
            is_reply: true,
            payload: payload.into(),
        }
    }

    /// The total wire size of this frame.
    pub fn wire_size(&self) -> usize {
        MIN_FRAME_SIZE + self.payload.len()
    }
}

/// Encode a frame into the wire format.
///
/// Wire format (all multi-byte fields little-endian):
/// ```text
/// ┌──────┬────────────┬─────────┬─────┬─────────┬─────┬───────┬────────┬────────┬─────────┬───────┐
/// │ 0xAA │ ver/length │ cmdType │ enc │ reserved│ seq │ CRC16 │ cmdSet │ cmdId  │ payload │ CRC32 │
/// │ (1B) │ (2B)       │ (1B)    │ (1B)│ (3B)    │ (2B)│ (2B)  │ (1B)   │ (1B)   │ (nB)    │ (4B)  │
/// └──────┴────────────┴─────────┴─────┴─────────┴─────┴───────┴────────┴────────┴─────────┴───────┘
/// ```
/// CRC16 covers the first 10 bytes; CRC32 covers everything before itself.
pub fn encode_frame(frame: &Frame, dst: &mut BytesMut) -> Result<()> {
    if frame.payload.len() > MAX_PAYLOAD {
        return Err(WireError::PayloadTooLarge {
            size: frame.payload.len(),
            max: MAX_PAYLOAD,
        });
    }

    let total = frame.wire_size();
    dst.reserve(total);
    let start = dst.len();

    dst.put_u8(MAGIC);
    dst.put_u16_le(total as u16 & LENGTH_MASK); // version bits stay 0
    let mut cmd_type = ACK_REQUESTED;
    if frame.is_reply {
        cmd_type |= REPLY_FLAG;
    }
    dst.put_u8(cmd_type);
    dst.put_u8(0); // not encrypted
    dst.put_slice(&[0, 0, 0]); // reserved
    dst.put_u16_le(frame.sequence);

    let header_crc = checksum16(&dst[start..start + 10]);
    dst.put_u16_le(header_crc);

    dst.put_u8(frame.command_set);
    dst.put_u8(frame.command_id);
    dst.put_slice(&frame.payload);

    let frame_crc = checksum32(&dst[start..start + total - 4]);
    dst.put_u32_le(frame_crc);

    Ok(())
}

/// Decode one frame from the start of a byte window.
///
/// Returns `Ok(None)` when the window does not yet hold a complete frame
/// (non-fatal; feed more bytes and retry). On success returns the frame and
/// the number of bytes consumed. Pure over the input slice — the caller owns
/// buffer advancement.
pub fn decode_frame(src: &[u8]) -> Result<Option<(Frame, usize)>> {
    if src.is_empty() {
        return Ok(None);
    }
    if src[0] != MAGIC {
        return Err(WireError::BadMagic);
    }
    if src.len() < 3 {
        return Ok(None);
    }

    let ver_length = u16::from_le_bytes([src[1], src[2]]);
    let length = usize::from(ver_length & LENGTH_MASK);
    if length < MIN_FRAME_SIZE {
        return Err(WireError::BadLength(length));
    }
    if src.len() < length {
        return Ok(None);
    }

    let header_computed = checksum16(&src[..10]);
    let header_received = u16::from_le_bytes([src[10], src[11]]);
    if header_computed != header_received {
        return Err(WireError::ChecksumMismatch {
            region: ChecksumRegion::Header,
            computed: u32::from(header_computed),
            received: u32::from(header_received),
        });
    }

    let crc_offset = length - 4;
    let frame_computed = checksum32(&src[..crc_offset]);
    let frame_received = u32::from_le_bytes([
        src[crc_offset],
        src[crc_offset + 1],
        src[crc_offset + 2],
        src[crc_offset + 3],
    ]);
    if frame_computed != frame_received {
        return Err(WireError::ChecksumMismatch {
            region: ChecksumRegion::Frame,
            computed: frame_computed,
            received: frame_received,
        });
    }

    let cmd_type = src[3];
    let frame = Frame {
        command_set: src[DATA_OFFSET],
        command_id: src[DATA_OFFSET + 1],
        sequence: u16::from_le_bytes([src[8], src[9]]),
        is_reply: cmd_type & REPLY_FLAG != 0,
        payload: Bytes::copy_from_slice(&src[DATA_OFFSET + 2..crc_offset]),
    };

    Ok(Some((frame, length)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(frame: &Frame) -> BytesMut {
        let mut buf = BytesMut::new();
        encode_frame(frame, &mut buf).unwrap();
        buf
    }

    #[test]
    fn roundtrip() {
        let frame = Frame::request(0x1D, 0x04, 7, Bytes::from_static(b"\x01\x02\x03"));
        let wire = encode(&frame);
        assert_eq!(wire.len(), frame.wire_size());

        let (decoded, consumed) = decode_frame(&wire).unwrap().unwrap();
        assert_eq!(consumed, wire.len());
        assert_eq!(decoded, frame);
    }

    #[test]
    fn roundtrip_reply_with_empty_payload() {
        let frame = Frame::reply(0x00, 0x19, 0xBEEF, Bytes::new());
        let wire = encode(&frame);
        assert_eq!(wire.len(), MIN_FRAME_SIZE);

        let (decoded, _) = decode_frame(&wire).unwrap().unwrap();
        assert!(decoded.is_reply);
        assert!(decoded.payload.is_empty());
        assert_eq!(decoded.sequence, 0xBEEF);
    }

    #[test]
    fn incomplete_header_and_payload() {
        let frame = Frame::request(1, 2, 3, Bytes::from_static(b"abcdef"));
        let wire = encode(&frame);

        for cut in 0..wire.len() {
            let result = decode_frame(&wire[..cut]).unwrap();
            assert!(result.is_none(), "cut at {cut} should be incomplete");
        }
    }

    #[test]
    fn bad_magic() {
        let err = decode_frame(&[0x55, 0x10, 0x00]).unwrap_err();
        assert!(matches!(err, WireError::BadMagic));
    }

    #[test]
    fn undersized_declared_length() {
        // Length field claims 4 bytes, below the fixed minimum.
        let err = decode_frame(&[MAGIC, 0x04, 0x00]).unwrap_err();
        assert!(matches!(err, WireError::BadLength(4)));
    }

    #[test]
    fn header_corruption_detected() {
        let frame = Frame::request(0x1D, 0x03, 1, Bytes::from_static(b"\x00"));
        let mut wire = encode(&frame);
        wire[8] ^= 0x01; // sequence byte inside the CRC16 region

        let err = decode_frame(&wire).unwrap_err();
        assert!(matches!(
            err,
            WireError::ChecksumMismatch {
                region: ChecksumRegion::Header,
                ..
            }
        ));
    }

    #[test]
    fn payload_corruption_detected() {
        let frame = Frame::request(0x1D, 0x03, 1, Bytes::from_static(b"\x00\x01\x02"));
        let mut wire = encode(&frame);
        let idx = DATA_OFFSET + 2;
        wire[idx] ^= 0x80;

        let err = decode_frame(&wire).unwrap_err();
        assert!(matches!(
            err,
            WireError::ChecksumMismatch {
                region: ChecksumRegion::Frame,
                ..
            }
        ));
    }

    #[test]
    fn any_single_bit_flip_outside_checksums_is_detected() {
        let frame = Frame::request(0x00, 0x17, 42, Bytes::from_static(b"gps-data"));
        let wire = encode(&frame);
        let crc32_start = wire.len() - 4;

        for byte in 0..wire.len() {
            // Flips confined to the checksum fields may re-derive a valid
            // pair; everything else must fail decode.
            if (10..12).contains(&byte) || byte >= crc32_start {
                continue;
            }
            for bit in 0..8 {
                let mut corrupted = wire.to_vec();
                corrupted[byte] ^= 1 << bit;
                let result = decode_frame(&corrupted);
                assert!(
                    !matches!(result, Ok(Some(_))),
                    "flip at {byte}:{bit} went undetected"
                );
            }
        }
    }

    #[test]
    fn consumed_count_allows_back_to_back_frames() {
        let first = Frame::request(1, 1, 1, Bytes::from_static(b"one"));
        let second = Frame::request(2, 2, 2, Bytes::from_static(b"two"));
        let mut wire = encode(&first);
        encode_frame(&second, &mut wire).unwrap();

        let (f1, used) = decode_frame(&wire).unwrap().unwrap();
        assert_eq!(f1, first);
        let (f2, _) = decode_frame(&wire[used..]).unwrap().unwrap();
        assert_eq!(f2, second);
    }

    #[test]
    fn oversized_payload_rejected_at_encode() {
        let frame = Frame::request(1, 1, 1, vec![0u8; MAX_PAYLOAD + 1]);
        let mut buf = BytesMut::new();
        let err = encode_frame(&frame, &mut buf).unwrap_err();
        assert!(matches!(err, WireError::PayloadTooLarge { .. }));
    }
}

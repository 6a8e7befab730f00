//! Pairing exchange run once after the link comes up.
//!
//! The controller sends a pairing request carrying its identity and a
//! random verify code; the camera replies with the device id used in every
//! later command, then pushes a connection request that the controller must
//! acknowledge before the session is usable.

use std::time::Duration;

use bytes::{BufMut, Bytes, BytesMut};
use rand::Rng;

use crate::error::{Result, SessionError};

/// Pairing request payload size.
const PAIRING_REQUEST_SIZE: usize = 33;

/// Identity field width inside the pairing request.
const IDENTITY_SIZE: usize = 16;

/// Smallest pairing reply: device id plus result code.
const PAIRING_REPLY_MIN: usize = 5;

/// Smallest connection-request push the camera sends back.
const CONNECTION_REQUEST_MIN: usize = 29;

/// Verify mode the camera reports when the exchange needs no on-screen
/// confirmation.
const VERIFY_MODE_PAIRED: u8 = 2;

/// Parameters of the pairing exchange.
#[derive(Debug, Clone)]
pub struct HandshakeConfig {
    /// Upper bound on the whole exchange, reply and push included.
    pub timeout: Duration,
    /// Controller id presented to the camera.
    pub controller_id: u32,
    /// True when this controller has never paired with the camera before.
    pub first_pairing: bool,
}

impl Default for HandshakeConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            controller_id: 0x0102_0304,
            first_pairing: false,
        }
    }
}

/// Build the pairing request payload.
///
/// `identity` is the controller's hardware address as a hex string
/// (`AA:BB:CC:DD:EE:FF`, `-` separators also accepted). The six address
/// bytes are padded to a 16-byte identity field.
pub fn pairing_request(config: &HandshakeConfig, identity: &str) -> Result<Bytes> {
    let address = parse_identity(identity)?;
    let verify_code: u16 = rand::thread_rng().gen_range(0..=9999);

    let mut buf = BytesMut::with_capacity(PAIRING_REQUEST_SIZE);
    buf.put_u32_le(config.controller_id);
    buf.put_u8(6); // address length
    buf.put_slice(&address);
    buf.put_slice(&[0; IDENTITY_SIZE - 6]);
    buf.put_u32_le(0);
    buf.put_u8(0);
    buf.put_u8(u8::from(config.first_pairing));
    buf.put_u16_le(verify_code);
    buf.put_slice(&[0; 4]);

    debug_assert_eq!(buf.len(), PAIRING_REQUEST_SIZE);
    Ok(buf.freeze())
}

fn parse_identity(identity: &str) -> Result<[u8; 6]> {
    let mut address = [0u8; 6];
    let mut count = 0;
    for part in identity.split(|c| c == ':' || c == '-') {
        if count == 6 {
            count += 1;
            break;
        }
        address[count] = u8::from_str_radix(part, 16).map_err(|_| {
            SessionError::HandshakeFailed(format!("bad identity byte {part:?} in {identity:?}"))
        })?;
        count += 1;
    }
    if count != 6 {
        return Err(SessionError::HandshakeFailed(format!(
            "identity {identity:?} does not hold 6 address bytes"
        )));
    }
    Ok(address)
}

/// The camera's answer to the pairing request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PairingReply {
    /// Device id to place in every later command payload.
    pub device_id: u32,
    /// Zero on success.
    pub result: u8,
}

impl PairingReply {
    pub fn parse(payload: &[u8]) -> Result<Self> {
        if payload.len() < PAIRING_REPLY_MIN {
            return Err(SessionError::ShortReply {
                expected: PAIRING_REPLY_MIN,
                actual: payload.len(),
            });
        }
        Ok(Self {
            device_id: u32::from_le_bytes([payload[0], payload[1], payload[2], payload[3]]),
            result: payload[4],
        })
    }

    pub fn check(self) -> Result<Self> {
        if self.result != 0 {
            return Err(SessionError::HandshakeFailed(format!(
                "camera refused pairing (code {:#04x})",
                self.result
            )));
        }
        Ok(self)
    }
}

/// The connection request the camera pushes after a successful pairing
/// reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionRequest {
    /// 2 when the pairing is already confirmed; other values require
    /// on-screen interaction this library does not drive.
    pub verify_mode: u8,
    /// Zero on success.
    pub verify_result: u16,
}

impl ConnectionRequest {
    pub fn parse(payload: &[u8]) -> Result<Self> {
        if payload.len() < CONNECTION_REQUEST_MIN {
            return Err(SessionError::ShortReply {
                expected: CONNECTION_REQUEST_MIN,
                actual: payload.len(),
            });
        }
        Ok(Self {
            verify_mode: payload[26],
            verify_result: u16::from_le_bytes([payload[27], payload[28]]),
        })
    }

    pub fn check(self) -> Result<Self> {
        if self.verify_mode != VERIFY_MODE_PAIRED {
            return Err(SessionError::HandshakeFailed(format!(
                "unsupported verify mode {}",
                self.verify_mode
            )));
        }
        if self.verify_result != 0 {
            return Err(SessionError::HandshakeFailed(format!(
                "camera reported verify result {:#06x}",
                self.verify_result
            )));
        }
        Ok(self)
    }
}

/// Payload acknowledging the camera's connection request. Sent as a reply
/// frame reusing the push's sequence number.
pub fn pairing_ack(device_id: u32) -> Bytes {
    let mut buf = BytesMut::with_capacity(9);
    buf.put_u32_le(device_id);
    buf.put_u8(0);
    buf.put_slice(&[0; 4]);
    buf.freeze()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pairing_request_layout() {
        let config = HandshakeConfig {
            first_pairing: true,
            ..HandshakeConfig::default()
        };
        let payload = pairing_request(&config, "AA:BB:CC:DD:EE:FF").unwrap();

        assert_eq!(payload.len(), PAIRING_REQUEST_SIZE);
        assert_eq!(&payload[0..4], &[0x04, 0x03, 0x02, 0x01]);
        assert_eq!(payload[4], 6);
        assert_eq!(&payload[5..11], &[0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0xFF]);
        assert_eq!(&payload[11..21], &[0u8; 10]);
        assert_eq!(&payload[21..26], &[0u8; 5]);
        assert_eq!(payload[26], 1); // first pairing
        let verify = u16::from_le_bytes([payload[27], payload[28]]);
        assert!(verify <= 9999);
        assert_eq!(&payload[29..33], &[0u8; 4]);
    }

    #[test]
    fn identity_accepts_dash_separators() {
        let config = HandshakeConfig::default();
        let payload = pairing_request(&config, "01-02-03-04-05-06").unwrap();
        assert_eq!(&payload[5..11], &[1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn malformed_identity_is_rejected() {
        let config = HandshakeConfig::default();
        for bad in ["", "AA:BB", "AA:BB:CC:DD:EE:GG", "AA:BB:CC:DD:EE:FF:00"] {
            assert!(
                matches!(
                    pairing_request(&config, bad),
                    Err(SessionError::HandshakeFailed(_))
                ),
                "identity {bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn pairing_reply_parses_device_id() {
        let reply = PairingReply::parse(&[0x01, 0x00, 0xFE, 0xCA, 0x00]).unwrap();
        assert_eq!(reply.device_id, 0xCAFE_0001);
        assert_eq!(reply.result, 0);
        assert!(reply.check().is_ok());
    }

    #[test]
    fn pairing_reply_failure_code_surfaces() {
        let reply = PairingReply::parse(&[0, 0, 0, 0, 0x09]).unwrap();
        assert!(matches!(
            reply.check(),
            Err(SessionError::HandshakeFailed(_))
        ));
    }

    #[test]
    fn short_pairing_reply_is_rejected() {
        assert!(matches!(
            PairingReply::parse(&[0x01, 0x02]),
            Err(SessionError::ShortReply { .. })
        ));
    }

    #[test]
    fn connection_request_fields() {
        let mut payload = vec![0u8; CONNECTION_REQUEST_MIN];
        payload[26] = VERIFY_MODE_PAIRED;
        let request = ConnectionRequest::parse(&payload).unwrap();
        assert_eq!(request.verify_mode, 2);
        assert_eq!(request.verify_result, 0);
        assert!(request.check().is_ok());
    }

    #[test]
    fn connection_request_unpaired_mode_fails() {
        let mut payload = vec![0u8; CONNECTION_REQUEST_MIN];
        payload[26] = 1; // needs on-screen confirmation
        let request = ConnectionRequest::parse(&payload).unwrap();
        assert!(matches!(
            request.check(),
            Err(SessionError::HandshakeFailed(_))
        ));
    }

    #[test]
    fn connection_request_verify_failure_fails() {
        let mut payload = vec![0u8; CONNECTION_REQUEST_MIN];
        payload[26] = VERIFY_MODE_PAIRED;
        payload[27..29].copy_from_slice(&7u16.to_le_bytes());
        let request = ConnectionRequest::parse(&payload).unwrap();
        assert!(matches!(
            request.check(),
            Err(SessionError::HandshakeFailed(_))
        ));
    }

    #[test]
    fn ack_layout() {
        let ack = pairing_ack(0xCAFE_0001);
        assert_eq!(
            ack.as_ref(),
            &[0x01, 0x00, 0xFE, 0xCA, 0x00, 0x00, 0x00, 0x00, 0x00]
        );
    }
}

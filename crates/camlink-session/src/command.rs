//! Command-set/command-id constants and payload builders.
//!
//! The two-level selector (set + id) and the payload layouts are protocol
//! constants recovered from captured traffic.

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{Result, SessionError};

/// Connection management and external data (pairing, GPS push).
pub const SET_CONNECTION: u8 = 0x00;
/// Camera operation (mode, record, status subscription).
pub const SET_CAMERA: u8 = 0x1D;

/// Pairing exchange, on [`SET_CONNECTION`].
pub const CMD_PAIR: u8 = 0x19;
/// GPS metadata push, on [`SET_CONNECTION`].
pub const CMD_GPS: u8 = 0x17;

/// Record/capture trigger, on [`SET_CAMERA`].
pub const CMD_RECORD: u8 = 0x03;
/// Mode change, on [`SET_CAMERA`].
pub const CMD_SET_MODE: u8 = 0x04;
/// Status push on/off switch, on [`SET_CAMERA`].
pub const CMD_STATUS_SWITCH: u8 = 0x05;
/// Unsolicited camera status push, on [`SET_CAMERA`].
pub const CMD_STATUS_PUSH: u8 = 0x02;

/// Operating modes supported by the camera.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CameraMode {
    PanoVideo,
    Hyperlapse,
    Selfie,
    PanoPhoto,
    BoostVideo,
    Vortex,
    PanoSuperNight,
    SingleLensSuperNight,
}

impl CameraMode {
    pub fn as_byte(self) -> u8 {
        match self {
            CameraMode::PanoVideo => 0x38,
            CameraMode::Hyperlapse => 0x3A,
            CameraMode::Selfie => 0x3C,
            CameraMode::PanoPhoto => 0x3F,
            CameraMode::BoostVideo => 0x41,
            CameraMode::Vortex => 0x43,
            CameraMode::PanoSuperNight => 0x44,
            CameraMode::SingleLensSuperNight => 0x4A,
        }
    }

    /// `None` for bytes outside the known mode set (newer firmware).
    pub fn from_byte(byte: u8) -> Option<Self> {
        Some(match byte {
            0x38 => CameraMode::PanoVideo,
            0x3A => CameraMode::Hyperlapse,
            0x3C => CameraMode::Selfie,
            0x3F => CameraMode::PanoPhoto,
            0x41 => CameraMode::BoostVideo,
            0x43 => CameraMode::Vortex,
            0x44 => CameraMode::PanoSuperNight,
            0x4A => CameraMode::SingleLensSuperNight,
            _ => return None,
        })
    }
}

/// Record-control actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordAction {
    Start = 0x00,
    Stop = 0x01,
}

/// Mode-change payload: device id, mode byte, 4 reserved bytes.
pub fn mode_payload(device_id: u32, mode: CameraMode) -> Bytes {
    let mut buf = BytesMut::with_capacity(9);
    buf.put_u32_le(device_id);
    buf.put_u8(mode.as_byte());
    buf.put_slice(&[0; 4]);
    buf.freeze()
}

/// Record/capture payload: device id, action byte, 4 reserved bytes.
pub fn record_payload(device_id: u32, action: RecordAction) -> Bytes {
    let mut buf = BytesMut::with_capacity(9);
    buf.put_u32_le(device_id);
    buf.put_u8(action as u8);
    buf.put_slice(&[0; 4]);
    buf.freeze()
}

/// Status-push switch payload: on/off flag, push kind 0x14, 4 reserved
/// bytes.
pub fn status_switch_payload(enable: bool) -> Bytes {
    let mut buf = BytesMut::with_capacity(6);
    buf.put_u8(if enable { 0x02 } else { 0x00 });
    buf.put_u8(0x14);
    buf.put_slice(&[0; 4]);
    buf.freeze()
}

/// Translate a reply payload's leading result code into success or a domain
/// error.
pub fn check_reply(payload: &[u8]) -> Result<()> {
    let code = *payload.first().ok_or(SessionError::ShortReply {
        expected: 1,
        actual: 0,
    })?;
    if code != 0 {
        return Err(SessionError::CommandRejected { code });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_bytes_roundtrip() {
        for mode in [
            CameraMode::PanoVideo,
            CameraMode::Hyperlapse,
            CameraMode::Selfie,
            CameraMode::PanoPhoto,
            CameraMode::BoostVideo,
            CameraMode::Vortex,
            CameraMode::PanoSuperNight,
            CameraMode::SingleLensSuperNight,
        ] {
            assert_eq!(CameraMode::from_byte(mode.as_byte()), Some(mode));
        }
        assert_eq!(CameraMode::from_byte(0x00), None);
    }

    #[test]
    fn mode_payload_layout() {
        let payload = mode_payload(0x0403_0201, CameraMode::PanoPhoto);
        assert_eq!(
            payload.as_ref(),
            &[0x01, 0x02, 0x03, 0x04, 0x3F, 0x00, 0x00, 0x00, 0x00]
        );
    }

    #[test]
    fn record_payload_layout() {
        let start = record_payload(1, RecordAction::Start);
        let stop = record_payload(1, RecordAction::Stop);
        assert_eq!(start[4], 0x00);
        assert_eq!(stop[4], 0x01);
        assert_eq!(start.len(), 9);
    }

    #[test]
    fn status_switch_layout() {
        assert_eq!(
            status_switch_payload(true).as_ref(),
            &[0x02, 0x14, 0x00, 0x00, 0x00, 0x00]
        );
        assert_eq!(
            status_switch_payload(false).as_ref(),
            &[0x00, 0x14, 0x00, 0x00, 0x00, 0x00]
        );
    }

    #[test]
    fn reply_codes() {
        assert!(check_reply(&[0x00, 0xFF]).is_ok());
        assert!(matches!(
            check_reply(&[0x05]),
            Err(SessionError::CommandRejected { code: 0x05 })
        ));
        assert!(matches!(
            check_reply(&[]),
            Err(SessionError::ShortReply { .. })
        ));
    }
}

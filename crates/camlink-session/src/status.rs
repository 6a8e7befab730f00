//! Decoding of the camera's unsolicited status push.
//!
//! Field offsets follow the firmware's status block. Every enumeration
//! keeps an `Unknown` fallback so a newer firmware value degrades to a
//! decodable status instead of a decode failure.

use crate::command::CameraMode;

/// Smallest status block the decoder accepts.
pub const STATUS_PAYLOAD_MIN: usize = 38;

/// What the camera screen is doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewStatus {
    ScreenOff,
    LiveStreaming,
    Playback,
    PhotoOrRecording,
    PreRecording,
    Unknown(u8),
}

impl ViewStatus {
    pub fn from_byte(byte: u8) -> Self {
        match byte {
            0x00 => ViewStatus::ScreenOff,
            0x01 => ViewStatus::LiveStreaming,
            0x02 => ViewStatus::Playback,
            0x03 => ViewStatus::PhotoOrRecording,
            0x05 => ViewStatus::PreRecording,
            other => ViewStatus::Unknown(other),
        }
    }
}

/// Video resolution index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VideoResolution {
    R1080p,
    R4k,
    R2k7,
    R1080p916,
    R2k743,
    R4k43,
    R4k916,
    UltraWide30Mp,
    Wide20Mp,
    Standard12Mp,
    Unknown(u8),
}

impl VideoResolution {
    pub fn from_byte(byte: u8) -> Self {
        match byte {
            10 => VideoResolution::R1080p,
            16 => VideoResolution::R4k,
            45 => VideoResolution::R2k7,
            66 => VideoResolution::R1080p916,
            95 => VideoResolution::R2k743,
            103 => VideoResolution::R4k43,
            109 => VideoResolution::R4k916,
            4 => VideoResolution::UltraWide30Mp,
            3 => VideoResolution::Wide20Mp,
            2 => VideoResolution::Standard12Mp,
            other => VideoResolution::Unknown(other),
        }
    }
}

/// Frame-rate index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FpsIndex {
    Fps24,
    Fps25,
    Fps30,
    Fps48,
    Fps50,
    Fps60,
    Fps100,
    Fps120,
    Fps200,
    Fps240,
    Unknown(u8),
}

impl FpsIndex {
    pub fn from_byte(byte: u8) -> Self {
        match byte {
            1 => FpsIndex::Fps24,
            2 => FpsIndex::Fps25,
            3 => FpsIndex::Fps30,
            4 => FpsIndex::Fps48,
            5 => FpsIndex::Fps50,
            6 => FpsIndex::Fps60,
            10 => FpsIndex::Fps100,
            7 => FpsIndex::Fps120,
            19 => FpsIndex::Fps200,
            8 => FpsIndex::Fps240,
            other => FpsIndex::Unknown(other),
        }
    }
}

/// Electronic image stabilization mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EisMode {
    Off,
    RockSteady,
    HorizonSteady,
    RockSteadyPlus,
    HorizonBalance,
    Unknown(u8),
}

impl EisMode {
    pub fn from_byte(byte: u8) -> Self {
        match byte {
            0 => EisMode::Off,
            1 => EisMode::RockSteady,
            2 => EisMode::HorizonSteady,
            3 => EisMode::RockSteadyPlus,
            4 => EisMode::HorizonBalance,
            other => EisMode::Unknown(other),
        }
    }
}

/// Photo aspect ratio.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhotoRatio {
    FourThree,
    SixteenNine,
    Unknown(u8),
}

impl PhotoRatio {
    pub fn from_byte(byte: u8) -> Self {
        match byte {
            0 => PhotoRatio::FourThree,
            1 => PhotoRatio::SixteenNine,
            other => PhotoRatio::Unknown(other),
        }
    }
}

/// Active user preset slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserMode {
    General,
    Custom1,
    Custom2,
    Custom3,
    Custom4,
    Custom5,
    Unknown(u8),
}

impl UserMode {
    pub fn from_byte(byte: u8) -> Self {
        match byte {
            0 => UserMode::General,
            1 => UserMode::Custom1,
            2 => UserMode::Custom2,
            3 => UserMode::Custom3,
            4 => UserMode::Custom4,
            5 => UserMode::Custom5,
            other => UserMode::Unknown(other),
        }
    }
}

/// Power state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerMode {
    Normal,
    Sleep,
    Unknown(u8),
}

impl PowerMode {
    pub fn from_byte(byte: u8) -> Self {
        match byte {
            0 => PowerMode::Normal,
            3 => PowerMode::Sleep,
            other => PowerMode::Unknown(other),
        }
    }
}

/// Thermal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThermalState {
    Normal,
    Warning,
    TooHigh,
    Overheat,
    Unknown(u8),
}

impl ThermalState {
    pub fn from_byte(byte: u8) -> Self {
        match byte {
            0 => ThermalState::Normal,
            1 => ThermalState::Warning,
            2 => ThermalState::TooHigh,
            3 => ThermalState::Overheat,
            other => ThermalState::Unknown(other),
        }
    }
}

/// Decoded camera status push.
#[derive(Debug, Clone, PartialEq)]
pub struct CameraStatus {
    /// `None` when the camera reports a mode byte this library does not
    /// know.
    pub mode: Option<CameraMode>,
    pub view: ViewStatus,
    pub resolution: VideoResolution,
    pub fps: FpsIndex,
    pub eis: EisMode,
    pub record_time_s: u16,
    pub photo_ratio: PhotoRatio,
    pub real_time_countdown: u16,
    pub timelapse_interval: u16,
    pub timelapse_duration: u16,
    pub remaining_capacity: u32,
    pub remaining_photos: u32,
    pub remaining_time_s: u32,
    pub user_mode: UserMode,
    pub power_mode: PowerMode,
    pub thermal: ThermalState,
    pub photo_countdown_ms: u32,
    pub loop_record_sends: u16,
    pub battery_percent: u8,
}

impl CameraStatus {
    /// Decode a status block. `None` for blocks shorter than
    /// [`STATUS_PAYLOAD_MIN`]; such pushes surface as raw events instead.
    pub fn decode(data: &[u8]) -> Option<Self> {
        if data.len() < STATUS_PAYLOAD_MIN {
            return None;
        }
        let u16_at = |at: usize| u16::from_le_bytes([data[at], data[at + 1]]);
        let u32_at =
            |at: usize| u32::from_le_bytes([data[at], data[at + 1], data[at + 2], data[at + 3]]);

        Some(Self {
            mode: CameraMode::from_byte(data[0]),
            view: ViewStatus::from_byte(data[1]),
            resolution: VideoResolution::from_byte(data[2]),
            fps: FpsIndex::from_byte(data[3]),
            eis: EisMode::from_byte(data[4]),
            record_time_s: u16_at(5),
            photo_ratio: PhotoRatio::from_byte(data[8]),
            real_time_countdown: u16_at(9),
            timelapse_interval: u16_at(11),
            timelapse_duration: u16_at(13),
            remaining_capacity: u32_at(15),
            remaining_photos: u32_at(19),
            remaining_time_s: u32_at(23),
            user_mode: UserMode::from_byte(data[28]),
            power_mode: PowerMode::from_byte(data[29]),
            thermal: ThermalState::from_byte(data[30]),
            photo_countdown_ms: u32_at(31),
            loop_record_sends: u16_at(35),
            battery_percent: data[37],
        })
    }
}

/// Build a status block with recognizable values at every offset.
#[cfg(test)]
pub(crate) fn sample_status_block() -> Vec<u8> {
    let mut data = vec![0u8; STATUS_PAYLOAD_MIN];
    data[0] = 0x3F; // PanoPhoto
    data[1] = 0x01; // LiveStreaming
    data[2] = 16; // 4K
    data[3] = 3; // 30 fps
    data[4] = 4; // HorizonBalance
    data[5..7].copy_from_slice(&120u16.to_le_bytes());
    data[8] = 0; // 4:3
    data[9..11].copy_from_slice(&5u16.to_le_bytes());
    data[11..13].copy_from_slice(&2u16.to_le_bytes());
    data[13..15].copy_from_slice(&60u16.to_le_bytes());
    data[15..19].copy_from_slice(&1_000_000u32.to_le_bytes());
    data[19..23].copy_from_slice(&250u32.to_le_bytes());
    data[23..27].copy_from_slice(&3_600u32.to_le_bytes());
    data[28] = 2; // Custom2
    data[29] = 0; // Normal power
    data[30] = 1; // thermal Warning
    data[31..35].copy_from_slice(&1_500u32.to_le_bytes());
    data[35..37].copy_from_slice(&4u16.to_le_bytes());
    data[37] = 87; // battery
    data
}

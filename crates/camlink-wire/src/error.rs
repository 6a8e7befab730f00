/// Errors that can occur during frame encoding/decoding.
///
/// "Not enough bytes yet" is not an error: decode reports it as `Ok(None)`
/// so the reassembler can keep buffering.
#[derive(Debug, thiserror::Error)]
pub enum WireError {
    /// The frame does not start with the 0xAA start-of-frame marker.
    #[error("invalid start-of-frame marker (expected 0xAA)")]
    BadMagic,

    /// The declared frame length is below the fixed minimum.
    #[error("declared frame length {0} below minimum {min}", min = crate::codec::MIN_FRAME_SIZE)]
    BadLength(usize),

    /// A recomputed checksum does not match the carried value.
    #[error("{region} checksum mismatch (computed {computed:#x}, received {received:#x})")]
    ChecksumMismatch {
        region: ChecksumRegion,
        computed: u32,
        received: u32,
    },

    /// The payload exceeds what the 10-bit length field can carry.
    #[error("payload too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// A GPS field is outside the encodable fixed-point range.
    #[error("GPS field out of range: {0}")]
    GpsOutOfRange(&'static str),

    /// A GPS payload has the wrong size.
    #[error("GPS payload must be {expected} bytes, got {actual}")]
    GpsPayloadSize { expected: usize, actual: usize },
}

/// Which checksummed region failed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChecksumRegion {
    Header,
    Frame,
}

impl std::fmt::Display for ChecksumRegion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChecksumRegion::Header => f.write_str("header"),
            ChecksumRegion::Frame => f.write_str("frame"),
        }
    }
}

pub type Result<T> = std::result::Result<T, WireError>;

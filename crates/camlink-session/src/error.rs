use std::time::Duration;

/// Errors that can occur in session operations.
///
/// Framing anomalies (incomplete frames, checksum failures) never appear
/// here — the reassembler recovers from them locally. What surfaces is
/// per-request failure, handshake failure, or loss of the whole link.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// No reply arrived within the configured window.
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// The request was abandoned because the session is being torn down.
    #[error("request cancelled")]
    Cancelled,

    /// The transport dropped; the session is unusable.
    #[error("transport closed")]
    TransportClosed,

    /// The camera answered with a non-zero result code.
    #[error("command rejected by camera (code {code:#04x})")]
    CommandRejected { code: u8 },

    /// A reply payload was too short to carry the expected fields.
    #[error("reply too short ({actual} bytes, expected at least {expected})")]
    ShortReply { expected: usize, actual: usize },

    /// The pairing exchange failed.
    #[error("handshake failed: {0}")]
    HandshakeFailed(String),

    /// Every sequence number has an unresolved request in flight.
    #[error("all sequence numbers in flight")]
    SequencesExhausted,

    /// Frame-level error while encoding an outbound request.
    #[error("wire error: {0}")]
    Wire(#[from] camlink_wire::WireError),

    /// Transport-level error.
    #[error("transport error: {0}")]
    Transport(#[from] camlink_transport::TransportError),
}

pub type Result<T> = std::result::Result<T, SessionError>;

//! Control-protocol engine for short-range wireless action cameras.
//!
//! camlink speaks the checksummed, sequence-correlated framing that DJI-style
//! action cameras use over their control link: connect through a transport,
//! pair, then drive the camera with typed commands and observe its status
//! pushes.
//!
//! # Crate Structure
//!
//! - [`transport`] — The byte-channel abstraction the engine runs over
//! - [`wire`] — Framing, checksums, GPS payloads, stream reassembly
//! - [`session`] — Pairing, request/reply correlation, and the camera facade

/// Re-export transport types.
pub mod transport {
    pub use camlink_transport::*;
}

/// Re-export wire types.
pub mod wire {
    pub use camlink_wire::*;
}

/// Re-export session types.
pub mod session {
    pub use camlink_session::*;
}

#[cfg(feature = "logging")]
pub mod logging;

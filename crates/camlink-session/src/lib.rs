//! Request/reply session layer over a camera control link.
//!
//! Builds on `camlink-wire` framing and a `camlink-transport` link to
//! provide what an application actually wants: connect once, call typed
//! camera commands, observe status pushes, and get per-request errors
//! instead of byte-level ones.
//!
//! The moving parts:
//!
//! - [`Correlator`] — sequence allocation and reply matching
//! - [`Router`] — splits inbound frames into replies and pushes
//! - [`Session`] — the facade tying transport, reader task, pairing, and
//!   commands together

pub mod command;
pub mod correlation;
pub mod error;
pub mod handshake;
pub mod router;
pub mod session;
pub mod status;

pub use command::{CameraMode, RecordAction};
pub use correlation::Correlator;
pub use error::{Result, SessionError};
pub use handshake::HandshakeConfig;
pub use router::{Router, StatusEvent, SubscriptionId};
pub use session::{Session, SessionConfig};
pub use status::CameraStatus;

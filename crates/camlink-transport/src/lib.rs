//! Transport boundary for the camera control link.
//!
//! The protocol core consumes an abstract byte channel: frame writes go
//! down, push notifications come up. Real links (BLE GATT write/notify
//! characteristics) live outside this workspace; the in-memory loopback
//! pair here exists for tests.

pub mod error;
pub mod loopback;
pub mod traits;

pub use error::{Result, TransportError};
pub use loopback::{pair, LoopbackPeer, LoopbackTransport};
pub use traits::{ControlTransport, TransportConfig};

use bytes::Bytes;
use tokio::sync::mpsc;

use crate::error::Result;

/// A bidirectional byte channel to the camera.
///
/// Discovery, pairing, and the underlying wireless characteristics are the
/// implementation's responsibility; the protocol core only writes encoded
/// frames and consumes push notifications. Notification fragments carry no
/// framing guarantees — a fragment may hold part of a frame or several
/// frames back to back.
#[async_trait::async_trait]
pub trait ControlTransport: Send + Sync + 'static {
    /// Write raw frame bytes to the camera.
    async fn write(&self, bytes: &[u8]) -> Result<()>;

    /// Take the notification stream.
    ///
    /// Callable once per connection; returns `None` if the stream was
    /// already taken. The stream ends when the link drops. Unbounded because
    /// the link pushes notifications with no backpressure mechanism.
    fn take_notifications(&self) -> Option<mpsc::UnboundedReceiver<Bytes>>;

    /// Close the link. Subsequent writes fail with
    /// [`TransportError::Closed`](crate::TransportError::Closed).
    async fn close(&self) -> Result<()>;
}

/// Opaque values handed to the transport during link establishment.
///
/// Neither field is interpreted by the protocol core.
#[derive(Debug, Clone, Default)]
pub struct TransportConfig {
    /// Substring filter applied to advertised device names during discovery.
    pub device_name: String,
    /// Local identity value presented to the camera while pairing.
    pub local_identity: String,
}

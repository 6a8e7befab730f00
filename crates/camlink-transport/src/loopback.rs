use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use bytes::Bytes;
use tokio::sync::mpsc;
use tracing::trace;

use crate::error::{Result, TransportError};
use crate::traits::ControlTransport;

/// In-memory transport pair for tests: the controller side implements
/// [`ControlTransport`], the peer side plays the camera.
pub fn pair() -> (LoopbackTransport, LoopbackPeer) {
    let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
    let (notify_tx, notify_rx) = mpsc::unbounded_channel();
    (
        LoopbackTransport {
            outbound: outbound_tx,
            notifications: Mutex::new(Some(notify_rx)),
            closed: AtomicBool::new(false),
        },
        LoopbackPeer {
            outbound: outbound_rx,
            notify: notify_tx,
        },
    )
}

/// Controller half of an in-memory link.
#[derive(Debug)]
pub struct LoopbackTransport {
    outbound: mpsc::UnboundedSender<Bytes>,
    notifications: Mutex<Option<mpsc::UnboundedReceiver<Bytes>>>,
    closed: AtomicBool,
}

#[async_trait::async_trait]
impl ControlTransport for LoopbackTransport {
    async fn write(&self, bytes: &[u8]) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(TransportError::Closed);
        }
        trace!(len = bytes.len(), "loopback write");
        self.outbound
            .send(Bytes::copy_from_slice(bytes))
            .map_err(|_| TransportError::Closed)
    }

    fn take_notifications(&self) -> Option<mpsc::UnboundedReceiver<Bytes>> {
        self.notifications
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take()
    }

    async fn close(&self) -> Result<()> {
        self.closed.store(true, Ordering::Release);
        Ok(())
    }
}

/// Camera half of an in-memory link.
#[derive(Debug)]
pub struct LoopbackPeer {
    outbound: mpsc::UnboundedReceiver<Bytes>,
    notify: mpsc::UnboundedSender<Bytes>,
}

impl LoopbackPeer {
    /// Receive the next chunk written by the controller, or `None` once the
    /// controller side is gone.
    pub async fn recv(&mut self) -> Option<Bytes> {
        self.outbound.recv().await
    }

    /// Push a notification fragment to the controller.
    pub fn notify(&self, bytes: impl Into<Bytes>) -> Result<()> {
        self.notify.send(bytes.into()).map_err(|_| TransportError::Closed)
    }
}

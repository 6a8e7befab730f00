use std::collections::HashMap;
use std::sync::Mutex;

use camlink_wire::Frame;
use tokio::sync::oneshot;
use tracing::trace;

use crate::error::{Result, SessionError};

/// What a pending request's waiter resolves with: the matching reply frame,
/// or a cancellation raised during teardown.
pub type ReplyResult = std::result::Result<Frame, SessionError>;

/// Assigns sequence numbers to outbound requests and tracks one waiter per
/// in-flight sequence number.
///
/// All state sits behind one mutex; the lock is never held across an await
/// point, so the correlator is safe to share between the command callers and
/// the notification reader.
#[derive(Debug)]
pub struct Correlator {
    inner: Mutex<Inner>,
}

#[derive(Debug)]
struct Inner {
    next_sequence: u16,
    pending: HashMap<u16, oneshot::Sender<ReplyResult>>,
}

impl Correlator {
    pub fn new() -> Self {
        Self::starting_at(0)
    }

    /// Start the sequence counter at a given value (wraparound tests).
    pub(crate) fn starting_at(next_sequence: u16) -> Self {
        Self {
            inner: Mutex::new(Inner {
                next_sequence,
                pending: HashMap::new(),
            }),
        }
    }

    /// Allocate the next free sequence number and register its waiter.
    ///
    /// The counter wraps within the 16-bit field and skips any value still
    /// held by an unresolved request. Must be called before the frame is
    /// handed to the transport so a fast reply cannot race registration.
    pub fn register(&self) -> Result<(u16, oneshot::Receiver<ReplyResult>)> {
        let mut inner = self.lock();
        let mut candidate = inner.next_sequence;
        for _ in 0..=u16::MAX {
            if !inner.pending.contains_key(&candidate) {
                let (tx, rx) = oneshot::channel();
                inner.pending.insert(candidate, tx);
                inner.next_sequence = candidate.wrapping_add(1);
                return Ok((candidate, rx));
            }
            candidate = candidate.wrapping_add(1);
        }
        Err(SessionError::SequencesExhausted)
    }

    /// Resolve the waiter for `sequence` with a reply frame.
    ///
    /// Returns false when no waiter exists (stale or duplicate reply).
    pub fn resolve(&self, sequence: u16, reply: Frame) -> bool {
        let sender = self.lock().pending.remove(&sequence);
        match sender {
            Some(tx) => {
                // A dropped receiver just means the caller gave up first.
                let _ = tx.send(Ok(reply));
                true
            }
            None => false,
        }
    }

    /// Release a sequence number without resolving it (timeout path).
    ///
    /// Idempotent: releasing an unknown or already-released sequence is a
    /// no-op.
    pub fn release(&self, sequence: u16) {
        if self.lock().pending.remove(&sequence).is_some() {
            trace!(sequence, "released pending request");
        }
    }

    /// Resolve every outstanding request with [`SessionError::Cancelled`].
    pub fn cancel_all(&self) {
        let pending = std::mem::take(&mut self.lock().pending);
        for (sequence, tx) in pending {
            trace!(sequence, "cancelling pending request");
            let _ = tx.send(Err(SessionError::Cancelled));
        }
    }

    /// Number of unresolved requests.
    pub fn in_flight(&self) -> usize {
        self.lock().pending.len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for Correlator {
    fn default() -> Self {
        Self::new()
    }
}

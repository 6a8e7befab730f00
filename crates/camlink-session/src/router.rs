use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex};

use bytes::Bytes;
use camlink_wire::Frame;
use tracing::{debug, warn};

use crate::command::{CMD_STATUS_PUSH, SET_CAMERA};
use crate::correlation::Correlator;
use crate::status::CameraStatus;

/// A decoded unsolicited push, delivered to status observers.
#[derive(Debug, Clone)]
pub enum StatusEvent {
    /// A camera status block the library knows how to decode.
    CameraStatus(CameraStatus),
    /// Any other push, carried verbatim.
    Raw {
        command_set: u8,
        command_id: u8,
        sequence: u16,
        payload: Bytes,
    },
}

impl StatusEvent {
    fn from_frame(frame: Frame) -> Self {
        if frame.command_set == SET_CAMERA && frame.command_id == CMD_STATUS_PUSH {
            if let Some(status) = CameraStatus::decode(&frame.payload) {
                return StatusEvent::CameraStatus(status);
            }
        }
        StatusEvent::Raw {
            command_set: frame.command_set,
            command_id: frame.command_id,
            sequence: frame.sequence,
            payload: frame.payload,
        }
    }
}

/// Handle returned by [`Router::subscribe`]; used to remove the observer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type StatusHandler = Arc<dyn Fn(&StatusEvent) + Send + Sync>;

/// Classifies validated inbound frames: replies go to the correlator,
/// unsolicited pushes fan out to status observers.
pub struct Router {
    correlator: Arc<Correlator>,
    observers: Mutex<ObserverList>,
}

#[derive(Default)]
struct ObserverList {
    next_id: u64,
    handlers: Vec<(SubscriptionId, StatusHandler)>,
}

impl Router {
    pub fn new(correlator: Arc<Correlator>) -> Self {
        Self {
            correlator,
            observers: Mutex::new(ObserverList::default()),
        }
    }

    /// Register a status observer. Observers are invoked in registration
    /// order for every unsolicited push.
    pub fn subscribe(&self, handler: impl Fn(&StatusEvent) + Send + Sync + 'static) -> SubscriptionId {
        let mut observers = self.lock();
        let id = SubscriptionId(observers.next_id);
        observers.next_id += 1;
        observers.handlers.push((id, Arc::new(handler)));
        id
    }

    /// Remove an observer. Returns false if the id was already gone.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut observers = self.lock();
        let before = observers.handlers.len();
        observers.handlers.retain(|(existing, _)| *existing != id);
        observers.handlers.len() != before
    }

    /// Number of registered observers.
    pub fn observer_count(&self) -> usize {
        self.lock().handlers.len()
    }

    /// Route one validated frame.
    ///
    /// Stale replies (no matching pending request, e.g. after a timeout
    /// already fired) are discarded with a diagnostic — never an error.
    pub fn route(&self, frame: Frame) {
        if frame.is_reply {
            let sequence = frame.sequence;
            if !self.correlator.resolve(sequence, frame) {
                debug!(sequence, "discarding stale reply");
            }
            return;
        }

        let event = StatusEvent::from_frame(frame);
        let handlers: Vec<StatusHandler> = self
            .lock()
            .handlers
            .iter()
            .map(|(_, handler)| Arc::clone(handler))
            .collect();
        for handler in handlers {
            // One observer's failure must not starve the rest.
            if std::panic::catch_unwind(AssertUnwindSafe(|| handler(&event))).is_err() {
                warn!("status observer panicked; continuing with remaining observers");
            }
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ObserverList> {
        self.observers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl std::fmt::Debug for Router {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Router")
            .field("observers", &self.observer_count())
            .finish()
    }
}

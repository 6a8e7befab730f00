//! The session facade: one paired connection to a camera.
//!
//! [`Session::connect`] runs the pairing exchange and spawns the reader
//! task; the returned value exposes the camera commands and owns the
//! connection for its lifetime. Dropping the session tears the connection
//! down.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bytes::{Bytes, BytesMut};
use camlink_transport::{ControlTransport, TransportConfig};
use camlink_wire::{encode_frame, Frame, GpsFix, Reassembler};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::command::{
    check_reply, mode_payload, record_payload, status_switch_payload, CameraMode, RecordAction,
    CMD_GPS, CMD_PAIR, CMD_RECORD, CMD_SET_MODE, CMD_STATUS_SWITCH, SET_CAMERA, SET_CONNECTION,
};
use crate::correlation::Correlator;
use crate::error::{Result, SessionError};
use crate::handshake::{
    pairing_ack, pairing_request, ConnectionRequest, HandshakeConfig, PairingReply,
};
use crate::router::{Router, StatusEvent, SubscriptionId};

/// Session-level knobs.
#[derive(Debug, Clone, Default)]
pub struct SessionConfig {
    /// Per-request reply window. `None` (or zero) means the 5-second
    /// default.
    pub request_timeout: Option<Duration>,
    /// Pairing parameters.
    pub handshake: HandshakeConfig,
    /// Values forwarded to the transport during link establishment.
    pub transport: TransportConfig,
}

const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

struct Shared {
    transport: Arc<dyn ControlTransport>,
    correlator: Arc<Correlator>,
    router: Arc<Router>,
    closed: AtomicBool,
    request_timeout: Duration,
}

impl Shared {
    /// Send a request frame and await its correlated reply.
    ///
    /// The waiter is registered before the bytes reach the transport so a
    /// reply arriving faster than this task resumes still finds it.
    async fn request(&self, command_set: u8, command_id: u8, payload: Bytes) -> Result<Frame> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(SessionError::TransportClosed);
        }
        let (sequence, rx) = self.correlator.register()?;
        let frame = Frame::request(command_set, command_id, sequence, payload);

        let mut wire = BytesMut::with_capacity(frame.wire_size());
        if let Err(err) = encode_frame(&frame, &mut wire) {
            self.correlator.release(sequence);
            return Err(err.into());
        }
        if let Err(err) = self.transport.write(&wire).await {
            self.correlator.release(sequence);
            return Err(err.into());
        }

        match tokio::time::timeout(self.request_timeout, rx).await {
            Ok(Ok(result)) => result,
            // Sender dropped without resolving; only teardown does that.
            Ok(Err(_)) => Err(SessionError::Cancelled),
            Err(_) => {
                self.correlator.release(sequence);
                Err(SessionError::Timeout(self.request_timeout))
            }
        }
    }

    /// Send a reply frame acknowledging a camera-initiated request. No
    /// correlation; the camera does not answer acks.
    async fn send_reply(
        &self,
        command_set: u8,
        command_id: u8,
        sequence: u16,
        payload: Bytes,
    ) -> Result<()> {
        let frame = Frame::reply(command_set, command_id, sequence, payload);
        let mut wire = BytesMut::with_capacity(frame.wire_size());
        encode_frame(&frame, &mut wire)?;
        self.transport.write(&wire).await?;
        Ok(())
    }

    fn teardown(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.correlator.cancel_all();
    }
}

/// A paired, live connection to a camera.
pub struct Session {
    shared: Arc<Shared>,
    reader: JoinHandle<()>,
    device_id: u32,
}

impl Session {
    /// Establish a session over an already-connected transport: spawn the
    /// reader and run the pairing exchange.
    pub async fn connect<T: ControlTransport>(transport: T, config: SessionConfig) -> Result<Self> {
        let transport: Arc<dyn ControlTransport> = Arc::new(transport);
        let notifications = transport
            .take_notifications()
            .ok_or(SessionError::TransportClosed)?;

        let correlator = Arc::new(Correlator::new());
        let router = Arc::new(Router::new(Arc::clone(&correlator)));
        let request_timeout = config
            .request_timeout
            .filter(|timeout| !timeout.is_zero())
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT);
        let shared = Arc::new(Shared {
            transport,
            correlator,
            router,
            closed: AtomicBool::new(false),
            request_timeout,
        });
        let reader = tokio::spawn(read_loop(notifications, Arc::clone(&shared)));

        let device_id = match run_handshake(&shared, &config).await {
            Ok(device_id) => device_id,
            Err(err) => {
                shared.teardown();
                reader.abort();
                let _ = shared.transport.close().await;
                return Err(err);
            }
        };
        info!(device_id = %format_args!("{device_id:#010x}"), "session established");

        Ok(Self {
            shared,
            reader,
            device_id,
        })
    }

    /// Device id assigned by the camera during pairing.
    pub fn device_id(&self) -> u32 {
        self.device_id
    }

    /// True once the link dropped or [`disconnect`](Self::disconnect) ran.
    pub fn is_closed(&self) -> bool {
        self.shared.closed.load(Ordering::SeqCst)
    }

    /// Send a raw request and await its reply. The command helpers below
    /// cover the known operations; this is the escape hatch for the rest.
    pub async fn request(
        &self,
        command_set: u8,
        command_id: u8,
        payload: impl Into<Bytes>,
    ) -> Result<Frame> {
        self.shared.request(command_set, command_id, payload.into()).await
    }

    /// Switch the camera's operating mode.
    pub async fn set_mode(&self, mode: CameraMode) -> Result<()> {
        let reply = self
            .shared
            .request(SET_CAMERA, CMD_SET_MODE, mode_payload(self.device_id, mode))
            .await?;
        check_reply(&reply.payload)
    }

    /// Start video recording in the current mode.
    pub async fn start_recording(&self) -> Result<()> {
        self.record(RecordAction::Start).await
    }

    /// Stop video recording.
    pub async fn stop_recording(&self) -> Result<()> {
        self.record(RecordAction::Stop).await
    }

    /// Capture a photo. Uses the record trigger; the camera interprets it
    /// per the active photo mode.
    pub async fn grab_image(&self) -> Result<()> {
        self.record(RecordAction::Start).await
    }

    async fn record(&self, action: RecordAction) -> Result<()> {
        let reply = self
            .shared
            .request(SET_CAMERA, CMD_RECORD, record_payload(self.device_id, action))
            .await?;
        check_reply(&reply.payload)
    }

    /// Push a GPS fix for the camera to embed in its recordings.
    pub async fn set_gps_data(&self, fix: &GpsFix) -> Result<()> {
        let mut payload = BytesMut::with_capacity(camlink_wire::GPS_PAYLOAD_SIZE);
        camlink_wire::encode_gps_payload(fix, &mut payload)?;
        let reply = self
            .shared
            .request(SET_CONNECTION, CMD_GPS, payload.freeze())
            .await?;
        check_reply(&reply.payload)
    }

    /// Register a status observer. The first observer turns the camera's
    /// status push on; later ones share the stream.
    pub async fn subscribe_status(
        &self,
        handler: impl Fn(&StatusEvent) + Send + Sync + 'static,
    ) -> Result<SubscriptionId> {
        if self.shared.router.observer_count() == 0 {
            self.set_status_push(true).await?;
        }
        Ok(self.shared.router.subscribe(handler))
    }

    /// Remove a status observer. Removing the last one turns the camera's
    /// status push back off.
    pub async fn unsubscribe_status(&self, id: SubscriptionId) -> Result<bool> {
        let removed = self.shared.router.unsubscribe(id);
        if removed && self.shared.router.observer_count() == 0 {
            self.set_status_push(false).await?;
        }
        Ok(removed)
    }

    async fn set_status_push(&self, enable: bool) -> Result<()> {
        let reply = self
            .shared
            .request(SET_CAMERA, CMD_STATUS_SWITCH, status_switch_payload(enable))
            .await?;
        check_reply(&reply.payload)
    }

    /// Tear the session down: close the transport, stop the reader, and
    /// cancel every pending request. Idempotent.
    pub async fn disconnect(&self) -> Result<()> {
        if self.shared.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        debug!("disconnecting session");
        let close_result = self.shared.transport.close().await;
        self.reader.abort();
        self.shared.correlator.cancel_all();
        close_result.map_err(Into::into)
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        // No await in drop; the transport notices the abort and cleans up.
        self.shared.closed.store(true, Ordering::SeqCst);
        self.reader.abort();
        self.shared.correlator.cancel_all();
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("device_id", &self.device_id)
            .field("closed", &self.is_closed())
            .finish()
    }
}

/// Consume notification fragments until the link drops, reassembling and
/// routing complete frames.
async fn read_loop(mut notifications: mpsc::UnboundedReceiver<Bytes>, shared: Arc<Shared>) {
    let mut reassembler = Reassembler::new();
    while let Some(fragment) = notifications.recv().await {
        reassembler.feed(&fragment);
        for frame in reassembler.drain() {
            shared.router.route(frame);
        }
    }
    warn!("notification stream ended; cancelling pending requests");
    shared.teardown();
}

/// Run the pairing exchange and return the camera's device id.
async fn run_handshake(shared: &Arc<Shared>, config: &SessionConfig) -> Result<u32> {
    // The camera's follow-up arrives as an unsolicited push; listen for it
    // before the pairing request goes out.
    let (push_tx, mut push_rx) = mpsc::unbounded_channel::<(u16, Bytes)>();
    let observer = shared.router.subscribe(move |event| {
        if let StatusEvent::Raw {
            command_set: SET_CONNECTION,
            command_id: CMD_PAIR,
            sequence,
            payload,
        } = event
        {
            let _ = push_tx.send((*sequence, payload.clone()));
        }
    });

    let exchange = async {
        let payload = pairing_request(&config.handshake, &config.transport.local_identity)?;
        let reply = shared.request(SET_CONNECTION, CMD_PAIR, payload).await?;
        let device_id = PairingReply::parse(&reply.payload)?.check()?.device_id;
        debug!(
            device_id = %format_args!("{device_id:#010x}"),
            "pairing accepted, awaiting connection request"
        );

        let (sequence, push) = push_rx
            .recv()
            .await
            .ok_or(SessionError::TransportClosed)?;
        ConnectionRequest::parse(&push)?.check()?;
        shared
            .send_reply(SET_CONNECTION, CMD_PAIR, sequence, pairing_ack(device_id))
            .await?;
        Ok(device_id)
    };

    let result = match tokio::time::timeout(config.handshake.timeout, exchange).await {
        Ok(result) => result,
        Err(_) => Err(SessionError::HandshakeFailed(format!(
            "no pairing confirmation within {:?}",
            config.handshake.timeout
        ))),
    };
    shared.router.unsubscribe(observer);
    result
}

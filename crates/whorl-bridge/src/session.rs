//! Device session actor: the single owner of the serial link.
//!
//! Exactly one task may read from the sensor. Concurrent reads race on the
//! shared stream and silently steal each other's lines, so every inbound
//! line passes through one actor ([`DeviceSession`]) that owns the link for
//! its whole lifetime and demultiplexes what it reads:
//!
//! ```text
//! Gateway handlers ──┐
//!                    ├─ SessionOp (mpsc) ──> DeviceSession ──(link)──> sensor
//! Typed callers ─────┘                            │
//!                                                 ├─> command replies (oneshot)
//!                                                 └─> SensorEvent stream (mpsc)
//! ```
//!
//! # Mutual exclusion
//!
//! The sensor protocol has no correlation IDs, so only one command may be
//! outstanding at a time. The gate is structural: the actor runs each
//! [`SessionOp`] to completion before polling its mailbox again, so a second
//! caller simply queues until the first exchange resolves. There is no
//! "outstanding" flag to desynchronize.
//!
//! # Deadlines
//!
//! Every exchange arms its own deadline; an unresponsive device yields a
//! `Timeout` error to the caller and can never wedge the gate. A response
//! that arrives after its caller gave up is classified while the actor is
//! idle and dropped with a log line.
//!
//! # Reconnection
//!
//! When the link fails the actor drops it, waits out the reconnect delay and
//! dials again via its [`Connector`]. Ops that arrive while the link is down
//! fail fast with `DeviceDisconnected` instead of queuing indefinitely.

use std::time::Duration;

use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::{self, Instant};
use tracing::{debug, info, warn};

use whorl_core::constants::{
    CHUNK_PACING_MS, DEFAULT_COMMAND_TIMEOUT_MS, INTERACTIVE_COMMAND_TIMEOUT_MS,
    RECONNECT_DELAY_MS, TRANSFER_TIMEOUT_MS,
};
use whorl_core::{Error, Result, SensorSlot};
use whorl_protocol::command::{DeviceCommand, ResponseKind};
use whorl_protocol::event::{BannerKind, SensorEvent};
use whorl_protocol::response::{CommandResponse, ResponseMatch, match_response};
use whorl_protocol::template::{
    AssemblerStep, TemplateAssembler, TransferDialect, encode_transfer,
};
use whorl_transport::{Connector, SerialLink};

use crate::dispatcher::SessionHandle;

/// Depth of the op mailbox; callers beyond this block in `send`.
const OP_QUEUE_DEPTH: usize = 32;

/// Depth of the event stream toward the forwarder. The reader never blocks
/// on a slow forwarder; overflow drops the event with a warning.
const EVENT_QUEUE_DEPTH: usize = 64;

/// Timing knobs for a device session.
///
/// Defaults preserve the deployed firmware's magnitudes: a command normally
/// answers well under 5 s, finger-on-sensor interactions and template
/// streaming can take tens of seconds.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Deadline for plain command exchanges, in milliseconds.
    pub command_timeout_ms: u64,
    /// Deadline for exchanges that wait on a finger placement.
    pub interactive_timeout_ms: u64,
    /// Overall deadline for a template transfer (not per-line).
    pub transfer_timeout_ms: u64,
    /// Delay between reconnect attempts after a link failure.
    pub reconnect_delay_ms: u64,
    /// Pause between template chunk writes so the device UART buffer drains.
    pub chunk_pacing_ms: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            command_timeout_ms: DEFAULT_COMMAND_TIMEOUT_MS,
            interactive_timeout_ms: INTERACTIVE_COMMAND_TIMEOUT_MS,
            transfer_timeout_ms: TRANSFER_TIMEOUT_MS,
            reconnect_delay_ms: RECONNECT_DELAY_MS,
            chunk_pacing_ms: CHUNK_PACING_MS,
        }
    }
}

/// One unit of work for the session actor.
///
/// Each variant carries a oneshot for its result; a dropped receiver means
/// the caller gave up and the outcome is discarded.
pub(crate) enum SessionOp {
    /// Write one command line and wait for its response line.
    Exchange {
        command: DeviceCommand,
        timeout_ms: u64,
        reply: oneshot::Sender<Result<CommandResponse>>,
    },
    /// Stream a stored template out of the sensor.
    Extract {
        slot: SensorSlot,
        reply: oneshot::Sender<Result<Vec<u8>>>,
    },
    /// Stream a template into the sensor buffer.
    Upload {
        dialect: TransferDialect,
        slot: SensorSlot,
        template: Vec<u8>,
        reply: oneshot::Sender<Result<()>>,
    },
}

impl SessionOp {
    /// Resolve the op with an error without touching the link.
    fn fail(self, err: Error) {
        match self {
            Self::Exchange { reply, .. } => {
                let _ = reply.send(Err(err));
            }
            Self::Extract { reply, .. } => {
                let _ = reply.send(Err(err));
            }
            Self::Upload { reply, .. } => {
                let _ = reply.send(Err(err));
            }
        }
    }
}

/// Why `serve_link` stopped serving a healthy link.
enum ServeExit {
    /// The link errored; drop it and reconnect.
    LinkFailed,
    /// Every [`SessionHandle`] is gone; the actor should stop.
    HandlesDropped,
}

/// The session actor. Construct with [`DeviceSession::new`], then drive it
/// with [`DeviceSession::run`] on its own task:
///
/// ```no_run
/// use whorl_bridge::session::{DeviceSession, SessionConfig};
/// use whorl_transport::UartConnector;
///
/// # async fn example() {
/// let connector = UartConnector::new("/dev/ttyUSB0", 9600);
/// let (session, handle, events) = DeviceSession::new(connector, SessionConfig::default());
/// tokio::spawn(session.run());
/// # }
/// ```
pub struct DeviceSession<C: Connector> {
    connector: C,
    config: SessionConfig,
    op_rx: mpsc::Receiver<SessionOp>,
    events_tx: mpsc::Sender<SensorEvent>,
    link_up: watch::Sender<bool>,
}

impl<C: Connector> DeviceSession<C> {
    /// Create a session over `connector` along with its caller-facing
    /// [`SessionHandle`] and the stream of unsolicited sensor events.
    pub fn new(
        connector: C,
        config: SessionConfig,
    ) -> (Self, SessionHandle, mpsc::Receiver<SensorEvent>) {
        let (op_tx, op_rx) = mpsc::channel(OP_QUEUE_DEPTH);
        let (events_tx, events_rx) = mpsc::channel(EVENT_QUEUE_DEPTH);
        let (link_up_tx, link_up_rx) = watch::channel(false);

        let handle = SessionHandle::new(op_tx, link_up_rx, &config);
        let session = Self {
            connector,
            config,
            op_rx,
            events_tx,
            link_up: link_up_tx,
        };
        (session, handle, events_rx)
    }

    /// Drive the session until every handle is dropped.
    ///
    /// Alternates between dialing the device and serving the live link;
    /// ops that arrive while the link is down fail fast.
    pub async fn run(mut self) {
        loop {
            let Some(link) = self.acquire_link().await else {
                debug!("All session handles dropped while disconnected; stopping");
                return;
            };
            let _ = self.link_up.send(true);
            let exit = self.serve_link(link).await;
            let _ = self.link_up.send(false);
            match exit {
                ServeExit::LinkFailed => {
                    info!("Device link lost; reconnecting");
                }
                ServeExit::HandlesDropped => {
                    debug!("All session handles dropped; stopping");
                    return;
                }
            }
        }
    }

    /// Dial until a link comes up. Returns `None` when the mailbox closes.
    async fn acquire_link(&mut self) -> Option<C::Link> {
        loop {
            match self.connector.connect().await {
                Ok(link) => {
                    info!("Device link established");
                    return Some(link);
                }
                Err(e) => {
                    warn!(
                        error = %e,
                        retry_ms = self.config.reconnect_delay_ms,
                        "Connect failed; will retry"
                    );
                }
            }
            let retry_at =
                Instant::now() + Duration::from_millis(self.config.reconnect_delay_ms);
            loop {
                tokio::select! {
                    _ = time::sleep_until(retry_at) => break,
                    op = self.op_rx.recv() => match op {
                        // Fail fast rather than queue against a dead link.
                        Some(op) => op.fail(Error::DeviceDisconnected),
                        None => return None,
                    },
                }
            }
        }
    }

    /// Serve ops and route unsolicited lines until the link dies or the
    /// mailbox closes. Holds the link exclusively; `execute` runs each op
    /// to completion, which is what serializes concurrent callers.
    async fn serve_link(&mut self, mut link: C::Link) -> ServeExit {
        loop {
            tokio::select! {
                line = link.read_line() => match line {
                    Ok(line) => self.route_idle_line(&line),
                    Err(e) => {
                        warn!(error = %e, "Read failed while idle");
                        return ServeExit::LinkFailed;
                    }
                },
                op = self.op_rx.recv() => match op {
                    Some(op) => {
                        if let Err(e) = self.execute(&mut link, op).await {
                            warn!(error = %e, "Link failed mid-operation");
                            return ServeExit::LinkFailed;
                        }
                    }
                    None => return ServeExit::HandlesDropped,
                },
            }
        }
    }

    /// Run one op against the live link.
    ///
    /// Per-op failures (timeout, malformed response, bad transfer) resolve
    /// the caller's oneshot and leave the link in service; only link-level
    /// failures propagate as `Err` so `serve_link` can reconnect.
    async fn execute(&self, link: &mut C::Link, op: SessionOp) -> Result<()> {
        match op {
            SessionOp::Exchange {
                command,
                timeout_ms,
                reply,
            } => {
                debug!(command = %command, timeout_ms, "Exchange started");
                let outcome = self.run_exchange(link, &command, timeout_ms).await;
                self.resolve(reply, outcome, &command)
            }
            SessionOp::Extract { slot, reply } => {
                debug!(sensor_id = %slot, "Extraction started");
                let outcome = self.run_extract(link, slot).await;
                self.resolve(reply, outcome, &DeviceCommand::GetModel(slot))
            }
            SessionOp::Upload {
                dialect,
                slot,
                template,
                reply,
            } => {
                debug!(sensor_id = %slot, bytes = template.len(), "Upload started");
                let outcome = self.run_upload(link, dialect, slot, &template).await;
                self.resolve(reply, outcome, &DeviceCommand::SetModel(slot))
            }
        }
    }

    /// Deliver an op outcome to its caller.
    ///
    /// A disconnect is reported to the caller *and* returned so the serve
    /// loop tears the link down; everything else stays local to the op.
    fn resolve<T>(
        &self,
        reply: oneshot::Sender<Result<T>>,
        outcome: Result<T>,
        command: &DeviceCommand,
    ) -> Result<()> {
        match outcome {
            Ok(value) => {
                if reply.send(Ok(value)).is_err() {
                    debug!(command = %command, "Caller gave up; result discarded");
                }
                Ok(())
            }
            Err(e) if e.is_disconnect() => {
                let _ = reply.send(Err(Error::DeviceDisconnected));
                Err(e)
            }
            Err(e) => {
                if reply.send(Err(e)).is_err() {
                    debug!(command = %command, "Caller gave up; error discarded");
                }
                Ok(())
            }
        }
    }

    /// One write, then read until the matching response shape or deadline.
    async fn run_exchange(
        &self,
        link: &mut C::Link,
        command: &DeviceCommand,
        timeout_ms: u64,
    ) -> Result<CommandResponse> {
        link.write_line(&command.wire()).await?;

        let kind = command.response_kind();
        // Write-only frames travel inside transfers, never through Exchange.
        debug_assert!(
            kind != ResponseKind::None,
            "write-only command routed as an exchange"
        );

        let deadline = Instant::now() + Duration::from_millis(timeout_ms);
        loop {
            tokio::select! {
                line = link.read_line() => {
                    let line = line?;
                    match match_response(kind, &line) {
                        ResponseMatch::Response(response) => {
                            debug!(command = %command, "Exchange complete");
                            return Ok(response);
                        }
                        ResponseMatch::Malformed => {
                            warn!(command = %command, line = %line, "Malformed response");
                            return Err(Error::malformed(line));
                        }
                        ResponseMatch::Unrelated => self.route_idle_line(&line),
                    }
                }
                _ = time::sleep_until(deadline) => {
                    warn!(command = %command, timeout_ms, "Exchange deadline expired");
                    return Err(Error::timeout(timeout_ms));
                }
            }
        }
    }

    /// Request `GET_MODEL` and reassemble the streamed template.
    async fn run_extract(&self, link: &mut C::Link, slot: SensorSlot) -> Result<Vec<u8>> {
        link.write_line(&DeviceCommand::GetModel(slot).wire()).await?;

        let mut assembler = TemplateAssembler::new();
        // One deadline for the whole stream; large templates span many lines.
        let deadline = Instant::now() + Duration::from_millis(self.config.transfer_timeout_ms);
        loop {
            tokio::select! {
                line = link.read_line() => {
                    let line = line?;
                    match assembler.push_line(&line) {
                        Ok(AssemblerStep::Complete) => break,
                        Ok(AssemblerStep::Continue) => {}
                        Ok(AssemblerStep::Ignored) => self.route_idle_line(&line),
                        Err(e) => {
                            warn!(sensor_id = %slot, error = %e, "Extraction failed");
                            return Err(e);
                        }
                    }
                }
                _ = time::sleep_until(deadline) => {
                    warn!(
                        sensor_id = %slot,
                        timeout_ms = self.config.transfer_timeout_ms,
                        "Extraction deadline expired"
                    );
                    return Err(Error::timeout(self.config.transfer_timeout_ms));
                }
            }
        }

        if let Some(announced) = assembler.slot() {
            if announced != slot {
                warn!(requested = %slot, announced = %announced, "Export slot mismatch");
            }
        }
        let bytes = assembler.into_bytes()?;
        debug!(sensor_id = %slot, bytes = bytes.len(), "Template extracted");
        Ok(bytes)
    }

    /// Stream a template into the device, pacing each frame.
    ///
    /// The device does not acknowledge frames; the upload is complete once
    /// the end marker is written.
    async fn run_upload(
        &self,
        link: &mut C::Link,
        dialect: TransferDialect,
        slot: SensorSlot,
        template: &[u8],
    ) -> Result<()> {
        let lines = encode_transfer(dialect, slot, template);
        let frames = lines.len();
        let pacing = Duration::from_millis(self.config.chunk_pacing_ms);
        for line in &lines {
            link.write_line(line).await?;
            time::sleep(pacing).await;
        }
        debug!(sensor_id = %slot, frames, "Upload written");
        Ok(())
    }

    /// Classify a line that no exchange is waiting on.
    ///
    /// Match events go to the forwarder without blocking; banners are logged
    /// at the level their prefix implies; anything else is a late or stray
    /// response and is dropped.
    fn route_idle_line(&self, line: &str) {
        if let Some(event) = SensorEvent::parse(line) {
            debug!(event = ?event, "Sensor event");
            match self.events_tx.try_send(event) {
                Ok(()) => {}
                Err(TrySendError::Full(event)) => {
                    warn!(event = ?event, "Event queue full; event dropped");
                }
                Err(TrySendError::Closed(_)) => {
                    debug!("Event stream closed; event dropped");
                }
            }
            return;
        }
        match BannerKind::classify(line) {
            BannerKind::Status | BannerKind::Boot | BannerKind::Info => {
                info!(device = %line, "Device banner");
            }
            BannerKind::Debug => debug!(device = %line, "Device banner"),
            BannerKind::Other => debug!(line = %line, "Unclassified line dropped"),
        }
    }
}

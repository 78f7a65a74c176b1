//! Caller-facing command dispatcher over the session actor.
//!
//! A [`SessionHandle`] is cheap to clone and safe to share across request
//! handlers. Every call queues exactly one op in the actor's mailbox and
//! waits on a private reply channel, so concurrent callers are serialized
//! by the actor rather than racing on the serial line. A caller whose op
//! cannot be delivered (actor gone, link down and mailbox draining) gets
//! `DeviceDisconnected` instead of hanging.

use tokio::sync::{mpsc, oneshot, watch};

use whorl_core::{Error, Result, SensorSlot};
use whorl_protocol::command::DeviceCommand;
use whorl_protocol::response::CommandResponse;
use whorl_protocol::template::TransferDialect;

use crate::session::{SessionConfig, SessionOp};

/// Handle for issuing device commands through the session actor.
///
/// Obtained from [`DeviceSession::new`](crate::session::DeviceSession::new).
/// Dropping every clone closes the actor's mailbox and stops it.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    op_tx: mpsc::Sender<SessionOp>,
    link_up: watch::Receiver<bool>,
    command_timeout_ms: u64,
    interactive_timeout_ms: u64,
}

impl SessionHandle {
    pub(crate) fn new(
        op_tx: mpsc::Sender<SessionOp>,
        link_up: watch::Receiver<bool>,
        config: &SessionConfig,
    ) -> Self {
        Self {
            op_tx,
            link_up,
            command_timeout_ms: config.command_timeout_ms,
            interactive_timeout_ms: config.interactive_timeout_ms,
        }
    }

    /// Whether the actor currently holds a live link.
    ///
    /// Point-in-time observation; a command may still fail with
    /// `DeviceDisconnected` if the link drops after the check.
    pub fn is_connected(&self) -> bool {
        *self.link_up.borrow()
    }

    /// Exchange `command` using its own default deadline.
    ///
    /// Interactive commands (those that wait for a finger) get the long
    /// deadline; everything else the short one.
    pub async fn exchange(&self, command: DeviceCommand) -> Result<CommandResponse> {
        let timeout_ms = if command.is_interactive() {
            self.interactive_timeout_ms
        } else {
            self.command_timeout_ms
        };
        self.exchange_with_timeout(command, timeout_ms).await
    }

    /// Exchange `command` with an explicit deadline in milliseconds.
    pub async fn exchange_with_timeout(
        &self,
        command: DeviceCommand,
        timeout_ms: u64,
    ) -> Result<CommandResponse> {
        let (reply, rx) = oneshot::channel();
        self.submit(
            SessionOp::Exchange {
                command,
                timeout_ms,
                reply,
            },
            rx,
        )
        .await
    }

    /// Pull the stored template out of `slot` as raw bytes.
    pub async fn extract_template(&self, slot: SensorSlot) -> Result<Vec<u8>> {
        let (reply, rx) = oneshot::channel();
        self.submit(SessionOp::Extract { slot, reply }, rx).await
    }

    /// Push a template into the sensor's working buffer for `slot`.
    pub async fn upload_template(&self, slot: SensorSlot, template: Vec<u8>) -> Result<()> {
        let (reply, rx) = oneshot::channel();
        self.submit(
            SessionOp::Upload {
                dialect: TransferDialect::Direct,
                slot,
                template,
                reply,
            },
            rx,
        )
        .await
    }

    /// Stage a template into one slot of the device's batch buffer.
    pub async fn stage_batch_template(
        &self,
        slot: SensorSlot,
        template: Vec<u8>,
    ) -> Result<()> {
        let (reply, rx) = oneshot::channel();
        self.submit(
            SessionOp::Upload {
                dialect: TransferDialect::Batch,
                slot,
                template,
                reply,
            },
            rx,
        )
        .await
    }

    /// Capture a finger and store it in `slot`.
    pub async fn enroll(&self, slot: SensorSlot) -> Result<CommandResponse> {
        self.exchange(DeviceCommand::Enroll(slot)).await
    }

    /// Delete the template stored in `slot`.
    pub async fn delete(&self, slot: SensorSlot) -> Result<CommandResponse> {
        self.exchange(DeviceCommand::Delete(slot)).await
    }

    /// Wipe the sensor's entire template library.
    pub async fn delete_all(&self) -> Result<CommandResponse> {
        self.exchange(DeviceCommand::DeleteAll).await
    }

    /// Capture a finger and compare it against the loaded buffer.
    pub async fn scan_and_compare(&self) -> Result<CommandResponse> {
        self.exchange(DeviceCommand::ScanAndCompare).await
    }

    /// Drop any temporary models from the sensor's working buffer.
    pub async fn clear_temp_models(&self) -> Result<CommandResponse> {
        self.exchange(DeviceCommand::ClearTempModels).await
    }

    /// Open a batch staging session on the device.
    pub async fn begin_batch(&self) -> Result<CommandResponse> {
        self.exchange(DeviceCommand::BeginBatch).await
    }

    /// Capture one finger and compare it against every staged batch slot.
    pub async fn run_batch_match(&self) -> Result<CommandResponse> {
        self.exchange(DeviceCommand::RunBatchMatch).await
    }

    /// Discard all staged batch templates.
    pub async fn clear_batch(&self) -> Result<CommandResponse> {
        self.exchange(DeviceCommand::ClearBatch).await
    }

    async fn submit<T>(
        &self,
        op: SessionOp,
        rx: oneshot::Receiver<Result<T>>,
    ) -> Result<T> {
        self.op_tx
            .send(op)
            .await
            .map_err(|_| Error::DeviceDisconnected)?;
        rx.await.map_err(|_| Error::DeviceDisconnected)?
    }
}

//! Command types for the sensor line protocol.
//!
//! Every command is one newline-terminated ASCII line, optionally carrying a
//! single `:`-separated argument:
//!
//! ```text
//! ENROLL:12
//! DELETE_ALL
//! HEX:A1B2C3...
//! ```
//!
//! The protocol carries no correlation IDs, so each command also declares the
//! shape of the line that answers it ([`ResponseKind`]) — that declaration is
//! what lets the reader loop attribute an incoming line to the outstanding
//! exchange instead of treating it as an unsolicited event.
//!
//! # Example
//!
//! ```
//! use whorl_protocol::{DeviceCommand, ResponseKind};
//! use whorl_core::SensorSlot;
//!
//! let cmd = DeviceCommand::Enroll(SensorSlot::new(12).unwrap());
//! assert_eq!(cmd.wire(), "ENROLL:12");
//! assert_eq!(cmd.response_kind(), ResponseKind::Json);
//! assert!(cmd.is_interactive());
//! ```

use std::fmt;
use whorl_core::{
    SensorSlot,
    constants::{DEFAULT_COMMAND_TIMEOUT_MS, INTERACTIVE_COMMAND_TIMEOUT_MS, TRANSFER_TIMEOUT_MS},
};

/// Expected response shape for a device command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseKind {
    /// A one-line JSON object that does not carry an `"event"` key.
    Json,
    /// A short bare token line (`OK`, `READY`, ...).
    Token,
    /// No response line; the write itself completes the command.
    None,
}

/// A command in the sensor line protocol.
///
/// `HexChunk`, `HexEnd`, `TemplateSlot`, `TemplateData` and `TemplateEnd` are
/// transfer frames: they are only ever written mid-transfer while the
/// exchange gate is already held, which is why their response kind is
/// [`ResponseKind::None`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceCommand {
    /// Capture a finger twice and store the template in a flash slot.
    Enroll(SensorSlot),
    /// Remove the template in one flash slot.
    Delete(SensorSlot),
    /// Erase the whole template library.
    DeleteAll,
    /// Start streaming the template in a slot back to the host; the
    /// [`template`](crate::template) module reassembles the frames.
    GetModel(SensorSlot),
    /// Announce an upload into a flash slot; hex frames follow.
    SetModel(SensorSlot),
    /// One hex payload frame of a direct upload.
    HexChunk(String),
    /// End marker of a direct upload.
    HexEnd,
    /// Capture a finger and compare against the stored library.
    ScanAndCompare,
    /// Drop any templates staged in device RAM.
    ClearTempModels,
    /// Open a batch staging session in device RAM.
    BeginBatch,
    /// Announce the staging slot for the next batch frames.
    TemplateSlot(SensorSlot),
    /// One hex payload frame of a batch upload.
    TemplateData(String),
    /// End marker of one staged batch template.
    TemplateEnd,
    /// Capture a finger and compare against the staged batch only.
    RunBatchMatch,
    /// Discard the whole batch staging session.
    ClearBatch,
}

impl DeviceCommand {
    /// The newline-less wire form of the command.
    #[must_use]
    pub fn wire(&self) -> String {
        match self {
            Self::Enroll(slot) => format!("ENROLL:{slot}"),
            Self::Delete(slot) => format!("DELETE:{slot}"),
            Self::DeleteAll => "DELETE_ALL".to_string(),
            Self::GetModel(slot) => format!("GET_MODEL:{slot}"),
            Self::SetModel(slot) => format!("SET_MODEL:{slot}"),
            Self::HexChunk(chunk) => format!("HEX:{chunk}"),
            Self::HexEnd => "HEX_END".to_string(),
            Self::ScanAndCompare => "SCAN_AND_COMPARE".to_string(),
            Self::ClearTempModels => "CLEAR_TEMP_MODELS".to_string(),
            Self::BeginBatch => "BEGIN_BATCH".to_string(),
            Self::TemplateSlot(slot) => format!("TEMPLATE_SLOT:{slot}"),
            Self::TemplateData(chunk) => format!("TEMPLATE_DATA:{chunk}"),
            Self::TemplateEnd => "TEMPLATE_END".to_string(),
            Self::RunBatchMatch => "RUN_BATCH_MATCH".to_string(),
            Self::ClearBatch => "CLEAR_BATCH".to_string(),
        }
    }

    /// The verb part of the wire form, without any argument.
    #[must_use]
    pub fn verb(&self) -> &'static str {
        match self {
            Self::Enroll(_) => "ENROLL",
            Self::Delete(_) => "DELETE",
            Self::DeleteAll => "DELETE_ALL",
            Self::GetModel(_) => "GET_MODEL",
            Self::SetModel(_) => "SET_MODEL",
            Self::HexChunk(_) => "HEX",
            Self::HexEnd => "HEX_END",
            Self::ScanAndCompare => "SCAN_AND_COMPARE",
            Self::ClearTempModels => "CLEAR_TEMP_MODELS",
            Self::BeginBatch => "BEGIN_BATCH",
            Self::TemplateSlot(_) => "TEMPLATE_SLOT",
            Self::TemplateData(_) => "TEMPLATE_DATA",
            Self::TemplateEnd => "TEMPLATE_END",
            Self::RunBatchMatch => "RUN_BATCH_MATCH",
            Self::ClearBatch => "CLEAR_BATCH",
        }
    }

    /// Response shape the device answers this command with.
    #[must_use]
    pub fn response_kind(&self) -> ResponseKind {
        match self {
            Self::Enroll(_)
            | Self::Delete(_)
            | Self::DeleteAll
            | Self::ScanAndCompare
            | Self::ClearTempModels
            | Self::RunBatchMatch => ResponseKind::Json,
            Self::BeginBatch | Self::ClearBatch => ResponseKind::Token,
            Self::GetModel(_)
            | Self::SetModel(_)
            | Self::HexChunk(_)
            | Self::HexEnd
            | Self::TemplateSlot(_)
            | Self::TemplateData(_)
            | Self::TemplateEnd => ResponseKind::None,
        }
    }

    /// Returns `true` if the device waits for a finger placement before it
    /// can answer, which calls for a human-scale deadline.
    #[must_use]
    pub fn is_interactive(&self) -> bool {
        matches!(
            self,
            Self::Enroll(_) | Self::ScanAndCompare | Self::RunBatchMatch
        )
    }

    /// Default deadline for this command in milliseconds.
    ///
    /// Interactive commands get the finger-wait deadline, transfer preambles
    /// the whole-transfer deadline, everything else the short wire deadline.
    #[must_use]
    pub fn default_timeout_ms(&self) -> u64 {
        if self.is_interactive() {
            INTERACTIVE_COMMAND_TIMEOUT_MS
        } else if matches!(self, Self::GetModel(_) | Self::SetModel(_)) {
            TRANSFER_TIMEOUT_MS
        } else {
            DEFAULT_COMMAND_TIMEOUT_MS
        }
    }
}

impl fmt::Display for DeviceCommand {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        // Payload frames are summarized so a 512-char chunk never lands in a log line.
        match self {
            Self::HexChunk(chunk) => write!(f, "HEX:<{} chars>", chunk.len()),
            Self::TemplateData(chunk) => write!(f, "TEMPLATE_DATA:<{} chars>", chunk.len()),
            other => write!(f, "{}", other.wire()),
        }
    }
}

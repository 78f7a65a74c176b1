//! Template transfer codec: chunked hex framing for template blobs.
//!
//! A fingerprint template is a binary blob several times larger than the
//! sensor's single-line serial buffer, so it crosses the wire as hex text
//! split into fixed-size chunks bracketed by start and end markers. The
//! single serial link cannot reorder lines, so chunk order *is* payload
//! order; reassembly is concatenation plus corruption checks.
//!
//! # Upload direction (host -> device)
//!
//! ```text
//! SET_MODEL:12          <- start marker carrying the slot
//! HEX:<512 hex chars>   <- payload frames
//! HEX:<...>
//! HEX_END               <- end marker
//! ```
//!
//! The batch dialect stages into device RAM instead of flash and uses
//! `TEMPLATE_SLOT:` / `TEMPLATE_DATA:` / `TEMPLATE_END`.
//!
//! # Extraction direction (device -> host)
//!
//! ```text
//! {"status":"start_export","sensor_id":12}
//! TEMPLATE_HEX:<512 hex chars>
//! TEMPLATE_HEX:<...>
//! {"status":"export_done"}
//! ```
//!
//! [`TemplateAssembler`] consumes the extraction lines:
//!
//! ```text
//! ┌──────────────┐ start_export ┌───────────────┐ export_done ┌──────┐
//! │ WaitingStart │─────────────>│ ReadingChunks │────────────>│ Done │
//! └──────────────┘              └───────────────┘             └──────┘
//!        │                            │    │
//!        │ events/banners             │    │ accumulated hex over limit,
//!        │ (ignored, routed by        │    │ non-hex payload, or an
//!        │  the caller)               │    │ export error status
//!        └────────────────────────────┘    └──> transfer fails
//! ```
//!
//! An extraction that never reaches `Done` is a failed transfer; the overall
//! deadline for that is enforced by the caller, not per line.
//!
//! # Round-trip law
//!
//! For any template bytes, encoding into frames and reassembling the data
//! chunks yields the original bytes exactly — covered by the property tests.

use whorl_core::{
    Error, Result, SensorSlot,
    constants::{HEX_CHUNK_LEN, MAX_TEMPLATE_HEX_LEN},
};

/// `status` value of the extraction start marker.
pub const EXPORT_START_STATUS: &str = "start_export";

/// `status` value of the extraction end marker.
pub const EXPORT_DONE_STATUS: &str = "export_done";

/// Line prefix of extraction payload frames.
pub const EXPORT_CHUNK_PREFIX: &str = "TEMPLATE_HEX:";

/// Wire dialect for an upload transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferDialect {
    /// `SET_MODEL` / `HEX:` / `HEX_END` — writes into a flash slot.
    Direct,
    /// `TEMPLATE_SLOT` / `TEMPLATE_DATA:` / `TEMPLATE_END` — stages into
    /// batch RAM for a one-shot comparison.
    Batch,
}

impl TransferDialect {
    /// Start marker line carrying the target slot.
    #[must_use]
    pub fn begin_line(&self, slot: SensorSlot) -> String {
        match self {
            Self::Direct => format!("SET_MODEL:{slot}"),
            Self::Batch => format!("TEMPLATE_SLOT:{slot}"),
        }
    }

    /// Payload frame line for one hex chunk.
    #[must_use]
    pub fn chunk_line(&self, chunk: &str) -> String {
        match self {
            Self::Direct => format!("HEX:{chunk}"),
            Self::Batch => format!("TEMPLATE_DATA:{chunk}"),
        }
    }

    /// End marker line.
    #[must_use]
    pub fn end_line(&self) -> &'static str {
        match self {
            Self::Direct => "HEX_END",
            Self::Batch => "TEMPLATE_END",
        }
    }
}

/// Hex-encode template bytes (uppercase, two digits per byte).
#[must_use]
pub fn encode_hex(bytes: &[u8]) -> String {
    let mut hex = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        hex.push_str(&format!("{byte:02X}"));
    }
    hex
}

/// Decode hex text into template bytes.
///
/// Accepts upper- and lowercase digits.
///
/// # Errors
/// Returns `Error::InvalidHex` on an odd-length input or a non-hex digit.
pub fn decode_hex(hex: &str) -> Result<Vec<u8>> {
    let hex = hex.trim();
    if hex.len() % 2 != 0 {
        return Err(Error::InvalidHex(format!(
            "odd length {} cannot form whole bytes",
            hex.len()
        )));
    }
    let digits = hex.as_bytes();
    let mut bytes = Vec::with_capacity(hex.len() / 2);
    for pair in digits.chunks_exact(2) {
        let hi = hex_digit(pair[0])?;
        let lo = hex_digit(pair[1])?;
        bytes.push((hi << 4) | lo);
    }
    Ok(bytes)
}

fn hex_digit(digit: u8) -> Result<u8> {
    match digit {
        b'0'..=b'9' => Ok(digit - b'0'),
        b'a'..=b'f' => Ok(digit - b'a' + 10),
        b'A'..=b'F' => Ok(digit - b'A' + 10),
        other => Err(Error::InvalidHex(format!(
            "invalid hex digit: {:?}",
            other as char
        ))),
    }
}

/// Encode a binary template into the complete upload line sequence:
/// start marker, payload frames of at most [`HEX_CHUNK_LEN`] hex characters,
/// end marker.
#[must_use]
pub fn encode_transfer(
    dialect: TransferDialect,
    slot: SensorSlot,
    template: &[u8],
) -> Vec<String> {
    let hex = encode_hex(template);
    let chunks = hex.len().div_ceil(HEX_CHUNK_LEN);
    let mut lines = Vec::with_capacity(chunks + 2);
    lines.push(dialect.begin_line(slot));
    let mut rest = hex.as_str();
    while !rest.is_empty() {
        let split = rest.len().min(HEX_CHUNK_LEN);
        let (chunk, tail) = rest.split_at(split);
        lines.push(dialect.chunk_line(chunk));
        rest = tail;
    }
    lines.push(dialect.end_line().to_string());
    lines
}

/// Reassembly states for a template extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssemblerState {
    /// Waiting for the `start_export` marker.
    WaitingStart,
    /// Accumulating `TEMPLATE_HEX:` payload frames.
    ReadingChunks,
    /// End marker seen; the template is complete.
    Done,
}

/// Outcome of feeding one line to the assembler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssemblerStep {
    /// Line consumed; the transfer is still in progress.
    Continue,
    /// Line consumed; the end marker arrived and the template is complete.
    Complete,
    /// Line is not part of the transfer (event, banner); the caller routes it.
    Ignored,
}

/// Stateful reassembler for the extraction direction.
///
/// Fed one line at a time by the reader loop while a `GET_MODEL` transfer
/// holds the exchange gate. Sensor events and banners interleaved with the
/// transfer are reported as [`AssemblerStep::Ignored`] so the caller can
/// route them down the normal unsolicited path.
#[derive(Debug)]
pub struct TemplateAssembler {
    state: AssemblerState,
    slot: Option<SensorSlot>,
    hex: String,
}

#[derive(serde::Deserialize)]
struct TransferStatus {
    status: String,
    sensor_id: Option<SensorSlot>,
}

impl TemplateAssembler {
    /// Create an assembler waiting for the start marker.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: AssemblerState::WaitingStart,
            slot: None,
            hex: String::with_capacity(HEX_CHUNK_LEN * 8),
        }
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> AssemblerState {
        self.state
    }

    /// Slot announced by the start marker, once seen.
    #[must_use]
    pub fn slot(&self) -> Option<SensorSlot> {
        self.slot
    }

    /// Feed one line from the device.
    ///
    /// # Errors
    /// Returns `Error::TransferFailed` when the device reports an export
    /// error or the accumulated payload exceeds the size bound, and
    /// `Error::InvalidHex` when a payload frame carries non-hex characters.
    pub fn push_line(&mut self, line: &str) -> Result<AssemblerStep> {
        let line = line.trim();
        match self.state {
            AssemblerState::WaitingStart => self.handle_waiting_start(line),
            AssemblerState::ReadingChunks => self.handle_reading_chunks(line),
            AssemblerState::Done => Err(Error::TransferFailed(
                "line fed after transfer completed".to_string(),
            )),
        }
    }

    /// Consume the assembler and decode the accumulated payload.
    ///
    /// # Errors
    /// Returns `Error::TransferFailed` if the end marker never arrived, and
    /// `Error::InvalidHex` if the accumulated text has an odd length.
    pub fn into_bytes(self) -> Result<Vec<u8>> {
        if self.state != AssemblerState::Done {
            return Err(Error::TransferFailed(
                "end marker never arrived".to_string(),
            ));
        }
        decode_hex(&self.hex)
    }

    fn handle_waiting_start(&mut self, line: &str) -> Result<AssemblerStep> {
        let Some(status) = parse_status(line) else {
            return Ok(AssemblerStep::Ignored);
        };
        if status.status == EXPORT_START_STATUS {
            self.slot = status.sensor_id;
            self.state = AssemblerState::ReadingChunks;
            Ok(AssemblerStep::Continue)
        } else {
            Ok(AssemblerStep::Ignored)
        }
    }

    fn handle_reading_chunks(&mut self, line: &str) -> Result<AssemblerStep> {
        if let Some(chunk) = line.strip_prefix(EXPORT_CHUNK_PREFIX) {
            return self.accumulate_chunk(chunk.trim());
        }
        if let Some(status) = parse_status(line) {
            return match status.status.as_str() {
                EXPORT_DONE_STATUS => {
                    self.state = AssemblerState::Done;
                    Ok(AssemblerStep::Complete)
                }
                EXPORT_START_STATUS => Err(Error::TransferFailed(
                    "nested start marker mid-transfer".to_string(),
                )),
                other => Err(Error::TransferFailed(format!(
                    "device aborted export: {other}"
                ))),
            };
        }
        Ok(AssemblerStep::Ignored)
    }

    fn accumulate_chunk(&mut self, chunk: &str) -> Result<AssemblerStep> {
        if !chunk.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(Error::InvalidHex(
                "payload frame carries non-hex characters".to_string(),
            ));
        }
        if self.hex.len() + chunk.len() > MAX_TEMPLATE_HEX_LEN {
            return Err(Error::TransferFailed(format!(
                "template exceeds {MAX_TEMPLATE_HEX_LEN} hex chars"
            )));
        }
        self.hex.push_str(chunk);
        Ok(AssemblerStep::Continue)
    }
}

impl Default for TemplateAssembler {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse a transfer status marker, ignoring event lines and non-JSON text.
fn parse_status(line: &str) -> Option<TransferStatus> {
    if !line.starts_with('{') || line.contains("\"event\"") {
        return None;
    }
    serde_json::from_str(line).ok()
}

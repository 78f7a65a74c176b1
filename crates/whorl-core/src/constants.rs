//! Core constants for the fingerprint bridge and its device line protocol.
//!
//! This module centralizes every protocol-level and timing constant shared by
//! the bridge, the transport layer, and the backend correlation service.
//! Keeping them in one place guarantees that the bridge, its tests, and the
//! device simulators agree on chunk sizes, slot ranges, and deadlines.
//!
//! # Line Protocol Structure
//!
//! The sensor speaks a newline-terminated text protocol over a single serial
//! channel:
//!
//! ```text
//! ENROLL:12\n                 <- command (bridge -> device)
//! {"status":"enroll_ok"}\n    <- response (device -> bridge)
//! {"event":"match_found",...} <- unsolicited event (device -> bridge)
//! [BOOT] sensor ready\n       <- free-text banner (device -> bridge)
//! ```
//!
//! Commands carry at most one `:`-separated argument. Template payloads are
//! hex text split into fixed-size chunks ([`HEX_CHUNK_LEN`]) bracketed by
//! start and end markers, because a full template does not fit the device's
//! single-line serial buffer.
//!
//! # Usage
//!
//! ```
//! use whorl_core::constants::*;
//! use std::time::Duration;
//!
//! // Slot validation
//! fn slot_in_range(slot: u8) -> bool {
//!     (MIN_SENSOR_SLOT..=MAX_SENSOR_SLOT).contains(&slot)
//! }
//!
//! // Deadline configuration
//! let deadline = Duration::from_millis(DEFAULT_COMMAND_TIMEOUT_MS);
//! assert_eq!(deadline.as_secs(), 5);
//! ```

// ============================================================================
// Sensor Slot Range
// ============================================================================

/// Minimum valid template slot on the sensor.
///
/// Slot 0 is reserved by the sensor firmware for the capture buffer and is
/// never a valid storage target.
///
/// # Value: 1
pub const MIN_SENSOR_SLOT: u8 = 1;

/// Maximum valid template slot on the sensor.
///
/// The attached capacitive sensor family stores up to 200 templates in its
/// internal flash library; slots above this do not exist on the hardware.
///
/// # Value: 200
pub const MAX_SENSOR_SLOT: u8 = 200;

// ============================================================================
// Template Transfer Framing
// ============================================================================

/// Hex characters per template transfer chunk.
///
/// Template payloads are hex-encoded and split into chunks of this size so
/// that every frame fits comfortably inside the device's line buffer. The
/// final chunk may be shorter; all others are exactly this long.
///
/// # Value: 512 hex characters (256 payload bytes per frame)
///
/// # Examples
///
/// ```
/// use whorl_core::constants::HEX_CHUNK_LEN;
///
/// let payload_hex_len: usize = 1537 * 2;
/// let frames = payload_hex_len.div_ceil(HEX_CHUNK_LEN);
/// assert_eq!(frames, 7);
/// ```
pub const HEX_CHUNK_LEN: usize = 512;

/// Maximum accumulated hex length for a single template transfer.
///
/// DoS guard for the extraction direction: a device (or a corrupted stream)
/// that keeps emitting data frames without ever sending the end marker must
/// not grow the reassembly buffer without bound. Real templates for this
/// sensor family are under 4 KiB of hex; the limit leaves a wide margin.
///
/// # Value: 32768 hex characters (16 KiB of template data)
pub const MAX_TEMPLATE_HEX_LEN: usize = 32768;

/// Maximum accepted length for any single line read from the device.
///
/// Lines beyond this are discarded as noise rather than buffered. The
/// longest legitimate line is a data frame: marker prefix plus
/// [`HEX_CHUNK_LEN`] characters.
///
/// # Value: 4096 bytes
pub const MAX_LINE_LENGTH: usize = 4096;

// ============================================================================
// Timeout Configuration
// ============================================================================

/// Default deadline for a non-interactive command exchange (milliseconds).
///
/// Applies to commands the device answers from software state alone
/// (delete, wipe, batch bookkeeping). On expiry the dispatcher reports a
/// timeout and any later response line for that command is discarded.
///
/// # Value: 5000ms (5 seconds)
pub const DEFAULT_COMMAND_TIMEOUT_MS: u64 = 5000;

/// Deadline for commands that wait on a finger placement (milliseconds).
///
/// Enrollment and scan-and-compare block until a person actually touches
/// the sensor, so their deadline is human-scale rather than wire-scale.
///
/// # Value: 30000ms (30 seconds)
pub const INTERACTIVE_COMMAND_TIMEOUT_MS: u64 = 30000;

/// Overall deadline for a whole template transfer (milliseconds).
///
/// Extraction spans many lines; the deadline bounds the complete transfer,
/// not each line. A transfer that has not reached its end marker when this
/// expires is a failed transfer.
///
/// # Value: 30000ms (30 seconds)
pub const TRANSFER_TIMEOUT_MS: u64 = 30000;

/// Delay between serial reconnect attempts (milliseconds).
///
/// The failure mode is an unplugged cable or a resetting microcontroller,
/// not load, so a fixed delay is used instead of exponential backoff. The
/// transport retries indefinitely; the device is expected to reappear.
///
/// # Value: 2000ms (2 seconds)
pub const RECONNECT_DELAY_MS: u64 = 2000;

/// Pause between consecutive chunk writes during an upload (milliseconds).
///
/// The device drains its UART buffer slower than the host can fill it;
/// pacing the frames avoids overrunning the firmware's line assembly.
///
/// # Value: 20ms
pub const CHUNK_PACING_MS: u64 = 20;

// ============================================================================
// Event Forwarding
// ============================================================================

/// HTTP timeout for a single `log_access` call to the backend (milliseconds).
///
/// # Value: 5000ms (5 seconds)
pub const FORWARD_TIMEOUT_MS: u64 = 5000;

/// Delivery attempts per forwarded event before it is logged and dropped.
///
/// Forwarding is best effort: it must never block the serial reader, so a
/// backend outage costs at most a bounded number of short retries.
///
/// # Value: 3
pub const FORWARD_MAX_ATTEMPTS: u32 = 3;

/// Delay between event forwarding attempts (milliseconds).
///
/// # Value: 500ms
pub const FORWARD_RETRY_DELAY_MS: u64 = 500;

// ============================================================================
// Access Correlation
// ============================================================================

/// Lookback horizon for pending access records (seconds).
///
/// An operator poll only surfaces a pending access created within this many
/// seconds; older unresolved records are treated as expired without being
/// deleted. The window is deliberately short: the person who touched the
/// sensor is still standing at the door.
///
/// # Value: 30 seconds
pub const PENDING_LOOKBACK_SECS: i64 = 30;

// ============================================================================
// Serial Defaults
// ============================================================================

/// Default serial baud rate for the sensor link.
///
/// # Value: 9600
pub const DEFAULT_BAUD_RATE: u32 = 9600;

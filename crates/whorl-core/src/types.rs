use crate::{
    Result,
    constants::{MAX_SENSOR_SLOT, MIN_SENSOR_SLOT},
    error::Error,
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Sensor template slot (1-200).
///
/// The device-side storage index for one enrolled fingerprint template.
/// Slot 0 is the firmware's capture buffer and is never addressable here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct SensorSlot(u8);

impl SensorSlot {
    /// Create a new sensor slot with validation.
    ///
    /// # Errors
    /// Returns `Error::InvalidSlot` if the slot is outside the valid range (1-200).
    pub fn new(slot: u8) -> Result<Self> {
        if !(MIN_SENSOR_SLOT..=MAX_SENSOR_SLOT).contains(&slot) {
            return Err(Error::InvalidSlot(format!(
                "slot must be {MIN_SENSOR_SLOT}-{MAX_SENSOR_SLOT}, got {slot}"
            )));
        }
        Ok(SensorSlot(slot))
    }

    /// Get the raw slot index as u8.
    #[must_use]
    pub fn as_u8(&self) -> u8 {
        self.0
    }
}

impl fmt::Display for SensorSlot {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for SensorSlot {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let slot: u8 = s
            .trim()
            .parse()
            .map_err(|_| Error::InvalidSlot(format!("invalid slot: {s}")))?;
        SensorSlot::new(slot)
    }
}

impl TryFrom<u8> for SensorSlot {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self> {
        SensorSlot::new(value)
    }
}

impl From<SensorSlot> for u8 {
    fn from(slot: SensorSlot) -> u8 {
        slot.0
    }
}

/// Access context for a recorded event: which side of the door the bridge
/// serves.
///
/// Threaded explicitly through every `record_access` call rather than held
/// as ambient state; a bridge process is deployed for exactly one side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessContext {
    Entry,
    Exit,
}

impl AccessContext {
    /// Parse an access context from its wire/storage form.
    ///
    /// # Errors
    /// Returns `Error::Config` if the value is neither `entry` nor `exit`.
    pub fn parse(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "entry" => Ok(AccessContext::Entry),
            "exit" => Ok(AccessContext::Exit),
            other => Err(Error::Config(format!(
                "access context must be entry or exit, got {other}"
            ))),
        }
    }

    /// Wire/storage form of the context.
    #[inline]
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            AccessContext::Entry => "entry",
            AccessContext::Exit => "exit",
        }
    }

    /// Returns `true` for the entry side.
    #[inline]
    #[must_use]
    pub fn is_entry(self) -> bool {
        matches!(self, AccessContext::Entry)
    }
}

impl fmt::Display for AccessContext {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for AccessContext {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        AccessContext::parse(s)
    }
}

/// Lifecycle state of a pending access record.
///
/// `Pending` and `Confirmed` are stored; `Expired` is never written — it is
/// what a `Pending` record becomes once it falls outside the lookback
/// horizon, and exists so callers can name that state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessStatus {
    Pending,
    Confirmed,
    Expired,
}

impl AccessStatus {
    /// Parse a status from its storage form.
    ///
    /// # Errors
    /// Returns `Error::Config` on an unknown status string.
    pub fn parse(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(AccessStatus::Pending),
            "confirmed" => Ok(AccessStatus::Confirmed),
            "expired" => Ok(AccessStatus::Expired),
            other => Err(Error::Config(format!("unknown access status: {other}"))),
        }
    }

    /// Storage form of the status.
    #[inline]
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            AccessStatus::Pending => "pending",
            AccessStatus::Confirmed => "confirmed",
            AccessStatus::Expired => "expired",
        }
    }

    /// Returns `true` if the record still awaits an operator confirmation.
    #[inline]
    #[must_use]
    pub fn is_pending(self) -> bool {
        matches!(self, AccessStatus::Pending)
    }
}

impl fmt::Display for AccessStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for AccessStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        AccessStatus::parse(s)
    }
}

//! Unsolicited line classification: sensor events and banners.
//!
//! The sensor emits two kinds of lines the host never asked for: structured
//! JSON events tagged with an `"event"` key, and free-text banners the
//! firmware prints during boot and normal operation (`[BOOT] sensor ready`).
//! Events drive access recording; banners are logged at a level matching
//! their prefix and dropped.

use serde::{Deserialize, Serialize};
use whorl_core::SensorSlot;

/// An unsolicited structured event from the sensor.
///
/// Exactly one event is emitted per physical scan. The JSON wire form is
/// tagged by the `event` key:
///
/// ```text
/// {"event":"match_found","sensor_id":7,"confidence":143}
/// {"event":"match_failed"}
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SensorEvent {
    /// A finger matched the template stored in `sensor_id`.
    MatchFound {
        sensor_id: SensorSlot,
        confidence: u16,
    },
    /// A finger was read but matched nothing in the library.
    MatchFailed,
}

impl SensorEvent {
    /// Parse a line as a sensor event.
    ///
    /// Returns `None` for anything that is not a well-formed event line —
    /// including JSON objects without an `event` key and events of unknown
    /// kind, which the caller treats as noise.
    #[must_use]
    pub fn parse(line: &str) -> Option<Self> {
        if !line.trim_start().starts_with('{') {
            return None;
        }
        serde_json::from_str(line).ok()
    }

    /// Returns `true` for a successful match.
    #[must_use]
    pub fn is_match(&self) -> bool {
        matches!(self, Self::MatchFound { .. })
    }
}

/// Severity class of a free-text banner line, derived from its prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BannerKind {
    Status,
    Boot,
    Info,
    Debug,
    /// Anything without a recognized prefix, including unattributed JSON.
    Other,
}

impl BannerKind {
    /// Classify a banner line by its firmware prefix.
    #[must_use]
    pub fn classify(line: &str) -> Self {
        let line = line.trim_start();
        if line.starts_with("[STATUS]") {
            Self::Status
        } else if line.starts_with("[BOOT]") {
            Self::Boot
        } else if line.starts_with("[INFO]") {
            Self::Info
        } else if line.starts_with("[DEBUG]") {
            Self::Debug
        } else {
            Self::Other
        }
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use whorl_core::{AccessContext, AccessStatus};

/// One recorded scan report, matched or not.
///
/// Every `record_access` call inserts exactly one row. Matched rows start
/// life as `pending` and become `confirmed` when an operator resolves the
/// room; unmatched rows (failed scans, unknown slots) are plain log
/// entries that never surface through the pending lookup.
///
/// # Fields
///
/// * `id` - Auto-increment primary key
/// * `user_id` - Resolved identity (NULL for unmatched rows, or after the
///   user is deleted)
/// * `room_id` - Confirmed room (NULL until `confirm_room`)
/// * `context` - `entry` or `exit`; use [`get_context`](Self::get_context)
///   for the enum
/// * `matched` - Whether the sensor reported a successful match that
///   resolved to a user
/// * `confidence` - Device match score, when reported
/// * `reason` - Why an unmatched row exists (e.g. `match_failed`)
/// * `status` - `pending` or `confirmed`; use
///   [`get_status`](Self::get_status) for the enum
/// * `created_at` - Event time, written by the service on insert
///
/// # Lifecycle
///
/// `Pending` rows older than the lookback horizon are implicitly expired:
/// nothing rewrites them, they simply stop surfacing. The audit trail is
/// append-plus-one-update only.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct AccessEvent {
    /// Auto-increment primary key
    pub id: i64,

    /// Resolved identity; NULL for unmatched rows
    pub user_id: Option<i64>,

    /// Confirmed room; NULL until an operator confirms
    pub room_id: Option<i64>,

    /// Which side of the door the reporting bridge serves (`entry`/`exit`)
    pub context: String,

    /// Whether the scan resolved to an enrolled user
    pub matched: bool,

    /// Device match score, when reported
    pub confidence: Option<i64>,

    /// Why an unmatched row exists
    pub reason: Option<String>,

    /// Record lifecycle state (`pending`/`confirmed`)
    pub status: String,

    /// Event time, written by the service on insert
    pub created_at: DateTime<Utc>,
}

impl AccessEvent {
    /// A successful match resolved to `user_id`, awaiting room confirmation.
    pub fn matched(user_id: i64, context: AccessContext, confidence: Option<u16>) -> Self {
        Self {
            id: 0, // Will be set by database
            user_id: Some(user_id),
            room_id: None,
            context: context.as_str().to_string(),
            matched: true,
            confidence: confidence.map(i64::from),
            reason: None,
            status: AccessStatus::Pending.as_str().to_string(),
            created_at: Utc::now(),
        }
    }

    /// A scan that resolved to nobody; stored for the audit trail only.
    pub fn unmatched(context: AccessContext, reason: impl Into<String>) -> Self {
        Self {
            id: 0, // Will be set by database
            user_id: None,
            room_id: None,
            context: context.as_str().to_string(),
            matched: false,
            confidence: None,
            reason: Some(reason.into()),
            status: AccessStatus::Pending.as_str().to_string(),
            created_at: Utc::now(),
        }
    }

    /// Get the access context as an enum
    pub fn get_context(&self) -> Option<AccessContext> {
        AccessContext::parse(&self.context).ok()
    }

    /// Get the lifecycle status as an enum
    pub fn get_status(&self) -> Option<AccessStatus> {
        AccessStatus::parse(&self.status).ok()
    }

    /// Check if this row still awaits an operator confirmation
    pub fn is_pending(&self) -> bool {
        self.status == AccessStatus::Pending.as_str()
    }
}

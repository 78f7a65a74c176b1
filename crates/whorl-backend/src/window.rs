//! Access correlation window.
//!
//! The sensor knows *who* touched it but not which room they are headed
//! for; the operator UI knows the room but not the identity. This service
//! joins the two halves: bridge scan reports become access event rows,
//! operators poll for the most recent unresolved one, and a single
//! confirmation resolves it to a room.
//!
//! Correlation is time-bounded. A pending record only surfaces while it is
//! younger than the lookback horizon (default
//! [`PENDING_LOOKBACK_SECS`] seconds); after that it is implicitly
//! expired — never deleted, never rewritten, just no longer offered.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tracing::{info, warn};

use whorl_core::constants::PENDING_LOOKBACK_SECS;
use whorl_core::{AccessContext, SensorSlot};

use crate::error::{StorageError, StorageResult};
use crate::models::{AccessEvent, Room};
use crate::repositories::{
    AccessEventRepository, FingerprintRepository, RoomRepository, SqliteAccessEventRepository,
    SqliteFingerprintRepository, SqliteRoomRepository, SqliteUserRepository, UserRepository,
};

/// One scan report from a bridge, as posted to `/log_access`.
///
/// Mirrors the bridge forwarder's payload: a successful match carries the
/// slot and score, a failed scan carries only a reason.
#[derive(Debug, Clone, Deserialize)]
pub struct AccessReport {
    /// Device template slot of the matched finger, when the scan matched
    pub sensor_id: Option<SensorSlot>,
    /// Device match score, when reported
    pub confidence: Option<u16>,
    /// Which side of the door the reporting bridge serves
    pub context: AccessContext,
    /// Why there is no identity (failed scans only)
    pub reason: Option<String>,
}

/// Operator-facing view of the unresolved access at the door.
///
/// Flattens the matched user onto the record and carries the user's
/// authorized rooms as confirmation candidates.
#[derive(Debug, Clone, Serialize)]
pub struct PendingAccess {
    pub access_id: i64,
    pub user_id: i64,
    pub user_name: String,
    pub badge_code: String,
    pub context: String,
    pub confidence: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub room_candidates: Vec<Room>,
}

/// Correlation service over the SQLite repositories.
pub struct AccessWindow {
    users: SqliteUserRepository,
    rooms: SqliteRoomRepository,
    fingerprints: SqliteFingerprintRepository,
    events: SqliteAccessEventRepository,
    lookback: Duration,
}

impl AccessWindow {
    /// Create a window with the default lookback horizon.
    pub fn new(pool: SqlitePool) -> Self {
        Self::with_lookback(pool, PENDING_LOOKBACK_SECS)
    }

    /// Create a window with an explicit lookback horizon in seconds.
    pub fn with_lookback(pool: SqlitePool, lookback_secs: i64) -> Self {
        Self {
            users: SqliteUserRepository::new(pool.clone()),
            rooms: SqliteRoomRepository::new(pool.clone()),
            fingerprints: SqliteFingerprintRepository::new(pool.clone()),
            events: SqliteAccessEventRepository::new(pool),
            lookback: Duration::seconds(lookback_secs),
        }
    }

    /// Record one scan report and return the stored row.
    ///
    /// A report with a slot that resolves through an active fingerprint
    /// becomes a matched pending row. Everything else (no slot, unknown
    /// slot, retired slot) becomes an unmatched audit row that never
    /// surfaces as pending.
    pub async fn record_access(&self, report: AccessReport) -> StorageResult<AccessEvent> {
        let Some(slot) = report.sensor_id else {
            let reason = report.reason.unwrap_or_else(|| "match_failed".to_string());
            return self.store(AccessEvent::unmatched(report.context, reason)).await;
        };

        let Some(fingerprint) = self.fingerprints.find_active_by_slot(slot).await? else {
            warn!(slot = %slot, "Match reported for a slot with no active enrollment");
            return self
                .store(AccessEvent::unmatched(report.context, "unknown sensor slot"))
                .await;
        };

        let event = AccessEvent::matched(fingerprint.user_id, report.context, report.confidence);
        let stored = self.store(event).await?;
        info!(
            access_id = stored.id,
            user_id = fingerprint.user_id,
            slot = %slot,
            context = %stored.context,
            "Access recorded"
        );
        Ok(stored)
    }

    /// The most recent unresolved access within the lookback horizon, with
    /// its room candidates loaded; `None` when the door is quiet.
    pub async fn lookup_pending_access(&self) -> StorageResult<Option<PendingAccess>> {
        let cutoff = Utc::now() - self.lookback;
        let Some(event) = self.events.latest_pending_since(cutoff).await? else {
            return Ok(None);
        };

        // The query filters on user_id IS NOT NULL; a vanished user since
        // then just means there is nothing to confirm.
        let Some(user_id) = event.user_id else {
            return Ok(None);
        };
        let Some(user) = self.users.find_by_id(user_id).await? else {
            return Ok(None);
        };

        let room_candidates = self.rooms.find_authorized(user.id).await?;

        Ok(Some(PendingAccess {
            access_id: event.id,
            user_id: user.id,
            user_name: user.name,
            badge_code: user.badge_code,
            context: event.context,
            confidence: event.confidence,
            created_at: event.created_at,
            room_candidates,
        }))
    }

    /// Resolve a pending access to a room.
    ///
    /// # Errors
    ///
    /// `NotFound` when either id is unknown (an unmatched audit row counts
    /// as unknown — it was never confirmable), `AlreadyConfirmed` when the
    /// record has been resolved before.
    pub async fn confirm_room(&self, access_id: i64, room_id: i64) -> StorageResult<()> {
        let Some(event) = self.events.find_by_id(access_id).await? else {
            return Err(StorageError::not_found("PendingAccess", "id", access_id));
        };
        if !event.matched {
            return Err(StorageError::not_found("PendingAccess", "id", access_id));
        }
        if self.rooms.find_by_id(room_id).await?.is_none() {
            return Err(StorageError::not_found("Room", "id", room_id));
        }
        if !event.is_pending() {
            return Err(StorageError::AlreadyConfirmed { access_id });
        }

        // The repository re-checks the status inside the UPDATE; losing
        // that race reads the same as confirming twice.
        if !self.events.confirm(access_id, room_id).await? {
            return Err(StorageError::AlreadyConfirmed { access_id });
        }

        info!(access_id, room_id, "Access confirmed");
        Ok(())
    }

    /// All rooms `user_id` may be confirmed into.
    ///
    /// # Errors
    /// `NotFound` when the user does not exist (an empty room list is a
    /// valid answer for a real user).
    pub async fn list_authorized_rooms(&self, user_id: i64) -> StorageResult<Vec<Room>> {
        if self.users.find_by_id(user_id).await?.is_none() {
            return Err(StorageError::not_found("User", "id", user_id));
        }
        self.rooms.find_authorized(user_id).await
    }

    async fn store(&self, mut event: AccessEvent) -> StorageResult<AccessEvent> {
        event.id = self.events.create(&event).await?;
        Ok(event)
    }
}

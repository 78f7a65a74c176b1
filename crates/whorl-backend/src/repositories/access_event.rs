#![allow(async_fn_in_trait)]

use crate::error::StorageResult;
use crate::models::AccessEvent;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

/// Repository trait for the access event log.
///
/// `created_at` is always bound from the model rather than defaulted by
/// the database, so every row carries the same timestamp encoding and the
/// lookback comparison in [`latest_pending_since`] stays well ordered.
///
/// [`latest_pending_since`]: AccessEventRepository::latest_pending_since
pub trait AccessEventRepository: Send + Sync {
    /// Create a new access event row
    async fn create(&self, event: &AccessEvent) -> StorageResult<i64>;

    /// Find an access event by its ID
    async fn find_by_id(&self, id: i64) -> StorageResult<Option<AccessEvent>>;

    /// The most recent matched, still-pending event created at or after
    /// `cutoff`; older unresolved rows are implicitly expired
    async fn latest_pending_since(
        &self,
        cutoff: DateTime<Utc>,
    ) -> StorageResult<Option<AccessEvent>>;

    /// Resolve a pending event to a room. Returns `false` when the row was
    /// not pending anymore (confirmed concurrently or never confirmable)
    async fn confirm(&self, id: i64, room_id: i64) -> StorageResult<bool>;

    /// Most recent events, newest first (audit listing)
    async fn find_recent(&self, limit: i64) -> StorageResult<Vec<AccessEvent>>;
}

/// SQLite implementation of AccessEventRepository
pub struct SqliteAccessEventRepository {
    pool: SqlitePool,
}

impl SqliteAccessEventRepository {
    /// Create a new SQLite access event repository
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

impl AccessEventRepository for SqliteAccessEventRepository {
    async fn create(&self, event: &AccessEvent) -> StorageResult<i64> {
        let result = sqlx::query(
            r#"
            INSERT INTO access_events (
                user_id, room_id, context, matched,
                confidence, reason, status, created_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(event.user_id)
        .bind(event.room_id)
        .bind(&event.context)
        .bind(event.matched)
        .bind(event.confidence)
        .bind(&event.reason)
        .bind(&event.status)
        .bind(event.created_at)
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    async fn find_by_id(&self, id: i64) -> StorageResult<Option<AccessEvent>> {
        let event = sqlx::query_as::<_, AccessEvent>(
            r#"
            SELECT id, user_id, room_id, context, matched,
                   confidence, reason, status, created_at
            FROM access_events
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(event)
    }

    async fn latest_pending_since(
        &self,
        cutoff: DateTime<Utc>,
    ) -> StorageResult<Option<AccessEvent>> {
        // The id tiebreak keeps the result deterministic when two matches
        // land within the same timestamp granule.
        let event = sqlx::query_as::<_, AccessEvent>(
            r#"
            SELECT id, user_id, room_id, context, matched,
                   confidence, reason, status, created_at
            FROM access_events
            WHERE status = 'pending'
              AND matched = 1
              AND user_id IS NOT NULL
              AND created_at >= ?
            ORDER BY created_at DESC, id DESC
            LIMIT 1
            "#,
        )
        .bind(cutoff)
        .fetch_optional(&self.pool)
        .await?;

        Ok(event)
    }

    async fn confirm(&self, id: i64, room_id: i64) -> StorageResult<bool> {
        // The status guard re-runs inside the UPDATE, so two concurrent
        // confirms cannot both succeed.
        let result = sqlx::query(
            r#"
            UPDATE access_events
            SET room_id = ?, status = 'confirmed'
            WHERE id = ? AND matched = 1 AND status = 'pending'
            "#,
        )
        .bind(room_id)
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn find_recent(&self, limit: i64) -> StorageResult<Vec<AccessEvent>> {
        let events = sqlx::query_as::<_, AccessEvent>(
            r#"
            SELECT id, user_id, room_id, context, matched,
                   confidence, reason, status, created_at
            FROM access_events
            ORDER BY created_at DESC, id DESC
            LIMIT ?
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::Database;
    use crate::models::{Room, User};
    use crate::repositories::room::{RoomRepository, SqliteRoomRepository};
    use crate::repositories::user::{SqliteUserRepository, UserRepository};
    use chrono::Duration;
    use whorl_core::AccessContext;

    async fn setup_test_db() -> Database {
        Database::in_memory().await.unwrap()
    }

    async fn seed_user(db: &Database) -> i64 {
        SqliteUserRepository::new(db.pool().clone())
            .create(&User::new("Ana", "A1"))
            .await
            .unwrap()
    }

    async fn seed_room(db: &Database) -> i64 {
        SqliteRoomRepository::new(db.pool().clone())
            .create(&Room::new("Lab 2", None))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_create_and_find_event() {
        let db = setup_test_db().await;
        let repo = SqliteAccessEventRepository::new(db.pool().clone());
        let user_id = seed_user(&db).await;

        let id = repo
            .create(&AccessEvent::matched(user_id, AccessContext::Entry, Some(181)))
            .await
            .unwrap();

        let found = repo.find_by_id(id).await.unwrap().unwrap();
        assert_eq!(found.user_id, Some(user_id));
        assert_eq!(found.context, "entry");
        assert!(found.matched);
        assert_eq!(found.confidence, Some(181));
        assert!(found.is_pending());
    }

    #[tokio::test]
    async fn test_latest_pending_prefers_newest() {
        let db = setup_test_db().await;
        let repo = SqliteAccessEventRepository::new(db.pool().clone());
        let user_id = seed_user(&db).await;

        let mut older = AccessEvent::matched(user_id, AccessContext::Entry, None);
        older.created_at = Utc::now() - Duration::seconds(10);
        repo.create(&older).await.unwrap();

        let newest = repo
            .create(&AccessEvent::matched(user_id, AccessContext::Entry, Some(90)))
            .await
            .unwrap();

        let cutoff = Utc::now() - Duration::seconds(30);
        let found = repo.latest_pending_since(cutoff).await.unwrap().unwrap();
        assert_eq!(found.id, newest);
    }

    #[tokio::test]
    async fn test_rows_outside_horizon_are_expired() {
        let db = setup_test_db().await;
        let repo = SqliteAccessEventRepository::new(db.pool().clone());
        let user_id = seed_user(&db).await;

        let mut stale = AccessEvent::matched(user_id, AccessContext::Entry, None);
        stale.created_at = Utc::now() - Duration::seconds(40);
        repo.create(&stale).await.unwrap();

        let cutoff = Utc::now() - Duration::seconds(30);
        assert!(repo.latest_pending_since(cutoff).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_unmatched_rows_never_surface() {
        let db = setup_test_db().await;
        let repo = SqliteAccessEventRepository::new(db.pool().clone());

        repo.create(&AccessEvent::unmatched(AccessContext::Entry, "match_failed"))
            .await
            .unwrap();

        let cutoff = Utc::now() - Duration::seconds(30);
        assert!(repo.latest_pending_since(cutoff).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_confirm_is_single_shot() {
        let db = setup_test_db().await;
        let repo = SqliteAccessEventRepository::new(db.pool().clone());
        let user_id = seed_user(&db).await;
        let room_id = seed_room(&db).await;

        let id = repo
            .create(&AccessEvent::matched(user_id, AccessContext::Entry, None))
            .await
            .unwrap();

        assert!(repo.confirm(id, room_id).await.unwrap());
        assert!(!repo.confirm(id, room_id).await.unwrap());

        let confirmed = repo.find_by_id(id).await.unwrap().unwrap();
        assert_eq!(confirmed.room_id, Some(room_id));
        assert!(!confirmed.is_pending());

        // A confirmed row no longer surfaces as pending.
        let cutoff = Utc::now() - Duration::seconds(30);
        assert!(repo.latest_pending_since(cutoff).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_confirm_never_touches_unmatched_rows() {
        let db = setup_test_db().await;
        let repo = SqliteAccessEventRepository::new(db.pool().clone());
        let room_id = seed_room(&db).await;

        let id = repo
            .create(&AccessEvent::unmatched(AccessContext::Exit, "match_failed"))
            .await
            .unwrap();

        assert!(!repo.confirm(id, room_id).await.unwrap());
        let row = repo.find_by_id(id).await.unwrap().unwrap();
        assert_eq!(row.room_id, None);
    }

    #[tokio::test]
    async fn test_find_recent_newest_first() {
        let db = setup_test_db().await;
        let repo = SqliteAccessEventRepository::new(db.pool().clone());
        let user_id = seed_user(&db).await;

        let mut first = AccessEvent::matched(user_id, AccessContext::Entry, None);
        first.created_at = Utc::now() - Duration::seconds(2);
        repo.create(&first).await.unwrap();
        repo.create(&AccessEvent::unmatched(AccessContext::Entry, "match_failed"))
            .await
            .unwrap();

        let recent = repo.find_recent(10).await.unwrap();
        assert_eq!(recent.len(), 2);
        assert!(!recent[0].matched);
        assert!(recent[1].matched);
    }
}

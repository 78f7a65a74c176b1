#![allow(async_fn_in_trait)]

use crate::error::{StorageError, StorageResult};
use crate::models::Fingerprint;
use sqlx::SqlitePool;
use whorl_core::SensorSlot;

/// Repository trait for the slot-to-user fingerprint mapping.
pub trait FingerprintRepository: Send + Sync {
    /// Create a new fingerprint record
    async fn create(&self, fingerprint: &Fingerprint) -> StorageResult<i64>;

    /// Resolve a device slot to its fingerprint, active records only
    async fn find_active_by_slot(&self, slot: SensorSlot) -> StorageResult<Option<Fingerprint>>;

    /// All fingerprints enrolled for a user, active or not
    async fn find_by_user(&self, user_id: i64) -> StorageResult<Vec<Fingerprint>>;

    /// Retire a slot without deleting its enrollment history
    async fn deactivate(&self, slot: SensorSlot) -> StorageResult<()>;
}

/// SQLite implementation of FingerprintRepository
pub struct SqliteFingerprintRepository {
    pool: SqlitePool,
}

impl SqliteFingerprintRepository {
    /// Create a new SQLite fingerprint repository
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

impl FingerprintRepository for SqliteFingerprintRepository {
    async fn create(&self, fingerprint: &Fingerprint) -> StorageResult<i64> {
        let result = sqlx::query(
            r#"
            INSERT INTO fingerprints (user_id, sensor_slot, finger_label, active)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(fingerprint.user_id)
        .bind(fingerprint.sensor_slot)
        .bind(&fingerprint.finger_label)
        .bind(fingerprint.active)
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    async fn find_active_by_slot(&self, slot: SensorSlot) -> StorageResult<Option<Fingerprint>> {
        let fingerprint = sqlx::query_as::<_, Fingerprint>(
            r#"
            SELECT id, user_id, sensor_slot, finger_label, active, created_at
            FROM fingerprints
            WHERE sensor_slot = ? AND active = 1
            "#,
        )
        .bind(slot.as_u8())
        .fetch_optional(&self.pool)
        .await?;

        Ok(fingerprint)
    }

    async fn find_by_user(&self, user_id: i64) -> StorageResult<Vec<Fingerprint>> {
        let fingerprints = sqlx::query_as::<_, Fingerprint>(
            r#"
            SELECT id, user_id, sensor_slot, finger_label, active, created_at
            FROM fingerprints
            WHERE user_id = ?
            ORDER BY sensor_slot
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(fingerprints)
    }

    async fn deactivate(&self, slot: SensorSlot) -> StorageResult<()> {
        let result = sqlx::query("UPDATE fingerprints SET active = 0 WHERE sensor_slot = ?")
            .bind(slot.as_u8())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StorageError::not_found("Fingerprint", "sensor_slot", slot));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::Database;
    use crate::models::User;
    use crate::repositories::user::{SqliteUserRepository, UserRepository};

    async fn setup_test_db() -> Database {
        Database::in_memory().await.unwrap()
    }

    fn slot(n: u8) -> SensorSlot {
        SensorSlot::new(n).unwrap()
    }

    async fn seed_user(db: &Database) -> i64 {
        SqliteUserRepository::new(db.pool().clone())
            .create(&User::new("Ana", "A1"))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_slot_resolves_to_fingerprint() {
        let db = setup_test_db().await;
        let repo = SqliteFingerprintRepository::new(db.pool().clone());
        let user_id = seed_user(&db).await;

        repo.create(&Fingerprint::new(
            user_id,
            slot(17),
            Some("right_index".to_string()),
        ))
        .await
        .unwrap();

        let found = repo.find_active_by_slot(slot(17)).await.unwrap().unwrap();
        assert_eq!(found.user_id, user_id);
        assert_eq!(found.sensor_slot, 17);
        assert_eq!(found.finger_label.as_deref(), Some("right_index"));

        assert!(repo.find_active_by_slot(slot(18)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_deactivated_slot_no_longer_resolves() {
        let db = setup_test_db().await;
        let repo = SqliteFingerprintRepository::new(db.pool().clone());
        let user_id = seed_user(&db).await;

        repo.create(&Fingerprint::new(user_id, slot(5), None))
            .await
            .unwrap();
        repo.deactivate(slot(5)).await.unwrap();

        assert!(repo.find_active_by_slot(slot(5)).await.unwrap().is_none());
        // The record itself survives for enrollment history.
        let all = repo.find_by_user(user_id).await.unwrap();
        assert_eq!(all.len(), 1);
        assert!(!all[0].active);
    }

    #[tokio::test]
    async fn test_slot_is_unique_across_users() {
        let db = setup_test_db().await;
        let repo = SqliteFingerprintRepository::new(db.pool().clone());
        let users = SqliteUserRepository::new(db.pool().clone());
        let first = seed_user(&db).await;
        let second = users.create(&User::new("Bruno", "B2")).await.unwrap();

        repo.create(&Fingerprint::new(first, slot(9), None))
            .await
            .unwrap();
        let err = repo.create(&Fingerprint::new(second, slot(9), None)).await;
        assert!(matches!(err, Err(StorageError::Database(_))));
    }

    #[tokio::test]
    async fn test_deactivate_unknown_slot_is_not_found() {
        let db = setup_test_db().await;
        let repo = SqliteFingerprintRepository::new(db.pool().clone());

        assert!(matches!(
            repo.deactivate(slot(40)).await,
            Err(StorageError::NotFound { .. })
        ));
    }
}

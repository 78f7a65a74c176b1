#![allow(async_fn_in_trait)]

use crate::error::{StorageError, StorageResult};
use crate::models::User;
use sqlx::SqlitePool;

/// Repository trait for User entity operations
///
/// Uses native async trait methods (Edition 2024), so no async-trait
/// crate is needed.
pub trait UserRepository: Send + Sync {
    /// Find a user by their ID
    async fn find_by_id(&self, id: i64) -> StorageResult<Option<User>>;

    /// Find a user by their badge code (natural key)
    async fn find_by_badge(&self, badge_code: &str) -> StorageResult<Option<User>>;

    /// Create a new user
    async fn create(&self, user: &User) -> StorageResult<i64>;

    /// Delete a user by ID
    async fn delete(&self, id: i64) -> StorageResult<()>;
}

/// SQLite implementation of UserRepository
pub struct SqliteUserRepository {
    pool: SqlitePool,
}

impl SqliteUserRepository {
    /// Create a new SQLite user repository
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

impl UserRepository for SqliteUserRepository {
    async fn find_by_id(&self, id: i64) -> StorageResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, badge_code, created_at
            FROM users
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn find_by_badge(&self, badge_code: &str) -> StorageResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, badge_code, created_at
            FROM users
            WHERE badge_code = ?
            "#,
        )
        .bind(badge_code)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn create(&self, user: &User) -> StorageResult<i64> {
        let result = sqlx::query(
            r#"
            INSERT INTO users (name, badge_code)
            VALUES (?, ?)
            "#,
        )
        .bind(&user.name)
        .bind(&user.badge_code)
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    async fn delete(&self, id: i64) -> StorageResult<()> {
        let result = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StorageError::not_found("User", "id", id));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::Database;

    async fn setup_test_db() -> Database {
        Database::in_memory().await.unwrap()
    }

    #[tokio::test]
    async fn test_create_and_find_user() {
        let db = setup_test_db().await;
        let repo = SqliteUserRepository::new(db.pool().clone());

        let id = repo.create(&User::new("Ana Souza", "A12345")).await.unwrap();
        assert!(id > 0);

        let found = repo.find_by_id(id).await.unwrap().unwrap();
        assert_eq!(found.name, "Ana Souza");
        assert_eq!(found.badge_code, "A12345");
    }

    #[tokio::test]
    async fn test_find_by_badge() {
        let db = setup_test_db().await;
        let repo = SqliteUserRepository::new(db.pool().clone());

        repo.create(&User::new("Bruno Lima", "B0007")).await.unwrap();

        let found = repo.find_by_badge("B0007").await.unwrap();
        assert!(found.is_some());
        assert_eq!(found.unwrap().name, "Bruno Lima");

        assert!(repo.find_by_badge("ZZZ").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_badge_is_rejected() {
        let db = setup_test_db().await;
        let repo = SqliteUserRepository::new(db.pool().clone());

        repo.create(&User::new("First", "DUP1")).await.unwrap();
        let err = repo.create(&User::new("Second", "DUP1")).await;
        assert!(matches!(err, Err(StorageError::Database(_))));
    }

    #[tokio::test]
    async fn test_delete_user() {
        let db = setup_test_db().await;
        let repo = SqliteUserRepository::new(db.pool().clone());

        let id = repo.create(&User::new("Gone Soon", "G0001")).await.unwrap();
        repo.delete(id).await.unwrap();

        assert!(repo.find_by_id(id).await.unwrap().is_none());
        assert!(matches!(
            repo.delete(id).await,
            Err(StorageError::NotFound { .. })
        ));
    }
}

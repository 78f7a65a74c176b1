//! Integration tests for database connection, migrations and pooling.
//!
//! Run with: cargo test --package whorl-backend --test integration_database

use whorl_backend::connection::{Database, DatabaseConfig};
use whorl_backend::models::User;
use whorl_backend::repositories::{SqliteUserRepository, UserRepository};

#[tokio::test]
async fn test_in_memory_database() {
    let db = Database::in_memory().await.unwrap();
    db.health_check().await.unwrap();
    db.close().await;
}

#[tokio::test]
async fn test_migration_idempotency() {
    let db = Database::in_memory().await.unwrap();

    db.migrate().await.unwrap();
    db.migrate().await.unwrap();

    let result: (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name='users'")
            .fetch_one(db.pool())
            .await
            .unwrap();

    assert_eq!(result.0, 1);

    db.close().await;
}

#[tokio::test]
async fn test_concurrent_queries_share_the_pool() {
    let db = Database::in_memory().await.unwrap();

    let mut handles = vec![];
    for i in 0..10_i64 {
        let db = db.clone();
        handles.push(tokio::spawn(async move {
            let row: (i64,) = sqlx::query_as("SELECT ?")
                .bind(i)
                .fetch_one(db.pool())
                .await
                .unwrap();
            row.0
        }));
    }

    let results: Vec<_> = futures::future::join_all(handles).await;
    for (i, result) in results.into_iter().enumerate() {
        assert_eq!(result.unwrap(), i as i64);
    }

    db.close().await;
}

#[tokio::test]
async fn test_file_backed_database_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("whorl.db").to_string_lossy().into_owned();

    {
        let db = Database::new(DatabaseConfig::new(path.clone())).await.unwrap();
        SqliteUserRepository::new(db.pool().clone())
            .create(&User::new("Ana", "A1"))
            .await
            .unwrap();
        db.close().await;
    }

    let db = Database::new(DatabaseConfig::new(path)).await.unwrap();
    let found = SqliteUserRepository::new(db.pool().clone())
        .find_by_badge("A1")
        .await
        .unwrap();
    assert_eq!(found.unwrap().name, "Ana");
    db.close().await;
}

#[tokio::test]
async fn test_parent_directory_is_created() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir
        .path()
        .join("nested/deeper/whorl.db")
        .to_string_lossy()
        .into_owned();

    let db = Database::new(DatabaseConfig::new(path)).await.unwrap();
    db.health_check().await.unwrap();
    db.close().await;
}

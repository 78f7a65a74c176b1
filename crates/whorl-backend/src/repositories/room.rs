#![allow(async_fn_in_trait)]

use crate::error::StorageResult;
use crate::models::Room;
use sqlx::SqlitePool;

/// Repository trait for Room entity operations and the user-room
/// authorization join.
pub trait RoomRepository: Send + Sync {
    /// Find a room by its ID
    async fn find_by_id(&self, id: i64) -> StorageResult<Option<Room>>;

    /// Create a new room
    async fn create(&self, room: &Room) -> StorageResult<i64>;

    /// Authorize a user for a room (idempotent)
    async fn authorize(&self, user_id: i64, room_id: i64) -> StorageResult<()>;

    /// All rooms a user is authorized for, ordered by name
    async fn find_authorized(&self, user_id: i64) -> StorageResult<Vec<Room>>;
}

/// SQLite implementation of RoomRepository
pub struct SqliteRoomRepository {
    pool: SqlitePool,
}

impl SqliteRoomRepository {
    /// Create a new SQLite room repository
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

impl RoomRepository for SqliteRoomRepository {
    async fn find_by_id(&self, id: i64) -> StorageResult<Option<Room>> {
        let room = sqlx::query_as::<_, Room>(
            r#"
            SELECT id, name, description, created_at
            FROM rooms
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(room)
    }

    async fn create(&self, room: &Room) -> StorageResult<i64> {
        let result = sqlx::query(
            r#"
            INSERT INTO rooms (name, description)
            VALUES (?, ?)
            "#,
        )
        .bind(&room.name)
        .bind(&room.description)
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    async fn authorize(&self, user_id: i64, room_id: i64) -> StorageResult<()> {
        // Granting an existing authorization is a no-op; the foreign keys
        // still reject unknown users or rooms.
        sqlx::query(
            r#"
            INSERT OR IGNORE INTO user_rooms (user_id, room_id)
            VALUES (?, ?)
            "#,
        )
        .bind(user_id)
        .bind(room_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_authorized(&self, user_id: i64) -> StorageResult<Vec<Room>> {
        let rooms = sqlx::query_as::<_, Room>(
            r#"
            SELECT r.id, r.name, r.description, r.created_at
            FROM rooms r
            JOIN user_rooms ur ON ur.room_id = r.id
            WHERE ur.user_id = ?
            ORDER BY r.name
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rooms)
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

    #[tokio::test]
    async fn test_create_and_find_room() {
        let db = setup_test_db().await;
        let repo = SqliteRoomRepository::new(db.pool().clone());

        let id = repo
            .create(&Room::new("Lab 2", Some("Electronics lab".to_string())))
            .await
            .unwrap();

        let found = repo.find_by_id(id).await.unwrap().unwrap();
        assert_eq!(found.name, "Lab 2");
        assert_eq!(found.description.as_deref(), Some("Electronics lab"));
    }

    #[tokio::test]
    async fn test_authorization_join_orders_by_name() {
        let db = setup_test_db().await;
        let rooms = SqliteRoomRepository::new(db.pool().clone());
        let users = SqliteUserRepository::new(db.pool().clone());

        let user_id = users.create(&User::new("Ana", "A1")).await.unwrap();
        let lab = rooms.create(&Room::new("Lab 2", None)).await.unwrap();
        let aud = rooms.create(&Room::new("Auditorium", None)).await.unwrap();
        rooms.create(&Room::new("Server Room", None)).await.unwrap();

        rooms.authorize(user_id, lab).await.unwrap();
        rooms.authorize(user_id, aud).await.unwrap();

        let authorized = rooms.find_authorized(user_id).await.unwrap();
        let names: Vec<_> = authorized.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, ["Auditorium", "Lab 2"]);
    }

    #[tokio::test]
    async fn test_authorize_is_idempotent() {
        let db = setup_test_db().await;
        let rooms = SqliteRoomRepository::new(db.pool().clone());
        let users = SqliteUserRepository::new(db.pool().clone());

        let user_id = users.create(&User::new("Ana", "A1")).await.unwrap();
        let room_id = rooms.create(&Room::new("Lab 2", None)).await.unwrap();

        rooms.authorize(user_id, room_id).await.unwrap();
        rooms.authorize(user_id, room_id).await.unwrap();

        assert_eq!(rooms.find_authorized(user_id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_authorize_unknown_room_fails() {
        let db = setup_test_db().await;
        let rooms = SqliteRoomRepository::new(db.pool().clone());
        let users = SqliteUserRepository::new(db.pool().clone());

        let user_id = users.create(&User::new("Ana", "A1")).await.unwrap();
        assert!(rooms.authorize(user_id, 999).await.is_err());
    }
}

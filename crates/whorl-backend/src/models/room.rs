use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A room an access can be confirmed into.
///
/// Rooms are pure reference data: the correlation window offers a user's
/// authorized rooms as candidates, and `confirm_room` records which one
/// the operator picked.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Room {
    /// Auto-increment primary key
    pub id: i64,

    /// Unique room name (e.g. `Lab 2`)
    pub name: String,

    /// Optional free-text description
    pub description: Option<String>,

    /// Record creation timestamp
    pub created_at: DateTime<Utc>,
}

impl Room {
    /// Create a new room record (id assigned by the database on insert).
    pub fn new(name: impl Into<String>, description: Option<String>) -> Self {
        Self {
            id: 0, // Will be set by database
            name: name.into(),
            description,
            created_at: Utc::now(),
        }
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identity record: one person the sensor can match.
///
/// A user owns zero or more enrolled fingerprints (device template slots)
/// and is authorized for zero or more rooms through the `user_rooms` join.
/// The sensor itself only ever reports a slot number; everything that turns
/// a slot into a person starts here.
///
/// # Fields
///
/// * `id` - Auto-increment primary key (technical key for FK performance)
/// * `name` - Full name, required
/// * `badge_code` - Unique human-facing code (natural key, e.g. `A12345`)
/// * `created_at` - Record creation timestamp
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    /// Auto-increment primary key
    pub id: i64,

    /// Full name
    pub name: String,

    /// Unique human-facing code; the identifier operators search by
    pub badge_code: String,

    /// Record creation timestamp
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Create a new user record (id assigned by the database on insert).
    pub fn new(name: impl Into<String>, badge_code: impl Into<String>) -> Self {
        Self {
            id: 0, // Will be set by database
            name: name.into(),
            badge_code: badge_code.into(),
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_user_has_no_id_yet() {
        let user = User::new("Ana Souza", "A12345");
        assert_eq!(user.id, 0);
        assert_eq!(user.name, "Ana Souza");
        assert_eq!(user.badge_code, "A12345");
    }
}

use thiserror::Error;

/// Error type for the correlation service's storage and service layers.
///
/// Database failures are wrapped; domain failures (`NotFound`,
/// `AlreadyConfirmed`) carry enough context to map directly onto an HTTP
/// status at the API boundary.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Database connection or query execution failed
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Migration execution failed
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Entity not found in database
    #[error("Entity not found: {entity_type} with {field}={value}")]
    NotFound {
        entity_type: String,
        field: String,
        value: String,
    },

    /// A pending access record was confirmed a second time
    #[error("Access {access_id} is already confirmed")]
    AlreadyConfirmed { access_id: i64 },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl StorageError {
    /// Build a `NotFound` for the given entity and lookup key.
    pub fn not_found(
        entity_type: impl Into<String>,
        field: impl Into<String>,
        value: impl ToString,
    ) -> Self {
        StorageError::NotFound {
            entity_type: entity_type.into(),
            field: field.into(),
            value: value.to_string(),
        }
    }
}

/// Specialized result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_display_names_the_lookup() {
        let err = StorageError::not_found("Room", "id", 42);
        assert_eq!(err.to_string(), "Entity not found: Room with id=42");
    }

    #[test]
    fn test_already_confirmed_display() {
        let err = StorageError::AlreadyConfirmed { access_id: 7 };
        assert_eq!(err.to_string(), "Access 7 is already confirmed");
    }
}

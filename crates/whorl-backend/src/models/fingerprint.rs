use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use whorl_core::SensorSlot;

/// Mapping from a device template slot to a user.
///
/// The sensor stores up to 200 templates and reports matches by slot
/// number only; this table is the sole link between that number and an
/// identity. A slot holds one template, so `sensor_slot` is unique across
/// all users, while one user may have several fingers enrolled.
///
/// Deactivating a fingerprint (`active = false`) retires the slot without
/// erasing enrollment history: a match against an inactive slot is treated
/// as unknown.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Fingerprint {
    /// Auto-increment primary key
    pub id: i64,

    /// Owning user
    pub user_id: i64,

    /// Device template slot (1-200); unique across the whole table
    pub sensor_slot: u8,

    /// Which finger was enrolled (free text, e.g. `right_index`)
    pub finger_label: Option<String>,

    /// Whether this slot still resolves to the user
    pub active: bool,

    /// Record creation timestamp
    pub created_at: DateTime<Utc>,
}

impl Fingerprint {
    /// Create a new active fingerprint record for `user_id` at `slot`.
    pub fn new(user_id: i64, slot: SensorSlot, finger_label: Option<String>) -> Self {
        Self {
            id: 0, // Will be set by database
            user_id,
            sensor_slot: slot.as_u8(),
            finger_label,
            active: true,
            created_at: Utc::now(),
        }
    }
}

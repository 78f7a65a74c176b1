//! Access-correlation backend for the fingerprint bridge.
//!
//! Persists identities, rooms, slot-to-user fingerprint mappings and
//! access events in SQLite, and exposes the correlation window over a
//! small HTTP API. The flow it serves:
//!
//! 1. A bridge posts a scan report to `/log_access`; a matched report
//!    becomes a *pending* access event tied to a user.
//! 2. The operator UI polls `/pending_access` and gets the most recent
//!    unresolved event within the lookback horizon, together with the
//!    user's authorized rooms as candidates.
//! 3. One `/confirm_room` call resolves the event; older unresolved
//!    events expire implicitly by falling outside the horizon.
//!
//! # Crate layout
//!
//! - [`connection`]: pooled SQLite [`Database`] with embedded migrations.
//! - [`models`] / [`repositories`]: entities and their data access.
//! - [`window`]: the [`AccessWindow`] correlation service.
//! - [`api`]: the hand-routed HTTP surface.
//! - [`config`]: environment-driven process configuration.

pub mod api;
pub mod config;
pub mod connection;
pub mod error;
pub mod models;
pub mod repositories;
pub mod window;

pub use api::ApiState;
pub use config::BackendConfig;
pub use connection::{Database, DatabaseConfig};
pub use error::{StorageError, StorageResult};
pub use models::{AccessEvent, Fingerprint, Room, User};
pub use repositories::{
    AccessEventRepository, FingerprintRepository, RoomRepository, SqliteAccessEventRepository,
    SqliteFingerprintRepository, SqliteRoomRepository, SqliteUserRepository, UserRepository,
};
pub use window::{AccessReport, AccessWindow, PendingAccess};

pub mod access_event;
pub mod fingerprint;
pub mod room;
pub mod user;

pub use access_event::{AccessEventRepository, SqliteAccessEventRepository};
pub use fingerprint::{FingerprintRepository, SqliteFingerprintRepository};
pub use room::{RoomRepository, SqliteRoomRepository};
pub use user::{SqliteUserRepository, UserRepository};

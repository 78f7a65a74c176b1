pub mod access_event;
pub mod fingerprint;
pub mod room;
pub mod user;

pub use access_event::AccessEvent;
pub use fingerprint::Fingerprint;
pub use room::Room;
pub use user::User;

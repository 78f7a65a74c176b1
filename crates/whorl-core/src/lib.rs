//! Shared vocabulary of the whorl workspace: sensor slots, access
//! contexts and statuses, protocol constants, and the common error type
//! used across the bridge and backend crates.

pub mod constants;
pub mod error;
pub mod types;

pub use error::{Error, Result};
pub use types::*;

/// Version info
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

//! Correlation service configuration.
//!
//! Environment-driven (`WHORL_*` variables) on top of defaults matching
//! the deployed installation: SQLite file next to the binary, API on
//! `0.0.0.0:8000`, 30-second pending lookback.

use std::env;
use std::net::SocketAddr;
use std::str::FromStr;

use tracing::warn;

use whorl_core::constants::PENDING_LOOKBACK_SECS;

/// Top-level configuration for the backend binary.
#[derive(Debug, Clone)]
pub struct BackendConfig {
    /// SQLite database file path.
    pub database_path: String,
    /// API bind address.
    pub listen_addr: SocketAddr,
    /// Pending access lookback horizon in seconds.
    pub lookback_secs: i64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            database_path: "whorl.db".to_string(),
            listen_addr: SocketAddr::from(([0, 0, 0, 0], 8000)),
            lookback_secs: PENDING_LOOKBACK_SECS,
        }
    }
}

impl BackendConfig {
    /// Read configuration from `WHORL_*` environment variables.
    ///
    /// Unset variables keep their defaults; malformed values are ignored
    /// with a warning rather than aborting the process.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(path) = env::var("WHORL_DATABASE_PATH") {
            if !path.is_empty() {
                config.database_path = path;
            }
        }
        if let Some(addr) = parse_env("WHORL_BACKEND_ADDR") {
            config.listen_addr = addr;
        }
        if let Some(secs) = parse_env("WHORL_PENDING_LOOKBACK_SECS") {
            config.lookback_secs = secs;
        }
        config
    }
}

/// Parse an env var, warning (and keeping the default) when it does not
/// parse.
fn parse_env<T: FromStr>(name: &str) -> Option<T> {
    let raw = env::var(name).ok()?;
    match raw.parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(var = name, value = %raw, "Ignoring unparseable value");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_mirror_deployment_constants() {
        let config = BackendConfig::default();
        assert_eq!(config.database_path, "whorl.db");
        assert_eq!(config.listen_addr.port(), 8000);
        assert_eq!(config.lookback_secs, 30);
    }
}

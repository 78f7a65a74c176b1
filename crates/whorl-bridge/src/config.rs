//! Bridge process configuration.
//!
//! Everything is environment-driven (`WHORL_*` variables) on top of
//! defaults that mirror the deployed installation: sensor UART at 9600
//! baud, gateway on `0.0.0.0:8081`, backend at `http://127.0.0.1:8000`.

use std::env;
use std::net::SocketAddr;
use std::str::FromStr;

use tracing::warn;

use whorl_core::AccessContext;
use whorl_core::constants::DEFAULT_BAUD_RATE;

use crate::forwarder::ForwarderConfig;
use crate::session::SessionConfig;

/// Top-level configuration for the bridge binary.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Serial port path; `None` means autodetect.
    pub serial_port: Option<String>,
    /// UART baud rate.
    pub baud_rate: u32,
    /// Gateway bind address.
    pub listen_addr: SocketAddr,
    /// Base URL of the backend service (no trailing slash).
    pub backend_url: String,
    /// Which side of the door this bridge serves.
    pub access_context: AccessContext,
    /// Session timing knobs.
    pub session: SessionConfig,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            serial_port: None,
            baud_rate: DEFAULT_BAUD_RATE,
            listen_addr: SocketAddr::from(([0, 0, 0, 0], 8081)),
            backend_url: "http://127.0.0.1:8000".to_string(),
            access_context: AccessContext::Entry,
            session: SessionConfig::default(),
        }
    }
}

impl BridgeConfig {
    /// Read configuration from `WHORL_*` environment variables.
    ///
    /// Unset variables keep their defaults; malformed values are ignored
    /// with a warning rather than aborting the process.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(port) = env::var("WHORL_SERIAL_PORT") {
            if !port.is_empty() {
                config.serial_port = Some(port);
            }
        }
        if let Some(baud) = parse_env("WHORL_SERIAL_BAUD") {
            config.baud_rate = baud;
        }
        if let Some(addr) = parse_env("WHORL_BRIDGE_ADDR") {
            config.listen_addr = addr;
        }
        if let Ok(url) = env::var("WHORL_BACKEND_URL") {
            if !url.is_empty() {
                config.backend_url = url.trim_end_matches('/').to_string();
            }
        }
        if let Ok(raw) = env::var("WHORL_ACCESS_CONTEXT") {
            match AccessContext::parse(&raw) {
                Ok(context) => config.access_context = context,
                Err(e) => warn!(value = %raw, error = %e, "Ignoring WHORL_ACCESS_CONTEXT"),
            }
        }
        config
    }

    /// Forwarder settings derived from this configuration.
    pub fn forwarder(&self) -> ForwarderConfig {
        ForwarderConfig {
            log_access_url: format!("{}/log_access", self.backend_url),
            context: self.access_context,
            ..ForwarderConfig::default()
        }
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

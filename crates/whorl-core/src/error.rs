use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    // Transport errors
    #[error("Device disconnected")]
    DeviceDisconnected,

    #[error("No response within {duration_ms}ms")]
    Timeout { duration_ms: u64 },

    // Protocol errors
    #[error("Malformed response: {line}")]
    MalformedResponse { line: String },

    #[error("Invalid sensor slot: {0}")]
    InvalidSlot(String),

    #[error("Invalid hex payload: {0}")]
    InvalidHex(String),

    #[error("Template transfer failed: {0}")]
    TransferFailed(String),

    // Backend errors
    #[error("Backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error("Not found: {0}")]
    NotFound(String),

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Create a timeout error for the given deadline.
    pub fn timeout(duration_ms: u64) -> Self {
        Self::Timeout { duration_ms }
    }

    /// Create a malformed-response error carrying the offending line.
    pub fn malformed(line: impl Into<String>) -> Self {
        Self::MalformedResponse { line: line.into() }
    }

    /// Create a backend-unavailable error.
    pub fn backend(message: impl Into<String>) -> Self {
        Self::BackendUnavailable(message.into())
    }

    /// Returns `true` if the error means the serial link is gone and the
    /// bridge must enter its reconnect loop.
    pub fn is_disconnect(&self) -> bool {
        matches!(self, Self::DeviceDisconnected | Self::Io(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;

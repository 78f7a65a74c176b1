//! UART transport for the fingerprint sensor.
//!
//! This module provides the real serial implementation of [`SerialLink`]:
//! a `tokio-serial` stream wrapped in a `LinesCodec` for automatic line
//! framing in both directions.
//!
//! # Architecture
//!
//! ```text
//! SensorSession
//!     │
//!     └─> UartLink ───(UART 9600 baud)───> sensor firmware
//!            │
//!            └─> Framed<SerialStream, LinesCodec> (automatic framing)
//! ```
//!
//! # Framing
//!
//! The firmware emits newline-terminated UTF-8 text. `LinesCodec` handles
//! both `\n` and `\r\n` endings transparently and enforces
//! [`MAX_LINE_LENGTH`] so a babbling device cannot grow the read buffer
//! without bound. An over-long line is dropped with a warning and reading
//! continues at the next newline.
//!
//! # Port Autodetection
//!
//! When no port is configured, [`autodetect_port`] scans the system for
//! USB serial adapters and picks the first one. This matches the common
//! deployment where the sensor's USB-UART bridge is the only adapter on
//! the host.

use futures::{SinkExt, StreamExt};
use tokio_serial::{SerialPortBuilderExt, SerialPortType, SerialStream};
use tokio_util::codec::{Framed, LinesCodec, LinesCodecError};
use tracing::{debug, info, warn};
use whorl_core::{Error, Result, constants::MAX_LINE_LENGTH};

use crate::traits::{Connector, SerialLink};

/// Serial link over a UART port with line framing.
///
/// Created by [`UartConnector::connect`]. The link reads and writes whole
/// lines until the port fails; it carries no reconnect logic of its own.
pub struct UartLink {
    framed: Framed<SerialStream, LinesCodec>,
    port_name: String,
}

impl UartLink {
    /// Name of the underlying port, for logging.
    #[must_use]
    pub fn port_name(&self) -> &str {
        &self.port_name
    }
}

impl SerialLink for UartLink {
    async fn read_line(&mut self) -> Result<String> {
        loop {
            match self.framed.next().await {
                Some(Ok(line)) => return Ok(line),
                Some(Err(LinesCodecError::MaxLineLengthExceeded)) => {
                    // Codec discards until the next newline; skip and keep reading
                    warn!(
                        port = %self.port_name,
                        max = MAX_LINE_LENGTH,
                        "Dropping over-long line from device"
                    );
                }
                Some(Err(LinesCodecError::Io(e))) => {
                    warn!(port = %self.port_name, error = %e, "Serial read failed");
                    return Err(Error::Io(e));
                }
                None => {
                    warn!(port = %self.port_name, "Serial port closed");
                    return Err(Error::DeviceDisconnected);
                }
            }
        }
    }

    async fn write_line(&mut self, line: &str) -> Result<()> {
        match self.framed.send(line).await {
            Ok(()) => Ok(()),
            Err(LinesCodecError::Io(e)) => {
                warn!(port = %self.port_name, error = %e, "Serial write failed");
                Err(Error::Io(e))
            }
            Err(LinesCodecError::MaxLineLengthExceeded) => {
                // Not produced on encode by LinesCodec, but the error type is shared
                Err(Error::malformed("outgoing line exceeds length bound"))
            }
        }
    }
}

impl std::fmt::Debug for UartLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UartLink")
            .field("port_name", &self.port_name)
            .finish_non_exhaustive()
    }
}

/// Connector that opens a UART port by name.
///
/// # Example
///
/// ```no_run
/// use whorl_transport::{Connector, UartConnector};
///
/// # async fn example() -> whorl_core::Result<()> {
/// let connector = UartConnector::new("/dev/ttyUSB0", 9600);
/// let link = connector.connect().await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct UartConnector {
    port: String,
    baud: u32,
}

impl UartConnector {
    /// Create a connector for the given port and baud rate.
    pub fn new(port: impl Into<String>, baud: u32) -> Self {
        Self {
            port: port.into(),
            baud,
        }
    }

    /// Configured port name.
    #[must_use]
    pub fn port(&self) -> &str {
        &self.port
    }

    /// Configured baud rate.
    #[must_use]
    pub fn baud(&self) -> u32 {
        self.baud
    }
}

impl Connector for UartConnector {
    type Link = UartLink;

    async fn connect(&self) -> Result<UartLink> {
        debug!(port = %self.port, baud = self.baud, "Opening serial port");

        let mut stream = match tokio_serial::new(&self.port, self.baud).open_native_async() {
            Ok(stream) => stream,
            Err(e) => {
                warn!(port = %self.port, error = %e, "Failed to open serial port");
                return Err(Error::DeviceDisconnected);
            }
        };

        // Exclusive mode can break when udev rules already hold the port
        #[cfg(unix)]
        if let Err(e) = stream.set_exclusive(false) {
            warn!(port = %self.port, error = %e, "Could not clear exclusive mode");
        }

        info!(port = %self.port, baud = self.baud, "Serial port open");

        let framed = Framed::new(stream, LinesCodec::new_with_max_length(MAX_LINE_LENGTH));
        Ok(UartLink {
            framed,
            port_name: self.port.clone(),
        })
    }
}

/// Scan the system for a USB serial adapter and return its port name.
///
/// Prefers USB ports (the sensor sits behind a USB-UART bridge); falls back
/// to the first enumerated port of any type.
///
/// # Errors
///
/// Returns `Error::Config` when no serial port is present at all.
pub fn autodetect_port() -> Result<String> {
    let ports = tokio_serial::available_ports()
        .map_err(|e| Error::Config(format!("serial port enumeration failed: {e}")))?;

    if ports.is_empty() {
        return Err(Error::Config(
            "no serial ports detected; set the port explicitly".to_string(),
        ));
    }

    let chosen = ports
        .iter()
        .find(|p| matches!(p.port_type, SerialPortType::UsbPort(_)))
        .unwrap_or(&ports[0]);

    info!(
        port = %chosen.port_name,
        total = ports.len(),
        "Autodetected serial port"
    );
    Ok(chosen.port_name.clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connector_stores_config() {
        let connector = UartConnector::new("/dev/ttyUSB0", 9600);
        assert_eq!(connector.port(), "/dev/ttyUSB0");
        assert_eq!(connector.baud(), 9600);
    }

    #[tokio::test]
    async fn test_connect_missing_port_fails() {
        let connector = UartConnector::new("/dev/whorl-no-such-port", 9600);
        let result = connector.connect().await;
        assert!(matches!(result, Err(Error::DeviceDisconnected)));
    }
}

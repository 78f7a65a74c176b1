//! Transport trait definitions.
//!
//! These traits establish the contract between the session layer and the
//! serial hardware, enabling substitution between the real UART link and
//! mock implementations in tests.
//!
//! All traits use native `async fn` methods (Rust 1.90 + Edition 2024
//! RPITIT), eliminating the need for the `async_trait` macro.

#![allow(async_fn_in_trait)]

use whorl_core::Result;

/// A line-oriented, full-duplex serial connection to the sensor firmware.
///
/// The wire protocol is newline-delimited UTF-8 text in both directions.
/// Implementations frame the byte stream into lines and enforce the
/// line-length bound; callers never see partial lines.
///
/// # Cancel Safety
///
/// `read_line` is required to be cancel-safe: the session layer races it
/// against its operation mailbox inside `tokio::select!`, and a cancelled
/// read must not lose buffered bytes. Implementations keep partial input
/// in state owned by `self`.
///
/// # Object Safety and Dynamic Dispatch
///
/// **NOTE**: This trait is NOT object-safe because `async fn` methods
/// return `impl Future` (Edition 2024 RPITIT). Use generic type parameters:
///
/// ```no_run
/// use whorl_transport::SerialLink;
/// use whorl_core::Result;
///
/// async fn drain<L: SerialLink>(link: &mut L) -> Result<()> {
///     loop {
///         let line = link.read_line().await?;
///         println!("{line}");
///     }
/// }
/// ```
pub trait SerialLink: Send {
    /// Read the next complete line from the device, without the newline.
    ///
    /// Blocks asynchronously until a full line is available. Lines that
    /// exceed the transport's length bound are dropped with a warning and
    /// the read continues with the next line.
    ///
    /// # Errors
    ///
    /// Returns `Error::DeviceDisconnected` when the device is gone (port
    /// closed, USB unplugged) and `Error::Io` for other I/O failures.
    async fn read_line(&mut self) -> Result<String>;

    /// Write one line to the device, appending the newline.
    ///
    /// The line is flushed before this returns; the firmware parses input
    /// line by line, so a buffered half-line would stall it.
    ///
    /// # Errors
    ///
    /// Returns `Error::DeviceDisconnected` when the device is gone and
    /// `Error::Io` for other I/O failures.
    async fn write_line(&mut self, line: &str) -> Result<()>;
}

/// Factory for serial links, owning the "where is the device" knowledge.
///
/// The session layer holds a `Connector` and calls [`connect`] once at
/// startup and again after every link failure. Each call produces an
/// independent link; the connector itself stays cheap to retain.
///
/// [`connect`]: Connector::connect
pub trait Connector: Send {
    /// The link type this connector produces.
    type Link: SerialLink;

    /// Open a fresh connection to the device.
    ///
    /// # Errors
    ///
    /// Returns `Error::DeviceDisconnected` when the device cannot be found
    /// or opened. The caller decides whether and when to retry.
    async fn connect(&self) -> Result<Self::Link>;
}

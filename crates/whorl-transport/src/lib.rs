//! Serial transport layer for the fingerprint sensor bridge.
//!
//! This crate provides the link between the bridge and the sensor firmware:
//! a line-oriented serial transport plus a trait seam that lets the session
//! layer run against mock links in tests without a physical device.
//!
//! # Design Principles
//!
//! - **Async-first**: all I/O uses native `async fn` in traits
//!   (Rust 1.90 + Edition 2024 RPITIT).
//! - **Line framing at the edge**: the wire protocol is newline-delimited
//!   UTF-8; framing and the line-length bound live here so upper layers only
//!   ever see whole lines.
//! - **Cancel-safe reads**: [`SerialLink::read_line`] must be safe to race
//!   inside `tokio::select!`. Both implementations keep partial data in
//!   internal buffers across cancellation.
//! - **No retry policy**: a link reads and writes until it fails. Reconnect
//!   strategy belongs to the session layer, which asks a [`Connector`] for a
//!   fresh link.
//!
//! # Example
//!
//! ```no_run
//! use whorl_transport::{Connector, SerialLink, UartConnector};
//!
//! # async fn example() -> whorl_core::Result<()> {
//! let connector = UartConnector::new("/dev/ttyUSB0", 9600);
//! let mut link = connector.connect().await?;
//!
//! link.write_line("GET_MODEL:12").await?;
//! let line = link.read_line().await?;
//! println!("sensor says: {line}");
//! # Ok(())
//! # }
//! ```
//!
//! # Mock Links
//!
//! [`MockLink`] pairs with a [`MockLinkHandle`] in the style of a scripted
//! device: tests push the lines the firmware would emit and observe the
//! lines the bridge writes, including mid-session disconnects.

pub mod mock;
pub mod serial;
pub mod traits;

// Re-export commonly used types for convenience
pub use mock::{MockConnector, MockLink, MockLinkHandle};
pub use serial::{UartConnector, UartLink, autodetect_port};
pub use traits::{Connector, SerialLink};

//! Mock serial link for testing and development.
//!
//! This module provides a scripted stand-in for the UART link so session
//! and protocol logic can be exercised without a physical sensor. The link
//! half implements [`SerialLink`]; the handle half plays the device.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use whorl_core::{Error, Result};

use crate::traits::{Connector, SerialLink};

/// Mock serial link for testing and development.
///
/// Lines pushed through the [`MockLinkHandle`] come out of `read_line`;
/// lines written with `write_line` are observable on the handle. Dropping
/// the handle closes both directions, which the link reports as
/// `DeviceDisconnected` — the same thing an unplugged cable looks like.
///
/// # Examples
///
/// ```
/// use whorl_transport::{MockLink, SerialLink};
///
/// #[tokio::main]
/// async fn main() -> whorl_core::Result<()> {
///     let (mut link, mut handle) = MockLink::new();
///
///     handle.push_line(r#"{"status":"ok"}"#).await?;
///     let line = link.read_line().await?;
///     assert_eq!(line, r#"{"status":"ok"}"#);
///
///     link.write_line("ENROLL:12").await?;
///     assert_eq!(handle.next_written().await, Some("ENROLL:12".to_string()));
///
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct MockLink {
    /// Device-to-host lines scripted by the handle
    incoming_rx: mpsc::Receiver<String>,

    /// Host-to-device lines observed by the handle
    written_tx: mpsc::Sender<String>,
}

impl MockLink {
    /// Create a mock link and its controlling handle.
    #[must_use]
    pub fn new() -> (Self, MockLinkHandle) {
        let (incoming_tx, incoming_rx) = mpsc::channel(32);
        // Uploads stream dozens of frames before a test drains them
        let (written_tx, written_rx) = mpsc::channel(256);

        let link = Self {
            incoming_rx,
            written_tx,
        };
        let handle = MockLinkHandle {
            incoming_tx,
            written_rx,
        };

        (link, handle)
    }
}

impl SerialLink for MockLink {
    async fn read_line(&mut self) -> Result<String> {
        self.incoming_rx
            .recv()
            .await
            .ok_or(Error::DeviceDisconnected)
    }

    async fn write_line(&mut self, line: &str) -> Result<()> {
        self.written_tx
            .send(line.to_string())
            .await
            .map_err(|_| Error::DeviceDisconnected)
    }
}

/// Handle for controlling a [`MockLink`].
///
/// The handle plays the device side: it scripts the lines the firmware
/// would emit and observes everything the bridge writes.
///
/// # Examples
///
/// ```
/// use whorl_transport::{MockLink, SerialLink};
///
/// #[tokio::main]
/// async fn main() -> whorl_core::Result<()> {
///     let (mut link, handle) = MockLink::new();
///
///     handle.push_line(r#"{"event":"match_found","sensor_id":3,"confidence":91}"#).await?;
///     assert!(link.read_line().await?.contains("match_found"));
///
///     // Simulate the cable being pulled
///     handle.disconnect();
///     assert!(link.read_line().await.is_err());
///
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct MockLinkHandle {
    /// Channel sender for device-to-host lines
    incoming_tx: mpsc::Sender<String>,

    /// Channel receiver for host-to-device lines
    written_rx: mpsc::Receiver<String>,
}

impl MockLinkHandle {
    /// Script one line from the device.
    ///
    /// The line will be returned by the link's next `read_line` call.
    ///
    /// # Errors
    ///
    /// Returns an error if the link has been dropped and the channel is
    /// closed.
    pub async fn push_line(&self, line: impl Into<String>) -> Result<()> {
        self.incoming_tx
            .send(line.into())
            .await
            .map_err(|_| Error::DeviceDisconnected)
    }

    /// Script several lines from the device, in order.
    ///
    /// # Errors
    ///
    /// Returns an error if the link has been dropped and the channel is
    /// closed.
    pub async fn push_lines<I, S>(&self, lines: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for line in lines {
            self.push_line(line).await?;
        }
        Ok(())
    }

    /// Await the next line the bridge wrote to the device.
    ///
    /// Returns `None` once the link is dropped and all written lines have
    /// been drained.
    pub async fn next_written(&mut self) -> Option<String> {
        self.written_rx.recv().await
    }

    /// Sever the link, as if the cable were pulled.
    ///
    /// Both directions fail from the link's point of view: reads return
    /// `DeviceDisconnected` after any already-buffered lines drain, and
    /// writes fail immediately.
    pub fn disconnect(self) {
        drop(self);
    }
}

/// Connector that hands out pre-built mock links, for reconnect tests.
///
/// Links are dispensed in FIFO order; when the queue is empty, `connect`
/// fails the way a missing device would. The attempt counter lets tests
/// assert how many times the session came asking.
///
/// # Examples
///
/// ```
/// use whorl_transport::{Connector, MockConnector, MockLink};
///
/// #[tokio::main]
/// async fn main() -> whorl_core::Result<()> {
///     let connector = MockConnector::new();
///     let (link, _handle) = MockLink::new();
///     connector.push_link(link);
///
///     let _link = connector.connect().await?;
///     assert!(connector.connect().await.is_err());
///     assert_eq!(connector.attempts(), 2);
///
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone, Default)]
pub struct MockConnector {
    links: Arc<Mutex<VecDeque<MockLink>>>,
    attempts: Arc<AtomicUsize>,
}

impl MockConnector {
    /// Create a connector with an empty link queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a link to be handed out by a future `connect` call.
    pub fn push_link(&self, link: MockLink) {
        self.links
            .lock()
            .expect("mock connector lock poisoned")
            .push_back(link);
    }

    /// Number of `connect` calls made so far, successful or not.
    #[must_use]
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

impl Connector for MockConnector {
    type Link = MockLink;

    async fn connect(&self) -> Result<MockLink> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        self.links
            .lock()
            .expect("mock connector lock poisoned")
            .pop_front()
            .ok_or(Error::DeviceDisconnected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_link_round_trip() {
        let (mut link, mut handle) = MockLink::new();

        handle.push_line("OK").await.unwrap();
        assert_eq!(link.read_line().await.unwrap(), "OK");

        link.write_line("DELETE:7").await.unwrap();
        assert_eq!(handle.next_written().await, Some("DELETE:7".to_string()));
    }

    #[tokio::test]
    async fn test_mock_link_preserves_order() {
        let (mut link, handle) = MockLink::new();

        handle.push_lines(["first", "second", "third"]).await.unwrap();
        assert_eq!(link.read_line().await.unwrap(), "first");
        assert_eq!(link.read_line().await.unwrap(), "second");
        assert_eq!(link.read_line().await.unwrap(), "third");
    }

    #[tokio::test]
    async fn test_disconnect_fails_reads_after_drain() {
        let (mut link, handle) = MockLink::new();

        handle.push_line("buffered").await.unwrap();
        handle.disconnect();

        // Buffered data still drains, then the link is dead
        assert_eq!(link.read_line().await.unwrap(), "buffered");
        assert!(matches!(
            link.read_line().await,
            Err(Error::DeviceDisconnected)
        ));
    }

    #[tokio::test]
    async fn test_disconnect_fails_writes() {
        let (mut link, handle) = MockLink::new();
        handle.disconnect();

        assert!(matches!(
            link.write_line("ENROLL:1").await,
            Err(Error::DeviceDisconnected)
        ));
    }

    #[tokio::test]
    async fn test_dropping_link_closes_handle_side() {
        let (link, handle) = MockLink::new();
        drop(link);

        assert!(handle.push_line("anyone there?").await.is_err());
    }

    #[tokio::test]
    async fn test_mock_connector_dispenses_in_order() {
        let connector = MockConnector::new();

        let (link_a, handle_a) = MockLink::new();
        let (link_b, handle_b) = MockLink::new();
        connector.push_link(link_a);
        connector.push_link(link_b);

        let mut first = connector.connect().await.unwrap();
        handle_a.push_line("from a").await.unwrap();
        assert_eq!(first.read_line().await.unwrap(), "from a");

        let mut second = connector.connect().await.unwrap();
        handle_b.push_line("from b").await.unwrap();
        assert_eq!(second.read_line().await.unwrap(), "from b");
    }

    #[tokio::test]
    async fn test_mock_connector_empty_queue_fails() {
        let connector = MockConnector::new();
        assert!(connector.connect().await.is_err());
        assert_eq!(connector.attempts(), 1);
    }
}

//! Best-effort forwarding of sensor match events to the backend.
//!
//! The session actor pushes [`SensorEvent`]s into a bounded channel; this
//! task drains it and POSTs one `log_access` call per event, tagged with
//! the bridge's configured access context. Delivery is best-effort by
//! design: a bounded number of retries, then the event is logged and
//! dropped. The reader loop never waits on the backend.

use std::time::Duration;

use reqwest::Client;
use serde::Serialize;
use tokio::sync::mpsc;
use tokio::time;
use tracing::{debug, error, info, warn};

use whorl_core::constants::{FORWARD_MAX_ATTEMPTS, FORWARD_RETRY_DELAY_MS, FORWARD_TIMEOUT_MS};
use whorl_core::{AccessContext, Error, Result, SensorSlot};
use whorl_protocol::event::SensorEvent;

/// Where and how match events get reported.
#[derive(Debug, Clone)]
pub struct ForwarderConfig {
    /// Full URL of the backend's `log_access` endpoint.
    pub log_access_url: String,
    /// Which side of the door this bridge serves.
    pub context: AccessContext,
    /// Per-request timeout in milliseconds.
    pub timeout_ms: u64,
    /// Delivery attempts per event before it is dropped.
    pub max_attempts: u32,
    /// Pause between attempts in milliseconds.
    pub retry_delay_ms: u64,
}

impl Default for ForwarderConfig {
    fn default() -> Self {
        Self {
            log_access_url: "http://127.0.0.1:8000/log_access".to_string(),
            context: AccessContext::Entry,
            timeout_ms: FORWARD_TIMEOUT_MS,
            max_attempts: FORWARD_MAX_ATTEMPTS,
            retry_delay_ms: FORWARD_RETRY_DELAY_MS,
        }
    }
}

/// Body of a `log_access` call.
///
/// A successful match carries the slot and confidence; a failed match
/// carries only the context and an explicit reason.
#[derive(Debug, Serialize)]
struct LogAccessRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    sensor_id: Option<SensorSlot>,
    #[serde(skip_serializing_if = "Option::is_none")]
    confidence: Option<u16>,
    context: AccessContext,
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<&'static str>,
}

/// Drains the event stream and reports each event to the backend.
pub struct EventForwarder {
    client: Client,
    config: ForwarderConfig,
    events_rx: mpsc::Receiver<SensorEvent>,
}

impl EventForwarder {
    /// Build a forwarder over the session's event stream.
    ///
    /// # Errors
    /// Returns `Error::Config` if the HTTP client cannot be constructed.
    pub fn new(config: ForwarderConfig, events_rx: mpsc::Receiver<SensorEvent>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| Error::Config(format!("HTTP client construction failed: {e}")))?;
        Ok(Self {
            client,
            config,
            events_rx,
        })
    }

    /// Forward events until the session actor closes the stream.
    pub async fn run(mut self) {
        info!(
            endpoint = %self.config.log_access_url,
            context = %self.config.context.as_str(),
            "Event forwarder started"
        );
        while let Some(event) = self.events_rx.recv().await {
            self.forward(&event).await;
        }
        debug!("Event stream closed; forwarder stopping");
    }

    /// Deliver one event, retrying a bounded number of times.
    async fn forward(&self, event: &SensorEvent) {
        let payload = self.payload_for(event);
        for attempt in 1..=self.config.max_attempts {
            match self
                .client
                .post(&self.config.log_access_url)
                .json(&payload)
                .send()
                .await
            {
                Ok(response) if response.status().is_success() => {
                    debug!(attempt, event = ?event, "Access event forwarded");
                    return;
                }
                Ok(response) => {
                    warn!(
                        attempt,
                        status = %response.status(),
                        "Backend rejected access event"
                    );
                }
                Err(e) => {
                    warn!(attempt, error = %e, "Backend unreachable");
                }
            }
            if attempt < self.config.max_attempts {
                time::sleep(Duration::from_millis(self.config.retry_delay_ms)).await;
            }
        }
        error!(event = ?event, "Access event dropped after retries");
    }

    fn payload_for(&self, event: &SensorEvent) -> LogAccessRequest {
        match event {
            SensorEvent::MatchFound {
                sensor_id,
                confidence,
            } => LogAccessRequest {
                sensor_id: Some(*sensor_id),
                confidence: Some(*confidence),
                context: self.config.context,
                reason: None,
            },
            SensorEvent::MatchFailed => LogAccessRequest {
                sensor_id: None,
                confidence: None,
                context: self.config.context,
                reason: Some("match_failed"),
            },
        }
    }
}

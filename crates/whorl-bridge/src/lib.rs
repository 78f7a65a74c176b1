//! Serial-to-HTTP bridge for a fingerprint access-control sensor.
//!
//! The bridge sits between a line-oriented UART fingerprint sensor and the
//! access-control backend. It owns the serial link through a single session
//! actor, exposes sensor operations over a small HTTP gateway, and forwards
//! unsolicited match events to the backend:
//!
//! ```text
//!              HTTP (operators)                 UART lines
//! Backend <─────────┐    │                          │
//!    ▲              │    ▼                          ▼
//!    │          ┌───────────┐   SessionOp    ┌───────────────┐
//!    │          │  gateway  │ ─────────────> │ DeviceSession │ <──> sensor
//!    │          └───────────┘                └───────┬───────┘
//!    │                                               │ SensorEvent
//!    │          ┌────────────────┐                   │
//!    └───────── │ EventForwarder │ <─────────────────┘
//!               └────────────────┘
//! ```
//!
//! # Crate layout
//!
//! - [`session`]: the actor that owns the link, serializes command
//!   exchanges and demultiplexes responses from events.
//! - [`dispatcher`]: the cloneable [`SessionHandle`] callers use.
//! - [`gateway`]: the hand-routed HTTP surface.
//! - [`forwarder`]: best-effort delivery of match events to the backend.
//! - [`config`]: environment-driven process configuration.

pub mod config;
pub mod dispatcher;
pub mod forwarder;
pub mod gateway;
pub mod session;

pub use config::BridgeConfig;
pub use dispatcher::SessionHandle;
pub use forwarder::{EventForwarder, ForwarderConfig};
pub use gateway::GatewayState;
pub use session::{DeviceSession, SessionConfig};

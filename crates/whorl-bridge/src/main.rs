//! Bridge binary: wires the session actor, event forwarder and gateway.

use std::sync::Arc;

use anyhow::Context;
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use whorl_bridge::config::BridgeConfig;
use whorl_bridge::forwarder::EventForwarder;
use whorl_bridge::gateway::{self, GatewayState};
use whorl_bridge::session::DeviceSession;
use whorl_transport::{UartConnector, autodetect_port};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = BridgeConfig::from_env();
    info!(?config, "Bridge starting");

    let port = match config.serial_port.clone() {
        Some(port) => port,
        None => autodetect_port().context("no serial port configured and autodetect failed")?,
    };
    let connector = UartConnector::new(port, config.baud_rate);

    let (session, handle, events) = DeviceSession::new(connector, config.session.clone());
    tokio::spawn(session.run());

    let forwarder =
        EventForwarder::new(config.forwarder(), events).context("event forwarder setup failed")?;
    tokio::spawn(forwarder.run());

    let state = Arc::new(GatewayState { session: handle });
    gateway::serve(config.listen_addr, state)
        .await
        .context("gateway server failed")?;
    Ok(())
}

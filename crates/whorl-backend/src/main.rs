//! Backend binary: opens the database and serves the correlation API.

use std::sync::Arc;

use anyhow::Context;
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use whorl_backend::api::{self, ApiState};
use whorl_backend::config::BackendConfig;
use whorl_backend::connection::{Database, DatabaseConfig};
use whorl_backend::window::AccessWindow;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = BackendConfig::from_env();
    info!(?config, "Backend starting");

    let db = Database::new(DatabaseConfig::new(&config.database_path))
        .await
        .context("database setup failed")?;
    let window = AccessWindow::with_lookback(db.pool().clone(), config.lookback_secs);

    let state = Arc::new(ApiState { window, db });
    api::serve(config.listen_addr, state)
        .await
        .context("API server failed")?;
    Ok(())
}

//! queue-lens server binary.
//!
//! Reads the JSON config named by `LENS_CONFIG` (default `config.json`),
//! connects the job store and serves the HTTP API until Ctrl-C.

use std::error::Error;

use api::{AppState, Config, build_router};
use tokio::net::TcpListener;

const CONFIG_ENV: &str = "LENS_CONFIG";
const DEFAULT_CONFIG: &str = "config.json";

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let config_path = std::env::var(CONFIG_ENV).unwrap_or_else(|_| DEFAULT_CONFIG.to_string());
    let config = Config::load(&config_path)?;

    db::init(config.db_config()).await?;

    let address = config.bind_address();
    let router = build_router(AppState::new(config.groups));

    let listener = TcpListener::bind(&address).await?;
    tracing::info!("Listening on http://{}", address);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", err);
        std::future::pending::<()>().await;
    }
}

pub mod api;
pub mod config;
pub mod downloader;
pub mod logging;

use api::{ApiServer, AppState, ServerError};
use config::AppConfig;

/// Load config from the environment and serve the HTTP API until Ctrl+C
pub async fn run() -> Result<(), ServerError> {
    let config = AppConfig::from_env_or_default()?;
    let state = AppState::from_config(config)?;
    let server = ApiServer::new(state);

    let shutdown = server.cancel_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("received Ctrl+C");
            shutdown.cancel();
        }
    });

    server.run().await
}

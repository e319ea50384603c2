use std::error::Error;

use gource_logs::config::{ServerConfig, Settings};
use gource_logs::server::{AppState, build_router};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "gource_logs=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ServerConfig::from_env();
    config.ensure_dirs()?;
    Settings::load_or_init(&config.settings_path())?;

    let addr = config.listen_addr;
    tracing::info!(
        data_dir = %config.data_dir.display(),
        tool_timeout_secs = config.tool_timeout.as_secs(),
        "listening on {}",
        addr
    );

    let shutdown = CancellationToken::new();
    let app = build_router(AppState::with_shutdown(config, shutdown.clone()));

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for shutdown signal");
                std::future::pending::<()>().await;
            }
            tracing::info!("Shutting down, cancelling running tools");
            shutdown.cancel();
        })
        .await?;
    Ok(())
}

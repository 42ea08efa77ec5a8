//! Ingestion service entrypoint: load config, connect to storage, bind the
//! HTTP server, serve until a shutdown signal arrives.

use std::sync::Arc;

use sentinel_ingest::{build_router, AppState, IngestConfig};
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    fmt().with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into())).init();

    let config = match IngestConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            tracing::error!(error = %err, "fatal configuration error; aborting startup");
            std::process::exit(1);
        }
    };

    let state: Arc<AppState> = AppState::new(&config).await?;
    tokio::spawn(sentinel_ingest::fleet::run(state.store.clone(), state.hub.clone(), config.fleet_status_interval));
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!(addr = %config.bind_addr, "sentinel-ingest listening");

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
    tracing::info!("shutdown signal received, draining connections");
}

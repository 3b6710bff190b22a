use std::net::SocketAddr;

use anyhow::{Context, Result};
use api::{
    AppState,
    config::AppConfig,
    routes::create_router,
    ssr::PageShell,
    telemetry,
};
use common::database::{health_check, init_pool, run_migrations};
use tokio::{net::TcpListener, signal};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    let config = AppConfig::from_env()?;
    let _log_guard = telemetry::init(config.app_env, config.log_dir.as_deref())?;

    info!(mode = ?config.app_env, "Starting API service");

    let credentials = &config.credentials;
    info!(
        session = credentials.session_configured(),
        object_storage = credentials.object_storage_configured(),
        oauth = credentials.oauth_configured(),
        "Third-party credentials loaded"
    );

    // Initialize database connection pool
    let pool = init_pool(&config.database()).await?;
    run_migrations(&pool).await?;

    if health_check(&pool).await {
        info!("Database connection successful");
    } else {
        anyhow::bail!("Failed to connect to database");
    }

    let shell = PageShell::load(config.index_html_path.as_deref())?;
    let state = AppState::new(pool, config.app_env);
    let app = create_router(state, shell, config.frontend_url.as_deref());

    let addr = config.listen_addr()?;
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!("API service listening on {}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("API service stopped");
    Ok(())
}

/// Resolve on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => warn!("Received Ctrl+C, shutting down"),
        _ = terminate => warn!("Received SIGTERM, shutting down"),
    }
}

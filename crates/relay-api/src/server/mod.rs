//! Server setup and initialization
//!
//! Provides the application builder and server runner.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use relay_common::{AppConfig, AppError};
use relay_db::{create_pool, DatabaseConfig, PgUserRepository, UserRepository};
use relay_gateway::{Gateway, WebhookSink};
use tokio::net::TcpListener;
use tracing::info;

use crate::middleware::apply_middleware;
use crate::routes::create_router;
use crate::state::AppState;
use crate::upload::UploadStore;

/// Build the complete Axum application with all routes and middleware
pub fn create_app(state: AppState) -> Router {
    let router = create_router(
        state.uploads().root(),
        state.config().storage.max_file_size_bytes(),
    );
    let relay = relay_gateway::create_app(state.gateway_state());

    apply_middleware(router.with_state(state).merge(relay))
}

/// Build the relay gateway, attaching the webhook sink when configured
pub fn create_gateway(config: &AppConfig) -> Result<Gateway, AppError> {
    let gateway = Gateway::new(config.gateway.outbound_queue_capacity);

    let Some(webhook) = &config.webhook else {
        return Ok(gateway);
    };

    let sink = WebhookSink::from_config(webhook)
        .map_err(|e| AppError::Config(format!("Failed to build webhook client: {e}")))?;
    info!(url = %webhook.url, "Webhook notifications enabled");

    Ok(gateway.with_sink(Arc::new(sink)))
}

/// Initialize all dependencies and create AppState
pub async fn create_app_state(config: AppConfig) -> Result<AppState, AppError> {
    let uploads = UploadStore::new(&config.storage.upload_dir);
    uploads.init().await?;
    info!(dir = %config.storage.upload_dir, "Upload directory ready");

    let users: Option<Arc<dyn UserRepository>> = match &config.database {
        Some(settings) => {
            info!("Connecting to PostgreSQL...");
            let pool = create_pool(&DatabaseConfig::from(settings))
                .await
                .map_err(|e| AppError::Database(e.to_string()))?;

            let repo = PgUserRepository::new(pool);
            repo.ensure_schema().await?;
            info!("PostgreSQL connection established");

            Some(Arc::new(repo))
        }
        None => {
            tracing::warn!("DATABASE_URL not set, signup and login are disabled");
            None
        }
    };

    let gateway = Arc::new(create_gateway(&config)?);

    Ok(AppState::new(config, gateway, uploads, users))
}

/// Run the HTTP server until Ctrl-C or SIGTERM
pub async fn run_server(app: Router, addr: SocketAddr, gateway: Arc<Gateway>) -> Result<(), AppError> {
    info!("Starting HTTP server on {}", addr);

    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| AppError::Config(format!("Failed to bind to {addr}: {e}")))?;

    info!("Relay listening on ws://{}{}", addr, relay_gateway::WS_PATH);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(gateway))
        .await
        .map_err(|e| AppError::Config(format!("Server error: {e}")))?;

    Ok(())
}

/// Run the complete server with configuration
pub async fn run(config: AppConfig) -> Result<(), AppError> {
    let addr: SocketAddr = config
        .server
        .address()
        .parse()
        .map_err(|e| AppError::Config(format!("Invalid listen address: {e}")))?;

    let state = create_app_state(config).await?;
    let gateway = state.gateway().clone();
    let app = create_app(state);

    run_server(app, addr, gateway).await
}

/// Wait for a shutdown signal, then close every relay connection
async fn shutdown_signal(gateway: Arc<Gateway>) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("Shutdown signal received");
    gateway.shutdown();
}

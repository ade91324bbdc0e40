//! HTTP API module for rwho-server
//!
//! Accepts session reports from client hosts and serves the collected
//! login state as JSON.

pub mod report;
pub mod routes;

use crate::audit::AuditLogger;
use crate::config::Config;
use crate::db::Database;
use crate::error::{CoreError, Result};
use crate::handlers::ReportHandler;

use axum::{
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection (read endpoints)
    pub db: Arc<Database>,
    /// Applies report actions
    pub handler: ReportHandler,
    /// Per-action audit trail
    pub audit: AuditLogger,
    /// Take the client address from `X-Forwarded-For`
    pub trust_forwarded_for: bool,
}

impl AppState {
    pub fn new(db: Arc<Database>, config: &Config) -> Self {
        AppState {
            handler: ReportHandler::new(db.clone()),
            db,
            audit: AuditLogger::new(config.audit.enabled),
            trust_forwarded_for: config.server.trust_forwarded_for,
        }
    }
}

/// Start the HTTP API server
pub async fn serve(addr: SocketAddr, db: Arc<Database>, config: &Config) -> Result<()> {
    let state = AppState::new(db, config);
    if state.audit.is_enabled() {
        tracing::info!("Audit logging enabled on target {}", crate::audit::AUDIT_TARGET);
    } else {
        tracing::info!("Audit logging disabled");
    }
    let app = create_router(state);

    tracing::info!("Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .map_err(|e| CoreError::Api(e.to_string()))?;

    Ok(())
}

/// Create the API router with all routes
pub fn create_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/hosts", get(routes::list_hosts))
        .route("/hosts/:host", get(routes::get_host))
        .route("/sessions", get(routes::list_sessions));

    Router::new()
        // Report endpoint; /server.php is the path older clients post to
        .route("/", post(report::report))
        .route("/server.php", post(report::report))
        .route("/health", get(routes::health))
        .nest("/api", api_routes)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}

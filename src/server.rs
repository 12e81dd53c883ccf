// HTTP server for the admission-controlled application surface
//
// Listens on host:port (default 0.0.0.0:8080) and serves:
// - /health  : liveness plus the number of tracked clients
// - /metrics : Prometheus text format
// Every route sits behind the per-client admission middleware.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::json;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::config::Config;
use crate::metrics;
use crate::middleware::admission_middleware;
use crate::rate_limit::AdmissionController;

/// Errors raised while running the server
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Metrics registry could not be initialized
    #[error("Failed to initialize metrics: {0}")]
    Metrics(#[from] prometheus::Error),

    /// Listener could not be bound
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// Server loop failed
    #[error("Server error: {0}")]
    Serve(#[source] std::io::Error),
}

/// Shared handler state
#[derive(Debug, Clone)]
pub struct AppState {
    /// Admission controller guarding every route
    pub controller: Arc<AdmissionController>,
}

impl AppState {
    /// Create state around a controller
    pub fn new(controller: Arc<AdmissionController>) -> Self {
        Self { controller }
    }
}

/// Build the router with the admission layer applied
pub fn build_router(state: AppState) -> Router {
    let routes = Router::new()
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .with_state(state.clone());

    protect(routes, state.controller)
}

/// Put any router behind the admission middleware
///
/// Requests are rate limited before reaching the wrapped routes.
pub fn protect(router: Router, controller: Arc<AdmissionController>) -> Router {
    router
        .layer(middleware::from_fn_with_state(controller, admission_middleware))
        .layer(TraceLayer::new_for_http())
}

/// Run the server until Ctrl-C
///
/// The sweep task starts once the listener is bound and is stopped after
/// the server has drained.
pub async fn serve(config: &Config) -> Result<(), ServerError> {
    metrics::init()?;

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(addr.as_str())
        .await
        .map_err(|source| ServerError::Bind {
            addr: addr.clone(),
            source,
        })?;

    info!(
        rate = config.rate_limit.rate,
        burst = config.rate_limit.burst,
        enabled = config.rate_limit.enabled,
        "Listening on {}",
        addr
    );

    let controller = Arc::new(AdmissionController::new(config.rate_limit.clone()));
    let sweeper = controller.spawn_sweeper();

    let app = build_router(AppState::new(Arc::clone(&controller)));
    let result = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await;

    sweeper.shutdown().await;

    result.map_err(ServerError::Serve)?;
    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        // Without a signal handler, run until the process is killed
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

/// Health check endpoint
async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "tracked_clients": state.controller.tracked_clients(),
    }))
}

/// Metrics endpoint handler
async fn metrics_handler() -> Response {
    match metrics::gather_metrics() {
        Ok(metrics_text) => (StatusCode::OK, metrics_text).into_response(),
        Err(e) => {
            error!("Failed to gather metrics: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Error gathering metrics: {}", e),
            )
                .into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_error_display() {
        let err = ServerError::Bind {
            addr: "0.0.0.0:80".to_string(),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        assert_eq!(err.to_string(), "Failed to bind 0.0.0.0:80: denied");
    }

    #[tokio::test]
    async fn test_serve_reports_bind_failure() {
        // Hold the port so the server cannot bind it
        let taken = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = taken.local_addr().unwrap().port();

        let mut config = Config::default();
        config.server.host = "127.0.0.1".to_string();
        config.server.port = port;

        let result = serve(&config).await;
        assert!(matches!(result, Err(ServerError::Bind { .. })));
    }
}

//! Server module for MyDiet Core.
//!
//! Routes (all JSON):
//!
//! | Method | Path | Handler |
//! |---|---|---|
//! | POST | `/api/upload_csv` | relay a dataset file to the trainer |
//! | POST | `/api/retrain` | trigger a retraining run |
//! | GET | `/api/metrics` | metrics of the most recent training run |
//! | POST | `/api/metrics` | record a completed training run |
//! | GET | `/api/metrics/history` | recent training runs, newest first |
//! | GET | `/health` | liveness check |
//!
//! Handler failures are rendered by [`ApiError`]; the server never stops on a
//! per-request error. `/api` is rate limited per client and every response
//! carries the security headers from [`security`].

mod error;
pub mod handlers;
pub mod logging;
pub mod security;
mod state;
pub mod upload;

pub use error::ApiError;
pub use state::AppState;

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::middleware;
use axum::routing::{get, post};
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tracing::{error, info};

use crate::config::{Config, ServerConfig};
use crate::error::Result;
use logging::RequestLoggerLayer;
use security::RateLimiter;

/// Builds the gateway router with its middleware stack.
///
/// The rate limit covers `/api` only; `/health` stays reachable.
pub fn router(state: AppState, config: &ServerConfig) -> Router {
    let mut api = Router::new()
        .route("/upload_csv", post(handlers::upload_csv))
        .route("/retrain", post(handlers::retrain))
        .route("/metrics", get(handlers::latest_metrics).post(handlers::record_metrics))
        .route("/metrics/history", get(handlers::metrics_history))
        .method_not_allowed_fallback(handlers::method_not_allowed);

    if config.rate_limit.enabled {
        let limiter = Arc::new(RateLimiter::new(config.rate_limit.max_requests, config.rate_limit.window()));
        api = api.layer(middleware::from_fn_with_state(limiter, security::enforce_rate_limit));
    }

    let cors = if config.cors_allow_any_origin { CorsLayer::permissive() } else { CorsLayer::new() };

    let mut app = Router::new()
        .route("/health", get(handlers::health))
        .method_not_allowed_fallback(handlers::method_not_allowed)
        .nest("/api", api)
        .fallback(handlers::not_found)
        .layer(DefaultBodyLimit::max(config.max_upload_bytes))
        .layer(cors);

    if config.security_headers {
        app = security::with_security_headers(app);
    }

    app.layer(RequestLoggerLayer).with_state(state)
}

/// Start the gateway and serve until Ctrl+C or SIGTERM.
///
/// # Errors
///
/// Returns an error if the configuration is invalid, the database cannot be
/// opened, or the server fails to bind to the configured address.
pub async fn run(config: &Config) -> Result<()> {
    let state = AppState::from_config(config)?;
    let listener = TcpListener::bind(config.server.address).await?;
    serve(listener, router(state, &config.server), shutdown_signal()).await
}

/// Serve `app` on an already bound listener until `shutdown` resolves.
///
/// # Errors
///
/// Returns an error if the listener fails.
pub async fn serve<F>(listener: TcpListener, app: Router, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = listener.local_addr()?;
    info!(%addr, "ML gateway listening");

    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown)
        .await?;

    info!("ML gateway stopped");
    Ok(())
}

/// Resolves on Ctrl+C or, on Unix, SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Received Ctrl+C, shutting down"),
            Err(e) => {
                error!(error = %e, "Failed to install Ctrl+C handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                error!(error = %e, "Failed to install signal handler");
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
}

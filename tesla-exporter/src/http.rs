//! HTTP server for the `/metrics` and `/healthz` endpoints.

use std::net::SocketAddr;
use std::time::Duration;

use axum::Router;
use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use tokio::sync::watch;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::state::SharedState;

/// Content type of the Prometheus text exposition format.
pub const METRICS_CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// Application state shared across handlers.
#[derive(Clone)]
struct AppState {
    shared: SharedState,
    max_loop_age: Duration,
}

/// Create the HTTP router. Paths other than `/metrics` and `/healthz` get 404.
pub fn create_router(shared: SharedState, max_loop_age: Duration) -> Router {
    let state = AppState {
        shared,
        max_loop_age,
    };

    Router::new()
        .route("/metrics", get(metrics_handler))
        .route("/healthz", get(health_handler))
        .layer(middleware::from_fn(log_request))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn log_request(request: Request, next: Next) -> Response {
    info!(method = %request.method(), path = %request.uri().path(), "Request");
    next.run(request).await
}

/// Handler for the /metrics endpoint. Empty body while no snapshot is published.
async fn metrics_handler(State(state): State<AppState>) -> Response {
    let body = state
        .shared
        .snapshots
        .current()
        .map(|snapshot| snapshot.render())
        .unwrap_or_default();

    (
        StatusCode::OK,
        [("content-type", METRICS_CONTENT_TYPE)],
        body,
    )
        .into_response()
}

/// Handler for the /healthz endpoint.
async fn health_handler(State(state): State<AppState>) -> Response {
    let elapsed = state.shared.heartbeat.elapsed();
    let (status, body) = health_status(elapsed, state.max_loop_age);
    (status, body).into_response()
}

/// Health verdict for a poll loop last seen `elapsed` ago.
pub fn health_status(elapsed: Duration, max_loop_age: Duration) -> (StatusCode, String) {
    if elapsed > max_loop_age {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("ERR last_loop:{} secs ago\n", elapsed.as_secs()),
        )
    } else {
        (
            StatusCode::OK,
            format!("OK last_loop:{} secs ago\n", elapsed.as_secs()),
        )
    }
}

/// HTTP server configuration.
pub struct HttpServer {
    shared: SharedState,
    listen_addr: SocketAddr,
    max_loop_age: Duration,
}

impl HttpServer {
    /// Create a new HTTP server. `/healthz` fails once the poll loop has not
    /// run for longer than `max_loop_age`.
    pub fn new(shared: SharedState, listen_addr: SocketAddr, max_loop_age: Duration) -> Self {
        Self {
            shared,
            listen_addr,
            max_loop_age,
        }
    }

    /// Run the HTTP server until the shutdown signal is received.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) -> anyhow::Result<()> {
        let router = create_router(self.shared, self.max_loop_age);

        let listener = tokio::net::TcpListener::bind(self.listen_addr)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to bind to {}: {}", self.listen_addr, e))?;

        info!(addr = %self.listen_addr, "HTTP server listening");

        axum::serve(listener, router)
            .with_graceful_shutdown(async move {
                loop {
                    if shutdown.changed().await.is_err() {
                        break;
                    }
                    if *shutdown.borrow() {
                        break;
                    }
                }
                info!("HTTP server shutting down");
            })
            .await
            .map_err(|e| anyhow::anyhow!("HTTP server error: {}", e))?;

        info!("HTTP server stopped");
        Ok(())
    }
}

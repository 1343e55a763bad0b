//! HTTP server: route table, admission layer and lifecycle.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use tokio::net::TcpListener;
use tracing::{error, info};

use super::identity::IdentitySource;
use super::middleware::AdmissionLayer;
use crate::error::{Result, TurnstileError};
use crate::ratelimit::LimiterStore;

/// Information reported by the health endpoint.
#[derive(Debug, Clone)]
struct HealthState {
    env: String,
}

#[derive(Debug, Serialize)]
struct HealthResponse<'a> {
    status: &'static str,
    env: &'a str,
    version: &'static str,
    timestamp: String,
}

async fn health_handler(State(state): State<Arc<HealthState>>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok",
        env: &state.env,
        version: env!("CARGO_PKG_VERSION"),
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
    .into_response()
}

async fn not_found_handler() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(serde_json::json!({ "error": "not found" })),
    )
}

/// HTTP server fronted by admission control.
pub struct HttpServer {
    /// Address to bind to
    addr: SocketAddr,
    /// The limiter store shared by every request
    store: Arc<LimiterStore>,
    /// How callers are identified
    source: IdentitySource,
    /// Deployment environment reported by the health endpoint
    env: String,
}

impl HttpServer {
    /// Create a new HTTP server.
    pub fn new(addr: SocketAddr, store: Arc<LimiterStore>, source: IdentitySource) -> Self {
        Self {
            addr,
            store,
            source,
            env: "development".to_string(),
        }
    }

    /// Set the environment name reported by `/v1/health`.
    pub fn with_env(mut self, env: impl Into<String>) -> Self {
        self.env = env.into();
        self
    }

    /// Build the router with admission control in front of every route.
    pub fn router(&self) -> Router {
        let health = Arc::new(HealthState {
            env: self.env.clone(),
        });

        Router::new()
            .route("/v1/health", get(health_handler))
            .fallback(not_found_handler)
            .with_state(health)
            .layer(AdmissionLayer::new(Arc::clone(&self.store), self.source))
    }

    /// Start the HTTP server with graceful shutdown.
    ///
    /// The server will shut down when the provided signal resolves.
    pub async fn serve_with_shutdown<F>(self, signal: F) -> Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let router = self.router();

        let listener = TcpListener::bind(self.addr).await.map_err(|e| {
            error!(addr = %self.addr, error = %e, "Failed to bind HTTP listener");
            TurnstileError::Server(format!("failed to bind {}: {}", self.addr, e))
        })?;

        info!(
            addr = %self.addr,
            enabled = self.store.is_enabled(),
            limit = self.store.config().limit,
            window = ?self.store.config().window,
            "Starting HTTP server with admission control"
        );

        axum::serve(
            listener,
            router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(signal)
        .await
        .map_err(|e| {
            error!(error = %e, "HTTP server failed");
            TurnstileError::Io(e)
        })
    }
}

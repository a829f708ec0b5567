//! Registration API Server
//!
//! HTTP API for backends to claim a port slot in the pool, plus read-only
//! views of the pool for operators.

use crate::application::{Allocator, Registry};
use crate::domain::entities::{slot_address, Pool};
use crate::domain::errors::{AllocationError, StorageError};
use crate::infrastructure::ShutdownController;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

/// Registration request from a backend.
#[derive(Debug, Clone, Deserialize)]
pub struct RegisterRequest {
    /// Base URL without a port, e.g. `http://10.0.0.7`
    pub url: String,
}

/// Registration response: the port the backend must listen on.
#[derive(Debug, Serialize, Deserialize)]
pub struct RegisterResponse {
    pub port: u16,
    pub url: String,
}

/// Health response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub backends: usize,
    pub alive: usize,
}

/// Error returned by API handlers, rendered as `{"status", "message"}`.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("invalid backend url: {0}")]
    BadRequest(String),

    #[error(transparent)]
    Allocation(#[from] AllocationError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Allocation(AllocationError::NotRunning) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Allocation(AllocationError::Exhausted { .. }) => StatusCode::CONFLICT,
            ApiError::Allocation(AllocationError::Storage(_)) | ApiError::Storage(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("api request failed: {}", self);
        }
        let body = serde_json::json!({
            "status": status.as_u16(),
            "message": self.to_string(),
        });
        (status, Json(body)).into_response()
    }
}

/// API Server state.
#[derive(Clone)]
pub struct ApiState {
    pub registry: Arc<Registry>,
    pub allocator: Arc<Allocator>,
}

/// API Server for backend registration.
pub struct ApiServer {
    listen_addr: String,
    state: ApiState,
}

impl ApiServer {
    pub fn new(listen_addr: String, registry: Arc<Registry>, allocator: Arc<Allocator>) -> Self {
        Self {
            listen_addr,
            state: ApiState {
                registry,
                allocator,
            },
        }
    }

    pub fn router(&self) -> Router {
        Router::new()
            // Health endpoint
            .route("/health", get(health_handler))
            // Backend registration
            .route("/api/v1/register", post(register_handler))
            // Pool snapshot
            .route("/api/v1/pool", get(pool_handler))
            .layer(TraceLayer::new_for_http())
            .with_state(self.state.clone())
    }

    /// Run the API server until `shutdown` fires.
    #[cfg_attr(coverage_nightly, coverage(off))]
    pub async fn run(&self, shutdown: ShutdownController) -> anyhow::Result<()> {
        let listener = TcpListener::bind(&self.listen_addr).await?;
        tracing::info!("registration API listening on {}", self.listen_addr);

        axum::serve(listener, self.router())
            .with_graceful_shutdown(async move { shutdown.wait().await })
            .await?;
        Ok(())
    }
}

// Handler functions

async fn health_handler(State(state): State<ApiState>) -> Result<Json<HealthResponse>, ApiError> {
    let pool = state.registry.get_pool().await?;
    Ok(Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        backends: pool.backends.len(),
        alive: pool.alive_count(),
    }))
}

async fn register_handler(
    State(state): State<ApiState>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<RegisterResponse>), ApiError> {
    let base_url = req.url.trim();
    if reqwest::Url::parse(base_url).is_err() {
        return Err(ApiError::BadRequest(req.url));
    }

    let port = state.allocator.allocate(base_url).await?;

    let response = RegisterResponse {
        port,
        url: slot_address(base_url, port),
    };
    Ok((StatusCode::CREATED, Json(response)))
}

async fn pool_handler(State(state): State<ApiState>) -> Result<Json<Pool>, ApiError> {
    Ok(Json(state.registry.get_pool().await?))
}

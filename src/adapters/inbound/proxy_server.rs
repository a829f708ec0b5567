//! HTTP Proxy Server Adapter
//!
//! Accepts client requests, asks the load balancer for the next peer and
//! relays the request to it. The upstream response is passed back as-is.

use crate::domain::errors::{SelectError, StorageError};
use crate::domain::services::LoadBalancer;
use crate::infrastructure::ShutdownController;
use axum::{
    body::Body,
    extract::{Request, State},
    http::{HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json, Router,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

/// Largest request body relayed upstream.
const MAX_BODY_BYTES: usize = 16 * 1024 * 1024;

/// Headers scoped to a single connection, never relayed.
const HOP_BY_HOP: [&str; 8] = [
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailers",
    "transfer-encoding",
    "upgrade",
];

fn is_hop_by_hop(name: &str) -> bool {
    HOP_BY_HOP.iter().any(|h| name.eq_ignore_ascii_case(h))
}

/// Why a request could not be relayed.
#[derive(Debug, thiserror::Error)]
pub enum ForwardError {
    #[error("no alive backend available")]
    NoBackend,

    #[error("backend pool unavailable: {0}")]
    Storage(StorageError),

    #[error("invalid backend address: {0}")]
    InvalidTarget(String),

    #[error("failed to read request body: {0}")]
    Body(axum::Error),

    #[error("upstream request failed: {0}")]
    Upstream(#[from] reqwest::Error),
}

impl From<SelectError> for ForwardError {
    fn from(e: SelectError) -> Self {
        match e {
            SelectError::NoBackendAvailable => ForwardError::NoBackend,
            SelectError::Storage(e) => ForwardError::Storage(e),
        }
    }
}

impl ForwardError {
    pub fn status(&self) -> StatusCode {
        match self {
            ForwardError::NoBackend => StatusCode::SERVICE_UNAVAILABLE,
            ForwardError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ForwardError::Body(_) => StatusCode::BAD_REQUEST,
            ForwardError::InvalidTarget(_) | ForwardError::Upstream(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for ForwardError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = serde_json::json!({
            "status": status.as_u16(),
            "message": self.to_string(),
        });
        (status, Json(body)).into_response()
    }
}

/// Shared handler state.
#[derive(Clone)]
pub struct ProxyState {
    pub balancer: Arc<dyn LoadBalancer>,
    pub client: reqwest::Client,
}

impl ProxyState {
    /// Redirects are relayed to the client rather than followed.
    pub fn new(balancer: Arc<dyn LoadBalancer>) -> reqwest::Result<Self> {
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()?;
        Ok(Self { balancer, client })
    }
}

/// HTTP proxy server - inbound adapter for client traffic.
pub struct ProxyServer {
    listen_addr: String,
    state: ProxyState,
}

impl ProxyServer {
    pub fn new(listen_addr: String, balancer: Arc<dyn LoadBalancer>) -> anyhow::Result<Self> {
        Ok(Self {
            listen_addr,
            state: ProxyState::new(balancer)?,
        })
    }

    /// Every path and method goes to the forwarding handler.
    pub fn router(&self) -> Router {
        Router::new()
            .fallback(forward_handler)
            .layer(TraceLayer::new_for_http())
            .with_state(self.state.clone())
    }

    /// Run until `shutdown` fires, then drain in-flight requests.
    #[cfg_attr(coverage_nightly, coverage(off))]
    pub async fn run(&self, shutdown: ShutdownController) -> anyhow::Result<()> {
        let listener = TcpListener::bind(&self.listen_addr).await?;
        tracing::info!("proxy listening on {}", self.listen_addr);

        axum::serve(listener, self.router())
            .with_graceful_shutdown(async move { shutdown.wait().await })
            .await?;

        tracing::info!("proxy listener on {} closed", self.listen_addr);
        Ok(())
    }
}

async fn forward_handler(
    State(state): State<ProxyState>,
    req: Request,
) -> Result<Response, ForwardError> {
    let result = forward(&state, req).await;
    if let Err(e) = &result {
        tracing::warn!("request not forwarded: {}", e);
    }
    result
}

async fn forward(state: &ProxyState, req: Request) -> Result<Response, ForwardError> {
    let backend = state.balancer.next_peer().await?;

    let (parts, body) = req.into_parts();
    let path_and_query = parts
        .uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");
    let target = backend
        .forward_url(path_and_query)
        .ok_or_else(|| ForwardError::InvalidTarget(backend.address.clone()))?;

    let method = reqwest::Method::from_bytes(parts.method.as_str().as_bytes())
        .map_err(|_| ForwardError::InvalidTarget(format!("method {}", parts.method)))?;

    tracing::debug!("{} {} -> {}", parts.method, path_and_query, target);

    let mut upstream = state.client.request(method, target);
    for (name, value) in parts.headers.iter() {
        if *name == axum::http::header::HOST || is_hop_by_hop(name.as_str()) {
            continue;
        }
        upstream = upstream.header(name.as_str(), value.as_bytes());
    }

    let body = axum::body::to_bytes(body, MAX_BODY_BYTES)
        .await
        .map_err(ForwardError::Body)?;
    let upstream_response = upstream.body(body).send().await?;

    let status = StatusCode::from_u16(upstream_response.status().as_u16())
        .unwrap_or(StatusCode::BAD_GATEWAY);
    let headers: Vec<(HeaderName, HeaderValue)> = upstream_response
        .headers()
        .iter()
        .filter(|(name, _)| !is_hop_by_hop(name.as_str()))
        .filter_map(|(name, value)| {
            Some((
                HeaderName::from_bytes(name.as_str().as_bytes()).ok()?,
                HeaderValue::from_bytes(value.as_bytes()).ok()?,
            ))
        })
        .collect();
    let bytes = upstream_response.bytes().await?;

    let mut response = Response::new(Body::from(bytes));
    *response.status_mut() = status;
    for (name, value) in headers {
        response.headers_mut().append(name, value);
    }
    Ok(response)
}

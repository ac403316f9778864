//! HTTP surface: the JSON API consumed by the pack-size UI.
//!
//! ## URL layout
//!
//! ```text
//! GET  /healthz          → 200 "ok"
//! GET  /v1/pack-sizes    → {"pack_sizes": [...]}
//! PUT  /v1/pack-sizes    ← {"pack_sizes": [...]}
//! POST /v1/calculate     ← {"amount": n}  → {"packs": {"<size>": count}}
//! ```
//!
//! Errors are `{"error": "<message>"}` with a 4xx status for client input and
//! 500 for store failures.

mod api;

use std::sync::Arc;
use std::time::Instant;

use axum::{
    Router,
    extract::Request,
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::error::AppError;
use crate::pack::PackSizeConfig;

/// Router state injected into every handler via [`axum::extract::State`].
///
/// Cheap to clone; the config is reference-counted.
#[derive(Clone)]
pub struct ApiState {
    pub packs: Arc<PackSizeConfig>,
}

pub struct HttpServer {
    bind_addr: String,
    packs: Arc<PackSizeConfig>,
}

impl HttpServer {
    pub fn new(bind_addr: impl Into<String>, packs: Arc<PackSizeConfig>) -> Self {
        Self { bind_addr: bind_addr.into(), packs }
    }

    /// Bind and serve until `shutdown` is cancelled.
    pub async fn run(self, shutdown: CancellationToken) -> Result<(), AppError> {
        let listener = TcpListener::bind(&self.bind_addr)
            .await
            .map_err(|e| AppError::Server(format!("bind failed on {}: {e}", self.bind_addr)))?;
        serve(listener, self.packs, shutdown).await
    }
}

/// Serve the API on an already-bound listener until `shutdown` is cancelled.
pub async fn serve(
    listener: TcpListener,
    packs: Arc<PackSizeConfig>,
    shutdown: CancellationToken,
) -> Result<(), AppError> {
    let local_addr = listener
        .local_addr()
        .map_err(|e| AppError::Server(format!("listener has no local address: {e}")))?;
    let router = build_router(ApiState { packs });

    info!(%local_addr, "http server listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
        .map_err(|e| AppError::Server(format!("http server error: {e}")))?;

    info!(%local_addr, "http server shut down");
    Ok(())
}

pub fn build_router(state: ApiState) -> Router {
    Router::new()
        .route("/healthz",       get(api::health))
        .route("/v1/pack-sizes", get(api::list_pack_sizes).put(api::replace_pack_sizes))
        .route("/v1/calculate",  post(api::calculate))
        .layer(middleware::from_fn(access_log))
        .with_state(state)
}

/// One `info` event per request: method, path, status, duration.
async fn access_log(req: Request, next: Next) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let started = Instant::now();

    let response = next.run(req).await;

    info!(
        %method,
        %path,
        status = response.status().as_u16(),
        duration_ms = started.elapsed().as_millis() as u64,
        "request"
    );
    response
}

//! Axum handlers for the `/v1/*` routes.
//!
//! Bodies are decoded from raw bytes rather than the `Json` extractor so that
//! a missing `Content-Type` is accepted and every decode failure answers with
//! the same `{"error": ...}` shape.

use axum::{
    Json,
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Number, json};
use tracing::{error, warn};

use super::ApiState;
use crate::error::{AppError, PackError};
use crate::pack::{PackSizeSet, ShipmentPlan};

// ── Wire types ────────────────────────────────────────────────────────────────

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
pub(super) struct PackSizesRequest {
    #[serde(default)]
    pack_sizes: Vec<Number>,
}

#[derive(Serialize)]
pub(super) struct PackSizesResponse {
    pack_sizes: Vec<u64>,
}

impl From<&PackSizeSet> for PackSizesResponse {
    fn from(set: &PackSizeSet) -> Self {
        Self { pack_sizes: set.to_vec() }
    }
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
pub(super) struct CalculateRequest {
    amount: Option<Number>,
}

// ── Errors ────────────────────────────────────────────────────────────────────

/// Error response: `{"error": message}` with the given status.
#[derive(Debug)]
pub(super) struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self { status: StatusCode::BAD_REQUEST, message: message.into() }
    }

    fn internal(message: impl Into<String>) -> Self {
        Self { status: StatusCode::INTERNAL_SERVER_ERROR, message: message.into() }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

impl From<PackError> for ApiError {
    fn from(e: PackError) -> Self {
        Self::bad_request(e.to_string())
    }
}

// ── Helpers ───────────────────────────────────────────────────────────────────

fn decode_json<T: DeserializeOwned>(body: &Bytes) -> Result<T, ApiError> {
    serde_json::from_slice(body).map_err(|e| {
        warn!("rejecting request body: {e}");
        ApiError::bad_request("invalid json")
    })
}

/// Integers only; anything else becomes the error built by `invalid`.
fn integer(number: &Number, invalid: impl FnOnce(String) -> PackError) -> Result<i64, PackError> {
    number
        .as_i64()
        .ok_or_else(|| invalid(format!("{number} is not a supported integer")))
}

// ── Handlers ──────────────────────────────────────────────────────────────────

/// GET /healthz
pub(super) async fn health() -> &'static str {
    "ok"
}

/// GET /v1/pack-sizes
pub(super) async fn list_pack_sizes(State(state): State<ApiState>) -> Json<PackSizesResponse> {
    Json(PackSizesResponse::from(&state.packs.get()))
}

/// PUT /v1/pack-sizes: replace the whole set.
pub(super) async fn replace_pack_sizes(
    State(state): State<ApiState>,
    body: Bytes,
) -> Result<Json<PackSizesResponse>, ApiError> {
    let req: PackSizesRequest = decode_json(&body)?;
    let sizes = req
        .pack_sizes
        .iter()
        .map(|n| integer(n, PackError::InvalidPackSize))
        .collect::<Result<Vec<_>, _>>()?;

    let packs = state.packs.clone();
    let replaced = tokio::task::spawn_blocking(move || packs.replace(&sizes))
        .await
        .map_err(|e| {
            error!("pack-size replace task failed: {e}");
            ApiError::internal("failed to update pack sizes")
        })?;

    match replaced {
        Ok(set) => Ok(Json(PackSizesResponse::from(&set))),
        Err(AppError::Pack(e)) => Err(e.into()),
        Err(e) => {
            error!("pack-size replace failed: {e}");
            Err(ApiError::internal("failed to update pack sizes"))
        }
    }
}

/// POST /v1/calculate
pub(super) async fn calculate(
    State(state): State<ApiState>,
    body: Bytes,
) -> Result<Json<ShipmentPlan>, ApiError> {
    let req: CalculateRequest = decode_json(&body)?;
    // Absent or null reads as zero, which ships nothing.
    let amount = match req.amount {
        Some(ref n) => integer(n, PackError::InvalidAmount)?,
        None => 0,
    };

    let packs = state.packs.clone();
    let plan = tokio::task::spawn_blocking(move || packs.calculate(amount))
        .await
        .map_err(|e| {
            error!(amount, "calculation task failed: {e}");
            ApiError::internal("calculation failed")
        })??;

    Ok(Json(plan))
}

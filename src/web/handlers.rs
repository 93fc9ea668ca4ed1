//! JSON API handlers
//!
//! Endpoints under `/api/` other than `health` and `bundles` sit behind
//! [`require_bearer`](super::middleware::require_bearer) and receive the
//! resolved [`AuthUser`] as an extension.

use super::state::SharedState;
use crate::auth::AuthUser;
use crate::credits::{CreditBundle, BUNDLES};
use crate::error::{status_for, user_message, ForgeError};
use crate::generation::{GenerationOutcome, GenerationRequest};
use crate::storage::HistoryItem;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use serde::Deserialize;

/// Construct a JSON error response with the given status code and message
pub(crate) fn json_error(status: StatusCode, message: &str) -> Response {
    (status, Json(serde_json::json!({ "error": message }))).into_response()
}

/// Error returned by API handlers
///
/// Wraps any error and turns it into `{"error": message}` with the status
/// code of the [`ForgeError`](crate::ForgeError) it carries.
#[derive(Debug)]
pub struct ApiError(anyhow::Error);

impl<E> From<E> for ApiError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = status_for(&self.0);
        if status.is_server_error() {
            tracing::error!("Request failed ({}): {:#}", status, self.0);
        } else {
            tracing::debug!("Request rejected ({}): {:#}", status, self.0);
        }
        json_error(status, &user_message(&self.0))
    }
}

/// Country code sent by the edge proxy, if any
pub(crate) fn request_country<'a>(state: &SharedState, headers: &'a HeaderMap) -> Option<&'a str> {
    headers
        .get(state.config.generation.country_header.as_str())
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|c| !c.is_empty())
}

/// GET /api/health
pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// GET /api/bundles
pub async fn bundles() -> Json<Vec<CreditBundle>> {
    Json(BUNDLES.to_vec())
}

/// Turn a body the JSON extractor refused into a 400
fn invalid_body(rejection: JsonRejection) -> ApiError {
    ApiError::from(ForgeError::Validation(format!(
        "Invalid request: {}",
        rejection.body_text()
    )))
}

/// POST /api/generate
pub async fn generate(
    State(state): State<SharedState>,
    Extension(user): Extension<AuthUser>,
    headers: HeaderMap,
    payload: Result<Json<GenerationRequest>, JsonRejection>,
) -> Result<Json<GenerationOutcome>, ApiError> {
    let Json(request) = payload.map_err(invalid_body)?;
    let country = request_country(&state, &headers);
    let outcome = state.generation.generate(&user.id, &request, country).await?;
    Ok(Json(outcome))
}

/// GET /api/user/credits
pub async fn credits(
    State(state): State<SharedState>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let balance = state.generation.balance(&user.id).await?;
    Ok(Json(serde_json::json!({ "credits": balance })))
}

/// Query parameters of `GET /api/history`
#[derive(Debug, Default, Deserialize)]
pub struct HistoryQuery {
    /// Maximum number of rows
    pub limit: Option<usize>,
}

/// GET /api/history
pub async fn history(
    State(state): State<SharedState>,
    Extension(user): Extension<AuthUser>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Vec<HistoryItem>>, ApiError> {
    let items = state.generation.history(&user.id, query.limit).await?;
    Ok(Json(items))
}

/// Fallback for unknown routes
pub async fn not_found() -> Response {
    json_error(StatusCode::NOT_FOUND, "not found")
}

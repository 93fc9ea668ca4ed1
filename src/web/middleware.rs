//! HTTP middleware: bearer token authentication for the JSON API

use super::handlers::ApiError;
use super::state::SharedState;
use crate::auth::bearer_token;
use crate::error::ForgeError;
use axum::extract::{Request, State};
use axum::http::header;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

/// Resolve `Authorization: Bearer <token>` to a user
///
/// The token is checked against the identity service, a ledger account is
/// opened on first sight, and the [`AuthUser`](crate::auth::AuthUser) is
/// handed to the handler as a request extension. Anything else is a 401.
pub async fn require_bearer(
    State(state): State<SharedState>,
    mut request: Request,
    next: Next,
) -> Response {
    let token = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(bearer_token)
        .map(str::to_string);

    let token = match token {
        Some(t) => t,
        None => {
            return ApiError::from(ForgeError::Unauthorized(
                "Missing bearer token".to_string(),
            ))
            .into_response()
        }
    };

    let user = match state.identity.get_user(&token).await {
        Ok(user) => user,
        Err(e) => return ApiError::from(e).into_response(),
    };

    if let Err(e) = state
        .generation
        .open_account(&user.id, user.email.as_deref())
        .await
    {
        return ApiError::from(e).into_response();
    }

    tracing::debug!(user_id = %user.id, path = %request.uri().path(), "Authenticated API request");
    request.extensions_mut().insert(user);
    next.run(request).await
}

//! Token revocation endpoint handler (RFC 7009).

use axum::Form;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::Deserialize;
use tracing::warn;

use super::{OAuthState, error_response};

/// Revocation request body.
#[derive(Debug, Clone, Deserialize)]
pub struct RevokeRequest {
    /// The refresh token to revoke.
    pub token: String,
}

/// `POST /oauth/revoke`
///
/// Revokes a refresh token. Per RFC 7009, revoking an unknown token still
/// returns 200, so the caller learns nothing about which tokens exist. Only
/// storage failures produce an error response.
pub async fn revoke_handler(
    State(state): State<OAuthState>,
    Form(request): Form<RevokeRequest>,
) -> Response {
    match state.service.revoke_refresh_token(&request.token).await {
        Ok(()) => (StatusCode::OK, Json(serde_json::json!({}))).into_response(),
        Err(ref err) => {
            warn!(error = %err, "Revocation failed");
            error_response(err)
        }
    }
}

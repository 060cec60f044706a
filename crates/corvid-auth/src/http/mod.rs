//! Axum HTTP handlers for the OAuth endpoints.
//!
//! - `GET /oauth/authorize`: validate the request, create a pending session
//! - `POST /oauth/callback`: authenticate the resource owner, mint a code
//! - `POST /oauth/token`: exchange a code or refresh token for tokens
//! - `POST /oauth/revoke`: revoke a refresh token
//!
//! All error responses share the fixed `{error, error_description}` shape;
//! nothing internal leaks into a response body.

pub mod authorize;
pub mod callback;
pub mod revoke;
pub mod token;

use std::sync::Arc;

use axum::Router;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};

use crate::error::AuthError;
use crate::oauth::service::AuthorizationService;
use crate::oauth::token::WireError;

pub use authorize::authorize_handler;
pub use callback::{CallbackRequest, callback_handler};
pub use revoke::{RevokeRequest, revoke_handler};
pub use token::token_handler;

/// Shared state for the OAuth handlers.
#[derive(Clone)]
pub struct OAuthState {
    /// The authorization service.
    pub service: Arc<AuthorizationService>,
}

impl OAuthState {
    /// Creates handler state around a service.
    #[must_use]
    pub fn new(service: Arc<AuthorizationService>) -> Self {
        Self { service }
    }
}

/// Builds the OAuth endpoint router.
#[must_use]
pub fn router(state: OAuthState) -> Router {
    Router::new()
        .route("/oauth/authorize", get(authorize_handler))
        .route("/oauth/callback", post(callback_handler))
        .route("/oauth/token", post(token_handler))
        .route("/oauth/revoke", post(revoke_handler))
        .with_state(state)
}

/// Converts an `AuthError` to the uniform HTTP error response.
pub(crate) fn error_response(err: &AuthError) -> Response {
    let status =
        StatusCode::from_u16(err.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(WireError::from_auth_error(err))).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_response_status() {
        let response = error_response(&AuthError::invalid_grant("nope"));
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = error_response(&AuthError::service_unavailable("down"));
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

        let response = error_response(&AuthError::upstream_auth_failed("bad password"));
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}

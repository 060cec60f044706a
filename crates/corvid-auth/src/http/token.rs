//! Token endpoint handler.
//!
//! `POST /oauth/token` with an `application/x-www-form-urlencoded` body,
//! per OAuth convention:
//!
//! ```text
//! grant_type=authorization_code
//! &code=3q9X...
//! &code_verifier=dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk
//! &client_id=corvid-cli
//! &redirect_uri=http://127.0.0.1:8976/callback
//! ```

use axum::Form;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use tracing::{debug, info, warn};

use super::{OAuthState, error_response};
use crate::oauth::token::TokenRequest;

/// `POST /oauth/token`
///
/// Exchanges an authorization code + PKCE verifier, or a refresh token, for
/// an access/refresh token pair. Grant failures all surface as the uniform
/// `invalid_grant` wire error.
pub async fn token_handler(
    State(state): State<OAuthState>,
    Form(request): Form<TokenRequest>,
) -> Response {
    debug!(
        grant_type = %request.grant_type,
        client_id = ?request.client_id,
        "Processing token request"
    );

    match state.service.token(&request).await {
        Ok(reply) => {
            info!(
                grant_type = %request.grant_type,
                client_id = ?request.client_id,
                "Token issued"
            );
            (StatusCode::OK, Json(reply)).into_response()
        }
        Err(ref err) => {
            warn!(
                grant_type = %request.grant_type,
                client_id = ?request.client_id,
                error = %err,
                "Token request failed"
            );
            error_response(err)
        }
    }
}

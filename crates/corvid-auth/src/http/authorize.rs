//! Authorization endpoint handler.

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use tracing::{debug, warn};

use super::{OAuthState, error_response};
use crate::oauth::authorize::AuthorizeRequest;

/// `GET /oauth/authorize`
///
/// Validates the request, creates a pending authorization session, and
/// returns the login URL plus the `state` value the client must round-trip.
pub async fn authorize_handler(
    State(state): State<OAuthState>,
    Query(request): Query<AuthorizeRequest>,
) -> Response {
    debug!(
        client_id = ?request.client_id,
        scope = %request.scope,
        "Processing authorize request"
    );

    match state.service.authorize(&request).await {
        Ok(reply) => (StatusCode::OK, Json(reply)).into_response(),
        Err(ref err) => {
            warn!(
                client_id = ?request.client_id,
                error = %err,
                "Authorize request failed"
            );
            error_response(err)
        }
    }
}

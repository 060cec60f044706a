//! Callback endpoint handler.
//!
//! The login page posts the resource owner's credentials together with the
//! `state` from the authorize step. On success the response carries the
//! single-use authorization code; the client then finishes at the token
//! endpoint.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::Deserialize;
use tracing::warn;

use super::{OAuthState, error_response};
use crate::authn::Credential;
use crate::error::AuthError;

/// Callback request body.
///
/// Exactly one credential form is accepted: `email` + `password`, or
/// `api_key`. The flat wire shape is converted into the tagged
/// [`Credential`] type before anything else looks at it.
#[derive(Debug, Clone, Deserialize)]
pub struct CallbackRequest {
    /// Account email (password flow).
    #[serde(default)]
    pub email: Option<String>,

    /// Account password (password flow).
    #[serde(default)]
    pub password: Option<String>,

    /// API key (CLI / vendor flow).
    #[serde(default)]
    pub api_key: Option<String>,

    /// State value from the authorize step.
    pub state: String,
}

impl CallbackRequest {
    /// Resolves the flat body into a tagged credential.
    ///
    /// # Errors
    ///
    /// Returns `InvalidRequest` when both forms, neither form, or a
    /// passwordless email login is presented.
    pub fn credential(&self) -> Result<Credential, AuthError> {
        match (&self.api_key, &self.email) {
            (Some(api_key), None) => Ok(Credential::ApiKey {
                api_key: api_key.clone(),
            }),
            (None, Some(email)) => {
                let password = self.password.clone().ok_or_else(|| {
                    AuthError::invalid_request("password is required with email")
                })?;
                Ok(Credential::Password {
                    email: email.clone(),
                    password,
                })
            }
            (Some(_), Some(_)) => Err(AuthError::invalid_request(
                "provide either email and password or api_key, not both",
            )),
            (None, None) => Err(AuthError::invalid_request("missing credentials")),
        }
    }
}

/// `POST /oauth/callback`
///
/// Authenticates the resource owner through the external adapter and mints
/// the authorization code, consuming the `state` in the same step.
pub async fn callback_handler(
    State(state): State<OAuthState>,
    Json(request): Json<CallbackRequest>,
) -> Response {
    let credential = match request.credential() {
        Ok(credential) => credential,
        Err(ref err) => return error_response(err),
    };

    match state.service.issue_code(&request.state, &credential).await {
        Ok(grant) => (StatusCode::OK, Json(grant)).into_response(),
        Err(ref err) => {
            warn!(
                credential = credential.kind(),
                error = %err,
                "Callback failed"
            );
            error_response(err)
        }
    }
}

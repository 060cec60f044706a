//! Identity-service authentication adapter.
//!
//! Credential verification lives in a separate identity service; this
//! adapter forwards the tagged [`Credential`] over HTTP and maps the
//! response to a [`Principal`]. Credential material is never logged.

use async_trait::async_trait;
use reqwest::StatusCode;
use tracing::warn;

use corvid_auth::oauth::session::Principal;
use corvid_auth::{AuthError, AuthResult, Credential, ResourceOwnerAuthenticator};

/// Resource-owner authenticator backed by the identity service.
pub struct UpstreamAuthenticator {
    client: reqwest::Client,
    base_url: String,
}

impl UpstreamAuthenticator {
    /// Creates an adapter for the identity service at `base_url`.
    #[must_use]
    pub fn new(base_url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url,
        }
    }
}

#[async_trait]
impl ResourceOwnerAuthenticator for UpstreamAuthenticator {
    async fn authenticate(&self, credential: &Credential) -> AuthResult<Principal> {
        let url = format!(
            "{}/v1/authenticate",
            self.base_url.trim_end_matches('/')
        );

        let response = self
            .client
            .post(&url)
            .json(credential)
            .send()
            .await
            .map_err(|err| {
                warn!(error = %err, "Identity service unreachable");
                AuthError::service_unavailable("identity service unreachable")
            })?;

        match response.status() {
            status if status.is_success() => response.json::<Principal>().await.map_err(|err| {
                warn!(error = %err, "Identity service returned an unparsable principal");
                AuthError::internal("identity service returned an invalid response")
            }),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                Err(AuthError::upstream_auth_failed("credentials rejected"))
            }
            status => {
                warn!(status = %status, "Identity service error");
                Err(AuthError::service_unavailable(
                    "identity service returned an error",
                ))
            }
        }
    }
}

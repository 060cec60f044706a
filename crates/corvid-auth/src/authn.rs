//! Resource-owner authentication boundary.
//!
//! The issuer does not validate passwords or API keys itself; it hands a
//! [`Credential`] to an external adapter and consumes the resulting
//! [`Principal`]. `Credential` is an explicit tagged type with one
//! well-defined discriminator; there is no prefix-sniffing of token shapes
//! anywhere in the flow.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::AuthResult;
use crate::oauth::session::Principal;

/// Credentials presented by a resource owner at the callback step.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Credential {
    /// Email + password login (browser flow).
    Password {
        /// Account email address.
        email: String,
        /// Plaintext password, forwarded to the adapter and never stored.
        password: String,
    },
    /// API-key login (CLI / vendor integration flow).
    ApiKey {
        /// The presented API key, forwarded to the adapter and never stored.
        api_key: String,
    },
}

impl Credential {
    /// A redacted label for logging. Never includes the secret material.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Password { .. } => "password",
            Self::ApiKey { .. } => "api_key",
        }
    }
}

/// External collaborator that verifies resource-owner credentials.
///
/// Implementations check the password against the user directory or validate
/// the API key cryptographically; this crate only consumes the resulting
/// identity claims. Rejections surface as
/// [`AuthError::UpstreamAuthFailed`](crate::AuthError::UpstreamAuthFailed).
#[async_trait]
pub trait ResourceOwnerAuthenticator: Send + Sync {
    /// Authenticates the credential and returns the principal it belongs to.
    ///
    /// # Errors
    ///
    /// Returns `UpstreamAuthFailed` for bad credentials; infrastructure
    /// failures map to `ServiceUnavailable`/`Storage`.
    async fn authenticate(&self, credential: &Credential) -> AuthResult<Principal>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credential_kind_redacts() {
        let cred = Credential::Password {
            email: "a@example.com".to_string(),
            password: "hunter2".to_string(),
        };
        assert_eq!(cred.kind(), "password");

        let cred = Credential::ApiKey {
            api_key: "key-material".to_string(),
        };
        assert_eq!(cred.kind(), "api_key");
    }

    #[test]
    fn test_credential_tagged_serde() {
        let json = serde_json::json!({"type": "api_key", "api_key": "k1"});
        let cred: Credential = serde_json::from_value(json).unwrap();
        assert!(matches!(cred, Credential::ApiKey { ref api_key } if api_key == "k1"));

        // Unknown discriminators are rejected rather than guessed at.
        let json = serde_json::json!({"type": "bearer", "token": "t"});
        assert!(serde_json::from_value::<Credential>(json).is_err());
    }
}

//! Token endpoint types.
//!
//! Request parsing, response generation, and the fixed wire error shape for
//! `POST /oauth/token`. Two grant types are supported:
//!
//! - `authorization_code`: exchange a single-use code + PKCE verifier
//! - `refresh_token`: exchange an outstanding refresh token

use serde::{Deserialize, Serialize};

use crate::error::AuthError;

fn default_grant_type() -> String {
    "authorization_code".to_string()
}

/// Token request parameters.
///
/// Field requirements depend on `grant_type`:
///
/// - `authorization_code`: `code`, `code_verifier`, `client_id`, `redirect_uri`
/// - `refresh_token`: `refresh_token`
#[derive(Debug, Clone, Deserialize)]
pub struct TokenRequest {
    /// OAuth 2.0 grant type. Defaults to `authorization_code` for clients
    /// that omit it.
    #[serde(default = "default_grant_type")]
    pub grant_type: String,

    /// Authorization code (for authorization_code grant).
    #[serde(default)]
    pub code: Option<String>,

    /// PKCE code verifier (for authorization_code grant).
    #[serde(default)]
    pub code_verifier: Option<String>,

    /// Client ID; must match the session's client.
    #[serde(default)]
    pub client_id: Option<String>,

    /// Redirect URI; must match the authorization request.
    #[serde(default)]
    pub redirect_uri: Option<String>,

    /// Refresh token (for refresh_token grant).
    #[serde(default)]
    pub refresh_token: Option<String>,

    /// Requested scope (refresh only; must not exceed the original grant).
    #[serde(default)]
    pub scope: Option<String>,
}

/// Successful token response.
///
/// ```json
/// {
///   "access_token": "eyJhbG...",
///   "token_type": "Bearer",
///   "expires_in": 3600,
///   "scope": "memories:read",
///   "refresh_token": "3q9X..."
/// }
/// ```
#[derive(Debug, Clone, Serialize)]
pub struct TokenReply {
    /// The access token (JWT).
    pub access_token: String,

    /// Token type, always "Bearer".
    pub token_type: String,

    /// Access token lifetime in seconds.
    pub expires_in: u64,

    /// Granted scopes (space-separated).
    pub scope: String,

    /// Opaque refresh token plaintext. Shown exactly once.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
}

impl TokenReply {
    /// Creates a new token reply with required fields.
    #[must_use]
    pub fn new(access_token: String, expires_in: u64, scope: String) -> Self {
        Self {
            access_token,
            token_type: "Bearer".to_string(),
            expires_in,
            scope,
            refresh_token: None,
        }
    }

    /// Sets the refresh token.
    #[must_use]
    pub fn with_refresh_token(mut self, token: String) -> Self {
        self.refresh_token = Some(token);
        self
    }
}

/// Fixed wire error shape for the token and callback endpoints.
///
/// No stack traces or internal identifiers ever appear here; descriptions
/// are deliberately generic for grant failures.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireError {
    /// Error code from the taxonomy in [`crate::error`].
    pub error: String,

    /// Human-readable description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_description: Option<String>,
}

impl WireError {
    /// Builds the wire representation of an error.
    ///
    /// Server-side failures are flattened to a generic description so that
    /// nothing internal leaks; client errors keep their message, which is
    /// already written without identifiers.
    #[must_use]
    pub fn from_auth_error(err: &AuthError) -> Self {
        let description = if err.is_server_error() {
            "temporarily unable to process the request".to_string()
        } else {
            err.to_string()
        };
        Self {
            error: err.oauth_error_code().to_string(),
            error_description: Some(description),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_request_defaults_grant_type() {
        let json = r#"{
            "code": "SplxlOBeZQQYbYS6WxSbIA",
            "code_verifier": "dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk",
            "client_id": "corvid-cli",
            "redirect_uri": "http://127.0.0.1:8976/callback"
        }"#;

        let request: TokenRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.grant_type, "authorization_code");
        assert_eq!(request.code.as_deref(), Some("SplxlOBeZQQYbYS6WxSbIA"));
        assert!(request.refresh_token.is_none());
    }

    #[test]
    fn test_token_request_refresh_grant() {
        let json = r#"{
            "grant_type": "refresh_token",
            "refresh_token": "tGzv3JOkF0XG5Qx2TlKWIA"
        }"#;

        let request: TokenRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.grant_type, "refresh_token");
        assert_eq!(
            request.refresh_token.as_deref(),
            Some("tGzv3JOkF0XG5Qx2TlKWIA")
        );
    }

    #[test]
    fn test_token_reply_serialization() {
        let reply = TokenReply::new("jwt".to_string(), 3600, "memories:read".to_string());
        let json = serde_json::to_string(&reply).unwrap();

        assert!(json.contains(r#""token_type":"Bearer""#));
        assert!(json.contains(r#""expires_in":3600"#));
        assert!(!json.contains("refresh_token"));

        let with_refresh = TokenReply::new("jwt".to_string(), 3600, "s".to_string())
            .with_refresh_token("opaque".to_string());
        let json = serde_json::to_string(&with_refresh).unwrap();
        assert!(json.contains(r#""refresh_token":"opaque""#));
    }

    #[test]
    fn test_wire_error_masks_server_failures() {
        let err = AuthError::storage("connection refused to db-internal-host:5432");
        let wire = WireError::from_auth_error(&err);

        assert_eq!(wire.error, "server_error");
        assert!(!wire.error_description.unwrap().contains("db-internal-host"));
    }

    #[test]
    fn test_wire_error_keeps_grant_code() {
        let err = AuthError::invalid_grant("authorization code is invalid or expired");
        let wire = WireError::from_auth_error(&err);

        assert_eq!(wire.error, "invalid_grant");
        assert!(wire.error_description.is_some());
    }
}

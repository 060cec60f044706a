//! Authorization endpoint types.
//!
//! The authorization endpoint is the first step in the code flow: it
//! validates the request, persists a pending session, and returns the URL
//! the client follows to authenticate, together with the `state` value it
//! must round-trip.

use serde::{Deserialize, Serialize};

/// Authorization request parameters (`GET /oauth/authorize` query string).
///
/// PKCE parameters are optional as a pair: clients that implement PKCE send
/// `code_challenge` + `code_challenge_method`; simplified clients send
/// neither and the server generates the pair on their behalf, returning the
/// verifier once in the reply. Sending one without the other is a
/// validation error.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthorizeRequest {
    /// Client identifier. When absent, the registry's default client applies.
    #[serde(default)]
    pub client_id: Option<String>,

    /// Redirect URI where the code will eventually be sent.
    pub redirect_uri: String,

    /// Requested scopes (space-separated).
    pub scope: String,

    /// PKCE code challenge.
    #[serde(default)]
    pub code_challenge: Option<String>,

    /// PKCE code challenge method ("S256" or "plain").
    #[serde(default)]
    pub code_challenge_method: Option<String>,
}

/// Authorization reply returned to the client.
#[derive(Debug, Clone, Serialize)]
pub struct AuthorizeReply {
    /// URL the client should open to let the resource owner authenticate.
    pub auth_url: String,

    /// CSRF-protection state the client must present at the callback.
    pub state: String,

    /// Seconds until the pending session expires.
    pub expires_in: u64,

    /// PKCE verifier, present only when the server generated the pair for a
    /// simplified client. Shown exactly once.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code_verifier: Option<String>,
}

/// Code grant returned by the callback after successful authentication.
///
/// The client forwards `code` (plus its verifier) to the token endpoint and
/// checks that `state` matches what it sent to `/oauth/authorize`.
#[derive(Debug, Clone, Serialize)]
pub struct CodeGrant {
    /// Single-use authorization code.
    pub code: String,

    /// Echoed state parameter for the client's CSRF check.
    pub state: String,
}

impl CodeGrant {
    /// Builds the redirect URL carrying the code back to the client.
    ///
    /// # Errors
    ///
    /// Returns an error if the redirect URI is not a valid URL.
    pub fn to_redirect_url(&self, redirect_uri: &str) -> Result<String, url::ParseError> {
        let mut url = url::Url::parse(redirect_uri)?;
        url.query_pairs_mut()
            .append_pair("code", &self.code)
            .append_pair("state", &self.state);
        Ok(url.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_authorize_request_deserialize() {
        let json = r#"{
            "client_id": "corvid-cli",
            "redirect_uri": "http://127.0.0.1:8976/callback",
            "scope": "memories:read",
            "code_challenge": "E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM",
            "code_challenge_method": "S256"
        }"#;

        let request: AuthorizeRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.client_id.as_deref(), Some("corvid-cli"));
        assert_eq!(request.redirect_uri, "http://127.0.0.1:8976/callback");
        assert_eq!(request.code_challenge_method.as_deref(), Some("S256"));
    }

    #[test]
    fn test_authorize_request_minimal() {
        let json = r#"{
            "redirect_uri": "http://127.0.0.1:8976/callback",
            "scope": "memories:read"
        }"#;

        let request: AuthorizeRequest = serde_json::from_str(json).unwrap();
        assert!(request.client_id.is_none());
        assert!(request.code_challenge.is_none());
        assert!(request.code_challenge_method.is_none());
    }

    #[test]
    fn test_authorize_reply_hides_absent_verifier() {
        let reply = AuthorizeReply {
            auth_url: "https://auth.example.com/login?state=abc".to_string(),
            state: "abc".to_string(),
            expires_in: 600,
            code_verifier: None,
        };

        let json = serde_json::to_string(&reply).unwrap();
        assert!(json.contains(r#""expires_in":600"#));
        assert!(!json.contains("code_verifier"));
    }

    #[test]
    fn test_code_grant_to_redirect_url() {
        let grant = CodeGrant {
            code: "code123".to_string(),
            state: "state456".to_string(),
        };

        let url = grant
            .to_redirect_url("http://127.0.0.1:8976/callback")
            .unwrap();
        assert!(url.starts_with("http://127.0.0.1:8976/callback?"));
        assert!(url.contains("code=code123"));
        assert!(url.contains("state=state456"));
    }
}

//! Authorization session management.
//!
//! An [`AuthorizationSession`] tracks one authorization-code flow from the
//! initial `/oauth/authorize` request through code exchange. The session is
//! a small state machine:
//!
//! ```text
//! Pending(state) --auth success--> CodeIssued(code) --exchange--> Consumed
//! Pending        --expiry-------> Expired
//! CodeIssued     --expiry-------> Expired
//! ```
//!
//! `Consumed` and `Expired` are terminal; no transition re-enters `Pending`
//! or `CodeIssued`.
//!
//! # Security
//!
//! - `state` and the authorization code are independent 384-bit random
//!   values; neither is derivable from the other.
//! - The code plaintext is never stored: the session holds a fast lookup
//!   digest plus a slow verification hash (see [`crate::token_hash`]).
//! - Each key has its own consumption timestamp, so a session that has
//!   progressed to a code can never again be reached via `state`, and every
//!   consume is an atomic race with exactly one winner.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::oauth::pkce::{self, OPAQUE_TOKEN_BYTES};

/// Lifetime of a pending session before the resource owner authenticates.
pub const DEFAULT_STATE_LIFETIME_SECS: i64 = 600;

/// Lifetime of an issued authorization code.
pub const DEFAULT_CODE_LIFETIME_SECS: i64 = 300;

/// Authorization session stored in the database, keyed by `state`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizationSession {
    /// Unique session identifier.
    pub id: Uuid,

    /// CSRF-protection state value, unique, the primary lookup key while
    /// the session is pending.
    pub state: String,

    /// Client identifier that initiated the request.
    pub client_id: String,

    /// Redirect URI from the authorization request.
    /// Must match the redirect_uri in the token request.
    pub redirect_uri: String,

    /// Requested scopes (space-separated), echoed back unmodified.
    pub scope: String,

    /// PKCE code challenge from the authorization request.
    pub code_challenge: String,

    /// PKCE challenge method ("S256" or "plain").
    pub code_challenge_method: String,

    /// Fast digest of the authorization code, unique when present.
    /// This is the storage lookup key for the code.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code_lookup: Option<String>,

    /// Slow hash of the authorization code, verified at exchange.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code_hash: Option<String>,

    /// Authenticated principal, set at code issuance.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub principal: Option<Principal>,

    /// Timestamp when the session was created.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,

    /// Timestamp when the session expires. Shortened at code issuance.
    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,

    /// When the `state` was consumed (code issued). None while pending.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "time::serde::rfc3339::option"
    )]
    pub state_consumed_at: Option<OffsetDateTime>,

    /// When the authorization code was consumed (tokens issued).
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "time::serde::rfc3339::option"
    )]
    pub code_consumed_at: Option<OffsetDateTime>,
}

impl AuthorizationSession {
    /// Generates a new cryptographically secure state value.
    #[must_use]
    pub fn generate_state() -> String {
        pkce::generate_opaque_token(OPAQUE_TOKEN_BYTES)
    }

    /// Generates a new cryptographically secure authorization code.
    #[must_use]
    pub fn generate_code() -> String {
        pkce::generate_opaque_token(OPAQUE_TOKEN_BYTES)
    }

    /// Returns `true` if the session has expired.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        OffsetDateTime::now_utc() > self.expires_at
    }

    /// Returns `true` if a code has been attached to this session.
    #[must_use]
    pub fn has_code(&self) -> bool {
        self.code_lookup.is_some()
    }

    /// Returns `true` if the `state` has been consumed.
    #[must_use]
    pub fn is_state_consumed(&self) -> bool {
        self.state_consumed_at.is_some()
    }

    /// Returns `true` if the authorization code has been consumed.
    #[must_use]
    pub fn is_code_consumed(&self) -> bool {
        self.code_consumed_at.is_some()
    }

    /// Returns the session's position in the flow state machine.
    #[must_use]
    pub fn status(&self) -> SessionStatus {
        if self.is_code_consumed() {
            SessionStatus::Consumed
        } else if self.is_expired() {
            SessionStatus::Expired
        } else if self.has_code() {
            SessionStatus::CodeIssued
        } else {
            SessionStatus::Pending
        }
    }
}

/// Position of a session in the authorization flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionStatus {
    /// Created, waiting for the resource owner to authenticate.
    Pending,
    /// A single-use authorization code is outstanding.
    CodeIssued,
    /// The code was exchanged for tokens. Terminal.
    Consumed,
    /// Timed out before completing. Terminal.
    Expired,
}

/// Hashed representation of an authorization code as handed to storage.
///
/// The plaintext code exists only in the redirect to the client; what the
/// store keeps is this pair.
#[derive(Debug, Clone)]
pub struct StoredCode {
    /// Fast digest (SHA-256 hex), the unique lookup key.
    pub lookup: String,
    /// Slow hash (bcrypt), verified at exchange.
    pub hash: String,
}

/// The authenticated resource owner bound to a session and its tokens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Principal {
    /// Who authenticated: an end user or a vendor integration.
    pub subject: Subject,

    /// Organization the subject belongs to.
    pub organization_id: String,

    /// Scopes granted to this principal.
    pub scopes: Vec<String>,
}

impl Principal {
    /// The value used as the `sub` claim in issued tokens.
    #[must_use]
    pub fn subject_id(&self) -> &str {
        match &self.subject {
            Subject::User { user_id } => user_id,
            Subject::Vendor { vendor_code } => vendor_code,
        }
    }
}

/// Subject identity inside a [`Principal`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Subject {
    /// An end user authenticated with email + password.
    User {
        /// Stable user identifier.
        user_id: String,
    },
    /// A vendor integration authenticated with an API key.
    Vendor {
        /// Stable vendor identifier.
        vendor_code: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::Duration;

    fn test_session(
        expires_at: OffsetDateTime,
        code: Option<&str>,
        state_consumed_at: Option<OffsetDateTime>,
        code_consumed_at: Option<OffsetDateTime>,
    ) -> AuthorizationSession {
        let now = OffsetDateTime::now_utc();
        AuthorizationSession {
            id: Uuid::new_v4(),
            state: AuthorizationSession::generate_state(),
            client_id: "corvid-cli".to_string(),
            redirect_uri: "http://127.0.0.1:8976/callback".to_string(),
            scope: "memories:read memories:write".to_string(),
            code_challenge: "E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM".to_string(),
            code_challenge_method: "S256".to_string(),
            code_lookup: code.map(crate::token_hash::TokenHasher::hash_fast),
            code_hash: code.map(|c| format!("$2b$04${c}")),
            principal: None,
            created_at: now,
            expires_at,
            state_consumed_at,
            code_consumed_at,
        }
    }

    #[test]
    fn test_generate_state_and_code_independent() {
        let state = AuthorizationSession::generate_state();
        let code = AuthorizationSession::generate_code();

        // 48 bytes base64url = 64 characters
        assert_eq!(state.len(), 64);
        assert_eq!(code.len(), 64);
        assert_ne!(state, code);
    }

    #[test]
    fn test_status_pending() {
        let now = OffsetDateTime::now_utc();
        let session = test_session(now + Duration::minutes(10), None, None, None);
        assert_eq!(session.status(), SessionStatus::Pending);
        assert!(!session.has_code());
        assert!(!session.is_expired());
    }

    #[test]
    fn test_status_code_issued() {
        let now = OffsetDateTime::now_utc();
        let session = test_session(now + Duration::minutes(5), Some("code"), Some(now), None);
        assert_eq!(session.status(), SessionStatus::CodeIssued);
        assert!(session.is_state_consumed());
        assert!(!session.is_code_consumed());
    }

    #[test]
    fn test_status_consumed_is_terminal() {
        let now = OffsetDateTime::now_utc();
        let session = test_session(
            now + Duration::minutes(5),
            Some("code"),
            Some(now),
            Some(now),
        );
        assert_eq!(session.status(), SessionStatus::Consumed);

        // Consumed wins over expired
        let session = test_session(
            now - Duration::minutes(1),
            Some("code"),
            Some(now),
            Some(now),
        );
        assert_eq!(session.status(), SessionStatus::Consumed);
    }

    #[test]
    fn test_status_expired() {
        let now = OffsetDateTime::now_utc();
        let session = test_session(now - Duration::seconds(1), None, None, None);
        assert_eq!(session.status(), SessionStatus::Expired);

        let session = test_session(now - Duration::seconds(1), Some("code"), Some(now), None);
        assert_eq!(session.status(), SessionStatus::Expired);
    }

    #[test]
    fn test_principal_subject_id() {
        let user = Principal {
            subject: Subject::User {
                user_id: "user-123".to_string(),
            },
            organization_id: "org-9".to_string(),
            scopes: vec!["memories:read".to_string()],
        };
        assert_eq!(user.subject_id(), "user-123");

        let vendor = Principal {
            subject: Subject::Vendor {
                vendor_code: "acme".to_string(),
            },
            organization_id: "org-9".to_string(),
            scopes: vec![],
        };
        assert_eq!(vendor.subject_id(), "acme");
    }

    #[test]
    fn test_subject_serde_tag() {
        let json = serde_json::to_value(Subject::Vendor {
            vendor_code: "acme".to_string(),
        })
        .unwrap();
        assert_eq!(json["type"], "vendor");
        assert_eq!(json["vendor_code"], "acme");

        let parsed: Subject =
            serde_json::from_value(serde_json::json!({"type": "user", "user_id": "u1"})).unwrap();
        assert_eq!(
            parsed,
            Subject::User {
                user_id: "u1".to_string()
            }
        );
    }

    #[test]
    fn test_session_serialization() {
        let now = OffsetDateTime::now_utc();
        let session = test_session(now + Duration::minutes(10), None, None, None);

        let json = serde_json::to_string(&session).unwrap();
        let deserialized: AuthorizationSession = serde_json::from_str(&json).unwrap();

        assert_eq!(session.id, deserialized.id);
        assert_eq!(session.state, deserialized.state);
        assert_eq!(session.client_id, deserialized.client_id);
        assert_eq!(session.scope, deserialized.scope);
    }
}

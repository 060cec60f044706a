//! Refresh token domain type.
//!
//! Refresh tokens let clients obtain new access tokens without user
//! re-authentication. The plaintext is shown to the caller exactly once at
//! issuance; what persists is a fast lookup digest (the unique storage key)
//! plus a slow bcrypt hash verified on every use. See
//! [`crate::token_hash`] for the two-lane scheme and the legacy-hash
//! migration story.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::oauth::session::Principal;

/// Refresh token record stored in the database, keyed by `lookup`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshTokenRecord {
    /// Unique identifier for this record.
    pub id: Uuid,

    /// Fast digest (SHA-256 hex) of the token value, the lookup key.
    pub lookup: String,

    /// Slow hash (bcrypt) of the token value, verified after lookup.
    pub token_hash: String,

    /// Client the token was issued to.
    pub client_id: String,

    /// Principal that authorized this token.
    pub principal: Principal,

    /// Granted scopes (space-separated).
    pub scope: String,

    /// When this token was created.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,

    /// When this token expires (None = no expiration).
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "time::serde::rfc3339::option"
    )]
    pub expires_at: Option<OffsetDateTime>,

    /// When this token was revoked (None = not revoked).
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "time::serde::rfc3339::option"
    )]
    pub revoked_at: Option<OffsetDateTime>,
}

impl RefreshTokenRecord {
    /// Returns `true` if this token has expired.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.expires_at
            .map(|exp| OffsetDateTime::now_utc() > exp)
            .unwrap_or(false)
    }

    /// Returns `true` if this token has been revoked.
    #[must_use]
    pub fn is_revoked(&self) -> bool {
        self.revoked_at.is_some()
    }

    /// Returns `true` if this token is valid (not expired and not revoked).
    #[must_use]
    pub fn is_valid(&self) -> bool {
        !self.is_expired() && !self.is_revoked()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oauth::session::Subject;
    use time::Duration;

    fn test_record(
        expires_at: Option<OffsetDateTime>,
        revoked_at: Option<OffsetDateTime>,
    ) -> RefreshTokenRecord {
        RefreshTokenRecord {
            id: Uuid::new_v4(),
            lookup: crate::token_hash::TokenHasher::hash_fast("test-token"),
            token_hash: "$2b$04$abcdefghijklmnopqrstuv".to_string(),
            client_id: "corvid-cli".to_string(),
            principal: Principal {
                subject: Subject::User {
                    user_id: "user-1".to_string(),
                },
                organization_id: "org-1".to_string(),
                scopes: vec!["memories:read".to_string()],
            },
            scope: "memories:read".to_string(),
            created_at: OffsetDateTime::now_utc(),
            expires_at,
            revoked_at,
        }
    }

    #[test]
    fn test_is_expired() {
        let now = OffsetDateTime::now_utc();

        assert!(!test_record(None, None).is_expired());
        assert!(!test_record(Some(now + Duration::hours(1)), None).is_expired());
        assert!(test_record(Some(now - Duration::minutes(1)), None).is_expired());
    }

    #[test]
    fn test_is_valid() {
        let now = OffsetDateTime::now_utc();

        assert!(test_record(Some(now + Duration::hours(1)), None).is_valid());
        assert!(!test_record(Some(now - Duration::minutes(1)), None).is_valid());
        assert!(!test_record(Some(now + Duration::hours(1)), Some(now)).is_valid());
    }

    #[test]
    fn test_serialization() {
        let record = test_record(Some(OffsetDateTime::now_utc() + Duration::hours(1)), None);

        let json = serde_json::to_string(&record).unwrap();
        let deserialized: RefreshTokenRecord = serde_json::from_str(&json).unwrap();

        assert_eq!(record.id, deserialized.id);
        assert_eq!(record.lookup, deserialized.lookup);
        assert_eq!(record.principal, deserialized.principal);
    }
}

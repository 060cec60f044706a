//! Token issuance and verification.
//!
//! Access tokens are stateless HS256 JWTs signed with the server-held
//! secret; resource servers verify signature + expiry and need no storage.
//! Refresh tokens are opaque random values persisted only as hashes (see
//! [`crate::token_hash`]); the plaintext is returned to the caller exactly
//! once.
//!
//! Access tokens cannot be revoked before `exp`; that is the stateless-JWT
//! trade-off. Deployments needing fast revocation keep access-token
//! lifetimes short and rely on refresh-token revocation.

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use crate::AuthResult;
use crate::error::AuthError;
use crate::oauth::pkce::{self, OPAQUE_TOKEN_BYTES};
use crate::oauth::session::Principal;
use crate::token_hash::TokenHasher;
use crate::types::refresh_token::RefreshTokenRecord;

/// Claims carried by Corvid access tokens.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AccessTokenClaims {
    /// Issuer (authorization server URL).
    pub iss: String,

    /// Subject: user id or vendor code.
    pub sub: String,

    /// Organization the subject belongs to.
    pub org: String,

    /// Space-separated scopes.
    pub scope: String,

    /// Issued at (Unix timestamp).
    pub iat: i64,

    /// Expiration time (Unix timestamp).
    pub exp: i64,

    /// JWT ID, unique per token.
    pub jti: String,

    /// OAuth client the token was issued to.
    pub client_id: String,
}

/// Issues and verifies access tokens, and mints refresh tokens.
///
/// Thread-safe (`Send + Sync`); shared across handlers behind an `Arc`.
pub struct TokenIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    issuer: String,
}

impl TokenIssuer {
    /// Creates a new issuer from the server signing secret.
    #[must_use]
    pub fn new(secret: &[u8], issuer: impl Into<String>) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            issuer: issuer.into(),
        }
    }

    /// Returns the issuer URL.
    #[must_use]
    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    /// Signs an access token for a principal.
    ///
    /// Returns the JWT and its lifetime in seconds (`expires_in`).
    ///
    /// # Errors
    ///
    /// Returns an internal error if encoding fails.
    pub fn issue_access_token(
        &self,
        principal: &Principal,
        client_id: &str,
        scope: &str,
        lifetime: Duration,
    ) -> AuthResult<(String, u64)> {
        let now = OffsetDateTime::now_utc();
        let claims = AccessTokenClaims {
            iss: self.issuer.clone(),
            sub: principal.subject_id().to_string(),
            org: principal.organization_id.clone(),
            scope: scope.to_string(),
            iat: now.unix_timestamp(),
            exp: (now + lifetime).unix_timestamp(),
            jti: Uuid::new_v4().to_string(),
            client_id: client_id.to_string(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AuthError::internal(format!("Failed to encode access token: {e}")))?;

        Ok((token, lifetime.whole_seconds().max(0) as u64))
    }

    /// Verifies an access token's signature and expiry and returns its claims.
    ///
    /// Expired tokens and malformed/bad-signature tokens are distinguished in
    /// logs only; the caller sees a uniform `invalid_token`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidToken` on any validation failure.
    pub fn verify(&self, token: &str) -> AuthResult<AccessTokenClaims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&self.issuer]);
        validation.validate_exp = true;
        validation.validate_aud = false;

        match decode::<AccessTokenClaims>(token, &self.decoding_key, &validation) {
            Ok(data) => Ok(data.claims),
            Err(err) => {
                use jsonwebtoken::errors::ErrorKind;
                match err.kind() {
                    ErrorKind::ExpiredSignature => {
                        tracing::debug!(reason = "expired", "Access token rejected");
                    }
                    ErrorKind::InvalidSignature => {
                        tracing::debug!(reason = "invalid_signature", "Access token rejected");
                    }
                    _ => {
                        tracing::debug!(reason = "malformed", "Access token rejected");
                    }
                }
                Err(AuthError::invalid_token("token is invalid"))
            }
        }
    }

    /// Mints a refresh token for a principal.
    ///
    /// Returns the plaintext (shown to the caller once, never persisted) and
    /// the record to store.
    ///
    /// # Errors
    ///
    /// Returns an internal error if the slow hash cannot be computed.
    pub fn mint_refresh_token(
        &self,
        hasher: &TokenHasher,
        principal: &Principal,
        client_id: &str,
        scope: &str,
        lifetime: Duration,
    ) -> AuthResult<(String, RefreshTokenRecord)> {
        let now = OffsetDateTime::now_utc();
        let plaintext = pkce::generate_opaque_token(OPAQUE_TOKEN_BYTES);

        let record = RefreshTokenRecord {
            id: Uuid::new_v4(),
            lookup: TokenHasher::hash_fast(&plaintext),
            token_hash: hasher
                .hash_sensitive(&plaintext)
                .map_err(|e| AuthError::internal(format!("Failed to hash refresh token: {e}")))?,
            client_id: client_id.to_string(),
            principal: principal.clone(),
            scope: scope.to_string(),
            created_at: now,
            expires_at: Some(now + lifetime),
            revoked_at: None,
        };

        Ok((plaintext, record))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oauth::session::Subject;

    fn test_issuer() -> TokenIssuer {
        TokenIssuer::new(b"0123456789abcdef0123456789abcdef", "https://auth.test")
    }

    fn test_principal() -> Principal {
        Principal {
            subject: Subject::User {
                user_id: "user-42".to_string(),
            },
            organization_id: "org-7".to_string(),
            scopes: vec!["memories:read".to_string()],
        }
    }

    #[test]
    fn test_issue_and_verify_round_trip() {
        let issuer = test_issuer();
        let (token, expires_in) = issuer
            .issue_access_token(
                &test_principal(),
                "corvid-web",
                "memories:read",
                Duration::hours(1),
            )
            .unwrap();

        assert_eq!(expires_in, 3600);

        let claims = issuer.verify(&token).unwrap();
        assert_eq!(claims.iss, "https://auth.test");
        assert_eq!(claims.sub, "user-42");
        assert_eq!(claims.org, "org-7");
        assert_eq!(claims.scope, "memories:read");
        assert_eq!(claims.client_id, "corvid-web");

        let now = OffsetDateTime::now_utc().unix_timestamp();
        assert!((claims.exp - now - 3600).abs() <= 5);
    }

    #[test]
    fn test_verify_rejects_wrong_secret() {
        let issuer = test_issuer();
        let (token, _) = issuer
            .issue_access_token(&test_principal(), "corvid-web", "s", Duration::hours(1))
            .unwrap();

        let other = TokenIssuer::new(b"another-secret-another-secret-32", "https://auth.test");
        assert!(matches!(
            other.verify(&token),
            Err(AuthError::InvalidToken { .. })
        ));
    }

    #[test]
    fn test_verify_rejects_wrong_issuer() {
        let issuer = test_issuer();
        let (token, _) = issuer
            .issue_access_token(&test_principal(), "corvid-web", "s", Duration::hours(1))
            .unwrap();

        let other = TokenIssuer::new(b"0123456789abcdef0123456789abcdef", "https://other.test");
        assert!(other.verify(&token).is_err());
    }

    #[test]
    fn test_verify_rejects_garbage() {
        let issuer = test_issuer();
        assert!(matches!(
            issuer.verify("not-a-jwt"),
            Err(AuthError::InvalidToken { .. })
        ));
    }

    #[test]
    fn test_vendor_subject_claim() {
        let issuer = test_issuer();
        let principal = Principal {
            subject: Subject::Vendor {
                vendor_code: "acme".to_string(),
            },
            organization_id: "org-7".to_string(),
            scopes: vec![],
        };
        let (token, _) = issuer
            .issue_access_token(&principal, "corvid-cli", "s", Duration::minutes(5))
            .unwrap();
        let claims = issuer.verify(&token).unwrap();
        assert_eq!(claims.sub, "acme");
    }

    #[test]
    fn test_mint_refresh_token() {
        let issuer = test_issuer();
        let hasher = TokenHasher::with_cost(4);
        let (plaintext, record) = issuer
            .mint_refresh_token(
                &hasher,
                &test_principal(),
                "corvid-cli",
                "memories:read",
                Duration::days(30),
            )
            .unwrap();

        // Plaintext is URL-safe and never equals either stored hash
        assert_eq!(plaintext.len(), 64);
        assert_ne!(plaintext, record.lookup);
        assert_ne!(plaintext, record.token_hash);

        assert_eq!(record.lookup, TokenHasher::hash_fast(&plaintext));
        assert!(hasher
            .verify_sensitive(&plaintext, &record.token_hash)
            .unwrap());
        assert!(record.is_valid());
    }
}

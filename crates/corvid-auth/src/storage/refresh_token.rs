//! Refresh token storage trait.
//!
//! # Security Considerations
//!
//! - Tokens are stored as hashes only (fast lookup digest + slow bcrypt
//!   hash); the plaintext never reaches the store
//! - Revocation must be atomic and immediate
//! - Expired and revoked tokens should be cleaned up periodically

use async_trait::async_trait;

use crate::AuthResult;
use crate::types::refresh_token::RefreshTokenRecord;

/// Storage trait for refresh tokens.
///
/// Implementations are provided for PostgreSQL (in `corvid-auth-postgres`).
#[async_trait]
pub trait RefreshTokenStore: Send + Sync {
    /// Stores a new refresh token record.
    ///
    /// # Errors
    ///
    /// Returns an error if the record cannot be stored (duplicate lookup
    /// digest, storage unavailable).
    async fn create(&self, token: &RefreshTokenRecord) -> AuthResult<()>;

    /// Finds a refresh token by its fast lookup digest.
    ///
    /// Returns records regardless of expiration/revocation status; callers
    /// check `is_valid()` (and verify the slow hash) before use.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn find_by_lookup(&self, lookup: &str) -> AuthResult<Option<RefreshTokenRecord>>;

    /// Revokes a refresh token.
    ///
    /// Sets `revoked_at` atomically; once revoked, the token can never be
    /// used again. Revoking an already-revoked token is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn revoke(&self, lookup: &str) -> AuthResult<()>;

    /// Flags legacy fast-hashed records as revoked.
    ///
    /// Rows whose `token_hash` lacks the bcrypt `$2` prefix were written
    /// before the slow lane existed. The plaintext needed to re-hash them is
    /// gone, so they are revoked and their owners re-authenticate.
    ///
    /// Returns the number of records flagged.
    ///
    /// # Errors
    ///
    /// Returns an error if the migration sweep fails.
    async fn invalidate_legacy_hashes(&self) -> AuthResult<u64>;

    /// Deletes expired and revoked tokens.
    ///
    /// Returns the number of records deleted.
    ///
    /// # Errors
    ///
    /// Returns an error if the cleanup operation fails.
    async fn cleanup_expired(&self) -> AuthResult<u64>;
}

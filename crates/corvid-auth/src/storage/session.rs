//! Authorization session storage trait.
//!
//! # Implementation Notes
//!
//! Implementations must:
//!
//! - Enforce uniqueness on `state` (and on `code_lookup` when present)
//! - Make every mutation a single atomic conditional write, so that two
//!   concurrent callers racing on the same state or code see exactly one
//!   success
//! - Filter expired rows on read (garbage collection bounds storage but is
//!   not a correctness requirement)
//!
//! # Security Considerations
//!
//! - Never log state values or code digests
//! - No process-local caching of consumption flags: the store is the single
//!   source of truth, anything else reintroduces the replay race

use async_trait::async_trait;
use time::OffsetDateTime;

use crate::AuthResult;
use crate::oauth::session::{AuthorizationSession, Principal, StoredCode};

/// Storage trait for authorization sessions.
///
/// Sessions are created by the authorization endpoint, advanced by the code
/// issuance step, and consumed by the token endpoint. Implementations are
/// provided for PostgreSQL (in `corvid-auth-postgres`).
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Creates a new pending session.
    ///
    /// # Errors
    ///
    /// Returns an error if the session cannot be stored (duplicate state,
    /// storage unavailable).
    async fn create(&self, session: &AuthorizationSession) -> AuthResult<()>;

    /// Finds a pending session by its state value.
    ///
    /// Returns `Some` only if the state has not been consumed and the
    /// session has not expired; a session that progressed to a code is
    /// invisible here.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn find_by_state(&self, state: &str) -> AuthResult<Option<AuthorizationSession>>;

    /// Finds a code-bearing session by the code's fast lookup digest.
    ///
    /// Returns `Some` only if a code is attached, the code has not been
    /// consumed, and the session has not expired.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn find_by_code(&self, code_lookup: &str) -> AuthResult<Option<AuthorizationSession>>;

    /// Attaches an authorization code to a pending session.
    ///
    /// Transitions the session from pending to code-issued: stores the code
    /// digests and the authenticated principal and shortens the expiry.
    /// Must be conditional on the session having no code attached, the
    /// state being unconsumed, and the session being unexpired.
    ///
    /// # Errors
    ///
    /// Returns `InvalidGrant` if the condition fails (already used or
    /// expired), or a storage error.
    async fn attach_code(
        &self,
        state: &str,
        code: &StoredCode,
        principal: &Principal,
        expires_at: OffsetDateTime,
    ) -> AuthResult<()>;

    /// Marks the state as consumed.
    ///
    /// Must be implemented as a single atomic conditional write:
    ///
    /// ```sql
    /// UPDATE oauth_session
    /// SET state_consumed_at = NOW()
    /// WHERE state = $1 AND state_consumed_at IS NULL AND expires_at > NOW()
    /// ```
    ///
    /// Zero rows affected means "already used" and must surface as
    /// `InvalidGrant`, never as success.
    ///
    /// # Errors
    ///
    /// Returns `InvalidGrant` if the state is unknown, expired, or already
    /// consumed, or a storage error.
    async fn consume_state(&self, state: &str) -> AuthResult<()>;

    /// Marks the authorization code as consumed.
    ///
    /// Same atomicity contract as [`SessionStore::consume_state`], keyed on
    /// the code's lookup digest. Two concurrent token exchanges racing on
    /// one code must see exactly one success.
    ///
    /// # Errors
    ///
    /// Returns `InvalidGrant` if the code is unknown, expired, or already
    /// consumed, or a storage error.
    async fn consume_code(&self, code_lookup: &str) -> AuthResult<()>;

    /// Deletes sessions past expiry.
    ///
    /// Called periodically by the GC sweep; expired rows are already
    /// filtered on read, so this only bounds storage growth.
    ///
    /// # Errors
    ///
    /// Returns an error if the cleanup operation fails.
    async fn cleanup_expired(&self) -> AuthResult<u64>;
}

//! PostgreSQL storage backend for Corvid Auth.
//!
//! Provides persistent storage for:
//!
//! - Authorization sessions (`oauth_session` table)
//! - Refresh tokens (`refresh_token` table)
//!
//! Every mutation is a single conditional UPDATE, so two concurrent callers
//! racing on the same state or code see exactly one success. The database
//! is the only arbiter; there is no process-local caching anywhere.
//!
//! # Example
//!
//! ```ignore
//! use corvid_auth_postgres::PostgresAuthStorage;
//!
//! let storage = PostgresAuthStorage::connect("postgres://localhost/corvid").await?;
//! storage.ensure_schema().await?;
//!
//! let sessions = storage.sessions();
//! let session = sessions.find_by_state("...").await?;
//! ```

pub mod refresh_token;
pub mod session;

use std::sync::Arc;

use sqlx_core::pool::Pool;
use sqlx_postgres::Postgres;

/// PostgreSQL connection pool type alias.
pub type PgPool = Pool<Postgres>;

pub use refresh_token::PostgresRefreshTokenStore;
pub use session::PostgresSessionStore;

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur during auth storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] sqlx_core::Error),

    /// Resource already exists (conflict).
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Serialization/deserialization failed.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StorageError {
    /// Create a `Conflict` error.
    #[must_use]
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }

    /// Returns `true` if this is a `Conflict` error.
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }
}

impl From<StorageError> for corvid_auth::AuthError {
    fn from(err: StorageError) -> Self {
        corvid_auth::AuthError::storage(err.to_string())
    }
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

// =============================================================================
// PostgreSQL Auth Storage
// =============================================================================

/// PostgreSQL storage backend holding the connection pool.
///
/// The pool is created once at startup and dropped at shutdown; the store
/// accessors share it.
#[derive(Debug, Clone)]
pub struct PostgresAuthStorage {
    pool: Arc<PgPool>,
}

impl PostgresAuthStorage {
    /// Create new storage with an existing connection pool.
    #[must_use]
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }

    /// Create new storage by connecting to the database.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection fails.
    pub async fn connect(database_url: &str) -> Result<Self, StorageError> {
        use sqlx_core::pool::PoolOptions;
        let pool = PoolOptions::<Postgres>::new().connect(database_url).await?;
        Ok(Self::new(Arc::new(pool)))
    }

    /// Get a reference to the connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Session store backed by this pool.
    #[must_use]
    pub fn sessions(&self) -> PostgresSessionStore {
        PostgresSessionStore::new(Arc::clone(&self.pool))
    }

    /// Refresh token store backed by this pool.
    #[must_use]
    pub fn refresh_tokens(&self) -> PostgresRefreshTokenStore {
        PostgresRefreshTokenStore::new(Arc::clone(&self.pool))
    }

    /// Creates the auth tables if they do not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the DDL fails.
    pub async fn ensure_schema(&self) -> StorageResult<()> {
        use sqlx_core::query::query;

        query(
            r#"
            CREATE TABLE IF NOT EXISTS oauth_session (
                id UUID PRIMARY KEY,
                state TEXT NOT NULL UNIQUE,
                client_id TEXT NOT NULL,
                redirect_uri TEXT NOT NULL,
                scope TEXT NOT NULL,
                code_challenge TEXT NOT NULL,
                code_challenge_method TEXT NOT NULL,
                code_lookup TEXT UNIQUE,
                code_hash TEXT,
                principal JSONB,
                created_at TIMESTAMPTZ NOT NULL,
                expires_at TIMESTAMPTZ NOT NULL,
                state_consumed_at TIMESTAMPTZ,
                code_consumed_at TIMESTAMPTZ
            )
            "#,
        )
        .execute(self.pool.as_ref())
        .await?;

        query(
            r#"
            CREATE TABLE IF NOT EXISTS refresh_token (
                id UUID PRIMARY KEY,
                lookup TEXT NOT NULL UNIQUE,
                token_hash TEXT NOT NULL,
                client_id TEXT NOT NULL,
                principal JSONB NOT NULL,
                scope TEXT NOT NULL,
                created_at TIMESTAMPTZ NOT NULL,
                expires_at TIMESTAMPTZ,
                revoked_at TIMESTAMPTZ
            )
            "#,
        )
        .execute(self.pool.as_ref())
        .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conflict_classification() {
        let err = StorageError::conflict("session state already exists");
        assert!(err.is_conflict());
        assert_eq!(err.to_string(), "Conflict: session state already exists");
    }

    #[test]
    fn test_storage_error_maps_to_auth_storage() {
        let err = StorageError::conflict("duplicate");
        let auth_err = corvid_auth::AuthError::from(err);
        assert!(matches!(
            auth_err,
            corvid_auth::AuthError::Storage { .. }
        ));
        assert!(auth_err.is_server_error());
    }
}

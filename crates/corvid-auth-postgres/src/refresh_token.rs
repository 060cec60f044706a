//! Refresh token storage.
//!
//! Tokens are stored hashed only: the fast lookup digest is the unique key,
//! the bcrypt hash is verified by the service after lookup. Revocation and
//! the legacy-hash migration sweep are conditional UPDATEs.

use std::sync::Arc;

use async_trait::async_trait;
use sqlx_core::query::query;
use sqlx_core::query_as::query_as;
use time::OffsetDateTime;
use uuid::Uuid;

use corvid_auth::oauth::session::Principal;
use corvid_auth::storage::RefreshTokenStore;
use corvid_auth::types::refresh_token::RefreshTokenRecord;
use corvid_auth::{AuthError, AuthResult};

use crate::{PgPool, StorageError};

/// Raw refresh token row as selected from the database.
type TokenTuple = (
    Uuid,                   // id
    String,                 // lookup
    String,                 // token_hash
    String,                 // client_id
    serde_json::Value,      // principal
    String,                 // scope
    OffsetDateTime,         // created_at
    Option<OffsetDateTime>, // expires_at
    Option<OffsetDateTime>, // revoked_at
);

fn record_from_tuple(row: TokenTuple) -> Result<RefreshTokenRecord, StorageError> {
    let principal: Principal = serde_json::from_value(row.4)?;
    Ok(RefreshTokenRecord {
        id: row.0,
        lookup: row.1,
        token_hash: row.2,
        client_id: row.3,
        principal,
        scope: row.5,
        created_at: row.6,
        expires_at: row.7,
        revoked_at: row.8,
    })
}

/// PostgreSQL-backed refresh token store.
#[derive(Debug, Clone)]
pub struct PostgresRefreshTokenStore {
    pool: Arc<PgPool>,
}

impl PostgresRefreshTokenStore {
    /// Create a new refresh token store sharing a connection pool.
    #[must_use]
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RefreshTokenStore for PostgresRefreshTokenStore {
    async fn create(&self, token: &RefreshTokenRecord) -> AuthResult<()> {
        let principal = serde_json::to_value(&token.principal).map_err(StorageError::from)?;

        query(
            r#"
            INSERT INTO refresh_token (
                id, lookup, token_hash, client_id, principal, scope,
                created_at, expires_at, revoked_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(token.id)
        .bind(&token.lookup)
        .bind(&token.token_hash)
        .bind(&token.client_id)
        .bind(principal)
        .bind(&token.scope)
        .bind(token.created_at)
        .bind(token.expires_at)
        .bind(token.revoked_at)
        .execute(self.pool.as_ref())
        .await
        .map_err(|e| {
            if let sqlx_core::Error::Database(ref db_err) = e
                && db_err.is_unique_violation()
            {
                return AuthError::from(StorageError::conflict("refresh token already exists"));
            }
            AuthError::from(StorageError::from(e))
        })?;

        Ok(())
    }

    async fn find_by_lookup(&self, lookup: &str) -> AuthResult<Option<RefreshTokenRecord>> {
        let row: Option<TokenTuple> = query_as(
            r#"
            SELECT id, lookup, token_hash, client_id, principal, scope,
                   created_at, expires_at, revoked_at
            FROM refresh_token
            WHERE lookup = $1
            "#,
        )
        .bind(lookup)
        .fetch_optional(self.pool.as_ref())
        .await
        .map_err(StorageError::from)?;

        row.map(record_from_tuple)
            .transpose()
            .map_err(AuthError::from)
    }

    async fn revoke(&self, lookup: &str) -> AuthResult<()> {
        // Revoking an unknown or already-revoked token is not an error
        // (RFC 7009); zero rows affected is fine here.
        query(
            r#"
            UPDATE refresh_token
            SET revoked_at = NOW()
            WHERE lookup = $1
              AND revoked_at IS NULL
            "#,
        )
        .bind(lookup)
        .execute(self.pool.as_ref())
        .await
        .map_err(StorageError::from)?;

        Ok(())
    }

    async fn invalidate_legacy_hashes(&self) -> AuthResult<u64> {
        // Rows written before the slow lane hold a bare SHA-256 digest in
        // token_hash. The plaintext is gone, so they cannot be re-hashed;
        // revoke them and let their owners re-authenticate.
        let result = query(
            r#"
            UPDATE refresh_token
            SET revoked_at = NOW()
            WHERE token_hash NOT LIKE '$2%'
              AND revoked_at IS NULL
            "#,
        )
        .execute(self.pool.as_ref())
        .await
        .map_err(StorageError::from)?;

        Ok(result.rows_affected())
    }

    async fn cleanup_expired(&self) -> AuthResult<u64> {
        let result = query(
            r#"
            DELETE FROM refresh_token
            WHERE (expires_at IS NOT NULL AND expires_at < NOW())
               OR revoked_at < NOW() - INTERVAL '30 days'
            "#,
        )
        .execute(self.pool.as_ref())
        .await
        .map_err(StorageError::from)?;

        Ok(result.rows_affected())
    }
}

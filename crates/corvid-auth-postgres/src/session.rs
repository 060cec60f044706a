//! Authorization session storage.
//!
//! One row per session, keyed by `state`, with a unique secondary key on
//! `code_lookup` once a code is attached. Consumption is tracked per key
//! (`state_consumed_at` / `code_consumed_at`); every consume is a single
//! conditional UPDATE and zero rows affected means "already used".

use std::sync::Arc;

use async_trait::async_trait;
use sqlx_core::query::query;
use sqlx_core::query_as::query_as;
use time::OffsetDateTime;
use uuid::Uuid;

use corvid_auth::oauth::session::{AuthorizationSession, Principal, StoredCode};
use corvid_auth::storage::SessionStore;
use corvid_auth::{AuthError, AuthResult};

use crate::{PgPool, StorageError};

/// Raw session row as selected from the database.
type SessionTuple = (
    Uuid,                     // id
    String,                   // state
    String,                   // client_id
    String,                   // redirect_uri
    String,                   // scope
    String,                   // code_challenge
    String,                   // code_challenge_method
    Option<String>,           // code_lookup
    Option<String>,           // code_hash
    Option<serde_json::Value>, // principal
    OffsetDateTime,           // created_at
    OffsetDateTime,           // expires_at
    Option<OffsetDateTime>,   // state_consumed_at
    Option<OffsetDateTime>,   // code_consumed_at
);

fn session_from_tuple(row: SessionTuple) -> Result<AuthorizationSession, StorageError> {
    let principal: Option<Principal> = row.9.map(serde_json::from_value).transpose()?;
    Ok(AuthorizationSession {
        id: row.0,
        state: row.1,
        client_id: row.2,
        redirect_uri: row.3,
        scope: row.4,
        code_challenge: row.5,
        code_challenge_method: row.6,
        code_lookup: row.7,
        code_hash: row.8,
        principal,
        created_at: row.10,
        expires_at: row.11,
        state_consumed_at: row.12,
        code_consumed_at: row.13,
    })
}

/// PostgreSQL-backed session store.
#[derive(Debug, Clone)]
pub struct PostgresSessionStore {
    pool: Arc<PgPool>,
}

impl PostgresSessionStore {
    /// Create a new session store sharing a connection pool.
    #[must_use]
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SessionStore for PostgresSessionStore {
    async fn create(&self, session: &AuthorizationSession) -> AuthResult<()> {
        let principal = session
            .principal
            .as_ref()
            .map(serde_json::to_value)
            .transpose()
            .map_err(StorageError::from)?;

        query(
            r#"
            INSERT INTO oauth_session (
                id, state, client_id, redirect_uri, scope, code_challenge,
                code_challenge_method, code_lookup, code_hash, principal,
                created_at, expires_at, state_consumed_at, code_consumed_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            "#,
        )
        .bind(session.id)
        .bind(&session.state)
        .bind(&session.client_id)
        .bind(&session.redirect_uri)
        .bind(&session.scope)
        .bind(&session.code_challenge)
        .bind(&session.code_challenge_method)
        .bind(&session.code_lookup)
        .bind(&session.code_hash)
        .bind(principal)
        .bind(session.created_at)
        .bind(session.expires_at)
        .bind(session.state_consumed_at)
        .bind(session.code_consumed_at)
        .execute(self.pool.as_ref())
        .await
        .map_err(|e| {
            if let sqlx_core::Error::Database(ref db_err) = e
                && db_err.is_unique_violation()
            {
                return AuthError::from(StorageError::conflict("session state already exists"));
            }
            AuthError::from(StorageError::from(e))
        })?;

        Ok(())
    }

    async fn find_by_state(&self, state: &str) -> AuthResult<Option<AuthorizationSession>> {
        let row: Option<SessionTuple> = query_as(
            r#"
            SELECT id, state, client_id, redirect_uri, scope, code_challenge,
                   code_challenge_method, code_lookup, code_hash, principal,
                   created_at, expires_at, state_consumed_at, code_consumed_at
            FROM oauth_session
            WHERE state = $1
              AND state_consumed_at IS NULL
              AND expires_at > NOW()
            "#,
        )
        .bind(state)
        .fetch_optional(self.pool.as_ref())
        .await
        .map_err(StorageError::from)?;

        row.map(session_from_tuple)
            .transpose()
            .map_err(AuthError::from)
    }

    async fn find_by_code(&self, code_lookup: &str) -> AuthResult<Option<AuthorizationSession>> {
        let row: Option<SessionTuple> = query_as(
            r#"
            SELECT id, state, client_id, redirect_uri, scope, code_challenge,
                   code_challenge_method, code_lookup, code_hash, principal,
                   created_at, expires_at, state_consumed_at, code_consumed_at
            FROM oauth_session
            WHERE code_lookup = $1
              AND code_consumed_at IS NULL
              AND expires_at > NOW()
            "#,
        )
        .bind(code_lookup)
        .fetch_optional(self.pool.as_ref())
        .await
        .map_err(StorageError::from)?;

        row.map(session_from_tuple)
            .transpose()
            .map_err(AuthError::from)
    }

    async fn attach_code(
        &self,
        state: &str,
        code: &StoredCode,
        principal: &Principal,
        expires_at: OffsetDateTime,
    ) -> AuthResult<()> {
        let principal = serde_json::to_value(principal).map_err(StorageError::from)?;

        let result = query(
            r#"
            UPDATE oauth_session
            SET code_lookup = $2,
                code_hash = $3,
                principal = $4,
                expires_at = $5
            WHERE state = $1
              AND code_lookup IS NULL
              AND state_consumed_at IS NULL
              AND expires_at > NOW()
            "#,
        )
        .bind(state)
        .bind(&code.lookup)
        .bind(&code.hash)
        .bind(principal)
        .bind(expires_at)
        .execute(self.pool.as_ref())
        .await
        .map_err(StorageError::from)?;

        if result.rows_affected() == 0 {
            return Err(AuthError::invalid_grant("state already used or expired"));
        }
        Ok(())
    }

    async fn consume_state(&self, state: &str) -> AuthResult<()> {
        let result = query(
            r#"
            UPDATE oauth_session
            SET state_consumed_at = NOW()
            WHERE state = $1
              AND state_consumed_at IS NULL
              AND expires_at > NOW()
            "#,
        )
        .bind(state)
        .execute(self.pool.as_ref())
        .await
        .map_err(StorageError::from)?;

        if result.rows_affected() == 0 {
            return Err(AuthError::invalid_grant("state already consumed"));
        }
        Ok(())
    }

    async fn consume_code(&self, code_lookup: &str) -> AuthResult<()> {
        let result = query(
            r#"
            UPDATE oauth_session
            SET code_consumed_at = NOW()
            WHERE code_lookup = $1
              AND code_consumed_at IS NULL
              AND expires_at > NOW()
            "#,
        )
        .bind(code_lookup)
        .execute(self.pool.as_ref())
        .await
        .map_err(StorageError::from)?;

        if result.rows_affected() == 0 {
            return Err(AuthError::invalid_grant("code already consumed"));
        }
        Ok(())
    }

    async fn cleanup_expired(&self) -> AuthResult<u64> {
        let result = query(
            r#"
            DELETE FROM oauth_session
            WHERE expires_at < NOW()
            "#,
        )
        .execute(self.pool.as_ref())
        .await
        .map_err(StorageError::from)?;

        Ok(result.rows_affected())
    }
}

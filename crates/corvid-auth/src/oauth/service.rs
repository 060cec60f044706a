//! Authorization service.
//!
//! Orchestrates the whole flow: validates authorize requests and creates
//! pending sessions, mints single-use authorization codes after the
//! resource-owner adapter authenticates, exchanges codes + PKCE verifiers
//! for tokens, and handles refresh and revocation.
//!
//! # Ordering invariants
//!
//! - Code issuance consumes the `state` immediately after attaching the
//!   code, so an observer of the browser history cannot replay the
//!   authorize step.
//! - Token exchange verifies PKCE **before** atomically consuming the code.
//!   The reverse order would let an attacker burn a victim's valid code with
//!   a wrong verifier as a denial-of-service primitive.
//! - Once the code is consumed, it stays consumed: a caller that aborts
//!   after consumption and retries gets `invalid_grant`, never a second
//!   token.
//!
//! Every store call is wrapped in a short timeout; a slow store surfaces as
//! `service_unavailable` instead of hanging the caller.

use std::future::Future;
use std::sync::Arc;

use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use crate::AuthResult;
use crate::authn::{Credential, ResourceOwnerAuthenticator};
use crate::config::{AuthConfig, ClientKind};
use crate::error::AuthError;
use crate::oauth::authorize::{AuthorizeReply, AuthorizeRequest, CodeGrant};
use crate::oauth::pkce::{PkceChallenge, PkceChallengeMethod, PkceVerifier};
use crate::oauth::session::{AuthorizationSession, StoredCode};
use crate::oauth::token::{TokenReply, TokenRequest};
use crate::storage::refresh_token::RefreshTokenStore;
use crate::storage::session::SessionStore;
use crate::token::issuer::TokenIssuer;
use crate::token_hash::{TokenHasher, needs_regeneration};

/// Authorization service wiring the stores, the authentication adapter, and
/// the token issuer together.
pub struct AuthorizationService {
    sessions: Arc<dyn SessionStore>,
    refresh_tokens: Arc<dyn RefreshTokenStore>,
    authenticator: Arc<dyn ResourceOwnerAuthenticator>,
    issuer: Arc<TokenIssuer>,
    hasher: TokenHasher,
    config: AuthConfig,
}

impl AuthorizationService {
    /// Creates a new authorization service.
    #[must_use]
    pub fn new(
        sessions: Arc<dyn SessionStore>,
        refresh_tokens: Arc<dyn RefreshTokenStore>,
        authenticator: Arc<dyn ResourceOwnerAuthenticator>,
        issuer: Arc<TokenIssuer>,
        config: AuthConfig,
    ) -> Self {
        let hasher = TokenHasher::with_cost(config.hashing.bcrypt_cost);
        Self {
            sessions,
            refresh_tokens,
            authenticator,
            issuer,
            hasher,
            config,
        }
    }

    /// Gets the service configuration.
    #[must_use]
    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    /// Gets the token issuer, for resource servers verifying access tokens.
    #[must_use]
    pub fn issuer(&self) -> &Arc<TokenIssuer> {
        &self.issuer
    }

    // -------------------------------------------------------------------------
    // Authorization endpoint
    // -------------------------------------------------------------------------

    /// Processes an authorize request: validates it, creates a pending
    /// session, and returns the login URL plus the `state` value.
    ///
    /// Clients that do not implement PKCE themselves send neither challenge
    /// parameter; the service generates the pair and returns the verifier
    /// once in the reply.
    ///
    /// # Errors
    ///
    /// Any validation failure returns `InvalidRequest` before any store
    /// write happens.
    pub async fn authorize(&self, request: &AuthorizeRequest) -> AuthResult<AuthorizeReply> {
        let client_id = self
            .config
            .clients
            .resolve(request.client_id.as_deref())
            .to_string();

        let client = self
            .config
            .clients
            .find(&client_id)
            .ok_or_else(|| AuthError::invalid_request("Unknown client"))?;

        if self.config.clients.enforce_redirect_patterns
            && !self.config.dev_mode
            && !client.is_redirect_uri_allowed(&request.redirect_uri)
        {
            return Err(AuthError::invalid_request(
                "redirect_uri is not registered for this client",
            ));
        }

        // PKCE: client-supplied pair, or self-generated for simplified clients.
        let (challenge, method, generated_verifier) = match (
            request.code_challenge.as_ref(),
            request.code_challenge_method.as_deref(),
        ) {
            (Some(challenge), Some(method)) => {
                let method = PkceChallengeMethod::parse(method)
                    .map_err(|e| AuthError::invalid_request(e.to_string()))?;
                (PkceChallenge::from_client(challenge.clone()), method, None)
            }
            (None, None) => {
                let verifier = PkceVerifier::generate();
                let challenge = PkceChallenge::derive(&verifier, PkceChallengeMethod::S256);
                (challenge, PkceChallengeMethod::S256, Some(verifier))
            }
            _ => {
                return Err(AuthError::invalid_request(
                    "code_challenge and code_challenge_method must be provided together",
                ));
            }
        };

        let now = OffsetDateTime::now_utc();
        let expires_in = self.config.oauth.state_lifetime;
        let session = AuthorizationSession {
            id: Uuid::new_v4(),
            state: AuthorizationSession::generate_state(),
            client_id: client_id.clone(),
            redirect_uri: request.redirect_uri.clone(),
            scope: request.scope.clone(),
            code_challenge: challenge.into_inner(),
            code_challenge_method: method.as_str().to_string(),
            code_lookup: None,
            code_hash: None,
            principal: None,
            created_at: now,
            expires_at: now + lifetime(expires_in),
            state_consumed_at: None,
            code_consumed_at: None,
        };

        self.with_timeout(self.sessions.create(&session)).await?;

        tracing::info!(
            client_id = %client_id,
            scope = %request.scope,
            "Authorization session created"
        );

        let auth_url = self.build_auth_url(&session)?;

        Ok(AuthorizeReply {
            auth_url,
            state: session.state,
            expires_in: expires_in.as_secs(),
            code_verifier: generated_verifier.map(PkceVerifier::into_inner),
        })
    }

    /// Builds the login URL the client follows to authenticate.
    fn build_auth_url(&self, session: &AuthorizationSession) -> AuthResult<String> {
        let mut url = url::Url::parse(&self.config.login_url)
            .map_err(|e| AuthError::configuration(format!("Invalid login_url: {e}")))?;
        url.query_pairs_mut()
            .append_pair("state", &session.state)
            .append_pair("client_id", &session.client_id)
            .append_pair("redirect_uri", &session.redirect_uri)
            .append_pair("scope", &session.scope);
        Ok(url.to_string())
    }

    // -------------------------------------------------------------------------
    // Code issuance
    // -------------------------------------------------------------------------

    /// Authenticates the resource owner and mints a single-use authorization
    /// code bound to the pending session.
    ///
    /// The state is consumed the moment the code exists, so the authorize
    /// step can never be replayed for this session.
    ///
    /// # Errors
    ///
    /// - `UpstreamAuthFailed` if the adapter rejects the credentials
    /// - `InvalidState` if the state is unknown, expired, or already used
    ///   (which of the three is only visible in logs)
    pub async fn issue_code(&self, state: &str, credential: &Credential) -> AuthResult<CodeGrant> {
        let principal = self.authenticator.authenticate(credential).await?;

        let session = self
            .with_timeout(self.sessions.find_by_state(state))
            .await?
            .ok_or_else(|| {
                tracing::warn!(
                    credential = credential.kind(),
                    "Code issuance rejected: state not found, expired, or already used"
                );
                AuthError::invalid_state("state is invalid or expired")
            })?;

        let code = AuthorizationSession::generate_code();
        let stored = StoredCode {
            lookup: TokenHasher::hash_fast(&code),
            hash: self
                .hasher
                .hash_sensitive(&code)
                .map_err(|e| AuthError::internal(format!("Failed to hash code: {e}")))?,
        };

        let code_expires_at = OffsetDateTime::now_utc() + lifetime(self.config.oauth.code_lifetime);
        self.with_timeout(
            self.sessions
                .attach_code(&session.state, &stored, &principal, code_expires_at),
        )
        .await
        .map_err(|e| coarse_state_error(e, "attach_code"))?;

        self.with_timeout(self.sessions.consume_state(&session.state))
            .await
            .map_err(|e| coarse_state_error(e, "consume_state"))?;

        tracing::info!(
            client_id = %session.client_id,
            subject = %principal.subject_id(),
            "Authorization code issued"
        );

        Ok(CodeGrant {
            code,
            state: session.state,
        })
    }

    // -------------------------------------------------------------------------
    // Token endpoint
    // -------------------------------------------------------------------------

    /// Handles a token request, dispatching on grant type.
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedGrantType` for anything other than
    /// `authorization_code` and `refresh_token`.
    pub async fn token(&self, request: &TokenRequest) -> AuthResult<TokenReply> {
        match request.grant_type.as_str() {
            "authorization_code" => self.exchange_code(request).await,
            "refresh_token" => self.refresh(request).await,
            other => Err(AuthError::unsupported_grant_type(other)),
        }
    }

    /// Exchanges a valid, unused, unexpired authorization code plus the
    /// original PKCE verifier for a token pair.
    ///
    /// PKCE is verified before the code is consumed; the atomic consume is
    /// the point of no return.
    ///
    /// # Errors
    ///
    /// `InvalidGrant` for every grant-level failure: unknown code, expired,
    /// already used, client or redirect mismatch, PKCE mismatch. The
    /// distinctions exist only in logs.
    pub async fn exchange_code(&self, request: &TokenRequest) -> AuthResult<TokenReply> {
        let code = required(request.code.as_deref(), "code")?;
        let code_verifier = required(request.code_verifier.as_deref(), "code_verifier")?;
        let client_id = required(request.client_id.as_deref(), "client_id")?;
        let redirect_uri = required(request.redirect_uri.as_deref(), "redirect_uri")?;

        let code_lookup = TokenHasher::hash_fast(code);
        let session = self
            .with_timeout(self.sessions.find_by_code(&code_lookup))
            .await?
            .ok_or_else(|| {
                tracing::warn!(client_id, "Token exchange rejected: code not found or expired");
                invalid_code_error()
            })?;

        let code_hash = session
            .code_hash
            .as_deref()
            .ok_or_else(|| AuthError::internal("code-bearing session has no code hash"))?;
        let hash_ok = self
            .hasher
            .verify_sensitive(code, code_hash)
            .map_err(|e| AuthError::internal(format!("Failed to verify code hash: {e}")))?;
        if !hash_ok {
            tracing::warn!(client_id, "Token exchange rejected: code hash mismatch");
            return Err(invalid_code_error());
        }

        if session.client_id != client_id {
            tracing::warn!(
                client_id,
                session_client = %session.client_id,
                "Token exchange rejected: client mismatch"
            );
            return Err(invalid_code_error());
        }

        if session.redirect_uri != redirect_uri {
            tracing::warn!(client_id, "Token exchange rejected: redirect_uri mismatch");
            return Err(invalid_code_error());
        }

        // Verify PKCE, then consume. Never the other way around: consuming
        // first would let a wrong verifier burn a victim's valid code.
        self.verify_pkce(&session, code_verifier)?;

        self.with_timeout(self.sessions.consume_code(&code_lookup))
            .await
            .map_err(|e| match e {
                AuthError::ServiceUnavailable { .. } | AuthError::Storage { .. } => e,
                _ => {
                    tracing::warn!(client_id, "Token exchange lost consume race");
                    invalid_code_error()
                }
            })?;

        let principal = session
            .principal
            .as_ref()
            .ok_or_else(|| AuthError::internal("code-bearing session has no principal"))?;

        let access_lifetime = self.access_token_lifetime(&session.client_id);
        let (access_token, expires_in) = self.issuer.issue_access_token(
            principal,
            &session.client_id,
            &session.scope,
            access_lifetime,
        )?;

        let (refresh_plaintext, refresh_record) = self.issuer.mint_refresh_token(
            &self.hasher,
            principal,
            &session.client_id,
            &session.scope,
            lifetime(self.config.oauth.refresh_token_lifetime),
        )?;
        self.with_timeout(self.refresh_tokens.create(&refresh_record))
            .await?;

        tracing::info!(
            client_id = %session.client_id,
            subject = %principal.subject_id(),
            "Token pair issued"
        );

        Ok(
            TokenReply::new(access_token, expires_in, session.scope.clone())
                .with_refresh_token(refresh_plaintext),
        )
    }

    /// Verifies the PKCE binding of a session in constant time.
    fn verify_pkce(&self, session: &AuthorizationSession, code_verifier: &str) -> AuthResult<()> {
        let method = PkceChallengeMethod::parse(&session.code_challenge_method)
            .map_err(|e| AuthError::internal(format!("Stored challenge method invalid: {e}")))?;

        let verifier = PkceVerifier::new(code_verifier.to_string()).map_err(|e| {
            tracing::warn!(
                client_id = %session.client_id,
                "Token exchange rejected: malformed code_verifier ({e})"
            );
            invalid_code_error()
        })?;

        let challenge = PkceChallenge::from_client(session.code_challenge.clone());
        challenge.verify(&verifier, method).map_err(|_| {
            tracing::warn!(
                client_id = %session.client_id,
                "Token exchange rejected: PKCE verification failed"
            );
            AuthError::PkceVerificationFailed
        })
    }

    /// Exchanges an outstanding refresh token for a new access token,
    /// rotating the refresh token when rotation is enabled.
    ///
    /// # Errors
    ///
    /// `InvalidGrant` for unknown, expired, revoked, legacy-hashed, or
    /// non-matching tokens; `InvalidRequest` for a missing parameter.
    pub async fn refresh(&self, request: &TokenRequest) -> AuthResult<TokenReply> {
        let token = required(request.refresh_token.as_deref(), "refresh_token")?;

        let lookup = TokenHasher::hash_fast(token);
        let record = self
            .with_timeout(self.refresh_tokens.find_by_lookup(&lookup))
            .await?
            .ok_or_else(|| AuthError::invalid_grant("refresh token is invalid"))?;

        if !record.is_valid() {
            tracing::warn!(client_id = %record.client_id, "Refresh rejected: token expired or revoked");
            return Err(AuthError::invalid_grant("refresh token is invalid"));
        }

        if needs_regeneration(&record.token_hash) {
            // Legacy fast-hashed row: cannot be verified against the slow
            // lane, owner must re-authenticate.
            tracing::warn!(
                client_id = %record.client_id,
                "Refresh rejected: legacy token hash, re-authentication required"
            );
            return Err(AuthError::invalid_grant("refresh token is invalid"));
        }

        let hash_ok = self
            .hasher
            .verify_sensitive(token, &record.token_hash)
            .map_err(|e| AuthError::internal(format!("Failed to verify refresh token: {e}")))?;
        if !hash_ok {
            tracing::warn!(client_id = %record.client_id, "Refresh rejected: token hash mismatch");
            return Err(AuthError::invalid_grant("refresh token is invalid"));
        }

        let scope = narrowed_scope(request.scope.as_deref(), &record.scope)?;

        let access_lifetime = self.access_token_lifetime(&record.client_id);
        let (access_token, expires_in) = self.issuer.issue_access_token(
            &record.principal,
            &record.client_id,
            &scope,
            access_lifetime,
        )?;

        let mut reply = TokenReply::new(access_token, expires_in, scope.clone());

        if self.config.oauth.refresh_token_rotation {
            self.with_timeout(self.refresh_tokens.revoke(&lookup))
                .await?;

            let (new_plaintext, new_record) = self.issuer.mint_refresh_token(
                &self.hasher,
                &record.principal,
                &record.client_id,
                &scope,
                lifetime(self.config.oauth.refresh_token_lifetime),
            )?;
            self.with_timeout(self.refresh_tokens.create(&new_record))
                .await?;
            reply = reply.with_refresh_token(new_plaintext);
        }

        tracing::info!(client_id = %record.client_id, "Access token refreshed");
        Ok(reply)
    }

    // -------------------------------------------------------------------------
    // Revocation and maintenance
    // -------------------------------------------------------------------------

    /// Revokes a refresh token. Unknown tokens are not an error (RFC 7009).
    ///
    /// # Errors
    ///
    /// Returns an error only on storage failure.
    pub async fn revoke_refresh_token(&self, token: &str) -> AuthResult<()> {
        let lookup = TokenHasher::hash_fast(token);
        self.with_timeout(self.refresh_tokens.revoke(&lookup)).await
    }

    /// Flags legacy fast-hashed refresh tokens as revoked. Run once at
    /// startup; returns the number of records flagged.
    ///
    /// # Errors
    ///
    /// Returns an error if the sweep fails.
    pub async fn migrate_legacy_token_hashes(&self) -> AuthResult<u64> {
        let flagged = self
            .with_timeout(self.refresh_tokens.invalidate_legacy_hashes())
            .await?;
        if flagged > 0 {
            tracing::warn!(
                count = flagged,
                "Revoked legacy fast-hashed refresh tokens; owners must re-authenticate"
            );
        }
        Ok(flagged)
    }

    /// Deletes expired sessions and refresh tokens. Returns
    /// `(sessions_deleted, tokens_deleted)`.
    ///
    /// # Errors
    ///
    /// Returns an error if either sweep fails.
    pub async fn cleanup_expired(&self) -> AuthResult<(u64, u64)> {
        let sessions = self.with_timeout(self.sessions.cleanup_expired()).await?;
        let tokens = self
            .with_timeout(self.refresh_tokens.cleanup_expired())
            .await?;
        Ok((sessions, tokens))
    }

    // -------------------------------------------------------------------------
    // Helpers
    // -------------------------------------------------------------------------

    /// Access-token lifetime for a client, by its registered kind.
    fn access_token_lifetime(&self, client_id: &str) -> Duration {
        let kind = self
            .config
            .clients
            .find(client_id)
            .map(|c| c.kind)
            .unwrap_or(ClientKind::Browser);
        match kind {
            ClientKind::Browser => lifetime(self.config.oauth.access_token_lifetime),
            ClientKind::Cli => lifetime(self.config.oauth.cli_access_token_lifetime),
        }
    }

    /// Bounds a store operation with the configured timeout.
    async fn with_timeout<T>(
        &self,
        operation: impl Future<Output = AuthResult<T>>,
    ) -> AuthResult<T> {
        match tokio::time::timeout(self.config.oauth.store_timeout, operation).await {
            Ok(result) => result,
            Err(_) => Err(AuthError::service_unavailable("store operation timed out")),
        }
    }
}

/// Converts a std Duration (config) to a time Duration (arithmetic).
fn lifetime(d: std::time::Duration) -> Duration {
    Duration::seconds(d.as_secs() as i64)
}

/// The uniform grant error for the token endpoint. Unknown code, expired
/// code, consumed code, mismatched client/redirect, and PKCE failures all
/// collapse to this on the wire.
fn invalid_code_error() -> AuthError {
    AuthError::invalid_grant("authorization code is invalid or expired")
}

/// Collapses attach/consume failures in the callback flow to the uniform
/// state error, preserving infrastructure errors.
fn coarse_state_error(err: AuthError, operation: &str) -> AuthError {
    match err {
        AuthError::ServiceUnavailable { .. } | AuthError::Storage { .. } => err,
        _ => {
            tracing::warn!(operation, "Code issuance lost session race");
            AuthError::invalid_state("state is invalid or expired")
        }
    }
}

/// Extracts a required token-request field.
fn required<'a>(value: Option<&'a str>, field: &str) -> AuthResult<&'a str> {
    value.ok_or_else(|| AuthError::invalid_request(format!("Missing required field: {field}")))
}

/// Validates that a requested refresh scope does not exceed the original
/// grant; absent means the original scope is kept.
fn narrowed_scope(requested: Option<&str>, granted: &str) -> AuthResult<String> {
    let Some(requested) = requested else {
        return Ok(granted.to_string());
    };
    let granted_set: std::collections::HashSet<&str> = granted.split_whitespace().collect();
    for scope in requested.split_whitespace() {
        if !granted_set.contains(scope) {
            return Err(AuthError::invalid_grant(
                "requested scope exceeds the original grant",
            ));
        }
    }
    Ok(requested.to_string())
}

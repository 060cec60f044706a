//! # corvid-auth
//!
//! OAuth 2.0 Authorization-Code-with-PKCE issuer for the Corvid platform.
//!
//! This crate authenticates CLI and browser clients, issues short-lived
//! single-use authorization codes, exchanges them for signed access tokens
//! and opaque refresh tokens, and defends against state/code replay.
//!
//! ## Modules
//!
//! - [`config`] - Authorization server configuration
//! - [`oauth`] - The authorization-code flow: PKCE, sessions, the service
//! - [`token`] - Access-token issuance and verification
//! - [`token_hash`] - Fast/slow token hashing lanes and legacy migration
//! - [`authn`] - Resource-owner authentication adapter boundary
//! - [`storage`] - Storage traits for sessions and refresh tokens
//! - [`http`] - Axum handlers for the OAuth endpoints
//!
//! ## Flow
//!
//! ```text
//! GET /oauth/authorize    create pending session, return auth_url + state
//! POST /oauth/callback    authenticate, mint single-use code, consume state
//! POST /oauth/token       verify PKCE, consume code atomically, issue tokens
//! POST /oauth/revoke      revoke a refresh token
//! ```

pub mod authn;
pub mod config;
pub mod error;
pub mod http;
pub mod oauth;
pub mod storage;
pub mod token;
pub mod token_hash;
pub mod types;

pub use authn::{Credential, ResourceOwnerAuthenticator};
pub use config::{AuthConfig, ClientKind, ClientRegistry, ConfigError, RegisteredClient};
pub use error::{AuthError, ErrorCategory};
pub use http::{OAuthState, router};
pub use oauth::{
    AuthorizationService, AuthorizationSession, Principal, SessionStatus, StoredCode, Subject,
};
pub use storage::{RefreshTokenStore, SessionStore};
pub use token::{AccessTokenClaims, TokenIssuer};
pub use token_hash::{HashAlgorithm, TokenHasher};
pub use types::RefreshTokenRecord;

/// Type alias for authorization results.
pub type AuthResult<T> = Result<T, AuthError>;

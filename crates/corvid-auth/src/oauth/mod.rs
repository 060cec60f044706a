//! OAuth 2.0 authorization-code flow implementation.
//!
//! The flow is implemented across several submodules:
//!
//! - [`authorize`] - Request/reply types for the authorization endpoint
//! - [`session`] - Authorization session state machine
//! - [`pkce`] - PKCE challenge/verifier implementation and opaque tokens
//! - [`service`] - The orchestrating authorization service
//! - [`token`] - Token endpoint wire types
//!
//! # Example
//!
//! ```ignore
//! use corvid_auth::oauth::{AuthorizationService, PkceChallenge, PkceVerifier};
//!
//! // Client generates PKCE verifier and challenge
//! let verifier = PkceVerifier::generate();
//! let challenge = PkceChallenge::derive(&verifier, PkceChallengeMethod::S256);
//!
//! // Server processes the authorize request, later the callback and the
//! // token exchange
//! let reply = service.authorize(&request).await?;
//! let grant = service.issue_code(&reply.state, &credential).await?;
//! let tokens = service.exchange_code(&token_request).await?;
//! ```

pub mod authorize;
pub mod pkce;
pub mod service;
pub mod session;
pub mod token;

// Authorization endpoint types
pub use authorize::{AuthorizeReply, AuthorizeRequest, CodeGrant};

// PKCE types
pub use pkce::{
    OPAQUE_TOKEN_BYTES, PkceChallenge, PkceChallengeMethod, PkceError, PkceVerifier,
    generate_opaque_token,
};

// Service
pub use service::AuthorizationService;

// Session types
pub use session::{AuthorizationSession, Principal, SessionStatus, StoredCode, Subject};

// Token endpoint types
pub use token::{TokenReply, TokenRequest, WireError};

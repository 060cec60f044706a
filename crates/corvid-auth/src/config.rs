//! Authorization server configuration.
//!
//! All durations accept humantime strings in TOML (`"10m"`, `"1h"`, `"30d"`).
//!
//! # Example (TOML)
//!
//! ```toml
//! [auth]
//! issuer = "https://auth.corvid.dev"
//! login_url = "https://auth.corvid.dev/login"
//!
//! [auth.oauth]
//! state_lifetime = "10m"
//! code_lifetime = "5m"
//! access_token_lifetime = "1h"
//! cli_access_token_lifetime = "30d"
//!
//! [auth.signing]
//! secret = "..."
//!
//! [[auth.clients.clients]]
//! client_id = "corvid-cli"
//! kind = "cli"
//! redirect_uri_patterns = ["http://127.0.0.1:*"]
//! ```

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Root authorization server configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Server issuer URL (used in the token `iss` claim).
    pub issuer: String,

    /// Login page URL the authorize endpoint sends clients to.
    pub login_url: String,

    /// Development mode. Default off. When on, a loud warning is logged at
    /// startup and redirect-URI registry enforcement is relaxed. It never
    /// changes how tokens are issued.
    pub dev_mode: bool,

    /// OAuth flow timing and behavior.
    pub oauth: OAuthConfig,

    /// Token signing configuration.
    pub signing: SigningConfig,

    /// Token hashing configuration.
    pub hashing: HashingConfig,

    /// Registered clients.
    pub clients: ClientRegistry,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            issuer: "http://localhost:8080".to_string(),
            login_url: "http://localhost:8080/login".to_string(),
            dev_mode: false,
            oauth: OAuthConfig::default(),
            signing: SigningConfig::default(),
            hashing: HashingConfig::default(),
            clients: ClientRegistry::default(),
        }
    }
}

impl AuthConfig {
    /// Validates the configuration for production use.
    ///
    /// # Errors
    ///
    /// Returns a message describing the first problem found: a missing or
    /// short signing secret outside dev mode, or a default client that is
    /// not registered.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.dev_mode && self.signing.secret.len() < SigningConfig::MIN_SECRET_BYTES {
            return Err(ConfigError::WeakSigningSecret {
                minimum: SigningConfig::MIN_SECRET_BYTES,
            });
        }

        if !self.clients.clients.is_empty()
            && !self
                .clients
                .clients
                .iter()
                .any(|c| c.client_id == self.clients.default_client_id)
        {
            return Err(ConfigError::UnknownDefaultClient {
                client_id: self.clients.default_client_id.clone(),
            });
        }

        Ok(())
    }
}

/// Configuration validation errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The signing secret is missing or too short for production.
    #[error("signing secret must be at least {minimum} bytes outside dev mode")]
    WeakSigningSecret {
        /// Required minimum length in bytes.
        minimum: usize,
    },

    /// The configured default client is not in the registry.
    #[error("default client '{client_id}' is not registered")]
    UnknownDefaultClient {
        /// The unregistered client id.
        client_id: String,
    },
}

/// OAuth flow timing and behavior.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct OAuthConfig {
    /// Lifetime of a pending session (state only).
    #[serde(with = "humantime_serde")]
    pub state_lifetime: Duration,

    /// Lifetime of an issued authorization code. Shorter than the state
    /// horizon: the clock restarts (shortened) at code issuance.
    #[serde(with = "humantime_serde")]
    pub code_lifetime: Duration,

    /// Access token lifetime for browser clients.
    #[serde(with = "humantime_serde")]
    pub access_token_lifetime: Duration,

    /// Access token lifetime for CLI clients, which are harder to silently
    /// refresh.
    #[serde(with = "humantime_serde")]
    pub cli_access_token_lifetime: Duration,

    /// Refresh token lifetime.
    #[serde(with = "humantime_serde")]
    pub refresh_token_lifetime: Duration,

    /// Rotate refresh tokens on use (revoke old, issue new).
    pub refresh_token_rotation: bool,

    /// Upper bound on any single store operation; a timeout surfaces as
    /// `service_unavailable` instead of hanging the caller.
    #[serde(with = "humantime_serde")]
    pub store_timeout: Duration,
}

impl Default for OAuthConfig {
    fn default() -> Self {
        Self {
            state_lifetime: Duration::from_secs(600),                   // 10 minutes
            code_lifetime: Duration::from_secs(300),                    // 5 minutes
            access_token_lifetime: Duration::from_secs(3600),           // 1 hour
            cli_access_token_lifetime: Duration::from_secs(30 * 24 * 3600), // 30 days
            refresh_token_lifetime: Duration::from_secs(30 * 24 * 3600),
            refresh_token_rotation: true,
            store_timeout: Duration::from_secs(3),
        }
    }
}

/// Token signing configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SigningConfig {
    /// Server-held HMAC secret for HS256 access tokens. Must be set from the
    /// environment or a secret store in production; the empty default fails
    /// validation outside dev mode.
    pub secret: String,
}

impl SigningConfig {
    /// Minimum secret length accepted outside dev mode (HS256 key size).
    pub const MIN_SECRET_BYTES: usize = 32;
}

impl Default for SigningConfig {
    fn default() -> Self {
        Self {
            secret: String::new(),
        }
    }
}

/// Token hashing configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HashingConfig {
    /// bcrypt work factor for the slow hashing lane.
    pub bcrypt_cost: u32,
}

impl Default for HashingConfig {
    fn default() -> Self {
        Self {
            bcrypt_cost: crate::token_hash::DEFAULT_BCRYPT_COST,
        }
    }
}

/// Registered OAuth clients and registry policy.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ClientRegistry {
    /// Client applied when a request carries no `client_id`.
    pub default_client_id: String,

    /// Enforce redirect-URI patterns against the registry. Relaxed only by
    /// `dev_mode`.
    pub enforce_redirect_patterns: bool,

    /// The registered clients.
    pub clients: Vec<RegisteredClient>,
}

impl Default for ClientRegistry {
    fn default() -> Self {
        Self {
            default_client_id: "corvid-cli".to_string(),
            enforce_redirect_patterns: true,
            clients: vec![
                RegisteredClient {
                    client_id: "corvid-cli".to_string(),
                    kind: ClientKind::Cli,
                    redirect_uri_patterns: vec![
                        "http://127.0.0.1:*".to_string(),
                        "http://localhost:*".to_string(),
                    ],
                },
                RegisteredClient {
                    client_id: "corvid-web".to_string(),
                    kind: ClientKind::Browser,
                    redirect_uri_patterns: vec![],
                },
            ],
        }
    }
}

impl ClientRegistry {
    /// Resolves a request's client id, falling back to the default client.
    #[must_use]
    pub fn resolve<'a>(&'a self, client_id: Option<&'a str>) -> &'a str {
        client_id.unwrap_or(&self.default_client_id)
    }

    /// Looks up a registered client by id.
    #[must_use]
    pub fn find(&self, client_id: &str) -> Option<&RegisteredClient> {
        self.clients.iter().find(|c| c.client_id == client_id)
    }
}

/// A registered OAuth client.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RegisteredClient {
    /// Client identifier.
    pub client_id: String,

    /// Client kind; decides the access-token lifetime class.
    pub kind: ClientKind,

    /// Allowed redirect-URI patterns. Exact match, or prefix match when the
    /// pattern ends with `*`. Empty means any URI is allowed for this
    /// client.
    pub redirect_uri_patterns: Vec<String>,
}

impl RegisteredClient {
    /// Returns `true` if the redirect URI matches a registered pattern.
    #[must_use]
    pub fn is_redirect_uri_allowed(&self, redirect_uri: &str) -> bool {
        if self.redirect_uri_patterns.is_empty() {
            return true;
        }
        self.redirect_uri_patterns.iter().any(|pattern| {
            match pattern.strip_suffix('*') {
                Some(prefix) => redirect_uri.starts_with(prefix),
                None => redirect_uri == pattern,
            }
        })
    }
}

/// Client kind, selecting the access-token lifetime class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientKind {
    /// Browser session: short access tokens, silently refreshable.
    Browser,
    /// Long-lived CLI tool: longer access tokens by design.
    Cli,
}

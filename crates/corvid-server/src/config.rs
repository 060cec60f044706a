//! Server configuration loading.
//!
//! Layered: `corvid.toml` in the working directory (optional), overridden by
//! `CORVID__*` environment variables (`CORVID__AUTH__SIGNING__SECRET=...`).

use std::time::Duration;

use serde::{Deserialize, Serialize};

use corvid_auth::AuthConfig;

/// Root server configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Listen address.
    pub listen: String,

    /// PostgreSQL connection URL.
    pub database_url: String,

    /// Base URL of the identity service that verifies resource-owner
    /// credentials.
    pub identity_url: String,

    /// Interval between garbage-collection sweeps of expired sessions and
    /// refresh tokens.
    #[serde(with = "humantime_serde")]
    pub gc_interval: Duration,

    /// Authorization server configuration.
    pub auth: AuthConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: "0.0.0.0:8080".to_string(),
            database_url: "postgres://localhost/corvid".to_string(),
            identity_url: "http://localhost:8081".to_string(),
            gc_interval: Duration::from_secs(300),
            auth: AuthConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Loads configuration from `corvid.toml` and the environment.
    ///
    /// # Errors
    ///
    /// Returns an error if a source is malformed or deserialization fails.
    pub fn load() -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(config::File::with_name("corvid").required(false))
            .add_source(config::Environment::with_prefix("CORVID").separator("__"))
            .build()?
            .try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.listen, "0.0.0.0:8080");
        assert_eq!(config.gc_interval, Duration::from_secs(300));
        assert!(!config.auth.dev_mode);
    }
}

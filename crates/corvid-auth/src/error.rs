//! Authorization error types.
//!
//! Every failure in the authorization flow is a per-request error; nothing in
//! this crate is fatal at the process level. Errors carry an internal message
//! for logging and map to a deliberately coarse wire taxonomy via
//! [`AuthError::oauth_error_code`] so that callers cannot distinguish
//! "unknown code" from "wrong verifier" from "already used".

use std::fmt;

/// Errors that can occur during authorization and token operations.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// The request is malformed: missing field, invalid PKCE verifier
    /// format, unknown challenge method, bad redirect URI.
    #[error("Invalid request: {message}")]
    InvalidRequest {
        /// Description of why the request is invalid.
        message: String,
    },

    /// The state value is unknown, expired, or already consumed.
    ///
    /// On the wire this is indistinguishable from [`AuthError::InvalidGrant`];
    /// the variant exists so logs can tell the two flows apart.
    #[error("Invalid state: {message}")]
    InvalidState {
        /// Description of why the state is invalid.
        message: String,
    },

    /// The authorization code or refresh token is unknown, expired,
    /// already consumed, or bound to a different client.
    #[error("Invalid grant: {message}")]
    InvalidGrant {
        /// Description of why the grant is invalid.
        message: String,
    },

    /// PKCE code verifier does not match the stored code challenge.
    #[error("PKCE verification failed")]
    PkceVerificationFailed,

    /// An access token failed signature or expiry validation.
    #[error("Invalid token: {message}")]
    InvalidToken {
        /// Description of why the token is invalid.
        message: String,
    },

    /// The resource-owner authentication adapter rejected the credentials.
    #[error("Upstream authentication failed: {message}")]
    UpstreamAuthFailed {
        /// Description of the rejection.
        message: String,
    },

    /// The requested grant type is not supported.
    #[error("Unsupported grant type: {grant_type}")]
    UnsupportedGrantType {
        /// The unsupported grant type.
        grant_type: String,
    },

    /// The session or token store failed or did not answer in time.
    #[error("Service unavailable: {message}")]
    ServiceUnavailable {
        /// Description of the outage.
        message: String,
    },

    /// An error occurred while storing or retrieving auth data.
    #[error("Storage error: {message}")]
    Storage {
        /// Description of the storage error.
        message: String,
    },

    /// The auth configuration is invalid.
    #[error("Configuration error: {message}")]
    Configuration {
        /// Description of the configuration error.
        message: String,
    },

    /// An unexpected internal error occurred.
    #[error("Internal error: {message}")]
    Internal {
        /// Description of the internal error.
        message: String,
    },
}

impl AuthError {
    /// Creates a new `InvalidRequest` error.
    #[must_use]
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest {
            message: message.into(),
        }
    }

    /// Creates a new `InvalidState` error.
    #[must_use]
    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidState {
            message: message.into(),
        }
    }

    /// Creates a new `InvalidGrant` error.
    #[must_use]
    pub fn invalid_grant(message: impl Into<String>) -> Self {
        Self::InvalidGrant {
            message: message.into(),
        }
    }

    /// Creates a new `InvalidToken` error.
    #[must_use]
    pub fn invalid_token(message: impl Into<String>) -> Self {
        Self::InvalidToken {
            message: message.into(),
        }
    }

    /// Creates a new `UpstreamAuthFailed` error.
    #[must_use]
    pub fn upstream_auth_failed(message: impl Into<String>) -> Self {
        Self::UpstreamAuthFailed {
            message: message.into(),
        }
    }

    /// Creates a new `UnsupportedGrantType` error.
    #[must_use]
    pub fn unsupported_grant_type(grant_type: impl Into<String>) -> Self {
        Self::UnsupportedGrantType {
            grant_type: grant_type.into(),
        }
    }

    /// Creates a new `ServiceUnavailable` error.
    #[must_use]
    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::ServiceUnavailable {
            message: message.into(),
        }
    }

    /// Creates a new `Storage` error.
    #[must_use]
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    /// Creates a new `Configuration` error.
    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Creates a new `Internal` error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns `true` if this is a client error (4xx category).
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidRequest { .. }
                | Self::InvalidState { .. }
                | Self::InvalidGrant { .. }
                | Self::PkceVerificationFailed
                | Self::InvalidToken { .. }
                | Self::UpstreamAuthFailed { .. }
                | Self::UnsupportedGrantType { .. }
        )
    }

    /// Returns `true` if this is a server error (5xx category).
    #[must_use]
    pub fn is_server_error(&self) -> bool {
        matches!(
            self,
            Self::ServiceUnavailable { .. }
                | Self::Storage { .. }
                | Self::Configuration { .. }
                | Self::Internal { .. }
        )
    }

    /// Returns `true` if this failure consumed no grant and the caller may
    /// retry the same request verbatim.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ServiceUnavailable { .. })
    }

    /// Returns the error code used in wire responses.
    ///
    /// The mapping is deliberately coarse: state and grant failures collapse
    /// to `invalid_grant`-family codes without revealing which check failed.
    #[must_use]
    pub fn oauth_error_code(&self) -> &'static str {
        match self {
            Self::InvalidRequest { .. } => "validation_error",
            Self::InvalidState { .. } => "invalid_state",
            Self::InvalidGrant { .. } | Self::PkceVerificationFailed => "invalid_grant",
            Self::InvalidToken { .. } => "invalid_token",
            Self::UpstreamAuthFailed { .. } => "upstream_auth_failed",
            Self::UnsupportedGrantType { .. } => "unsupported_grant_type",
            Self::ServiceUnavailable { .. } => "service_unavailable",
            Self::Storage { .. } | Self::Configuration { .. } | Self::Internal { .. } => {
                "server_error"
            }
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn http_status(&self) -> u16 {
        match self {
            Self::UpstreamAuthFailed { .. } => 401,
            Self::ServiceUnavailable { .. } => 503,
            Self::Storage { .. } | Self::Configuration { .. } | Self::Internal { .. } => 500,
            _ => 400,
        }
    }

    /// Returns the error category for logging/monitoring purposes.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidRequest { .. } | Self::UnsupportedGrantType { .. } => {
                ErrorCategory::Validation
            }
            Self::InvalidState { .. }
            | Self::InvalidGrant { .. }
            | Self::PkceVerificationFailed
            | Self::UpstreamAuthFailed { .. } => ErrorCategory::Authentication,
            Self::InvalidToken { .. } => ErrorCategory::Token,
            Self::ServiceUnavailable { .. } | Self::Storage { .. } => {
                ErrorCategory::Infrastructure
            }
            Self::Configuration { .. } => ErrorCategory::Configuration,
            Self::Internal { .. } => ErrorCategory::Internal,
        }
    }
}

/// Categories of authorization errors for logging and monitoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Request validation errors.
    Validation,
    /// Authentication/grant errors.
    Authentication,
    /// Token validation errors.
    Token,
    /// Infrastructure/storage errors.
    Infrastructure,
    /// Configuration errors.
    Configuration,
    /// Internal server errors.
    Internal,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Validation => write!(f, "validation"),
            Self::Authentication => write!(f, "authentication"),
            Self::Token => write!(f, "token"),
            Self::Infrastructure => write!(f, "infrastructure"),
            Self::Configuration => write!(f, "configuration"),
            Self::Internal => write!(f, "internal"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = AuthError::invalid_grant("code already consumed");
        assert_eq!(err.to_string(), "Invalid grant: code already consumed");

        let err = AuthError::PkceVerificationFailed;
        assert_eq!(err.to_string(), "PKCE verification failed");

        let err = AuthError::unsupported_grant_type("implicit");
        assert_eq!(err.to_string(), "Unsupported grant type: implicit");
    }

    #[test]
    fn test_error_predicates() {
        let err = AuthError::invalid_request("missing state");
        assert!(err.is_client_error());
        assert!(!err.is_server_error());
        assert!(!err.is_retryable());

        let err = AuthError::service_unavailable("store timeout");
        assert!(!err.is_client_error());
        assert!(err.is_server_error());
        assert!(err.is_retryable());
    }

    #[test]
    fn test_oauth_error_code() {
        assert_eq!(
            AuthError::invalid_request("x").oauth_error_code(),
            "validation_error"
        );
        assert_eq!(
            AuthError::invalid_state("x").oauth_error_code(),
            "invalid_state"
        );
        assert_eq!(
            AuthError::invalid_grant("x").oauth_error_code(),
            "invalid_grant"
        );
        assert_eq!(
            AuthError::PkceVerificationFailed.oauth_error_code(),
            "invalid_grant"
        );
        assert_eq!(
            AuthError::upstream_auth_failed("x").oauth_error_code(),
            "upstream_auth_failed"
        );
        assert_eq!(
            AuthError::service_unavailable("x").oauth_error_code(),
            "service_unavailable"
        );
    }

    #[test]
    fn test_http_status() {
        assert_eq!(AuthError::invalid_grant("x").http_status(), 400);
        assert_eq!(AuthError::upstream_auth_failed("x").http_status(), 401);
        assert_eq!(AuthError::service_unavailable("x").http_status(), 503);
        assert_eq!(AuthError::internal("x").http_status(), 500);
    }

    #[test]
    fn test_error_category() {
        assert_eq!(
            AuthError::invalid_request("x").category(),
            ErrorCategory::Validation
        );
        assert_eq!(
            AuthError::PkceVerificationFailed.category(),
            ErrorCategory::Authentication
        );
        assert_eq!(
            AuthError::storage("x").category(),
            ErrorCategory::Infrastructure
        );
        assert_eq!(ErrorCategory::Authentication.to_string(), "authentication");
    }
}

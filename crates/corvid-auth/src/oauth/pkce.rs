//! PKCE (Proof Key for Code Exchange) implementation.
//!
//! Implements RFC 7636 with the `S256` and `plain` methods. Challenge
//! verification is constant-time: both operands are padded to equal length
//! before comparison and the length check is folded into the same
//! constant-time result, so execution time does not depend on the position
//! of the first mismatched byte.
//!
//! This module is also the source of every opaque credential in the flow:
//! `state` values, authorization codes, and refresh tokens all come from
//! [`generate_opaque_token`].
//!
//! # Example
//!
//! ```
//! use corvid_auth::oauth::{PkceChallenge, PkceChallengeMethod, PkceVerifier};
//!
//! // Client generates a verifier and challenge
//! let verifier = PkceVerifier::generate();
//! let challenge = PkceChallenge::derive(&verifier, PkceChallengeMethod::S256);
//!
//! // Server stores the challenge, later verifies the verifier from the
//! // token request
//! assert!(challenge.verify(&verifier, PkceChallengeMethod::S256).is_ok());
//! ```

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

/// Default byte length for opaque tokens (state values, authorization codes,
/// refresh tokens). 48 bytes = 384 bits of entropy, comfortably above the
/// 256-bit floor required of these credentials.
pub const OPAQUE_TOKEN_BYTES: usize = 48;

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur during PKCE operations.
#[derive(Debug, thiserror::Error)]
pub enum PkceError {
    /// Verifier length is outside the valid range (43-128 characters).
    #[error("Invalid verifier length: must be 43-128 characters, got {0}")]
    InvalidVerifierLength(usize),

    /// Verifier contains invalid characters.
    #[error("Invalid verifier characters: must be unreserved ([A-Za-z0-9-._~])")]
    InvalidVerifierCharacters,

    /// Unsupported challenge method (only S256 and plain are supported).
    #[error("Unsupported challenge method: {0}")]
    UnsupportedMethod(String),

    /// PKCE verification failed (verifier doesn't match challenge).
    #[error("PKCE verification failed: verifier does not match challenge")]
    VerificationFailed,
}

// =============================================================================
// PKCE Challenge Method
// =============================================================================

/// PKCE challenge method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PkceChallengeMethod {
    /// SHA-256 hash of the verifier, base64url-encoded.
    S256,
    /// The verifier itself. Permitted for clients that cannot hash, but
    /// S256 is the default everywhere a pair is self-generated.
    Plain,
}

impl PkceChallengeMethod {
    /// Parse a challenge method from its wire representation.
    ///
    /// # Errors
    ///
    /// Returns `PkceError::UnsupportedMethod` for anything other than
    /// `"S256"` or `"plain"`.
    pub fn parse(method: &str) -> Result<Self, PkceError> {
        match method {
            "S256" => Ok(Self::S256),
            "plain" => Ok(Self::Plain),
            other => Err(PkceError::UnsupportedMethod(other.to_string())),
        }
    }

    /// Get the method as a string.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::S256 => "S256",
            Self::Plain => "plain",
        }
    }
}

impl std::fmt::Display for PkceChallengeMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl Default for PkceChallengeMethod {
    fn default() -> Self {
        Self::S256
    }
}

// =============================================================================
// PKCE Verifier
// =============================================================================

/// PKCE code verifier.
///
/// A high-entropy cryptographic random string using the unreserved characters
/// `[A-Z] / [a-z] / [0-9] / "-" / "." / "_" / "~"` (RFC 7636 Section 4.1),
/// with a minimum length of 43 characters and a maximum length of 128.
#[derive(Debug, Clone)]
pub struct PkceVerifier(String);

impl PkceVerifier {
    /// Create a new verifier from a string.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Length is not between 43 and 128 characters
    /// - Contains characters other than `[A-Za-z0-9-._~]`
    pub fn new(verifier: String) -> Result<Self, PkceError> {
        let len = verifier.len();

        if !(43..=128).contains(&len) {
            return Err(PkceError::InvalidVerifierLength(len));
        }

        if !verifier
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '.' || c == '_' || c == '~')
        {
            return Err(PkceError::InvalidVerifierCharacters);
        }

        Ok(Self(verifier))
    }

    /// Generate a cryptographically random verifier.
    ///
    /// Generates 32 random bytes and encodes them as base64url (43 characters).
    #[must_use]
    pub fn generate() -> Self {
        use rand::Rng;
        let mut rng = rand::thread_rng();
        // `gen` is a reserved keyword in Rust 2024, so we use r#gen
        let bytes: [u8; 32] = rng.r#gen();
        Self(URL_SAFE_NO_PAD.encode(bytes))
    }

    /// Get the verifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume the verifier and return the inner string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl AsRef<str> for PkceVerifier {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// =============================================================================
// PKCE Challenge
// =============================================================================

/// PKCE code challenge.
///
/// For `S256`, `code_challenge = BASE64URL(SHA256(ASCII(code_verifier)))`
/// (RFC 7636 Section 4.2). For `plain`, the challenge is the verifier itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PkceChallenge(String);

impl PkceChallenge {
    /// Derive a challenge from a verifier using the given method.
    #[must_use]
    pub fn derive(verifier: &PkceVerifier, method: PkceChallengeMethod) -> Self {
        match method {
            PkceChallengeMethod::S256 => {
                let mut hasher = Sha256::new();
                hasher.update(verifier.0.as_bytes());
                Self(URL_SAFE_NO_PAD.encode(hasher.finalize()))
            }
            PkceChallengeMethod::Plain => Self(verifier.0.clone()),
        }
    }

    /// Wrap a challenge string received from a client.
    ///
    /// The value is stored opaquely; it is only ever compared against a
    /// freshly derived challenge, so no format validation happens here.
    #[must_use]
    pub fn from_client(challenge: String) -> Self {
        Self(challenge)
    }

    /// Verify that a verifier matches this challenge.
    ///
    /// Recomputes the challenge and compares in constant time. Both operands
    /// are padded to equal length before the byte comparison, and the length
    /// check is folded into the constant-time result, so a mismatch in the
    /// first byte costs the same as a mismatch in the last.
    ///
    /// # Errors
    ///
    /// Returns `PkceError::VerificationFailed` if the verifier doesn't match.
    pub fn verify(
        &self,
        verifier: &PkceVerifier,
        method: PkceChallengeMethod,
    ) -> Result<(), PkceError> {
        let expected = Self::derive(verifier, method);
        if constant_time_eq(expected.0.as_bytes(), self.0.as_bytes()) {
            Ok(())
        } else {
            Err(PkceError::VerificationFailed)
        }
    }

    /// Get the challenge as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume the challenge and return the inner string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl AsRef<str> for PkceChallenge {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// =============================================================================
// Opaque Tokens
// =============================================================================

/// Generate a cryptographically secure opaque token.
///
/// `byte_length` random bytes from the system CSPRNG, base64url-encoded
/// without padding. The output is URL-safe: no `+`, `/`, or `=`.
///
/// Used for `state` values, authorization codes, and refresh tokens; see
/// [`OPAQUE_TOKEN_BYTES`] for the default length.
#[must_use]
pub fn generate_opaque_token(byte_length: usize) -> String {
    let mut bytes = vec![0u8; byte_length];
    rand::Rng::fill(&mut rand::thread_rng(), &mut bytes[..]);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Constant-time byte equality over unequal-length inputs.
///
/// Pads both operands to the longer length, compares the padded buffers with
/// `subtle`, and ANDs in a constant-time length check. Never short-circuits
/// on length.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    let len = a.len().max(b.len());
    let mut padded_a = vec![0u8; len];
    let mut padded_b = vec![0u8; len];
    padded_a[..a.len()].copy_from_slice(a);
    padded_b[..b.len()].copy_from_slice(b);

    let lengths_equal = a.len().ct_eq(&b.len());
    let bytes_equal = padded_a.ct_eq(&padded_b);
    bool::from(lengths_equal & bytes_equal)
}

// =============================================================================
// Tests
// =============================================================================

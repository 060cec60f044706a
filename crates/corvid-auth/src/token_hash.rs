//! Token hashing with two lanes.
//!
//! Tokens are classified by sensitivity and hashed accordingly:
//!
//! - **Fast lane** (SHA-256 hex): values whose compromise window is
//!   seconds-to-minutes and whose hash is checked at high frequency,
//!   i.e. session lookup keys.
//! - **Slow lane** (bcrypt, tunable cost): values with long validity windows
//!   and high compromise impact, i.e. authorization codes and refresh tokens.
//!
//! Because bcrypt output is salted, a slow hash cannot serve as a lookup
//! key. Stored codes and refresh tokens therefore carry both a fast lookup
//! digest and a slow verification hash; the fast digest finds the row, the
//! slow hash proves the presented plaintext.
//!
//! # Legacy hash migration
//!
//! Rows written before the slow lane existed hold a bare fast digest where
//! the slow hash belongs. [`HashAlgorithm::classify`] distinguishes the two
//! by the bcrypt `$2` version prefix. A fast hash cannot be converted into a
//! slow hash after the fact (the plaintext is gone), so migration flags
//! affected records invalid and their owners re-authenticate; see
//! `RefreshTokenStore::invalidate_legacy_hashes`.

use sha2::{Digest, Sha256};

/// Default bcrypt work factor for the slow lane.
pub const DEFAULT_BCRYPT_COST: u32 = bcrypt::DEFAULT_COST;

/// Errors that can occur while hashing or verifying tokens.
#[derive(Debug, thiserror::Error)]
pub enum HashError {
    /// The bcrypt operation failed (bad cost, malformed stored hash).
    #[error("Hashing error: {0}")]
    Bcrypt(#[from] bcrypt::BcryptError),
}

/// Which lane produced a stored hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HashAlgorithm {
    /// Slow lane: bcrypt (`$2a$`/`$2b$`/`$2y$` PHC prefix).
    Bcrypt,
    /// Fast lane: bare SHA-256 hex digest (legacy for sensitive values).
    Sha256Hex,
}

impl HashAlgorithm {
    /// Classify a stored hash by its format prefix.
    ///
    /// bcrypt hashes carry the fixed `$2` version prefix; anything else is
    /// treated as a legacy fast digest.
    #[must_use]
    pub fn classify(hash: &str) -> Self {
        if hash.starts_with("$2") {
            Self::Bcrypt
        } else {
            Self::Sha256Hex
        }
    }

    /// Returns `true` if this is the slow lane.
    #[must_use]
    pub fn is_slow(&self) -> bool {
        matches!(self, Self::Bcrypt)
    }
}

/// Returns `true` if a stored sensitive-value hash predates the slow lane
/// and the record must be regenerated (re-authentication) rather than
/// silently re-hashed.
#[must_use]
pub fn needs_regeneration(hash: &str) -> bool {
    !HashAlgorithm::classify(hash).is_slow()
}

/// Hashes and verifies tokens according to their sensitivity lane.
#[derive(Debug, Clone)]
pub struct TokenHasher {
    cost: u32,
}

impl TokenHasher {
    /// Creates a hasher with the default bcrypt cost (12).
    #[must_use]
    pub fn new() -> Self {
        Self {
            cost: DEFAULT_BCRYPT_COST,
        }
    }

    /// Creates a hasher with a custom bcrypt cost.
    ///
    /// Lower costs are only appropriate in tests; production deployments
    /// configure this through `AuthConfig`.
    #[must_use]
    pub fn with_cost(cost: u32) -> Self {
        Self { cost }
    }

    /// Slow-hash a sensitive value (authorization code, refresh token).
    ///
    /// # Errors
    ///
    /// Returns an error if bcrypt rejects the cost parameter.
    pub fn hash_sensitive(&self, value: &str) -> Result<String, HashError> {
        Ok(bcrypt::hash(value, self.cost)?)
    }

    /// Verify a sensitive value against its stored slow hash.
    ///
    /// # Errors
    ///
    /// Returns an error only if the stored hash is malformed; a wrong value
    /// yields `Ok(false)`.
    pub fn verify_sensitive(&self, value: &str, hash: &str) -> Result<bool, HashError> {
        Ok(bcrypt::verify(value, hash)?)
    }

    /// Fast-hash a value (SHA-256 hex digest).
    ///
    /// No verify counterpart exists: comparison is a direct re-hash and
    /// equality check, which is also how lookups by digest work.
    #[must_use]
    pub fn hash_fast(value: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(value.as_bytes());
        hex::encode(hasher.finalize())
    }
}

impl Default for TokenHasher {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Minimum bcrypt cost, to keep the suite fast.
    fn test_hasher() -> TokenHasher {
        TokenHasher::with_cost(4)
    }

    #[test]
    fn test_hash_fast_deterministic() {
        let hash = TokenHasher::hash_fast("test-token-value");

        // SHA-256 produces 64 hex characters
        assert_eq!(hash.len(), 64);
        assert_eq!(hash, TokenHasher::hash_fast("test-token-value"));
        assert_ne!(hash, TokenHasher::hash_fast("different-token"));
    }

    #[test]
    fn test_sensitive_round_trip() {
        let hasher = test_hasher();
        let hash = hasher.hash_sensitive("my-refresh-token").unwrap();

        assert!(hash.starts_with("$2"));
        assert!(hasher.verify_sensitive("my-refresh-token", &hash).unwrap());
        assert!(!hasher.verify_sensitive("my-refresh-tokeN", &hash).unwrap());
    }

    #[test]
    fn test_sensitive_single_character_mutation_fails() {
        let hasher = test_hasher();
        let token = "AbCdEfGhIjKlMnOpQrStUvWxYz0123456789-_abcdef";
        let hash = hasher.hash_sensitive(token).unwrap();

        for i in 0..token.len() {
            let mut mutated: Vec<u8> = token.bytes().collect();
            mutated[i] = if mutated[i] == b'x' { b'y' } else { b'x' };
            let mutated = String::from_utf8(mutated).unwrap();
            if mutated == token {
                continue;
            }
            assert!(
                !hasher.verify_sensitive(&mutated, &hash).unwrap(),
                "mutation at byte {} must not verify",
                i
            );
        }
    }

    #[test]
    fn test_sensitive_hashes_are_salted() {
        let hasher = test_hasher();
        let h1 = hasher.hash_sensitive("same-input").unwrap();
        let h2 = hasher.hash_sensitive("same-input").unwrap();

        assert_ne!(h1, h2);
        assert!(hasher.verify_sensitive("same-input", &h1).unwrap());
        assert!(hasher.verify_sensitive("same-input", &h2).unwrap());
    }

    #[test]
    fn test_verify_malformed_hash_is_error() {
        let hasher = test_hasher();
        assert!(hasher.verify_sensitive("value", "not-a-bcrypt-hash").is_err());
    }

    #[test]
    fn test_classify() {
        let hasher = test_hasher();
        let slow = hasher.hash_sensitive("value").unwrap();
        let fast = TokenHasher::hash_fast("value");

        assert_eq!(HashAlgorithm::classify(&slow), HashAlgorithm::Bcrypt);
        assert_eq!(HashAlgorithm::classify(&fast), HashAlgorithm::Sha256Hex);
        assert!(HashAlgorithm::classify(&slow).is_slow());
        assert!(!HashAlgorithm::classify(&fast).is_slow());
    }

    #[test]
    fn test_needs_regeneration() {
        let hasher = test_hasher();
        let slow = hasher.hash_sensitive("value").unwrap();
        let legacy = TokenHasher::hash_fast("value");

        assert!(!needs_regeneration(&slow));
        assert!(needs_regeneration(&legacy));
    }
}

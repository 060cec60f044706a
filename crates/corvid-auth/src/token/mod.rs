//! Token issuance, verification, and management.

pub mod issuer;

pub use issuer::{AccessTokenClaims, TokenIssuer};

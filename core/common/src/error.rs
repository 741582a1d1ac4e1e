//! Common error types for sealbox.
//!
//! The first five variants are the externally visible outcomes of vault
//! operations. The remaining variants are internal causes: the vault
//! collapses them into [`Error::RevealFailed`] before returning, logging the
//! specific cause instead of surfacing it, so callers cannot distinguish
//! tampering from corruption from a wrong key.

use thiserror::Error;

/// Top-level error type for sealbox operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Input rejected at the request boundary before reaching the vault.
    #[error("invalid input: {0}")]
    Validation(String),

    /// The handle does not resolve to a live secret. Deliberately covers
    /// "never existed", "expired", and "already revealed" alike.
    #[error("secret not found or has expired")]
    SecretUnavailable,

    /// Decryption or key reconstruction failed. The specific cause is
    /// logged, never surfaced.
    #[error("decryption failed: the secret may have been tampered with or is invalid")]
    RevealFailed,

    /// The backing store failed or timed out.
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    /// The system randomness source failed. Fatal, not retried.
    #[error("entropy source failure: {0}")]
    Entropy(String),

    /// AEAD tag verification failed: tampered, truncated, or wrong key.
    #[error("authentication failed")]
    AuthenticationFailed,

    /// Key material did not parse: invalid structure, missing fields, or a
    /// mismatched algorithm.
    #[error("malformed key material: {0}")]
    MalformedKey(String),

    /// Ciphertext or nonce with an inconsistent structure or length.
    #[error("malformed input: {0}")]
    MalformedInput(String),

    /// A record could not be serialized or parsed.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// I/O failure from a file-backed store.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias using the common Error.
pub type Result<T> = std::result::Result<T, Error>;

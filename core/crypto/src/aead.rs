//! Authenticated encryption using AES-256-GCM.
//!
//! AES-256-GCM provides both confidentiality and authenticity with a
//! 96-bit nonce. Every encryption draws a fresh random nonce, and each key
//! protects exactly one message, so a (key, nonce) pair can never repeat.

use aes_gcm::{
    aead::{generic_array::GenericArray, Aead, KeyInit},
    Aes256Gcm,
};
use rand::{rngs::OsRng, RngCore};

use crate::keys::SecretKey;
use sealbox_common::{Error, Result};

/// Nonce size for AES-256-GCM (12 bytes).
pub const NONCE_SIZE: usize = 12;

/// Authentication tag size (16 bytes).
pub const TAG_SIZE: usize = 16;

/// Encrypt plaintext under a per-secret key.
///
/// # Postconditions
/// - Returns the ciphertext (with appended authentication tag) and the
///   freshly drawn nonce as separate values; the stored record keeps them
///   in separate fields
/// - Ciphertext length is plaintext length + TAG_SIZE
///
/// # Errors
/// - `Error::Entropy` if the nonce cannot be drawn from the OS randomness
///   source
///
/// # Security
/// - The nonce is random for every call, never derived from a counter
/// - The ciphertext is authenticated; any later modification fails decryption
pub fn encrypt(key: &SecretKey, plaintext: &[u8]) -> Result<(Vec<u8>, [u8; NONCE_SIZE])> {
    let mut nonce = [0u8; NONCE_SIZE];
    OsRng
        .try_fill_bytes(&mut nonce)
        .map_err(|e| Error::Entropy(e.to_string()))?;

    let cipher = Aes256Gcm::new(GenericArray::from_slice(key.as_bytes()));

    let ciphertext = cipher
        .encrypt(GenericArray::from_slice(&nonce), plaintext)
        .map_err(|_| Error::MalformedInput("plaintext exceeds AEAD limits".to_string()))?;

    Ok((ciphertext, nonce))
}

/// Decrypt ciphertext produced by [`encrypt`].
///
/// # Preconditions
/// - `nonce` must be the NONCE_SIZE bytes returned alongside the ciphertext
///
/// # Postconditions
/// - Returns the original plaintext only if the authentication tag verifies
///
/// # Errors
/// - `Error::MalformedInput` if the nonce or ciphertext lengths are
///   structurally impossible
/// - `Error::AuthenticationFailed` if the tag does not verify (tampered,
///   truncated, or wrong key); no detail beyond that is exposed
///
/// # Security
/// - Verification is all-or-nothing; no partial plaintext is ever returned
/// - Timing reveals nothing beyond what the AEAD primitive itself leaks
pub fn decrypt(key: &SecretKey, ciphertext: &[u8], nonce: &[u8]) -> Result<Vec<u8>> {
    if nonce.len() != NONCE_SIZE {
        return Err(Error::MalformedInput(format!(
            "invalid nonce length: expected {}, got {}",
            NONCE_SIZE,
            nonce.len()
        )));
    }

    if ciphertext.len() < TAG_SIZE {
        return Err(Error::MalformedInput(
            "ciphertext shorter than its authentication tag".to_string(),
        ));
    }

    let cipher = Aes256Gcm::new(GenericArray::from_slice(key.as_bytes()));

    cipher
        .decrypt(GenericArray::from_slice(nonce), ciphertext)
        .map_err(|_| Error::AuthenticationFailed)
}

//! Key types with secure memory handling.
//!
//! Every sealed secret is protected by its own [`SecretKey`], generated
//! fresh at seal time and never reused. Keys zeroize their memory on drop
//! and leave the process only as an [`ExportedKey`], the JWK-style
//! structure persisted in the store or carried in a handle.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use rand::{rngs::OsRng, RngCore};
use serde::{Deserialize, Serialize};
use std::fmt;
use subtle::ConstantTimeEq;
use zeroize::{Zeroize, ZeroizeOnDrop};

use sealbox_common::{Error, Result};

/// Length of secret keys in bytes (256-bit).
pub const KEY_LENGTH: usize = 32;

/// Key type declared by exported key material ("oct": raw symmetric octets).
const EXPORTED_KTY: &str = "oct";

/// Algorithm declared by exported key material.
const EXPORTED_ALG: &str = "A256GCM";

/// Symmetric key owning exactly one sealed secret.
///
/// Generated at seal time, reconstructed at reveal time, never shared
/// between two secrets.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SecretKey {
    key: [u8; KEY_LENGTH],
}

impl SecretKey {
    /// Generate a fresh random key from the OS randomness source.
    ///
    /// # Postconditions
    /// - Returns a key that will zeroize on drop
    ///
    /// # Errors
    /// - `Error::Entropy` if the randomness source fails; fatal, callers
    ///   must not retry
    pub fn generate() -> Result<Self> {
        let mut key = [0u8; KEY_LENGTH];
        OsRng
            .try_fill_bytes(&mut key)
            .map_err(|e| Error::Entropy(e.to_string()))?;
        Ok(Self { key })
    }

    /// Create a key from raw bytes.
    pub fn from_bytes(key: [u8; KEY_LENGTH]) -> Self {
        Self { key }
    }

    /// Get the key bytes.
    ///
    /// # Security
    /// The returned slice should be used immediately and not stored.
    pub fn as_bytes(&self) -> &[u8; KEY_LENGTH] {
        &self.key
    }

    /// Serialize key material to its transportable, storable form.
    pub fn export(&self) -> ExportedKey {
        ExportedKey {
            kty: EXPORTED_KTY.to_string(),
            alg: EXPORTED_ALG.to_string(),
            k: URL_SAFE_NO_PAD.encode(self.key),
        }
    }

    /// Parse an exported representation back into a usable key.
    ///
    /// # Errors
    /// - `Error::MalformedKey` if the structure declares an unsupported key
    ///   type or a mismatched algorithm, or if the key material does not
    ///   decode to exactly [`KEY_LENGTH`] bytes
    pub fn import(exported: &ExportedKey) -> Result<Self> {
        if exported.kty != EXPORTED_KTY {
            return Err(Error::MalformedKey(format!(
                "unsupported key type: {}",
                exported.kty
            )));
        }
        if exported.alg != EXPORTED_ALG {
            return Err(Error::MalformedKey(format!(
                "mismatched algorithm: {}",
                exported.alg
            )));
        }

        let bytes = URL_SAFE_NO_PAD
            .decode(&exported.k)
            .map_err(|e| Error::MalformedKey(format!("key material is not valid base64: {}", e)))?;

        let key: [u8; KEY_LENGTH] = bytes
            .try_into()
            .map_err(|_| Error::MalformedKey("key material has the wrong length".to_string()))?;

        Ok(Self { key })
    }
}

impl fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SecretKey([REDACTED])")
    }
}

impl PartialEq for SecretKey {
    fn eq(&self, other: &Self) -> bool {
        self.key.ct_eq(&other.key).into()
    }
}

impl Eq for SecretKey {}

/// Transportable form of a [`SecretKey`]: a JWK-style symmetric key object.
///
/// Serialized as `{"kty": "oct", "alg": "A256GCM", "k": <base64url no-pad>}`.
/// Unknown members (`ext`, `key_ops`, ...) are ignored on parse, so key
/// records written by other implementations of this format stay readable.
/// The structure zeroizes its key material on drop.
#[derive(Clone, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
pub struct ExportedKey {
    /// Key type; always "oct".
    pub kty: String,
    /// Intended algorithm; always "A256GCM".
    pub alg: String,
    /// Key bytes, URL-safe base64 without padding.
    pub k: String,
}

impl fmt::Debug for ExportedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ExportedKey([REDACTED])")
    }
}

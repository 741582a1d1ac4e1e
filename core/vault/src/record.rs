//! Stored record wire formats.
//!
//! Two JSON shapes reach the store: the ciphertext record
//! `{"encrypted": <base64>, "iv": <base64>}` (plus an embedded key in the
//! combined layout) and the key record `{"key": <exported key>}` used by
//! the split layout. Binary fields use standard base64; the exported key
//! keeps its own URL-safe encoding from the crypto crate.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};

use sealbox_common::{Error, Result};
use sealbox_crypto::ExportedKey;

/// Ciphertext record persisted under the primary identifier.
#[derive(Debug, Serialize, Deserialize)]
pub struct SecretRecord {
    /// Ciphertext with appended authentication tag, standard base64.
    pub encrypted: String,
    /// AEAD nonce, standard base64.
    pub iv: String,
    /// Embedded key material; present only in the combined layout.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<ExportedKey>,
}

impl SecretRecord {
    /// Build a record from raw ciphertext and nonce bytes.
    pub fn new(ciphertext: &[u8], nonce: &[u8], key: Option<ExportedKey>) -> Self {
        Self {
            encrypted: STANDARD.encode(ciphertext),
            iv: STANDARD.encode(nonce),
            key,
        }
    }

    /// Decode the ciphertext bytes.
    ///
    /// # Errors
    /// - `Error::MalformedInput` if the field is not valid base64
    pub fn ciphertext(&self) -> Result<Vec<u8>> {
        STANDARD
            .decode(&self.encrypted)
            .map_err(|e| Error::MalformedInput(format!("ciphertext field: {}", e)))
    }

    /// Decode the nonce bytes.
    ///
    /// # Errors
    /// - `Error::MalformedInput` if the field is not valid base64
    pub fn nonce(&self) -> Result<Vec<u8>> {
        STANDARD
            .decode(&self.iv)
            .map_err(|e| Error::MalformedInput(format!("iv field: {}", e)))
    }

    /// Serialize for storage.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self).map_err(|e| Error::Serialization(e.to_string()))
    }

    /// Parse a stored record.
    ///
    /// # Errors
    /// - `Error::Serialization` if the bytes are not a valid record
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes).map_err(|e| Error::Serialization(e.to_string()))
    }
}

/// Key record persisted under the key token in the split layout.
#[derive(Debug, Serialize, Deserialize)]
pub struct KeyRecord {
    /// Exported key material.
    pub key: ExportedKey,
}

impl KeyRecord {
    /// Serialize for storage.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self).map_err(|e| Error::Serialization(e.to_string()))
    }

    /// Parse a stored key record.
    ///
    /// # Errors
    /// - `Error::Serialization` if the bytes are not a valid key record
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes).map_err(|e| Error::Serialization(e.to_string()))
    }
}

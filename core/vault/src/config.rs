//! Vault configuration and persisted store metadata.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use sealbox_common::{Error, Result};

/// File name of the persisted store configuration, kept beside the store
/// root so a deployment cannot silently change layout between runs.
pub const STORE_CONFIG_FILENAME: &str = "sealbox.json";

/// How a handle addresses key material.
///
/// The two layouts are not interchangeable at the wire level; a store is
/// created with one and keeps it for life.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HandleLayout {
    /// One identifier addresses ciphertext+nonce; a second independent
    /// token addresses the key record. Both are required to decrypt, so a
    /// leaked storage identifier alone exposes nothing.
    #[default]
    Split,
    /// One identifier addresses a record carrying ciphertext, nonce, and
    /// key together. Whoever can fetch the record can decrypt.
    Combined,
}

impl HandleLayout {
    /// Stable name used in configuration files and CLI flags.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Split => "split",
            Self::Combined => "combined",
        }
    }
}

impl fmt::Display for HandleLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HandleLayout {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "split" => Ok(Self::Split),
            "combined" => Ok(Self::Combined),
            other => Err(Error::Validation(format!(
                "unknown handle layout '{}'; use 'split' or 'combined'",
                other
            ))),
        }
    }
}

/// Store format version for migration support.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreVersion {
    pub major: u32,
    pub minor: u32,
}

impl StoreVersion {
    /// Current store format version.
    pub const CURRENT: Self = Self { major: 1, minor: 0 };

    /// Check if this version is compatible with the current version.
    pub fn is_compatible(&self) -> bool {
        self.major == Self::CURRENT.major
    }
}

impl Default for StoreVersion {
    fn default() -> Self {
        Self::CURRENT
    }
}

/// Runtime options for a [`crate::Vault`].
#[derive(Debug, Clone, Copy)]
pub struct VaultOptions {
    /// Handle layout this vault seals and reveals with.
    pub layout: HandleLayout,
    /// Upper bound on any single store operation; past it the operation
    /// surfaces as store-unavailable.
    pub store_timeout: Duration,
}

impl VaultOptions {
    /// Options for `layout` with the default store timeout.
    pub fn with_layout(layout: HandleLayout) -> Self {
        Self {
            layout,
            ..Self::default()
        }
    }
}

impl Default for VaultOptions {
    fn default() -> Self {
        Self {
            layout: HandleLayout::default(),
            store_timeout: Duration::from_secs(5),
        }
    }
}

/// Persisted store configuration.
///
/// Stored beside the store root at creation time and checked on every
/// later use, so handles sealed under one layout are never revealed
/// through the other.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Store format version.
    pub version: StoreVersion,
    /// Handle layout this store was created with.
    pub layout: HandleLayout,
    /// Store backend name (e.g., "dir", "memory").
    pub store_type: String,
    /// Store creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl StoreConfig {
    /// Create a configuration for a new store.
    pub fn new(layout: HandleLayout, store_type: impl Into<String>) -> Self {
        Self {
            version: StoreVersion::CURRENT,
            layout,
            store_type: store_type.into(),
            created_at: Utc::now(),
        }
    }

    /// Serialize for persistence.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        serde_json::to_vec_pretty(self).map_err(|e| Error::Serialization(e.to_string()))
    }

    /// Parse a persisted configuration.
    ///
    /// # Errors
    /// - `Error::Serialization` if the bytes are not a valid configuration
    /// - `Error::Validation` if the format version is incompatible
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let config: Self =
            serde_json::from_slice(bytes).map_err(|e| Error::Serialization(e.to_string()))?;

        if !config.version.is_compatible() {
            return Err(Error::Validation(format!(
                "store format version {}.{} is not compatible with {}.{}",
                config.version.major,
                config.version.minor,
                StoreVersion::CURRENT.major,
                StoreVersion::CURRENT.minor,
            )));
        }

        Ok(config)
    }
}

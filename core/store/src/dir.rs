//! Directory-backed secret store.
//!
//! One JSON envelope file per record under a root directory. The envelope
//! embeds an absolute expiry timestamp so expiry survives process
//! restarts. The filesystem has no native TTL: expired envelopes are
//! unlinked lazily on access and by [`DirStore::purge_expired`] sweeps.

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;
use tracing::{debug, warn};

use crate::store::SecretStore;
use sealbox_common::{Error, Result};

/// Subdirectory holding record envelopes, kept apart from any
/// caller-managed files in the root.
const RECORDS_DIRNAME: &str = "records";

/// On-disk record envelope.
#[derive(Debug, Serialize, Deserialize)]
struct Envelope {
    /// Absolute deadline; the record is unreadable at or after this time.
    expires_at: DateTime<Utc>,
    /// Record bytes, standard base64.
    value: String,
}

/// Directory-backed expiring store.
///
/// Stores each record as a single envelope file named after its key.
pub struct DirStore {
    records: PathBuf,
}

impl DirStore {
    /// Create a store rooted at `root`.
    ///
    /// # Postconditions
    /// - The root and records directories exist
    ///
    /// # Errors
    /// - Directory creation failure (invalid path, permissions)
    pub fn new(root: impl AsRef<Path>) -> Result<Self> {
        let records = root.as_ref().join(RECORDS_DIRNAME);

        // Sync for constructor
        if !records.exists() {
            std::fs::create_dir_all(&records)?;
        }

        Ok(Self { records })
    }

    /// Map a record key to its envelope path.
    ///
    /// Keys are restricted to the identifier alphabet before touching the
    /// filesystem, so a hostile key cannot escape the records directory.
    fn record_path(&self, key: &str) -> Result<PathBuf> {
        if key.is_empty() || !key.bytes().all(|b| b.is_ascii_alphanumeric()) {
            return Err(Error::Validation(
                "record key contains characters outside the identifier alphabet".to_string(),
            ));
        }
        Ok(self.records.join(key))
    }

    /// Remove every expired envelope under the records directory.
    ///
    /// Returns the number of records removed. Files that do not parse as
    /// envelopes are left alone.
    pub async fn purge_expired(&self) -> Result<usize> {
        let now = Utc::now();
        let mut removed = 0;

        let mut dir = fs::read_dir(&self.records).await?;
        while let Some(entry) = dir.next_entry().await? {
            let path = entry.path();
            if !entry.file_type().await?.is_file() {
                continue;
            }

            let envelope: Envelope = match serde_json::from_slice(&fs::read(&path).await?) {
                Ok(envelope) => envelope,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "skipping unparseable record file");
                    continue;
                }
            };

            if envelope.expires_at <= now {
                fs::remove_file(&path).await?;
                removed += 1;
            }
        }

        debug!(removed, "purged expired records");
        Ok(removed)
    }
}

#[async_trait]
impl SecretStore for DirStore {
    fn name(&self) -> &str {
        "dir"
    }

    async fn put(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<()> {
        let path = self.record_path(key)?;

        let ttl = chrono::Duration::from_std(ttl)
            .map_err(|_| Error::Validation("ttl out of range".to_string()))?;
        let expires_at = Utc::now()
            .checked_add_signed(ttl)
            .ok_or_else(|| Error::Validation("ttl out of range".to_string()))?;

        let envelope = Envelope {
            expires_at,
            value: STANDARD.encode(value),
        };
        let raw = serde_json::to_vec(&envelope)
            .map_err(|e| Error::Serialization(e.to_string()))?;

        fs::write(&path, raw).await?;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let path = self.record_path(key)?;

        let raw = match fs::read(&path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let envelope: Envelope = serde_json::from_slice(&raw)
            .map_err(|e| Error::Serialization(format!("record envelope: {}", e)))?;

        if envelope.expires_at <= Utc::now() {
            // Expired: unlink eagerly, report absent
            if let Err(e) = fs::remove_file(&path).await {
                if e.kind() != ErrorKind::NotFound {
                    warn!(key, error = %e, "failed to unlink expired record");
                }
            }
            return Ok(None);
        }

        let value = STANDARD
            .decode(&envelope.value)
            .map_err(|e| Error::Serialization(format!("record envelope: {}", e)))?;

        Ok(Some(value))
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let path = self.record_path(key)?;

        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

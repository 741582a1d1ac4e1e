//! In-memory secret store.

use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;

use crate::store::SecretStore;
use sealbox_common::{Error, Result};

/// Stored value with its expiry deadline.
#[derive(Debug, Clone)]
struct Entry {
    value: Vec<u8>,
    expires_at: Instant,
}

/// In-memory expiring store.
///
/// Used by tests and single-process deployments. Entries past their
/// deadline are treated as absent and removed on access; all data is lost
/// on drop.
#[derive(Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, Entry>>,
}

impl MemoryStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live (unexpired) entries.
    pub async fn len(&self) -> usize {
        let now = Instant::now();
        self.entries
            .read()
            .await
            .values()
            .filter(|entry| entry.expires_at > now)
            .count()
    }

    /// Check whether the store holds no live entries.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl SecretStore for MemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn put(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<()> {
        let expires_at = Instant::now()
            .checked_add(ttl)
            .ok_or_else(|| Error::Validation("ttl out of range".to_string()))?;

        let entry = Entry { value, expires_at };
        self.entries.write().await.insert(key.to_string(), entry);

        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let mut entries = self.entries.write().await;

        match entries.get(key) {
            Some(entry) if entry.expires_at <= Instant::now() => {
                // Expired: evict eagerly, report absent
                entries.remove(key);
                Ok(None)
            }
            Some(entry) => Ok(Some(entry.value.clone())),
            None => Ok(None),
        }
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.entries.write().await.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TTL: Duration = Duration::from_secs(300);

    #[tokio::test]
    async fn test_put_get_roundtrip() {
        let store = MemoryStore::new();

        store.put("abc", b"payload".to_vec(), TTL).await.unwrap();
        let value = store.get("abc").await.unwrap();

        assert_eq!(value, Some(b"payload".to_vec()));
    }

    #[tokio::test]
    async fn test_get_absent_returns_none() {
        let store = MemoryStore::new();

        assert_eq!(store.get("missing").await.unwrap(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_get_after_ttl_returns_none() {
        let store = MemoryStore::new();
        store.put("abc", b"payload".to_vec(), TTL).await.unwrap();

        tokio::time::advance(TTL + Duration::from_secs(1)).await;

        assert_eq!(store.get("abc").await.unwrap(), None);
        assert!(store.is_empty().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_get_before_ttl_returns_value() {
        let store = MemoryStore::new();
        store.put("abc", b"payload".to_vec(), TTL).await.unwrap();

        tokio::time::advance(TTL - Duration::from_secs(1)).await;

        assert_eq!(store.get("abc").await.unwrap(), Some(b"payload".to_vec()));
    }

    #[tokio::test]
    async fn test_get_after_delete_returns_none() {
        let store = MemoryStore::new();
        store.put("abc", b"payload".to_vec(), TTL).await.unwrap();

        store.delete("abc").await.unwrap();

        assert_eq!(store.get("abc").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let store = MemoryStore::new();

        store.delete("never-stored").await.unwrap();
        store.delete("never-stored").await.unwrap();
    }

    #[tokio::test]
    async fn test_overwrite_replaces_value() {
        let store = MemoryStore::new();

        store.put("abc", b"first".to_vec(), TTL).await.unwrap();
        store.put("abc", b"second".to_vec(), TTL).await.unwrap();

        assert_eq!(store.get("abc").await.unwrap(), Some(b"second".to_vec()));
        assert_eq!(store.len().await, 1);
    }
}

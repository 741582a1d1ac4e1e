//! Secret store trait definition.

use async_trait::async_trait;
use std::time::Duration;

use sealbox_common::Result;

/// Expiring key-value store for sealed secret records.
///
/// The vault treats the store as an external collaborator and depends on
/// two contract points only: `get` after a successful `delete` reports
/// absence, and `get` after the TTL elapses reports absence. Eviction
/// timing beyond that is the backend's business.
#[async_trait]
pub trait SecretStore: Send + Sync {
    /// Get the backend name (e.g., "memory", "dir").
    fn name(&self) -> &str;

    /// Store `value` under `key` until `ttl` elapses.
    ///
    /// # Postconditions
    /// - `get(key)` returns the value until the TTL elapses or the key is
    ///   deleted
    /// - Overwriting an existing key is allowed; callers never rely on it
    ///
    /// # Errors
    /// - Backend failure (I/O, serialization, out-of-range TTL)
    async fn put(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<()>;

    /// Fetch the value stored under `key`.
    ///
    /// # Postconditions
    /// - Returns `Ok(None)` for absent and for expired entries alike; the
    ///   two cases are indistinguishable by design
    ///
    /// # Errors
    /// - Backend failure; never used to signal absence
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Remove the value stored under `key`.
    ///
    /// # Postconditions
    /// - A subsequent `get(key)` returns `Ok(None)`
    /// - Idempotent: deleting an absent key is not an error
    ///
    /// # Errors
    /// - Backend failure
    async fn delete(&self, key: &str) -> Result<()>;
}

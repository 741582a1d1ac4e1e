//! Seal and reveal orchestration.

use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::config::{HandleLayout, VaultOptions};
use crate::handle::Handle;
use crate::locks::KeyedLocks;
use crate::record::{KeyRecord, SecretRecord};
use crate::token::{self, KEY_TOKEN_LEN, SECRET_ID_LEN};
use sealbox_common::{Error, Result};
use sealbox_crypto::{decrypt, encrypt, SecretKey};
use sealbox_store::SecretStore;

/// One-time-secret vault.
///
/// Seals a plaintext into the store under fresh identifiers and reveals
/// it at most once; afterwards, or once the TTL elapses, the secret is
/// unrecoverable. The store is an injected collaborator so tests can
/// substitute an in-memory fake.
///
/// A secret moves `absent -> sealed -> (revealed | expired)`; both end
/// states are terminal and indistinguishable from the outside.
pub struct Vault {
    store: Arc<dyn SecretStore>,
    layout: HandleLayout,
    store_timeout: Duration,
    reveal_locks: KeyedLocks,
}

impl Vault {
    /// Create a vault over `store`.
    pub fn new(store: Arc<dyn SecretStore>, options: VaultOptions) -> Self {
        Self {
            store,
            layout: options.layout,
            store_timeout: options.store_timeout,
            reveal_locks: KeyedLocks::new(),
        }
    }

    /// Handle layout this vault operates with.
    pub fn layout(&self) -> HandleLayout {
        self.layout
    }

    /// Seal a plaintext for exactly one reveal within `ttl`.
    ///
    /// # Preconditions
    /// - The request layer has already bounded the plaintext size and TTL;
    ///   the vault only refuses the empty string
    ///
    /// # Postconditions
    /// - The returned handle reveals the exact plaintext once
    /// - No record outlives `ttl`
    ///
    /// # Errors
    /// - `Error::Validation` on empty plaintext
    /// - `Error::Entropy` if the randomness source fails
    /// - `Error::StoreUnavailable` if the store fails or times out; a
    ///   failed seal leaves no revealable state behind and a retry
    ///   produces a fresh handle
    pub async fn seal(&self, plaintext: &str, ttl: Duration) -> Result<Handle> {
        if plaintext.is_empty() {
            return Err(Error::Validation("plaintext must not be empty".to_string()));
        }

        let key = SecretKey::generate()?;
        let (ciphertext, nonce) = encrypt(&key, plaintext.as_bytes())?;

        let handle = match self.layout {
            HandleLayout::Combined => {
                // The identifier doubles as the decryption capability, so
                // it gets the longer key-token length
                let id = token::generate(KEY_TOKEN_LEN)?;
                let record = SecretRecord::new(&ciphertext, &nonce, Some(key.export()));
                self.store_put(&id, record.to_bytes()?, ttl).await?;
                Handle::single(id)
            }
            HandleLayout::Split => {
                let id = token::generate(SECRET_ID_LEN)?;
                let key_token = token::generate(KEY_TOKEN_LEN)?;

                let record = SecretRecord::new(&ciphertext, &nonce, None);
                self.store_put(&id, record.to_bytes()?, ttl).await?;

                let key_record = KeyRecord { key: key.export() };
                if let Err(e) = self.store_put(&key_token, key_record.to_bytes()?, ttl).await {
                    // Don't leave a keyless ciphertext lingering until its
                    // TTL; if the cleanup fails too, the TTL is the backstop
                    if let Err(cleanup) = self.store_delete(&id).await {
                        warn!(id = %id, error = %cleanup, "cleanup of partial seal failed");
                    }
                    return Err(e);
                }

                Handle::split(id, key_token)
            }
        };

        // In the combined layout the identifier is itself the decryption
        // capability and stays out of logs
        match self.layout {
            HandleLayout::Split => {
                debug!(id = %handle.id, ttl_secs = ttl.as_secs(), "secret stored")
            }
            HandleLayout::Combined => debug!(ttl_secs = ttl.as_secs(), "secret stored"),
        }
        info!("secret sealed");
        Ok(handle)
    }

    /// Exchange a handle for its plaintext, exactly once.
    ///
    /// Reveals of the same handle are serialized on an in-process lock
    /// keyed by the identifier, so under concurrent calls exactly one
    /// obtains the plaintext and the rest observe an absent secret.
    ///
    /// # Postconditions
    /// - On success the ciphertext record is already deleted; no later
    ///   call can succeed for the same handle
    ///
    /// # Errors
    /// - `Error::Validation` if the handle's shape does not match the
    ///   vault's layout
    /// - `Error::SecretUnavailable` if the handle does not resolve to a
    ///   live record: never sealed, expired, or already revealed, which
    ///   are indistinguishable on purpose
    /// - `Error::RevealFailed` if decryption or key reconstruction fails;
    ///   the specific cause is logged, never returned
    /// - `Error::StoreUnavailable` if the store fails or times out,
    ///   including on the mandatory post-decrypt delete, in which case the
    ///   plaintext is withheld
    pub async fn reveal(&self, handle: &Handle) -> Result<String> {
        handle.validate(self.layout)?;

        let _guard = self.reveal_locks.lock(&handle.id).await;
        if self.layout == HandleLayout::Split {
            debug!(id = %handle.id, "revealing secret");
        }

        let raw = self
            .store_get(&handle.id)
            .await?
            .ok_or(Error::SecretUnavailable)?;

        let plaintext = match self.decrypt_record(handle, &raw).await {
            Ok(plaintext) => plaintext,
            Err(e @ (Error::SecretUnavailable | Error::StoreUnavailable(_))) => return Err(e),
            Err(cause) => {
                // Cause is logged and dropped; the caller sees one generic
                // failure regardless of what went wrong
                debug!(%cause, "reveal failed");
                return Err(Error::RevealFailed);
            }
        };

        // One-time-use hinges on this delete; withhold the plaintext
        // rather than return it with the record still fetchable
        self.store_delete(&handle.id).await?;

        if let Some(key_token) = &handle.key {
            if let Err(e) = self.store_delete(key_token).await {
                warn!(error = %e, "failed to delete key record after reveal");
            }
        }

        info!("secret revealed");
        Ok(plaintext)
    }

    /// Reconstruct the key and decrypt a fetched ciphertext record.
    async fn decrypt_record(&self, handle: &Handle, raw: &[u8]) -> Result<String> {
        let record = SecretRecord::from_bytes(raw)?;

        let exported = match self.layout {
            HandleLayout::Combined => record
                .key
                .clone()
                .ok_or_else(|| Error::MalformedKey("record carries no key material".to_string()))?,
            HandleLayout::Split => {
                let key_token = handle
                    .key
                    .as_deref()
                    .ok_or_else(|| Error::Validation("missing key token".to_string()))?;
                let raw_key = self
                    .store_get(key_token)
                    .await?
                    .ok_or(Error::SecretUnavailable)?;
                KeyRecord::from_bytes(&raw_key)?.key
            }
        };

        let key = SecretKey::import(&exported)?;
        let plaintext = decrypt(&key, &record.ciphertext()?, &record.nonce()?)?;

        String::from_utf8(plaintext)
            .map_err(|_| Error::MalformedInput("plaintext is not valid UTF-8".to_string()))
    }

    async fn store_put(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<()> {
        match timeout(self.store_timeout, self.store.put(key, value, ttl)).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(Error::StoreUnavailable(e.to_string())),
            Err(_) => Err(Error::StoreUnavailable(
                "store operation timed out".to_string(),
            )),
        }
    }

    async fn store_get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        match timeout(self.store_timeout, self.store.get(key)).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(Error::StoreUnavailable(e.to_string())),
            Err(_) => Err(Error::StoreUnavailable(
                "store operation timed out".to_string(),
            )),
        }
    }

    async fn store_delete(&self, key: &str) -> Result<()> {
        match timeout(self.store_timeout, self.store.delete(key)).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(Error::StoreUnavailable(e.to_string())),
            Err(_) => Err(Error::StoreUnavailable(
                "store operation timed out".to_string(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use sealbox_store::MemoryStore;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const TTL: Duration = Duration::from_secs(3600);

    fn vault_with(layout: HandleLayout) -> (Arc<MemoryStore>, Vault) {
        let store = Arc::new(MemoryStore::new());
        let vault = Vault::new(store.clone(), VaultOptions::with_layout(layout));
        (store, vault)
    }

    #[tokio::test]
    async fn test_seal_reveal_roundtrip_split() {
        let (_store, vault) = vault_with(HandleLayout::Split);

        let handle = vault.seal("hello world", TTL).await.unwrap();
        assert_eq!(handle.id.len(), SECRET_ID_LEN);
        assert_eq!(handle.key.as_ref().unwrap().len(), KEY_TOKEN_LEN);

        assert_eq!(vault.reveal(&handle).await.unwrap(), "hello world");
    }

    #[tokio::test]
    async fn test_seal_reveal_roundtrip_combined() {
        let (_store, vault) = vault_with(HandleLayout::Combined);

        let handle = vault.seal("hello world", TTL).await.unwrap();
        assert_eq!(handle.id.len(), KEY_TOKEN_LEN);
        assert!(handle.key.is_none());

        assert_eq!(vault.reveal(&handle).await.unwrap(), "hello world");
    }

    #[tokio::test]
    async fn test_second_reveal_is_unavailable() {
        let (store, vault) = vault_with(HandleLayout::Split);

        let handle = vault.seal("hello world", TTL).await.unwrap();
        vault.reveal(&handle).await.unwrap();

        assert!(matches!(
            vault.reveal(&handle).await,
            Err(Error::SecretUnavailable)
        ));
        // Both records are gone, not just unreadable
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_unicode_roundtrip() {
        let (_store, vault) = vault_with(HandleLayout::Split);

        let handle = vault
            .seal("héllo 世界", Duration::from_secs(300))
            .await
            .unwrap();

        assert_eq!(vault.reveal(&handle).await.unwrap(), "héllo 世界");
    }

    #[tokio::test]
    async fn test_never_sealed_handle_is_unavailable() {
        let (_store, vault) = vault_with(HandleLayout::Split);

        let handle = Handle::split("A".repeat(SECRET_ID_LEN), "B".repeat(KEY_TOKEN_LEN));

        assert!(matches!(
            vault.reveal(&handle).await,
            Err(Error::SecretUnavailable)
        ));
    }

    #[tokio::test]
    async fn test_empty_plaintext_rejected() {
        let (_store, vault) = vault_with(HandleLayout::Split);

        assert!(matches!(
            vault.seal("", TTL).await,
            Err(Error::Validation(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_secret_is_unavailable() {
        let (_store, vault) = vault_with(HandleLayout::Split);

        let handle = vault.seal("short-lived", Duration::from_secs(300)).await.unwrap();
        tokio::time::advance(Duration::from_secs(301)).await;

        assert!(matches!(
            vault.reveal(&handle).await,
            Err(Error::SecretUnavailable)
        ));
    }

    #[tokio::test]
    async fn test_tampered_ciphertext_fails_generically() {
        let (store, vault) = vault_with(HandleLayout::Split);

        let handle = vault.seal("hello world", TTL).await.unwrap();

        let raw = store.get(&handle.id).await.unwrap().unwrap();
        let record = SecretRecord::from_bytes(&raw).unwrap();
        let mut ciphertext = record.ciphertext().unwrap();
        ciphertext[0] ^= 0x01;
        let tampered = SecretRecord::new(&ciphertext, &record.nonce().unwrap(), None);
        store
            .put(&handle.id, tampered.to_bytes().unwrap(), TTL)
            .await
            .unwrap();

        assert!(matches!(
            vault.reveal(&handle).await,
            Err(Error::RevealFailed)
        ));
        // A failed reveal does not consume the record
        assert!(store.get(&handle.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_tampered_nonce_fails_generically() {
        let (store, vault) = vault_with(HandleLayout::Combined);

        let handle = vault.seal("hello world", TTL).await.unwrap();

        let raw = store.get(&handle.id).await.unwrap().unwrap();
        let record = SecretRecord::from_bytes(&raw).unwrap();
        let mut nonce = record.nonce().unwrap();
        nonce[0] ^= 0x01;
        let tampered = SecretRecord::new(&record.ciphertext().unwrap(), &nonce, record.key);
        store
            .put(&handle.id, tampered.to_bytes().unwrap(), TTL)
            .await
            .unwrap();

        assert!(matches!(
            vault.reveal(&handle).await,
            Err(Error::RevealFailed)
        ));
    }

    #[tokio::test]
    async fn test_corrupt_record_fails_generically() {
        let (store, vault) = vault_with(HandleLayout::Split);

        let handle = vault.seal("hello world", TTL).await.unwrap();
        store
            .put(&handle.id, b"not json at all".to_vec(), TTL)
            .await
            .unwrap();

        assert!(matches!(
            vault.reveal(&handle).await,
            Err(Error::RevealFailed)
        ));
    }

    #[tokio::test]
    async fn test_wrong_key_token_is_unavailable() {
        let (_store, vault) = vault_with(HandleLayout::Split);

        let handle = vault.seal("hello world", TTL).await.unwrap();
        let wrong = Handle::split(handle.id.clone(), "Z".repeat(KEY_TOKEN_LEN));

        assert!(matches!(
            vault.reveal(&wrong).await,
            Err(Error::SecretUnavailable)
        ));
    }

    #[tokio::test]
    async fn test_layout_mismatch_is_rejected() {
        let store = Arc::new(MemoryStore::new());
        let split = Vault::new(store.clone(), VaultOptions::with_layout(HandleLayout::Split));
        let combined = Vault::new(store, VaultOptions::with_layout(HandleLayout::Combined));

        let handle = split.seal("hello world", TTL).await.unwrap();

        assert!(matches!(
            combined.reveal(&handle).await,
            Err(Error::Validation(_))
        ));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_concurrent_reveals_yield_one_plaintext() {
        let store = Arc::new(MemoryStore::new());
        let vault = Arc::new(Vault::new(
            store,
            VaultOptions::with_layout(HandleLayout::Split),
        ));

        let handle = vault.seal("only once", TTL).await.unwrap();

        let attempts: Vec<_> = (0..8)
            .map(|_| {
                let vault = vault.clone();
                let handle = handle.clone();
                tokio::spawn(async move { vault.reveal(&handle).await })
            })
            .collect();

        let outcomes = futures::future::join_all(attempts).await;

        let mut successes = 0;
        for outcome in outcomes {
            match outcome.unwrap() {
                Ok(plaintext) => {
                    assert_eq!(plaintext, "only once");
                    successes += 1;
                }
                Err(Error::SecretUnavailable) => {}
                Err(other) => panic!("unexpected outcome: {:?}", other),
            }
        }
        assert_eq!(successes, 1);
    }

    /// Delegates to a memory store but fails every put past a cutoff.
    struct FlakyStore {
        inner: MemoryStore,
        puts: AtomicUsize,
        fail_after: usize,
    }

    #[async_trait]
    impl SecretStore for FlakyStore {
        fn name(&self) -> &str {
            "flaky"
        }

        async fn put(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<()> {
            if self.puts.fetch_add(1, Ordering::SeqCst) >= self.fail_after {
                return Err(Error::Io(std::io::Error::other("disk on fire")));
            }
            self.inner.put(key, value, ttl).await
        }

        async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
            self.inner.get(key).await
        }

        async fn delete(&self, key: &str) -> Result<()> {
            self.inner.delete(key).await
        }
    }

    #[tokio::test]
    async fn test_partial_seal_failure_cleans_up() {
        let store = Arc::new(FlakyStore {
            inner: MemoryStore::new(),
            puts: AtomicUsize::new(0),
            fail_after: 1,
        });
        let vault = Vault::new(
            store.clone(),
            VaultOptions::with_layout(HandleLayout::Split),
        );

        let result = vault.seal("hello world", TTL).await;

        assert!(matches!(result, Err(Error::StoreUnavailable(_))));
        // The ciphertext record written before the key-put failure is gone
        assert!(store.inner.is_empty().await);
    }

    /// A store whose operations never complete.
    struct HangingStore;

    #[async_trait]
    impl SecretStore for HangingStore {
        fn name(&self) -> &str {
            "hanging"
        }

        async fn put(&self, _key: &str, _value: Vec<u8>, _ttl: Duration) -> Result<()> {
            std::future::pending().await
        }

        async fn get(&self, _key: &str) -> Result<Option<Vec<u8>>> {
            std::future::pending().await
        }

        async fn delete(&self, _key: &str) -> Result<()> {
            std::future::pending().await
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_store_timeout_surfaces_as_unavailable() {
        let vault = Vault::new(
            Arc::new(HangingStore),
            VaultOptions {
                layout: HandleLayout::Split,
                store_timeout: Duration::from_millis(100),
            },
        );

        assert!(matches!(
            vault.seal("hello world", TTL).await,
            Err(Error::StoreUnavailable(_))
        ));

        let handle = Handle::split("A".repeat(SECRET_ID_LEN), "B".repeat(KEY_TOKEN_LEN));
        assert!(matches!(
            vault.reveal(&handle).await,
            Err(Error::StoreUnavailable(_))
        ));
    }
}

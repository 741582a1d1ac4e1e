//! Per-identifier mutual exclusion.
//!
//! The store offers no atomic get-and-delete, so two concurrent reveals
//! of one handle could both fetch the record before either deletes it.
//! Serializing the whole fetch-decrypt-delete window per identifier
//! restores at-most-once within this process.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex as StdMutex;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Map of short-lived async locks keyed by identifier.
///
/// Entries are created on demand and pruned once no task holds or waits
/// on them, so the map stays bounded by the number of in-flight reveals.
#[derive(Default)]
pub struct KeyedLocks {
    // Guarded by a std mutex: only held to clone an Arc, never across await
    inner: StdMutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl KeyedLocks {
    /// Create an empty lock map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the lock for `key`, waiting if another task holds it.
    pub async fn lock(&self, key: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut map = self.inner.lock().expect("lock map poisoned");
            // An entry with no guard and no waiter is only referenced here
            map.retain(|_, lock| Arc::strong_count(lock) > 1);
            Arc::clone(
                map.entry(key.to_string())
                    .or_insert_with(|| Arc::new(Mutex::new(()))),
            )
        };
        lock.lock_owned().await
    }

    /// Number of tracked identifiers (live plus not-yet-pruned).
    #[cfg(test)]
    fn tracked(&self) -> usize {
        self.inner.lock().expect("lock map poisoned").len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_same_key_serializes() {
        let locks = Arc::new(KeyedLocks::new());
        let in_section = Arc::new(AtomicUsize::new(0));
        let max_seen = Arc::new(AtomicUsize::new(0));

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let locks = locks.clone();
                let in_section = in_section.clone();
                let max_seen = max_seen.clone();
                tokio::spawn(async move {
                    let _guard = locks.lock("same").await;
                    let now = in_section.fetch_add(1, Ordering::SeqCst) + 1;
                    max_seen.fetch_max(now, Ordering::SeqCst);
                    tokio::task::yield_now().await;
                    in_section.fetch_sub(1, Ordering::SeqCst);
                })
            })
            .collect();

        for task in tasks {
            task.await.unwrap();
        }

        assert_eq!(max_seen.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_different_keys_do_not_block() {
        let locks = KeyedLocks::new();

        let _a = locks.lock("a").await;
        // Must not deadlock on an unrelated key while "a" is held
        let _b = tokio::time::timeout(Duration::from_secs(1), locks.lock("b"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_idle_entries_are_pruned() {
        let locks = KeyedLocks::new();

        drop(locks.lock("a").await);
        drop(locks.lock("b").await);
        assert!(locks.tracked() <= 2);

        // The next acquisition sweeps out both idle entries
        let _c = locks.lock("c").await;
        assert_eq!(locks.tracked(), 1);
    }
}

//! Per-document write serialization.
//!
//! Every mutating operation on a `(tenant, name)` key holds that key's
//! exclusive lock for its whole duration. Reads never take it. The table only
//! keeps weak references, so a key that nobody holds costs nothing once the
//! table is next pruned.

use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::trace;

use crate::error::{BackendError, StoreResult};

use super::backend::DocumentKey;

const MIN_PRUNE_THRESHOLD: usize = 64;

#[derive(Debug)]
struct LockTable {
    entries: HashMap<DocumentKey, Weak<AsyncMutex<()>>>,
    prune_at: usize,
}

/// Table of per-key async locks.
#[derive(Debug)]
pub struct KeyLocks {
    table: Mutex<LockTable>,
    timeout: Duration,
}

/// Exclusive hold on one document key. Released on drop.
#[derive(Debug)]
pub struct KeyGuard {
    key: DocumentKey,
    _guard: OwnedMutexGuard<()>,
}

impl KeyGuard {
    /// Returns the locked key.
    pub fn key(&self) -> &DocumentKey {
        &self.key
    }
}

impl KeyLocks {
    /// Creates a lock table whose waiters give up after `timeout`.
    pub fn new(timeout: Duration) -> Self {
        Self {
            table: Mutex::new(LockTable {
                entries: HashMap::new(),
                prune_at: MIN_PRUNE_THRESHOLD,
            }),
            timeout,
        }
    }

    /// Returns the configured wait bound.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Acquires the exclusive lock for `key`.
    ///
    /// # Errors
    ///
    /// * `StoreError::Backend(LockTimeout)` - if the lock is not obtained in time
    pub async fn lock(&self, key: &DocumentKey) -> StoreResult<KeyGuard> {
        let mutex = self.entry(key);
        match tokio::time::timeout(self.timeout, mutex.lock_owned()).await {
            Ok(guard) => {
                trace!(key = %key, "Acquired document lock");
                Ok(KeyGuard {
                    key: key.clone(),
                    _guard: guard,
                })
            }
            Err(_) => Err(BackendError::LockTimeout {
                key: key.to_string(),
                timeout_ms: self.timeout.as_millis() as u64,
            }
            .into()),
        }
    }

    /// Returns the number of keys that are currently locked or awaited.
    pub fn active(&self) -> usize {
        self.table
            .lock()
            .entries
            .values()
            .filter(|w| w.strong_count() > 0)
            .count()
    }

    fn entry(&self, key: &DocumentKey) -> Arc<AsyncMutex<()>> {
        let mut table = self.table.lock();
        if let Some(existing) = table.entries.get(key).and_then(Weak::upgrade) {
            return existing;
        }

        if table.entries.len() >= table.prune_at {
            table.entries.retain(|_, w| w.strong_count() > 0);
            table.prune_at = (table.entries.len() * 2).max(MIN_PRUNE_THRESHOLD);
        }

        let mutex = Arc::new(AsyncMutex::new(()));
        table.entries.insert(key.clone(), Arc::downgrade(&mutex));
        mutex
    }
}

impl Default for KeyLocks {
    fn default() -> Self {
        Self::new(Duration::from_millis(crate::config::default_lock_timeout_ms()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::Identity;

    fn key(name: &str) -> DocumentKey {
        DocumentKey::new(Identity::new("t"), name).unwrap()
    }

    #[tokio::test]
    async fn test_lock_released_on_drop() {
        let locks = KeyLocks::new(Duration::from_millis(50));
        let guard = locks.lock(&key("a")).await.unwrap();
        assert_eq!(guard.key().name(), "a");
        assert_eq!(locks.active(), 1);
        drop(guard);
        assert_eq!(locks.active(), 0);
        assert!(locks.lock(&key("a")).await.is_ok());
    }

    #[tokio::test]
    async fn test_second_locker_times_out() {
        let locks = KeyLocks::new(Duration::from_millis(20));
        let _held = locks.lock(&key("a")).await.unwrap();
        let err = locks.lock(&key("a")).await.unwrap_err();
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_distinct_keys_do_not_block() {
        let locks = KeyLocks::new(Duration::from_millis(20));
        let _a = locks.lock(&key("a")).await.unwrap();
        let _b = locks.lock(&key("b")).await.unwrap();
        assert_eq!(locks.active(), 2);
    }

    #[tokio::test]
    async fn test_table_pruned() {
        let locks = KeyLocks::new(Duration::from_millis(20));
        for i in 0..(MIN_PRUNE_THRESHOLD * 3) {
            let _g = locks.lock(&key(&format!("doc-{i}"))).await.unwrap();
        }
        assert!(locks.table.lock().entries.len() <= MIN_PRUNE_THRESHOLD * 2);
    }

    #[tokio::test]
    async fn test_waiter_gets_lock_after_release() {
        let locks = Arc::new(KeyLocks::new(Duration::from_secs(5)));
        let held = locks.lock(&key("a")).await.unwrap();

        let waiter = {
            let locks = locks.clone();
            tokio::spawn(async move { locks.lock(&key("a")).await.map(|_| ()) })
        };

        tokio::task::yield_now().await;
        drop(held);
        assert!(waiter.await.unwrap().is_ok());
    }
}

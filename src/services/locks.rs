//! Per-key async mutual exclusion
//!
//! Each key maps to its own `tokio::sync::Mutex`; entries are created on
//! first use and pruned when the last guard or waiter for a key goes away.

use std::{
    collections::HashMap,
    hash::Hash,
    sync::{Arc, Mutex as StdMutex, PoisonError},
};

use tokio::sync::{Mutex, OwnedMutexGuard};

type LockTable<K> = Arc<StdMutex<HashMap<K, Arc<Mutex<()>>>>>;

pub struct KeyedLocks<K> {
    table: LockTable<K>,
}

impl<K> Clone for KeyedLocks<K> {
    fn clone(&self) -> Self {
        Self {
            table: self.table.clone(),
        }
    }
}

impl<K> Default for KeyedLocks<K> {
    fn default() -> Self {
        Self {
            table: Arc::new(StdMutex::new(HashMap::new())),
        }
    }
}

impl<K: Eq + Hash + Clone> KeyedLocks<K> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `key`; released when the guard drops
    pub async fn lock(&self, key: K) -> KeyedGuard<K> {
        let entry = {
            let mut table = self.table.lock().unwrap_or_else(PoisonError::into_inner);
            table.entry(key.clone()).or_default().clone()
        };

        let guard = entry.lock_owned().await;

        KeyedGuard {
            key,
            guard: Some(guard),
            table: self.table.clone(),
        }
    }

    /// Number of keys currently tracked
    pub fn len(&self) -> usize {
        self.table.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub struct KeyedGuard<K: Eq + Hash> {
    key: K,
    guard: Option<OwnedMutexGuard<()>>,
    table: LockTable<K>,
}

impl<K: Eq + Hash> Drop for KeyedGuard<K> {
    fn drop(&mut self) {
        // Release the mutex (and our Arc) before deciding whether to prune
        self.guard.take();

        let mut table = self.table.lock().unwrap_or_else(PoisonError::into_inner);
        let unused = table
            .get(&self.key)
            .map(|entry| Arc::strong_count(entry) == 1)
            .unwrap_or(false);
        if unused {
            table.remove(&self.key);
        }
    }
}

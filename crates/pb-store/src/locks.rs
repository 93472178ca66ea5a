//! Per-key async mutexes.
//!
//! Each mutating store operation holds the locks for the entities it touches
//! for the whole gateway-call-then-mirror-mutate sequence. Entries are
//! removed from the map once the last holder or waiter is gone.
//!
//! Acquisition order is always pin, then board id, then board name.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

type LockMap = DashMap<String, Arc<Mutex<()>>>;

#[derive(Debug, Default, Clone)]
pub struct KeyedLocks {
    inner: Arc<LockMap>,
}

/// Releases the key on drop.
#[derive(Debug)]
pub struct KeyGuard {
    guard: Option<OwnedMutexGuard<()>>,
    key: String,
    map: Arc<LockMap>,
}

impl KeyedLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits until no other task holds `key`.
    pub async fn lock(&self, key: impl Into<String>) -> KeyGuard {
        let key = key.into();
        let mutex = self.inner.entry(key.clone()).or_default().value().clone();
        let guard = mutex.lock_owned().await;
        KeyGuard {
            guard: Some(guard),
            key,
            map: Arc::clone(&self.inner),
        }
    }

    /// Number of keys currently held or awaited.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl Drop for KeyGuard {
    fn drop(&mut self) {
        drop(self.guard.take());
        self.map
            .remove_if(&self.key, |_, mutex| Arc::strong_count(mutex) == 1);
    }
}

pub fn pin_key(pin_id: &str) -> String {
    format!("pin:{pin_id}")
}

pub fn board_key(board_id: &str) -> String {
    format!("board:{board_id}")
}

/// Board names are compared trimmed and case-folded.
pub fn board_name_key(name: &str) -> String {
    format!("board-name:{}", name.trim().to_lowercase())
}

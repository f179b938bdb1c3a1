//! Per-key async locks.
//!
//! Each key gets a FIFO `tokio::sync::Mutex`. Slots are handed out and
//! released under one short std mutex, so a slot is dropped from the table
//! only when nobody holds or waits on it.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::Mutex as AsyncMutex;

pub(crate) type Slot = Arc<AsyncMutex<()>>;

pub(crate) struct KeyedLocks<K> {
    slots: Mutex<HashMap<K, Slot>>,
}

impl<K> KeyedLocks<K>
where
    K: Eq + Hash + Clone,
{
    pub(crate) fn new() -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
        }
    }

    fn table(&self) -> MutexGuard<'_, HashMap<K, Slot>> {
        self.slots.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// The lock for `key`, created on first use.
    pub(crate) fn slot(&self, key: &K) -> Slot {
        self.table().entry(key.clone()).or_default().clone()
    }

    /// Forget the slot for `key` once no holder or waiter references it.
    ///
    /// Callers must have dropped their own `Slot` and guard first.
    pub(crate) fn release(&self, key: &K) {
        let mut table = self.table();
        if table.get(key).is_some_and(|slot| Arc::strong_count(slot) == 1) {
            table.remove(key);
        }
    }

    /// Whether an operation currently holds the lock for `key`.
    pub(crate) fn is_busy(&self, key: &K) -> bool {
        self.table()
            .get(key)
            .is_some_and(|slot| slot.try_lock().is_err())
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.table().len()
    }
}

//! # Per-Key Write Locks
//!
//! In-process mutual exclusion for read-validate-write sequences.
//!
//! ## Why Locks On Top Of Transactions?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Sale A (p1 × 2)                    Sale B (p1 × 2)        stock p1 = 3 │
//! │  ──────────────                     ──────────────                      │
//! │  read stock = 3, ok                                                     │
//! │                                     read stock = 3, ok                  │
//! │  write OUT 2 → 1                                                        │
//! │                                     write OUT 2 → ✗ negative            │
//! │                                                                         │
//! │  With the lock table, B waits on "product:p1" until A commits and then │
//! │  validates against stock = 1, failing cleanly with InsufficientStock.  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Ordering
//! Keys within one `acquire` call are taken in sorted order. The sale
//! manager takes the sale key first, in its own call, and then every product
//! and customer key in a second call; nothing ever waits for a sale key while
//! holding a product or customer key, so there is no cycle.

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::{Arc, Mutex as StdMutex};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::trace;

/// A lockable entity.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LockKey {
    Sale(String),
    Product(String),
    Customer(String),
}

impl fmt::Display for LockKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LockKey::Sale(id) => write!(f, "sale:{}", id),
            LockKey::Product(id) => write!(f, "product:{}", id),
            LockKey::Customer(id) => write!(f, "customer:{}", id),
        }
    }
}

/// Table of async mutexes, one per key currently in use.
///
/// Entries are created on demand and dropped once no guard or waiter
/// references them.
#[derive(Debug, Default)]
pub struct LockTable {
    slots: StdMutex<HashMap<LockKey, Arc<Mutex<()>>>>,
}

impl LockTable {
    pub fn new() -> Self {
        LockTable::default()
    }

    /// Locks every key, in sorted order, and returns a guard holding them all.
    pub async fn acquire(
        self: &Arc<Self>,
        keys: impl IntoIterator<Item = LockKey>,
    ) -> LockGuard {
        let keys: BTreeSet<LockKey> = keys.into_iter().collect();
        let mut guards = Vec::with_capacity(keys.len());

        for key in keys {
            let slot = {
                let mut slots = self.slots.lock().unwrap_or_else(|p| p.into_inner());
                slots.entry(key.clone()).or_default().clone()
            };
            trace!(key = %key, "Acquiring lock");
            guards.push(slot.lock_owned().await);
        }

        LockGuard {
            table: Arc::clone(self),
            guards,
        }
    }

    /// Number of keys with a live mutex (held or awaited).
    pub fn active_keys(&self) -> usize {
        self.slots.lock().unwrap_or_else(|p| p.into_inner()).len()
    }
}

/// Holds a set of keys until dropped.
pub struct LockGuard {
    table: Arc<LockTable>,
    guards: Vec<OwnedMutexGuard<()>>,
}

impl fmt::Debug for LockGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LockGuard")
            .field("held", &self.guards.len())
            .finish()
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        self.guards.clear();
        let mut slots = self.table.slots.lock().unwrap_or_else(|p| p.into_inner());
        // Only the table's own Arc left: nobody holds or waits on the key
        slots.retain(|_, slot| Arc::strong_count(slot) > 1);
    }
}

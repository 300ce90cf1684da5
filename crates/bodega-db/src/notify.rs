//! # Change Notification
//!
//! The seam between local commits and replication.
//!
//! ```text
//! SaleManager / Ledger                       bodega-sync
//! ────────────────────                       ───────────
//! tx.commit() ──► ChangeSet ──► notifier.record_changed(kind, id)
//!                                     │
//!                                     └──► SyncHandle (try_send, never blocks)
//! ```
//!
//! Notification happens strictly after commit. A lost notification is
//! harmless: `needs_sync` is already durable and the next sweep finds the
//! record.

use bodega_core::EntityKind;
use std::fmt::Debug;

/// Receives "this record changed locally" signals after commit.
///
/// Implementations must not block and must not fail the caller.
pub trait ChangeNotifier: Send + Sync + Debug {
    fn record_changed(&self, kind: EntityKind, id: &str);
}

/// Notifier that drops every signal. Used when sync is offline and in tests.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpNotifier;

impl ChangeNotifier for NoOpNotifier {
    fn record_changed(&self, _kind: EntityKind, _id: &str) {}
}

/// Records touched by one unit of work, deduplicated, in touch order.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ChangeSet {
    changes: Vec<(EntityKind, String)>,
}

impl ChangeSet {
    pub fn new() -> Self {
        ChangeSet::default()
    }

    pub fn touch(&mut self, kind: EntityKind, id: impl Into<String>) {
        let id = id.into();
        if !self.changes.iter().any(|(k, i)| *k == kind && *i == id) {
            self.changes.push((kind, id));
        }
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &(EntityKind, String)> {
        self.changes.iter()
    }

    /// Hands every change to the notifier.
    pub fn publish(self, notifier: &dyn ChangeNotifier) {
        for (kind, id) in self.changes {
            notifier.record_changed(kind, &id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_change_set_deduplicates() {
        let mut changes = ChangeSet::new();
        changes.touch(EntityKind::Product, "p1");
        changes.touch(EntityKind::Product, "p1");
        changes.touch(EntityKind::Sale, "p1");
        assert_eq!(changes.len(), 2);
    }
}

//! # Sync Metadata Repository
//!
//! Replication bookkeeping stored on the records themselves.
//!
//! ## Per-Record Sync State
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                  Record-Level Replication                               │
//! │                                                                         │
//! │  LOCAL WRITE (sale create, ledger record, customer delta...)           │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  UPDATE <table> SET ..., needs_sync = 1, sync_version = v + 1          │
//! │       │                                                                 │
//! │       ▼  (committed; survives restarts)                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │            SYNC COORDINATOR (bodega-sync)                       │   │
//! │  │                                                                 │   │
//! │  │  1. pending(kind)  → SELECT id, sync_version WHERE needs_sync   │   │
//! │  │  2. load record, PUT to remote                                  │   │
//! │  │  3a. ok    → mark_synced(kind, id, v)                           │   │
//! │  │              UPDATE ... SET needs_sync = 0                      │   │
//! │  │              WHERE id = ? AND sync_version = v                  │   │
//! │  │  3b. error → mark_failed(kind, id, message)                     │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                                                         │
//! │  KEY GUARANTEES:                                                       │
//! │  • Nothing to enqueue: the flag is written with the data               │
//! │  • A write that lands mid-push bumps the version, so 3a matches no     │
//! │    row and the record stays pending for the next sweep                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Table names come from [`EntityKind::table`], a fixed set of constants.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;
use bodega_core::{EntityKind, SyncMeta};

/// A record waiting to be pushed.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct PendingRecord {
    pub id: String,
    pub sync_version: i64,
    pub last_sync_error: Option<String>,
}

/// Pending / failed counts for one entity kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncStatus {
    pub kind: EntityKind,
    pub pending: i64,
    pub failed: i64,
}

/// Repository for replication bookkeeping.
#[derive(Debug, Clone)]
pub struct SyncMetaRepository {
    pool: SqlitePool,
}

impl SyncMetaRepository {
    /// Creates a new SyncMetaRepository.
    pub fn new(pool: SqlitePool) -> Self {
        SyncMetaRepository { pool }
    }

    /// Next page of records with `needs_sync = 1`, ordered by id.
    ///
    /// ## Arguments
    /// * `after_id` - Keyset cursor; the last id of the previous page
    /// * `limit` - Page size
    pub async fn pending(
        &self,
        kind: EntityKind,
        after_id: Option<&str>,
        limit: i64,
    ) -> DbResult<Vec<PendingRecord>> {
        let sql = format!(
            "SELECT id, sync_version, last_sync_error FROM {}
             WHERE needs_sync = 1 AND id > ? ORDER BY id LIMIT ?",
            kind.table()
        );

        let records = sqlx::query_as::<_, PendingRecord>(&sql)
            .bind(after_id.unwrap_or(""))
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        debug!(kind = %kind, count = records.len(), "Loaded pending records");
        Ok(records)
    }

    /// Replication metadata of one record.
    pub async fn get(&self, kind: EntityKind, id: &str) -> DbResult<Option<SyncMeta>> {
        let sql = format!(
            "SELECT needs_sync, last_sync_error, last_synced_at, sync_version
             FROM {} WHERE id = ?",
            kind.table()
        );

        let meta = sqlx::query_as::<_, SyncMeta>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(meta)
    }

    /// Clears `needs_sync` if the record is still at `pushed_version`.
    ///
    /// ## Returns
    /// * `true` - The record is now Synced
    /// * `false` - A newer local write exists (or the record is gone);
    ///   it stays pending
    pub async fn mark_synced(
        &self,
        kind: EntityKind,
        id: &str,
        pushed_version: i64,
        at: DateTime<Utc>,
    ) -> DbResult<bool> {
        let sql = format!(
            "UPDATE {} SET needs_sync = 0, last_sync_error = NULL, last_synced_at = ?
             WHERE id = ? AND sync_version = ?",
            kind.table()
        );

        let result = sqlx::query(&sql)
            .bind(at)
            .bind(id)
            .bind(pushed_version)
            .execute(&self.pool)
            .await?;

        let cleared = result.rows_affected() > 0;
        debug!(kind = %kind, id = %id, version = pushed_version, cleared, "Marked synced");
        Ok(cleared)
    }

    /// Records a failed push. The record stays pending.
    pub async fn mark_failed(&self, kind: EntityKind, id: &str, error: &str) -> DbResult<()> {
        let sql = format!(
            "UPDATE {} SET needs_sync = 1, last_sync_error = ? WHERE id = ?",
            kind.table()
        );

        sqlx::query(&sql)
            .bind(error)
            .bind(id)
            .execute(&self.pool)
            .await?;

        debug!(kind = %kind, id = %id, error = %error, "Marked sync failed");
        Ok(())
    }

    /// Pending and failed counts for one kind.
    pub async fn status(&self, kind: EntityKind) -> DbResult<SyncStatus> {
        let sql = format!(
            "SELECT
                COALESCE(SUM(CASE WHEN needs_sync = 1 THEN 1 ELSE 0 END), 0),
                COALESCE(SUM(CASE WHEN needs_sync = 1 AND last_sync_error IS NOT NULL
                             THEN 1 ELSE 0 END), 0)
             FROM {}",
            kind.table()
        );

        let (pending, failed): (i64, i64) = sqlx::query_as(&sql).fetch_one(&self.pool).await?;

        Ok(SyncStatus {
            kind,
            pending,
            failed,
        })
    }

    /// Status of every kind, in sweep order.
    pub async fn status_all(&self) -> DbResult<Vec<SyncStatus>> {
        let mut all = Vec::with_capacity(EntityKind::ALL.len());
        for kind in EntityKind::ALL {
            all.push(self.status(kind).await?);
        }
        Ok(all)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{customer, test_db};

    #[tokio::test]
    async fn test_version_guard() {
        let db = test_db().await;
        let ana = customer(&db, "Ana").await;
        let sync = db.sync_meta();

        let pending = sync.pending(EntityKind::Customer, None, 10).await.unwrap();
        assert_eq!(pending.len(), 1);
        let pushed_version = pending[0].sync_version;

        // A local write lands while the push is in flight
        db.customers().apply_delta(&ana.id, 100, None).await.unwrap();

        let cleared = sync
            .mark_synced(EntityKind::Customer, &ana.id, pushed_version, Utc::now())
            .await
            .unwrap();
        assert!(!cleared);
        let meta = sync.get(EntityKind::Customer, &ana.id).await.unwrap().unwrap();
        assert!(meta.needs_sync);

        let cleared = sync
            .mark_synced(EntityKind::Customer, &ana.id, meta.sync_version, Utc::now())
            .await
            .unwrap();
        assert!(cleared);
        let meta = sync.get(EntityKind::Customer, &ana.id).await.unwrap().unwrap();
        assert!(!meta.needs_sync);
        assert!(meta.last_synced_at.is_some());
    }

    #[tokio::test]
    async fn test_failed_push_is_counted() {
        let db = test_db().await;
        let ana = customer(&db, "Ana").await;
        customer(&db, "Bea").await;
        let sync = db.sync_meta();

        sync.mark_failed(EntityKind::Customer, &ana.id, "timeout")
            .await
            .unwrap();

        let status = sync.status(EntityKind::Customer).await.unwrap();
        assert_eq!(status.pending, 2);
        assert_eq!(status.failed, 1);

        let meta = sync.get(EntityKind::Customer, &ana.id).await.unwrap().unwrap();
        assert_eq!(
            meta.state(),
            bodega_core::SyncState::SyncFailed {
                error: "timeout".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_pending_pages_by_cursor() {
        let db = test_db().await;
        for name in ["A", "B", "C"] {
            customer(&db, name).await;
        }
        let sync = db.sync_meta();

        let first = sync.pending(EntityKind::Customer, None, 2).await.unwrap();
        assert_eq!(first.len(), 2);
        let rest = sync
            .pending(EntityKind::Customer, Some(&first[1].id), 2)
            .await
            .unwrap();
        assert_eq!(rest.len(), 1);
        assert!(rest[0].id > first[1].id);
    }
}

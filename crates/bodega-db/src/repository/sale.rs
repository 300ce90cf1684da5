//! # Sale Repository
//!
//! Sale rows and their items.
//!
//! ## Storage Layout
//! ```text
//! sales                                 sale_items
//! ┌──────────────────────────┐          ┌─────────────────────────────────┐
//! │ id, customer_id          │ 1      N │ sale_id, position               │
//! │ total_cents, date        │─────────►│ product_id, product_name        │
//! │ payment_method, status   │          │ quantity, unit_price_cents      │
//! │ canceled_at/_reason      │          └─────────────────────────────────┘
//! │ notes, sync columns      │          ON DELETE CASCADE
//! └──────────────────────────┘
//! ```
//!
//! The write methods here only persist rows. Stock and customer effects are
//! applied by [`SaleManager`](crate::SaleManager) in the same transaction.

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, warn};

use crate::error::DbResult;
use bodega_core::{Sale, SaleItem};

macro_rules! sale_columns {
    () => {
        "id, customer_id, total_cents, date, payment_method, status, canceled_at, \
         canceled_reason, notes, created_at, updated_at, needs_sync, last_sync_error, \
         last_synced_at, sync_version"
    };
}

/// Repository for sale database operations.
#[derive(Debug, Clone)]
pub struct SaleRepository {
    pool: SqlitePool,
}

impl SaleRepository {
    /// Creates a new SaleRepository.
    pub fn new(pool: SqlitePool) -> Self {
        SaleRepository { pool }
    }

    /// Gets a sale with its items.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Sale>> {
        let sale = sqlx::query_as::<_, Sale>(concat!(
            "SELECT ",
            sale_columns!(),
            " FROM sales WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        match sale {
            Some(mut sale) => {
                sale.items = self.get_items(&sale.id).await?;
                Ok(Some(sale))
            }
            None => Ok(None),
        }
    }

    /// Items of a sale in line order.
    pub async fn get_items(&self, sale_id: &str) -> DbResult<Vec<SaleItem>> {
        let items = sqlx::query_as::<_, SaleItem>(
            "SELECT product_id, product_name, quantity, unit_price_cents
             FROM sale_items WHERE sale_id = ? ORDER BY position",
        )
        .bind(sale_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }

    /// Most recent sales first, with items.
    pub async fn list_recent(&self, limit: i64) -> DbResult<Vec<Sale>> {
        let sales = sqlx::query_as::<_, Sale>(concat!(
            "SELECT ",
            sale_columns!(),
            " FROM sales ORDER BY date DESC, created_at DESC LIMIT ?"
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        self.with_items(sales).await
    }

    /// Sales of one customer, most recent first.
    pub async fn list_for_customer(&self, customer_id: &str) -> DbResult<Vec<Sale>> {
        let sales = sqlx::query_as::<_, Sale>(concat!(
            "SELECT ",
            sale_columns!(),
            " FROM sales WHERE customer_id = ? ORDER BY date DESC"
        ))
        .bind(customer_id)
        .fetch_all(&self.pool)
        .await?;

        self.with_items(sales).await
    }

    async fn with_items(&self, mut sales: Vec<Sale>) -> DbResult<Vec<Sale>> {
        for sale in &mut sales {
            sale.items = self.get_items(&sale.id).await?;
        }
        Ok(sales)
    }

    /// Removes a sale and its items without touching stock or customers.
    ///
    /// Administrative escape hatch for local data repair. The deletion is
    /// not replicated and the ledger keeps the movements that referenced
    /// the sale.
    ///
    /// ## Returns
    /// `true` if a sale was deleted.
    pub async fn delete_local(&self, id: &str) -> DbResult<bool> {
        let result = sqlx::query("DELETE FROM sales WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        let deleted = result.rows_affected() > 0;
        if deleted {
            warn!(sale_id = %id, "Sale deleted locally; effects not reversed, not synced");
        }
        Ok(deleted)
    }

    // -------------------------------------------------------------------------
    // Transactional writes
    // -------------------------------------------------------------------------

    /// Inserts the sale row and its items.
    pub(crate) async fn insert_in(conn: &mut SqliteConnection, sale: &Sale) -> DbResult<()> {
        sqlx::query(
            "INSERT INTO sales (
                id, customer_id, total_cents, date, payment_method, status,
                canceled_at, canceled_reason, notes, created_at, updated_at,
                needs_sync, sync_version
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 1, ?)",
        )
        .bind(&sale.id)
        .bind(&sale.customer_id)
        .bind(sale.total_cents)
        .bind(sale.date)
        .bind(sale.payment_method)
        .bind(sale.status)
        .bind(sale.canceled_at)
        .bind(&sale.canceled_reason)
        .bind(&sale.notes)
        .bind(sale.created_at)
        .bind(sale.updated_at)
        .bind(sale.sync.sync_version)
        .execute(&mut *conn)
        .await?;

        Self::insert_items_in(conn, &sale.id, &sale.items).await?;

        debug!(sale_id = %sale.id, items = sale.items.len(), "Inserted sale");
        Ok(())
    }

    /// Rewrites the editable fields and replaces the items.
    pub(crate) async fn update_in(conn: &mut SqliteConnection, sale: &Sale) -> DbResult<()> {
        sqlx::query(
            "UPDATE sales SET
                customer_id = ?, total_cents = ?, date = ?, payment_method = ?, notes = ?,
                updated_at = ?, needs_sync = 1, sync_version = sync_version + 1
             WHERE id = ?",
        )
        .bind(&sale.customer_id)
        .bind(sale.total_cents)
        .bind(sale.date)
        .bind(sale.payment_method)
        .bind(&sale.notes)
        .bind(sale.updated_at)
        .bind(&sale.id)
        .execute(&mut *conn)
        .await?;

        sqlx::query("DELETE FROM sale_items WHERE sale_id = ?")
            .bind(&sale.id)
            .execute(&mut *conn)
            .await?;

        Self::insert_items_in(conn, &sale.id, &sale.items).await?;

        debug!(sale_id = %sale.id, items = sale.items.len(), "Updated sale");
        Ok(())
    }

    /// Moves an ACTIVE sale to CANCELED.
    pub(crate) async fn mark_canceled_in(
        conn: &mut SqliteConnection,
        id: &str,
        at: DateTime<Utc>,
        reason: Option<&str>,
    ) -> DbResult<()> {
        sqlx::query(
            "UPDATE sales SET
                status = 'CANCELED', canceled_at = ?, canceled_reason = ?, updated_at = ?,
                needs_sync = 1, sync_version = sync_version + 1
             WHERE id = ? AND status = 'ACTIVE'",
        )
        .bind(at)
        .bind(reason)
        .bind(at)
        .bind(id)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    async fn insert_items_in(
        conn: &mut SqliteConnection,
        sale_id: &str,
        items: &[SaleItem],
    ) -> DbResult<()> {
        for (position, item) in items.iter().enumerate() {
            sqlx::query(
                "INSERT INTO sale_items (
                    sale_id, position, product_id, product_name, quantity, unit_price_cents
                ) VALUES (?, ?, ?, ?, ?, ?)",
            )
            .bind(sale_id)
            .bind(position as i64)
            .bind(&item.product_id)
            .bind(&item.product_name)
            .bind(item.quantity)
            .bind(item.unit_price_cents)
            .execute(&mut *conn)
            .await?;
        }
        Ok(())
    }
}

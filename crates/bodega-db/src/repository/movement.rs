//! # Movement Repository
//!
//! Storage for ledger rows. There is no update or delete here; the table is
//! append-only and SQLite triggers reject anything but replication
//! bookkeeping changes.

use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::DbResult;
use bodega_core::StockMovement;

macro_rules! movement_columns {
    () => {
        "id, product_id, direction, quantity, reason, previous_stock, new_stock, reference_id, \
         unit_cost_cents, notes, recorded_at, needs_sync, last_sync_error, last_synced_at, \
         sync_version"
    };
}

/// Repository for stock movement rows.
#[derive(Debug, Clone)]
pub struct MovementRepository {
    pool: SqlitePool,
}

impl MovementRepository {
    /// Creates a new MovementRepository.
    pub fn new(pool: SqlitePool) -> Self {
        MovementRepository { pool }
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<StockMovement>> {
        let movement = sqlx::query_as::<_, StockMovement>(concat!(
            "SELECT ",
            movement_columns!(),
            " FROM stock_movements WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(movement)
    }

    /// All movements of a product in recording order, newest last.
    pub async fn list_for_product(&self, product_id: &str) -> DbResult<Vec<StockMovement>> {
        let movements = sqlx::query_as::<_, StockMovement>(concat!(
            "SELECT ",
            movement_columns!(),
            " FROM stock_movements WHERE product_id = ? ORDER BY seq"
        ))
        .bind(product_id)
        .fetch_all(&self.pool)
        .await?;

        debug!(product_id = %product_id, count = movements.len(), "Loaded movements");
        Ok(movements)
    }

    /// The most recently recorded movement of a product.
    pub async fn last_for_product(&self, product_id: &str) -> DbResult<Option<StockMovement>> {
        let movement = sqlx::query_as::<_, StockMovement>(concat!(
            "SELECT ",
            movement_columns!(),
            " FROM stock_movements WHERE product_id = ? ORDER BY seq DESC LIMIT 1"
        ))
        .bind(product_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(movement)
    }

    /// Movements recorded on behalf of a sale (sales, returns), in order.
    pub async fn list_for_reference(&self, reference_id: &str) -> DbResult<Vec<StockMovement>> {
        let movements = sqlx::query_as::<_, StockMovement>(concat!(
            "SELECT ",
            movement_columns!(),
            " FROM stock_movements WHERE reference_id = ? ORDER BY seq"
        ))
        .bind(reference_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(movements)
    }

    pub async fn count_for_product(&self, product_id: &str) -> DbResult<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM stock_movements WHERE product_id = ?")
                .bind(product_id)
                .fetch_one(&self.pool)
                .await?;

        Ok(count)
    }

    /// Appends a ledger row inside the ledger's transaction.
    pub(crate) async fn insert_in(
        conn: &mut SqliteConnection,
        movement: &StockMovement,
    ) -> DbResult<()> {
        sqlx::query(
            "INSERT INTO stock_movements (
                id, product_id, direction, quantity, reason, previous_stock, new_stock,
                reference_id, unit_cost_cents, notes, recorded_at, needs_sync, sync_version
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 1, ?)",
        )
        .bind(&movement.id)
        .bind(&movement.product_id)
        .bind(movement.direction)
        .bind(movement.quantity)
        .bind(movement.reason)
        .bind(movement.previous_stock)
        .bind(movement.new_stock)
        .bind(&movement.reference_id)
        .bind(movement.unit_cost_cents)
        .bind(&movement.notes)
        .bind(movement.recorded_at)
        .bind(movement.sync.sync_version)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::error::DbError;
    use crate::testing::{product, test_ledger};

    #[tokio::test]
    async fn test_ledger_rows_cannot_be_rewritten() {
        let (db, ledger) = test_ledger().await;
        let rice = product(&ledger, "Rice", 4).await;
        let first = db.movements().last_for_product(&rice.id).await.unwrap().unwrap();

        let err = sqlx::query("UPDATE stock_movements SET quantity = 99 WHERE id = ?")
            .bind(&first.id)
            .execute(db.pool())
            .await
            .map_err(DbError::from)
            .unwrap_err();
        assert!(matches!(err, DbError::CheckViolation { .. }));

        let err = sqlx::query("DELETE FROM stock_movements WHERE id = ?")
            .bind(&first.id)
            .execute(db.pool())
            .await
            .map_err(DbError::from)
            .unwrap_err();
        assert!(matches!(err, DbError::CheckViolation { .. }));

        // Replication bookkeeping is still writable
        sqlx::query("UPDATE stock_movements SET needs_sync = 0 WHERE id = ?")
            .bind(&first.id)
            .execute(db.pool())
            .await
            .unwrap();
    }
}

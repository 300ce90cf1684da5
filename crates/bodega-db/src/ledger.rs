//! # Ledger Store
//!
//! The append-only stock ledger and the product stock aggregate it drives.
//!
//! ## Recording A Movement
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    One SQLite transaction                               │
//! │                                                                         │
//! │  1. UPDATE products                                                     │
//! │        SET stock_quantity = stock_quantity + delta, needs_sync = 1,    │
//! │            sync_version = sync_version + 1                             │
//! │      WHERE id = ? AND stock_quantity + delta >= 0                      │
//! │      RETURNING stock_quantity, cost_cents                              │
//! │        │                                                                │
//! │        ├── no row → product missing (BusinessRule)                     │
//! │        │            or stock would go negative (NegativeStock)         │
//! │        ▼                                                                │
//! │  2. previous = new − delta                                             │
//! │     previous must equal the last movement's new_stock                  │
//! │        └── mismatch → InvariantViolation (error!, rolled back)         │
//! │        ▼                                                                │
//! │  3. INSERT INTO stock_movements (previous, new, ...)                   │
//! │                                                                         │
//! │  COMMIT ← aggregate and ledger row land together or not at all        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Step 1 is a single guarded statement and the first write of the
//! transaction, so the stock it reads is the stock it writes even with other
//! connections active. Callers never supply previous or new stock.
//!
//! Standalone records hold the product's key in the [`LockTable`] so they
//! serialize with sale operations touching the same product.
//!
//! [`LockTable`]: crate::LockTable

use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::locks::LockKey;
use crate::notify::{ChangeNotifier, ChangeSet};
use crate::pool::Database;
use crate::repository::movement::MovementRepository;
use crate::repository::product::ProductRepository;
use bodega_core::ledger::{check_reason, next_stock, summarize};
use bodega_core::validation::{validate_new_movement, validate_new_product};
use bodega_core::{
    CoreError, EntityKind, MovementReason, MovementSummary, NewMovement, NewProduct, Product,
    StockMovement, SyncMeta,
};

/// Ledger store handle.
#[derive(Debug, Clone)]
pub struct Ledger {
    db: Database,
    notifier: Arc<dyn ChangeNotifier>,
}

impl Ledger {
    pub fn new(db: Database, notifier: Arc<dyn ChangeNotifier>) -> Self {
        Ledger { db, notifier }
    }

    // =========================================================================
    // Writes
    // =========================================================================

    /// Registers a product, recording its opening stock as an INITIAL_STOCK
    /// movement in the same transaction.
    ///
    /// ## Returns
    /// The product as stored, stock included.
    pub async fn register_product(&self, new: NewProduct) -> DbResult<Product> {
        validate_new_product(&new)?;

        let now = Utc::now();
        let product = Product {
            id: Uuid::new_v4().to_string(),
            name: new.name.trim().to_string(),
            sku: new.sku.as_ref().map(|s| s.trim().to_string()),
            price_cents: new.price_cents,
            cost_cents: new.cost_cents,
            stock_quantity: 0,
            minimum_stock: new.minimum_stock,
            is_active: true,
            created_at: now,
            updated_at: now,
            sync: SyncMeta::pending(),
        };

        let mut changes = ChangeSet::new();
        let mut tx = self.db.pool().begin().await?;

        ProductRepository::insert_in(&mut tx, &product).await?;
        changes.touch(EntityKind::Product, &product.id);

        if new.initial_stock > 0 {
            let opening = NewMovement::new(&product.id, MovementReason::InitialStock, new.initial_stock)
                .with_unit_cost(new.cost_cents);
            let movement = Self::record_in(&mut tx, &opening, now).await?;
            changes.touch(EntityKind::StockMovement, &movement.id);
        }

        tx.commit().await?;
        changes.publish(self.notifier.as_ref());

        info!(
            id = %product.id,
            name = %product.name,
            initial_stock = new.initial_stock,
            "Product registered"
        );

        self.db
            .products()
            .get_by_id(&product.id)
            .await?
            .ok_or_else(|| DbError::not_found("Product", &product.id))
    }

    /// Records a manual stock movement (purchase, adjustment, damage...).
    ///
    /// ## Errors
    /// * `Domain(Validation)` - Non-positive quantity, over-long notes
    /// * `Domain(BusinessRule)` - Unknown product, direction contradicts reason
    /// * `Domain(NegativeStock)` - Stock would drop below zero; nothing written
    /// * `InvariantViolation` - Aggregate and ledger disagree (rolled back)
    pub async fn record(&self, movement: NewMovement) -> DbResult<StockMovement> {
        validate_new_movement(&movement)?;
        check_reason(movement.direction, movement.reason)?;

        let _guard = self
            .db
            .locks()
            .acquire([LockKey::Product(movement.product_id.clone())])
            .await;

        let mut tx = self.db.pool().begin().await?;
        let recorded = Self::record_in(&mut tx, &movement, Utc::now()).await?;
        tx.commit().await?;

        let mut changes = ChangeSet::new();
        changes.touch(EntityKind::StockMovement, &recorded.id);
        changes.touch(EntityKind::Product, &recorded.product_id);
        changes.publish(self.notifier.as_ref());

        info!(
            product_id = %recorded.product_id,
            reason = %recorded.reason,
            direction = %recorded.direction,
            quantity = recorded.quantity,
            new_stock = recorded.new_stock,
            "Stock movement recorded"
        );
        Ok(recorded)
    }

    /// Applies one movement inside a caller's transaction.
    ///
    /// The caller holds the product's lock and commits (or drops) the
    /// transaction.
    pub(crate) async fn record_in(
        conn: &mut SqliteConnection,
        movement: &NewMovement,
        now: DateTime<Utc>,
    ) -> DbResult<StockMovement> {
        let delta = movement.direction.signed(movement.quantity);

        let updated: Option<(i64, Option<i64>)> = sqlx::query_as(
            "UPDATE products SET
                stock_quantity = stock_quantity + ?1,
                updated_at = ?2,
                needs_sync = 1, sync_version = sync_version + 1
             WHERE id = ?3 AND stock_quantity + ?1 >= 0
             RETURNING stock_quantity, cost_cents",
        )
        .bind(delta)
        .bind(now)
        .bind(&movement.product_id)
        .fetch_optional(&mut *conn)
        .await?;

        let (new_stock, product_cost) = match updated {
            Some(row) => row,
            None => return Err(Self::rejection(conn, movement).await),
        };
        let previous_stock = new_stock - delta;

        // The aggregate must continue exactly where the ledger left off
        let ledger_stock: Option<i64> = sqlx::query_scalar(
            "SELECT new_stock FROM stock_movements WHERE product_id = ? ORDER BY seq DESC LIMIT 1",
        )
        .bind(&movement.product_id)
        .fetch_optional(&mut *conn)
        .await?;
        let expected_previous = ledger_stock.unwrap_or(0);

        if previous_stock != expected_previous
            || next_stock(&movement.product_id, previous_stock, movement.direction, movement.quantity)?
                != new_stock
        {
            error!(
                product_id = %movement.product_id,
                aggregate = previous_stock,
                ledger = expected_previous,
                "Stock aggregate diverged from ledger"
            );
            return Err(DbError::InvariantViolation(format!(
                "product {} stock {} does not match ledger stock {}",
                movement.product_id, previous_stock, expected_previous
            )));
        }

        let recorded = StockMovement {
            id: Uuid::new_v4().to_string(),
            product_id: movement.product_id.clone(),
            direction: movement.direction,
            quantity: movement.quantity,
            reason: movement.reason,
            previous_stock,
            new_stock,
            reference_id: movement.reference_id.clone(),
            unit_cost_cents: movement.unit_cost_cents.or(product_cost),
            notes: movement.notes.clone(),
            recorded_at: now,
            sync: SyncMeta::pending(),
        };
        MovementRepository::insert_in(conn, &recorded).await?;

        debug!(
            product_id = %recorded.product_id,
            previous_stock,
            new_stock,
            reason = %recorded.reason,
            "Ledger entry written"
        );
        Ok(recorded)
    }

    /// Explains why the guarded stock update matched no row.
    async fn rejection(conn: &mut SqliteConnection, movement: &NewMovement) -> DbError {
        let current: Result<Option<i64>, sqlx::Error> =
            sqlx::query_scalar("SELECT stock_quantity FROM products WHERE id = ?")
                .bind(&movement.product_id)
                .fetch_optional(&mut *conn)
                .await;

        match current {
            Ok(Some(previous_stock)) => {
                debug!(
                    product_id = %movement.product_id,
                    previous_stock,
                    quantity = movement.quantity,
                    "Movement rejected: stock would go negative"
                );
                CoreError::NegativeStock {
                    product_id: movement.product_id.clone(),
                    previous_stock,
                    quantity: movement.quantity,
                }
                .into()
            }
            Ok(None) => DbError::rule(format!("Product {} does not exist", movement.product_id)),
            Err(e) => e.into(),
        }
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Movements of a product, newest last.
    pub async fn movements_for(&self, product_id: &str) -> DbResult<Vec<StockMovement>> {
        self.db.movements().list_for_product(product_id).await
    }

    pub async fn last_movement(&self, product_id: &str) -> DbResult<Option<StockMovement>> {
        self.db.movements().last_for_product(product_id).await
    }

    /// Movements recorded on behalf of a sale.
    pub async fn movements_for_reference(&self, reference_id: &str) -> DbResult<Vec<StockMovement>> {
        self.db.movements().list_for_reference(reference_id).await
    }

    /// Totals over an optional, inclusive time window.
    pub async fn summary(
        &self,
        product_id: &str,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> DbResult<MovementSummary> {
        let movements = self.movements_for(product_id).await?;
        let in_window = movements.iter().filter(|m| {
            from.map_or(true, |from| m.recorded_at >= from) && to.map_or(true, |to| m.recorded_at <= to)
        });
        Ok(summarize(in_window))
    }

    /// Checks that the product's stock equals its last movement's new stock
    /// (zero when it has no movements).
    pub async fn verify_consistency(&self, product_id: &str) -> DbResult<bool> {
        let product = self
            .db
            .products()
            .get_by_id(product_id)
            .await?
            .ok_or_else(|| DbError::not_found("Product", product_id))?;

        let ledger_stock = self
            .last_movement(product_id)
            .await?
            .map_or(0, |m| m.new_stock);

        let consistent = product.stock_quantity == ledger_stock;
        if !consistent {
            warn!(
                product_id = %product_id,
                aggregate = product.stock_quantity,
                ledger = ledger_stock,
                "Ledger inconsistency detected"
            );
        }
        Ok(consistent)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{product, test_ledger, RecordingNotifier};
    use bodega_core::MovementDirection;

    #[tokio::test]
    async fn test_register_product_records_initial_stock() {
        let (db, ledger) = test_ledger().await;
        let rice = product(&ledger, "Rice", 10).await;

        assert_eq!(rice.stock_quantity, 10);
        let history = ledger.movements_for(&rice.id).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].reason, MovementReason::InitialStock);
        assert_eq!(history[0].previous_stock, 0);
        assert_eq!(history[0].new_stock, 10);
        assert!(ledger.verify_consistency(&rice.id).await.unwrap());

        let empty = product(&ledger, "Salt", 0).await;
        assert_eq!(db.movements().count_for_product(&empty.id).await.unwrap(), 0);
        assert!(ledger.verify_consistency(&empty.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_record_chains_previous_and_new_stock() {
        let (db, ledger) = test_ledger().await;
        let rice = product(&ledger, "Rice", 5).await;

        ledger
            .record(NewMovement::new(&rice.id, MovementReason::Purchase, 7))
            .await
            .unwrap();
        ledger
            .record(NewMovement::new(&rice.id, MovementReason::Damaged, 4))
            .await
            .unwrap();

        let history = ledger.movements_for(&rice.id).await.unwrap();
        assert_eq!(history.len(), 3);
        for pair in history.windows(2) {
            assert_eq!(pair[0].new_stock, pair[1].previous_stock);
        }
        for m in &history {
            let expected = m.previous_stock + m.direction.signed(m.quantity);
            assert_eq!(m.new_stock, expected);
        }

        let stored = db.products().get_by_id(&rice.id).await.unwrap().unwrap();
        assert_eq!(stored.stock_quantity, 8);
        assert_eq!(history.last().unwrap().new_stock, 8);
    }

    #[tokio::test]
    async fn test_negative_stock_is_rejected_without_writes() {
        let (db, ledger) = test_ledger().await;
        let rice = product(&ledger, "Rice", 2).await;

        let err = ledger
            .record(NewMovement::new(&rice.id, MovementReason::AdjustmentDecrease, 3))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            DbError::Domain(CoreError::NegativeStock {
                previous_stock: 2,
                quantity: 3,
                ..
            })
        ));
        assert_eq!(db.movements().count_for_product(&rice.id).await.unwrap(), 1);
        let stored = db.products().get_by_id(&rice.id).await.unwrap().unwrap();
        assert_eq!(stored.stock_quantity, 2);
    }

    #[tokio::test]
    async fn test_direction_must_match_reason() {
        let (_db, ledger) = test_ledger().await;
        let rice = product(&ledger, "Rice", 2).await;

        let mut movement = NewMovement::new(&rice.id, MovementReason::Purchase, 1);
        movement.direction = MovementDirection::Out;

        let err = ledger.record(movement).await.unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::BusinessRule { .. })));
    }

    #[tokio::test]
    async fn test_unknown_product_is_a_business_rule() {
        let (_db, ledger) = test_ledger().await;
        let err = ledger
            .record(NewMovement::new("ghost", MovementReason::Purchase, 1))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::BusinessRule { .. })));
    }

    #[tokio::test]
    async fn test_out_of_band_stock_write_is_an_invariant_violation() {
        let (db, ledger) = test_ledger().await;
        let rice = product(&ledger, "Rice", 5).await;

        sqlx::query("UPDATE products SET stock_quantity = 9 WHERE id = ?")
            .bind(&rice.id)
            .execute(db.pool())
            .await
            .unwrap();
        assert!(!ledger.verify_consistency(&rice.id).await.unwrap());

        let err = ledger
            .record(NewMovement::new(&rice.id, MovementReason::Purchase, 1))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::InvariantViolation(_)));

        // Rolled back: neither the aggregate nor the ledger moved
        let stored = db.products().get_by_id(&rice.id).await.unwrap().unwrap();
        assert_eq!(stored.stock_quantity, 9);
        assert_eq!(db.movements().count_for_product(&rice.id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_summary_values_and_window() {
        let (_db, ledger) = test_ledger().await;
        let rice = product(&ledger, "Rice", 10).await; // cost 100 per unit

        ledger
            .record(NewMovement::new(&rice.id, MovementReason::Damaged, 3))
            .await
            .unwrap();
        let before_purchase = Utc::now();
        ledger
            .record(NewMovement::new(&rice.id, MovementReason::Purchase, 5).with_unit_cost(Some(80)))
            .await
            .unwrap();

        let all = ledger.summary(&rice.id, None, None).await.unwrap();
        assert_eq!(all.total_in, 15);
        assert_eq!(all.total_out, 3);
        assert_eq!(all.value_in_cents, 10 * 100 + 5 * 80);
        assert_eq!(all.value_out_cents, 3 * 100);
        assert_eq!(all.count, 3);

        let recent = ledger.summary(&rice.id, Some(before_purchase), None).await.unwrap();
        assert_eq!(recent.count, 1);
        assert_eq!(recent.total_in, 5);

        let nothing = ledger
            .summary(&rice.id, None, Some(before_purchase - chrono::Duration::days(1)))
            .await
            .unwrap();
        assert_eq!(nothing, MovementSummary::default());
    }

    #[tokio::test]
    async fn test_record_notifies_after_commit() {
        let (db, _) = test_ledger().await;
        let notifier = Arc::new(RecordingNotifier::default());
        let ledger = Ledger::new(db.clone(), notifier.clone());

        let rice = product(&ledger, "Rice", 1).await;
        notifier.clear();

        let movement = ledger
            .record(NewMovement::new(&rice.id, MovementReason::ManualAddition, 2))
            .await
            .unwrap();

        let seen = notifier.take();
        assert!(seen.contains(&(EntityKind::StockMovement, movement.id.clone())));
        assert!(seen.contains(&(EntityKind::Product, rice.id.clone())));
    }
}

//! # Sale Transaction Manager
//!
//! Creates, edits and cancels sales, keeping stock, the ledger and customer
//! totals in step with them.
//!
//! ## Lifecycle
//! ```text
//!   create ──► ACTIVE ──cancel──► CANCELED (terminal)
//!               │  ▲
//!               └──┘ update
//! ```
//!
//! ## Update Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  lock sale:id                                                           │
//! │  load sale (unknown / CANCELED → BusinessRule)                          │
//! │  lock product:* (old ∪ new), customer:* (old ∪ new)                     │
//! │                                                                         │
//! │  StockPlan: requested(new) ≤ stock + returned(old)   ← no writes yet   │
//! │                                                                         │
//! │  BEGIN                                                                  │
//! │    reverse old:  IN / RETURN_FROM_CUSTOMER per item, customer −old     │
//! │    rewrite sale row and items                                          │
//! │    apply new:    OUT / SALE per item, customer +new                     │
//! │  COMMIT            (any error drops the tx: nothing happened)          │
//! │                                                                         │
//! │  notify sale, movements, products, customers                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::ledger::Ledger;
use crate::locks::{LockGuard, LockKey};
use crate::notify::{ChangeNotifier, ChangeSet};
use crate::pool::Database;
use crate::repository::customer::CustomerRepository;
use crate::repository::sale::SaleRepository;
use bodega_core::ledger::{price_lines, sale_total, StockPlan};
use bodega_core::validation::validate_sale_draft;
use bodega_core::{
    EntityKind, MovementReason, NewMovement, Product, Sale, SaleDraft, SaleStatus, SyncMeta,
};

/// Sale operations over a shared [`Database`].
#[derive(Debug, Clone)]
pub struct SaleManager {
    db: Database,
    notifier: Arc<dyn ChangeNotifier>,
}

impl SaleManager {
    pub fn new(db: Database, notifier: Arc<dyn ChangeNotifier>) -> Self {
        SaleManager { db, notifier }
    }

    // =========================================================================
    // Reads
    // =========================================================================

    pub async fn get(&self, id: &str) -> DbResult<Option<Sale>> {
        self.db.sales().get_by_id(id).await
    }

    pub async fn list_recent(&self, limit: i64) -> DbResult<Vec<Sale>> {
        self.db.sales().list_recent(limit).await
    }

    pub async fn list_for_customer(&self, customer_id: &str) -> DbResult<Vec<Sale>> {
        self.db.sales().list_for_customer(customer_id).await
    }

    // =========================================================================
    // Create
    // =========================================================================

    /// Records a new ACTIVE sale.
    ///
    /// ## What This Does
    /// 1. Validates the draft
    /// 2. Checks that products and the customer exist and stock covers
    ///    every product's summed quantity
    /// 3. In one transaction: sale row and items, one OUT/SALE movement per
    ///    item, customer total and last purchase date
    /// 4. Notifies sync
    ///
    /// ## Errors
    /// * `Domain(Validation)` - Empty items, bad quantities or prices
    /// * `Domain(BusinessRule)` - Unknown product or customer
    /// * `Domain(InsufficientStock)` - Nothing was written
    pub async fn create(&self, draft: SaleDraft) -> DbResult<Sale> {
        validate_sale_draft(&draft)?;

        let sale_id = Uuid::new_v4().to_string();
        let plan = StockPlan::for_lines(&draft.items);

        let _sale_lock = self.lock_sale(&sale_id).await;
        let _locks = self
            .lock_effects(&plan, [draft.customer_id.as_deref()])
            .await;

        let products = self.load_products(&plan.product_ids()).await?;
        self.require_customer(draft.customer_id.as_deref()).await?;
        plan.check(&products)?;

        let items = price_lines(&draft.items, &products)?;
        let now = Utc::now();
        let sale = Sale {
            id: sale_id,
            customer_id: draft.customer_id,
            total_cents: sale_total(&items)?.cents(),
            items,
            date: draft.date.unwrap_or(now),
            payment_method: draft.payment_method,
            status: SaleStatus::Active,
            canceled_at: None,
            canceled_reason: None,
            notes: draft.notes,
            created_at: now,
            updated_at: now,
            sync: SyncMeta::pending(),
        };

        let mut changes = ChangeSet::new();
        let mut tx = self.db.pool().begin().await?;

        SaleRepository::insert_in(&mut tx, &sale).await?;
        changes.touch(EntityKind::Sale, &sale.id);
        apply_effects(&mut tx, &sale, now, &mut changes).await?;

        tx.commit().await?;
        changes.publish(self.notifier.as_ref());

        info!(
            sale_id = %sale.id,
            items = sale.items.len(),
            total = %sale.total(),
            "Sale created"
        );
        Ok(sale)
    }

    // =========================================================================
    // Update
    // =========================================================================

    /// Replaces an ACTIVE sale's customer, items, payment method and notes.
    /// A `None` date keeps the original date.
    ///
    /// The new items are checked against the stock the reversal would give
    /// back before anything is written; the reversal and the new effects
    /// commit together or not at all.
    pub async fn update(&self, sale_id: &str, draft: SaleDraft) -> DbResult<Sale> {
        validate_sale_draft(&draft)?;

        let _sale_lock = self.lock_sale(sale_id).await;
        let current = self.load_active(sale_id, "edited").await?;

        let plan = StockPlan::for_lines(&draft.items).returning(&current.items);
        let _locks = self
            .lock_effects(
                &plan,
                [current.customer_id.as_deref(), draft.customer_id.as_deref()],
            )
            .await;

        let products = self.load_products(&plan.product_ids()).await?;
        self.require_customer(draft.customer_id.as_deref()).await?;
        plan.check(&products)?;

        let items = price_lines(&draft.items, &products)?;
        let now = Utc::now();
        let updated = Sale {
            customer_id: draft.customer_id,
            total_cents: sale_total(&items)?.cents(),
            items,
            date: draft.date.unwrap_or(current.date),
            payment_method: draft.payment_method,
            notes: draft.notes,
            updated_at: now,
            ..current.clone()
        };

        let mut changes = ChangeSet::new();
        let mut tx = self.db.pool().begin().await?;

        reverse_effects(&mut tx, &current, now, &mut changes).await?;
        SaleRepository::update_in(&mut tx, &updated).await?;
        changes.touch(EntityKind::Sale, &updated.id);
        apply_effects(&mut tx, &updated, now, &mut changes).await?;

        tx.commit().await?;
        changes.publish(self.notifier.as_ref());

        info!(
            sale_id = %sale_id,
            old_total = %current.total(),
            new_total = %updated.total(),
            "Sale updated"
        );
        self.reload(sale_id).await
    }

    // =========================================================================
    // Cancel
    // =========================================================================

    /// Cancels an ACTIVE sale, returning its stock and taking its total off
    /// the customer. Canceling a CANCELED sale returns it unchanged.
    pub async fn cancel(&self, sale_id: &str, reason: Option<&str>) -> DbResult<Sale> {
        let _sale_lock = self.lock_sale(sale_id).await;
        let sale = self
            .db
            .sales()
            .get_by_id(sale_id)
            .await?
            .ok_or_else(|| unknown_sale(sale_id))?;

        if !sale.is_active() {
            debug!(sale_id = %sale_id, "Sale already canceled");
            return Ok(sale);
        }

        let plan = StockPlan::default().returning(&sale.items);
        let _locks = self
            .lock_effects(&plan, [sale.customer_id.as_deref()])
            .await;

        let now = Utc::now();
        let reason = reason.map(str::trim).filter(|r| !r.is_empty());

        let mut changes = ChangeSet::new();
        let mut tx = self.db.pool().begin().await?;

        reverse_effects(&mut tx, &sale, now, &mut changes).await?;
        SaleRepository::mark_canceled_in(&mut tx, sale_id, now, reason).await?;
        changes.touch(EntityKind::Sale, sale_id);

        tx.commit().await?;
        changes.publish(self.notifier.as_ref());

        info!(sale_id = %sale_id, reason = ?reason, "Sale canceled");
        self.reload(sale_id).await
    }

    /// Removes a sale locally without reversing its effects.
    ///
    /// See [`SaleRepository::delete_local`].
    pub async fn delete_local(&self, sale_id: &str) -> DbResult<bool> {
        let _sale_lock = self.lock_sale(sale_id).await;
        self.db.sales().delete_local(sale_id).await
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    async fn lock_sale(&self, sale_id: &str) -> LockGuard {
        self.db
            .locks()
            .acquire([LockKey::Sale(sale_id.to_string())])
            .await
    }

    /// Locks every product in the plan and every given customer.
    async fn lock_effects<'a>(
        &self,
        plan: &StockPlan,
        customers: impl IntoIterator<Item = Option<&'a str>>,
    ) -> LockGuard {
        let keys = plan
            .product_ids()
            .into_iter()
            .map(LockKey::Product)
            .chain(
                customers
                    .into_iter()
                    .flatten()
                    .map(|id| LockKey::Customer(id.to_string())),
            );
        self.db.locks().acquire(keys).await
    }

    async fn load_products(&self, ids: &BTreeSet<String>) -> DbResult<HashMap<String, Product>> {
        let repo = self.db.products();
        let mut products = HashMap::with_capacity(ids.len());
        for id in ids {
            if let Some(product) = repo.get_by_id(id).await? {
                products.insert(id.clone(), product);
            }
        }
        Ok(products)
    }

    async fn require_customer(&self, customer_id: Option<&str>) -> DbResult<()> {
        let Some(customer_id) = customer_id else {
            return Ok(());
        };
        match self.db.customers().get_by_id(customer_id).await? {
            Some(_) => Ok(()),
            None => Err(DbError::rule(format!(
                "Customer {} does not exist",
                customer_id
            ))),
        }
    }

    async fn load_active(&self, sale_id: &str, action: &str) -> DbResult<Sale> {
        let sale = self
            .db
            .sales()
            .get_by_id(sale_id)
            .await?
            .ok_or_else(|| unknown_sale(sale_id))?;

        if !sale.is_active() {
            return Err(DbError::rule(format!(
                "Sale {} is canceled and cannot be {}",
                sale_id, action
            )));
        }
        Ok(sale)
    }

    async fn reload(&self, sale_id: &str) -> DbResult<Sale> {
        self.db
            .sales()
            .get_by_id(sale_id)
            .await?
            .ok_or_else(|| DbError::not_found("Sale", sale_id))
    }
}

fn unknown_sale(sale_id: &str) -> DbError {
    DbError::rule(format!("Sale {} does not exist", sale_id))
}

/// Takes the sale's items out of stock and adds its total to the customer.
async fn apply_effects(
    conn: &mut SqliteConnection,
    sale: &Sale,
    now: DateTime<Utc>,
    changes: &mut ChangeSet,
) -> DbResult<()> {
    for item in &sale.items {
        let movement = NewMovement::new(&item.product_id, MovementReason::Sale, item.quantity)
            .with_reference(&sale.id);
        let recorded = Ledger::record_in(conn, &movement, now).await?;
        changes.touch(EntityKind::StockMovement, &recorded.id);
        changes.touch(EntityKind::Product, &recorded.product_id);
    }

    if let Some(customer_id) = &sale.customer_id {
        let applied =
            CustomerRepository::apply_delta_in(conn, customer_id, sale.total_cents, Some(sale.date))
                .await?;
        if !applied {
            return Err(DbError::rule(format!(
                "Customer {} does not exist",
                customer_id
            )));
        }
        changes.touch(EntityKind::Customer, customer_id);
    }
    Ok(())
}

/// Returns the sale's items to stock and takes its total off the customer.
async fn reverse_effects(
    conn: &mut SqliteConnection,
    sale: &Sale,
    now: DateTime<Utc>,
    changes: &mut ChangeSet,
) -> DbResult<()> {
    for item in &sale.items {
        let movement = NewMovement::new(
            &item.product_id,
            MovementReason::ReturnFromCustomer,
            item.quantity,
        )
        .with_reference(&sale.id);
        let recorded = Ledger::record_in(conn, &movement, now).await?;
        changes.touch(EntityKind::StockMovement, &recorded.id);
        changes.touch(EntityKind::Product, &recorded.product_id);
    }

    if let Some(customer_id) = &sale.customer_id {
        let applied =
            CustomerRepository::apply_delta_in(conn, customer_id, -sale.total_cents, None).await?;
        if applied {
            changes.touch(EntityKind::Customer, customer_id);
        } else {
            warn!(
                sale_id = %sale.id,
                customer_id = %customer_id,
                "Customer missing during reversal; total not adjusted"
            );
        }
    }
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{customer, product, test_ledger, RecordingNotifier};
    use bodega_core::{CoreError, MovementDirection, SaleLine};

    async fn setup() -> (Database, Ledger, SaleManager) {
        let (db, ledger) = test_ledger().await;
        let manager = SaleManager::new(db.clone(), Arc::new(crate::NoOpNotifier));
        (db, ledger, manager)
    }

    async fn stock_of(db: &Database, product_id: &str) -> i64 {
        db.products()
            .get_by_id(product_id)
            .await
            .unwrap()
            .unwrap()
            .stock_quantity
    }

    #[tokio::test]
    async fn test_create_takes_stock_and_credits_customer() {
        let (db, ledger, manager) = setup().await;
        let rice = product(&ledger, "Rice", 10).await;
        let ana = customer(&db, "Ana").await;

        let sale = manager
            .create(
                SaleDraft::new(vec![SaleLine::new(&rice.id, 3), SaleLine::new(&rice.id, 1).at_price(200)])
                    .for_customer(&ana.id),
            )
            .await
            .unwrap();

        assert_eq!(sale.status, SaleStatus::Active);
        assert_eq!(sale.total_cents, 3 * 250 + 200);
        assert_eq!(sale.items[0].product_name, "Rice");
        assert_eq!(stock_of(&db, &rice.id).await, 6);

        let entries = ledger.movements_for_reference(&sale.id).await.unwrap();
        assert_eq!(entries.len(), 2);
        assert!(entries
            .iter()
            .all(|m| m.reason == MovementReason::Sale && m.direction == MovementDirection::Out));
        assert!(ledger.verify_consistency(&rice.id).await.unwrap());

        let ana = db.customers().get_by_id(&ana.id).await.unwrap().unwrap();
        assert_eq!(ana.total_purchases_cents, sale.total_cents);
        assert_eq!(ana.last_purchase_date, Some(sale.date));

        let stored = manager.get(&sale.id).await.unwrap().unwrap();
        assert_eq!(stored.items, sale.items);
    }

    #[tokio::test]
    async fn test_oversell_is_rejected_with_no_writes() {
        let (db, ledger, manager) = setup().await;
        let rice = product(&ledger, "Rice", 5).await;

        // Repeated lines are summed before the check
        let err = manager
            .create(SaleDraft::new(vec![
                SaleLine::new(&rice.id, 3),
                SaleLine::new(&rice.id, 3),
            ]))
            .await
            .unwrap_err();

        match err {
            DbError::Domain(CoreError::InsufficientStock {
                product_id,
                product_name,
                requested,
                available,
            }) => {
                assert_eq!(product_id, rice.id);
                assert_eq!(product_name, "Rice");
                assert_eq!(requested, 6);
                assert_eq!(available, 5);
            }
            other => panic!("unexpected error: {:?}", other),
        }

        assert_eq!(stock_of(&db, &rice.id).await, 5);
        assert_eq!(db.movements().count_for_product(&rice.id).await.unwrap(), 1);
        assert!(manager.list_recent(10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_product_or_customer() {
        let (_db, ledger, manager) = setup().await;
        let rice = product(&ledger, "Rice", 5).await;

        let err = manager
            .create(SaleDraft::new(vec![SaleLine::new("ghost", 1)]))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::BusinessRule { .. })));

        let err = manager
            .create(SaleDraft::new(vec![SaleLine::new(&rice.id, 1)]).for_customer("nobody"))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::BusinessRule { .. })));
    }

    #[tokio::test]
    async fn test_empty_sale_is_a_validation_error() {
        let (_db, _ledger, manager) = setup().await;
        let err = manager.create(SaleDraft::new(vec![])).await.unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::Validation(_))));
    }

    #[tokio::test]
    async fn test_oversized_price_is_rejected_with_no_writes() {
        let (db, ledger, manager) = setup().await;
        let rice = product(&ledger, "Rice", 5).await;

        let err = manager
            .create(SaleDraft::new(vec![
                SaleLine::new(&rice.id, 3).at_price(i64::MAX / 2)
            ]))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::Validation(_))));

        assert_eq!(stock_of(&db, &rice.id).await, 5);
        assert_eq!(db.movements().count_for_product(&rice.id).await.unwrap(), 1);
        assert!(manager.list_recent(10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_create_then_update_end_to_end() {
        let (db, ledger, manager) = setup().await;
        let p1 = product(&ledger, "P1", 5).await;
        let ana = customer(&db, "Ana").await;

        let sale = manager
            .create(SaleDraft::new(vec![SaleLine::new(&p1.id, 2).at_price(100)]).for_customer(&ana.id))
            .await
            .unwrap();
        assert_eq!(stock_of(&db, &p1.id).await, 3);

        let updated = manager
            .update(
                &sale.id,
                SaleDraft::new(vec![SaleLine::new(&p1.id, 4).at_price(100)]).for_customer(&ana.id),
            )
            .await
            .unwrap();

        assert_eq!(stock_of(&db, &p1.id).await, 1);
        assert_eq!(updated.total_cents, 400);
        assert_eq!(updated.date, sale.date);
        assert!(updated.sync.sync_version > sale.sync.sync_version);

        let entries = ledger.movements_for_reference(&sale.id).await.unwrap();
        let reasons: Vec<_> = entries.iter().map(|m| m.reason).collect();
        assert_eq!(
            reasons,
            vec![
                MovementReason::Sale,
                MovementReason::ReturnFromCustomer,
                MovementReason::Sale
            ]
        );
        assert!(ledger.verify_consistency(&p1.id).await.unwrap());

        let ana = db.customers().get_by_id(&ana.id).await.unwrap().unwrap();
        assert_eq!(ana.total_purchases_cents, 400);
    }

    #[tokio::test]
    async fn test_failed_update_leaves_everything_untouched() {
        let (db, ledger, manager) = setup().await;
        let rice = product(&ledger, "Rice", 5).await;
        let ana = customer(&db, "Ana").await;

        let sale = manager
            .create(SaleDraft::new(vec![SaleLine::new(&rice.id, 2)]).for_customer(&ana.id))
            .await
            .unwrap();
        let ledger_len = db.movements().count_for_product(&rice.id).await.unwrap();

        // 3 in stock + 2 given back = 5 available
        let err = manager
            .update(&sale.id, SaleDraft::new(vec![SaleLine::new(&rice.id, 6)]))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DbError::Domain(CoreError::InsufficientStock { available: 5, .. })
        ));

        assert_eq!(stock_of(&db, &rice.id).await, 3);
        assert_eq!(
            db.movements().count_for_product(&rice.id).await.unwrap(),
            ledger_len
        );
        let stored = manager.get(&sale.id).await.unwrap().unwrap();
        assert_eq!(stored.items, sale.items);
        assert_eq!(stored.sync.sync_version, sale.sync.sync_version);
        let ana = db.customers().get_by_id(&ana.id).await.unwrap().unwrap();
        assert_eq!(ana.total_purchases_cents, sale.total_cents);
    }

    #[tokio::test]
    async fn test_update_moves_total_between_customers() {
        let (db, ledger, manager) = setup().await;
        let rice = product(&ledger, "Rice", 5).await;
        let ana = customer(&db, "Ana").await;
        let bea = customer(&db, "Bea").await;

        let sale = manager
            .create(SaleDraft::new(vec![SaleLine::new(&rice.id, 2)]).for_customer(&ana.id))
            .await
            .unwrap();
        manager
            .update(&sale.id, SaleDraft::new(vec![SaleLine::new(&rice.id, 1)]).for_customer(&bea.id))
            .await
            .unwrap();

        let ana = db.customers().get_by_id(&ana.id).await.unwrap().unwrap();
        let bea = db.customers().get_by_id(&bea.id).await.unwrap().unwrap();
        assert_eq!(ana.total_purchases_cents, 0);
        assert_eq!(bea.total_purchases_cents, 250);
        assert_eq!(manager.list_for_customer(&bea.id).await.unwrap().len(), 1);
        assert!(manager.list_for_customer(&ana.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_cancel_reverses_and_is_idempotent() {
        let (db, ledger, manager) = setup().await;
        let rice = product(&ledger, "Rice", 5).await;
        let ana = customer(&db, "Ana").await;

        let sale = manager
            .create(SaleDraft::new(vec![SaleLine::new(&rice.id, 2)]).for_customer(&ana.id))
            .await
            .unwrap();

        let canceled = manager.cancel(&sale.id, Some("wrong order")).await.unwrap();
        assert_eq!(canceled.status, SaleStatus::Canceled);
        assert!(canceled.canceled_at.is_some());
        assert_eq!(canceled.canceled_reason.as_deref(), Some("wrong order"));
        assert_eq!(stock_of(&db, &rice.id).await, 5);
        let stored_ana = db.customers().get_by_id(&ana.id).await.unwrap().unwrap();
        assert_eq!(stored_ana.total_purchases_cents, 0);

        // One sale entry out, one return entry back in, nothing else
        let entries = ledger.movements_for_reference(&sale.id).await.unwrap();
        let shape: Vec<_> = entries
            .iter()
            .map(|m| (m.reason, m.direction, m.quantity, m.previous_stock, m.new_stock))
            .collect();
        assert_eq!(
            shape,
            vec![
                (MovementReason::Sale, MovementDirection::Out, 2, 5, 3),
                (MovementReason::ReturnFromCustomer, MovementDirection::In, 2, 3, 5),
            ]
        );

        let ledger_len = db.movements().count_for_product(&rice.id).await.unwrap();
        let again = manager.cancel(&sale.id, Some("twice")).await.unwrap();
        assert_eq!(again.sync.sync_version, canceled.sync.sync_version);
        assert_eq!(again.canceled_reason.as_deref(), Some("wrong order"));
        assert_eq!(stock_of(&db, &rice.id).await, 5);
        assert_eq!(
            db.movements().count_for_product(&rice.id).await.unwrap(),
            ledger_len
        );
        assert_eq!(
            ledger.movements_for_reference(&sale.id).await.unwrap().len(),
            2
        );
        assert!(ledger.verify_consistency(&rice.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_cancel_floors_customer_total() {
        let (db, ledger, manager) = setup().await;
        let rice = product(&ledger, "Rice", 5).await;
        let ana = customer(&db, "Ana").await;

        let sale = manager
            .create(SaleDraft::new(vec![SaleLine::new(&rice.id, 4)]).for_customer(&ana.id))
            .await
            .unwrap();
        db.customers()
            .apply_delta(&ana.id, -800, None)
            .await
            .unwrap();

        manager.cancel(&sale.id, None).await.unwrap();
        let ana = db.customers().get_by_id(&ana.id).await.unwrap().unwrap();
        assert_eq!(ana.total_purchases_cents, 0);
    }

    #[tokio::test]
    async fn test_canceled_sale_cannot_be_edited() {
        let (_db, ledger, manager) = setup().await;
        let rice = product(&ledger, "Rice", 5).await;

        let sale = manager
            .create(SaleDraft::new(vec![SaleLine::new(&rice.id, 1)]))
            .await
            .unwrap();
        manager.cancel(&sale.id, None).await.unwrap();

        let err = manager
            .update(&sale.id, SaleDraft::new(vec![SaleLine::new(&rice.id, 1)]))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::BusinessRule { .. })));
    }

    #[tokio::test]
    async fn test_unknown_sale_is_a_business_rule() {
        let (_db, ledger, manager) = setup().await;
        let rice = product(&ledger, "Rice", 5).await;

        let err = manager
            .update("ghost", SaleDraft::new(vec![SaleLine::new(&rice.id, 1)]))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::BusinessRule { .. })));

        let err = manager.cancel("ghost", None).await.unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::BusinessRule { .. })));
    }

    #[tokio::test]
    async fn test_concurrent_sales_never_oversell() {
        let (db, ledger, manager) = setup().await;
        let rice = product(&ledger, "Rice", 3).await;

        let a = manager.clone();
        let b = manager.clone();
        let draft = SaleDraft::new(vec![SaleLine::new(&rice.id, 2)]);
        let (first, second) = tokio::join!(a.create(draft.clone()), b.create(draft));

        assert_eq!(first.is_ok() as u8 + second.is_ok() as u8, 1);
        let failure = first.err().or(second.err()).unwrap();
        assert!(matches!(
            failure,
            DbError::Domain(CoreError::InsufficientStock { available: 1, .. })
        ));
        assert_eq!(stock_of(&db, &rice.id).await, 1);
        assert!(ledger.verify_consistency(&rice.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_create_notifies_every_touched_record() {
        let (db, ledger, _) = setup().await;
        let rice = product(&ledger, "Rice", 5).await;
        let ana = customer(&db, "Ana").await;
        let notifier = Arc::new(RecordingNotifier::default());
        let manager = SaleManager::new(db.clone(), notifier.clone());

        let sale = manager
            .create(SaleDraft::new(vec![SaleLine::new(&rice.id, 1)]).for_customer(&ana.id))
            .await
            .unwrap();

        let seen = notifier.take();
        let kinds: BTreeSet<_> = seen.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(kinds.len(), 4);
        assert!(seen.contains(&(EntityKind::Sale, sale.id.clone())));
        assert!(seen.contains(&(EntityKind::Product, rice.id.clone())));
        assert!(seen.contains(&(EntityKind::Customer, ana.id.clone())));
    }

    #[tokio::test]
    async fn test_delete_local_keeps_ledger() {
        let (db, ledger, manager) = setup().await;
        let rice = product(&ledger, "Rice", 5).await;
        let sale = manager
            .create(SaleDraft::new(vec![SaleLine::new(&rice.id, 1)]))
            .await
            .unwrap();

        assert!(manager.delete_local(&sale.id).await.unwrap());
        assert!(manager.get(&sale.id).await.unwrap().is_none());
        assert_eq!(ledger.movements_for_reference(&sale.id).await.unwrap().len(), 1);
        assert_eq!(stock_of(&db, &rice.id).await, 4);
    }
}

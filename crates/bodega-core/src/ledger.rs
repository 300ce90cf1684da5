//! # Ledger Arithmetic
//!
//! Pure stock math shared by the ledger store and the sale manager.
//!
//! ## Stock Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  previous_stock ──► next_stock(direction, quantity) ──► new_stock       │
//! │                           │                                             │
//! │                           └── new_stock < 0 → NegativeStock (rejected)  │
//! │                                                                         │
//! │  Sale create/update planning (before any write):                       │
//! │                                                                         │
//! │    requested[p]  = Σ new line quantities for p                         │
//! │    returned[p]   = Σ old line quantities for p   (update only)         │
//! │    available[p]  = stock[p] + returned[p]                              │
//! │    requested[p] > available[p] → InsufficientStock                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::types::{
    MovementDirection, MovementReason, MovementSummary, Product, SaleItem, SaleLine, StockMovement,
};

// =============================================================================
// Single Movement
// =============================================================================

/// Computes the stock after a movement, refusing to go below zero.
pub fn next_stock(
    product_id: &str,
    previous_stock: i64,
    direction: MovementDirection,
    quantity: i64,
) -> CoreResult<i64> {
    let new_stock = previous_stock + direction.signed(quantity);
    if new_stock < 0 {
        return Err(CoreError::NegativeStock {
            product_id: product_id.to_string(),
            previous_stock,
            quantity,
        });
    }
    Ok(new_stock)
}

/// Rejects a movement whose direction contradicts its reason.
pub fn check_reason(direction: MovementDirection, reason: MovementReason) -> CoreResult<()> {
    if reason.direction() != direction {
        return Err(CoreError::rule(format!(
            "Reason {} moves stock {}, not {}",
            reason,
            reason.direction(),
            direction
        )));
    }
    Ok(())
}

/// Folds movements into totals. Missing unit cost counts as zero value.
pub fn summarize<'a>(movements: impl IntoIterator<Item = &'a StockMovement>) -> MovementSummary {
    movements
        .into_iter()
        .fold(MovementSummary::default(), |mut acc, m| {
            match m.direction {
                MovementDirection::In => {
                    acc.total_in = acc.total_in.saturating_add(m.quantity);
                    acc.value_in_cents = acc.value_in_cents.saturating_add(m.value().cents());
                }
                MovementDirection::Out => {
                    acc.total_out = acc.total_out.saturating_add(m.quantity);
                    acc.value_out_cents = acc.value_out_cents.saturating_add(m.value().cents());
                }
            }
            acc.count += 1;
            acc
        })
}

// =============================================================================
// Sale Planning
// =============================================================================

/// Sum of line totals. The stored sale total is always this value.
///
/// Fails rather than wrapping when the total does not fit in an i64.
pub fn sale_total(items: &[SaleItem]) -> CoreResult<Money> {
    items
        .iter()
        .try_fold(Money::zero(), |total, item| {
            Money::from_cents(item.unit_price_cents)
                .checked_times(item.quantity)
                .and_then(|line| total.checked_add(line))
        })
        .ok_or_else(|| {
            ValidationError::OutOfRange {
                field: "total".to_string(),
                min: 0,
                max: i64::MAX,
            }
            .into()
        })
}

/// Turns requested lines into sale items, snapshotting name and price.
///
/// Every referenced product must be present in `products`.
pub fn price_lines(
    lines: &[SaleLine],
    products: &HashMap<String, Product>,
) -> CoreResult<Vec<SaleItem>> {
    lines
        .iter()
        .map(|line| {
            let product = products.get(&line.product_id).ok_or_else(|| {
                CoreError::rule(format!("Product {} does not exist", line.product_id))
            })?;
            Ok(SaleItem {
                product_id: product.id.clone(),
                product_name: product.name.clone(),
                quantity: line.quantity,
                unit_price_cents: line.unit_price_cents.unwrap_or(product.price_cents),
            })
        })
        .collect()
}

/// Stock check for a sale, run against a snapshot of products before any
/// write happens.
///
/// ## Example
/// ```rust
/// use bodega_core::ledger::StockPlan;
/// use bodega_core::SaleLine;
///
/// let plan = StockPlan::for_lines(&[SaleLine::new("p1", 2), SaleLine::new("p1", 3)]);
/// assert_eq!(plan.requested("p1"), 5);
/// ```
#[derive(Debug, Clone, Default)]
pub struct StockPlan {
    requested: BTreeMap<String, i64>,
    returned: BTreeMap<String, i64>,
}

impl StockPlan {
    /// Plans the stock needed by `lines`, summing repeated products.
    pub fn for_lines(lines: &[SaleLine]) -> Self {
        let mut requested = BTreeMap::new();
        for line in lines {
            *requested.entry(line.product_id.clone()).or_insert(0) += line.quantity;
        }
        StockPlan {
            requested,
            returned: BTreeMap::new(),
        }
    }

    /// Credits the stock that reversing `items` would give back.
    pub fn returning(mut self, items: &[SaleItem]) -> Self {
        for item in items {
            *self.returned.entry(item.product_id.clone()).or_insert(0) += item.quantity;
        }
        self
    }

    pub fn requested(&self, product_id: &str) -> i64 {
        self.requested.get(product_id).copied().unwrap_or(0)
    }

    pub fn returned(&self, product_id: &str) -> i64 {
        self.returned.get(product_id).copied().unwrap_or(0)
    }

    /// Every product touched, requested or returned, sorted.
    pub fn product_ids(&self) -> BTreeSet<String> {
        self.requested
            .keys()
            .chain(self.returned.keys())
            .cloned()
            .collect()
    }

    /// Fails with the first product (in id order) that can't cover its
    /// requested quantity.
    pub fn check(&self, products: &HashMap<String, Product>) -> CoreResult<()> {
        for (product_id, &requested) in &self.requested {
            let product = products.get(product_id).ok_or_else(|| {
                CoreError::rule(format!("Product {} does not exist", product_id))
            })?;
            let available = product.stock_quantity + self.returned(product_id);
            if requested > available {
                return Err(CoreError::InsufficientStock {
                    product_id: product_id.clone(),
                    product_name: product.name.clone(),
                    requested,
                    available,
                });
            }
        }
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

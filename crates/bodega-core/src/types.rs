//! # Domain Types
//!
//! Core records for Bodega's inventory and sales.
//!
//! ## Entity Relationships
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Entity Model                                    │
//! │                                                                         │
//! │  ┌──────────────┐  1:N   ┌─────────────────┐                           │
//! │  │   Product    │───────►│  StockMovement  │  append-only ledger       │
//! │  │ stock_qty    │        │ previous → new  │                           │
//! │  └──────┬───────┘        └────────┬────────┘                           │
//! │         │ snapshot                │ reference_id                       │
//! │         ▼                         ▼                                     │
//! │  ┌──────────────┐  1:N   ┌─────────────────┐        ┌──────────────┐   │
//! │  │   SaleItem   │◄───────│      Sale       │───────►│   Customer   │   │
//! │  │ name, price  │        │ ACTIVE/CANCELED │  0..1  │ running sum  │   │
//! │  └──────────────┘        └─────────────────┘        └──────────────┘   │
//! │                                                                         │
//! │  ┌──────────────┐                                                      │
//! │  │   Expense    │  plain syncable record, no ledger effects           │
//! │  └──────────────┘                                                      │
//! │                                                                         │
//! │  Every record carries SyncMeta (needs_sync, version, last error).      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Serialization
//! Records serialize with camelCase keys. That shape is what the UI layer
//! receives (via the exported TypeScript types) and what the sync
//! coordinator pushes to the remote store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;

use crate::money::Money;

// =============================================================================
// Sync Metadata
// =============================================================================

/// Replication bookkeeping carried by every syncable record.
///
/// ## Version Guard
/// ```text
/// local write        → needs_sync = 1, sync_version = v + 1
/// push reads v + 1   → remote PUT ...
/// another write      → sync_version = v + 2
/// push succeeds      → UPDATE ... WHERE sync_version = v + 1  (0 rows)
///                      record stays pending, next sweep sends v + 2
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct SyncMeta {
    pub needs_sync: bool,
    pub last_sync_error: Option<String>,
    #[ts(as = "Option<String>")]
    pub last_synced_at: Option<DateTime<Utc>>,
    pub sync_version: i64,
}

impl SyncMeta {
    /// Metadata of a record that was just written locally for the first time.
    pub fn pending() -> Self {
        SyncMeta {
            needs_sync: true,
            last_sync_error: None,
            last_synced_at: None,
            sync_version: 1,
        }
    }

    /// Derives the record's replication state.
    pub fn state(&self) -> SyncState {
        SyncState::of(self)
    }
}

impl Default for SyncMeta {
    fn default() -> Self {
        SyncMeta::pending()
    }
}

/// Replication state of a single record.
///
/// ```text
///            local write                  push fails
///  Synced ───────────────► PendingSync ───────────────► SyncFailed
///    ▲                        │   ▲                        │
///    └──── push succeeds ─────┘   └────── local write ─────┘
///    ▲                                                     │
///    └────────────────── sweep push succeeds ──────────────┘
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SyncState {
    Synced,
    PendingSync,
    SyncFailed { error: String },
}

impl SyncState {
    pub fn of(meta: &SyncMeta) -> Self {
        match (&meta.needs_sync, &meta.last_sync_error) {
            (false, _) => SyncState::Synced,
            (true, Some(error)) => SyncState::SyncFailed {
                error: error.clone(),
            },
            (true, None) => SyncState::PendingSync,
        }
    }
}

/// The kinds of records the sync coordinator replicates.
///
/// Each kind maps to one local table and one remote collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Product,
    StockMovement,
    Sale,
    Customer,
    Expense,
}

impl EntityKind {
    /// Every kind, in sweep order.
    pub const ALL: [EntityKind; 5] = [
        EntityKind::Product,
        EntityKind::StockMovement,
        EntityKind::Sale,
        EntityKind::Customer,
        EntityKind::Expense,
    ];

    /// Local SQLite table holding this kind.
    pub const fn table(&self) -> &'static str {
        match self {
            EntityKind::Product => "products",
            EntityKind::StockMovement => "stock_movements",
            EntityKind::Sale => "sales",
            EntityKind::Customer => "customers",
            EntityKind::Expense => "expenses",
        }
    }

    /// Remote collection name.
    pub const fn collection(&self) -> &'static str {
        match self {
            EntityKind::Product => "products",
            EntityKind::StockMovement => "stockMovements",
            EntityKind::Sale => "sales",
            EntityKind::Customer => "customers",
            EntityKind::Expense => "expenses",
        }
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Product => "product",
            EntityKind::StockMovement => "stock_movement",
            EntityKind::Sale => "sale",
            EntityKind::Customer => "customer",
            EntityKind::Expense => "expense",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "product" | "products" => Ok(EntityKind::Product),
            "stock_movement" | "stock_movements" | "movement" | "movements" => {
                Ok(EntityKind::StockMovement)
            }
            "sale" | "sales" => Ok(EntityKind::Sale),
            "customer" | "customers" => Ok(EntityKind::Customer),
            "expense" | "expenses" => Ok(EntityKind::Expense),
            other => Err(format!("unknown entity kind: {}", other)),
        }
    }
}

// =============================================================================
// Product
// =============================================================================

/// A product with its authoritative stock snapshot.
///
/// ## Stock Invariant
/// `stock_quantity` changes only when a [`StockMovement`] is recorded for the
/// product, and always equals the `new_stock` of the latest movement.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    /// Unique identifier (UUID v4)
    pub id: String,

    /// Display name, snapshotted into sale items at sale time
    pub name: String,

    /// Optional stock keeping unit
    pub sku: Option<String>,

    /// Selling price in cents
    pub price_cents: i64,

    /// Purchase cost in cents, used to value movements
    pub cost_cents: Option<i64>,

    /// Current stock, derived from the ledger
    pub stock_quantity: i64,

    /// Low-stock threshold
    pub minimum_stock: i64,

    /// Soft-delete flag
    pub is_active: bool,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,

    #[cfg_attr(feature = "sqlx", sqlx(flatten))]
    #[serde(default)]
    pub sync: SyncMeta,
}

impl Product {
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }

    /// True when stock is at or below the configured minimum.
    pub fn is_below_minimum(&self) -> bool {
        self.stock_quantity <= self.minimum_stock
    }
}

/// Input for registering a new product.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct NewProduct {
    pub name: String,
    pub sku: Option<String>,
    pub price_cents: i64,
    pub cost_cents: Option<i64>,
    pub minimum_stock: i64,
    /// Opening stock, recorded as an INITIAL_STOCK movement when > 0
    pub initial_stock: i64,
}

/// Editable product fields. Stock is deliberately absent; it only moves
/// through the ledger.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ProductDetails {
    pub name: String,
    pub sku: Option<String>,
    pub price_cents: i64,
    pub cost_cents: Option<i64>,
    pub minimum_stock: i64,
    pub is_active: bool,
}

// =============================================================================
// Stock Ledger
// =============================================================================

/// Direction of a stock movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "UPPERCASE"))]
#[ts(export)]
#[serde(rename_all = "UPPERCASE")]
pub enum MovementDirection {
    In,
    Out,
}

impl MovementDirection {
    /// Signed stock delta for `quantity` units in this direction.
    pub const fn signed(&self, quantity: i64) -> i64 {
        match self {
            MovementDirection::In => quantity,
            MovementDirection::Out => -quantity,
        }
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            MovementDirection::In => "IN",
            MovementDirection::Out => "OUT",
        }
    }
}

impl fmt::Display for MovementDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MovementDirection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "IN" => Ok(MovementDirection::In),
            "OUT" => Ok(MovementDirection::Out),
            other => Err(format!("unknown direction: {}", other)),
        }
    }
}

/// Why stock moved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MovementReason {
    Sale,
    ReturnFromCustomer,
    AdjustmentIncrease,
    AdjustmentDecrease,
    ManualAddition,
    InitialStock,
    Damaged,
    Purchase,
}

impl MovementReason {
    /// The direction stock naturally moves for this reason.
    pub const fn direction(&self) -> MovementDirection {
        match self {
            MovementReason::Sale | MovementReason::AdjustmentDecrease | MovementReason::Damaged => {
                MovementDirection::Out
            }
            MovementReason::ReturnFromCustomer
            | MovementReason::AdjustmentIncrease
            | MovementReason::ManualAddition
            | MovementReason::InitialStock
            | MovementReason::Purchase => MovementDirection::In,
        }
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            MovementReason::Sale => "SALE",
            MovementReason::ReturnFromCustomer => "RETURN_FROM_CUSTOMER",
            MovementReason::AdjustmentIncrease => "ADJUSTMENT_INCREASE",
            MovementReason::AdjustmentDecrease => "ADJUSTMENT_DECREASE",
            MovementReason::ManualAddition => "MANUAL_ADDITION",
            MovementReason::InitialStock => "INITIAL_STOCK",
            MovementReason::Damaged => "DAMAGED",
            MovementReason::Purchase => "PURCHASE",
        }
    }
}

impl fmt::Display for MovementReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MovementReason {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().replace('-', "_").as_str() {
            "SALE" => Ok(MovementReason::Sale),
            "RETURN_FROM_CUSTOMER" => Ok(MovementReason::ReturnFromCustomer),
            "ADJUSTMENT_INCREASE" => Ok(MovementReason::AdjustmentIncrease),
            "ADJUSTMENT_DECREASE" => Ok(MovementReason::AdjustmentDecrease),
            "MANUAL_ADDITION" => Ok(MovementReason::ManualAddition),
            "INITIAL_STOCK" => Ok(MovementReason::InitialStock),
            "DAMAGED" => Ok(MovementReason::Damaged),
            "PURCHASE" => Ok(MovementReason::Purchase),
            other => Err(format!("unknown movement reason: {}", other)),
        }
    }
}

/// An immutable ledger entry.
///
/// `previous_stock` and `new_stock` are computed by the ledger store from
/// the product's current aggregate; callers never supply them.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct StockMovement {
    pub id: String,
    pub product_id: String,
    pub direction: MovementDirection,
    pub quantity: i64,
    pub reason: MovementReason,
    pub previous_stock: i64,
    pub new_stock: i64,
    /// Sale id for SALE / RETURN_FROM_CUSTOMER entries
    pub reference_id: Option<String>,
    pub unit_cost_cents: Option<i64>,
    pub notes: Option<String>,
    #[ts(as = "String")]
    pub recorded_at: DateTime<Utc>,
    #[cfg_attr(feature = "sqlx", sqlx(flatten))]
    #[serde(default)]
    pub sync: SyncMeta,
}

impl StockMovement {
    /// Stock value moved by this entry. Missing cost counts as zero.
    pub fn value(&self) -> Money {
        Money::from_cents(self.unit_cost_cents.unwrap_or(0)).times(self.quantity)
    }
}

/// What a caller supplies to record a movement.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct NewMovement {
    pub product_id: String,
    pub direction: MovementDirection,
    pub quantity: i64,
    pub reason: MovementReason,
    pub reference_id: Option<String>,
    /// Falls back to the product's cost when absent
    pub unit_cost_cents: Option<i64>,
    pub notes: Option<String>,
}

impl NewMovement {
    /// A movement in the reason's natural direction.
    pub fn new(product_id: impl Into<String>, reason: MovementReason, quantity: i64) -> Self {
        NewMovement {
            product_id: product_id.into(),
            direction: reason.direction(),
            quantity,
            reason,
            reference_id: None,
            unit_cost_cents: None,
            notes: None,
        }
    }

    pub fn with_reference(mut self, reference_id: impl Into<String>) -> Self {
        self.reference_id = Some(reference_id.into());
        self
    }

    pub fn with_unit_cost(mut self, cents: Option<i64>) -> Self {
        self.unit_cost_cents = cents;
        self
    }

    pub fn with_notes(mut self, notes: Option<String>) -> Self {
        self.notes = notes;
        self
    }
}

/// Aggregates over a product's movements in a time window.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct MovementSummary {
    pub total_in: i64,
    pub total_out: i64,
    pub value_in_cents: i64,
    pub value_out_cents: i64,
    pub count: i64,
}

// =============================================================================
// Sale
// =============================================================================

/// Sale lifecycle. CANCELED is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "UPPERCASE"))]
#[ts(export)]
#[serde(rename_all = "UPPERCASE")]
pub enum SaleStatus {
    Active,
    Canceled,
}

impl Default for SaleStatus {
    fn default() -> Self {
        SaleStatus::Active
    }
}

/// How the customer paid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "UPPERCASE"))]
#[ts(export)]
#[serde(rename_all = "UPPERCASE")]
pub enum PaymentMethod {
    Cash,
    Card,
    Transfer,
    Credit,
    Other,
}

impl Default for PaymentMethod {
    fn default() -> Self {
        PaymentMethod::Cash
    }
}

impl FromStr for PaymentMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "CASH" => Ok(PaymentMethod::Cash),
            "CARD" => Ok(PaymentMethod::Card),
            "TRANSFER" => Ok(PaymentMethod::Transfer),
            "CREDIT" => Ok(PaymentMethod::Credit),
            "OTHER" => Ok(PaymentMethod::Other),
            other => Err(format!("unknown payment method: {}", other)),
        }
    }
}

/// A completed or canceled sale.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Sale {
    pub id: String,
    pub customer_id: Option<String>,

    /// Loaded separately from `sale_items`
    #[cfg_attr(feature = "sqlx", sqlx(skip))]
    pub items: Vec<SaleItem>,

    /// Always Σ quantity × unit price over `items`
    pub total_cents: i64,

    #[ts(as = "String")]
    pub date: DateTime<Utc>,

    pub payment_method: PaymentMethod,
    pub status: SaleStatus,

    #[ts(as = "Option<String>")]
    pub canceled_at: Option<DateTime<Utc>>,
    pub canceled_reason: Option<String>,
    pub notes: Option<String>,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,

    #[cfg_attr(feature = "sqlx", sqlx(flatten))]
    #[serde(default)]
    pub sync: SyncMeta,
}

impl Sale {
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }

    pub fn is_active(&self) -> bool {
        self.status == SaleStatus::Active
    }
}

/// A line of a sale. Name and price are snapshots taken at sale time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct SaleItem {
    pub product_id: String,
    pub product_name: String,
    pub quantity: i64,
    pub unit_price_cents: i64,
}

impl SaleItem {
    pub fn line_total(&self) -> Money {
        Money::from_cents(self.unit_price_cents).times(self.quantity)
    }
}

/// A requested sale line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct SaleLine {
    pub product_id: String,
    pub quantity: i64,
    /// Defaults to the product's current price
    pub unit_price_cents: Option<i64>,
}

impl SaleLine {
    pub fn new(product_id: impl Into<String>, quantity: i64) -> Self {
        SaleLine {
            product_id: product_id.into(),
            quantity,
            unit_price_cents: None,
        }
    }

    pub fn at_price(mut self, unit_price_cents: i64) -> Self {
        self.unit_price_cents = Some(unit_price_cents);
        self
    }
}

/// The desired state of a sale, used for both create and update.
///
/// On update the draft replaces customer, items, payment method and notes;
/// a `None` date keeps the sale's original date.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct SaleDraft {
    pub customer_id: Option<String>,
    pub items: Vec<SaleLine>,
    #[ts(as = "Option<String>")]
    pub date: Option<DateTime<Utc>>,
    pub payment_method: PaymentMethod,
    pub notes: Option<String>,
}

impl SaleDraft {
    pub fn new(items: Vec<SaleLine>) -> Self {
        SaleDraft {
            items,
            ..Default::default()
        }
    }

    pub fn for_customer(mut self, customer_id: impl Into<String>) -> Self {
        self.customer_id = Some(customer_id.into());
        self
    }
}

// =============================================================================
// Customer
// =============================================================================

/// A customer with a running purchase total over ACTIVE sales.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    pub id: String,
    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub total_purchases_cents: i64,
    #[ts(as = "Option<String>")]
    pub last_purchase_date: Option<DateTime<Utc>>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
    #[cfg_attr(feature = "sqlx", sqlx(flatten))]
    #[serde(default)]
    pub sync: SyncMeta,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct NewCustomer {
    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
}

// =============================================================================
// Expense
// =============================================================================

/// A business expense. Replicated like any other record; it has no
/// ledger or customer effects.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Expense {
    pub id: String,
    pub description: String,
    pub category: Option<String>,
    pub amount_cents: i64,
    #[ts(as = "String")]
    pub date: DateTime<Utc>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
    #[cfg_attr(feature = "sqlx", sqlx(flatten))]
    #[serde(default)]
    pub sync: SyncMeta,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct NewExpense {
    pub description: String,
    pub category: Option<String>,
    pub amount_cents: i64,
    #[ts(as = "Option<String>")]
    pub date: Option<DateTime<Utc>>,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reason_directions() {
        assert_eq!(MovementReason::Sale.direction(), MovementDirection::Out);
        assert_eq!(MovementReason::Damaged.direction(), MovementDirection::Out);
        assert_eq!(
            MovementReason::ReturnFromCustomer.direction(),
            MovementDirection::In
        );
        assert_eq!(MovementReason::InitialStock.direction(), MovementDirection::In);
    }

    #[test]
    fn test_sync_state_derivation() {
        let mut meta = SyncMeta::pending();
        assert_eq!(meta.state(), SyncState::PendingSync);

        meta.last_sync_error = Some("offline".to_string());
        assert_eq!(
            meta.state(),
            SyncState::SyncFailed {
                error: "offline".to_string()
            }
        );

        meta.needs_sync = false;
        assert_eq!(meta.state(), SyncState::Synced);
    }

    #[test]
    fn test_entity_kind_parsing() {
        assert_eq!("sales".parse::<EntityKind>().unwrap(), EntityKind::Sale);
        assert_eq!(
            "stock-movement".parse::<EntityKind>().unwrap(),
            EntityKind::StockMovement
        );
        assert!("invoice".parse::<EntityKind>().is_err());
    }

    #[test]
    fn test_enum_serialization() {
        let json = serde_json::to_string(&MovementReason::ReturnFromCustomer).unwrap();
        assert_eq!(json, "\"RETURN_FROM_CUSTOMER\"");

        let json = serde_json::to_string(&SaleStatus::Canceled).unwrap();
        assert_eq!(json, "\"CANCELED\"");

        let json = serde_json::to_string(&MovementDirection::Out).unwrap();
        assert_eq!(json, "\"OUT\"");
    }

    #[test]
    fn test_sale_item_serializes_camel_case() {
        let item = SaleItem {
            product_id: "p1".to_string(),
            product_name: "Rice".to_string(),
            quantity: 2,
            unit_price_cents: 150,
        };
        let value = serde_json::to_value(&item).unwrap();
        assert_eq!(value["productId"], "p1");
        assert_eq!(value["unitPriceCents"], 150);
        assert_eq!(item.line_total().cents(), 300);
    }
}

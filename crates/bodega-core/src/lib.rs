//! # bodega-core: Pure Business Logic for Bodega
//!
//! This crate holds the domain model of Bodega's inventory and sales core:
//! the record types, the stock ledger arithmetic, sale totals and the
//! validation rules. Nothing in here touches a database or the network.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Bodega Architecture                              │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    bodega CLI (apps/cli)                        │   │
//! │  │    product add ──► sale create ──► sale cancel ──► sync sweep   │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ bodega-core (THIS CRATE) ★                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │   money   │  │  ledger   │  │ validation│  │   │
//! │  │   │  Product  │  │   Money   │  │ next_stock│  │   rules   │  │   │
//! │  │   │   Sale    │  │  totals   │  │ StockPlan │  │  checks   │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │          bodega-db (SQLite, ledger store, sale manager)         │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │          bodega-sync (per-record remote replication)            │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain records (Product, StockMovement, Sale, Customer, Expense)
//! - [`money`] - Money type with integer arithmetic
//! - [`ledger`] - Stock arithmetic and sale stock planning
//! - [`error`] - Domain error types
//! - [`validation`] - Input validation
//!
//! ## Example Usage
//!
//! ```rust
//! use bodega_core::ledger::next_stock;
//! use bodega_core::MovementDirection;
//!
//! assert_eq!(next_stock("p1", 5, MovementDirection::Out, 2).unwrap(), 3);
//! assert!(next_stock("p1", 1, MovementDirection::Out, 2).is_err());
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod ledger;
pub mod money;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum number of lines in a single sale.
pub const MAX_SALE_LINES: usize = 200;

/// Maximum quantity of a single sale line or stock movement.
///
/// ## Business Reason
/// Catches fat-finger input (typing 10000 instead of 100) before it
/// reaches the ledger.
pub const MAX_ITEM_QUANTITY: i64 = 9_999;

/// Maximum length of free-text notes and cancel reasons.
pub const MAX_NOTES_LEN: usize = 500;

/// Maximum unit price or unit cost, in cents ($100,000,000.00).
///
/// Together with [`MAX_ITEM_QUANTITY`] and [`MAX_SALE_LINES`] this keeps
/// every sale total well inside an i64.
pub const MAX_PRICE_CENTS: i64 = 10_000_000_000;

/// Maximum opening stock for a new product.
pub const MAX_STOCK_QUANTITY: i64 = 1_000_000_000;

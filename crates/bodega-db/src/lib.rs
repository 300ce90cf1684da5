//! # bodega-db: Database Layer for Bodega
//!
//! Local storage for Bodega on SQLite via sqlx, plus the two components
//! that must be transactional: the stock [`Ledger`] and the [`SaleManager`].
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Bodega Data Flow                                 │
//! │                                                                         │
//! │  CLI command (sale create)                                             │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    bodega-db (THIS CRATE)                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐   ┌───────────────┐   ┌───────────────┐    │   │
//! │  │   │  SaleManager  │──►│    Ledger     │──►│ Repositories  │    │   │
//! │  │   │  (sales.rs)   │   │  (ledger.rs)  │   │ product, sale │    │   │
//! │  │   │ create/update │   │ record, sum   │   │ movement, ... │    │   │
//! │  │   │ cancel        │   │ verify        │   │               │    │   │
//! │  │   └───────┬───────┘   └───────┬───────┘   └───────┬───────┘    │   │
//! │  │           │ LockTable (per-key, sorted)           │            │   │
//! │  │           ▼                                       ▼            │   │
//! │  │   ┌─────────────────────────────────────────────────────────┐  │   │
//! │  │   │  Database (pool.rs): SqlitePool, WAL, migrations        │  │   │
//! │  │   └─────────────────────────────────────────────────────────┘  │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │ after commit                                                    │
//! │       ▼                                                                 │
//! │  ChangeNotifier ──► bodega-sync coordinator                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Table-level reads and writes
//! - [`locks`] - In-process per-key write locks
//! - [`ledger`] - Ledger store (movements and the stock aggregate)
//! - [`sales`] - Sale create / update / cancel
//! - [`notify`] - Post-commit change notification seam
//!
//! ## Usage
//!
//! ```rust,ignore
//! use bodega_db::{Database, DbConfig, SaleManager};
//!
//! let db = Database::new(DbConfig::new("bodega.db")).await?;
//! let sales = SaleManager::new(db.clone(), notifier);
//! let sale = sales.create(draft).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod ledger;
pub mod locks;
pub mod migrations;
pub mod notify;
pub mod pool;
pub mod repository;
pub mod sales;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use ledger::Ledger;
pub use locks::{LockKey, LockTable};
pub use notify::{ChangeNotifier, ChangeSet, NoOpNotifier};
pub use pool::{Database, DbConfig};
pub use sales::SaleManager;

// Repository re-exports for convenience
pub use repository::customer::CustomerRepository;
pub use repository::expense::ExpenseRepository;
pub use repository::movement::MovementRepository;
pub use repository::product::ProductRepository;
pub use repository::sale::SaleRepository;
pub use repository::sync::{PendingRecord, SyncMetaRepository, SyncStatus};

#[cfg(test)]
pub(crate) mod testing;

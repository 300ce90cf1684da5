//! # Repository Module
//!
//! Table-level database access for Bodega.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repositories and Transactions                        │
//! │                                                                         │
//! │  Reads go straight to the pool:                                        │
//! │                                                                         │
//! │      db.products().get_by_id(id)   ──► SqlitePool                      │
//! │                                                                         │
//! │  Writes that belong to a larger unit of work take the transaction's    │
//! │  connection instead, so the caller decides where the commit is:        │
//! │                                                                         │
//! │      let mut tx = db.pool().begin().await?;                            │
//! │      SaleRepository::insert_in(&mut tx, &sale).await?;                 │
//! │      Ledger::record_in(&mut tx, &movement, now).await?;                │
//! │      CustomerRepository::apply_delta_in(&mut tx, ...).await?;          │
//! │      tx.commit().await?;                                               │
//! │                                                                         │
//! │  Every local write sets needs_sync = 1 and bumps sync_version in the   │
//! │  same statement.                                                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`ProductRepository`](product::ProductRepository) - Products and low-stock listing
//! - [`MovementRepository`](movement::MovementRepository) - Ledger rows
//! - [`SaleRepository`](sale::SaleRepository) - Sales and their items
//! - [`CustomerRepository`](customer::CustomerRepository) - Customers and purchase totals
//! - [`ExpenseRepository`](expense::ExpenseRepository) - Expenses
//! - [`SyncMetaRepository`](sync::SyncMetaRepository) - Replication bookkeeping

pub mod customer;
pub mod expense;
pub mod movement;
pub mod product;
pub mod sale;
pub mod sync;

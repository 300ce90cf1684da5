//! # bodega-sync: Remote Replication for Bodega
//!
//! Mirrors every locally committed record to a remote document store. Local
//! writes never wait on the network: they commit, notify, and the
//! coordinator pushes in the background. Whatever fails stays pending and
//! is retried by the next sweep.
//!
//! ## Architecture Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Sync Architecture                                │
//! │                                                                         │
//! │  Ledger / SaleManager ── commit ──► ChangeNotifier (SyncHandle)        │
//! │                                          │                              │
//! │                                          ▼                              │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │                SyncCoordinator (worker task)                     │  │
//! │  │                                                                  │  │
//! │  │  push-on-notify · periodic sweep with backoff · on-demand sweep  │  │
//! │  └────────────┬─────────────────────────────────┬───────────────────┘  │
//! │               ▼                                 ▼                       │
//! │  ┌────────────────────────┐        ┌────────────────────────────────┐  │
//! │  │ document: record →     │        │ RemoteStore                    │  │
//! │  │ flat JSON + ownerId    │───────►│ HttpRemoteStore / Memory...    │  │
//! │  └────────────────────────┘        └────────────────────────────────┘  │
//! │                                                                         │
//! │  OwnerProvider: no owner → nothing leaves the device                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`config`] - `bodega.toml` loading, env overrides, validation
//! - [`coordinator`] - Background push worker and its handle
//! - [`document`] - Record to remote document conversion
//! - [`error`] - Sync and remote error types
//! - [`owner`] - Current owner (signed-in account) providers
//! - [`remote`] - Remote store trait and implementations

pub mod config;
pub mod coordinator;
pub mod document;
pub mod error;
pub mod owner;
pub mod remote;

pub use config::{BodegaConfig, SyncMode};
pub use coordinator::{
    CoordinatorConfig, SkipReason, SweepReport, SyncCoordinator, SyncEvent, SyncHandle,
};
pub use document::{load_document, RemoteDocument};
pub use error::{RemoteError, RemoteResult, SyncError, SyncResult};
pub use owner::{OwnerProvider, SessionOwner, StaticOwner};
pub use remote::{HttpRemoteStore, MemoryRemoteStore, RemoteStore};

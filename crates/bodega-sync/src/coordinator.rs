//! # Sync Coordinator
//!
//! Pushes locally committed records to the remote store, one document per
//! record, in the background.
//!
//! ## Coordinator Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Sync Coordinator                                 │
//! │                                                                         │
//! │  SaleManager / Ledger ──► SyncHandle::notify (try_send, never blocks)   │
//! │  CLI `sync sweep`     ──► SyncHandle::sweep  (awaits SweepReport)       │
//! │                               │                                         │
//! │                               ▼  bounded mpsc                           │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │ Worker task                                                      │  │
//! │  │                                                                  │  │
//! │  │  Push{kind,id}        → spawn into JoinSet                       │  │
//! │  │  Sweep / RemoteData   → page pending records, push each          │  │
//! │  │  sweep timer          → same, interval backs off while failing   │  │
//! │  │  Shutdown             → stop intake, join in-flight pushes       │  │
//! │  └───────────────┬──────────────────────────────────────────────────┘  │
//! │                  ▼                                                      │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │ push task (Semaphore permit, request timeout)                    │  │
//! │  │   owner? ─ no ─► Skipped (record stays pending)                  │  │
//! │  │   load document ─► RemoteStore::put_document                     │  │
//! │  │     ok   → mark_synced(version)   (no-op if a newer write landed)│  │
//! │  │     err  → mark_failed(message)   (next sweep retries)           │  │
//! │  └──────────────────────────────────────────────────────────────────┘  │
//! │                                                                         │
//! │  Every outcome is published on a broadcast channel (SyncEvent).        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A panicking or failing push is contained in its own task; siblings and
//! the worker carry on.

use backoff::backoff::Backoff;
use backoff::ExponentialBackoff;
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, oneshot, Semaphore};
use tokio::task::{JoinError, JoinHandle, JoinSet};
use tokio::time::Instant;
use tracing::{debug, error, info, trace, warn};

use bodega_core::EntityKind;
use bodega_db::{ChangeNotifier, Database};

use crate::document::load_document;
use crate::error::{RemoteError, SyncError, SyncResult};
use crate::owner::OwnerProvider;
use crate::remote::RemoteStore;

// =============================================================================
// Configuration
// =============================================================================

/// Coordinator tuning.
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    /// Pending records loaded per sweep page.
    pub batch_size: i64,

    /// Pushes in flight at once.
    pub max_concurrency: usize,

    /// Command queue capacity. A full queue drops notifications, never
    /// writes.
    pub queue_capacity: usize,

    /// Base interval between periodic sweeps.
    pub sweep_interval: Duration,

    /// Ceiling for the sweep interval while sweeps keep failing.
    pub max_sweep_interval: Duration,

    /// Bound on one remote call.
    pub request_timeout: Duration,

    /// Write push outcomes back to the local sync metadata. When off,
    /// documents are still pushed and events still published, but every
    /// record stays pending.
    pub persist_outcomes: bool,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        CoordinatorConfig {
            batch_size: 100,
            max_concurrency: 4,
            queue_capacity: 256,
            sweep_interval: Duration::from_secs(60),
            max_sweep_interval: Duration::from_secs(900),
            request_timeout: Duration::from_secs(10),
            persist_outcomes: true,
        }
    }
}

// =============================================================================
// Events & Reports
// =============================================================================

/// Why a push didn't happen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// Nobody is signed in.
    NoOwner,
    /// The record was removed locally.
    Missing,
}

/// Observable outcome of coordinator work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncEvent {
    /// The document was stored remotely. `cleared` is false when a newer
    /// local write landed meanwhile and the record stays pending.
    Pushed {
        kind: EntityKind,
        id: String,
        version: i64,
        cleared: bool,
    },
    Failed {
        kind: EntityKind,
        id: String,
        error: String,
    },
    Skipped {
        kind: EntityKind,
        id: String,
        reason: SkipReason,
    },
    SweepFinished(SweepReport),
}

/// Tally of one sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SweepReport {
    pub attempted: usize,
    pub synced: usize,
    pub failed: usize,
    pub skipped: usize,
}

impl SweepReport {
    pub fn is_clean(&self) -> bool {
        self.failed == 0
    }

    fn tally(&mut self, joined: Result<PushOutcome, JoinError>) {
        match joined {
            Ok(PushOutcome::Synced) => self.synced += 1,
            Ok(PushOutcome::Failed) => self.failed += 1,
            Ok(PushOutcome::Skipped) => self.skipped += 1,
            Err(e) => {
                error!(error = %e, "Push task aborted");
                self.failed += 1;
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PushOutcome {
    Synced,
    Failed,
    Skipped,
}

// =============================================================================
// Commands & Handle
// =============================================================================

#[derive(Debug)]
enum Command {
    Push {
        kind: EntityKind,
        id: String,
    },
    Sweep {
        only: Option<EntityKind>,
        reply: oneshot::Sender<SweepReport>,
    },
    RemoteDataArrived {
        kind: EntityKind,
    },
    Shutdown,
}

/// Handle for talking to a running coordinator. Cheap to clone.
#[derive(Debug, Clone)]
pub struct SyncHandle {
    commands: mpsc::Sender<Command>,
    events: broadcast::Sender<SyncEvent>,
}

impl SyncHandle {
    /// Requests a push of one record. Never blocks and never fails: when
    /// the queue is full or the coordinator is gone the record is simply
    /// left for the next sweep.
    pub fn notify(&self, kind: EntityKind, id: &str) {
        let command = Command::Push {
            kind,
            id: id.to_string(),
        };
        match self.commands.try_send(command) {
            Ok(()) => trace!(kind = %kind, id = %id, "Push queued"),
            Err(mpsc::error::TrySendError::Full(_)) => {
                debug!(kind = %kind, id = %id, "Sync queue full; left for next sweep")
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                debug!(kind = %kind, id = %id, "Sync coordinator stopped; left pending")
            }
        }
    }

    /// Pushes every pending record of every kind and reports the tally.
    pub async fn sweep(&self) -> SyncResult<SweepReport> {
        self.request_sweep(None).await
    }

    /// Pushes every pending record of one kind.
    pub async fn sweep_kind(&self, kind: EntityKind) -> SyncResult<SweepReport> {
        self.request_sweep(Some(kind)).await
    }

    async fn request_sweep(&self, only: Option<EntityKind>) -> SyncResult<SweepReport> {
        let (reply, report) = oneshot::channel();
        self.commands
            .send(Command::Sweep { only, reply })
            .await
            .map_err(|_| SyncError::ShuttingDown)?;
        report.await.map_err(|_| SyncError::ShuttingDown)
    }

    /// Signals that remote data for `kind` was read, triggering a
    /// reconciliation sweep of that collection.
    pub async fn remote_data_arrived(&self, kind: EntityKind) -> SyncResult<()> {
        self.commands
            .send(Command::RemoteDataArrived { kind })
            .await
            .map_err(|_| SyncError::ShuttingDown)
    }

    /// Subscribes to push outcomes.
    pub fn subscribe(&self) -> broadcast::Receiver<SyncEvent> {
        self.events.subscribe()
    }

    /// Stops intake. The worker finishes in-flight pushes and exits; await
    /// the `JoinHandle` from [`SyncCoordinator::spawn`] to wait for it.
    pub async fn shutdown(&self) -> SyncResult<()> {
        self.commands
            .send(Command::Shutdown)
            .await
            .map_err(|_| SyncError::ShuttingDown)
    }
}

impl ChangeNotifier for SyncHandle {
    fn record_changed(&self, kind: EntityKind, id: &str) {
        self.notify(kind, id);
    }
}

// =============================================================================
// Coordinator
// =============================================================================

/// Everything a push task needs, shared across tasks.
#[derive(Debug)]
struct PushContext {
    db: Database,
    remote: Arc<dyn RemoteStore>,
    owner: Arc<dyn OwnerProvider>,
    events: broadcast::Sender<SyncEvent>,
    permits: Arc<Semaphore>,
    request_timeout: Duration,
    persist_outcomes: bool,
}

/// The coordinator's worker.
pub struct SyncCoordinator {
    ctx: Arc<PushContext>,
    config: CoordinatorConfig,
    commands: mpsc::Receiver<Command>,
    in_flight: JoinSet<PushOutcome>,
}

impl SyncCoordinator {
    /// Spawns the worker task.
    ///
    /// ## Returns
    /// A handle for notifications, sweeps and shutdown, and the worker's
    /// `JoinHandle`.
    ///
    /// ## Usage
    /// ```rust,ignore
    /// let (sync, worker) = SyncCoordinator::spawn(db.clone(), remote, owner, config);
    /// let sales = SaleManager::new(db, Arc::new(sync.clone()));
    /// // ...
    /// sync.shutdown().await?;
    /// worker.await?;
    /// ```
    pub fn spawn(
        db: Database,
        remote: Arc<dyn RemoteStore>,
        owner: Arc<dyn OwnerProvider>,
        config: CoordinatorConfig,
    ) -> (SyncHandle, JoinHandle<()>) {
        let (command_tx, command_rx) = mpsc::channel(config.queue_capacity.max(1));
        let (events, _) = broadcast::channel(256);

        let ctx = Arc::new(PushContext {
            db,
            remote,
            owner,
            events: events.clone(),
            permits: Arc::new(Semaphore::new(config.max_concurrency.max(1))),
            request_timeout: config.request_timeout,
            persist_outcomes: config.persist_outcomes,
        });

        let coordinator = SyncCoordinator {
            ctx,
            config,
            commands: command_rx,
            in_flight: JoinSet::new(),
        };

        let worker = tokio::spawn(coordinator.run());
        let handle = SyncHandle {
            commands: command_tx,
            events,
        };

        (handle, worker)
    }

    /// Main worker loop.
    async fn run(mut self) {
        info!(
            max_concurrency = self.config.max_concurrency,
            sweep_interval_secs = self.config.sweep_interval.as_secs(),
            "Sync coordinator starting"
        );

        let mut backoff = self.sweep_backoff();
        let mut next_sweep = Instant::now() + self.config.sweep_interval;

        loop {
            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(Command::Push { kind, id }) => {
                        let ctx = Arc::clone(&self.ctx);
                        self.in_flight.spawn(push_record(ctx, kind, id));
                    }
                    Some(Command::Sweep { only, reply }) => {
                        let report = self.sweep(only).await;
                        let _ = reply.send(report);
                    }
                    Some(Command::RemoteDataArrived { kind }) => {
                        debug!(kind = %kind, "Remote data arrived; reconciling");
                        self.sweep(Some(kind)).await;
                    }
                    Some(Command::Shutdown) | None => {
                        info!("Sync coordinator received shutdown");
                        break;
                    }
                },

                Some(joined) = self.in_flight.join_next(), if !self.in_flight.is_empty() => {
                    if let Err(e) = joined {
                        error!(error = %e, "Push task aborted");
                    }
                }

                _ = tokio::time::sleep_until(next_sweep) => {
                    let report = self.sweep(None).await;
                    let delay = if report.is_clean() {
                        backoff.reset();
                        self.config.sweep_interval
                    } else {
                        let delay = backoff
                            .next_backoff()
                            .unwrap_or(self.config.max_sweep_interval);
                        warn!(
                            failed = report.failed,
                            next_in_secs = delay.as_secs(),
                            "Sweep had failures; backing off"
                        );
                        delay
                    };
                    next_sweep = Instant::now() + delay;
                }
            }
        }

        // Let in-flight pushes finish; each is bounded by the request timeout
        while let Some(joined) = self.in_flight.join_next().await {
            if let Err(e) = joined {
                error!(error = %e, "Push task aborted during shutdown");
            }
        }

        info!("Sync coordinator stopped");
    }

    /// Pushes every pending record of `only` (or of every kind).
    async fn sweep(&mut self, only: Option<EntityKind>) -> SweepReport {
        let kinds: Vec<EntityKind> = match only {
            Some(kind) => vec![kind],
            None => EntityKind::ALL.to_vec(),
        };

        let mut report = SweepReport::default();
        let sync_meta = self.ctx.db.sync_meta();

        if self.ctx.owner.current_owner().is_none() {
            for kind in &kinds {
                match sync_meta.status(*kind).await {
                    Ok(status) => report.skipped += status.pending as usize,
                    Err(e) => error!(kind = %kind, error = %e, "Failed to count pending records"),
                }
            }
            debug!(pending = report.skipped, "No owner; sweep skipped");
            let _ = self.ctx.events.send(SyncEvent::SweepFinished(report.clone()));
            return report;
        }

        let mut batch = JoinSet::new();
        for kind in kinds {
            let mut cursor: Option<String> = None;
            loop {
                let page = match sync_meta
                    .pending(kind, cursor.as_deref(), self.config.batch_size)
                    .await
                {
                    Ok(page) => page,
                    Err(e) => {
                        error!(kind = %kind, error = %e, "Failed to load pending records");
                        report.failed += 1;
                        break;
                    }
                };

                let page_len = page.len() as i64;
                cursor = page.last().map(|record| record.id.clone());

                for record in page {
                    report.attempted += 1;
                    batch.spawn(push_record(Arc::clone(&self.ctx), kind, record.id));
                }
                while let Some(joined) = batch.join_next().await {
                    report.tally(joined);
                }

                if page_len < self.config.batch_size {
                    break;
                }
            }
        }

        info!(
            attempted = report.attempted,
            synced = report.synced,
            failed = report.failed,
            skipped = report.skipped,
            "Sweep finished"
        );
        let _ = self.ctx.events.send(SyncEvent::SweepFinished(report.clone()));
        report
    }

    fn sweep_backoff(&self) -> ExponentialBackoff {
        let mut backoff = ExponentialBackoff {
            initial_interval: self.config.sweep_interval,
            max_interval: self.config.max_sweep_interval,
            multiplier: 2.0,
            max_elapsed_time: None,
            ..Default::default()
        };
        backoff.reset();
        backoff
    }
}

// =============================================================================
// Push
// =============================================================================

/// Pushes the current state of one record.
async fn push_record(ctx: Arc<PushContext>, kind: EntityKind, id: String) -> PushOutcome {
    let _permit = Arc::clone(&ctx.permits).acquire_owned().await.ok();

    let Some(owner_id) = ctx.owner.current_owner() else {
        trace!(kind = %kind, id = %id, "No owner; push skipped");
        let _ = ctx.events.send(SyncEvent::Skipped {
            kind,
            id,
            reason: SkipReason::NoOwner,
        });
        return PushOutcome::Skipped;
    };

    let document = match load_document(&ctx.db, kind, &id, &owner_id).await {
        Ok(Some(document)) => document,
        Ok(None) => {
            debug!(kind = %kind, id = %id, "Record gone locally; push skipped");
            let _ = ctx.events.send(SyncEvent::Skipped {
                kind,
                id,
                reason: SkipReason::Missing,
            });
            return PushOutcome::Skipped;
        }
        Err(e) => return record_failure(&ctx, kind, id, e).await,
    };

    let put = ctx
        .remote
        .put_document(&owner_id, kind.collection(), &id, &document.body);
    let result = match tokio::time::timeout(ctx.request_timeout, put).await {
        Ok(result) => result,
        Err(_) => Err(RemoteError::Timeout(ctx.request_timeout.as_millis() as u64)),
    };

    if let Err(e) = result {
        return record_failure(&ctx, kind, id, e.into()).await;
    }

    if !ctx.persist_outcomes {
        debug!(kind = %kind, id = %id, version = document.version, "Pushed (not recorded)");
        let _ = ctx.events.send(SyncEvent::Pushed {
            kind,
            id,
            version: document.version,
            cleared: false,
        });
        return PushOutcome::Synced;
    }

    match ctx
        .db
        .sync_meta()
        .mark_synced(kind, &id, document.version, Utc::now())
        .await
    {
        Ok(cleared) => {
            debug!(kind = %kind, id = %id, version = document.version, cleared, "Pushed");
            let _ = ctx.events.send(SyncEvent::Pushed {
                kind,
                id,
                version: document.version,
                cleared,
            });
            PushOutcome::Synced
        }
        Err(e) => record_failure(&ctx, kind, id, e.into()).await,
    }
}

/// Leaves the record pending with the failure message.
async fn record_failure(
    ctx: &PushContext,
    kind: EntityKind,
    id: String,
    err: SyncError,
) -> PushOutcome {
    let message = err.to_string();
    if err.is_retryable() {
        warn!(kind = %kind, id = %id, error = %message, "Push failed");
    } else {
        error!(kind = %kind, id = %id, error = %message, "Push failed (not retryable)");
    }

    if ctx.persist_outcomes {
        if let Err(e) = ctx.db.sync_meta().mark_failed(kind, &id, &message).await {
            error!(kind = %kind, id = %id, error = %e, "Failed to record push failure");
        }
    }

    let _ = ctx.events.send(SyncEvent::Failed {
        kind,
        id,
        error: message,
    });
    PushOutcome::Failed
}

// =============================================================================
// Tests
// =============================================================================

//! # Composition Root
//!
//! Wires the database, the sync coordinator and the managers together for
//! one CLI invocation.
//!
//! ## Startup Sequence
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  1. Open database (WAL, migrations)                                     │
//! │  2. Pick a remote: --dry-remote → memory, [remote] url → HTTP,         │
//! │     offline mode or no url → none                                       │
//! │     (--dry-remote never marks local records as synced)                  │
//! │  3. With a remote: spawn SyncCoordinator, its handle is the notifier    │
//! │     Without one:   NoOpNotifier, records simply stay pending            │
//! │  4. Ledger + SaleManager share the notifier                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use bodega_core::EntityKind;
use bodega_db::{ChangeNotifier, Database, DbConfig, Ledger, NoOpNotifier, SaleManager};
use bodega_sync::{
    BodegaConfig, CoordinatorConfig, HttpRemoteStore, MemoryRemoteStore, RemoteStore, StaticOwner,
    SyncCoordinator, SyncHandle,
};

use crate::error::{CliError, CliResult, ErrorCode};

/// Owner used by `--dry-remote` when none is configured.
const DRY_RUN_OWNER: &str = "dry-run";

/// Everything a command needs.
pub struct App {
    pub db: Database,
    pub ledger: Ledger,
    pub sales: SaleManager,
    notifier: Arc<dyn ChangeNotifier>,
    sync: Option<(SyncHandle, JoinHandle<()>)>,
}

impl App {
    pub async fn start(config: &BodegaConfig, dry_remote: bool) -> CliResult<App> {
        let path = &config.database.path;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        debug!(?path, "Opening database");

        let db = Database::new(
            DbConfig::new(path.clone()).max_connections(config.database.max_connections),
        )
        .await?;

        let remote = select_remote(config, dry_remote)?;
        let (notifier, sync) = match remote {
            Some(selected) => {
                let (handle, worker) = SyncCoordinator::spawn(
                    db.clone(),
                    selected.store,
                    Arc::new(StaticOwner::new(selected.owner)),
                    selected.coordinator,
                );
                let notifier: Arc<dyn ChangeNotifier> = Arc::new(handle.clone());
                (notifier, Some((handle, worker)))
            }
            None => {
                info!(mode = %config.sync.mode, "Sync offline; changes stay pending");
                let notifier: Arc<dyn ChangeNotifier> = Arc::new(NoOpNotifier);
                (notifier, None)
            }
        };

        Ok(App {
            ledger: Ledger::new(db.clone(), Arc::clone(&notifier)),
            sales: SaleManager::new(db.clone(), Arc::clone(&notifier)),
            db,
            notifier,
            sync,
        })
    }

    /// Signals a write made outside the ledger and sale manager.
    pub fn changed(&self, kind: EntityKind, id: &str) {
        self.notifier.record_changed(kind, id);
    }

    /// The coordinator handle, or an error when sync is offline.
    pub fn sync(&self) -> CliResult<&SyncHandle> {
        self.sync.as_ref().map(|(handle, _)| handle).ok_or_else(|| {
            CliError::new(
                ErrorCode::ConfigError,
                "Sync is offline: set [remote] url, switch [sync] mode to auto, or pass --dry-remote",
            )
        })
    }

    /// Stops the coordinator after it has drained queued pushes, then
    /// closes the database.
    pub async fn finish(self) -> CliResult<()> {
        if let Some((handle, worker)) = self.sync {
            handle.shutdown().await?;
            worker.await?;
        }
        self.db.close().await;
        Ok(())
    }
}

/// The remote a coordinator pushes to, and how.
struct SelectedRemote {
    store: Arc<dyn RemoteStore>,
    owner: Option<String>,
    coordinator: CoordinatorConfig,
}

fn select_remote(config: &BodegaConfig, dry_remote: bool) -> CliResult<Option<SelectedRemote>> {
    if dry_remote {
        let owner = config
            .owner
            .id
            .clone()
            .unwrap_or_else(|| DRY_RUN_OWNER.to_string());
        info!(owner = %owner, "Pushing to an in-memory remote; sync state is left untouched");
        // The memory store is gone when the process exits
        return Ok(Some(SelectedRemote {
            store: Arc::new(MemoryRemoteStore::new()),
            owner: Some(owner),
            coordinator: CoordinatorConfig {
                persist_outcomes: false,
                ..config.coordinator()
            },
        }));
    }

    if !config.is_sync_enabled() {
        return Ok(None);
    }

    match config.remote_url() {
        Some(url) => {
            let remote = HttpRemoteStore::new(url, config.request_timeout())?;
            info!(url = %url, "Pushing to remote store");
            Ok(Some(SelectedRemote {
                store: Arc::new(remote),
                owner: config.owner.id.clone(),
                coordinator: config.coordinator(),
            }))
        }
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bodega_core::NewProduct;
    use bodega_sync::SyncMode;
    use std::path::PathBuf;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn temp_db_path(tag: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        std::env::temp_dir().join(format!("bodega-{}-{}-{}.db", tag, std::process::id(), nanos))
    }

    fn remove_db(path: &PathBuf) {
        for suffix in ["", "-wal", "-shm"] {
            let mut file = path.clone().into_os_string();
            file.push(suffix);
            let _ = std::fs::remove_file(file);
        }
    }

    #[test]
    fn test_offline_mode_selects_no_remote() {
        let mut config = BodegaConfig::default();
        config.remote.url = Some("https://sync.example.com".into());
        config.sync.mode = SyncMode::Offline;
        assert!(select_remote(&config, false).unwrap().is_none());
    }

    #[test]
    fn test_missing_url_selects_no_remote() {
        let config = BodegaConfig::default();
        assert!(select_remote(&config, false).unwrap().is_none());
    }

    #[test]
    fn test_dry_remote_gets_an_owner() {
        let mut config = BodegaConfig::default();
        config.sync.mode = SyncMode::Offline;
        let selected = select_remote(&config, true).unwrap().unwrap();
        assert_eq!(selected.owner.as_deref(), Some(DRY_RUN_OWNER));
        assert!(!selected.coordinator.persist_outcomes);
    }

    #[test]
    fn test_http_remote_uses_configured_owner() {
        let mut config = BodegaConfig::default();
        config.remote.url = Some("https://sync.example.com".into());
        config.owner.id = Some("owner-9".into());
        let selected = select_remote(&config, false).unwrap().unwrap();
        assert_eq!(selected.owner.as_deref(), Some("owner-9"));
        assert!(selected.coordinator.persist_outcomes);
    }

    #[tokio::test]
    async fn test_dry_remote_leaves_records_pending() {
        let path = temp_db_path("dry");
        let mut config = BodegaConfig::default();
        config.database.path = path.clone();

        let app = App::start(&config, true).await.unwrap();
        let rice = app
            .ledger
            .register_product(NewProduct {
                name: "Rice".to_string(),
                sku: None,
                price_cents: 250,
                cost_cents: None,
                minimum_stock: 0,
                initial_stock: 3,
            })
            .await
            .unwrap();

        // product and its opening movement
        let report = app.sync().unwrap().sweep().await.unwrap();
        assert_eq!(report.synced, 2);

        let pending: i64 = app
            .db
            .sync_meta()
            .status_all()
            .await
            .unwrap()
            .iter()
            .map(|s| s.pending)
            .sum();
        assert_eq!(pending, 2);
        let meta = app
            .db
            .sync_meta()
            .get(EntityKind::Product, &rice.id)
            .await
            .unwrap()
            .unwrap();
        assert!(meta.needs_sync);
        assert!(meta.last_synced_at.is_none());

        app.finish().await.unwrap();
        remove_db(&path);
    }
}

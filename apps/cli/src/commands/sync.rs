//! Sync commands.

use clap::Subcommand;
use serde::Serialize;

use bodega_core::EntityKind;
use bodega_db::SyncStatus;

use super::print_json;
use crate::app::App;
use crate::error::CliResult;

#[derive(Subcommand, Debug)]
pub enum SyncCommands {
    /// Push every pending record now
    Sweep {
        /// Only this collection (product, sale, stock_movement, ...)
        #[arg(long)]
        kind: Option<EntityKind>,
    },

    /// Pending and failed counts per collection
    Status,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StatusRow {
    kind: String,
    pending: i64,
    failed: i64,
}

impl From<SyncStatus> for StatusRow {
    fn from(status: SyncStatus) -> Self {
        StatusRow {
            kind: status.kind.to_string(),
            pending: status.pending,
            failed: status.failed,
        }
    }
}

pub async fn handle(app: &App, cmd: SyncCommands) -> CliResult<()> {
    match cmd {
        SyncCommands::Sweep { kind } => {
            let sync = app.sync()?;
            let report = match kind {
                Some(kind) => sync.sweep_kind(kind).await?,
                None => sync.sweep().await?,
            };
            print_json(&report)
        }

        SyncCommands::Status => {
            let rows: Vec<StatusRow> = app
                .db
                .sync_meta()
                .status_all()
                .await?
                .into_iter()
                .map(StatusRow::from)
                .collect();
            print_json(&rows)
        }
    }
}

//! # Bodega CLI Entry Point
//!
//! ```text
//! bodega [--config PATH] [--db PATH] [--dry-remote] <command>
//!
//!   product   add | list | show | low-stock
//!   stock     record | history | summary
//!   customer  add | list
//!   sale      create | update | cancel | show | list | delete-local
//!   expense   add
//!   sync      sweep | status
//! ```
//!
//! ## Startup Sequence
//! 1. Initialize tracing (logs go to stderr, results to stdout as JSON)
//! 2. Load `bodega.toml`, apply BODEGA_* overrides and `--db`
//! 3. Build the app (database, coordinator, managers)
//! 4. Run the command
//! 5. Shut the coordinator down so queued pushes finish

mod app;
mod commands;
mod error;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{debug, Subscriber};
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use bodega_sync::BodegaConfig;

use crate::app::App;
use crate::commands::{
    customer::CustomerCommands, expense::ExpenseCommands, product::ProductCommands,
    sale::SaleCommands, stock::StockCommands, sync::SyncCommands,
};
use crate::error::{CliError, CliResult, ErrorCode};

#[derive(Parser, Debug)]
#[command(name = "bodega", version, about = "Offline-first inventory and sales")]
struct Cli {
    /// Config file (default: platform config dir/bodega.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Database file, overrides [database] path
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Push to an in-process remote instead of the configured one
    #[arg(long, global = true)]
    dry_remote: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Manage products
    #[command(subcommand)]
    Product(ProductCommands),

    /// Record and inspect stock movements
    #[command(subcommand)]
    Stock(StockCommands),

    /// Manage customers
    #[command(subcommand)]
    Customer(CustomerCommands),

    /// Create, edit and cancel sales
    #[command(subcommand)]
    Sale(SaleCommands),

    /// Record expenses
    #[command(subcommand)]
    Expense(ExpenseCommands),

    /// Push pending records and inspect sync state
    #[command(subcommand)]
    Sync(SyncCommands),
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{}", err);
            err.exit_code()
        }
    }
}

async fn run(cli: Cli) -> CliResult<()> {
    let config = load_config(&cli)?;
    let app = App::start(&config, cli.dry_remote).await?;

    let outcome = match cli.command {
        Command::Product(cmd) => commands::product::handle(&app, cmd).await,
        Command::Stock(cmd) => commands::stock::handle(&app, cmd).await,
        Command::Customer(cmd) => commands::customer::handle(&app, cmd).await,
        Command::Sale(cmd) => commands::sale::handle(&app, cmd).await,
        Command::Expense(cmd) => commands::expense::handle(&app, cmd).await,
        Command::Sync(cmd) => commands::sync::handle(&app, cmd).await,
    };

    // Committed writes stay committed even if the command failed afterwards;
    // give their pushes a chance either way.
    app.finish().await?;
    outcome
}

fn load_config(cli: &Cli) -> CliResult<BodegaConfig> {
    let mut config = BodegaConfig::load(cli.config.clone())?;
    if let Some(ref db) = cli.db {
        config.database.path = db.clone();
    }
    if config.database.path.as_os_str().is_empty() {
        return Err(CliError::new(
            ErrorCode::ConfigError,
            "No database path: pass --db or set [database] path",
        ));
    }
    debug!(path = ?config.database.path, mode = %config.sync.mode, "Configuration loaded");
    Ok(config)
}

/// Initializes the tracing subscriber.
///
/// ## Log Levels
/// - `RUST_LOG=debug` - Show debug and above
/// - `RUST_LOG=bodega=trace` - Show trace for bodega crates only
/// - Default: INFO, with debug for bodega crates
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    log_subscriber(filter).init();
}

/// Filter used when `RUST_LOG` is unset.
const DEFAULT_LOG_FILTER: &str = "info,bodega=debug,sqlx=warn";

/// Logs go to stderr so stdout stays valid JSON.
fn log_subscriber(filter: EnvFilter) -> impl Subscriber + Send + Sync + 'static {
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use tracing::Level;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parses_sale_create() {
        let cli = Cli::try_parse_from([
            "bodega",
            "--db",
            "/tmp/b.db",
            "sale",
            "create",
            "--item",
            "p1:2",
            "--item",
            "p2:1@300",
            "--payment",
            "card",
        ])
        .unwrap();
        assert_eq!(cli.db, Some(PathBuf::from("/tmp/b.db")));
        assert!(matches!(cli.command, Command::Sale(SaleCommands::Create { .. })));
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["bodega", "sync", "status", "--dry-remote"]).unwrap();
        assert!(cli.dry_remote);
    }

    #[test]
    fn test_default_filter_is_applied() {
        let subscriber = log_subscriber(EnvFilter::new(DEFAULT_LOG_FILTER));
        tracing::subscriber::with_default(subscriber, || {
            assert!(tracing::enabled!(target: "bodega_db::ledger", Level::DEBUG));
            assert!(!tracing::enabled!(target: "bodega_db::ledger", Level::TRACE));
            assert!(tracing::enabled!(target: "sqlx::query", Level::WARN));
            assert!(!tracing::enabled!(target: "sqlx::query", Level::INFO));
            assert!(tracing::enabled!(target: "hyper", Level::INFO));
            assert!(!tracing::enabled!(target: "hyper", Level::DEBUG));
        });
    }
}

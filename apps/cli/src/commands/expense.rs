//! Expense commands.

use chrono::{DateTime, Utc};
use clap::Subcommand;

use bodega_core::{EntityKind, NewExpense};

use super::print_json;
use crate::app::App;
use crate::error::CliResult;

#[derive(Subcommand, Debug)]
pub enum ExpenseCommands {
    /// Record an expense
    Add {
        description: String,
        /// Amount in cents
        #[arg(long)]
        amount: i64,
        #[arg(long)]
        category: Option<String>,
        /// RFC 3339, defaults to now
        #[arg(long)]
        date: Option<DateTime<Utc>>,
    },
}

pub async fn handle(app: &App, cmd: ExpenseCommands) -> CliResult<()> {
    match cmd {
        ExpenseCommands::Add {
            description,
            amount,
            category,
            date,
        } => {
            let expense = app
                .db
                .expenses()
                .insert(&NewExpense {
                    description,
                    category,
                    amount_cents: amount,
                    date,
                })
                .await?;
            app.changed(EntityKind::Expense, &expense.id);
            print_json(&expense)
        }
    }
}

//! Stock ledger commands.

use chrono::{DateTime, Utc};
use clap::Subcommand;
use serde::Serialize;

use bodega_core::{MovementDirection, MovementReason, MovementSummary, NewMovement};

use super::print_json;
use super::product::resolve;
use crate::app::App;
use crate::error::CliResult;

#[derive(Subcommand, Debug)]
pub enum StockCommands {
    /// Record a manual movement (e.g. `stock record RICE purchase 10`)
    Record {
        /// Product id or SKU
        product: String,
        /// PURCHASE, DAMAGED, ADJUSTMENT_INCREASE, ...
        reason: MovementReason,
        quantity: i64,
        /// Override the reason's natural direction (IN/OUT)
        #[arg(long)]
        direction: Option<MovementDirection>,
        /// Unit cost in cents, defaults to the product's cost
        #[arg(long)]
        unit_cost: Option<i64>,
        #[arg(long)]
        notes: Option<String>,
    },

    /// Movement history of a product, oldest first
    History { product: String },

    /// Totals over a window (RFC 3339 bounds, inclusive)
    Summary {
        product: String,
        #[arg(long)]
        from: Option<DateTime<Utc>>,
        #[arg(long)]
        to: Option<DateTime<Utc>>,
    },
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SummaryView {
    product_id: String,
    stock_quantity: i64,
    #[serde(flatten)]
    summary: MovementSummary,
}

pub async fn handle(app: &App, cmd: StockCommands) -> CliResult<()> {
    match cmd {
        StockCommands::Record {
            product,
            reason,
            quantity,
            direction,
            unit_cost,
            notes,
        } => {
            let product = resolve(app, &product).await?;
            let mut movement = NewMovement::new(&product.id, reason, quantity)
                .with_unit_cost(unit_cost)
                .with_notes(notes);
            if let Some(direction) = direction {
                movement.direction = direction;
            }

            let recorded = app.ledger.record(movement).await?;
            print_json(&recorded)
        }

        StockCommands::History { product } => {
            let product = resolve(app, &product).await?;
            let movements = app.ledger.movements_for(&product.id).await?;
            print_json(&movements)
        }

        StockCommands::Summary { product, from, to } => {
            let product = resolve(app, &product).await?;
            let summary = app.ledger.summary(&product.id, from, to).await?;
            print_json(&SummaryView {
                product_id: product.id,
                stock_quantity: product.stock_quantity,
                summary,
            })
        }
    }
}

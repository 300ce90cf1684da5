//! Sale commands.
//!
//! Lines are given as `--item PRODUCT:QTY` or `--item PRODUCT:QTY@CENTS`,
//! where PRODUCT is an id or a SKU.

use chrono::{DateTime, Utc};
use clap::{Args, Subcommand};
use serde::Serialize;

use bodega_core::{PaymentMethod, Sale, SaleDraft, SaleLine, StockMovement};

use super::print_json;
use crate::app::App;
use crate::error::{CliError, CliResult};

#[derive(Subcommand, Debug)]
pub enum SaleCommands {
    /// Record a sale
    Create(DraftArgs),

    /// Replace a sale's customer, lines, payment and notes
    Update {
        sale_id: String,
        #[command(flatten)]
        draft: DraftArgs,
    },

    /// Cancel a sale, restoring stock and the customer's total
    Cancel {
        sale_id: String,
        #[arg(long)]
        reason: Option<String>,
    },

    /// Show a sale with the movements it caused
    Show { sale_id: String },

    /// Recent sales, or the sales of one customer
    List {
        #[arg(long)]
        customer: Option<String>,
        #[arg(long, default_value_t = 50)]
        limit: i64,
    },

    /// Remove a sale locally without reversing anything
    DeleteLocal { sale_id: String },
}

#[derive(Args, Debug)]
pub struct DraftArgs {
    /// PRODUCT:QTY[@CENTS], repeatable
    #[arg(long = "item", required = true, value_parser = parse_line)]
    items: Vec<SaleLine>,

    #[arg(long)]
    customer: Option<String>,

    /// CASH, CARD, TRANSFER, CREDIT or OTHER
    #[arg(long, default_value = "cash")]
    payment: PaymentMethod,

    /// RFC 3339; on update, omitting it keeps the original date
    #[arg(long)]
    date: Option<DateTime<Utc>>,

    #[arg(long)]
    notes: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SaleView {
    #[serde(flatten)]
    sale: Sale,
    movements: Vec<StockMovement>,
}

pub async fn handle(app: &App, cmd: SaleCommands) -> CliResult<()> {
    match cmd {
        SaleCommands::Create(args) => {
            let draft = draft(app, args).await?;
            let sale = app.sales.create(draft).await?;
            print_json(&sale)
        }

        SaleCommands::Update { sale_id, draft: args } => {
            let draft = draft(app, args).await?;
            let sale = app.sales.update(&sale_id, draft).await?;
            print_json(&sale)
        }

        SaleCommands::Cancel { sale_id, reason } => {
            let sale = app.sales.cancel(&sale_id, reason.as_deref()).await?;
            print_json(&sale)
        }

        SaleCommands::Show { sale_id } => {
            let sale = app
                .sales
                .get(&sale_id)
                .await?
                .ok_or_else(|| CliError::not_found("Sale", &sale_id))?;
            let movements = app.ledger.movements_for_reference(&sale.id).await?;
            print_json(&SaleView { sale, movements })
        }

        SaleCommands::List { customer, limit } => {
            let sales = match customer {
                Some(customer_id) => app.sales.list_for_customer(&customer_id).await?,
                None => app.sales.list_recent(limit).await?,
            };
            print_json(&sales)
        }

        SaleCommands::DeleteLocal { sale_id } => {
            if !app.sales.delete_local(&sale_id).await? {
                return Err(CliError::not_found("Sale", &sale_id));
            }
            print_json(&serde_json::json!({ "deleted": sale_id }))
        }
    }
}

/// Builds a draft, turning SKUs into product ids. Unknown products are
/// passed through so the sale manager reports them.
async fn draft(app: &App, args: DraftArgs) -> CliResult<SaleDraft> {
    let mut items = Vec::with_capacity(args.items.len());
    for mut line in args.items {
        if app.db.products().get_by_id(&line.product_id).await?.is_none() {
            if let Some(product) = app.db.products().get_by_sku(&line.product_id).await? {
                line.product_id = product.id;
            }
        }
        items.push(line);
    }

    Ok(SaleDraft {
        customer_id: args.customer,
        items,
        date: args.date,
        payment_method: args.payment,
        notes: args.notes,
    })
}

/// Parses `PRODUCT:QTY` or `PRODUCT:QTY@CENTS`.
fn parse_line(raw: &str) -> Result<SaleLine, String> {
    let (product, rest) = raw
        .rsplit_once(':')
        .ok_or_else(|| format!("expected PRODUCT:QTY[@CENTS], got '{}'", raw))?;
    if product.trim().is_empty() {
        return Err(format!("missing product in '{}'", raw));
    }

    let (quantity, price) = match rest.split_once('@') {
        Some((quantity, price)) => (quantity, Some(price)),
        None => (rest, None),
    };

    let quantity: i64 = quantity
        .trim()
        .parse()
        .map_err(|_| format!("invalid quantity in '{}'", raw))?;
    let line = SaleLine::new(product.trim(), quantity);

    match price {
        Some(price) => {
            let cents: i64 = price
                .trim()
                .parse()
                .map_err(|_| format!("invalid price in '{}'", raw))?;
            Ok(line.at_price(cents))
        }
        None => Ok(line),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_line() {
        assert_eq!(parse_line("p1:2").unwrap(), SaleLine::new("p1", 2));
        assert_eq!(
            parse_line("RICE-1KG:3@250").unwrap(),
            SaleLine::new("RICE-1KG", 3).at_price(250)
        );
    }

    #[test]
    fn test_parse_line_rejects_garbage() {
        assert!(parse_line("p1").is_err());
        assert!(parse_line(":2").is_err());
        assert!(parse_line("p1:two").is_err());
        assert!(parse_line("p1:2@").is_err());
    }

    #[test]
    fn test_parse_line_leaves_quantity_checks_to_validation() {
        // Zero and negative quantities parse; the sale manager rejects them
        assert_eq!(parse_line("p1:0").unwrap().quantity, 0);
        assert_eq!(parse_line("p1:-1").unwrap().quantity, -1);
    }
}

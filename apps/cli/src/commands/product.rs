//! Product commands.

use clap::Subcommand;
use serde::Serialize;

use bodega_core::{NewProduct, Product, StockMovement};

use super::print_json;
use crate::app::App;
use crate::error::{CliError, CliResult};

#[derive(Subcommand, Debug)]
pub enum ProductCommands {
    /// Register a product, optionally with opening stock
    Add {
        name: String,
        /// Sale price in cents
        #[arg(long)]
        price: i64,
        /// Unit cost in cents
        #[arg(long)]
        cost: Option<i64>,
        #[arg(long)]
        sku: Option<String>,
        /// Opening stock, recorded as INITIAL_STOCK
        #[arg(long, default_value_t = 0)]
        stock: i64,
        /// Low-stock threshold
        #[arg(long, default_value_t = 0)]
        min_stock: i64,
    },

    /// List products
    List {
        /// Include deactivated products
        #[arg(long)]
        all: bool,
        #[arg(long, default_value_t = 100)]
        limit: i64,
    },

    /// Show a product with its latest movement (by id or SKU)
    Show { product: String },

    /// Products at or below their minimum stock
    LowStock,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ProductView {
    #[serde(flatten)]
    product: Product,
    last_movement: Option<StockMovement>,
    ledger_consistent: bool,
}

pub async fn handle(app: &App, cmd: ProductCommands) -> CliResult<()> {
    match cmd {
        ProductCommands::Add {
            name,
            price,
            cost,
            sku,
            stock,
            min_stock,
        } => {
            let product = app
                .ledger
                .register_product(NewProduct {
                    name,
                    sku,
                    price_cents: price,
                    cost_cents: cost,
                    minimum_stock: min_stock,
                    initial_stock: stock,
                })
                .await?;
            print_json(&product)
        }

        ProductCommands::List { all, limit } => {
            let products = app.db.products().list(all, limit).await?;
            print_json(&products)
        }

        ProductCommands::Show { product } => {
            let product = resolve(app, &product).await?;
            let view = ProductView {
                last_movement: app.ledger.last_movement(&product.id).await?,
                ledger_consistent: app.ledger.verify_consistency(&product.id).await?,
                product,
            };
            print_json(&view)
        }

        ProductCommands::LowStock => {
            let products = app.db.products().list_low_stock().await?;
            print_json(&products)
        }
    }
}

/// Finds a product by id, then by SKU.
pub async fn resolve(app: &App, id_or_sku: &str) -> CliResult<Product> {
    if let Some(product) = app.db.products().get_by_id(id_or_sku).await? {
        return Ok(product);
    }
    app.db
        .products()
        .get_by_sku(id_or_sku)
        .await?
        .ok_or_else(|| CliError::not_found("Product", id_or_sku))
}

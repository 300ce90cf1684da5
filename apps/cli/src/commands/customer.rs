//! Customer commands.

use clap::Subcommand;

use bodega_core::{EntityKind, NewCustomer};

use super::print_json;
use crate::app::App;
use crate::error::CliResult;

#[derive(Subcommand, Debug)]
pub enum CustomerCommands {
    /// Add a customer
    Add {
        name: String,
        #[arg(long)]
        phone: Option<String>,
        #[arg(long)]
        email: Option<String>,
    },

    /// List customers
    List {
        #[arg(long, default_value_t = 100)]
        limit: i64,
    },
}

pub async fn handle(app: &App, cmd: CustomerCommands) -> CliResult<()> {
    match cmd {
        CustomerCommands::Add { name, phone, email } => {
            let customer = app
                .db
                .customers()
                .insert(&NewCustomer { name, phone, email })
                .await?;
            app.changed(EntityKind::Customer, &customer.id);
            print_json(&customer)
        }

        CustomerCommands::List { limit } => {
            let customers = app.db.customers().list(limit).await?;
            print_json(&customers)
        }
    }
}

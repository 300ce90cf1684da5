//! # Command Handlers
//!
//! One module per domain. Handlers take the [`App`](crate::app::App),
//! call into bodega-db, and print the result as pretty JSON on stdout.

pub mod customer;
pub mod expense;
pub mod product;
pub mod sale;
pub mod stock;
pub mod sync;

use serde::Serialize;

use crate::error::CliResult;

/// Prints `value` as pretty JSON.
pub fn print_json<T: Serialize + ?Sized>(value: &T) -> CliResult<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

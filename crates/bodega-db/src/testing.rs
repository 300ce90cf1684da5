//! Shared fixtures for the crate's unit tests.

use std::sync::{Arc, Mutex};

use crate::ledger::Ledger;
use crate::notify::{ChangeNotifier, NoOpNotifier};
use crate::pool::{Database, DbConfig};
use bodega_core::{Customer, EntityKind, NewCustomer, NewProduct, Product};

pub(crate) async fn test_db() -> Database {
    Database::new(DbConfig::in_memory()).await.unwrap()
}

pub(crate) async fn test_ledger() -> (Database, Ledger) {
    let db = test_db().await;
    let ledger = Ledger::new(db.clone(), Arc::new(NoOpNotifier));
    (db, ledger)
}

/// Registers a product priced 250, cost 100, minimum stock 2.
pub(crate) async fn product(ledger: &Ledger, name: &str, stock: i64) -> Product {
    ledger
        .register_product(NewProduct {
            name: name.to_string(),
            sku: None,
            price_cents: 250,
            cost_cents: Some(100),
            minimum_stock: 2,
            initial_stock: stock,
        })
        .await
        .unwrap()
}

pub(crate) async fn customer(db: &Database, name: &str) -> Customer {
    db.customers()
        .insert(&NewCustomer {
            name: name.to_string(),
            phone: None,
            email: None,
        })
        .await
        .unwrap()
}

/// Keeps every signal it receives.
#[derive(Debug, Default)]
pub(crate) struct RecordingNotifier {
    seen: Mutex<Vec<(EntityKind, String)>>,
}

impl RecordingNotifier {
    pub(crate) fn take(&self) -> Vec<(EntityKind, String)> {
        std::mem::take(&mut *self.seen.lock().unwrap())
    }

    pub(crate) fn clear(&self) {
        self.seen.lock().unwrap().clear();
    }
}

impl ChangeNotifier for RecordingNotifier {
    fn record_changed(&self, kind: EntityKind, id: &str) {
        self.seen.lock().unwrap().push((kind, id.to_string()));
    }
}

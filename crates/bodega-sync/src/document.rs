//! # Remote Documents
//!
//! Turns a local record into the flat JSON object stored remotely.
//!
//! ```text
//! Sale { id, customer_id, items, total_cents, ..., sync: SyncMeta }
//!   │  serde (camelCase)
//!   ▼
//! { "id": "...", "customerId": "...", "items": [...], "totalCents": 1500,
//!   ..., "ownerId": "owner-1", "syncVersion": 3 }
//! ```
//!
//! Sync bookkeeping stays local; only the version travels.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::{SyncError, SyncResult};
use bodega_core::{EntityKind, SyncMeta};
use bodega_db::Database;

/// A record ready to push.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteDocument {
    pub kind: EntityKind,
    pub id: String,
    /// Local `sync_version` the body was built from
    pub version: i64,
    pub body: Value,
}

/// Loads the current state of a record as a document.
///
/// ## Returns
/// `None` if the record no longer exists locally.
pub async fn load_document(
    db: &Database,
    kind: EntityKind,
    id: &str,
    owner_id: &str,
) -> SyncResult<Option<RemoteDocument>> {
    let document = match kind {
        EntityKind::Product => db
            .products()
            .get_by_id(id)
            .await?
            .map(|r| build(kind, &r.id, &r.sync, &r, owner_id)),
        EntityKind::StockMovement => db
            .movements()
            .get_by_id(id)
            .await?
            .map(|r| build(kind, &r.id, &r.sync, &r, owner_id)),
        EntityKind::Sale => db
            .sales()
            .get_by_id(id)
            .await?
            .map(|r| build(kind, &r.id, &r.sync, &r, owner_id)),
        EntityKind::Customer => db
            .customers()
            .get_by_id(id)
            .await?
            .map(|r| build(kind, &r.id, &r.sync, &r, owner_id)),
        EntityKind::Expense => db
            .expenses()
            .get_by_id(id)
            .await?
            .map(|r| build(kind, &r.id, &r.sync, &r, owner_id)),
    };

    document.transpose()
}

/// Serializes `record` and stamps id, owner and version on it.
pub fn build<T: Serialize>(
    kind: EntityKind,
    id: &str,
    sync: &SyncMeta,
    record: &T,
    owner_id: &str,
) -> SyncResult<RemoteDocument> {
    let mut fields: Map<String, Value> = match serde_json::to_value(record)? {
        Value::Object(fields) => fields,
        other => {
            return Err(SyncError::SerializationFailed(format!(
                "{} {} serialized to {} instead of an object",
                kind,
                id,
                type_name(&other)
            )))
        }
    };

    fields.remove("sync");
    fields.insert("id".to_string(), Value::from(id));
    fields.insert("ownerId".to_string(), Value::from(owner_id));
    fields.insert("syncVersion".to_string(), Value::from(sync.sync_version));

    Ok(RemoteDocument {
        kind,
        id: id.to_string(),
        version: sync.sync_version,
        body: Value::Object(fields),
    })
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bodega_core::{NewCustomer, NewProduct, SaleDraft, SaleLine};
    use bodega_db::{DbConfig, Ledger, NoOpNotifier, SaleManager};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_product_document_shape() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let ledger = Ledger::new(db.clone(), Arc::new(NoOpNotifier));
        let product = ledger
            .register_product(NewProduct {
                name: "Rice".to_string(),
                sku: Some("RICE".to_string()),
                price_cents: 250,
                cost_cents: None,
                minimum_stock: 0,
                initial_stock: 4,
            })
            .await
            .unwrap();

        let doc = load_document(&db, EntityKind::Product, &product.id, "owner-1")
            .await
            .unwrap()
            .unwrap();

        assert_eq!(doc.version, product.sync.sync_version);
        let body = doc.body.as_object().unwrap();
        assert_eq!(body["id"], Value::from(product.id.clone()));
        assert_eq!(body["ownerId"], Value::from("owner-1"));
        assert_eq!(body["syncVersion"], Value::from(product.sync.sync_version));
        assert_eq!(body["stockQuantity"], Value::from(4));
        assert_eq!(body["priceCents"], Value::from(250));
        assert!(!body.contains_key("sync"));
        assert!(!body.contains_key("stock_quantity"));
    }

    #[tokio::test]
    async fn test_sale_document_carries_items() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let ledger = Ledger::new(db.clone(), Arc::new(NoOpNotifier));
        let product = ledger
            .register_product(NewProduct {
                name: "Oil".to_string(),
                sku: None,
                price_cents: 900,
                cost_cents: Some(600),
                minimum_stock: 0,
                initial_stock: 3,
            })
            .await
            .unwrap();
        let customer = db
            .customers()
            .insert(&NewCustomer {
                name: "Ana".to_string(),
                phone: None,
                email: None,
            })
            .await
            .unwrap();

        let sales = SaleManager::new(db.clone(), Arc::new(NoOpNotifier));
        let sale = sales
            .create(SaleDraft::new(vec![SaleLine::new(&product.id, 2)]).for_customer(&customer.id))
            .await
            .unwrap();

        let doc = load_document(&db, EntityKind::Sale, &sale.id, "o")
            .await
            .unwrap()
            .unwrap();
        let body = doc.body.as_object().unwrap();
        assert_eq!(body["customerId"], Value::from(customer.id.clone()));
        assert_eq!(body["totalCents"], Value::from(1800));
        assert_eq!(body["status"], Value::from("ACTIVE"));
        assert_eq!(body["items"].as_array().unwrap().len(), 1);
        assert_eq!(body["items"][0]["productName"], Value::from("Oil"));
    }

    #[tokio::test]
    async fn test_missing_record() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let doc = load_document(&db, EntityKind::Expense, "gone", "o").await.unwrap();
        assert!(doc.is_none());
    }
}

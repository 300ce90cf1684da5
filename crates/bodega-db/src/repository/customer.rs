//! # Customer Repository
//!
//! Customers and the running purchase total.
//!
//! ## Purchase Total
//! ```text
//! sale created   (ACTIVE, total T)   → apply_delta(+T, sale.date)
//! sale updated   (T_old → T_new)     → apply_delta(-T_old), apply_delta(+T_new, date)
//! sale canceled  (total T)           → apply_delta(-T)
//!
//! total_purchases_cents = MAX(0, total_purchases_cents + delta)
//! ```
//! The floor at zero keeps the aggregate sane even if history was edited
//! outside the manager (e.g. a locally deleted sale).

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::DbResult;
use bodega_core::validation::validate_new_customer;
use bodega_core::{Customer, NewCustomer, SyncMeta};

macro_rules! customer_columns {
    () => {
        "id, name, phone, email, total_purchases_cents, last_purchase_date, created_at, \
         updated_at, needs_sync, last_sync_error, last_synced_at, sync_version"
    };
}

/// Repository for customer database operations.
#[derive(Debug, Clone)]
pub struct CustomerRepository {
    pool: SqlitePool,
}

impl CustomerRepository {
    /// Creates a new CustomerRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CustomerRepository { pool }
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Customer>> {
        let customer = sqlx::query_as::<_, Customer>(concat!(
            "SELECT ",
            customer_columns!(),
            " FROM customers WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(customer)
    }

    /// Lists customers by name.
    pub async fn list(&self, limit: i64) -> DbResult<Vec<Customer>> {
        let customers = sqlx::query_as::<_, Customer>(concat!(
            "SELECT ",
            customer_columns!(),
            " FROM customers ORDER BY name LIMIT ?"
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(customers)
    }

    /// Creates a customer with a zero purchase total.
    pub async fn insert(&self, new: &NewCustomer) -> DbResult<Customer> {
        validate_new_customer(new)?;

        let now = Utc::now();
        let customer = Customer {
            id: Uuid::new_v4().to_string(),
            name: new.name.trim().to_string(),
            phone: new.phone.clone(),
            email: new.email.clone(),
            total_purchases_cents: 0,
            last_purchase_date: None,
            created_at: now,
            updated_at: now,
            sync: SyncMeta::pending(),
        };

        sqlx::query(
            "INSERT INTO customers (
                id, name, phone, email, total_purchases_cents, last_purchase_date,
                created_at, updated_at, needs_sync, sync_version
            ) VALUES (?, ?, ?, ?, 0, NULL, ?, ?, 1, ?)",
        )
        .bind(&customer.id)
        .bind(&customer.name)
        .bind(&customer.phone)
        .bind(&customer.email)
        .bind(customer.created_at)
        .bind(customer.updated_at)
        .bind(customer.sync.sync_version)
        .execute(&self.pool)
        .await?;

        debug!(id = %customer.id, "Inserted customer");
        Ok(customer)
    }

    /// Applies a purchase delta outside of any sale transaction.
    ///
    /// ## Returns
    /// `false` if the customer doesn't exist.
    pub async fn apply_delta(
        &self,
        customer_id: &str,
        delta_cents: i64,
        last_purchase_date: Option<DateTime<Utc>>,
    ) -> DbResult<bool> {
        let mut conn = self.pool.acquire().await?;
        Self::apply_delta_in(&mut conn, customer_id, delta_cents, last_purchase_date).await
    }

    /// Applies a purchase delta inside a caller's transaction.
    ///
    /// The total is floored at zero; the last purchase date is only
    /// overwritten when one is given.
    pub(crate) async fn apply_delta_in(
        conn: &mut SqliteConnection,
        customer_id: &str,
        delta_cents: i64,
        last_purchase_date: Option<DateTime<Utc>>,
    ) -> DbResult<bool> {
        let result = sqlx::query(
            "UPDATE customers SET
                total_purchases_cents = MAX(0, total_purchases_cents + ?),
                last_purchase_date = COALESCE(?, last_purchase_date),
                updated_at = ?,
                needs_sync = 1, sync_version = sync_version + 1
             WHERE id = ?",
        )
        .bind(delta_cents)
        .bind(last_purchase_date)
        .bind(Utc::now())
        .bind(customer_id)
        .execute(&mut *conn)
        .await?;

        debug!(customer_id = %customer_id, delta_cents, "Applied customer delta");
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use crate::testing::{customer, test_db};
    use chrono::Utc;

    #[tokio::test]
    async fn test_delta_accumulates_and_floors_at_zero() {
        let db = test_db().await;
        let ana = customer(&db, "Ana").await;
        let repo = db.customers();
        let when = Utc::now();

        assert!(repo.apply_delta(&ana.id, 1_500, Some(when)).await.unwrap());
        assert!(repo.apply_delta(&ana.id, 500, None).await.unwrap());
        let stored = repo.get_by_id(&ana.id).await.unwrap().unwrap();
        assert_eq!(stored.total_purchases_cents, 2_000);
        assert!(stored.last_purchase_date.is_some());

        repo.apply_delta(&ana.id, -5_000, None).await.unwrap();
        let stored = repo.get_by_id(&ana.id).await.unwrap().unwrap();
        assert_eq!(stored.total_purchases_cents, 0);
        assert!(stored.sync.needs_sync);
        assert_eq!(stored.sync.sync_version, 4);
    }

    #[tokio::test]
    async fn test_delta_for_unknown_customer() {
        let db = test_db().await;
        assert!(!db.customers().apply_delta("ghost", 10, None).await.unwrap());
    }
}

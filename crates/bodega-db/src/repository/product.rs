//! # Product Repository
//!
//! Product reads and the non-stock writes.
//!
//! `stock_quantity` is never written here. Opening stock and every later
//! change go through [`Ledger`](crate::Ledger) so the aggregate always
//! matches the latest movement.

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use bodega_core::validation::validate_product_details;
use bodega_core::{Product, ProductDetails};

macro_rules! product_columns {
    () => {
        "id, name, sku, price_cents, cost_cents, stock_quantity, minimum_stock, is_active, \
         created_at, updated_at, needs_sync, last_sync_error, last_synced_at, sync_version"
    };
}

/// Repository for product database operations.
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Gets a product by ID, active or not.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Product>> {
        let product = sqlx::query_as::<_, Product>(concat!(
            "SELECT ",
            product_columns!(),
            " FROM products WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(product)
    }

    /// Gets a product by SKU.
    pub async fn get_by_sku(&self, sku: &str) -> DbResult<Option<Product>> {
        let product = sqlx::query_as::<_, Product>(concat!(
            "SELECT ",
            product_columns!(),
            " FROM products WHERE sku = ?"
        ))
        .bind(sku)
        .fetch_optional(&self.pool)
        .await?;

        Ok(product)
    }

    /// Lists products ordered by name.
    pub async fn list(&self, include_inactive: bool, limit: i64) -> DbResult<Vec<Product>> {
        let products = sqlx::query_as::<_, Product>(concat!(
            "SELECT ",
            product_columns!(),
            " FROM products WHERE (is_active = 1 OR ?1) ORDER BY name LIMIT ?2"
        ))
        .bind(include_inactive)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        debug!(count = products.len(), "Listed products");
        Ok(products)
    }

    /// Active products at or below their minimum stock, emptiest first.
    pub async fn list_low_stock(&self) -> DbResult<Vec<Product>> {
        let products = sqlx::query_as::<_, Product>(concat!(
            "SELECT ",
            product_columns!(),
            " FROM products WHERE is_active = 1 AND stock_quantity <= minimum_stock \
              ORDER BY stock_quantity, name"
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(products)
    }

    /// Inserts a product row inside a caller's transaction.
    ///
    /// The row's stock must be 0; opening stock is recorded through the
    /// ledger afterwards in the same transaction.
    pub(crate) async fn insert_in(conn: &mut SqliteConnection, product: &Product) -> DbResult<()> {
        if product.stock_quantity != 0 {
            return Err(DbError::InvariantViolation(format!(
                "product {} inserted with stock {}; stock only enters through the ledger",
                product.id, product.stock_quantity
            )));
        }

        sqlx::query(
            "INSERT INTO products (
                id, name, sku, price_cents, cost_cents, stock_quantity, minimum_stock,
                is_active, created_at, updated_at, needs_sync, sync_version
            ) VALUES (?, ?, ?, ?, ?, 0, ?, ?, ?, ?, 1, ?)",
        )
        .bind(&product.id)
        .bind(&product.name)
        .bind(&product.sku)
        .bind(product.price_cents)
        .bind(product.cost_cents)
        .bind(product.minimum_stock)
        .bind(product.is_active)
        .bind(product.created_at)
        .bind(product.updated_at)
        .bind(product.sync.sync_version)
        .execute(&mut *conn)
        .await?;

        debug!(id = %product.id, name = %product.name, "Inserted product");
        Ok(())
    }

    /// Updates name, SKU, prices, minimum stock and the active flag.
    ///
    /// ## Returns
    /// The product as stored after the update.
    pub async fn update_details(&self, id: &str, details: &ProductDetails) -> DbResult<Product> {
        validate_product_details(details)?;

        let result = sqlx::query(
            "UPDATE products SET
                name = ?, sku = ?, price_cents = ?, cost_cents = ?, minimum_stock = ?,
                is_active = ?, updated_at = ?,
                needs_sync = 1, sync_version = sync_version + 1
             WHERE id = ?",
        )
        .bind(&details.name)
        .bind(&details.sku)
        .bind(details.price_cents)
        .bind(details.cost_cents)
        .bind(details.minimum_stock)
        .bind(details.is_active)
        .bind(Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        debug!(id = %id, "Updated product details");
        self.get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("Product", id))
    }
}

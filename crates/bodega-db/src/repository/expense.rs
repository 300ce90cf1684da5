//! # Expense Repository

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::DbResult;
use bodega_core::validation::validate_new_expense;
use bodega_core::{Expense, NewExpense, SyncMeta};

macro_rules! expense_columns {
    () => {
        "id, description, category, amount_cents, date, created_at, updated_at, needs_sync, \
         last_sync_error, last_synced_at, sync_version"
    };
}

/// Repository for expense database operations.
#[derive(Debug, Clone)]
pub struct ExpenseRepository {
    pool: SqlitePool,
}

impl ExpenseRepository {
    /// Creates a new ExpenseRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ExpenseRepository { pool }
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Expense>> {
        let expense = sqlx::query_as::<_, Expense>(concat!(
            "SELECT ",
            expense_columns!(),
            " FROM expenses WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(expense)
    }

    /// Most recent expenses first.
    pub async fn list(&self, limit: i64) -> DbResult<Vec<Expense>> {
        let expenses = sqlx::query_as::<_, Expense>(concat!(
            "SELECT ",
            expense_columns!(),
            " FROM expenses ORDER BY date DESC LIMIT ?"
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(expenses)
    }

    /// Records an expense dated now unless a date is given.
    pub async fn insert(&self, new: &NewExpense) -> DbResult<Expense> {
        validate_new_expense(new)?;

        let now = Utc::now();
        let expense = Expense {
            id: Uuid::new_v4().to_string(),
            description: new.description.trim().to_string(),
            category: new.category.clone(),
            amount_cents: new.amount_cents,
            date: new.date.unwrap_or(now),
            created_at: now,
            updated_at: now,
            sync: SyncMeta::pending(),
        };

        sqlx::query(
            "INSERT INTO expenses (
                id, description, category, amount_cents, date, created_at, updated_at,
                needs_sync, sync_version
            ) VALUES (?, ?, ?, ?, ?, ?, ?, 1, ?)",
        )
        .bind(&expense.id)
        .bind(&expense.description)
        .bind(&expense.category)
        .bind(expense.amount_cents)
        .bind(expense.date)
        .bind(expense.created_at)
        .bind(expense.updated_at)
        .bind(expense.sync.sync_version)
        .execute(&self.pool)
        .await?;

        debug!(id = %expense.id, amount_cents = expense.amount_cents, "Inserted expense");
        Ok(expense)
    }
}

#[cfg(test)]
mod tests {
    use crate::testing::test_db;
    use bodega_core::NewExpense;

    #[tokio::test]
    async fn test_insert_and_read_back() {
        let db = test_db().await;
        let expense = db
            .expenses()
            .insert(&NewExpense {
                description: "Rent".to_string(),
                category: Some("fixed".to_string()),
                amount_cents: 80_000,
                date: None,
            })
            .await
            .unwrap();

        let stored = db.expenses().get_by_id(&expense.id).await.unwrap().unwrap();
        assert_eq!(stored.amount_cents, 80_000);
        assert!(stored.sync.needs_sync);
        assert_eq!(db.expenses().list(10).await.unwrap().len(), 1);
    }
}

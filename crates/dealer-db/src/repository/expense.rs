//! # Expense Repository
//!
//! Operating expenses, read by analytics as per-currency totals.

use chrono::NaiveDate;
use dealer_core::expense::OperatingExpense;
use dealer_core::Money;
use sqlx::SqlitePool;
use std::collections::BTreeMap;
use tracing::debug;

use crate::error::DbResult;

#[derive(Debug, Clone)]
pub struct ExpenseRepository {
    pool: SqlitePool,
}

impl ExpenseRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ExpenseRepository { pool }
    }

    pub async fn insert(&self, expense: &OperatingExpense) -> DbResult<()> {
        debug!(id = %expense.id, amount_cents = expense.amount_cents, "Inserting expense");

        sqlx::query(
            r#"
            INSERT INTO expenses (id, category, description, amount_cents, currency, incurred_on)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(&expense.id)
        .bind(&expense.category)
        .bind(&expense.description)
        .bind(expense.amount_cents)
        .bind(&expense.currency)
        .bind(expense.incurred_on)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Expenses incurred within `[from, to]`, oldest first.
    pub async fn list_between(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> DbResult<Vec<OperatingExpense>> {
        let expenses: Vec<OperatingExpense> = sqlx::query_as(
            r#"
            SELECT id, category, description, amount_cents, currency, incurred_on
            FROM expenses
            WHERE incurred_on >= ?1 AND incurred_on <= ?2
            ORDER BY incurred_on, id
            "#,
        )
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;

        Ok(expenses)
    }

    /// Total per currency within `[from, to]`.
    pub async fn totals_by_currency(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> DbResult<BTreeMap<String, Money>> {
        let rows: Vec<(String, i64)> = sqlx::query_as(
            r#"
            SELECT currency, COALESCE(SUM(amount_cents), 0)
            FROM expenses
            WHERE incurred_on >= ?1 AND incurred_on <= ?2
            GROUP BY currency
            "#,
        )
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(currency, cents)| (currency, Money::from_cents(cents)))
            .collect())
    }
}

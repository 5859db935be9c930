//! # Quotation Repository
//!
//! Quotations with their append-only status history.
//!
//! Status updates are compare-and-swap on the previous status: two
//! concurrent transitions of the same quotation cannot both win.

use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::{FromRow, SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use dealer_core::{
    CustomerSnapshot, LineItem, MoneySummary, Quotation, QuotationStatus, StatusChange,
    StatusHistory,
};

#[derive(Debug, FromRow)]
struct QuotationRow {
    id: String,
    quotation_number: String,
    sequence: i64,
    customer: Json<CustomerSnapshot>,
    items: Json<Vec<LineItem>>,
    currency: String,
    summary: Json<MoneySummary>,
    status: QuotationStatus,
    valid_till: DateTime<Utc>,
    notes: Option<String>,
    created_by: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, FromRow)]
struct HistoryRow {
    status: QuotationStatus,
    changed_at: DateTime<Utc>,
    actor_id: String,
}

const SELECT_QUOTATION: &str = r#"
    SELECT id, quotation_number, sequence, customer, items, currency, summary,
           status, valid_till, notes, created_by, created_at, updated_at
    FROM quotations
"#;

/// Repository for quotations.
#[derive(Debug, Clone)]
pub struct QuotationRepository {
    pool: SqlitePool,
}

impl QuotationRepository {
    pub fn new(pool: SqlitePool) -> Self {
        QuotationRepository { pool }
    }

    /// Gets a quotation with its full history.
    pub async fn get(&self, id: &str) -> DbResult<Option<Quotation>> {
        let mut conn = self.pool.acquire().await?;
        Self::get_in(&mut conn, id).await
    }

    pub async fn get_in(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Quotation>> {
        let sql = format!("{SELECT_QUOTATION} WHERE id = ?1");
        let row: Option<QuotationRow> = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;

        match row {
            Some(row) => Ok(Some(with_history(conn, row).await?)),
            None => Ok(None),
        }
    }

    /// Inserts a new quotation and its initial history.
    pub async fn insert_in(conn: &mut SqliteConnection, quotation: &Quotation) -> DbResult<()> {
        debug!(
            id = %quotation.id,
            quotation_number = %quotation.quotation_number,
            "Inserting quotation"
        );

        sqlx::query(
            r#"
            INSERT INTO quotations (
                id, quotation_number, sequence, customer_id, customer, items,
                currency, summary, total_cents, status, valid_till, notes,
                created_by, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)
            "#,
        )
        .bind(&quotation.id)
        .bind(&quotation.quotation_number)
        .bind(quotation.sequence)
        .bind(&quotation.customer.customer_id)
        .bind(Json(&quotation.customer))
        .bind(Json(&quotation.items))
        .bind(&quotation.currency)
        .bind(Json(&quotation.summary))
        .bind(quotation.summary.total_cents)
        .bind(quotation.status)
        .bind(quotation.valid_till)
        .bind(&quotation.notes)
        .bind(&quotation.created_by)
        .bind(quotation.created_at)
        .bind(quotation.updated_at)
        .execute(&mut *conn)
        .await?;

        append_history(conn, &quotation.id, quotation.history.entries()).await
    }

    /// Persists a transition made in memory.
    ///
    /// `expected` is the status the quotation had when it was loaded; the
    /// entries of `quotation.history` after `persisted_len` are appended.
    ///
    /// ## Errors
    /// `StaleState` when the stored status no longer equals `expected`.
    pub async fn update_status_in(
        conn: &mut SqliteConnection,
        quotation: &Quotation,
        expected: QuotationStatus,
        persisted_len: usize,
    ) -> DbResult<()> {
        debug!(
            id = %quotation.id,
            from = %expected,
            to = %quotation.status,
            "Updating quotation status"
        );

        let result = sqlx::query(
            r#"
            UPDATE quotations
            SET status = ?1, updated_at = ?2
            WHERE id = ?3 AND status = ?4
            "#,
        )
        .bind(quotation.status)
        .bind(quotation.updated_at)
        .bind(&quotation.id)
        .bind(expected)
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::stale("Quotation", quotation.id.as_str()));
        }

        append_history(conn, &quotation.id, quotation.history.since(persisted_len)).await
    }

    /// Open quotations whose validity ended before `now`.
    pub async fn list_overdue(&self, now: DateTime<Utc>) -> DbResult<Vec<Quotation>> {
        let mut conn = self.pool.acquire().await?;

        let sql = format!(
            "{SELECT_QUOTATION} WHERE status NOT IN ('rejected', 'expired', 'converted') \
             ORDER BY sequence"
        );
        let rows: Vec<QuotationRow> = sqlx::query_as(&sql).fetch_all(&mut *conn).await?;

        let mut overdue = Vec::new();
        for row in rows {
            if row.valid_till < now {
                overdue.push(with_history(&mut conn, row).await?);
            }
        }
        Ok(overdue)
    }

    /// Lists quotations, newest first.
    pub async fn list(&self, limit: i64) -> DbResult<Vec<Quotation>> {
        let mut conn = self.pool.acquire().await?;

        let sql = format!("{SELECT_QUOTATION} ORDER BY sequence DESC LIMIT ?1");
        let rows: Vec<QuotationRow> = sqlx::query_as(&sql)
            .bind(limit)
            .fetch_all(&mut *conn)
            .await?;

        let mut quotations = Vec::with_capacity(rows.len());
        for row in rows {
            quotations.push(with_history(&mut conn, row).await?);
        }
        Ok(quotations)
    }

    /// Deletes a quotation and its history.
    ///
    /// Held units are NOT released; the caller decides what happens to them.
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        debug!(id = %id, "Deleting quotation");

        let result = sqlx::query("DELETE FROM quotations WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Quotation", id));
        }
        Ok(())
    }

    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM quotations")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

async fn with_history(conn: &mut SqliteConnection, row: QuotationRow) -> DbResult<Quotation> {
    let history: Vec<HistoryRow> = sqlx::query_as(
        r#"
        SELECT status, changed_at, actor_id
        FROM quotation_status_history
        WHERE quotation_id = ?1
        ORDER BY id
        "#,
    )
    .bind(&row.id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(Quotation {
        id: row.id,
        quotation_number: row.quotation_number,
        sequence: row.sequence,
        customer: row.customer.0,
        items: row.items.0,
        currency: row.currency,
        summary: row.summary.0,
        status: row.status,
        valid_till: row.valid_till,
        notes: row.notes,
        history: StatusHistory::from_entries(
            history
                .into_iter()
                .map(|h| StatusChange {
                    status: h.status,
                    changed_at: h.changed_at,
                    actor_id: h.actor_id,
                })
                .collect(),
        ),
        created_by: row.created_by,
        created_at: row.created_at,
        updated_at: row.updated_at,
    })
}

async fn append_history(
    conn: &mut SqliteConnection,
    quotation_id: &str,
    entries: &[StatusChange<QuotationStatus>],
) -> DbResult<()> {
    for entry in entries {
        sqlx::query(
            r#"
            INSERT INTO quotation_status_history (quotation_id, status, changed_at, actor_id)
            VALUES (?1, ?2, ?3, ?4)
            "#,
        )
        .bind(quotation_id)
        .bind(entry.status)
        .bind(entry.changed_at)
        .bind(&entry.actor_id)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::{format_document_number, next_sequence, QUOTATION_SEQUENCE};
    use crate::{Database, DbConfig};
    use chrono::Duration;
    use dealer_core::Discount;

    async fn draft(db: &Database, valid_for: Duration) -> Quotation {
        let now = Utc::now();
        let mut conn = db.pool().acquire().await.unwrap();
        let sequence = next_sequence(&mut conn, QUOTATION_SEQUENCE).await.unwrap();

        Quotation {
            id: uuid::Uuid::new_v4().to_string(),
            quotation_number: format_document_number("QT", sequence),
            sequence,
            customer: CustomerSnapshot {
                customer_id: "c-1".to_string(),
                name: "Layla Nasser".to_string(),
                email: Some("layla@example.com".to_string()),
                phone: None,
                address: None,
                trn: None,
            },
            items: Vec::new(),
            currency: "AED".to_string(),
            summary: MoneySummary {
                subtotal_cents: 100_000,
                discount: Discount::None,
                discount_cents: 0,
                additional_expenses: Vec::new(),
                expenses_cents: 0,
                taxable_cents: 100_000,
                vat_rate_bps: 500,
                vat_cents: 5_000,
                total_cents: 105_000,
            },
            status: QuotationStatus::Draft,
            valid_till: now + valid_for,
            notes: None,
            history: StatusHistory::start(QuotationStatus::Draft, now, "u-1"),
            created_by: "u-1".to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    async fn insert(db: &Database, q: &Quotation) {
        let mut conn = db.pool().acquire().await.unwrap();
        QuotationRepository::insert_in(&mut conn, q).await.unwrap();
    }

    #[tokio::test]
    async fn test_insert_and_get_roundtrip() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let q = draft(&db, Duration::days(30)).await;
        insert(&db, &q).await;

        let loaded = db.quotations().get(&q.id).await.unwrap().unwrap();
        assert_eq!(loaded.quotation_number, "QT-00001");
        assert_eq!(loaded.customer, q.customer);
        assert_eq!(loaded.summary, q.summary);
        assert_eq!(loaded.history.len(), 1);
    }

    #[tokio::test]
    async fn test_status_update_appends_history() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut q = draft(&db, Duration::days(30)).await;
        insert(&db, &q).await;

        let persisted = q.history.len();
        q.transition(QuotationStatus::Sent, "u-2", Utc::now()).unwrap();

        let mut conn = db.pool().acquire().await.unwrap();
        QuotationRepository::update_status_in(&mut conn, &q, QuotationStatus::Draft, persisted)
            .await
            .unwrap();
        drop(conn);

        let loaded = db.quotations().get(&q.id).await.unwrap().unwrap();
        assert_eq!(loaded.status, QuotationStatus::Sent);
        assert_eq!(loaded.history.len(), 2);
        assert_eq!(loaded.history.latest().unwrap().actor_id, "u-2");
    }

    #[tokio::test]
    async fn test_status_update_is_compare_and_swap() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut q = draft(&db, Duration::days(30)).await;
        insert(&db, &q).await;

        q.transition(QuotationStatus::Sent, "u-2", Utc::now()).unwrap();

        // Caller believed the quotation was still in review
        let mut conn = db.pool().acquire().await.unwrap();
        let result =
            QuotationRepository::update_status_in(&mut conn, &q, QuotationStatus::Review, 1).await;
        assert!(matches!(result, Err(DbError::StaleState { .. })));
    }

    #[tokio::test]
    async fn test_duplicate_number_rejected() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let q = draft(&db, Duration::days(30)).await;
        insert(&db, &q).await;

        let mut copy = q.clone();
        copy.id = "another".to_string();
        let mut conn = db.pool().acquire().await.unwrap();
        let result = QuotationRepository::insert_in(&mut conn, &copy).await;
        assert!(matches!(result, Err(DbError::UniqueViolation { .. })));
    }

    #[tokio::test]
    async fn test_list_overdue() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let fresh = draft(&db, Duration::days(30)).await;
        let stale = draft(&db, Duration::days(-1)).await;
        insert(&db, &fresh).await;
        insert(&db, &stale).await;

        let overdue = db.quotations().list_overdue(Utc::now()).await.unwrap();
        assert_eq!(overdue.len(), 1);
        assert_eq!(overdue[0].id, stale.id);
    }

    #[tokio::test]
    async fn test_delete() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let q = draft(&db, Duration::days(30)).await;
        insert(&db, &q).await;

        db.quotations().delete(&q.id).await.unwrap();
        assert!(db.quotations().get(&q.id).await.unwrap().is_none());
        assert!(matches!(
            db.quotations().delete(&q.id).await,
            Err(DbError::NotFound { .. })
        ));
    }
}

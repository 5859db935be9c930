//! # Invoice Repository
//!
//! Invoices are written once from an approved quotation. Afterwards only the
//! payment sub-record and status change.

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::types::Json;
use sqlx::{FromRow, SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use dealer_core::{
    CompanyProfile, CustomerSnapshot, Invoice, InvoiceStatus, LineItem, MoneySummary,
    PaymentMethod, PaymentRecord, PaymentStatus, StatusChange, StatusHistory,
};

#[derive(Debug, FromRow)]
struct InvoiceRow {
    id: String,
    invoice_number: String,
    sequence: i64,
    quotation_id: String,
    quotation_number: String,
    customer: Json<CustomerSnapshot>,
    items: Json<Vec<LineItem>>,
    currency: String,
    summary: Json<MoneySummary>,
    company: Json<CompanyProfile>,
    payment_status: PaymentStatus,
    amount_paid_cents: i64,
    payment_method: Option<PaymentMethod>,
    last_paid_at: Option<DateTime<Utc>>,
    invoice_date: NaiveDate,
    due_date: NaiveDate,
    status: InvoiceStatus,
    notes: Option<String>,
    created_by: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, FromRow)]
struct HistoryRow {
    status: InvoiceStatus,
    changed_at: DateTime<Utc>,
    actor_id: String,
}

const SELECT_INVOICE: &str = r#"
    SELECT id, invoice_number, sequence, quotation_id, quotation_number,
           customer, items, currency, summary, company,
           payment_status, amount_paid_cents, payment_method, last_paid_at,
           invoice_date, due_date, status, notes, created_by, created_at, updated_at
    FROM invoices
"#;

/// Repository for invoices.
#[derive(Debug, Clone)]
pub struct InvoiceRepository {
    pool: SqlitePool,
}

impl InvoiceRepository {
    pub fn new(pool: SqlitePool) -> Self {
        InvoiceRepository { pool }
    }

    pub async fn get(&self, id: &str) -> DbResult<Option<Invoice>> {
        let mut conn = self.pool.acquire().await?;
        Self::get_in(&mut conn, id).await
    }

    pub async fn get_in(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Invoice>> {
        let sql = format!("{SELECT_INVOICE} WHERE id = ?1");
        let row: Option<InvoiceRow> = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;

        match row {
            Some(row) => Ok(Some(with_history(conn, row).await?)),
            None => Ok(None),
        }
    }

    /// The invoice created from a quotation, if any.
    pub async fn get_by_quotation(&self, quotation_id: &str) -> DbResult<Option<Invoice>> {
        let mut conn = self.pool.acquire().await?;

        let sql = format!("{SELECT_INVOICE} WHERE quotation_id = ?1");
        let row: Option<InvoiceRow> = sqlx::query_as(&sql)
            .bind(quotation_id)
            .fetch_optional(&mut *conn)
            .await?;

        match row {
            Some(row) => Ok(Some(with_history(&mut conn, row).await?)),
            None => Ok(None),
        }
    }

    /// Invoices dated within `[from, to]`, oldest first.
    pub async fn list_between(&self, from: NaiveDate, to: NaiveDate) -> DbResult<Vec<Invoice>> {
        let mut conn = self.pool.acquire().await?;

        let sql = format!(
            "{SELECT_INVOICE} WHERE invoice_date >= ?1 AND invoice_date <= ?2 \
             ORDER BY invoice_date, sequence"
        );
        let rows: Vec<InvoiceRow> = sqlx::query_as(&sql)
            .bind(from)
            .bind(to)
            .fetch_all(&mut *conn)
            .await?;

        let mut invoices = Vec::with_capacity(rows.len());
        for row in rows {
            invoices.push(with_history(&mut conn, row).await?);
        }
        Ok(invoices)
    }

    /// Inserts an invoice and its initial history.
    ///
    /// ## Errors
    /// `UniqueViolation` when the quotation already has an invoice.
    pub async fn insert_in(conn: &mut SqliteConnection, invoice: &Invoice) -> DbResult<()> {
        debug!(
            id = %invoice.id,
            invoice_number = %invoice.invoice_number,
            quotation_id = %invoice.quotation_id,
            "Inserting invoice"
        );

        sqlx::query(
            r#"
            INSERT INTO invoices (
                id, invoice_number, sequence, quotation_id, quotation_number,
                customer, items, currency, summary, company, total_cents,
                payment_status, amount_paid_cents, payment_method, last_paid_at,
                invoice_date, due_date, status, notes, created_by, created_at, updated_at
            ) VALUES (
                ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11,
                ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20, ?21, ?22
            )
            "#,
        )
        .bind(&invoice.id)
        .bind(&invoice.invoice_number)
        .bind(invoice.sequence)
        .bind(&invoice.quotation_id)
        .bind(&invoice.quotation_number)
        .bind(Json(&invoice.customer))
        .bind(Json(&invoice.items))
        .bind(&invoice.currency)
        .bind(Json(&invoice.summary))
        .bind(Json(&invoice.company))
        .bind(invoice.summary.total_cents)
        .bind(invoice.payment.status)
        .bind(invoice.payment.amount_paid_cents)
        .bind(invoice.payment.method)
        .bind(invoice.payment.last_paid_at)
        .bind(invoice.invoice_date)
        .bind(invoice.due_date)
        .bind(invoice.status)
        .bind(&invoice.notes)
        .bind(&invoice.created_by)
        .bind(invoice.created_at)
        .bind(invoice.updated_at)
        .execute(&mut *conn)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { field, .. } if field.contains("quotation_id") => {
                DbError::duplicate("invoice.quotation_id", invoice.quotation_id.as_str())
            }
            other => other,
        })?;

        append_history(conn, &invoice.id, invoice.history.entries()).await
    }

    /// Persists a payment recorded in memory.
    ///
    /// Compare-and-swap on the previously stored `amount_paid_cents`, so two
    /// concurrent payments cannot overwrite each other.
    pub async fn save_payment(
        &self,
        invoice: &Invoice,
        expected_paid_cents: i64,
        persisted_history: usize,
    ) -> DbResult<()> {
        debug!(
            id = %invoice.id,
            amount_paid_cents = invoice.payment.amount_paid_cents,
            "Saving invoice payment"
        );

        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            UPDATE invoices
            SET payment_status = ?1,
                amount_paid_cents = ?2,
                payment_method = ?3,
                last_paid_at = ?4,
                status = ?5,
                updated_at = ?6
            WHERE id = ?7 AND amount_paid_cents = ?8
            "#,
        )
        .bind(invoice.payment.status)
        .bind(invoice.payment.amount_paid_cents)
        .bind(invoice.payment.method)
        .bind(invoice.payment.last_paid_at)
        .bind(invoice.status)
        .bind(invoice.updated_at)
        .bind(&invoice.id)
        .bind(expected_paid_cents)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::stale("Invoice", invoice.id.as_str()));
        }

        append_history(&mut tx, &invoice.id, invoice.history.since(persisted_history)).await?;
        tx.commit().await?;
        Ok(())
    }

    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM invoices")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

async fn with_history(conn: &mut SqliteConnection, row: InvoiceRow) -> DbResult<Invoice> {
    let history: Vec<HistoryRow> = sqlx::query_as(
        r#"
        SELECT status, changed_at, actor_id
        FROM invoice_status_history
        WHERE invoice_id = ?1
        ORDER BY id
        "#,
    )
    .bind(&row.id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(Invoice {
        id: row.id,
        invoice_number: row.invoice_number,
        sequence: row.sequence,
        quotation_id: row.quotation_id,
        quotation_number: row.quotation_number,
        customer: row.customer.0,
        items: row.items.0,
        currency: row.currency,
        summary: row.summary.0,
        payment: PaymentRecord {
            status: row.payment_status,
            amount_paid_cents: row.amount_paid_cents,
            method: row.payment_method,
            last_paid_at: row.last_paid_at,
        },
        invoice_date: row.invoice_date,
        due_date: row.due_date,
        status: row.status,
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
        company: row.company.0,
        notes: row.notes,
        created_by: row.created_by,
        created_at: row.created_at,
        updated_at: row.updated_at,
    })
}

async fn append_history(
    conn: &mut SqliteConnection,
    invoice_id: &str,
    entries: &[StatusChange<InvoiceStatus>],
) -> DbResult<()> {
    for entry in entries {
        sqlx::query(
            r#"
            INSERT INTO invoice_status_history (invoice_id, status, changed_at, actor_id)
            VALUES (?1, ?2, ?3, ?4)
            "#,
        )
        .bind(invoice_id)
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
    use crate::{Database, DbConfig};
    use dealer_core::{Discount, Money};

    fn invoice(id: &str, quotation_id: &str, sequence: i64, on: NaiveDate) -> Invoice {
        let now = Utc::now();
        Invoice {
            id: id.to_string(),
            invoice_number: format!("INV-{sequence:05}"),
            sequence,
            quotation_id: quotation_id.to_string(),
            quotation_number: "QT-00001".to_string(),
            customer: CustomerSnapshot {
                customer_id: "c-1".to_string(),
                name: "Yusuf Rahman".to_string(),
                email: None,
                phone: None,
                address: None,
                trn: Some("100200300400003".to_string()),
            },
            items: Vec::new(),
            currency: "AED".to_string(),
            summary: MoneySummary {
                subtotal_cents: 200_000,
                discount: Discount::None,
                discount_cents: 0,
                additional_expenses: Vec::new(),
                expenses_cents: 0,
                taxable_cents: 200_000,
                vat_rate_bps: 500,
                vat_cents: 10_000,
                total_cents: 210_000,
            },
            payment: PaymentRecord::default(),
            invoice_date: on,
            due_date: on,
            status: InvoiceStatus::Issued,
            history: StatusHistory::start(InvoiceStatus::Issued, now, "u-1"),
            company: CompanyProfile {
                name: "Al Noor Motors".to_string(),
                address: Some("Sheikh Zayed Road, Dubai".to_string()),
                trn: None,
                vat_rate_bps: 500,
                bank_name: None,
                bank_account: None,
            },
            notes: None,
            created_by: "u-1".to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    async fn insert(db: &Database, inv: &Invoice) -> DbResult<()> {
        let mut conn = db.pool().acquire().await.unwrap();
        InvoiceRepository::insert_in(&mut conn, inv).await
    }

    #[tokio::test]
    async fn test_insert_and_get() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let inv = invoice("i-1", "q-1", 1, date(2024, 5, 1));
        insert(&db, &inv).await.unwrap();

        let loaded = db.invoices().get("i-1").await.unwrap().unwrap();
        assert_eq!(loaded.summary, inv.summary);
        assert_eq!(loaded.company, inv.company);
        assert_eq!(loaded.invoice_date, date(2024, 5, 1));

        let by_quotation = db.invoices().get_by_quotation("q-1").await.unwrap().unwrap();
        assert_eq!(by_quotation.id, "i-1");
    }

    #[tokio::test]
    async fn test_one_invoice_per_quotation() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        insert(&db, &invoice("i-1", "q-1", 1, date(2024, 5, 1))).await.unwrap();

        let second = insert(&db, &invoice("i-2", "q-1", 2, date(2024, 5, 2))).await;
        assert!(matches!(second, Err(DbError::UniqueViolation { .. })));
    }

    #[tokio::test]
    async fn test_list_between_is_inclusive() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        insert(&db, &invoice("i-1", "q-1", 1, date(2024, 4, 30))).await.unwrap();
        insert(&db, &invoice("i-2", "q-2", 2, date(2024, 5, 1))).await.unwrap();
        insert(&db, &invoice("i-3", "q-3", 3, date(2024, 5, 31))).await.unwrap();
        insert(&db, &invoice("i-4", "q-4", 4, date(2024, 6, 1))).await.unwrap();

        let may = db
            .invoices()
            .list_between(date(2024, 5, 1), date(2024, 5, 31))
            .await
            .unwrap();
        let ids: Vec<&str> = may.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["i-2", "i-3"]);
    }

    #[tokio::test]
    async fn test_save_payment_compare_and_swap() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut inv = invoice("i-1", "q-1", 1, date(2024, 5, 1));
        insert(&db, &inv).await.unwrap();

        inv.payment.amount_paid_cents = 210_000;
        inv.payment.status = PaymentRecord::status_for(
            Money::from_cents(210_000),
            Money::from_cents(inv.summary.total_cents),
        );
        inv.payment.method = Some(PaymentMethod::BankTransfer);
        inv.status = InvoiceStatus::Paid;
        inv.history.push(InvoiceStatus::Paid, Utc::now(), "u-2");

        db.invoices().save_payment(&inv, 0, 1).await.unwrap();

        let loaded = db.invoices().get("i-1").await.unwrap().unwrap();
        assert_eq!(loaded.payment.status, PaymentStatus::FullyPaid);
        assert_eq!(loaded.status, InvoiceStatus::Paid);
        assert_eq!(loaded.history.len(), 2);

        // Stale expectation loses
        let stale = db.invoices().save_payment(&inv, 0, 2).await;
        assert!(matches!(stale, Err(DbError::StaleState { .. })));
    }
}

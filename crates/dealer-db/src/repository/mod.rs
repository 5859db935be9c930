//! # Repository Module
//!
//! Database repository implementations for the sales pipeline.
//!
//! ## Pool vs Transaction Methods
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  db.quotations().get(id)                 ← own pooled connection        │
//! │                                                                         │
//! │  let mut tx = db.begin().await?;                                        │
//! │  QuotationRepository::insert_in(&mut tx, &q)   ← caller's transaction   │
//! │  ReservationLedger::apply_in(&mut tx, ...)                              │
//! │  tx.commit().await?;                                                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! `*_in` functions take `&mut SqliteConnection` so several repositories can
//! share one transaction.
//!
//! ## Available Repositories
//!
//! - [`StockRepository`](stock::StockRepository) - Stock items and units
//! - [`QuotationRepository`](quotation::QuotationRepository) - Quotations and history
//! - [`InvoiceRepository`](invoice::InvoiceRepository) - Invoices and payments
//! - [`DirectoryRepository`](directory::DirectoryRepository) - Customer lookup
//! - [`ExpenseRepository`](expense::ExpenseRepository) - Operating expenses

use sqlx::SqliteConnection;

use crate::error::{DbError, DbResult};

pub mod directory;
pub mod expense;
pub mod invoice;
pub mod quotation;
pub mod stock;

/// Sequence names seeded by the initial migration.
pub const QUOTATION_SEQUENCE: &str = "quotation";
pub const INVOICE_SEQUENCE: &str = "invoice";

/// Allocates the next value of a document sequence.
///
/// Runs as a single `UPDATE ... RETURNING`, so two callers never get the
/// same value.
pub async fn next_sequence(conn: &mut SqliteConnection, name: &str) -> DbResult<i64> {
    let value: Option<i64> = sqlx::query_scalar(
        r#"
        UPDATE document_sequences
        SET last_value = last_value + 1
        WHERE name = ?1
        RETURNING last_value
        "#,
    )
    .bind(name)
    .fetch_optional(&mut *conn)
    .await?;

    value.ok_or_else(|| DbError::not_found("DocumentSequence", name))
}

/// Formats a document number: `QT-00042`.
pub fn format_document_number(prefix: &str, sequence: i64) -> String {
    format!("{prefix}-{sequence:05}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};

    #[tokio::test]
    async fn test_sequences_are_monotonic_and_independent() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut conn = db.pool().acquire().await.unwrap();

        assert_eq!(next_sequence(&mut conn, QUOTATION_SEQUENCE).await.unwrap(), 1);
        assert_eq!(next_sequence(&mut conn, QUOTATION_SEQUENCE).await.unwrap(), 2);
        assert_eq!(next_sequence(&mut conn, INVOICE_SEQUENCE).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_unknown_sequence() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut conn = db.pool().acquire().await.unwrap();

        assert!(matches!(
            next_sequence(&mut conn, "credit_note").await,
            Err(DbError::NotFound { .. })
        ));
    }

    #[test]
    fn test_document_number_format() {
        assert_eq!(format_document_number("QT", 42), "QT-00042");
        assert_eq!(format_document_number("INV", 123_456), "INV-123456");
    }
}

//! # Directory Repository
//!
//! Read-only customer lookup for the sales pipeline. Directory CRUD lives
//! elsewhere; `insert` exists for seeding and tests.

use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;
use dealer_core::Customer;

#[derive(Debug, Clone)]
pub struct DirectoryRepository {
    pool: SqlitePool,
}

impl DirectoryRepository {
    pub fn new(pool: SqlitePool) -> Self {
        DirectoryRepository { pool }
    }

    pub async fn get_customer(&self, id: &str) -> DbResult<Option<Customer>> {
        let customer: Option<Customer> = sqlx::query_as(
            r#"
            SELECT id, kind, name, email, phone, address, trn, created_at
            FROM customers
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(customer)
    }

    pub async fn insert(&self, customer: &Customer) -> DbResult<()> {
        debug!(id = %customer.id, name = %customer.name, "Inserting directory entry");

        sqlx::query(
            r#"
            INSERT INTO customers (id, kind, name, email, phone, address, trn, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&customer.id)
        .bind(customer.kind)
        .bind(&customer.name)
        .bind(&customer.email)
        .bind(&customer.phone)
        .bind(&customer.address)
        .bind(&customer.trn)
        .bind(customer.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM customers")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};
    use chrono::Utc;
    use dealer_core::PartyKind;

    #[tokio::test]
    async fn test_insert_and_lookup() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let customer = Customer {
            id: "c-1".to_string(),
            kind: PartyKind::Customer,
            name: "Hamdan Trading LLC".to_string(),
            email: Some("fleet@hamdan.example".to_string()),
            phone: None,
            address: None,
            trn: Some("100123456700003".to_string()),
            created_at: Utc::now(),
        };
        db.directory().insert(&customer).await.unwrap();

        let loaded = db.directory().get_customer("c-1").await.unwrap().unwrap();
        assert_eq!(loaded.name, customer.name);
        assert_eq!(loaded.kind, PartyKind::Customer);
        assert!(db.directory().get_customer("c-2").await.unwrap().is_none());
    }
}

//! # Stock Repository
//!
//! Stock items and their serialized units (one row per VIN).
//!
//! ```text
//! stock_items (1) ──< stock_units (N)
//!   quantity            status: active | hold | sold | inactive
//!
//! invariant: quantity == COUNT(units WHERE status = 'active')
//! ```
//!
//! Status flips on units belong to [`ReservationLedger`](crate::ReservationLedger);
//! this repository only creates items and reads them.

use chrono::{DateTime, Utc};
use sqlx::{FromRow, SqliteConnection, SqlitePool};
use std::collections::HashMap;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use dealer_core::validation::{validate_new_stock_item, validate_price_cents};
use dealer_core::{CoreError, Money, NewStockItem, StockItem, StockStatus, UnitRecord, UnitStatus};

/// A stock item's live cost and the currency it is held in.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct CostPrice {
    pub id: String,
    pub cost_price_cents: i64,
    pub currency: String,
}

impl CostPrice {
    pub fn cost(&self) -> Money {
        Money::from_cents(self.cost_price_cents)
    }
}

#[derive(Debug, FromRow)]
struct StockItemRow {
    id: String,
    name: String,
    make: Option<String>,
    model: Option<String>,
    year: Option<i32>,
    color: Option<String>,
    cost_price_cents: i64,
    selling_price_cents: i64,
    currency: String,
    quantity: i64,
    status: StockStatus,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, FromRow)]
struct UnitRow {
    chassis_number: String,
    engine_number: Option<String>,
    color: Option<String>,
    status: UnitStatus,
}

impl StockItemRow {
    fn into_item(self, units: Vec<UnitRow>) -> StockItem {
        StockItem {
            id: self.id,
            name: self.name,
            make: self.make,
            model: self.model,
            year: self.year,
            color: self.color,
            cost_price_cents: self.cost_price_cents,
            selling_price_cents: self.selling_price_cents,
            currency: self.currency,
            quantity: self.quantity,
            status: self.status,
            units: units
                .into_iter()
                .map(|u| UnitRecord {
                    chassis_number: u.chassis_number,
                    engine_number: u.engine_number,
                    color: u.color,
                    status: u.status,
                })
                .collect(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Repository for stock items.
#[derive(Debug, Clone)]
pub struct StockRepository {
    pool: SqlitePool,
}

impl StockRepository {
    pub fn new(pool: SqlitePool) -> Self {
        StockRepository { pool }
    }

    /// Creates a stock item from a normalized creation payload.
    ///
    /// Serialized items start with every unit `active` and `quantity` equal
    /// to the unit count; non-serialized goods keep the payload quantity.
    ///
    /// ## Errors
    /// - `Domain(Validation)` for an invalid payload
    /// - `UniqueViolation` when a chassis number already exists anywhere
    pub async fn insert(&self, new_item: &NewStockItem) -> DbResult<StockItem> {
        validate_new_stock_item(new_item).map_err(CoreError::from)?;

        let now = Utc::now();
        let id = Uuid::new_v4().to_string();
        let quantity = if new_item.units.is_empty() {
            new_item.quantity
        } else {
            new_item.units.len() as i64
        };
        let status = StockStatus::for_quantity(StockStatus::Active, quantity);

        debug!(id = %id, name = %new_item.name, units = new_item.units.len(), "Inserting stock item");

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO stock_items (
                id, name, make, model, year, color,
                cost_price_cents, selling_price_cents, currency,
                quantity, status, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?12)
            "#,
        )
        .bind(&id)
        .bind(new_item.name.trim())
        .bind(&new_item.make)
        .bind(&new_item.model)
        .bind(new_item.year)
        .bind(&new_item.color)
        .bind(new_item.cost_price_cents)
        .bind(new_item.selling_price_cents)
        .bind(&new_item.currency)
        .bind(quantity)
        .bind(status)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        for (position, unit) in new_item.units.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO stock_units (
                    stock_item_id, chassis_number, engine_number, color, status, position
                ) VALUES (?1, ?2, ?3, ?4, 'active', ?5)
                "#,
            )
            .bind(&id)
            .bind(&unit.chassis_number)
            .bind(&unit.engine_number)
            .bind(&unit.color)
            .bind(position as i64)
            .execute(&mut *tx)
            .await
            .map_err(|e| match DbError::from(e) {
                DbError::UniqueViolation { field, .. } => {
                    DbError::duplicate(field, unit.chassis_number.clone())
                }
                other => other,
            })?;
        }

        tx.commit().await?;

        Ok(StockItem {
            id,
            name: new_item.name.trim().to_string(),
            make: new_item.make.clone(),
            model: new_item.model.clone(),
            year: new_item.year,
            color: new_item.color.clone(),
            cost_price_cents: new_item.cost_price_cents,
            selling_price_cents: new_item.selling_price_cents,
            currency: new_item.currency.clone(),
            quantity,
            status,
            units: new_item
                .units
                .iter()
                .map(|u| UnitRecord {
                    chassis_number: u.chassis_number.clone(),
                    engine_number: u.engine_number.clone(),
                    color: u.color.clone(),
                    status: UnitStatus::Active,
                })
                .collect(),
            created_at: now,
            updated_at: now,
        })
    }

    /// Gets a stock item with its units.
    pub async fn get(&self, id: &str) -> DbResult<Option<StockItem>> {
        let mut conn = self.pool.acquire().await?;
        load_in(&mut conn, id).await
    }

    /// Lists stock items by name.
    pub async fn list(&self, limit: i64) -> DbResult<Vec<StockItem>> {
        let mut conn = self.pool.acquire().await?;

        let ids: Vec<String> =
            sqlx::query_scalar("SELECT id FROM stock_items ORDER BY name, id LIMIT ?1")
                .bind(limit)
                .fetch_all(&mut *conn)
                .await?;

        let mut items = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(item) = load_in(&mut conn, &id).await? {
                items.push(item);
            }
        }
        Ok(items)
    }

    /// Changes the cost price. Analytics picks the new value up for past
    /// invoices too.
    pub async fn update_cost_price(&self, id: &str, cost_price_cents: i64) -> DbResult<()> {
        validate_price_cents("cost_price", cost_price_cents).map_err(CoreError::from)?;
        debug!(id = %id, cost_price_cents, "Updating cost price");

        let result = sqlx::query(
            "UPDATE stock_items SET cost_price_cents = ?2, updated_at = ?3 WHERE id = ?1",
        )
        .bind(id)
        .bind(cost_price_cents)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("StockItem", id));
        }
        Ok(())
    }

    /// Current cost price and currency for each id that still exists.
    pub async fn cost_prices(&self, ids: &[String]) -> DbResult<HashMap<String, CostPrice>> {
        let mut prices = HashMap::with_capacity(ids.len());
        if ids.is_empty() {
            return Ok(prices);
        }

        let placeholders = vec!["?"; ids.len()].join(", ");
        let sql = format!(
            "SELECT id, cost_price_cents, currency FROM stock_items WHERE id IN ({placeholders})"
        );

        let mut query = sqlx::query_as::<_, CostPrice>(&sql);
        for id in ids {
            query = query.bind(id);
        }

        for row in query.fetch_all(&self.pool).await? {
            prices.insert(row.id.clone(), row);
        }
        Ok(prices)
    }

    /// Counts stock items (for diagnostics and seeding).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM stock_items")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

/// Loads one stock item and its units on the given connection.
pub async fn load_in(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<StockItem>> {
    let row: Option<StockItemRow> = sqlx::query_as(
        r#"
        SELECT id, name, make, model, year, color,
               cost_price_cents, selling_price_cents, currency,
               quantity, status, created_at, updated_at
        FROM stock_items
        WHERE id = ?1
        "#,
    )
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;

    let Some(row) = row else {
        return Ok(None);
    };

    let units: Vec<UnitRow> = sqlx::query_as(
        r#"
        SELECT chassis_number, engine_number, color, status
        FROM stock_units
        WHERE stock_item_id = ?1
        ORDER BY position
        "#,
    )
    .bind(id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(Some(row.into_item(units)))
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};
    use dealer_core::NewUnit;

    fn land_cruiser(vins: &[&str]) -> NewStockItem {
        NewStockItem {
            name: "Land Cruiser GXR".to_string(),
            make: Some("Toyota".to_string()),
            model: Some("Land Cruiser".to_string()),
            year: Some(2024),
            color: Some("White".to_string()),
            cost_price_cents: 20_000_000,
            selling_price_cents: 24_000_000,
            currency: "AED".to_string(),
            quantity: 0,
            units: vins
                .iter()
                .map(|v| NewUnit {
                    chassis_number: v.to_string(),
                    engine_number: None,
                    color: None,
                })
                .collect(),
        }
    }

    #[tokio::test]
    async fn test_insert_and_get() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let item = db
            .stock()
            .insert(&land_cruiser(&["JTM-001", "JTM-002", "JTM-003"]))
            .await
            .unwrap();

        let loaded = db.stock().get(&item.id).await.unwrap().unwrap();
        assert_eq!(loaded.quantity, 3);
        assert_eq!(loaded.status, StockStatus::Active);
        assert_eq!(loaded.units.len(), 3);
        assert_eq!(loaded.units[0].chassis_number, "JTM-001");
        assert!(loaded.is_consistent());
    }

    #[tokio::test]
    async fn test_duplicate_chassis_rejected_atomically() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.stock().insert(&land_cruiser(&["JTM-001"])).await.unwrap();

        let result = db.stock().insert(&land_cruiser(&["JTM-009", "JTM-001"])).await;
        assert!(matches!(result, Err(DbError::UniqueViolation { .. })));

        // The second item was rolled back
        assert_eq!(db.stock().count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_non_serialized_quantity() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut mats = land_cruiser(&[]);
        mats.name = "Floor mats".to_string();
        mats.quantity = 40;

        let item = db.stock().insert(&mats).await.unwrap();
        assert_eq!(item.quantity, 40);
        assert!(item.units.is_empty());
    }

    #[tokio::test]
    async fn test_cost_prices_skip_missing() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let item = db.stock().insert(&land_cruiser(&["JTM-001"])).await.unwrap();
        db.stock().update_cost_price(&item.id, 19_000_000).await.unwrap();

        let prices = db
            .stock()
            .cost_prices(&[item.id.clone(), "gone".to_string()])
            .await
            .unwrap();

        assert_eq!(prices.len(), 1);
        assert_eq!(prices[&item.id].cost(), Money::from_cents(19_000_000));
        assert_eq!(prices[&item.id].currency, item.currency);
    }

    #[tokio::test]
    async fn test_update_cost_price_missing_item() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        assert!(matches!(
            db.stock().update_cost_price("nope", 1).await,
            Err(DbError::NotFound { .. })
        ));
        assert!(db.stock().update_cost_price("nope", -1).await.is_err());
        assert!(db
            .stock()
            .update_cost_price("nope", dealer_core::MAX_PRICE_CENTS + 1)
            .await
            .is_err());
    }
}

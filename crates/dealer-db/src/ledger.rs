//! # Reservation Ledger
//!
//! Transactional per-VIN status flips with quantity bookkeeping.
//!
//! ## Apply Phase
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  for each planned flip:                                                 │
//! │    UPDATE stock_units SET status = :to                                  │
//! │    WHERE stock_item_id = :item AND chassis_number = :vin                │
//! │      AND status = :from                 ◄── compare-and-swap            │
//! │                                                                         │
//! │    0 rows? ──► StaleState, transaction rolls back                       │
//! │                                                                         │
//! │  for each item with a non-zero delta:                                   │
//! │    UPDATE stock_items SET quantity = quantity + :delta, status = ...    │
//! │    WHERE id = :item AND quantity + :delta >= 0                          │
//! │                                                                         │
//! │    0 rows? ──► InsufficientStock, transaction rolls back                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Two racing holds on one VIN: both may plan successfully, only one CAS
//! matches, the loser rolls back. A VIN is never held twice.

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info, warn};

use crate::error::{DbError, DbResult};
use crate::repository::stock::load_in;
use dealer_core::reservation::{PlanMode, ReservationOutcome, ReservationPlan, UnitTransition};
use dealer_core::StockItem;

/// Chassis numbers to flip, grouped by stock item.
pub type ReservationRequest = (String, Vec<String>);

/// Repository for unit status flips.
#[derive(Debug, Clone)]
pub struct ReservationLedger {
    pool: SqlitePool,
}

impl ReservationLedger {
    pub fn new(pool: SqlitePool) -> Self {
        ReservationLedger { pool }
    }

    /// Holds `active` units: quantity −1 each.
    pub async fn reserve(
        &self,
        stock_item_id: &str,
        chassis_numbers: &[String],
    ) -> DbResult<ReservationOutcome> {
        self.run(
            &[(stock_item_id.to_string(), chassis_numbers.to_vec())],
            UnitTransition::Hold,
            PlanMode::Strict,
        )
        .await
    }

    /// Returns held units to `active`: quantity +1 each. Releasing an
    /// already-active unit is a no-op.
    pub async fn release(
        &self,
        stock_item_id: &str,
        chassis_numbers: &[String],
    ) -> DbResult<ReservationOutcome> {
        self.run(
            &[(stock_item_id.to_string(), chassis_numbers.to_vec())],
            UnitTransition::Release,
            PlanMode::Idempotent,
        )
        .await
    }

    /// Sells held units: quantity unchanged.
    pub async fn mark_sold(
        &self,
        stock_item_id: &str,
        chassis_numbers: &[String],
    ) -> DbResult<ReservationOutcome> {
        self.run(
            &[(stock_item_id.to_string(), chassis_numbers.to_vec())],
            UnitTransition::Sell,
            PlanMode::Strict,
        )
        .await
    }

    /// Holds units across several stock items, all or nothing.
    pub async fn reserve_batch(
        &self,
        requests: &[ReservationRequest],
    ) -> DbResult<ReservationOutcome> {
        self.run(requests, UnitTransition::Hold, PlanMode::Strict)
            .await
    }

    async fn run(
        &self,
        requests: &[ReservationRequest],
        transition: UnitTransition,
        mode: PlanMode,
    ) -> DbResult<ReservationOutcome> {
        let mut tx = self.pool.begin().await?;
        let outcome = Self::apply_in(&mut tx, requests, transition, mode).await?;
        tx.commit().await?;
        Ok(outcome)
    }

    /// Plans and applies a batch on the caller's connection (normally a
    /// transaction shared with the quotation or invoice write).
    ///
    /// ## Errors
    /// - `NotFound` for an unknown stock item
    /// - `ReservationRejected` when any unit is in the wrong state; nothing
    ///   is written
    /// - `StaleState` / `InsufficientStock` when a conditional update loses a
    ///   race; the caller must drop the transaction
    pub async fn apply_in(
        conn: &mut SqliteConnection,
        requests: &[ReservationRequest],
        transition: UnitTransition,
        mode: PlanMode,
    ) -> DbResult<ReservationOutcome> {
        // Phase 1: plan against current state
        let mut items: Vec<StockItem> = Vec::new();
        for (stock_item_id, _) in requests {
            if items.iter().any(|i| &i.id == stock_item_id) {
                continue;
            }
            let item = load_in(conn, stock_item_id)
                .await?
                .ok_or_else(|| DbError::not_found("StockItem", stock_item_id.as_str()))?;
            items.push(item);
        }

        let plan = ReservationPlan::build(&items, requests, transition, mode)?;
        let outcome = plan.outcome();
        if !outcome.is_success() {
            warn!(
                transition = ?transition,
                failed = outcome.failed.len(),
                "Reservation batch rejected"
            );
            return Err(DbError::ReservationRejected(outcome));
        }

        for skipped in &outcome.skipped {
            warn!(
                stock_item_id = %skipped.stock_item_id,
                chassis_number = ?skipped.chassis_number,
                "Chassis number not found on stock item, skipping"
            );
        }

        // Phase 2: conditional writes
        let now = Utc::now();
        for item_plan in &plan.items {
            for flip in &item_plan.flips {
                let result = sqlx::query(
                    r#"
                    UPDATE stock_units
                    SET status = ?1
                    WHERE stock_item_id = ?2 AND chassis_number = ?3 AND status = ?4
                    "#,
                )
                .bind(flip.to)
                .bind(&flip.stock_item_id)
                .bind(&flip.chassis_number)
                .bind(flip.from)
                .execute(&mut *conn)
                .await?;

                if result.rows_affected() == 0 {
                    warn!(
                        chassis_number = %flip.chassis_number,
                        expected = %flip.from,
                        "Unit changed concurrently, rolling back"
                    );
                    return Err(DbError::stale("StockUnit", flip.chassis_number.as_str()));
                }
            }

            let delta = item_plan.quantity_delta();
            if delta == 0 {
                continue;
            }

            let result = sqlx::query(
                r#"
                UPDATE stock_items
                SET quantity = quantity + ?1,
                    status = CASE
                        WHEN status = 'inactive' THEN status
                        WHEN quantity + ?1 > 0 THEN 'active'
                        ELSE 'out_of_stock'
                    END,
                    updated_at = ?2
                WHERE id = ?3 AND quantity + ?1 >= 0
                "#,
            )
            .bind(delta)
            .bind(now)
            .bind(&item_plan.stock_item_id)
            .execute(&mut *conn)
            .await?;

            if result.rows_affected() == 0 {
                let available = items
                    .iter()
                    .find(|i| i.id == item_plan.stock_item_id)
                    .map(|i| i.quantity)
                    .unwrap_or_default();
                return Err(DbError::InsufficientStock {
                    stock_item_id: item_plan.stock_item_id.clone(),
                    available,
                    requested: -delta,
                });
            }

            debug!(
                stock_item_id = %item_plan.stock_item_id,
                delta,
                "Quantity adjusted"
            );
        }

        info!(
            transition = ?transition,
            flipped = outcome.reserved.len(),
            unchanged = outcome.unchanged.len(),
            "Reservation batch applied"
        );
        Ok(outcome)
    }

    /// Whether quantity still agrees with the active unit count.
    pub async fn is_consistent(&self, stock_item_id: &str) -> DbResult<bool> {
        let mut conn = self.pool.acquire().await?;
        let item = load_in(&mut conn, stock_item_id)
            .await?
            .ok_or_else(|| DbError::not_found("StockItem", stock_item_id))?;
        Ok(item.is_consistent())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

//! # Reservation Planning
//!
//! Pure half of the inventory reservation ledger. The database layer loads
//! stock items, asks this module for a plan, and only applies the plan when
//! every requested flip is possible.
//!
//! ## Two-Phase Reservation
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Phase 1: PLAN (this module, no writes)                                │
//! │    for every (stock item, chassis numbers) in the batch:               │
//! │      unit missing            → skipped (logged, non-fatal)             │
//! │      unit in expected state  → flip                                    │
//! │      unit already at target  → unchanged (idempotent mode only)        │
//! │      anything else           → failed: status mismatch                 │
//! │      quantity would go < 0   → failed: insufficient stock              │
//! │                                                                         │
//! │  any failure? ──yes──► ReservationRejected { reserved: [], failed }    │
//! │       │                                                                 │
//! │       no                                                                │
//! │       ▼                                                                 │
//! │  Phase 2: APPLY (dealer-db, one transaction)                           │
//! │    UPDATE unit SET status = to WHERE ... AND status = from   (CAS)     │
//! │    UPDATE item SET quantity = quantity + delta                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quantity Deltas
//! | transition | unit flip      | quantity |
//! |------------|----------------|----------|
//! | Hold       | active → hold  | −1       |
//! | Release    | hold → active  | +1       |
//! | Sell       | hold → sold    | 0        |

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::types::{StockItem, StockStatus, UnitStatus};

// =============================================================================
// Transitions
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum UnitTransition {
    Hold,
    Release,
    Sell,
}

impl UnitTransition {
    /// Maps a requested target status to the transition that reaches it.
    pub fn for_target(target: UnitStatus) -> Option<UnitTransition> {
        match target {
            UnitStatus::Hold => Some(UnitTransition::Hold),
            UnitStatus::Active => Some(UnitTransition::Release),
            UnitStatus::Sold => Some(UnitTransition::Sell),
            UnitStatus::Inactive => None,
        }
    }

    pub const fn expected(&self) -> UnitStatus {
        match self {
            UnitTransition::Hold => UnitStatus::Active,
            UnitTransition::Release | UnitTransition::Sell => UnitStatus::Hold,
        }
    }

    pub const fn target(&self) -> UnitStatus {
        match self {
            UnitTransition::Hold => UnitStatus::Hold,
            UnitTransition::Release => UnitStatus::Active,
            UnitTransition::Sell => UnitStatus::Sold,
        }
    }

    /// Change to `quantity` per flipped unit.
    pub const fn quantity_delta(&self) -> i64 {
        match self {
            UnitTransition::Hold => -1,
            UnitTransition::Release => 1,
            UnitTransition::Sell => 0,
        }
    }
}

/// How units already sitting in the target state are treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanMode {
    /// They are a mismatch (a second hold on a held VIN is a conflict).
    Strict,
    /// They are left alone (re-asserting holds, releasing twice).
    Idempotent,
}

// =============================================================================
// Outcome
// =============================================================================

/// One unit status flip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct UnitFlip {
    pub stock_item_id: String,
    pub chassis_number: String,
    pub from: UnitStatus,
    pub to: UnitStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum FailureReason {
    /// The chassis number is not on the stock item.
    NotFound,
    /// The unit is not in the state the transition expects.
    StatusMismatch {
        expected: UnitStatus,
        actual: UnitStatus,
    },
    /// The unit changed between planning and applying.
    Conflict,
    /// The item's quantity cannot absorb the flips.
    InsufficientStock { available: i64, requested: i64 },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ReservationFailure {
    pub stock_item_id: String,
    pub chassis_number: Option<String>,
    #[serde(flatten)]
    pub reason: FailureReason,
}

/// Tagged result of a reservation batch.
///
/// On rejection `reserved` is empty: nothing was written.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ReservationOutcome {
    pub reserved: Vec<UnitFlip>,
    /// Units already at the target state (idempotent mode).
    pub unchanged: Vec<String>,
    /// Chassis numbers not found on their item; skipped, not fatal.
    pub skipped: Vec<ReservationFailure>,
    pub failed: Vec<ReservationFailure>,
}

impl ReservationOutcome {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

// =============================================================================
// Plans
// =============================================================================

/// Planned flips for one stock item.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemPlan {
    pub stock_item_id: String,
    pub transition: UnitTransition,
    pub flips: Vec<UnitFlip>,
    pub unchanged: Vec<String>,
    pub skipped: Vec<ReservationFailure>,
    pub failed: Vec<ReservationFailure>,
}

impl ItemPlan {
    /// Net change to the item's quantity when applied.
    pub fn quantity_delta(&self) -> i64 {
        self.transition.quantity_delta() * self.flips.len() as i64
    }

    pub fn is_viable(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Plans one transition for the listed chassis numbers of one stock item.
///
/// Duplicate chassis numbers in the request are planned once.
pub fn plan_item(
    item: &StockItem,
    chassis_numbers: &[String],
    transition: UnitTransition,
    mode: PlanMode,
) -> ItemPlan {
    let mut plan = ItemPlan {
        stock_item_id: item.id.clone(),
        transition,
        flips: Vec::new(),
        unchanged: Vec::new(),
        skipped: Vec::new(),
        failed: Vec::new(),
    };

    let mut seen = HashSet::new();
    for chassis in chassis_numbers {
        if !seen.insert(chassis.as_str()) {
            continue;
        }

        match item.unit(chassis) {
            None => plan.skipped.push(ReservationFailure {
                stock_item_id: item.id.clone(),
                chassis_number: Some(chassis.clone()),
                reason: FailureReason::NotFound,
            }),
            Some(unit) if unit.status == transition.expected() => plan.flips.push(UnitFlip {
                stock_item_id: item.id.clone(),
                chassis_number: chassis.clone(),
                from: unit.status,
                to: transition.target(),
            }),
            Some(unit) if mode == PlanMode::Idempotent && unit.status == transition.target() => {
                plan.unchanged.push(chassis.clone())
            }
            Some(unit) => plan.failed.push(ReservationFailure {
                stock_item_id: item.id.clone(),
                chassis_number: Some(chassis.clone()),
                reason: FailureReason::StatusMismatch {
                    expected: transition.expected(),
                    actual: unit.status,
                },
            }),
        }
    }

    if item.quantity + plan.quantity_delta() < 0 {
        plan.failed.push(ReservationFailure {
            stock_item_id: item.id.clone(),
            chassis_number: None,
            reason: FailureReason::InsufficientStock {
                available: item.quantity,
                requested: plan.flips.len() as i64,
            },
        });
    }

    plan
}

/// A whole batch across stock items; applied all-or-nothing.
#[derive(Debug, Clone, PartialEq)]
pub struct ReservationPlan {
    pub transition: UnitTransition,
    pub items: Vec<ItemPlan>,
}

impl ReservationPlan {
    /// Plans every request against the loaded stock items.
    ///
    /// Requests naming the same stock item twice are merged.
    ///
    /// ## Errors
    /// `NotFound` when a request names a stock item absent from `items`.
    pub fn build(
        items: &[StockItem],
        requests: &[(String, Vec<String>)],
        transition: UnitTransition,
        mode: PlanMode,
    ) -> CoreResult<ReservationPlan> {
        let mut merged: Vec<(&str, Vec<String>)> = Vec::new();
        for (stock_item_id, chassis) in requests {
            match merged.iter_mut().find(|(id, _)| *id == stock_item_id.as_str()) {
                Some((_, all)) => all.extend(chassis.iter().cloned()),
                None => merged.push((stock_item_id.as_str(), chassis.clone())),
            }
        }

        let mut plans = Vec::with_capacity(merged.len());
        for (stock_item_id, chassis) in merged {
            let item = items
                .iter()
                .find(|i| i.id == stock_item_id)
                .ok_or_else(|| CoreError::not_found("StockItem", stock_item_id))?;
            plans.push(plan_item(item, &chassis, transition, mode));
        }

        Ok(ReservationPlan {
            transition,
            items: plans,
        })
    }

    pub fn is_viable(&self) -> bool {
        self.items.iter().all(ItemPlan::is_viable)
    }

    pub fn flips(&self) -> impl Iterator<Item = &UnitFlip> {
        self.items.iter().flat_map(|p| p.flips.iter())
    }

    /// The tagged outcome: flips when viable, failures otherwise.
    pub fn outcome(&self) -> ReservationOutcome {
        let viable = self.is_viable();
        ReservationOutcome {
            reserved: if viable {
                self.flips().cloned().collect()
            } else {
                Vec::new()
            },
            unchanged: self.items.iter().flat_map(|p| p.unchanged.clone()).collect(),
            skipped: self.items.iter().flat_map(|p| p.skipped.clone()).collect(),
            failed: self.items.iter().flat_map(|p| p.failed.clone()).collect(),
        }
    }

    /// `Ok(self)` when every flip is possible, `ReservationRejected` otherwise.
    pub fn ensure_viable(self) -> CoreResult<ReservationPlan> {
        if self.is_viable() {
            Ok(self)
        } else {
            Err(CoreError::ReservationRejected(self.outcome()))
        }
    }
}

impl StockItem {
    /// Applies a plan in memory, mirroring what the ledger writes.
    ///
    /// Verifies each flip's expected prior state first; on mismatch nothing
    /// is changed.
    pub fn apply_plan(&mut self, plan: &ItemPlan) -> CoreResult<()> {
        if plan.stock_item_id != self.id {
            return Err(CoreError::Internal(format!(
                "plan for {} applied to {}",
                plan.stock_item_id, self.id
            )));
        }

        for flip in &plan.flips {
            match self.unit(&flip.chassis_number) {
                Some(unit) if unit.status == flip.from => {}
                _ => {
                    let mut outcome = ReservationOutcome::default();
                    outcome.failed.push(ReservationFailure {
                        stock_item_id: self.id.clone(),
                        chassis_number: Some(flip.chassis_number.clone()),
                        reason: FailureReason::Conflict,
                    });
                    return Err(CoreError::ReservationRejected(outcome));
                }
            }
        }

        let new_quantity = self.quantity + plan.quantity_delta();
        if new_quantity < 0 {
            return Err(CoreError::InsufficientStock {
                stock_item_id: self.id.clone(),
                available: self.quantity,
                requested: plan.flips.len() as i64,
            });
        }

        for flip in &plan.flips {
            if let Some(unit) = self
                .units
                .iter_mut()
                .find(|u| u.chassis_number == flip.chassis_number)
            {
                unit.status = flip.to;
            }
        }
        self.quantity = new_quantity;
        self.status = StockStatus::for_quantity(self.status, new_quantity);
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::UnitRecord;
    use chrono::Utc;

    fn stock(id: &str, units: &[(&str, UnitStatus)]) -> StockItem {
        let now = Utc::now();
        let units: Vec<UnitRecord> = units
            .iter()
            .map(|(vin, status)| UnitRecord {
                chassis_number: vin.to_string(),
                engine_number: None,
                color: None,
                status: *status,
            })
            .collect();
        let quantity = units.iter().filter(|u| u.status == UnitStatus::Active).count() as i64;
        StockItem {
            id: id.to_string(),
            name: "Land Cruiser GXR".to_string(),
            make: Some("Toyota".to_string()),
            model: Some("Land Cruiser".to_string()),
            year: Some(2024),
            color: None,
            cost_price_cents: 20_000_000,
            selling_price_cents: 24_000_000,
            currency: "AED".to_string(),
            quantity,
            status: StockStatus::for_quantity(StockStatus::Active, quantity),
            units,
            created_at: now,
            updated_at: now,
        }
    }

    fn vins(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    fn five_active() -> StockItem {
        stock(
            "stk-1",
            &[
                ("VIN-1", UnitStatus::Active),
                ("VIN-2", UnitStatus::Active),
                ("VIN-3", UnitStatus::Active),
                ("VIN-4", UnitStatus::Active),
                ("VIN-5", UnitStatus::Active),
            ],
        )
    }

    #[test]
    fn test_hold_two_of_five() {
        let mut item = five_active();
        let plan = plan_item(&item, &vins(&["VIN-1", "VIN-2"]), UnitTransition::Hold, PlanMode::Strict);

        assert!(plan.is_viable());
        assert_eq!(plan.quantity_delta(), -2);

        item.apply_plan(&plan).unwrap();
        assert_eq!(item.quantity, 3);
        assert_eq!(item.count_in(UnitStatus::Hold), 2);
        assert!(item.is_consistent());
    }

    #[test]
    fn test_hold_then_release_restores() {
        let mut item = five_active();
        let hold = plan_item(&item, &vins(&["VIN-1", "VIN-2"]), UnitTransition::Hold, PlanMode::Strict);
        item.apply_plan(&hold).unwrap();

        let release =
            plan_item(&item, &vins(&["VIN-1", "VIN-2"]), UnitTransition::Release, PlanMode::Strict);
        item.apply_plan(&release).unwrap();

        assert_eq!(item.quantity, 5);
        assert_eq!(item.count_in(UnitStatus::Active), 5);
    }

    #[test]
    fn test_sell_keeps_quantity() {
        let mut item = five_active();
        let hold = plan_item(&item, &vins(&["VIN-1"]), UnitTransition::Hold, PlanMode::Strict);
        item.apply_plan(&hold).unwrap();

        let sell = plan_item(&item, &vins(&["VIN-1"]), UnitTransition::Sell, PlanMode::Strict);
        item.apply_plan(&sell).unwrap();

        assert_eq!(item.quantity, 4);
        assert_eq!(item.unit("VIN-1").unwrap().status, UnitStatus::Sold);
    }

    #[test]
    fn test_missing_chassis_is_skipped() {
        let item = five_active();
        let plan = plan_item(&item, &vins(&["VIN-1", "NOPE"]), UnitTransition::Hold, PlanMode::Strict);

        assert!(plan.is_viable());
        assert_eq!(plan.flips.len(), 1);
        assert_eq!(plan.skipped.len(), 1);
        assert_eq!(plan.skipped[0].reason, FailureReason::NotFound);
    }

    #[test]
    fn test_double_hold_is_mismatch() {
        let item = stock("stk-1", &[("VIN-1", UnitStatus::Hold), ("VIN-2", UnitStatus::Active)]);
        let plan = plan_item(&item, &vins(&["VIN-1", "VIN-2"]), UnitTransition::Hold, PlanMode::Strict);

        assert!(!plan.is_viable());
        assert_eq!(
            plan.failed[0].reason,
            FailureReason::StatusMismatch {
                expected: UnitStatus::Active,
                actual: UnitStatus::Hold
            }
        );
    }

    #[test]
    fn test_idempotent_reassert() {
        let item = stock("stk-1", &[("VIN-1", UnitStatus::Hold), ("VIN-2", UnitStatus::Active)]);
        let plan =
            plan_item(&item, &vins(&["VIN-1", "VIN-2"]), UnitTransition::Hold, PlanMode::Idempotent);

        assert!(plan.is_viable());
        assert_eq!(plan.unchanged, vins(&["VIN-1"]));
        assert_eq!(plan.flips.len(), 1);
    }

    #[test]
    fn test_duplicates_planned_once() {
        let item = five_active();
        let plan = plan_item(&item, &vins(&["VIN-1", "VIN-1"]), UnitTransition::Hold, PlanMode::Strict);
        assert_eq!(plan.flips.len(), 1);
    }

    #[test]
    fn test_quantity_drift_is_insufficient_stock() {
        let mut item = stock("stk-1", &[("VIN-1", UnitStatus::Active)]);
        item.quantity = 0;
        let plan = plan_item(&item, &vins(&["VIN-1"]), UnitTransition::Hold, PlanMode::Strict);

        assert!(!plan.is_viable());
        assert!(matches!(
            plan.failed[0].reason,
            FailureReason::InsufficientStock { available: 0, requested: 1 }
        ));
    }

    #[test]
    fn test_batch_is_all_or_nothing() {
        let a = five_active();
        let b = stock("stk-2", &[("VIN-B1", UnitStatus::Sold)]);
        let requests = vec![
            ("stk-1".to_string(), vins(&["VIN-1"])),
            ("stk-2".to_string(), vins(&["VIN-B1"])),
        ];

        let plan =
            ReservationPlan::build(&[a, b], &requests, UnitTransition::Hold, PlanMode::Strict).unwrap();
        let outcome = plan.outcome();

        assert!(!outcome.is_success());
        assert!(outcome.reserved.is_empty());
        assert_eq!(outcome.failed.len(), 1);
        assert!(matches!(
            plan.ensure_viable(),
            Err(CoreError::ReservationRejected(_))
        ));
    }

    #[test]
    fn test_batch_merges_same_item() {
        let requests = vec![
            ("stk-1".to_string(), vins(&["VIN-1"])),
            ("stk-1".to_string(), vins(&["VIN-2"])),
        ];
        let plan = ReservationPlan::build(
            &[five_active()],
            &requests,
            UnitTransition::Hold,
            PlanMode::Strict,
        )
        .unwrap();

        assert_eq!(plan.items.len(), 1);
        assert_eq!(plan.items[0].quantity_delta(), -2);
    }

    #[test]
    fn test_batch_unknown_item() {
        let requests = vec![("stk-9".to_string(), vins(&["VIN-1"]))];
        let result =
            ReservationPlan::build(&[five_active()], &requests, UnitTransition::Hold, PlanMode::Strict);
        assert!(matches!(result, Err(CoreError::NotFound { .. })));
    }

    #[test]
    fn test_apply_stale_plan_conflicts() {
        let mut item = five_active();
        let plan = plan_item(&item, &vins(&["VIN-1"]), UnitTransition::Hold, PlanMode::Strict);
        item.apply_plan(&plan).unwrap();

        // Same plan again: VIN-1 is no longer Active
        assert!(matches!(
            item.apply_plan(&plan),
            Err(CoreError::ReservationRejected(_))
        ));
        assert_eq!(item.quantity, 4);
    }

    #[test]
    fn test_last_unit_marks_out_of_stock() {
        let mut item = stock("stk-1", &[("VIN-1", UnitStatus::Active)]);
        let plan = plan_item(&item, &vins(&["VIN-1"]), UnitTransition::Hold, PlanMode::Strict);
        item.apply_plan(&plan).unwrap();
        assert_eq!(item.status, StockStatus::OutOfStock);
    }
}

//! # Quotation Workflow
//!
//! The quotation state machine: which edges exist, which states are
//! terminal, and how a transition is recorded.
//!
//! ## Allowed Edges
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   draft ──► sent ──► viewed                                             │
//! │     │        │         │                                                │
//! │     │        └────┬────┘                                                │
//! │     │             ▼                                                     │
//! │     │         accepted                                                  │
//! │     │             │                                                     │
//! │     └──────┬──────┘                                                     │
//! │            ▼                                                            │
//! │         review ──► approved ──► confirmed ──► converted                 │
//! │                                                                         │
//! │   any non-terminal ──► rejected      (caller, releases VINs)            │
//! │   any non-terminal ──► expired       (system only, past valid_till)     │
//! │                                                                         │
//! │   Terminal: rejected, expired, converted                                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every guard runs before the quotation is touched: a rejected request
//! leaves `status` and `history` exactly as they were.

use chrono::{DateTime, Utc};

use crate::error::{CoreError, CoreResult};
use crate::types::{Quotation, QuotationStatus};
use crate::SYSTEM_ACTOR;

impl QuotationStatus {
    /// Rejected, expired and converted quotations never move again.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            QuotationStatus::Rejected | QuotationStatus::Expired | QuotationStatus::Converted
        )
    }

    /// Whether a caller may move a quotation from `self` to `to`.
    ///
    /// `Expired` is never caller-reachable; see [`Quotation::expire_if_overdue`].
    pub fn can_transition_to(&self, to: QuotationStatus) -> bool {
        use QuotationStatus::*;

        match (*self, to) {
            (Draft, Sent)
            | (Draft, Review)
            | (Sent, Viewed)
            | (Sent, Accepted)
            | (Viewed, Accepted)
            | (Accepted, Review)
            | (Review, Approved)
            | (Approved, Confirmed)
            | (Confirmed, Converted) => true,
            (from, Rejected) => !from.is_terminal(),
            _ => false,
        }
    }

    /// Targets reachable from `self` by a caller.
    pub fn allowed_targets(&self) -> Vec<QuotationStatus> {
        QuotationStatus::ALL
            .into_iter()
            .filter(|to| self.can_transition_to(*to))
            .collect()
    }

    /// Whether units listed on a quotation in this state are held.
    pub fn holds_units(&self) -> bool {
        !self.is_terminal()
    }
}

impl Quotation {
    /// Past `valid_till` and still open.
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        !self.status.is_terminal() && now > self.valid_till
    }

    /// Moves the quotation to `to` and appends a history entry.
    ///
    /// ## Errors
    /// - `InvalidTransition` for any edge outside the allowed set, and for
    ///   `Expired` (system-only)
    /// - `QuotationExpired` for forward moves on an overdue quotation;
    ///   rejecting an overdue quotation is still allowed
    pub fn transition(
        &mut self,
        to: QuotationStatus,
        actor_id: &str,
        now: DateTime<Utc>,
    ) -> CoreResult<()> {
        if to == QuotationStatus::Expired || !self.status.can_transition_to(to) {
            return Err(CoreError::invalid_transition(
                "Quotation",
                &self.id,
                self.status,
                to,
            ));
        }

        if to != QuotationStatus::Rejected && self.is_overdue(now) {
            return Err(CoreError::QuotationExpired {
                id: self.id.clone(),
                valid_till: self.valid_till.to_rfc3339(),
            });
        }

        self.status = to;
        self.history.push(to, now, actor_id);
        self.updated_at = now;
        Ok(())
    }

    /// Marks an overdue quotation `Expired` on behalf of the system.
    ///
    /// Returns `false` (and changes nothing) when not overdue.
    pub fn expire_if_overdue(&mut self, now: DateTime<Utc>) -> bool {
        if !self.is_overdue(now) {
            return false;
        }

        self.status = QuotationStatus::Expired;
        self.history.push(QuotationStatus::Expired, now, SYSTEM_ACTOR);
        self.updated_at = now;
        true
    }

    /// Walks an approved (or confirmed) quotation through the legal edges to
    /// `Converted`, recording each step.
    pub fn convert(&mut self, actor_id: &str, now: DateTime<Utc>) -> CoreResult<()> {
        match self.status {
            QuotationStatus::Approved => {
                // Validate the whole walk before touching anything.
                if self.is_overdue(now) {
                    return Err(CoreError::QuotationExpired {
                        id: self.id.clone(),
                        valid_till: self.valid_till.to_rfc3339(),
                    });
                }
                self.transition(QuotationStatus::Confirmed, actor_id, now)?;
                self.transition(QuotationStatus::Converted, actor_id, now)
            }
            QuotationStatus::Confirmed => {
                self.transition(QuotationStatus::Converted, actor_id, now)
            }
            other => Err(CoreError::invalid_transition(
                "Quotation",
                &self.id,
                other,
                QuotationStatus::Converted,
            )),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CustomerSnapshot, Discount, MoneySummary, StatusHistory};
    use chrono::Duration;
    use QuotationStatus::*;

    fn quotation(status: QuotationStatus, valid_for: Duration) -> Quotation {
        let now = Utc::now();
        Quotation {
            id: "q-1".to_string(),
            quotation_number: "QT-00001".to_string(),
            sequence: 1,
            customer: CustomerSnapshot {
                customer_id: "c-1".to_string(),
                name: "Fatima Al Mansoori".to_string(),
                email: None,
                phone: None,
                address: None,
                trn: None,
            },
            items: Vec::new(),
            currency: "AED".to_string(),
            summary: MoneySummary {
                subtotal_cents: 0,
                discount: Discount::None,
                discount_cents: 0,
                additional_expenses: Vec::new(),
                expenses_cents: 0,
                taxable_cents: 0,
                vat_rate_bps: 500,
                vat_cents: 0,
                total_cents: 0,
            },
            status,
            valid_till: now + valid_for,
            notes: None,
            history: StatusHistory::start(status, now, "u-1"),
            created_by: "u-1".to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_allowed_edges_exactly() {
        let allowed = [
            (Draft, Sent),
            (Draft, Review),
            (Sent, Viewed),
            (Sent, Accepted),
            (Viewed, Accepted),
            (Accepted, Review),
            (Review, Approved),
            (Approved, Confirmed),
            (Confirmed, Converted),
        ];

        for from in QuotationStatus::ALL {
            for to in QuotationStatus::ALL {
                let expected = allowed.contains(&(from, to))
                    || (to == Rejected && !from.is_terminal());
                assert_eq!(
                    from.can_transition_to(to),
                    expected,
                    "{} -> {}",
                    from,
                    to
                );
            }
        }
    }

    #[test]
    fn test_terminal_states_have_no_targets() {
        for status in [Rejected, Expired, Converted] {
            assert!(status.allowed_targets().is_empty());
            assert!(!status.holds_units());
        }
    }

    #[test]
    fn test_illegal_transition_leaves_state_untouched() {
        let mut q = quotation(Draft, Duration::days(30));
        let err = q.transition(Approved, "u-2", Utc::now()).unwrap_err();

        assert!(matches!(err, CoreError::InvalidTransition { .. }));
        assert_eq!(q.status, Draft);
        assert_eq!(q.history.len(), 1);
    }

    #[test]
    fn test_expired_is_not_caller_reachable() {
        let mut q = quotation(Sent, Duration::days(30));
        assert!(q.transition(Expired, "u-2", Utc::now()).is_err());
        assert_eq!(q.status, Sent);
    }

    #[test]
    fn test_transition_appends_history() {
        let mut q = quotation(Draft, Duration::days(30));
        q.transition(Review, "u-2", Utc::now()).unwrap();
        q.transition(Approved, "mgr-1", Utc::now()).unwrap();

        assert_eq!(q.status, Approved);
        let actors: Vec<&str> = q.history.entries().iter().map(|e| e.actor_id.as_str()).collect();
        assert_eq!(actors, vec!["u-1", "u-2", "mgr-1"]);
    }

    #[test]
    fn test_overdue_blocks_forward_but_allows_reject() {
        let mut q = quotation(Review, Duration::days(-1));
        let err = q.transition(Approved, "u-2", Utc::now()).unwrap_err();
        assert!(matches!(err, CoreError::QuotationExpired { .. }));
        assert_eq!(q.history.len(), 1);

        q.transition(Rejected, "u-2", Utc::now()).unwrap();
        assert_eq!(q.status, Rejected);
    }

    #[test]
    fn test_expire_if_overdue() {
        let mut fresh = quotation(Sent, Duration::days(1));
        assert!(!fresh.expire_if_overdue(Utc::now()));
        assert_eq!(fresh.status, Sent);

        let mut stale = quotation(Sent, Duration::days(-1));
        assert!(stale.expire_if_overdue(Utc::now()));
        assert_eq!(stale.status, Expired);
        assert_eq!(stale.history.latest().unwrap().actor_id, SYSTEM_ACTOR);

        // Terminal quotations never expire again
        assert!(!stale.expire_if_overdue(Utc::now()));
    }

    #[test]
    fn test_convert_walks_through_confirmed() {
        let mut q = quotation(Approved, Duration::days(10));
        q.convert("u-3", Utc::now()).unwrap();

        let statuses: Vec<QuotationStatus> = q.history.entries().iter().map(|e| e.status).collect();
        assert_eq!(statuses, vec![Approved, Confirmed, Converted]);
    }

    #[test]
    fn test_convert_requires_approved() {
        let mut q = quotation(Review, Duration::days(10));
        assert!(matches!(
            q.convert("u-3", Utc::now()),
            Err(CoreError::InvalidTransition { .. })
        ));
        assert_eq!(q.status, Review);
    }
}

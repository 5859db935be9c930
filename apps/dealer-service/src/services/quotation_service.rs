//! # Quotation Service
//!
//! Creates quotations, walks them through the workflow and keeps the
//! reservation ledger in step with every status change.
//!
//! ## Status Changes and Units
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  create ──────────► Hold    (strict: a held VIN rejects the quotation)  │
//! │  send_review ─────► Hold    (idempotent re-assert)                      │
//! │  reject / expire ─► Release (idempotent)                                │
//! │  convert ─────────► Sell    (invoice_service)                           │
//! │                                                                         │
//! │  Status write and unit flips share ONE transaction.                     │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use dealer_core::pricing::{self, ConvertedQuotation};
use dealer_core::reservation::{PlanMode, UnitTransition};
use dealer_core::validation::{validate_currency, validate_quotation_request};
use dealer_core::{
    CompanyProfile, CustomerSnapshot, LineItem, PartyKind, Quotation, QuotationRequest,
    QuotationStatus, StatusHistory, ValidationError, SYSTEM_ACTOR,
};
use dealer_db::repository::{format_document_number, next_sequence, QUOTATION_SEQUENCE};
use dealer_db::{Database, DbError, QuotationRepository, ReservationLedger};
use dealer_fx::CurrencyService;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::QuotationSettings;
use crate::error::{ErrorKind, ServiceError, ServiceResult};

#[derive(Clone)]
pub struct QuotationService {
    db: Database,
    fx: Arc<CurrencyService>,
    company: CompanyProfile,
    settings: QuotationSettings,
}

impl QuotationService {
    pub fn new(
        db: Database,
        fx: Arc<CurrencyService>,
        company: CompanyProfile,
        settings: QuotationSettings,
    ) -> Self {
        QuotationService {
            db,
            fx,
            company,
            settings,
        }
    }

    // =========================================================================
    // Creation
    // =========================================================================

    /// Creates a draft quotation and holds every listed VIN.
    ///
    /// All or nothing: if any VIN cannot be held, no quotation is written
    /// and the error carries the per-unit outcome.
    pub async fn create_quotation(
        &self,
        request: QuotationRequest,
        actor_id: &str,
    ) -> ServiceResult<Quotation> {
        self.create_quotation_at(request, actor_id, Utc::now()).await
    }

    pub(crate) async fn create_quotation_at(
        &self,
        request: QuotationRequest,
        actor_id: &str,
        now: DateTime<Utc>,
    ) -> ServiceResult<Quotation> {
        validate_quotation_request(&request)?;

        let customer = self
            .db
            .directory()
            .get_customer(&request.customer_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Customer", &request.customer_id))?;
        if customer.kind != PartyKind::Customer {
            return Err(ValidationError::NotAllowed {
                field: "customer_id".to_string(),
                allowed: vec!["customer".to_string()],
            }
            .into());
        }

        let currency = request
            .currency
            .clone()
            .unwrap_or_else(|| self.settings.default_currency.clone());
        validate_currency(&currency)?;

        let valid_till = request
            .valid_till
            .unwrap_or_else(|| now + Duration::days(i64::from(self.settings.validity_days)));
        if valid_till <= now {
            return Err(ValidationError::Inconsistent {
                field: "valid_till".to_string(),
                reason: "must be in the future".to_string(),
            }
            .into());
        }

        let items = self.price_lines(&request, &currency).await?;
        let expenses = request.additional_expenses.normalize(&currency)?;
        let summary = pricing::calculate(
            &currency,
            &items,
            request.discount,
            expenses,
            self.company.vat_rate(),
        )?;

        let mut tx = self.db.begin().await?;
        let sequence = next_sequence(&mut tx, QUOTATION_SEQUENCE).await?;

        let quotation = Quotation {
            id: Uuid::new_v4().to_string(),
            quotation_number: format_document_number(&self.settings.number_prefix, sequence),
            sequence,
            customer: CustomerSnapshot::from(&customer),
            items,
            currency,
            summary,
            status: QuotationStatus::Draft,
            valid_till,
            notes: request.notes,
            history: StatusHistory::start(QuotationStatus::Draft, now, actor_id),
            created_by: actor_id.to_string(),
            created_at: now,
            updated_at: now,
        };

        // Dropping `tx` on any error below rolls back the sequence too
        let outcome = ReservationLedger::apply_in(
            &mut tx,
            &quotation.chassis_by_stock_item(),
            UnitTransition::Hold,
            PlanMode::Strict,
        )
        .await?;
        QuotationRepository::insert_in(&mut tx, &quotation).await?;
        tx.commit().await.map_err(DbError::from)?;

        info!(
            id = %quotation.id,
            number = %quotation.quotation_number,
            total_cents = quotation.summary.total_cents,
            held = outcome.reserved.len(),
            "Quotation created"
        );
        Ok(quotation)
    }

    /// Snapshots each requested line, converting list prices held in another
    /// currency. A degraded conversion is logged, never fatal.
    async fn price_lines(
        &self,
        request: &QuotationRequest,
        currency: &str,
    ) -> ServiceResult<Vec<LineItem>> {
        let mut lines = Vec::with_capacity(request.items.len());
        for line_request in &request.items {
            let stock = self
                .db
                .stock()
                .get(&line_request.stock_item_id)
                .await?
                .ok_or_else(|| ServiceError::not_found("StockItem", &line_request.stock_item_id))?;

            let mut line = stock.to_line(line_request)?;
            if line_request.unit_price_cents.is_none() && stock.currency != currency {
                let conversion = self
                    .fx
                    .convert(stock.selling_price(), &stock.currency, currency)
                    .await;
                if conversion.degraded {
                    warn!(
                        stock_item_id = %stock.id,
                        from = %stock.currency,
                        to = %currency,
                        "Pricing line with a fallback exchange rate"
                    );
                }
                line.set_unit_price(conversion.amount)?;
            }
            lines.push(line);
        }
        Ok(lines)
    }

    // =========================================================================
    // Workflow
    // =========================================================================

    pub async fn send_quotation(&self, id: &str, actor_id: &str) -> ServiceResult<Quotation> {
        self.transition_at(id, QuotationStatus::Sent, actor_id, Utc::now())
            .await
    }

    pub async fn mark_viewed(&self, id: &str, actor_id: &str) -> ServiceResult<Quotation> {
        self.transition_at(id, QuotationStatus::Viewed, actor_id, Utc::now())
            .await
    }

    pub async fn accept_quotation(&self, id: &str, actor_id: &str) -> ServiceResult<Quotation> {
        self.transition_at(id, QuotationStatus::Accepted, actor_id, Utc::now())
            .await
    }

    /// Moves the quotation into internal review and re-asserts its holds.
    pub async fn send_review(&self, id: &str, actor_id: &str) -> ServiceResult<Quotation> {
        self.transition_at(id, QuotationStatus::Review, actor_id, Utc::now())
            .await
    }

    pub async fn approve_quotation(&self, id: &str, actor_id: &str) -> ServiceResult<Quotation> {
        self.transition_at(id, QuotationStatus::Approved, actor_id, Utc::now())
            .await
    }

    pub async fn confirm_quotation(&self, id: &str, actor_id: &str) -> ServiceResult<Quotation> {
        self.transition_at(id, QuotationStatus::Confirmed, actor_id, Utc::now())
            .await
    }

    /// Rejects the quotation and releases its held units.
    pub async fn reject_quotation(&self, id: &str, actor_id: &str) -> ServiceResult<Quotation> {
        self.transition_at(id, QuotationStatus::Rejected, actor_id, Utc::now())
            .await
    }

    async fn transition_at(
        &self,
        id: &str,
        to: QuotationStatus,
        actor_id: &str,
        now: DateTime<Utc>,
    ) -> ServiceResult<Quotation> {
        let mut quotation = self.get_quotation(id).await?;
        let from = quotation.status;
        let persisted = quotation.history.len();

        quotation.transition(to, actor_id, now)?;

        let units = match to {
            QuotationStatus::Review => Some(UnitTransition::Hold),
            QuotationStatus::Rejected => Some(UnitTransition::Release),
            _ => None,
        };

        let mut tx = self.db.begin().await?;
        QuotationRepository::update_status_in(&mut tx, &quotation, from, persisted).await?;
        if let Some(transition) = units {
            ReservationLedger::apply_in(
                &mut tx,
                &quotation.chassis_by_stock_item(),
                transition,
                PlanMode::Idempotent,
            )
            .await?;
        }
        tx.commit().await.map_err(DbError::from)?;

        info!(
            id = %quotation.id,
            from = %from,
            to = %to,
            actor = %actor_id,
            "Quotation status changed"
        );
        Ok(quotation)
    }

    /// Marks every overdue open quotation `Expired` and releases its units.
    ///
    /// A quotation that moved concurrently is skipped; the next sweep
    /// picks it up if it is still overdue.
    pub async fn expire_overdue(&self, now: DateTime<Utc>) -> ServiceResult<Vec<Quotation>> {
        let overdue = self.db.quotations().list_overdue(now).await?;
        debug!(count = overdue.len(), "Expiring overdue quotations");

        let mut expired = Vec::with_capacity(overdue.len());
        for mut quotation in overdue {
            let from = quotation.status;
            let persisted = quotation.history.len();
            if !quotation.expire_if_overdue(now) {
                continue;
            }

            match self.persist_expiry(&quotation, from, persisted).await {
                Ok(()) => {
                    info!(
                        id = %quotation.id,
                        number = %quotation.quotation_number,
                        actor = SYSTEM_ACTOR,
                        "Quotation expired"
                    );
                    expired.push(quotation);
                }
                Err(e) if e.kind == ErrorKind::Conflict => {
                    warn!(id = %quotation.id, "Quotation changed during expiry, skipping: {}", e);
                }
                Err(e) => return Err(e),
            }
        }
        Ok(expired)
    }

    async fn persist_expiry(
        &self,
        quotation: &Quotation,
        from: QuotationStatus,
        persisted: usize,
    ) -> ServiceResult<()> {
        let mut tx = self.db.begin().await?;
        QuotationRepository::update_status_in(&mut tx, quotation, from, persisted).await?;
        ReservationLedger::apply_in(
            &mut tx,
            &quotation.chassis_by_stock_item(),
            UnitTransition::Release,
            PlanMode::Idempotent,
        )
        .await?;
        tx.commit().await.map_err(DbError::from)?;
        Ok(())
    }

    /// Deletes a quotation and its history. Units it holds stay held.
    pub async fn delete_quotation(&self, id: &str, actor_id: &str) -> ServiceResult<()> {
        let quotation = self.get_quotation(id).await?;
        if quotation.status.holds_units() && !quotation.chassis_by_stock_item().is_empty() {
            warn!(
                id = %quotation.id,
                status = %quotation.status,
                "Deleting a quotation that still holds units; they are not released"
            );
        }

        self.db.quotations().delete(id).await?;
        info!(id = %id, actor = %actor_id, "Quotation deleted");
        Ok(())
    }

    // =========================================================================
    // Queries
    // =========================================================================

    pub async fn get_quotation(&self, id: &str) -> ServiceResult<Quotation> {
        self.db
            .quotations()
            .get(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Quotation", id))
    }

    /// Re-prices a quotation into `currency` for display.
    ///
    /// The stored quotation is not touched. Fails rather than showing figures
    /// computed with a fallback rate.
    pub async fn quote_in_currency(
        &self,
        id: &str,
        currency: &str,
    ) -> ServiceResult<ConvertedQuotation> {
        validate_currency(currency)?;
        let quotation = self.get_quotation(id).await?;

        let (rate, degraded) = self.fx.cross_rate(&quotation.currency, currency).await;
        if degraded {
            return Err(ServiceError::internal(format!(
                "No exchange rate available for {} -> {}",
                quotation.currency, currency
            )));
        }

        let (items, summary) =
            pricing::reprice(&quotation.items, &quotation.summary, rate, currency)?;

        Ok(ConvertedQuotation {
            quotation_id: quotation.id,
            from_currency: quotation.currency,
            currency: currency.to_string(),
            rate,
            items,
            summary,
        })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

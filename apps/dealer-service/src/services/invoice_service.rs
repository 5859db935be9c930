//! # Invoice Service
//!
//! Converts approved quotations into invoices and records payments.
//!
//! Conversion writes the invoice, flips the held VINs to `Sold` and marks
//! the quotation `Converted` in one transaction. Invoices are never
//! re-priced: lines and summary are the quotation's snapshot.

use chrono::{DateTime, Duration, Utc};
use dealer_core::reservation::{PlanMode, UnitTransition};
use dealer_core::validation::validate_payment_amount;
use dealer_core::{
    CompanyProfile, Invoice, InvoiceExtras, InvoiceStatus, Money, PaymentMethod, PaymentRecord,
    PaymentStatus, StatusHistory, ValidationError,
};
use dealer_db::repository::{format_document_number, next_sequence, INVOICE_SEQUENCE};
use dealer_db::{Database, DbError, InvoiceRepository, QuotationRepository, ReservationLedger};
use tracing::info;
use uuid::Uuid;

use crate::config::InvoiceSettings;
use crate::error::{ErrorKind, ServiceError, ServiceResult};

#[derive(Clone)]
pub struct InvoiceService {
    db: Database,
    company: CompanyProfile,
    settings: InvoiceSettings,
}

impl InvoiceService {
    pub fn new(db: Database, company: CompanyProfile, settings: InvoiceSettings) -> Self {
        InvoiceService {
            db,
            company,
            settings,
        }
    }

    /// Issues the invoice for an approved (or confirmed) quotation.
    ///
    /// ## Errors
    /// - `InvalidTransition` when the quotation is in any other state
    /// - `Conflict` when the quotation already has an invoice or a listed
    ///   VIN is no longer held
    pub async fn create_invoice_from_quotation(
        &self,
        quotation_id: &str,
        extras: InvoiceExtras,
        actor_id: &str,
    ) -> ServiceResult<Invoice> {
        self.create_invoice_at(quotation_id, extras, actor_id, Utc::now())
            .await
    }

    pub(crate) async fn create_invoice_at(
        &self,
        quotation_id: &str,
        extras: InvoiceExtras,
        actor_id: &str,
        now: DateTime<Utc>,
    ) -> ServiceResult<Invoice> {
        let mut quotation = self
            .db
            .quotations()
            .get(quotation_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Quotation", quotation_id))?;

        if self.db.invoices().get_by_quotation(quotation_id).await?.is_some() {
            return Err(ServiceError::conflict(format!(
                "Quotation {} already has an invoice",
                quotation.quotation_number
            )));
        }

        let expected = quotation.status;
        let persisted = quotation.history.len();
        quotation.convert(actor_id, now)?;

        let total = quotation.summary.total();
        let initial = match extras.initial_payment_cents {
            Some(cents) => {
                validate_payment_amount(cents)?;
                let paid = Money::from_cents(cents);
                if paid > total {
                    return Err(ValidationError::OutOfRange {
                        field: "initial_payment".to_string(),
                        min: 1,
                        max: total.cents(),
                    }
                    .into());
                }
                paid
            }
            None => Money::zero(),
        };

        let invoice_date = extras.invoice_date.unwrap_or_else(|| now.date_naive());
        let due_date = extras.due_date.unwrap_or_else(|| {
            invoice_date + Duration::days(i64::from(self.settings.payment_terms_days))
        });
        if due_date < invoice_date {
            return Err(ValidationError::Inconsistent {
                field: "due_date".to_string(),
                reason: format!("{} is before invoice date {}", due_date, invoice_date),
            }
            .into());
        }

        let payment_status = PaymentRecord::status_for(initial, total);
        let mut history = StatusHistory::start(InvoiceStatus::Issued, now, actor_id);
        let status = if payment_status == PaymentStatus::FullyPaid {
            history.push(InvoiceStatus::Paid, now, actor_id);
            InvoiceStatus::Paid
        } else {
            InvoiceStatus::Issued
        };

        let mut tx = self.db.begin().await?;
        let sequence = next_sequence(&mut tx, INVOICE_SEQUENCE).await?;

        let invoice = Invoice {
            id: Uuid::new_v4().to_string(),
            invoice_number: format_document_number(&self.settings.number_prefix, sequence),
            sequence,
            quotation_id: quotation.id.clone(),
            quotation_number: quotation.quotation_number.clone(),
            customer: quotation.customer.clone(),
            items: quotation.items.clone(),
            currency: quotation.currency.clone(),
            summary: quotation.summary.clone(),
            payment: PaymentRecord {
                status: payment_status,
                amount_paid_cents: initial.cents(),
                method: extras.payment_method,
                last_paid_at: initial.is_positive().then_some(now),
            },
            invoice_date,
            due_date,
            status,
            history,
            company: self.company.clone(),
            notes: extras.notes,
            created_by: actor_id.to_string(),
            created_at: now,
            updated_at: now,
        };

        let outcome = ReservationLedger::apply_in(
            &mut tx,
            &quotation.chassis_by_stock_item(),
            UnitTransition::Sell,
            PlanMode::Strict,
        )
        .await?;
        InvoiceRepository::insert_in(&mut tx, &invoice).await?;
        QuotationRepository::update_status_in(&mut tx, &quotation, expected, persisted).await?;
        tx.commit().await.map_err(DbError::from)?;

        info!(
            id = %invoice.id,
            number = %invoice.invoice_number,
            quotation = %invoice.quotation_number,
            sold = outcome.reserved.len(),
            total_cents = invoice.summary.total_cents,
            "Invoice created"
        );
        Ok(invoice)
    }

    /// Adds a payment to an open invoice.
    ///
    /// ## Errors
    /// - `Validation` for a non-positive amount or one above the outstanding
    ///   balance
    /// - `InvalidTransition` on a paid or cancelled invoice
    /// - `Conflict` when another payment was recorded concurrently
    pub async fn record_payment(
        &self,
        invoice_id: &str,
        amount_cents: i64,
        method: PaymentMethod,
        actor_id: &str,
    ) -> ServiceResult<Invoice> {
        validate_payment_amount(amount_cents)?;
        let mut invoice = self.get_invoice(invoice_id).await?;

        if invoice.status != InvoiceStatus::Issued {
            return Err(ServiceError::new(
                ErrorKind::InvalidTransition,
                format!(
                    "Invoice {} is {} and accepts no payments",
                    invoice.invoice_number, invoice.status
                ),
            ));
        }

        let amount = Money::from_cents(amount_cents);
        let outstanding = invoice.outstanding();
        if amount > outstanding {
            return Err(ValidationError::OutOfRange {
                field: "amount".to_string(),
                min: 1,
                max: outstanding.cents(),
            }
            .into());
        }

        let now = Utc::now();
        let expected_paid = invoice.payment.amount_paid_cents;
        let persisted = invoice.history.len();

        let paid = invoice.payment.amount_paid() + amount;
        invoice.payment = PaymentRecord {
            status: PaymentRecord::status_for(paid, invoice.summary.total()),
            amount_paid_cents: paid.cents(),
            method: Some(method),
            last_paid_at: Some(now),
        };
        if invoice.payment.status == PaymentStatus::FullyPaid {
            invoice.status = InvoiceStatus::Paid;
            invoice.history.push(InvoiceStatus::Paid, now, actor_id);
        }
        invoice.updated_at = now;

        self.db
            .invoices()
            .save_payment(&invoice, expected_paid, persisted)
            .await?;

        info!(
            id = %invoice.id,
            amount_cents = amount_cents,
            outstanding_cents = invoice.outstanding().cents(),
            actor = %actor_id,
            "Payment recorded"
        );
        Ok(invoice)
    }

    pub async fn get_invoice(&self, id: &str) -> ServiceResult<Invoice> {
        self.db
            .invoices()
            .get(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Invoice", id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::fixtures::{self, ACTOR};
    use crate::DealerServices;
    use dealer_core::{PartyKind, Quotation, QuotationStatus, UnitStatus};

    async fn approved(db: &Database, services: &DealerServices, prefix: &str) -> Quotation {
        let customer = fixtures::party(db, PartyKind::Customer).await;
        let stock = fixtures::vehicles(db, prefix, 3, 12_000, 9_000).await;
        let vin = format!("{prefix}-1");

        let q = services
            .quotations
            .create_quotation(fixtures::request(&customer.id, &stock.id, &[vin.as_str()]), ACTOR)
            .await
            .unwrap();
        services.quotations.send_review(&q.id, ACTOR).await.unwrap();
        services
            .quotations
            .approve_quotation(&q.id, "mgr-1")
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_conversion_sells_units() {
        let (db, services) = fixtures::services().await;
        let q = approved(&db, &services, "JTD").await;
        let stock_id = q.items[0].stock_item_id.clone();

        let before = db.stock().get(&stock_id).await.unwrap().unwrap();
        assert_eq!(before.quantity, 2);

        let invoice = services
            .invoices
            .create_invoice_from_quotation(&q.id, InvoiceExtras::default(), ACTOR)
            .await
            .unwrap();

        assert_eq!(invoice.invoice_number, "INV-00001");
        assert_eq!(invoice.summary.total_cents, q.summary.total_cents);
        assert_eq!(invoice.payment.status, PaymentStatus::Due);
        assert_eq!(invoice.status, InvoiceStatus::Issued);
        assert_eq!(invoice.due_date, invoice.invoice_date + Duration::days(30));

        // Quantity already dropped on hold; selling leaves it alone
        let after = db.stock().get(&stock_id).await.unwrap().unwrap();
        assert_eq!(after.quantity, 2);
        assert_eq!(after.unit("JTD-1").unwrap().status, UnitStatus::Sold);

        let stored = services.quotations.get_quotation(&q.id).await.unwrap();
        assert_eq!(stored.status, QuotationStatus::Converted);
        assert_eq!(
            stored.history.since(stored.history.len() - 2)[0].status,
            QuotationStatus::Confirmed
        );

        // A second invoice for the same quotation is refused
        let err = services
            .invoices
            .create_invoice_from_quotation(&q.id, InvoiceExtras::default(), ACTOR)
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Conflict);
    }

    #[tokio::test]
    async fn test_conversion_requires_approval() {
        let (db, services) = fixtures::services().await;
        let customer = fixtures::party(&db, PartyKind::Customer).await;
        let stock = fixtures::vehicles(&db, "MNT", 1, 12_000, 9_000).await;

        let q = services
            .quotations
            .create_quotation(fixtures::request(&customer.id, &stock.id, &["MNT-1"]), ACTOR)
            .await
            .unwrap();

        let err = services
            .invoices
            .create_invoice_from_quotation(&q.id, InvoiceExtras::default(), ACTOR)
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidTransition);
        assert_eq!(db.invoices().count().await.unwrap(), 0);

        let after = db.stock().get(&stock.id).await.unwrap().unwrap();
        assert_eq!(after.unit("MNT-1").unwrap().status, UnitStatus::Hold);
    }

    #[tokio::test]
    async fn test_payments_until_paid() {
        let (db, services) = fixtures::services().await;
        let q = approved(&db, &services, "SJN").await;
        let total = q.summary.total_cents;

        let invoice = services
            .invoices
            .create_invoice_from_quotation(
                &q.id,
                InvoiceExtras {
                    initial_payment_cents: Some(100_000),
                    payment_method: Some(PaymentMethod::BankTransfer),
                    ..Default::default()
                },
                ACTOR,
            )
            .await
            .unwrap();
        assert_eq!(invoice.payment.status, PaymentStatus::PartiallyPaid);
        assert_eq!(invoice.outstanding().cents(), total - 100_000);

        let err = services
            .invoices
            .record_payment(&invoice.id, total, PaymentMethod::Cash, ACTOR)
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);

        let paid = services
            .invoices
            .record_payment(&invoice.id, total - 100_000, PaymentMethod::Cash, ACTOR)
            .await
            .unwrap();
        assert_eq!(paid.payment.status, PaymentStatus::FullyPaid);
        assert_eq!(paid.status, InvoiceStatus::Paid);

        let stored = services.invoices.get_invoice(&invoice.id).await.unwrap();
        assert_eq!(stored.payment.amount_paid_cents, total);
        assert_eq!(stored.status, InvoiceStatus::Paid);
        assert_eq!(stored.history.len(), 2);

        let err = services
            .invoices
            .record_payment(&invoice.id, 100, PaymentMethod::Cash, ACTOR)
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidTransition);
    }
}

//! # Pricing & Tax Calculator
//!
//! Stateless money computation for quotations.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  subtotal  = Σ quantity × unit_price                                    │
//! │  discount  = percentage ? subtotal × bps : fixed amount                 │
//! │  taxable   = subtotal + Σ additional expenses − discount                │
//! │  vat       = taxable × vat_bps                                          │
//! │  total     = taxable + vat                                              │
//! │                                                                         │
//! │  Each percentage step is rounded half-up to the cent as it happens.    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The VAT rate and currency are whatever the caller snapshotted at creation.
//! Status transitions never call back into this module; only
//! [`reprice`] (an explicit currency conversion) produces new figures for an
//! existing quotation.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::expense::{self, AdditionalExpense};
use crate::money::Money;
use crate::types::{Discount, LineItem, MoneySummary, Rate};

/// Computes the money summary for a set of lines.
///
/// ## Errors
/// - An expense in a currency other than `currency`
/// - A discount larger than the subtotal
/// - Amounts whose sum does not fit in `i64` cents
pub fn calculate(
    currency: &str,
    items: &[LineItem],
    discount: Discount,
    additional_expenses: Vec<AdditionalExpense>,
    vat_rate: Rate,
) -> CoreResult<MoneySummary> {
    if let Some(foreign) = additional_expenses.iter().find(|e| e.currency != currency) {
        return Err(ValidationError::Inconsistent {
            field: "additional_expenses.currency".to_string(),
            reason: format!(
                "expense '{}' is in {}, quotation is in {}",
                foreign.description, foreign.currency, currency
            ),
        }
        .into());
    }

    let mut subtotal = Money::zero();
    for line in items {
        subtotal = line
            .unit_price()
            .checked_multiply_quantity(line.quantity)
            .and_then(|line_total| subtotal.checked_add(line_total))
            .ok_or_else(|| overflow("items"))?;
    }

    let discount_amount = discount.amount_for(subtotal);
    if discount_amount > subtotal {
        return Err(ValidationError::OutOfRange {
            field: "discount".to_string(),
            min: 0,
            max: subtotal.cents(),
        }
        .into());
    }

    let expenses =
        expense::total(&additional_expenses).ok_or_else(|| overflow("additional_expenses"))?;
    let taxable = subtotal
        .checked_add(expenses)
        .ok_or_else(|| overflow("additional_expenses"))?
        - discount_amount;
    let vat = taxable.percent(vat_rate);
    let total = taxable.checked_add(vat).ok_or_else(|| overflow("total"))?;

    Ok(MoneySummary {
        subtotal_cents: subtotal.cents(),
        discount,
        discount_cents: discount_amount.cents(),
        additional_expenses,
        expenses_cents: expenses.cents(),
        taxable_cents: taxable.cents(),
        vat_rate_bps: vat_rate.bps(),
        vat_cents: vat.cents(),
        total_cents: total.cents(),
    })
}

fn overflow(field: &str) -> CoreError {
    ValidationError::OutOfRange {
        field: field.to_string(),
        min: 0,
        max: i64::MAX,
    }
    .into()
}

/// A quotation re-priced into another currency with a snapshot rate.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ConvertedQuotation {
    pub quotation_id: String,
    pub from_currency: String,
    pub currency: String,
    /// Units of `currency` per unit of `from_currency`.
    #[ts(as = "String")]
    pub rate: Decimal,
    pub items: Vec<LineItem>,
    pub summary: MoneySummary,
}

/// Re-prices lines and summary with `rate`, keeping the VAT snapshot.
///
/// Unit prices, expenses and fixed discounts are converted; percentage
/// discounts carry over unchanged. Totals are then recomputed rather than
/// converted so the pricing identity still holds to the cent.
pub fn reprice(
    items: &[LineItem],
    summary: &MoneySummary,
    rate: Decimal,
    currency: &str,
) -> CoreResult<(Vec<LineItem>, MoneySummary)> {
    if rate <= Decimal::ZERO {
        return Err(ValidationError::MustBePositive {
            field: "exchange rate".to_string(),
        }
        .into());
    }

    let convert = |m: Money| {
        m.convert(rate)
            .ok_or_else(|| CoreError::Internal(format!("amount {m} overflowed at rate {rate}")))
    };

    let mut converted_items = Vec::with_capacity(items.len());
    for line in items {
        let unit_price = convert(line.unit_price())?;
        converted_items.push(LineItem {
            unit_price_cents: unit_price.cents(),
            line_total_cents: unit_price
                .checked_multiply_quantity(line.quantity)
                .ok_or_else(|| overflow("items"))?
                .cents(),
            ..line.clone()
        });
    }

    let mut expenses = Vec::with_capacity(summary.additional_expenses.len());
    for e in &summary.additional_expenses {
        expenses.push(AdditionalExpense {
            amount_cents: convert(e.amount())?.cents(),
            currency: currency.to_string(),
            ..e.clone()
        });
    }

    let discount = match summary.discount {
        Discount::Fixed { amount_cents } => Discount::Fixed {
            amount_cents: convert(Money::from_cents(amount_cents))?.cents(),
        },
        other => other,
    };

    let summary = calculate(
        currency,
        &converted_items,
        discount,
        expenses,
        Rate::from_bps(summary.vat_rate_bps),
    )?;

    Ok((converted_items, summary))
}

// =============================================================================
// Unit Tests
// =============================================================================

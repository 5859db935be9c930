//! # Additional Expenses
//!
//! Quotation payloads carry "additional expenses" (registration, insurance,
//! delivery, ...) in more than one shape depending on the client version:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  missing / null                 →  []                                   │
//! │  { "title": "Registration",     →  [AdditionalExpense { ... }]          │
//! │    "amount": "350.00" }                                                 │
//! │  [ {..}, {..} ]                 →  [AdditionalExpense, ...]             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! [`RawExpenses::normalize`] collapses all of them into one tagged list at
//! the ingestion boundary; pricing and analytics only ever see
//! [`AdditionalExpense`].

use chrono::NaiveDate;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::ValidationError;
use crate::money::Money;
use crate::validation::{validate_currency, ValidationResult};

/// Category used when the payload does not name one.
pub const DEFAULT_EXPENSE_CATEGORY: &str = "other";

/// Normalized additional expense.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct AdditionalExpense {
    pub category: String,
    pub description: String,
    pub amount_cents: i64,
    pub currency: String,
}

impl AdditionalExpense {
    #[inline]
    pub fn amount(&self) -> Money {
        Money::from_cents(self.amount_cents)
    }
}

/// One expense entry as it arrives on the wire.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct RawExpense {
    #[serde(default, alias = "type")]
    pub category: Option<String>,
    #[serde(default, alias = "title", alias = "name")]
    pub description: Option<String>,
    #[serde(default)]
    pub amount_cents: Option<i64>,
    /// Older clients send major units ("350.00").
    #[serde(default)]
    #[ts(as = "Option<String>")]
    pub amount: Option<Decimal>,
    #[serde(default)]
    pub currency: Option<String>,
}

/// The accepted wire shapes.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(untagged)]
pub enum RawExpenses {
    #[default]
    None,
    Many(Vec<RawExpense>),
    One(RawExpense),
}

impl RawExpenses {
    /// Collapses any accepted shape into a list.
    ///
    /// Entries with neither an amount nor a description are dropped.
    /// Entries without a currency take `default_currency`.
    pub fn normalize(self, default_currency: &str) -> ValidationResult<Vec<AdditionalExpense>> {
        let raw = match self {
            RawExpenses::None => Vec::new(),
            RawExpenses::One(one) => vec![one],
            RawExpenses::Many(many) => many,
        };

        let mut expenses = Vec::with_capacity(raw.len());
        for entry in raw {
            let description = entry
                .description
                .as_deref()
                .map(str::trim)
                .unwrap_or_default()
                .to_string();
            let amount_cents = match (entry.amount_cents, entry.amount) {
                (Some(cents), _) => Some(cents),
                (None, Some(major)) => Some(major_to_cents(major)?),
                (None, None) => None,
            };

            let Some(amount_cents) = amount_cents else {
                if description.is_empty() {
                    continue;
                }
                return Err(ValidationError::Required {
                    field: format!("additional_expenses[{description}].amount"),
                });
            };
            if amount_cents == 0 && description.is_empty() {
                continue;
            }
            if amount_cents < 0 {
                return Err(ValidationError::MustBePositive {
                    field: "additional_expenses.amount".to_string(),
                });
            }

            let currency = match entry.currency {
                Some(code) => {
                    let code = code.trim().to_uppercase();
                    validate_currency(&code)?;
                    code
                }
                None => default_currency.to_string(),
            };

            expenses.push(AdditionalExpense {
                category: entry
                    .category
                    .map(|c| c.trim().to_lowercase())
                    .filter(|c| !c.is_empty())
                    .unwrap_or_else(|| DEFAULT_EXPENSE_CATEGORY.to_string()),
                description,
                amount_cents,
                currency,
            });
        }

        Ok(expenses)
    }
}

impl From<Vec<AdditionalExpense>> for RawExpenses {
    fn from(expenses: Vec<AdditionalExpense>) -> Self {
        RawExpenses::Many(
            expenses
                .into_iter()
                .map(|e| RawExpense {
                    category: Some(e.category),
                    description: Some(e.description),
                    amount_cents: Some(e.amount_cents),
                    amount: None,
                    currency: Some(e.currency),
                })
                .collect(),
        )
    }
}

/// A dealership running cost (rent, salaries, utilities) recorded outside any
/// sale. Analytics nets profit against these.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct OperatingExpense {
    pub id: String,
    pub category: String,
    pub description: String,
    pub amount_cents: i64,
    pub currency: String,
    #[ts(as = "String")]
    pub incurred_on: NaiveDate,
}

fn major_to_cents(major: Decimal) -> ValidationResult<i64> {
    (major * Decimal::ONE_HUNDRED)
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
        .ok_or_else(|| ValidationError::InvalidFormat {
            field: "additional_expenses.amount".to_string(),
            reason: "amount out of range".to_string(),
        })
}

/// Sum of expense amounts, or `None` on overflow.
pub fn total(expenses: &[AdditionalExpense]) -> Option<Money> {
    expenses
        .iter()
        .try_fold(Money::zero(), |sum, e| sum.checked_add(e.amount()))
}

// =============================================================================
// Unit Tests
// =============================================================================

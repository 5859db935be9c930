//! # Domain Types
//!
//! Core domain types of the dealership sales pipeline.
//!
//! ## Type Map
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │   Quotation     │   │   StockItem     │   │    Invoice      │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (UUID)      │   │  id             │   │  id (UUID)      │       │
//! │  │  QT-00042       │   │  quantity       │   │  INV-00017      │       │
//! │  │  customer snap  │   │  cost/selling   │   │  quotation_id   │       │
//! │  │  items[]        │   │  units[] ──────────► UnitRecord       │       │
//! │  │  summary        │   │                 │   │  payment        │       │
//! │  │  history[]      │   │                 │   │  history[]      │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! │                                                                         │
//! │  LineItem ── snapshot of the stock item at quotation time              │
//! │  MoneySummary ── subtotal / discount / expenses / VAT / total          │
//! │  StatusHistory<S> ── append-only (status, changed_at, actor_id) log    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Dual-Key Identity Pattern
//! Quotations and invoices carry a UUID `id` for relations and a sequential
//! display number (`QT-00042`, `INV-00017`) for people.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

use crate::error::{CoreResult, ValidationError};
use crate::expense::{AdditionalExpense, RawExpenses};
use crate::money::Money;

// =============================================================================
// Rate
// =============================================================================

/// A percentage in basis points (500 bps = 5%).
///
/// Used for VAT and percentage discounts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Rate(u32);

impl Rate {
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        Rate(bps)
    }

    /// Creates a rate from a percentage (7.5 → 750 bps).
    pub fn from_percentage(pct: f64) -> Self {
        Rate((pct * 100.0).round().max(0.0) as u32)
    }

    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// Percentage for display only.
    #[inline]
    pub fn percentage(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    #[inline]
    pub const fn zero() -> Self {
        Rate(0)
    }
}

// =============================================================================
// Directory (read-only collaborators)
// =============================================================================

/// Kind of party in the shared directory. Only `Customer` may be quoted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PartyKind {
    Customer,
    Supplier,
    Employee,
}

/// A directory entry as supplied by the external directory.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Customer {
    pub id: String,
    pub kind: PartyKind,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub trn: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// Customer fields frozen onto a quotation at creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CustomerSnapshot {
    pub customer_id: String,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub trn: Option<String>,
}

impl From<&Customer> for CustomerSnapshot {
    fn from(customer: &Customer) -> Self {
        CustomerSnapshot {
            customer_id: customer.id.clone(),
            name: customer.name.clone(),
            email: customer.email.clone(),
            phone: customer.phone.clone(),
            address: customer.address.clone(),
            trn: customer.trn.clone(),
        }
    }
}

/// The selling company's letterhead and tax settings.
///
/// Injected from configuration once per operation and copied onto
/// quotations (VAT rate) and invoices (the whole profile).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CompanyProfile {
    pub name: String,
    pub address: Option<String>,
    pub trn: Option<String>,
    pub vat_rate_bps: u32,
    pub bank_name: Option<String>,
    pub bank_account: Option<String>,
}

impl CompanyProfile {
    #[inline]
    pub fn vat_rate(&self) -> Rate {
        Rate::from_bps(self.vat_rate_bps)
    }
}

// =============================================================================
// Discount
// =============================================================================

/// Discount applied to a quotation subtotal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Discount {
    #[default]
    None,
    /// Percentage of the subtotal, in basis points.
    Percentage { rate_bps: u32 },
    /// Fixed amount in the document currency.
    Fixed { amount_cents: i64 },
}

impl Discount {
    /// Discount amount for a given subtotal.
    pub fn amount_for(&self, subtotal: Money) -> Money {
        match *self {
            Discount::None => Money::zero(),
            Discount::Percentage { rate_bps } => subtotal.percent(Rate::from_bps(rate_bps)),
            Discount::Fixed { amount_cents } => Money::from_cents(amount_cents),
        }
    }
}

// =============================================================================
// Line Item
// =============================================================================

/// A line on a quotation or invoice.
/// Uses snapshot pattern to freeze vehicle data at quotation time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct LineItem {
    pub stock_item_id: String,
    pub name: String,
    pub make: Option<String>,
    pub model: Option<String>,
    pub year: Option<i32>,
    pub color: Option<String>,
    pub unit_price_cents: i64,
    pub quantity: i64,
    /// VINs assigned to this line; held while the quotation is open.
    pub chassis_numbers: Vec<String>,
    /// quantity × unit_price.
    pub line_total_cents: i64,
}

impl LineItem {
    #[inline]
    pub fn unit_price(&self) -> Money {
        Money::from_cents(self.unit_price_cents)
    }

    #[inline]
    pub fn line_total(&self) -> Money {
        Money::from_cents(self.line_total_cents)
    }

    /// Sets the unit price and recomputes the line total.
    ///
    /// ## Errors
    /// `OutOfRange` when `unit_price × quantity` overflows.
    pub fn set_unit_price(&mut self, unit_price: Money) -> CoreResult<()> {
        let total = unit_price
            .checked_multiply_quantity(self.quantity)
            .ok_or_else(|| ValidationError::OutOfRange {
                field: format!("items[{}].line_total", self.stock_item_id),
                min: 0,
                max: i64::MAX,
            })?;
        self.unit_price_cents = unit_price.cents();
        self.line_total_cents = total.cents();
        Ok(())
    }
}

/// Requested line on a new quotation.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct LineItemRequest {
    pub stock_item_id: String,
    pub quantity: i64,
    /// Overrides the stock item's selling price when present.
    #[serde(default)]
    pub unit_price_cents: Option<i64>,
    #[serde(default)]
    pub chassis_numbers: Vec<String>,
}

// =============================================================================
// Money Summary
// =============================================================================

/// Computed money fields of a quotation (copied verbatim onto its invoice).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct MoneySummary {
    pub subtotal_cents: i64,
    pub discount: Discount,
    pub discount_cents: i64,
    pub additional_expenses: Vec<AdditionalExpense>,
    pub expenses_cents: i64,
    pub taxable_cents: i64,
    /// VAT rate snapshot taken at creation.
    pub vat_rate_bps: u32,
    pub vat_cents: i64,
    pub total_cents: i64,
}

impl MoneySummary {
    #[inline]
    pub fn subtotal(&self) -> Money {
        Money::from_cents(self.subtotal_cents)
    }

    #[inline]
    pub fn discount_amount(&self) -> Money {
        Money::from_cents(self.discount_cents)
    }

    #[inline]
    pub fn expenses(&self) -> Money {
        Money::from_cents(self.expenses_cents)
    }

    #[inline]
    pub fn vat(&self) -> Money {
        Money::from_cents(self.vat_cents)
    }

    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }
}

// =============================================================================
// Status History
// =============================================================================

/// One entry of a status log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
pub struct StatusChange<S> {
    pub status: S,
    #[ts(as = "String")]
    pub changed_at: DateTime<Utc>,
    pub actor_id: String,
}

/// Append-only status log owned by an aggregate.
///
/// Entries can only be pushed; there is no way to edit or reorder them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
pub struct StatusHistory<S> {
    entries: Vec<StatusChange<S>>,
}

impl<S: Copy> StatusHistory<S> {
    /// Starts a log with its initial entry.
    pub fn start(status: S, at: DateTime<Utc>, actor_id: impl Into<String>) -> Self {
        StatusHistory {
            entries: vec![StatusChange {
                status,
                changed_at: at,
                actor_id: actor_id.into(),
            }],
        }
    }

    /// Rebuilds a log from persisted entries (already in append order).
    pub fn from_entries(entries: Vec<StatusChange<S>>) -> Self {
        StatusHistory { entries }
    }

    pub fn push(&mut self, status: S, at: DateTime<Utc>, actor_id: impl Into<String>) {
        self.entries.push(StatusChange {
            status,
            changed_at: at,
            actor_id: actor_id.into(),
        });
    }

    pub fn entries(&self) -> &[StatusChange<S>] {
        &self.entries
    }

    /// Entries appended after the first `n`.
    pub fn since(&self, n: usize) -> &[StatusChange<S>] {
        &self.entries[n.min(self.entries.len())..]
    }

    pub fn latest(&self) -> Option<&StatusChange<S>> {
        self.entries.last()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// =============================================================================
// Quotation
// =============================================================================

/// Quotation workflow status. Edges live in [`crate::workflow`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum QuotationStatus {
    Draft,
    Sent,
    Viewed,
    Review,
    Accepted,
    Rejected,
    Expired,
    Approved,
    Confirmed,
    Converted,
}

impl QuotationStatus {
    pub const ALL: [QuotationStatus; 10] = [
        QuotationStatus::Draft,
        QuotationStatus::Sent,
        QuotationStatus::Viewed,
        QuotationStatus::Review,
        QuotationStatus::Accepted,
        QuotationStatus::Rejected,
        QuotationStatus::Expired,
        QuotationStatus::Approved,
        QuotationStatus::Confirmed,
        QuotationStatus::Converted,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            QuotationStatus::Draft => "draft",
            QuotationStatus::Sent => "sent",
            QuotationStatus::Viewed => "viewed",
            QuotationStatus::Review => "review",
            QuotationStatus::Accepted => "accepted",
            QuotationStatus::Rejected => "rejected",
            QuotationStatus::Expired => "expired",
            QuotationStatus::Approved => "approved",
            QuotationStatus::Confirmed => "confirmed",
            QuotationStatus::Converted => "converted",
        }
    }
}

impl fmt::Display for QuotationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A priced, non-binding proposal to a customer.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Quotation {
    pub id: String,
    pub quotation_number: String,
    pub sequence: i64,
    pub customer: CustomerSnapshot,
    pub items: Vec<LineItem>,
    pub currency: String,
    pub summary: MoneySummary,
    pub status: QuotationStatus,
    #[ts(as = "String")]
    pub valid_till: DateTime<Utc>,
    pub notes: Option<String>,
    pub history: StatusHistory<QuotationStatus>,
    pub created_by: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Quotation {
    /// Every VIN on the quotation, grouped by stock item in line order.
    pub fn chassis_by_stock_item(&self) -> Vec<(String, Vec<String>)> {
        let mut grouped: Vec<(String, Vec<String>)> = Vec::new();
        for item in &self.items {
            if item.chassis_numbers.is_empty() {
                continue;
            }
            match grouped.iter_mut().find(|(id, _)| *id == item.stock_item_id) {
                Some((_, vins)) => vins.extend(item.chassis_numbers.iter().cloned()),
                None => grouped.push((item.stock_item_id.clone(), item.chassis_numbers.clone())),
            }
        }
        grouped
    }
}

/// Payload for creating a quotation.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct QuotationRequest {
    pub customer_id: String,
    /// Defaults to the configured quotation currency.
    #[serde(default)]
    pub currency: Option<String>,
    pub items: Vec<LineItemRequest>,
    #[serde(default)]
    pub discount: Discount,
    #[serde(default)]
    pub additional_expenses: RawExpenses,
    /// Defaults to now + configured validity days.
    #[serde(default)]
    #[ts(as = "Option<String>")]
    pub valid_till: Option<DateTime<Utc>>,
    #[serde(default)]
    pub notes: Option<String>,
}

// =============================================================================
// Stock
// =============================================================================

/// Status of one serialized vehicle unit.
///
/// ```text
/// Active ──hold──► Hold ──sell──► Sold
///   ▲               │
///   └────release────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum UnitStatus {
    Active,
    Hold,
    Sold,
    Inactive,
}

impl UnitStatus {
    pub const fn as_str(&self) -> &'static str {
        match self {
            UnitStatus::Active => "active",
            UnitStatus::Hold => "hold",
            UnitStatus::Sold => "sold",
            UnitStatus::Inactive => "inactive",
        }
    }
}

impl fmt::Display for UnitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One serialized unit (VIN) of a stock item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct UnitRecord {
    pub chassis_number: String,
    pub engine_number: Option<String>,
    pub color: Option<String>,
    pub status: UnitStatus,
}

/// Aggregate status of a stock item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum StockStatus {
    Active,
    OutOfStock,
    Inactive,
}

impl StockStatus {
    /// Status implied by a quantity; an inactive item stays inactive.
    pub fn for_quantity(current: StockStatus, quantity: i64) -> StockStatus {
        match current {
            StockStatus::Inactive => StockStatus::Inactive,
            _ if quantity > 0 => StockStatus::Active,
            _ => StockStatus::OutOfStock,
        }
    }
}

/// A stock item with its serialized units.
///
/// Invariant: `quantity` equals the number of units in `Active`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct StockItem {
    pub id: String,
    pub name: String,
    pub make: Option<String>,
    pub model: Option<String>,
    pub year: Option<i32>,
    pub color: Option<String>,
    pub cost_price_cents: i64,
    pub selling_price_cents: i64,
    pub currency: String,
    pub quantity: i64,
    pub status: StockStatus,
    pub units: Vec<UnitRecord>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl StockItem {
    #[inline]
    pub fn cost_price(&self) -> Money {
        Money::from_cents(self.cost_price_cents)
    }

    #[inline]
    pub fn selling_price(&self) -> Money {
        Money::from_cents(self.selling_price_cents)
    }

    pub fn unit(&self, chassis_number: &str) -> Option<&UnitRecord> {
        self.units.iter().find(|u| u.chassis_number == chassis_number)
    }

    pub fn count_in(&self, status: UnitStatus) -> i64 {
        self.units.iter().filter(|u| u.status == status).count() as i64
    }

    /// Whether quantity agrees with the active unit count.
    pub fn is_consistent(&self) -> bool {
        self.units.is_empty() || self.quantity == self.count_in(UnitStatus::Active)
    }

    /// Snapshot line for a quotation.
    pub fn to_line(&self, request: &LineItemRequest) -> CoreResult<LineItem> {
        let unit_price = request
            .unit_price_cents
            .map(Money::from_cents)
            .unwrap_or_else(|| self.selling_price());
        let mut line = LineItem {
            stock_item_id: self.id.clone(),
            name: self.name.clone(),
            make: self.make.clone(),
            model: self.model.clone(),
            year: self.year,
            color: self.color.clone(),
            unit_price_cents: 0,
            quantity: request.quantity,
            chassis_numbers: request.chassis_numbers.clone(),
            line_total_cents: 0,
        };
        line.set_unit_price(unit_price)?;
        Ok(line)
    }
}

/// Normalized stock-item creation payload (produced by the bulk import).
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewStockItem {
    pub name: String,
    pub make: Option<String>,
    pub model: Option<String>,
    pub year: Option<i32>,
    pub color: Option<String>,
    pub cost_price_cents: i64,
    pub selling_price_cents: i64,
    pub currency: String,
    /// Used only when `units` is empty (non-serialized goods).
    #[serde(default)]
    pub quantity: i64,
    #[serde(default)]
    pub units: Vec<NewUnit>,
}

/// A unit inside a creation payload.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewUnit {
    pub chassis_number: String,
    #[serde(default)]
    pub engine_number: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
}

// =============================================================================
// Invoice
// =============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    #[default]
    Due,
    PartiallyPaid,
    FullyPaid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    BankTransfer,
    Card,
    Cheque,
    Finance,
}

/// Payment sub-record of an invoice.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PaymentRecord {
    pub status: PaymentStatus,
    pub amount_paid_cents: i64,
    pub method: Option<PaymentMethod>,
    #[ts(as = "Option<String>")]
    pub last_paid_at: Option<DateTime<Utc>>,
}

impl PaymentRecord {
    #[inline]
    pub fn amount_paid(&self) -> Money {
        Money::from_cents(self.amount_paid_cents)
    }

    /// Payment status implied by an amount paid against a total.
    pub fn status_for(paid: Money, total: Money) -> PaymentStatus {
        if paid >= total {
            PaymentStatus::FullyPaid
        } else if paid.is_positive() {
            PaymentStatus::PartiallyPaid
        } else {
            PaymentStatus::Due
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceStatus {
    Issued,
    Paid,
    Cancelled,
}

impl InvoiceStatus {
    pub const fn as_str(&self) -> &'static str {
        match self {
            InvoiceStatus::Issued => "issued",
            InvoiceStatus::Paid => "paid",
            InvoiceStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A binding invoice created from exactly one approved quotation.
///
/// Line items and the money summary are copied once and never re-priced.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Invoice {
    pub id: String,
    pub invoice_number: String,
    pub sequence: i64,
    pub quotation_id: String,
    pub quotation_number: String,
    pub customer: CustomerSnapshot,
    pub items: Vec<LineItem>,
    pub currency: String,
    pub summary: MoneySummary,
    pub payment: PaymentRecord,
    #[ts(as = "String")]
    pub invoice_date: NaiveDate,
    #[ts(as = "String")]
    pub due_date: NaiveDate,
    pub status: InvoiceStatus,
    pub history: StatusHistory<InvoiceStatus>,
    pub company: CompanyProfile,
    pub notes: Option<String>,
    pub created_by: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Invoice {
    /// Total still owed.
    pub fn outstanding(&self) -> Money {
        self.summary.total() - self.payment.amount_paid()
    }
}

/// Caller-supplied extras when converting a quotation to an invoice.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct InvoiceExtras {
    #[serde(default)]
    #[ts(as = "Option<String>")]
    pub invoice_date: Option<NaiveDate>,
    #[serde(default)]
    #[ts(as = "Option<String>")]
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    pub payment_method: Option<PaymentMethod>,
    /// Down payment taken at signing.
    #[serde(default)]
    pub initial_payment_cents: Option<i64>,
    #[serde(default)]
    pub notes: Option<String>,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_unit_price_guards_overflow() {
        let mut line = LineItem {
            stock_item_id: "stk-1".to_string(),
            name: "Land Cruiser GXR".to_string(),
            make: None,
            model: None,
            year: None,
            color: None,
            unit_price_cents: 0,
            quantity: 3,
            chassis_numbers: Vec::new(),
            line_total_cents: 0,
        };

        line.set_unit_price(Money::from_cents(1_200_000)).unwrap();
        assert_eq!(line.line_total_cents, 3_600_000);

        assert!(line.set_unit_price(Money::from_cents(i64::MAX / 2)).is_err());
        assert_eq!(line.unit_price_cents, 1_200_000);
    }

    #[test]
    fn test_rate_from_percentage() {
        assert_eq!(Rate::from_percentage(5.0).bps(), 500);
        assert_eq!(Rate::from_percentage(7.25).bps(), 725);
    }

    #[test]
    fn test_discount_amounts() {
        let subtotal = Money::from_major(12_000);
        assert_eq!(Discount::None.amount_for(subtotal), Money::zero());
        assert_eq!(
            Discount::Percentage { rate_bps: 1000 }.amount_for(subtotal),
            Money::from_major(1_200)
        );
        assert_eq!(
            Discount::Fixed { amount_cents: 50_000 }.amount_for(subtotal),
            Money::from_major(500)
        );
    }

    #[test]
    fn test_discount_serde_tagged() {
        let discount: Discount =
            serde_json::from_str(r#"{"type":"percentage","rate_bps":1000}"#).unwrap();
        assert_eq!(discount, Discount::Percentage { rate_bps: 1000 });
    }

    #[test]
    fn test_payment_status_for() {
        let total = Money::from_major(100);
        assert_eq!(PaymentRecord::status_for(Money::zero(), total), PaymentStatus::Due);
        assert_eq!(
            PaymentRecord::status_for(Money::from_major(40), total),
            PaymentStatus::PartiallyPaid
        );
        assert_eq!(
            PaymentRecord::status_for(Money::from_major(100), total),
            PaymentStatus::FullyPaid
        );
    }

    #[test]
    fn test_stock_status_for_quantity() {
        assert_eq!(StockStatus::for_quantity(StockStatus::Active, 0), StockStatus::OutOfStock);
        assert_eq!(StockStatus::for_quantity(StockStatus::OutOfStock, 2), StockStatus::Active);
        assert_eq!(StockStatus::for_quantity(StockStatus::Inactive, 2), StockStatus::Inactive);
    }

    #[test]
    fn test_history_is_append_only() {
        let now = Utc::now();
        let mut history = StatusHistory::start(QuotationStatus::Draft, now, "u-1");
        history.push(QuotationStatus::Sent, now, "u-2");
        assert_eq!(history.len(), 2);
        assert_eq!(history.latest().unwrap().status, QuotationStatus::Sent);
        assert_eq!(history.since(1).len(), 1);
        assert_eq!(history.since(5).len(), 0);
    }
}

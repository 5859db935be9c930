//! # Sales Analytics
//!
//! Profit reports over a window of invoices, partitioned by currency and
//! bucketed in time.
//!
//! ## Per-Invoice Figures
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  items_selling      = invoice subtotal                                  │
//! │  item_cost          = Σ quantity × CURRENT stock cost price, expressed  │
//! │                       in the invoice currency                           │
//! │  net_revenue        = items_selling − discount                          │
//! │  total_cost         = item_cost + additional expenses                   │
//! │  profit_without_vat = net_revenue − total_cost                          │
//! │  profit_with_vat    = profit_without_vat − vat                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Cost is looked up live, so editing a stock item's cost price changes
//! historical profit. The caller converts each cost into the currency of the
//! invoice that sold it and files it in a [`CostBook`]. Lines with no entry
//! for their invoice currency (stock item gone, no usable rate) cost zero and
//! are counted in `missing_cost_lines`.
//!
//! ## Aggregation
//! ```text
//!   invoices ──► per-currency buckets (partition) ──► overall = Σ buckets
//!        │
//!        └────► time buckets (day/week/month/year), overall and per currency
//!
//!   net_profit_after_expense = profit_without_vat − external expenses
//! ```
//!
//! The overall summary adds amounts across currencies without conversion.

use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::types::{Invoice, InvoiceStatus, PaymentStatus};

// =============================================================================
// Query
// =============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum GroupBy {
    Day,
    Week,
    #[default]
    Month,
    Year,
}

impl GroupBy {
    /// First day of the bucket containing `date`. Weeks start on Monday.
    pub fn period_start(&self, date: NaiveDate) -> NaiveDate {
        match self {
            GroupBy::Day => date,
            GroupBy::Week => {
                date - Duration::days(date.weekday().num_days_from_monday() as i64)
            }
            GroupBy::Month => NaiveDate::from_ymd_opt(date.year(), date.month(), 1).unwrap_or(date),
            GroupBy::Year => NaiveDate::from_ymd_opt(date.year(), 1, 1).unwrap_or(date),
        }
    }

    /// Human label for a bucket: `2024-03-15`, `2024-W11`, `2024-03`, `2024`.
    pub fn label(&self, period_start: NaiveDate) -> String {
        match self {
            GroupBy::Day => period_start.format("%Y-%m-%d").to_string(),
            GroupBy::Week => {
                let week = period_start.iso_week();
                format!("{}-W{:02}", week.year(), week.week())
            }
            GroupBy::Month => period_start.format("%Y-%m").to_string(),
            GroupBy::Year => period_start.format("%Y").to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct AnalyticsQuery {
    #[ts(as = "String")]
    pub date_from: NaiveDate,
    #[ts(as = "String")]
    pub date_to: NaiveDate,
    #[serde(default)]
    pub group_by: GroupBy,
    /// Keep only the most recent `limit` time buckets.
    #[serde(default)]
    pub limit: Option<usize>,
}

impl AnalyticsQuery {
    pub fn validate(&self) -> CoreResult<()> {
        if self.date_from > self.date_to {
            return Err(ValidationError::Inconsistent {
                field: "date_from".to_string(),
                reason: format!("{} is after {}", self.date_from, self.date_to),
            }
            .into());
        }
        if self.limit == Some(0) {
            return Err(ValidationError::MustBePositive {
                field: "limit".to_string(),
            }
            .into());
        }
        Ok(())
    }

    fn covers(&self, date: NaiveDate) -> bool {
        self.date_from <= date && date <= self.date_to
    }
}

// =============================================================================
// Summaries
// =============================================================================

/// Profit figures for one set of invoices. All amounts in cents.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ProfitSummary {
    pub invoice_count: i64,
    pub items_selling_cents: i64,
    pub discount_cents: i64,
    pub expenses_cents: i64,
    pub item_cost_cents: i64,
    pub net_revenue_cents: i64,
    pub total_cost_cents: i64,
    pub profit_without_vat_cents: i64,
    pub vat_cents: i64,
    pub profit_with_vat_cents: i64,
    pub total_cents: i64,
    pub paid_count: i64,
    pub pending_count: i64,
    pub paid_amount_cents: i64,
    pub pending_amount_cents: i64,
    pub average_invoice_cents: i64,
    pub average_profit_cents: i64,
    pub missing_cost_lines: i64,
    pub external_expenses_cents: i64,
    pub net_profit_after_expense_cents: i64,
}

impl ProfitSummary {
    fn add_invoice(&mut self, invoice: &Invoice, cost_prices: &CostBook) {
        let mut item_cost = Money::zero();
        for line in &invoice.items {
            match cost_prices.get(&line.stock_item_id, &invoice.currency) {
                Some(cost) => item_cost += cost.multiply_quantity(line.quantity),
                None => self.missing_cost_lines += 1,
            }
        }

        let summary = &invoice.summary;
        let net_revenue = summary.subtotal() - summary.discount_amount();
        let total_cost = item_cost + summary.expenses();
        let profit_without_vat = net_revenue - total_cost;

        self.invoice_count += 1;
        self.items_selling_cents += summary.subtotal_cents;
        self.discount_cents += summary.discount_cents;
        self.expenses_cents += summary.expenses_cents;
        self.item_cost_cents += item_cost.cents();
        self.net_revenue_cents += net_revenue.cents();
        self.total_cost_cents += total_cost.cents();
        self.profit_without_vat_cents += profit_without_vat.cents();
        self.vat_cents += summary.vat_cents;
        self.profit_with_vat_cents += (profit_without_vat - summary.vat()).cents();
        self.total_cents += summary.total_cents;

        if invoice.payment.status == PaymentStatus::FullyPaid {
            self.paid_count += 1;
        } else {
            self.pending_count += 1;
        }
        self.paid_amount_cents += invoice.payment.amount_paid_cents;
        self.pending_amount_cents += invoice.outstanding().cents().max(0);
    }

    fn merge(&mut self, other: &ProfitSummary) {
        self.invoice_count += other.invoice_count;
        self.items_selling_cents += other.items_selling_cents;
        self.discount_cents += other.discount_cents;
        self.expenses_cents += other.expenses_cents;
        self.item_cost_cents += other.item_cost_cents;
        self.net_revenue_cents += other.net_revenue_cents;
        self.total_cost_cents += other.total_cost_cents;
        self.profit_without_vat_cents += other.profit_without_vat_cents;
        self.vat_cents += other.vat_cents;
        self.profit_with_vat_cents += other.profit_with_vat_cents;
        self.total_cents += other.total_cents;
        self.paid_count += other.paid_count;
        self.pending_count += other.pending_count;
        self.paid_amount_cents += other.paid_amount_cents;
        self.pending_amount_cents += other.pending_amount_cents;
        self.missing_cost_lines += other.missing_cost_lines;
        self.external_expenses_cents += other.external_expenses_cents;
    }

    /// Fills the derived fields once accumulation is done.
    fn finish(&mut self) {
        self.average_invoice_cents = Money::from_cents(self.total_cents)
            .average(self.invoice_count)
            .cents();
        self.average_profit_cents = Money::from_cents(self.profit_without_vat_cents)
            .average(self.invoice_count)
            .cents();
        self.net_profit_after_expense_cents =
            self.profit_without_vat_cents - self.external_expenses_cents;
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TimeBucket {
    pub period: String,
    #[ts(as = "String")]
    pub period_start: NaiveDate,
    pub summary: ProfitSummary,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SalesAnalytics {
    #[ts(as = "String")]
    pub date_from: NaiveDate,
    #[ts(as = "String")]
    pub date_to: NaiveDate,
    pub group_by: GroupBy,
    pub overall_summary: ProfitSummary,
    pub per_currency_summaries: BTreeMap<String, ProfitSummary>,
    pub time_series: Vec<TimeBucket>,
    pub per_currency_time_series: BTreeMap<String, Vec<TimeBucket>>,
}

// =============================================================================
// Aggregation
// =============================================================================

/// Unit cost per stock item, keyed by the currency it is expressed in.
///
/// An invoice only ever reads the entry for its own currency, so a cost
/// recorded in AED is never subtracted from USD revenue.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CostBook {
    by_currency: HashMap<String, HashMap<String, Money>>,
}

impl CostBook {
    pub fn insert(
        &mut self,
        stock_item_id: impl Into<String>,
        currency: impl Into<String>,
        cost: Money,
    ) {
        self.by_currency
            .entry(currency.into())
            .or_default()
            .insert(stock_item_id.into(), cost);
    }

    pub fn get(&self, stock_item_id: &str, currency: &str) -> Option<Money> {
        self.by_currency.get(currency)?.get(stock_item_id).copied()
    }

    pub fn contains(&self, stock_item_id: &str, currency: &str) -> bool {
        self.get(stock_item_id, currency).is_some()
    }
}

/// Everything the aggregator reads.
#[derive(Debug, Clone, Copy)]
pub struct AnalyticsInput<'a> {
    pub query: &'a AnalyticsQuery,
    pub invoices: &'a [Invoice],
    /// Live cost prices, already in each invoice's currency.
    pub cost_prices: &'a CostBook,
    /// External expense totals per currency for the same window.
    pub external_expenses: &'a BTreeMap<String, Money>,
}

/// Builds the report.
///
/// Invoices outside the window and cancelled invoices are ignored.
///
/// ## Errors
/// - `Validation` for a bad query
/// - `Internal` when the currency or time buckets fail to partition the
///   counted invoices
pub fn analyze(input: AnalyticsInput<'_>) -> CoreResult<SalesAnalytics> {
    let query = input.query;
    query.validate()?;

    let counted: Vec<&Invoice> = input
        .invoices
        .iter()
        .filter(|i| i.status != InvoiceStatus::Cancelled && query.covers(i.invoice_date))
        .collect();

    let mut per_currency: BTreeMap<String, ProfitSummary> = BTreeMap::new();
    let mut series: BTreeMap<NaiveDate, ProfitSummary> = BTreeMap::new();
    let mut per_currency_series: BTreeMap<String, BTreeMap<NaiveDate, ProfitSummary>> =
        BTreeMap::new();

    for invoice in &counted {
        let start = query.group_by.period_start(invoice.invoice_date);

        per_currency
            .entry(invoice.currency.clone())
            .or_default()
            .add_invoice(invoice, input.cost_prices);
        series
            .entry(start)
            .or_default()
            .add_invoice(invoice, input.cost_prices);
        per_currency_series
            .entry(invoice.currency.clone())
            .or_default()
            .entry(start)
            .or_default()
            .add_invoice(invoice, input.cost_prices);
    }

    verify_partition("currency", &counted, per_currency.values())?;
    verify_partition("time", &counted, series.values())?;

    for (currency, amount) in input.external_expenses {
        per_currency
            .entry(currency.clone())
            .or_default()
            .external_expenses_cents += amount.cents();
    }

    let mut overall = ProfitSummary::default();
    for summary in per_currency.values_mut() {
        overall.merge(summary);
        summary.finish();
    }
    overall.finish();

    let group_by = query.group_by;
    let to_buckets = |map: BTreeMap<NaiveDate, ProfitSummary>| -> Vec<TimeBucket> {
        let mut buckets: Vec<TimeBucket> = map
            .into_iter()
            .map(|(period_start, mut summary)| {
                summary.finish();
                TimeBucket {
                    period: group_by.label(period_start),
                    period_start,
                    summary,
                }
            })
            .collect();
        if let Some(limit) = query.limit {
            let excess = buckets.len().saturating_sub(limit);
            buckets.drain(..excess);
        }
        buckets
    };

    Ok(SalesAnalytics {
        date_from: query.date_from,
        date_to: query.date_to,
        group_by,
        overall_summary: overall,
        per_currency_summaries: per_currency,
        time_series: to_buckets(series),
        per_currency_time_series: per_currency_series
            .into_iter()
            .map(|(currency, map)| (currency, to_buckets(map)))
            .collect(),
    })
}

fn verify_partition<'a>(
    dimension: &str,
    counted: &[&Invoice],
    buckets: impl Iterator<Item = &'a ProfitSummary>,
) -> CoreResult<()> {
    let bucketed: i64 = buckets.map(|s| s.invoice_count).sum();
    if bucketed != counted.len() as i64 {
        return Err(CoreError::Internal(format!(
            "{dimension} buckets hold {bucketed} invoices, expected {}",
            counted.len()
        )));
    }
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{
        CompanyProfile, CustomerSnapshot, Discount, LineItem, MoneySummary, PaymentRecord,
        StatusHistory,
    };
    use chrono::Utc;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    /// One-line invoice: selling price, 5% VAT, optional discount.
    fn invoice(
        id: &str,
        currency: &str,
        on: NaiveDate,
        price_cents: i64,
        discount_cents: i64,
        paid_cents: i64,
    ) -> Invoice {
        let now = Utc::now();
        let taxable = price_cents - discount_cents;
        let vat = taxable / 20;
        let total = taxable + vat;
        Invoice {
            id: id.to_string(),
            invoice_number: format!("INV-{id}"),
            sequence: 1,
            quotation_id: format!("q-{id}"),
            quotation_number: format!("QT-{id}"),
            customer: CustomerSnapshot {
                customer_id: "c-1".to_string(),
                name: "Omar Haddad".to_string(),
                email: None,
                phone: None,
                address: None,
                trn: None,
            },
            items: vec![LineItem {
                stock_item_id: "stk-1".to_string(),
                name: "Prado TXL".to_string(),
                make: None,
                model: None,
                year: None,
                color: None,
                unit_price_cents: price_cents,
                quantity: 1,
                chassis_numbers: vec![format!("VIN-{id}")],
                line_total_cents: price_cents,
            }],
            currency: currency.to_string(),
            summary: MoneySummary {
                subtotal_cents: price_cents,
                discount: Discount::Fixed {
                    amount_cents: discount_cents,
                },
                discount_cents,
                additional_expenses: Vec::new(),
                expenses_cents: 0,
                taxable_cents: taxable,
                vat_rate_bps: 500,
                vat_cents: vat,
                total_cents: total,
            },
            payment: PaymentRecord {
                status: PaymentRecord::status_for(
                    Money::from_cents(paid_cents),
                    Money::from_cents(total),
                ),
                amount_paid_cents: paid_cents,
                method: None,
                last_paid_at: None,
            },
            invoice_date: on,
            due_date: on,
            status: InvoiceStatus::Issued,
            history: StatusHistory::start(InvoiceStatus::Issued, now, "u-1"),
            company: CompanyProfile {
                name: "Al Noor Motors".to_string(),
                address: None,
                trn: None,
                vat_rate_bps: 500,
                bank_name: None,
                bank_account: None,
            },
            notes: None,
            created_by: "u-1".to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    fn query(group_by: GroupBy) -> AnalyticsQuery {
        AnalyticsQuery {
            date_from: date(2024, 1, 1),
            date_to: date(2024, 12, 31),
            group_by,
            limit: None,
        }
    }

    fn costs(cost_cents: i64) -> CostBook {
        let mut book = CostBook::default();
        for currency in ["AED", "USD"] {
            book.insert("stk-1", currency, Money::from_cents(cost_cents));
        }
        book
    }

    #[test]
    fn test_single_invoice_profit() {
        let invoices = vec![invoice("1", "AED", date(2024, 3, 5), 1_200_000, 120_000, 0)];
        let q = query(GroupBy::Month);
        let report = analyze(AnalyticsInput {
            query: &q,
            invoices: &invoices,
            cost_prices: &costs(900_000),
            external_expenses: &BTreeMap::new(),
        })
        .unwrap();

        let s = &report.overall_summary;
        assert_eq!(s.net_revenue_cents, 1_080_000);
        assert_eq!(s.total_cost_cents, 900_000);
        assert_eq!(s.profit_without_vat_cents, 180_000);
        assert_eq!(s.vat_cents, 54_000);
        assert_eq!(s.profit_with_vat_cents, 126_000);
        assert_eq!(s.pending_count, 1);
        assert_eq!(s.pending_amount_cents, 1_134_000);
    }

    #[test]
    fn test_currency_buckets_partition_invoices() {
        let invoices = vec![
            invoice("1", "AED", date(2024, 3, 5), 100_000, 0, 0),
            invoice("2", "USD", date(2024, 3, 6), 50_000, 0, 0),
            invoice("3", "AED", date(2024, 4, 1), 70_000, 0, 0),
        ];
        let q = query(GroupBy::Month);
        let report = analyze(AnalyticsInput {
            query: &q,
            invoices: &invoices,
            cost_prices: &costs(10_000),
            external_expenses: &BTreeMap::new(),
        })
        .unwrap();

        let per_currency: i64 = report
            .per_currency_summaries
            .values()
            .map(|s| s.invoice_count)
            .sum();
        assert_eq!(per_currency, report.overall_summary.invoice_count);
        assert_eq!(report.per_currency_summaries["AED"].invoice_count, 2);

        // Overall adds raw amounts across currencies
        assert_eq!(report.overall_summary.items_selling_cents, 220_000);
    }

    #[test]
    fn test_live_cost_and_missing_items() {
        let invoices = vec![invoice("1", "AED", date(2024, 3, 5), 100_000, 0, 0)];
        let q = query(GroupBy::Month);

        let with_cost = analyze(AnalyticsInput {
            query: &q,
            invoices: &invoices,
            cost_prices: &costs(80_000),
            external_expenses: &BTreeMap::new(),
        })
        .unwrap();
        let repriced = analyze(AnalyticsInput {
            query: &q,
            invoices: &invoices,
            cost_prices: &costs(90_000),
            external_expenses: &BTreeMap::new(),
        })
        .unwrap();
        assert_eq!(with_cost.overall_summary.profit_without_vat_cents, 20_000);
        assert_eq!(repriced.overall_summary.profit_without_vat_cents, 10_000);

        let missing = analyze(AnalyticsInput {
            query: &q,
            invoices: &invoices,
            cost_prices: &CostBook::default(),
            external_expenses: &BTreeMap::new(),
        })
        .unwrap();
        assert_eq!(missing.overall_summary.missing_cost_lines, 1);
        assert_eq!(missing.overall_summary.item_cost_cents, 0);
    }

    #[test]
    fn test_cost_read_in_invoice_currency() {
        let invoices = vec![
            invoice("1", "AED", date(2024, 3, 5), 1_200_000, 0, 0),
            invoice("2", "USD", date(2024, 3, 5), 326_760, 0, 0),
        ];
        let mut book = CostBook::default();
        book.insert("stk-1", "AED", Money::from_cents(900_000));
        book.insert("stk-1", "USD", Money::from_cents(245_070));

        let q = query(GroupBy::Month);
        let report = analyze(AnalyticsInput {
            query: &q,
            invoices: &invoices,
            cost_prices: &book,
            external_expenses: &BTreeMap::new(),
        })
        .unwrap();
        assert_eq!(report.per_currency_summaries["AED"].item_cost_cents, 900_000);
        assert_eq!(report.per_currency_summaries["USD"].item_cost_cents, 245_070);
        assert_eq!(
            report.per_currency_summaries["USD"].profit_without_vat_cents,
            81_690
        );

        // An AED cost alone never prices a USD line
        let mut aed_only = CostBook::default();
        aed_only.insert("stk-1", "AED", Money::from_cents(900_000));
        let report = analyze(AnalyticsInput {
            query: &q,
            invoices: &invoices,
            cost_prices: &aed_only,
            external_expenses: &BTreeMap::new(),
        })
        .unwrap();
        let usd = &report.per_currency_summaries["USD"];
        assert_eq!(usd.item_cost_cents, 0);
        assert_eq!(usd.missing_cost_lines, 1);
        assert_eq!(report.per_currency_summaries["AED"].missing_cost_lines, 0);
    }

    #[test]
    fn test_net_profit_after_external_expenses() {
        let invoices = vec![
            invoice("1", "AED", date(2024, 3, 5), 100_000, 0, 0),
            invoice("2", "USD", date(2024, 3, 5), 100_000, 0, 0),
        ];
        let expenses = BTreeMap::from([
            ("AED".to_string(), Money::from_cents(5_000)),
            ("EUR".to_string(), Money::from_cents(1_000)),
        ]);
        let q = query(GroupBy::Month);
        let report = analyze(AnalyticsInput {
            query: &q,
            invoices: &invoices,
            cost_prices: &costs(60_000),
            external_expenses: &expenses,
        })
        .unwrap();

        let aed = &report.per_currency_summaries["AED"];
        assert_eq!(aed.net_profit_after_expense_cents, 40_000 - 5_000);
        assert_eq!(report.per_currency_summaries["EUR"].invoice_count, 0);
        assert_eq!(report.overall_summary.external_expenses_cents, 6_000);
        assert_eq!(
            report.overall_summary.net_profit_after_expense_cents,
            80_000 - 6_000
        );
    }

    #[test]
    fn test_paid_pending_split_and_averages() {
        let invoices = vec![
            invoice("1", "AED", date(2024, 3, 5), 100_000, 0, 105_000),
            invoice("2", "AED", date(2024, 3, 6), 200_000, 0, 10_000),
        ];
        let q = query(GroupBy::Month);
        let report = analyze(AnalyticsInput {
            query: &q,
            invoices: &invoices,
            cost_prices: &costs(0),
            external_expenses: &BTreeMap::new(),
        })
        .unwrap();

        let s = &report.overall_summary;
        assert_eq!(s.paid_count, 1);
        assert_eq!(s.pending_count, 1);
        assert_eq!(s.paid_amount_cents, 115_000);
        assert_eq!(s.pending_amount_cents, 210_000 - 10_000);
        assert_eq!(s.average_invoice_cents, (105_000 + 210_000) / 2);
    }

    #[test]
    fn test_time_buckets_and_labels() {
        let invoices = vec![
            invoice("1", "AED", date(2024, 3, 4), 1_000, 0, 0),
            invoice("2", "AED", date(2024, 3, 10), 1_000, 0, 0),
            invoice("3", "USD", date(2024, 3, 11), 1_000, 0, 0),
        ];
        let q = query(GroupBy::Week);
        let report = analyze(AnalyticsInput {
            query: &q,
            invoices: &invoices,
            cost_prices: &costs(0),
            external_expenses: &BTreeMap::new(),
        })
        .unwrap();

        let periods: Vec<&str> = report.time_series.iter().map(|b| b.period.as_str()).collect();
        assert_eq!(periods, vec!["2024-W10", "2024-W11"]);
        assert_eq!(report.time_series[0].summary.invoice_count, 2);
        assert_eq!(report.per_currency_time_series["USD"].len(), 1);

        assert_eq!(GroupBy::Day.label(date(2024, 3, 4)), "2024-03-04");
        assert_eq!(GroupBy::Month.period_start(date(2024, 3, 31)), date(2024, 3, 1));
        assert_eq!(GroupBy::Year.label(date(2024, 1, 1)), "2024");
    }

    #[test]
    fn test_limit_keeps_latest_buckets() {
        let invoices = vec![
            invoice("1", "AED", date(2024, 1, 5), 1_000, 0, 0),
            invoice("2", "AED", date(2024, 2, 5), 1_000, 0, 0),
            invoice("3", "AED", date(2024, 3, 5), 1_000, 0, 0),
        ];
        let mut q = query(GroupBy::Month);
        q.limit = Some(2);
        let report = analyze(AnalyticsInput {
            query: &q,
            invoices: &invoices,
            cost_prices: &costs(0),
            external_expenses: &BTreeMap::new(),
        })
        .unwrap();

        let periods: Vec<&str> = report.time_series.iter().map(|b| b.period.as_str()).collect();
        assert_eq!(periods, vec!["2024-02", "2024-03"]);
        // Summaries still cover the whole window
        assert_eq!(report.overall_summary.invoice_count, 3);
    }

    #[test]
    fn test_window_and_cancelled_filtered() {
        let mut cancelled = invoice("2", "AED", date(2024, 3, 5), 1_000, 0, 0);
        cancelled.status = InvoiceStatus::Cancelled;
        let invoices = vec![
            invoice("1", "AED", date(2023, 12, 31), 1_000, 0, 0),
            cancelled,
            invoice("3", "AED", date(2024, 3, 5), 1_000, 0, 0),
        ];
        let q = query(GroupBy::Year);
        let report = analyze(AnalyticsInput {
            query: &q,
            invoices: &invoices,
            cost_prices: &costs(0),
            external_expenses: &BTreeMap::new(),
        })
        .unwrap();
        assert_eq!(report.overall_summary.invoice_count, 1);
    }

    #[test]
    fn test_inverted_window_rejected() {
        let q = AnalyticsQuery {
            date_from: date(2024, 2, 1),
            date_to: date(2024, 1, 1),
            group_by: GroupBy::Day,
            limit: None,
        };
        assert!(q.validate().is_err());
    }
}

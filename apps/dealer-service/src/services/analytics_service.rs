//! # Analytics Service
//!
//! Loads invoices, live cost prices and external expenses for a window and
//! hands them to the pure aggregator in `dealer_core::analytics`.
//!
//! Cost prices are read at report time, not from the invoice: editing a
//! stock item's cost changes historical profit figures.
//!
//! ## Cost Currency
//! ```text
//!   stock cost (stock currency) ──► FX at report time ──► CostBook[invoice currency]
//!
//!   same currency     → used as is
//!   real rate         → converted
//!   fallback rate     → left out, counted in missing_cost_lines
//! ```

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use chrono::NaiveDate;
use dealer_core::analytics::{
    self, AnalyticsInput, AnalyticsQuery, CostBook, GroupBy, SalesAnalytics,
};
use dealer_core::Invoice;
use dealer_db::{CostPrice, Database};
use dealer_fx::CurrencyService;
use tracing::{debug, warn};

use crate::error::ServiceResult;

#[derive(Clone)]
pub struct AnalyticsService {
    db: Database,
    fx: Arc<CurrencyService>,
}

impl AnalyticsService {
    pub fn new(db: Database, fx: Arc<CurrencyService>) -> Self {
        AnalyticsService { db, fx }
    }

    pub async fn get_sales_analytics(
        &self,
        date_from: NaiveDate,
        date_to: NaiveDate,
        group_by: GroupBy,
        limit: Option<usize>,
    ) -> ServiceResult<SalesAnalytics> {
        let query = AnalyticsQuery {
            date_from,
            date_to,
            group_by,
            limit,
        };
        query.validate()?;

        let invoices = self.db.invoices().list_between(date_from, date_to).await?;

        let stock_ids: Vec<String> = invoices
            .iter()
            .flat_map(|i| i.items.iter().map(|l| l.stock_item_id.clone()))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let live_costs = self.db.stock().cost_prices(&stock_ids).await?;
        let cost_prices = self.cost_book(&invoices, &live_costs).await;
        let external_expenses = self
            .db
            .expenses()
            .totals_by_currency(date_from, date_to)
            .await?;

        debug!(
            invoices = invoices.len(),
            stock_items = stock_ids.len(),
            expense_currencies = external_expenses.len(),
            "Building sales analytics"
        );

        let report = analytics::analyze(AnalyticsInput {
            query: &query,
            invoices: &invoices,
            cost_prices: &cost_prices,
            external_expenses: &external_expenses,
        })?;
        Ok(report)
    }

    /// Expresses each sold item's live cost in the currency of the invoice
    /// that sold it.
    async fn cost_book(
        &self,
        invoices: &[Invoice],
        live_costs: &HashMap<String, CostPrice>,
    ) -> CostBook {
        let mut book = CostBook::default();
        let mut unpriced: BTreeSet<(String, String)> = BTreeSet::new();

        for invoice in invoices {
            for line in &invoice.items {
                let Some(live) = live_costs.get(&line.stock_item_id) else {
                    continue;
                };
                if book.contains(&live.id, &invoice.currency)
                    || unpriced.contains(&(live.id.clone(), invoice.currency.clone()))
                {
                    continue;
                }

                if live.currency == invoice.currency {
                    book.insert(live.id.clone(), invoice.currency.clone(), live.cost());
                    continue;
                }

                let conversion = self
                    .fx
                    .convert(live.cost(), &live.currency, &invoice.currency)
                    .await;
                if conversion.degraded {
                    warn!(
                        stock_item_id = %live.id,
                        from = %live.currency,
                        to = %invoice.currency,
                        "No exchange rate for cost price, leaving it out of profit"
                    );
                    unpriced.insert((live.id.clone(), invoice.currency.clone()));
                    continue;
                }
                book.insert(live.id.clone(), invoice.currency.clone(), conversion.amount);
            }
        }
        book
    }
}

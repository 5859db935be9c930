//! # dealer-service: Sales Pipeline
//!
//! Orchestrates quotations, invoices and analytics over the core, database
//! and currency crates. The HTTP surface lives outside this crate; every
//! operation here returns a [`ServiceError`] shaped for it.
//!
//! ## Layout
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          DealerServices                                 │
//! │                                                                         │
//! │   ┌────────────────────┐  ┌──────────────────┐  ┌──────────────────┐    │
//! │   │ QuotationService   │  │ InvoiceService   │  │ AnalyticsService │    │
//! │   │ create, workflow,  │  │ convert, payment │  │ profit report    │    │
//! │   │ expiry, re-quote   │  │                  │  │                  │    │
//! │   └─────────┬──────────┘  └────────┬─────────┘  └────────┬─────────┘    │
//! │             │                      │                     │              │
//! │             ▼                      ▼                     ▼              │
//! │     Database (SQLite) + ReservationLedger       CurrencyService (FX)    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod error;
pub mod services;
pub mod telemetry;

use std::sync::Arc;

use dealer_db::Database;
use dealer_fx::CurrencyService;

pub use config::{ConfigError, ServiceConfig};
pub use error::{ErrorKind, ServiceError, ServiceResult};
pub use services::analytics_service::AnalyticsService;
pub use services::invoice_service::InvoiceService;
pub use services::quotation_service::QuotationService;

/// All pipeline services, wired from one configuration.
#[derive(Clone)]
pub struct DealerServices {
    pub quotations: QuotationService,
    pub invoices: InvoiceService,
    pub analytics: AnalyticsService,
}

impl DealerServices {
    pub fn new(db: Database, fx: Arc<CurrencyService>, config: &ServiceConfig) -> Self {
        let company = config.company.profile();
        DealerServices {
            quotations: QuotationService::new(
                db.clone(),
                fx.clone(),
                company.clone(),
                config.quotation.clone(),
            ),
            invoices: InvoiceService::new(db.clone(), company, config.invoice.clone()),
            analytics: AnalyticsService::new(db, fx),
        }
    }
}

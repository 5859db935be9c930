//! # dealer-core: Pure Business Logic for the Dealership Sales Pipeline
//!
//! Everything in here is deterministic: no database, no network, no clock.
//! Time flows in through explicit `now` arguments.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Dealer Sales Architecture                          │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 dealer-service (orchestration)                  │   │
//! │  │  create_quotation, approve, reject, create_invoice, analytics   │   │
//! │  └──────────────┬──────────────────────────────────┬───────────────┘   │
//! │                 │                                  │                    │
//! │  ┌──────────────▼──────────────────────────────────▼───────────────┐   │
//! │  │               ★ dealer-core (THIS CRATE) ★                      │   │
//! │  │                                                                 │   │
//! │  │  ┌─────────┐ ┌─────────┐ ┌──────────┐ ┌────────────┐ ┌───────┐ │   │
//! │  │  │ money   │ │ pricing │ │ workflow │ │reservation │ │analyt.│ │   │
//! │  │  │ Money   │ │ VAT     │ │ status   │ │ VIN flips  │ │ P&L   │ │   │
//! │  │  │ Rate    │ │ totals  │ │ history  │ │ plans      │ │ series│ │   │
//! │  │  └─────────┘ └─────────┘ └──────────┘ └────────────┘ └───────┘ │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                 │                                  │                    │
//! │  ┌──────────────▼───────────────┐  ┌───────────────▼──────────────┐    │
//! │  │   dealer-db (SQLite, ledger) │  │   dealer-fx (rate cache)     │    │
//! │  └──────────────────────────────┘  └──────────────────────────────┘    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Quotation, StockItem, Invoice, ...)
//! - [`money`] - Integer-cent money with half-up percentage rounding
//! - [`expense`] - Normalization of the additional-expense payloads
//! - [`pricing`] - Subtotal/discount/VAT/total calculator
//! - [`workflow`] - Quotation state machine rules
//! - [`reservation`] - Two-phase VIN reservation planning
//! - [`analytics`] - Currency-partitioned profit reports
//! - [`validation`] - Input validation
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use dealer_core::money::Money;
//! use dealer_core::types::Rate;
//!
//! let taxable = Money::from_major(10_800);
//! let vat = taxable.percent(Rate::from_bps(500));
//! assert_eq!(vat, Money::from_major(540));
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod analytics;
pub mod error;
pub mod expense;
pub mod money;
pub mod pricing;
pub mod reservation;
pub mod types;
pub mod validation;
pub mod workflow;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Actor id recorded for transitions the system performs on its own
/// (time-based expiry).
pub const SYSTEM_ACTOR: &str = "system";

/// Maximum line items on one quotation.
pub const MAX_LINE_ITEMS: usize = 100;

/// Maximum quantity on a single line.
pub const MAX_LINE_QUANTITY: i64 = 999;

/// Maximum unit price or fixed discount, in cents (10 billion major units).
///
/// With `MAX_LINE_ITEMS` and `MAX_LINE_QUANTITY` a document subtotal stays
/// far below `i64::MAX`.
pub const MAX_PRICE_CENTS: i64 = 1_000_000_000_000;

/// Basis points in 100%.
pub const BPS_SCALE: i64 = 10_000;

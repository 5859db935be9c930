//! # dealer-fx: Currency Conversion Service
//!
//! Exchange rates for display and cross-currency quoting. Conversions are
//! advisory: a provider outage degrades to a stale rate or a neutral 1.0,
//! it never fails the caller.
//!
//! ## Module Organization
//!
//! - [`config`] - `[currency]` configuration section
//! - [`provider`] - `RateProvider` trait and the HTTP feed
//! - [`service`] - TTL cache, refresh deduplication, conversion
//! - [`error`] - Provider and configuration errors
//!
//! ## Usage
//!
//! ```rust,ignore
//! use dealer_fx::{CurrencyService, FxConfig};
//!
//! let fx = CurrencyService::from_config(FxConfig::default())?;
//! let usd = fx.convert(Money::from_major(1000), "AED", "USD").await;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod error;
pub mod provider;
pub mod service;

// =============================================================================
// Re-exports
// =============================================================================

pub use config::FxConfig;
pub use error::{FxError, FxResult};
pub use provider::{HttpRateProvider, RateProvider};
pub use service::{Conversion, CurrencyService, RateQuote, RateSource};

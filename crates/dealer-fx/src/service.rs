//! # Currency Service
//!
//! Cached exchange rates that never block a sale.
//!
//! ## Lookup Path
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  rate("AED")                                                            │
//! │     │                                                                   │
//! │     ├── code == base ───────────────────────────► 1.0      (Identity)  │
//! │     ├── pinned in config ───────────────────────► pinned   (Pinned)    │
//! │     ├── cached and younger than TTL ────────────► cached   (Cache)     │
//! │     │                                                                   │
//! │     ▼  per-code refresh lock (one fetch per code at a time)            │
//! │     ├── another caller refreshed meanwhile ─────► cached   (Cache)     │
//! │     ├── provider answers within timeout ────────► fresh    (Provider)  │
//! │     ├── provider fails, old entry exists ───────► old      (Stale)     │
//! │     └── provider fails, nothing cached ─────────► 1.0      (Fallback)  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Rates are "base per one unit of code". The cross rate from A to B is
//! `rate(A) / rate(B)`.

use dealer_core::Money;
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::config::FxConfig;
use crate::error::FxResult;
use crate::provider::{HttpRateProvider, RateProvider};

/// Where a rate came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RateSource {
    Identity,
    Pinned,
    Cache,
    Provider,
    Stale,
    Fallback,
}

impl RateSource {
    /// True when the rate is not a real quote.
    pub fn is_fallback(&self) -> bool {
        matches!(self, RateSource::Fallback)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RateQuote {
    pub code: String,
    pub rate: Decimal,
    pub source: RateSource,
}

/// Result of converting an amount between two currencies.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Conversion {
    pub from: String,
    pub to: String,
    pub rate: Decimal,
    pub amount: Money,
    /// Set when a neutral 1.0 was used because no real rate was available.
    pub degraded: bool,
}

#[derive(Debug, Clone, Copy)]
struct CachedRate {
    rate: Decimal,
    fetched_at: Instant,
}

pub struct CurrencyService {
    config: FxConfig,
    provider: Option<Arc<dyn RateProvider>>,
    cache: RwLock<HashMap<String, CachedRate>>,
    refresh_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl CurrencyService {
    /// Service with an explicit provider (or none: cache, pins and 1.0 only).
    pub fn new(config: FxConfig, provider: Option<Arc<dyn RateProvider>>) -> Self {
        CurrencyService {
            config,
            provider,
            cache: RwLock::new(HashMap::new()),
            refresh_locks: Mutex::new(HashMap::new()),
        }
    }

    /// Service backed by the HTTP feed, or by nothing when disabled.
    pub fn from_config(config: FxConfig) -> FxResult<Self> {
        config.validate()?;
        let provider: Option<Arc<dyn RateProvider>> = if config.enabled {
            Some(Arc::new(HttpRateProvider::new(&config)?))
        } else {
            None
        };
        Ok(Self::new(config, provider))
    }

    pub fn base(&self) -> &str {
        &self.config.base
    }

    /// Value of one unit of `code` in the base currency. Never fails.
    pub async fn rate(&self, code: &str) -> RateQuote {
        let code = code.trim().to_uppercase();

        if code == self.config.base {
            return quote(code, Decimal::ONE, RateSource::Identity);
        }
        if let Some(pinned) = self.config.pinned.get(&code) {
            return quote(code, *pinned, RateSource::Pinned);
        }
        if let Some(rate) = self.fresh(&code).await {
            return quote(code, rate, RateSource::Cache);
        }

        let lock = self.refresh_lock(&code).await;
        let _guard = lock.lock().await;

        if let Some(rate) = self.fresh(&code).await {
            return quote(code, rate, RateSource::Cache);
        }

        let fetched = match &self.provider {
            Some(provider) => {
                match tokio::time::timeout(
                    self.config.timeout(),
                    provider.fetch_rate(&self.config.base, &code),
                )
                .await
                {
                    Ok(Ok(rate)) if rate > Decimal::ZERO => Some(rate),
                    Ok(Ok(rate)) => {
                        warn!(code = %code, %rate, provider = provider.name(), "Provider returned a non-positive rate");
                        None
                    }
                    Ok(Err(e)) => {
                        warn!(code = %code, error = %e, provider = provider.name(), "Exchange rate fetch failed");
                        None
                    }
                    Err(_) => {
                        warn!(code = %code, timeout_secs = self.config.timeout_secs, "Exchange rate fetch timed out");
                        None
                    }
                }
            }
            None => None,
        };

        let mut cache = self.cache.write().await;
        match fetched {
            Some(rate) => {
                debug!(code = %code, %rate, "Exchange rate refreshed");
                cache.insert(
                    code.clone(),
                    CachedRate {
                        rate,
                        fetched_at: Instant::now(),
                    },
                );
                quote(code, rate, RateSource::Provider)
            }
            None => match cache.get(&code) {
                Some(stale) => {
                    warn!(code = %code, rate = %stale.rate, age_secs = stale.fetched_at.elapsed().as_secs(), "Serving stale exchange rate");
                    quote(code, stale.rate, RateSource::Stale)
                }
                None => {
                    warn!(code = %code, "No exchange rate available, using 1.0");
                    quote(code, Decimal::ONE, RateSource::Fallback)
                }
            },
        }
    }

    /// Rate turning an amount in `from` into `to`, and whether it is neutral.
    ///
    /// If either side has no real rate the whole conversion is neutral (1.0),
    /// so a half-known pair never produces a nonsense figure.
    pub async fn cross_rate(&self, from: &str, to: &str) -> (Decimal, bool) {
        let from = from.trim().to_uppercase();
        let to = to.trim().to_uppercase();
        if from == to {
            return (Decimal::ONE, false);
        }

        let from_quote = self.rate(&from).await;
        let to_quote = self.rate(&to).await;
        if from_quote.source.is_fallback() || to_quote.source.is_fallback() {
            return (Decimal::ONE, true);
        }

        match from_quote.rate.checked_div(to_quote.rate) {
            Some(rate) => (rate, false),
            None => {
                warn!(from = %from, to = %to, "Cross rate out of range, using 1.0");
                (Decimal::ONE, true)
            }
        }
    }

    /// Converts `amount` from one currency to another. Never fails.
    pub async fn convert(&self, amount: Money, from: &str, to: &str) -> Conversion {
        let (rate, mut degraded) = self.cross_rate(from, to).await;

        let converted = match amount.convert(rate) {
            Some(converted) => converted,
            None => {
                warn!(%amount, %rate, "Converted amount out of range, keeping original");
                degraded = true;
                amount
            }
        };

        Conversion {
            from: from.trim().to_uppercase(),
            to: to.trim().to_uppercase(),
            rate: if degraded { Decimal::ONE } else { rate },
            amount: if degraded { amount } else { converted },
            degraded,
        }
    }

    /// Drops one cached code, or the whole cache.
    pub async fn invalidate(&self, code: Option<&str>) {
        let mut cache = self.cache.write().await;
        match code {
            Some(code) => {
                cache.remove(&code.trim().to_uppercase());
            }
            None => cache.clear(),
        }
    }

    /// Seeds the cache (warm start from a snapshot).
    pub async fn prime(&self, code: &str, rate: Decimal) {
        self.cache.write().await.insert(
            code.trim().to_uppercase(),
            CachedRate {
                rate,
                fetched_at: Instant::now(),
            },
        );
    }

    async fn fresh(&self, code: &str) -> Option<Decimal> {
        let cache = self.cache.read().await;
        cache
            .get(code)
            .filter(|entry| entry.fetched_at.elapsed() < self.config.cache_ttl())
            .map(|entry| entry.rate)
    }

    async fn refresh_lock(&self, code: &str) -> Arc<Mutex<()>> {
        let mut locks = self.refresh_locks.lock().await;
        locks
            .entry(code.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}

fn quote(code: String, rate: Decimal, source: RateSource) -> RateQuote {
    RateQuote { code, rate, source }
}

// =============================================================================
// Unit Tests
// =============================================================================

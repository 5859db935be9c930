//! # Rate Providers
//!
//! Source of fresh exchange rates behind the cache.
//!
//! Public feeds publish "units of CODE per one base unit" (USD→AED 3.6725).
//! The service works with the inverse, "base per one CODE" (AED 0.2723), so
//! providers invert at this boundary and nothing above it sees feed units.

use async_trait::async_trait;
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;
use url::Url;

use crate::config::FxConfig;
use crate::error::{FxError, FxResult};

/// Decimal places kept after inverting a feed rate.
const RATE_SCALE: u32 = 10;

#[async_trait]
pub trait RateProvider: Send + Sync {
    /// Value of one unit of `code` expressed in `base`.
    async fn fetch_rate(&self, base: &str, code: &str) -> FxResult<Decimal>;

    fn name(&self) -> &'static str;
}

// =============================================================================
// HTTP Provider
// =============================================================================

#[derive(Debug, Deserialize)]
struct RatesResponse {
    #[serde(default, alias = "base_code")]
    base: Option<String>,
    #[serde(default)]
    rates: HashMap<String, Decimal>,
}

/// JSON feed at `{provider_url}/{base}`.
pub struct HttpRateProvider {
    client: Client,
    endpoint: Url,
    timeout: Duration,
}

impl HttpRateProvider {
    pub fn new(config: &FxConfig) -> FxResult<Self> {
        let endpoint = Url::parse(&config.provider_url)?;
        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| FxError::Provider(e.to_string()))?;

        Ok(HttpRateProvider {
            client,
            endpoint,
            timeout: config.timeout(),
        })
    }

    fn url_for(&self, base: &str) -> FxResult<Url> {
        let mut url = self.endpoint.clone();
        url.path_segments_mut()
            .map_err(|_| FxError::InvalidUrl(self.endpoint.to_string()))?
            .pop_if_empty()
            .push(base);
        Ok(url)
    }
}

#[async_trait]
impl RateProvider for HttpRateProvider {
    async fn fetch_rate(&self, base: &str, code: &str) -> FxResult<Decimal> {
        let url = self.url_for(base)?;
        debug!(%url, code, "Fetching exchange rates");

        let response = self.client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                FxError::Timeout(self.timeout.as_secs())
            } else {
                FxError::from(e)
            }
        })?;

        if !response.status().is_success() {
            return Err(FxError::Provider(format!(
                "rate feed returned HTTP {}",
                response.status()
            )));
        }

        let body: RatesResponse = response.json().await?;
        if let Some(feed_base) = body.base.as_deref() {
            if !feed_base.eq_ignore_ascii_case(base) {
                return Err(FxError::MalformedResponse(format!(
                    "asked for base {}, feed answered in {}",
                    base, feed_base
                )));
            }
        }

        let per_base = body
            .rates
            .get(code)
            .copied()
            .ok_or_else(|| FxError::UnknownCurrency(code.to_string()))?;

        invert(per_base)
    }

    fn name(&self) -> &'static str {
        "http"
    }
}

/// Turns "CODE per base" into "base per CODE".
pub fn invert(per_base: Decimal) -> FxResult<Decimal> {
    if per_base <= Decimal::ZERO {
        return Err(FxError::MalformedResponse(format!(
            "non-positive rate {}",
            per_base
        )));
    }
    Decimal::ONE
        .checked_div(per_base)
        .map(|rate| rate.round_dp(RATE_SCALE))
        .ok_or_else(|| FxError::MalformedResponse(format!("rate {} out of range", per_base)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_invert_feed_rate() {
        let aed = invert(Decimal::from_str("3.6725").unwrap()).unwrap();
        assert_eq!(aed.round_dp(4), Decimal::from_str("0.2723").unwrap());
        assert!(matches!(invert(Decimal::ZERO), Err(FxError::MalformedResponse(_))));
    }

    #[test]
    fn test_feed_response_parsing() {
        let body: RatesResponse = serde_json::from_str(
            r#"{"result": "success", "base_code": "USD", "rates": {"USD": 1, "AED": 3.6725}}"#,
        )
        .unwrap();
        assert_eq!(body.base.as_deref(), Some("USD"));
        assert_eq!(body.rates["AED"], Decimal::from_str("3.6725").unwrap());
    }

    #[test]
    fn test_url_for_base() {
        let mut config = FxConfig::default();
        config.provider_url = "https://rates.example/v6/latest/".to_string();
        let provider = HttpRateProvider::new(&config).unwrap();
        assert_eq!(
            provider.url_for("USD").unwrap().as_str(),
            "https://rates.example/v6/latest/USD"
        );
    }
}

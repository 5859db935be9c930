//! # Currency Configuration
//!
//! The `[currency]` section of the service configuration.
//!
//! ## Configuration File Format
//! ```toml
//! [currency]
//! base = "USD"
//! provider_url = "https://open.er-api.com/v6/latest"
//! cache_ttl_secs = 300
//! timeout_secs = 5
//! enabled = true
//!
//! [currency.pinned]
//! AED = "0.2723"
//! ```
//!
//! Pinned rates (pegged currencies) are served without a provider call.

use dealer_core::validation::validate_currency;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;
use url::Url;

use crate::error::{FxError, FxResult};

/// Exchange-rate settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FxConfig {
    /// Currency every rate is expressed in.
    #[serde(default = "default_base")]
    pub base: String,

    /// Endpoint returning `{ "rates": { CODE: units-per-base } }` for
    /// `{provider_url}/{base}`.
    #[serde(default = "default_provider_url")]
    pub provider_url: String,

    #[serde(default = "default_cache_ttl")]
    pub cache_ttl_secs: u64,

    /// Bound on a single provider call.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// When false no provider is called; unknown codes get 1.0.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Value of one unit of CODE in `base`, served as-is.
    #[serde(default)]
    pub pinned: BTreeMap<String, Decimal>,
}

fn default_base() -> String {
    "USD".to_string()
}

fn default_provider_url() -> String {
    "https://open.er-api.com/v6/latest".to_string()
}

fn default_cache_ttl() -> u64 {
    300
}

fn default_timeout() -> u64 {
    5
}

fn default_true() -> bool {
    true
}

impl Default for FxConfig {
    fn default() -> Self {
        FxConfig {
            base: default_base(),
            provider_url: default_provider_url(),
            cache_ttl_secs: default_cache_ttl(),
            timeout_secs: default_timeout(),
            enabled: true,
            pinned: BTreeMap::new(),
        }
    }
}

impl FxConfig {
    pub fn validate(&self) -> FxResult<()> {
        validate_currency(&self.base)?;

        let url = Url::parse(&self.provider_url)?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(FxError::InvalidUrl(format!(
                "Provider URL must start with http:// or https://, got: {}",
                self.provider_url
            )));
        }

        if self.cache_ttl_secs == 0 {
            return Err(FxError::InvalidConfig(
                "cache_ttl_secs must be greater than 0".into(),
            ));
        }
        if self.timeout_secs == 0 {
            return Err(FxError::InvalidConfig(
                "timeout_secs must be greater than 0".into(),
            ));
        }

        for (code, rate) in &self.pinned {
            validate_currency(code)?;
            if rate.is_sign_negative() || rate.is_zero() {
                return Err(FxError::InvalidConfig(format!(
                    "pinned rate for {} must be positive",
                    code
                )));
            }
        }

        Ok(())
    }

    #[inline]
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    #[inline]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_default_config_is_valid() {
        let config = FxConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.cache_ttl(), Duration::from_secs(300));
    }

    #[test]
    fn test_config_validation() {
        let mut config = FxConfig::default();

        config.provider_url = "ftp://rates.example".to_string();
        assert!(matches!(config.validate(), Err(FxError::InvalidUrl(_))));

        config.provider_url = "not a url".to_string();
        assert!(matches!(config.validate(), Err(FxError::InvalidUrl(_))));

        config = FxConfig::default();
        config.base = "usd".to_string();
        assert!(matches!(config.validate(), Err(FxError::InvalidConfig(_))));

        config = FxConfig::default();
        config.cache_ttl_secs = 0;
        assert!(config.validate().is_err());

        config = FxConfig::default();
        config.pinned.insert("AED".to_string(), Decimal::ZERO);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_toml_with_pinned_rates() {
        let config: FxConfig = toml::from_str(
            r#"
            base = "USD"
            timeout_secs = 2

            [pinned]
            AED = "0.2723"
            "#,
        )
        .unwrap();

        assert_eq!(config.timeout_secs, 2);
        assert_eq!(config.cache_ttl_secs, 300);
        assert_eq!(config.pinned["AED"], Decimal::from_str("0.2723").unwrap());
        assert!(config.validate().is_ok());
    }
}

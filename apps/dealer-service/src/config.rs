//! # Service Configuration
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     DEALER_DB_PATH=/var/lib/dealer/dealer.db                           │
//! │     DEALER_VAT_RATE_BPS=500                                            │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/sales/dealer.toml (Linux)                                │
//! │     ~/Library/Application Support/com.dealer.sales/dealer.toml (macOS) │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! [database]
//! path = "./dealer.db"
//! max_connections = 5
//!
//! [company]
//! name = "Oasis Motors LLC"
//! trn = "100234567800003"
//! vat_rate_bps = 500
//!
//! [quotation]
//! number_prefix = "QT"
//! validity_days = 30
//! default_currency = "AED"
//!
//! [invoice]
//! number_prefix = "INV"
//! payment_terms_days = 30
//!
//! [currency]
//! base = "USD"
//! cache_ttl_secs = 300
//!
//! [logging]
//! filter = "info,dealer=debug,sqlx=warn"
//! json = false
//! ```

use dealer_core::validation::{validate_currency, validate_name, validate_rate_bps};
use dealer_core::CompanyProfile;
use dealer_fx::{FxConfig, FxError};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{debug, info, warn};

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid value for {0}")]
    InvalidValue(String),

    #[error("Invalid currency settings: {0}")]
    Currency(#[from] FxError),
}

// =============================================================================
// Sections
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseSettings {
    /// SQLite file. Defaults to the platform data directory.
    #[serde(default)]
    pub path: Option<PathBuf>,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 {
    5
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        DatabaseSettings {
            path: None,
            max_connections: default_max_connections(),
        }
    }
}

impl DatabaseSettings {
    /// Configured path, or `dealer.db` in the platform data directory.
    pub fn resolved_path(&self) -> PathBuf {
        self.path.clone().unwrap_or_else(|| {
            project_dirs()
                .map(|dirs| dirs.data_dir().join("dealer.db"))
                .unwrap_or_else(|| PathBuf::from("./dealer.db"))
        })
    }
}

/// The selling company, injected into pricing (VAT) and invoices (letterhead).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompanySettings {
    #[serde(default = "default_company_name")]
    pub name: String,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub trn: Option<String>,
    #[serde(default = "default_vat_rate")]
    pub vat_rate_bps: u32,
    #[serde(default)]
    pub bank_name: Option<String>,
    #[serde(default)]
    pub bank_account: Option<String>,
}

fn default_company_name() -> String {
    "Dealer".to_string()
}

fn default_vat_rate() -> u32 {
    500
}

impl Default for CompanySettings {
    fn default() -> Self {
        CompanySettings {
            name: default_company_name(),
            address: None,
            trn: None,
            vat_rate_bps: default_vat_rate(),
            bank_name: None,
            bank_account: None,
        }
    }
}

impl CompanySettings {
    pub fn profile(&self) -> CompanyProfile {
        CompanyProfile {
            name: self.name.clone(),
            address: self.address.clone(),
            trn: self.trn.clone(),
            vat_rate_bps: self.vat_rate_bps,
            bank_name: self.bank_name.clone(),
            bank_account: self.bank_account.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuotationSettings {
    #[serde(default = "default_quotation_prefix")]
    pub number_prefix: String,

    /// Used when a request carries no `valid_till`.
    #[serde(default = "default_validity_days")]
    pub validity_days: u32,

    #[serde(default = "default_currency")]
    pub default_currency: String,

    /// Seconds between expiry sweeps in the long-running service.
    #[serde(default = "default_sweep_interval")]
    pub expiry_sweep_secs: u64,
}

fn default_quotation_prefix() -> String {
    "QT".to_string()
}

fn default_validity_days() -> u32 {
    30
}

fn default_currency() -> String {
    "AED".to_string()
}

fn default_sweep_interval() -> u64 {
    300
}

impl Default for QuotationSettings {
    fn default() -> Self {
        QuotationSettings {
            number_prefix: default_quotation_prefix(),
            validity_days: default_validity_days(),
            default_currency: default_currency(),
            expiry_sweep_secs: default_sweep_interval(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvoiceSettings {
    #[serde(default = "default_invoice_prefix")]
    pub number_prefix: String,

    /// Due date offset when the caller supplies none.
    #[serde(default = "default_payment_terms")]
    pub payment_terms_days: u32,
}

fn default_invoice_prefix() -> String {
    "INV".to_string()
}

fn default_payment_terms() -> u32 {
    30
}

impl Default for InvoiceSettings {
    fn default() -> Self {
        InvoiceSettings {
            number_prefix: default_invoice_prefix(),
            payment_terms_days: default_payment_terms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// `EnvFilter` directives; `RUST_LOG` wins when set.
    #[serde(default = "default_filter")]
    pub filter: String,

    #[serde(default)]
    pub json: bool,
}

fn default_filter() -> String {
    "info,dealer=debug,sqlx=warn".to_string()
}

impl Default for LoggingSettings {
    fn default() -> Self {
        LoggingSettings {
            filter: default_filter(),
            json: false,
        }
    }
}

// =============================================================================
// Main Configuration
// =============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServiceConfig {
    #[serde(default)]
    pub database: DatabaseSettings,

    #[serde(default)]
    pub company: CompanySettings,

    #[serde(default)]
    pub quotation: QuotationSettings,

    #[serde(default)]
    pub invoice: InvoiceSettings,

    #[serde(default)]
    pub currency: FxConfig,

    #[serde(default)]
    pub logging: LoggingSettings,
}

impl ServiceConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (dealer.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading service config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.database.max_connections == 0 {
            return Err(ConfigError::InvalidValue(
                "database.max_connections must be greater than 0".into(),
            ));
        }

        validate_name("company.name", &self.company.name, 200)
            .map_err(|e| ConfigError::InvalidValue(e.to_string()))?;
        validate_rate_bps("company.vat_rate_bps", self.company.vat_rate_bps)
            .map_err(|e| ConfigError::InvalidValue(e.to_string()))?;

        if self.quotation.number_prefix.trim().is_empty() {
            return Err(ConfigError::InvalidValue("quotation.number_prefix".into()));
        }
        if self.quotation.validity_days == 0 {
            return Err(ConfigError::InvalidValue(
                "quotation.validity_days must be greater than 0".into(),
            ));
        }
        validate_currency(&self.quotation.default_currency)
            .map_err(|e| ConfigError::InvalidValue(e.to_string()))?;
        if self.quotation.expiry_sweep_secs == 0 {
            return Err(ConfigError::InvalidValue(
                "quotation.expiry_sweep_secs must be greater than 0".into(),
            ));
        }

        if self.invoice.number_prefix.trim().is_empty() {
            return Err(ConfigError::InvalidValue("invoice.number_prefix".into()));
        }

        self.currency.validate()?;
        Ok(())
    }

    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Applies `DEALER_*` overrides from `lookup`.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(path) = lookup("DEALER_DB_PATH") {
            debug!(path = %path, "Overriding database path from environment");
            self.database.path = Some(PathBuf::from(path));
        }

        if let Some(name) = lookup("DEALER_COMPANY_NAME") {
            self.company.name = name;
        }

        if let Some(trn) = lookup("DEALER_COMPANY_TRN") {
            self.company.trn = Some(trn);
        }

        if let Some(vat) = lookup("DEALER_VAT_RATE_BPS") {
            match vat.parse::<u32>() {
                Ok(bps) => self.company.vat_rate_bps = bps,
                Err(_) => warn!(value = %vat, "Ignoring non-numeric DEALER_VAT_RATE_BPS"),
            }
        }

        if let Some(currency) = lookup("DEALER_DEFAULT_CURRENCY") {
            self.quotation.default_currency = currency.trim().to_uppercase();
        }

        if let Some(base) = lookup("DEALER_FX_BASE") {
            self.currency.base = base.trim().to_uppercase();
        }

        if let Some(url) = lookup("DEALER_FX_URL") {
            debug!(url = %url, "Overriding rate provider URL from environment");
            self.currency.provider_url = url;
        }

        if let Some(enabled) = lookup("DEALER_FX_ENABLED") {
            match enabled.to_lowercase().as_str() {
                "1" | "true" | "yes" => self.currency.enabled = true,
                "0" | "false" | "no" => self.currency.enabled = false,
                _ => warn!(value = %enabled, "Unknown DEALER_FX_ENABLED value"),
            }
        }

        if let Some(filter) = lookup("DEALER_LOG") {
            self.logging.filter = filter;
        }

        if let Some(json) = lookup("DEALER_LOG_JSON") {
            self.logging.json = matches!(json.to_lowercase().as_str(), "1" | "true" | "yes");
        }
    }

    fn default_config_path() -> Option<PathBuf> {
        project_dirs().map(|dirs| dirs.config_dir().join("dealer.toml"))
    }
}

fn project_dirs() -> Option<directories::ProjectDirs> {
    directories::ProjectDirs::from("com", "dealer", "sales")
}

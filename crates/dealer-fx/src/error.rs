//! # FX Error Types
//!
//! Errors raised while configuring or talking to a rate provider.
//!
//! `CurrencyService::rate` and `convert` never return these: a failed fetch
//! degrades to a stale or neutral rate. They surface only from construction
//! and from providers called directly.

use thiserror::Error;

/// Result type alias for FX operations.
pub type FxResult<T> = Result<T, FxError>;

#[derive(Debug, Error)]
pub enum FxError {
    // =========================================================================
    // Configuration Errors
    // =========================================================================
    #[error("Invalid currency configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid provider URL: {0}")]
    InvalidUrl(String),

    // =========================================================================
    // Provider Errors
    // =========================================================================
    #[error("Rate provider request failed: {0}")]
    Provider(String),

    #[error("Rate provider timed out after {0} seconds")]
    Timeout(u64),

    #[error("Malformed rate response: {0}")]
    MalformedResponse(String),

    #[error("Provider has no rate for {0}")]
    UnknownCurrency(String),
}

// =============================================================================
// Error Conversions
// =============================================================================

impl From<url::ParseError> for FxError {
    fn from(err: url::ParseError) -> Self {
        FxError::InvalidUrl(err.to_string())
    }
}

impl From<reqwest::Error> for FxError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            FxError::MalformedResponse(err.to_string())
        } else {
            FxError::Provider(err.to_string())
        }
    }
}

impl From<dealer_core::ValidationError> for FxError {
    fn from(err: dealer_core::ValidationError) -> Self {
        FxError::InvalidConfig(err.to_string())
    }
}

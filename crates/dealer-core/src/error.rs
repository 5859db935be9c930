//! # Error Types
//!
//! Domain-specific error types for dealer-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  dealer-core errors (this file)                                        │
//! │  ├── CoreError        - Domain guard failures                          │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  dealer-db errors                                                      │
//! │  └── DbError          - Persistence + ledger compare-and-swap          │
//! │                                                                         │
//! │  dealer-service errors                                                 │
//! │  └── ServiceError     - kind + message, mapped to status codes         │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → DbError → ServiceError            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

use crate::reservation::ReservationOutcome;

// =============================================================================
// Core Error
// =============================================================================

/// Core business rule errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A referenced entity does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// The requested status edge is not in the allowed set.
    ///
    /// ## When This Occurs
    /// ```text
    /// approve(quotation in Draft)
    ///      │
    ///      ▼
    /// can_transition_to(Draft → Approved) = false
    ///      │
    ///      ▼
    /// InvalidTransition { from: "draft", to: "approved" }
    /// (quotation and history untouched)
    /// ```
    #[error("Invalid transition for {entity} {id}: {from} -> {to}")]
    InvalidTransition {
        entity: String,
        id: String,
        from: String,
        to: String,
    },

    /// The quotation is past its validity date.
    #[error("Quotation {id} expired at {valid_till}")]
    QuotationExpired { id: String, valid_till: String },

    /// Not enough units available in the expected state.
    #[error("Insufficient stock for {stock_item_id}: available {available}, requested {requested}")]
    InsufficientStock {
        stock_item_id: String,
        available: i64,
        requested: i64,
    },

    /// One or more units were not in the state the reservation expected.
    #[error("Reservation rejected: {} unit(s) failed", .0.failed.len())]
    ReservationRejected(ReservationOutcome),

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Invariant broken inside a computation (e.g. analytics partition).
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Creates a NotFound error for a given entity type and ID.
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        CoreError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Creates an InvalidTransition error from two displayable statuses.
    pub fn invalid_transition(
        entity: impl Into<String>,
        id: impl Into<String>,
        from: impl std::fmt::Display,
        to: impl std::fmt::Display,
    ) -> Self {
        CoreError::InvalidTransition {
            entity: entity.into(),
            id: id.into(),
            from: from.to_string(),
            to: to.to_string(),
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Raised before any business rule or persistence runs.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (e.g., currency code, chassis number).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Value is not in allowed set.
    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },

    /// Duplicate value (e.g., the same chassis number twice).
    #[error("{field} '{value}' is duplicated")]
    Duplicate { field: String, value: String },

    /// Two fields that must agree do not.
    #[error("{field}: {reason}")]
    Inconsistent { field: String, reason: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::InsufficientStock {
            stock_item_id: "stk-1".to_string(),
            available: 1,
            requested: 2,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient stock for stk-1: available 1, requested 2"
        );

        let err = CoreError::invalid_transition("Quotation", "q-1", "draft", "approved");
        assert_eq!(
            err.to_string(),
            "Invalid transition for Quotation q-1: draft -> approved"
        );
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::Required {
            field: "customer_id".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}

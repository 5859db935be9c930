//! # Service Error Type
//!
//! One error type for every pipeline operation, shaped for the external
//! HTTP boundary.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  CoreError ─────┐                                                       │
//! │  (workflow,     │                                                       │
//! │   pricing)      │                                                       │
//! │                 ├──► ServiceError { kind, message, reservation? }      │
//! │  DbError ───────┤             │                                         │
//! │  (ledger, CAS,  │             ▼                                         │
//! │   constraints)  │    { "code": "INVALID_TRANSITION",                    │
//! │                 │      "status": 409,                                   │
//! │  FxError ───────┘      "message": "..." }                               │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! | Kind               | Status | Raised by                                  |
//! |--------------------|--------|--------------------------------------------|
//! | NotFound           | 404    | missing quotation, customer, stock item    |
//! | InvalidTransition  | 409    | illegal edge, expired quotation            |
//! | Conflict           | 409    | duplicate number, lost CAS, held unit      |
//! | InsufficientStock  | 422    | quantity would go negative                 |
//! | Validation         | 400    | bad payload                                |
//! | Internal           | 500    | persistence or analytics failure           |

use dealer_core::reservation::ReservationOutcome;
use dealer_core::{CoreError, ValidationError};
use dealer_db::DbError;
use dealer_fx::FxError;
use serde::Serialize;
use thiserror::Error;

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Machine-readable error category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    NotFound,
    InvalidTransition,
    Conflict,
    InsufficientStock,
    Validation,
    Internal,
}

impl ErrorKind {
    /// HTTP status the boundary should answer with.
    pub const fn status_code(&self) -> u16 {
        match self {
            ErrorKind::NotFound => 404,
            ErrorKind::InvalidTransition => 409,
            ErrorKind::Conflict => 409,
            ErrorKind::InsufficientStock => 422,
            ErrorKind::Validation => 400,
            ErrorKind::Internal => 500,
        }
    }
}

/// Error returned from every service operation.
///
/// ## Serialization
/// ```json
/// {
///   "code": "CONFLICT",
///   "status": 409,
///   "message": "Reservation rejected: 1 unit(s) failed",
///   "reservation": { "reserved": [], "failed": [ ... ] }
/// }
/// ```
#[derive(Debug, Clone, Error, Serialize)]
#[error("{message}")]
pub struct ServiceError {
    #[serde(rename = "code")]
    pub kind: ErrorKind,

    pub status: u16,

    pub message: String,

    /// Per-unit detail when a reservation batch was rejected.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reservation: Option<ReservationOutcome>,
}

impl ServiceError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        ServiceError {
            kind,
            status: kind.status_code(),
            message: message.into(),
            reservation: None,
        }
    }

    pub fn not_found(entity: &str, id: &str) -> Self {
        ServiceError::new(ErrorKind::NotFound, format!("{} not found: {}", entity, id))
    }

    pub fn validation(message: impl Into<String>) -> Self {
        ServiceError::new(ErrorKind::Validation, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        ServiceError::new(ErrorKind::Conflict, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        ServiceError::new(ErrorKind::Internal, message)
    }

    fn rejected(outcome: ReservationOutcome) -> Self {
        let message = format!(
            "Reservation rejected: {} unit(s) failed",
            outcome.failed.len()
        );
        ServiceError {
            reservation: Some(outcome),
            ..ServiceError::new(ErrorKind::Conflict, message)
        }
    }

    /// Serialized envelope for the HTTP boundary.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_else(|_| {
            serde_json::json!({ "code": self.kind, "status": self.status, "message": self.message })
        })
    }
}

// =============================================================================
// Error Conversions
// =============================================================================

impl From<CoreError> for ServiceError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::NotFound { entity, id } => ServiceError::not_found(&entity, &id),
            e @ CoreError::InvalidTransition { .. } => {
                ServiceError::new(ErrorKind::InvalidTransition, e.to_string())
            }
            e @ CoreError::QuotationExpired { .. } => {
                ServiceError::new(ErrorKind::InvalidTransition, e.to_string())
            }
            e @ CoreError::InsufficientStock { .. } => {
                ServiceError::new(ErrorKind::InsufficientStock, e.to_string())
            }
            CoreError::ReservationRejected(outcome) => ServiceError::rejected(outcome),
            CoreError::Validation(e) => ServiceError::validation(e.to_string()),
            CoreError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                ServiceError::internal(msg)
            }
        }
    }
}

impl From<ValidationError> for ServiceError {
    fn from(err: ValidationError) -> Self {
        ServiceError::validation(err.to_string())
    }
}

impl From<DbError> for ServiceError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => ServiceError::not_found(&entity, &id),
            DbError::UniqueViolation { field, value } => {
                ServiceError::conflict(format!("{} '{}' already exists", field, value))
            }
            DbError::ForeignKeyViolation { message } => {
                tracing::error!("Foreign key violation: {}", message);
                ServiceError::validation("Invalid reference")
            }
            DbError::ReservationRejected(outcome) => ServiceError::rejected(outcome),
            e @ DbError::StaleState { .. } => ServiceError::conflict(e.to_string()),
            e @ DbError::InsufficientStock { .. } => {
                ServiceError::new(ErrorKind::InsufficientStock, e.to_string())
            }
            DbError::Domain(core) => ServiceError::from(core),
            DbError::ConnectionFailed(_) => ServiceError::internal("Database connection failed"),
            DbError::MigrationFailed(_) => ServiceError::internal("Database migration failed"),
            DbError::PoolExhausted => ServiceError::internal("Database pool exhausted"),
            DbError::QueryFailed(e) | DbError::Internal(e) => {
                // Log the actual error but return a generic message
                tracing::error!("Database operation failed: {}", e);
                ServiceError::internal("Database operation failed")
            }
        }
    }
}

impl From<FxError> for ServiceError {
    fn from(err: FxError) -> Self {
        tracing::error!("Currency service error: {}", err);
        ServiceError::internal(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dealer_core::reservation::{FailureReason, ReservationFailure};
    use dealer_core::UnitStatus;

    #[test]
    fn test_status_codes() {
        assert_eq!(ErrorKind::NotFound.status_code(), 404);
        assert_eq!(ErrorKind::InvalidTransition.status_code(), 409);
        assert_eq!(ErrorKind::InsufficientStock.status_code(), 422);
        assert_eq!(ErrorKind::Validation.status_code(), 400);
    }

    #[test]
    fn test_core_error_mapping() {
        let err: ServiceError = CoreError::invalid_transition("Quotation", "q-1", "draft", "approved").into();
        assert_eq!(err.kind, ErrorKind::InvalidTransition);
        assert!(err.message.contains("draft -> approved"));

        let err: ServiceError = CoreError::not_found("Customer", "c-9").into();
        assert_eq!(err.kind, ErrorKind::NotFound);
        assert_eq!(err.status, 404);
    }

    #[test]
    fn test_db_error_mapping() {
        let err: ServiceError = DbError::stale("StockUnit", "JTM-1").into();
        assert_eq!(err.kind, ErrorKind::Conflict);

        let err: ServiceError = DbError::QueryFailed("disk I/O error".to_string()).into();
        assert_eq!(err.kind, ErrorKind::Internal);
        assert_eq!(err.message, "Database operation failed");
    }

    #[test]
    fn test_rejection_envelope_carries_outcome() {
        let outcome = ReservationOutcome {
            failed: vec![ReservationFailure {
                stock_item_id: "stk-1".to_string(),
                chassis_number: Some("JTM-1".to_string()),
                reason: FailureReason::StatusMismatch {
                    expected: UnitStatus::Active,
                    actual: UnitStatus::Hold,
                },
            }],
            ..Default::default()
        };
        let err: ServiceError = DbError::ReservationRejected(outcome).into();
        let json = err.to_json();

        assert_eq!(json["code"], "CONFLICT");
        assert_eq!(json["status"], 409);
        assert_eq!(json["reservation"]["failed"][0]["chassis_number"], "JTM-1");
    }
}

//! # API Error Type
//!
//! Unified error type for backend commands.
//!
//! ## Error Handling Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Flow in Kanak                                  │
//! │                                                                         │
//! │  Command Function  →  Result<T, ApiError>                               │
//! │         │                                                               │
//! │         ├── ValidationError ──────────────► VALIDATION_ERROR (+ field)  │
//! │         ├── CoreError::QuotaExceeded ─────► QUOTA_EXCEEDED              │
//! │         ├── CoreError::InvalidInvoiceStatus► BUSINESS_LOGIC             │
//! │         ├── DbError::StaleVersion ────────► CONFLICT                    │
//! │         ├── DbError::NotFound ────────────► NOT_FOUND                   │
//! │         ├── BillingError::InvalidSignature► PAYMENT_ERROR               │
//! │         └── anything internal ────────────► DATABASE_ERROR / INTERNAL   │
//! │                                             (details logged, not sent)  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use kanak_billing::BillingError;
use kanak_core::{CoreError, ValidationError};
use kanak_db::DbError;
use serde::Serialize;

use crate::state::ConfigError;

/// API error returned from commands.
///
/// ## Serialization
/// ```json
/// {
///   "code": "VALIDATION_ERROR",
///   "message": "customer.address is required",
///   "field": "customer.address"
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiError {
    /// Machine-readable error code for programmatic handling
    pub code: ErrorCode,

    /// Human-readable error message for display
    pub message: String,

    /// Offending input field, for validation errors
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

/// Error codes for API responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Resource not found (404)
    NotFound,

    /// Input validation failed (400)
    ValidationError,

    /// No invoice allowance left; show the upgrade prompt (402)
    QuotaExceeded,

    /// The record changed since it was loaded (409)
    Conflict,

    /// Business rule violated, e.g. editing a paid invoice (422)
    BusinessLogic,

    /// Payment gateway or signature failure
    PaymentError,

    /// Database operation failed (500)
    DatabaseError,

    /// Internal server error (500)
    Internal,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        ApiError {
            code,
            message: message.into(),
            field: None,
        }
    }

    pub fn not_found(resource: &str, id: &str) -> Self {
        ApiError::new(ErrorCode::NotFound, format!("{} not found: {}", resource, id))
    }

    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::ValidationError, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::Conflict, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::Internal, message)
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError {
            code: ErrorCode::ValidationError,
            field: Some(err.field().to_string()),
            message: err.to_string(),
        }
    }
}

/// Converts database errors to API errors.
impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => ApiError::not_found(&entity, &id),
            DbError::UniqueViolation { field, .. } => {
                tracing::debug!(field = %field, "Unique constraint hit");
                ApiError::conflict("A record with the same number already exists; try again")
            }
            DbError::StaleVersion { entity, id, .. } => ApiError::conflict(format!(
                "{} {} was changed elsewhere; reload and try again",
                entity, id
            )),
            DbError::Referenced {
                entity,
                dependents,
                ..
            } => ApiError::new(
                ErrorCode::BusinessLogic,
                format!("{} is used by {} invoice(s) and cannot be deleted", entity, dependents),
            ),
            DbError::ForeignKeyViolation { message } => {
                tracing::error!("Foreign key violation: {}", message);
                ApiError::validation("Invalid reference")
            }
            DbError::CorruptValue { entity, field, value } => {
                tracing::error!(
                    entity = %entity,
                    field = %field,
                    value = %value,
                    "Corrupt stored value"
                );
                ApiError::new(ErrorCode::DatabaseError, "Stored data could not be read")
            }
            DbError::Busy(e) => {
                tracing::warn!("Database busy: {}", e);
                ApiError::conflict("The database is busy; try again")
            }
            DbError::ConnectionFailed(_) => {
                ApiError::new(ErrorCode::DatabaseError, "Database connection failed")
            }
            DbError::MigrationFailed(_) => {
                ApiError::new(ErrorCode::DatabaseError, "Database migration failed")
            }
            DbError::QueryFailed(e) => {
                // Log the actual error but return a generic message
                tracing::error!("Database query failed: {}", e);
                ApiError::new(ErrorCode::DatabaseError, "Database operation failed")
            }
            DbError::TransactionFailed(e) => {
                tracing::error!("Transaction failed: {}", e);
                ApiError::new(ErrorCode::DatabaseError, "Database transaction failed")
            }
            DbError::PoolExhausted => {
                ApiError::new(ErrorCode::DatabaseError, "Database pool exhausted")
            }
            DbError::Internal(e) => {
                tracing::error!("Internal database error: {}", e);
                ApiError::new(ErrorCode::DatabaseError, "Database operation failed")
            }
        }
    }
}

/// Converts core errors to API errors.
impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::InvoiceNotFound(id) => ApiError::not_found("Invoice", &id),
            CoreError::CustomerNotFound(id) => ApiError::not_found("Customer", &id),
            CoreError::ItemNotFound(id) => ApiError::not_found("Invoice item", &id),
            e @ CoreError::InvalidInvoiceStatus { .. } => {
                ApiError::new(ErrorCode::BusinessLogic, e.to_string())
            }
            e @ CoreError::TooManyItems { .. } => ApiError::validation(e.to_string()),
            e @ CoreError::QuotaExceeded { .. } => {
                ApiError::new(ErrorCode::QuotaExceeded, e.to_string())
            }
            CoreError::Validation(e) => e.into(),
        }
    }
}

/// Converts billing errors to API errors.
impl From<BillingError> for ApiError {
    fn from(err: BillingError) -> Self {
        match err {
            e @ BillingError::QuotaExceeded { .. } => {
                ApiError::new(ErrorCode::QuotaExceeded, e.to_string())
            }
            BillingError::AccountingUnavailable(reason) => {
                tracing::error!("Usage accounting unavailable: {}", reason);
                ApiError::new(ErrorCode::DatabaseError, "Usage accounting is unavailable")
            }
            e @ (BillingError::InvalidSignature { .. }
            | BillingError::PaymentProvider(_)
            | BillingError::ProviderNotConfigured) => {
                ApiError::new(ErrorCode::PaymentError, e.to_string())
            }
            BillingError::UnknownPlan(id) => ApiError::not_found("Plan", &id),
            BillingError::UnknownOrder(id) => ApiError::not_found("Checkout order", &id),
            e @ BillingError::OrderAccountMismatch { .. } => {
                tracing::warn!("{}", e);
                ApiError::new(ErrorCode::PaymentError, e.to_string())
            }
            BillingError::InvalidConfig(e) => {
                tracing::error!("Invalid billing configuration: {}", e);
                ApiError::internal("Billing is misconfigured")
            }
            BillingError::Core(e) => e.into(),
            BillingError::Store(e) => e.into(),
        }
    }
}

impl From<ConfigError> for ApiError {
    fn from(err: ConfigError) -> Self {
        tracing::error!("Configuration error: {}", err);
        ApiError::internal(err.to_string())
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{:?}] {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_carries_field() {
        let err: ApiError = CoreError::Validation(ValidationError::Required {
            field: "customer.address".to_string(),
        })
        .into();
        assert_eq!(err.code, ErrorCode::ValidationError);
        assert_eq!(err.field.as_deref(), Some("customer.address"));

        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["code"], "VALIDATION_ERROR");
        assert_eq!(json["field"], "customer.address");
    }

    #[test]
    fn test_quota_and_conflict_codes() {
        let quota: ApiError = BillingError::QuotaExceeded {
            account_id: "acct".to_string(),
            counter: "free_tier".to_string(),
            used: 3,
            limit: 3,
        }
        .into();
        assert_eq!(quota.code, ErrorCode::QuotaExceeded);

        let stale: ApiError = DbError::StaleVersion {
            entity: "Invoice".to_string(),
            id: "inv-1".to_string(),
            expected: 2,
        }
        .into();
        assert_eq!(stale.code, ErrorCode::Conflict);
        assert!(serde_json::to_value(&stale).unwrap().get("field").is_none());
    }

    #[test]
    fn test_internal_details_not_exposed() {
        let err: ApiError = DbError::QueryFailed("near \"SELEC\": syntax error".to_string()).into();
        assert_eq!(err.code, ErrorCode::DatabaseError);
        assert!(!err.message.contains("SELEC"));
    }

    #[test]
    fn test_busy_database_asks_for_retry() {
        let err: ApiError = DbError::Busy("database is locked".to_string()).into();
        assert_eq!(err.code, ErrorCode::Conflict);

        // Contention is not an outage, so billing passes it through unchanged
        let busy = BillingError::from(DbError::Busy("database is locked".to_string()));
        let err: ApiError = busy.into();
        assert_eq!(err.code, ErrorCode::Conflict);
    }
}

//! # Error Types
//!
//! Domain-specific error types for kanak-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  kanak-core errors (this file)                                         │
//! │  ├── CoreError        - General domain errors                          │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  kanak-db errors                                                       │
//! │  └── DbError          - Database operation failures                    │
//! │                                                                         │
//! │  kanak-billing errors                                                  │
//! │  └── BillingError     - Usage accounting and payment failures          │
//! │                                                                         │
//! │  Backend errors                                                        │
//! │  └── ApiError         - What callers see (serialized)                  │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → DbError/BillingError → ApiError   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Invoice not found: {0}")]
    InvoiceNotFound(String),

    #[error("Customer not found: {0}")]
    CustomerNotFound(String),

    /// No line item with this id exists on the invoice.
    #[error("Invoice item not found: {0}")]
    ItemNotFound(String),

    /// Invoice is not in a state that allows the requested operation.
    ///
    /// ## When This Occurs
    /// - Editing items on a paid or cancelled invoice
    /// - Generating an invoice that was already sent
    /// - Cancelling an invoice that is already paid
    #[error("Invoice {invoice_id} is {current_status}, cannot {operation}")]
    InvalidInvoiceStatus {
        invoice_id: String,
        current_status: String,
        operation: String,
    },

    /// Invoice has exceeded maximum allowed line items.
    #[error("Invoice cannot have more than {max} items")]
    TooManyItems { max: usize },

    /// The account has no remaining invoice allowance.
    ///
    /// ## When This Occurs
    /// ```text
    /// Free tier: used 3 of 3, no subscription
    ///      │
    ///      ▼
    /// record_invoice_created()
    ///      │
    ///      ▼
    /// QuotaExceeded { counter: "free_tier", used: 3, limit: 3 }
    ///      │
    ///      ▼
    /// Caller shows the upgrade prompt
    /// ```
    /// The counter is left unchanged.
    #[error("Invoice quota exceeded for account {account_id}: {counter} used {used} of {limit}")]
    QuotaExceeded {
        account_id: String,
        counter: String,
        used: i64,
        limit: i64,
    },

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when user input doesn't meet requirements.
/// `field` uses dotted paths for nested data (`customer.address`).
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// An invoice must carry at least one line item to be sent.
    #[error("{field} must contain at least one item")]
    NoItems { field: String },

    #[error("{field} must be at least {min} characters")]
    TooShort { field: String, min: usize },

    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    #[error("{field} must be between {min} and {max}")]
    OutOfRange {
        field: String,
        min: String,
        max: String,
    },

    #[error("{field} must be positive")]
    MustBePositive { field: String },

    #[error("{field} must not be negative")]
    MustNotBeNegative { field: String },

    /// Invalid format (e.g., invalid UUID, malformed GSTIN).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },
}

impl ValidationError {
    /// The field the error refers to.
    pub fn field(&self) -> &str {
        match self {
            ValidationError::Required { field }
            | ValidationError::NoItems { field }
            | ValidationError::TooShort { field, .. }
            | ValidationError::TooLong { field, .. }
            | ValidationError::OutOfRange { field, .. }
            | ValidationError::MustBePositive { field }
            | ValidationError::MustNotBeNegative { field }
            | ValidationError::InvalidFormat { field, .. }
            | ValidationError::NotAllowed { field, .. } => field,
        }
    }
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

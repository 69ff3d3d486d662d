//! # Billing Error Types
//!
//! ## Error Categories
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Billing Error Categories                            │
//! │                                                                         │
//! │  ┌─────────────────────┐  ┌─────────────────┐  ┌────────────────────┐  │
//! │  │  Usage Accounting   │  │    Payments     │  │   Configuration    │  │
//! │  │                     │  │                 │  │                    │  │
//! │  │  AccountingUnavail. │  │  InvalidSig.    │  │  InvalidConfig     │  │
//! │  │  QuotaExceeded      │  │  PaymentProvider│  │  ProviderNotConf.  │  │
//! │  │                     │  │  UnknownPlan    │  │                    │  │
//! │  │                     │  │  UnknownOrder   │  │                    │  │
//! │  │                     │  │  OrderAccountM. │  │                    │  │
//! │  └─────────────────────┘  └─────────────────┘  └────────────────────┘  │
//! │                                                                         │
//! │  AccountingUnavailable never reaches callers of `check`: the           │
//! │  entitlement service turns it into a permissive snapshot.              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use kanak_core::CoreError;
use kanak_db::DbError;
use thiserror::Error;

/// Result type alias for billing operations.
pub type BillingResult<T> = Result<T, BillingError>;

#[derive(Debug, Error)]
pub enum BillingError {
    // =========================================================================
    // Usage Accounting
    // =========================================================================
    /// The usage store could not be reached or did not answer in time.
    #[error("Usage accounting unavailable: {0}")]
    AccountingUnavailable(String),

    /// The applicable counter is at its limit. Nothing was incremented.
    #[error("Invoice quota exceeded for account {account_id}: {counter} used {used} of {limit}")]
    QuotaExceeded {
        account_id: String,
        counter: String,
        used: i64,
        limit: i64,
    },

    // =========================================================================
    // Payments
    // =========================================================================
    /// Payment confirmation whose HMAC does not match.
    #[error("Payment signature verification failed for order {order_id}")]
    InvalidSignature { order_id: String },

    #[error("Payment provider error: {0}")]
    PaymentProvider(String),

    #[error("Unknown subscription plan: {0}")]
    UnknownPlan(String),

    /// Confirmation for an order that checkout never created.
    #[error("Unknown checkout order: {0}")]
    UnknownOrder(String),

    /// Confirmation for an order created by another account.
    #[error("Checkout order {order_id} belongs to another account")]
    OrderAccountMismatch { order_id: String },

    #[error("Payment provider is not configured")]
    ProviderNotConfigured,

    #[error("Invalid billing configuration: {0}")]
    InvalidConfig(String),

    // =========================================================================
    // Wrapped
    // =========================================================================
    #[error(transparent)]
    Core(CoreError),

    #[error("Storage error: {0}")]
    Store(DbError),
}

impl BillingError {
    pub fn is_unavailable(&self) -> bool {
        matches!(self, BillingError::AccountingUnavailable(_))
    }
}

// =============================================================================
// Error Conversions
// =============================================================================

impl From<CoreError> for BillingError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::QuotaExceeded {
                account_id,
                counter,
                used,
                limit,
            } => BillingError::QuotaExceeded {
                account_id,
                counter,
                used,
                limit,
            },
            other => BillingError::Core(other),
        }
    }
}

impl From<DbError> for BillingError {
    fn from(err: DbError) -> Self {
        if err.is_unavailable() {
            BillingError::AccountingUnavailable(err.to_string())
        } else {
            BillingError::Store(err)
        }
    }
}

impl From<reqwest::Error> for BillingError {
    fn from(err: reqwest::Error) -> Self {
        BillingError::PaymentProvider(err.to_string())
    }
}

impl From<serde_json::Error> for BillingError {
    fn from(err: serde_json::Error) -> Self {
        BillingError::PaymentProvider(format!("Malformed gateway response: {err}"))
    }
}

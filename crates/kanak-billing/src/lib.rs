//! # kanak-billing: Usage Accounting and Payments
//!
//! - [`entitlement`] - may the account create an invoice, and charging it
//! - [`store`] - the storage seam behind entitlement decisions
//! - [`payment`] / [`razorpay`] - gateway orders and signature checks
//! - [`subscription`] - checkout, activation and cancellation of plans
//! - [`config`] - the `[billing]` config section
//!
//! ## Usage
//!
//! ```rust,ignore
//! use kanak_billing::{BillingConfig, EntitlementService};
//!
//! let billing = EntitlementService::new(Arc::new(db.clone()), &BillingConfig::default());
//!
//! if billing.can_create_invoice(account_id).await? {
//!     // save the invoice, then
//!     let receipt = billing.record_invoice_created(account_id).await?;
//!     if receipt.upgrade_warning { /* one free invoice left */ }
//! }
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod entitlement;
pub mod error;
pub mod payment;
pub mod razorpay;
pub mod store;
pub mod subscription;

// =============================================================================
// Re-exports
// =============================================================================

pub use config::{BillingConfig, RazorpayConfig};
pub use entitlement::EntitlementService;
pub use error::{BillingError, BillingResult};
pub use payment::{PaymentConfirmation, PaymentOrder, PaymentProvider};
pub use razorpay::RazorpayGateway;
pub use store::EntitlementStore;
pub use subscription::{CheckoutSession, SubscriptionService};

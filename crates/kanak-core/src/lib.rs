//! # kanak-core: Pure Business Logic for Kanak Invoicing
//!
//! This crate is the **heart** of Kanak. It contains the GST engine, the
//! invoice lifecycle and the usage quota rules as pure functions with zero
//! I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Kanak Architecture                               │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    Backend Commands (apps/backend)              │   │
//! │  │    create_invoice, add_item, generate_invoice, mark_paid ...    │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ kanak-core (THIS CRATE) ★                       │   │
//! │  │                                                                 │   │
//! │  │   ┌─────────┐  ┌─────────┐  ┌─────────┐  ┌─────────┐          │   │
//! │  │   │  money  │  │   tax   │  │ invoice │  │  usage  │          │   │
//! │  │   │  Money  │  │  CGST   │  │lifecycle│  │  quota  │          │   │
//! │  │   │ GstRate │  │  SGST   │  │ totals  │  │  rules  │          │   │
//! │  │   └─────────┘  └─────────┘  └─────────┘  └─────────┘          │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │          kanak-db (SQLite)  /  kanak-billing (entitlements)     │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Customer, Invoice, InvoiceItem, Subscription, etc.)
//! - [`money`] - Money type backed by exact decimals (no floating point!)
//! - [`tax`] - GST engine: item price, CGST/SGST split, invoice totals
//! - [`invoice`] - Invoice item mutation and the draft → sent → paid lifecycle
//! - [`usage`] - Free-tier and subscription quota rules
//! - [`report`] - Dashboard summary over a set of invoices
//! - [`error`] - Domain error types
//! - [`validation`] - Business rule validation
//!
//! ## Example Usage
//!
//! ```rust
//! use kanak_core::money::Money;
//! use kanak_core::tax::compute_gst;
//! use kanak_core::types::GstRate;
//!
//! let price = Money::from_rupees(57_500);
//! let half = GstRate::from_bps(150); // 1.5%
//!
//! let gst = compute_gst(price, half, half);
//! assert_eq!(gst.cgst_amount, Money::from_paise(86_250));
//! assert_eq!(gst.total_amount, Money::from_rupees(59_225));
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod invoice;
pub mod money;
pub mod report;
pub mod tax;
pub mod types;
pub mod usage;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use tax::{GstBreakdown, InvoiceTotals, ItemInput, TaxSettings};
pub use types::*;
pub use usage::{EntitlementSnapshot, UsageCounter, UsageReceipt};

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Default account ID for a single-vendor installation.
///
/// The schema keys everything by `account_id`, so several vendors can share a
/// database; a standalone install simply uses this one.
pub const DEFAULT_ACCOUNT_ID: &str = "00000000-0000-0000-0000-000000000001";

/// Number of invoices an account may create without a subscription.
pub const FREE_INVOICE_LIMIT: i64 = 3;

/// Maximum line items allowed on a single invoice.
pub const MAX_INVOICE_ITEMS: usize = 100;

/// Maximum quantity of a single line item.
pub const MAX_ITEM_QUANTITY: i64 = 9_999;

/// Maximum weight of a single line item, in grams.
pub const MAX_WEIGHT_GRAMS: i64 = 1_000_000;

/// Maximum rupee amount accepted for any entered value (rate, price, making
/// charges, payment).
///
/// With the weight cap, a line item stays below 10^18 and an invoice of
/// `MAX_INVOICE_ITEMS` items below 10^21, far inside `Decimal` range.
pub const MAX_AMOUNT: i64 = 1_000_000_000_000;

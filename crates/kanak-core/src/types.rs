//! # Domain Types
//!
//! Core domain types used throughout Kanak.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Customer     │◄──│     Invoice     │──►│   InvoiceItem   │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (UUID)      │   │  id (UUID)      │   │  weight × rate  │       │
//! │  │  name, phone    │   │  invoice_number │   │  + making       │       │
//! │  │  address, GSTIN │   │  status, totals │   │  CGST / SGST    │       │
//! │  └─────────────────┘   │  version        │   └─────────────────┘       │
//! │                        └─────────────────┘                              │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    GstRate      │   │  UsageRecord    │   │  Subscription   │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  percent (1.5)  │   │  used / limit   │   │  plan, expiry   │       │
//! │  └─────────────────┘   └─────────────────┘   │  count / limit  │       │
//! │                                              └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Dual-Key Identity Pattern
//! Every entity has:
//! - `id`: UUID v4 - immutable, used for database relations
//! - Business ID where one exists (`invoice_number`, `gstin`) - human-readable

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;

// =============================================================================
// GST Rate
// =============================================================================

/// A GST rate expressed as a percentage (`1.5` means 1.5%).
///
/// ## Why Percent, Not Fraction?
/// Vendors configure and read rates as printed on the tax notification
/// ("CGST 1.5%"). Keeping the same unit avoids a ×100 mistake at the edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct GstRate(#[ts(as = "String")] Decimal);

impl GstRate {
    /// Creates a rate from a percentage.
    #[inline]
    pub const fn from_percentage(pct: Decimal) -> Self {
        GstRate(pct)
    }

    /// Creates a rate from basis points (150 bps = 1.5%).
    #[inline]
    pub fn from_bps(bps: u32) -> Self {
        GstRate(Decimal::new(i64::from(bps), 2))
    }

    /// Returns the rate as a percentage.
    #[inline]
    pub const fn percentage(&self) -> Decimal {
        self.0
    }

    /// Zero rate (exempt goods).
    #[inline]
    pub const fn zero() -> Self {
        GstRate(Decimal::ZERO)
    }

    #[inline]
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }
}

impl Default for GstRate {
    fn default() -> Self {
        GstRate::zero()
    }
}

impl std::fmt::Display for GstRate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}%", self.0.normalize())
    }
}

// =============================================================================
// Customer
// =============================================================================

/// A buyer who receives invoices.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Customer {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Account (vendor) this customer belongs to.
    pub account_id: String,

    pub name: String,

    /// Billing address printed on the invoice.
    pub address: String,

    pub phone: String,

    pub email: Option<String>,

    /// 15-character GST identification number for registered buyers.
    pub gstin: Option<String>,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Customer {
    /// Creates a new customer with a fresh id.
    pub fn new(
        account_id: impl Into<String>,
        name: impl Into<String>,
        address: impl Into<String>,
        phone: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Customer {
            id: uuid::Uuid::new_v4().to_string(),
            account_id: account_id.into(),
            name: name.into(),
            address: address.into(),
            phone: phone.into(),
            email: None,
            gstin: None,
            created_at: now,
            updated_at: now,
        }
    }
}

// =============================================================================
// Invoice Item
// =============================================================================

/// A line item on an invoice.
///
/// ## Pricing Invariant
/// ```text
/// price        = weight_in_grams × rate_per_gram + making_charges
///                (when both weight and rate are present, else as entered)
/// cgst_amount  = price × cgst_rate / 100
/// sgst_amount  = price × sgst_rate / 100
/// total_amount = price + cgst_amount + sgst_amount
/// ```
/// See [`crate::tax`] for the functions that maintain it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct InvoiceItem {
    pub id: String,

    /// Description, e.g. "22K Gold Necklace".
    pub name: String,

    /// HSN classification code (7113 for jewellery).
    pub hsn_code: Option<String>,

    pub quantity: i64,

    #[ts(as = "Option<String>")]
    pub weight_in_grams: Option<Decimal>,

    pub rate_per_gram: Option<Money>,

    /// Taxable value of the line.
    pub price: Money,

    pub making_charges: Money,

    pub cgst_rate: GstRate,

    pub sgst_rate: GstRate,

    pub cgst_amount: Money,

    pub sgst_amount: Money,

    pub total_amount: Money,
}

// =============================================================================
// Invoice Status
// =============================================================================

/// The lifecycle state of an invoice.
///
/// ```text
///   Draft ──generate──► Sent ──mark_paid──► Paid
///     │                  │
///     ├──mark_paid───────┼──────────────────► Paid
///     │                  │
///     └──cancel──────────┴──cancel──────────► Cancelled
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceStatus {
    /// Being prepared; items can change freely.
    Draft,
    /// Issued to the customer.
    Sent,
    /// Settled.
    Paid,
    /// Voided.
    Cancelled,
}

impl InvoiceStatus {
    /// All statuses in lifecycle order.
    pub const ALL: [InvoiceStatus; 4] = [
        InvoiceStatus::Draft,
        InvoiceStatus::Sent,
        InvoiceStatus::Paid,
        InvoiceStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            InvoiceStatus::Draft => "draft",
            InvoiceStatus::Sent => "sent",
            InvoiceStatus::Paid => "paid",
            InvoiceStatus::Cancelled => "cancelled",
        }
    }

    /// Paid and cancelled invoices accept no further changes.
    pub fn is_terminal(&self) -> bool {
        matches!(self, InvoiceStatus::Paid | InvoiceStatus::Cancelled)
    }
}

impl Default for InvoiceStatus {
    fn default() -> Self {
        InvoiceStatus::Draft
    }
}

impl std::fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Payment Method
// =============================================================================

#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    Upi,
    Card,
    BankTransfer,
    Cheque,
}

// =============================================================================
// Invoice
// =============================================================================

/// A GST invoice with its customer and ordered line items.
///
/// The totals are derived from `items` (see [`crate::tax::aggregate_invoice_totals`])
/// and are recomputed by every item mutation in [`crate::invoice`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Invoice {
    pub id: String,
    pub account_id: String,

    /// Human-readable number, e.g. `INV-2026-0001`.
    pub invoice_number: String,

    #[ts(as = "String")]
    pub date: NaiveDate,

    #[ts(as = "Option<String>")]
    pub due_date: Option<NaiveDate>,

    pub customer: Customer,
    pub items: Vec<InvoiceItem>,

    pub subtotal: Money,
    pub cgst_total: Money,
    pub sgst_total: Money,
    pub grand_total: Money,

    pub status: InvoiceStatus,

    pub paid_amount: Money,
    #[ts(as = "Option<String>")]
    pub paid_date: Option<DateTime<Utc>>,
    pub payment_method: Option<PaymentMethod>,

    pub notes: Option<String>,

    /// Optimistic lock counter. Zero means the invoice was never persisted;
    /// each successful save increments it.
    pub version: i64,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Usage Record
// =============================================================================

/// Per-account free-tier counter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct UsageRecord {
    pub account_id: String,
    pub free_invoices_used: i64,
    pub free_invoices_limit: i64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Subscription
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    Active,
    /// Lapsed or superseded by a newer subscription.
    Expired,
    Cancelled,
}

impl SubscriptionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionStatus::Active => "active",
            SubscriptionStatus::Expired => "expired",
            SubscriptionStatus::Cancelled => "cancelled",
        }
    }
}

/// A paid plan that lifts the free-tier limit until `valid_until`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Subscription {
    pub id: String,
    pub account_id: String,
    pub plan_id: String,
    pub status: SubscriptionStatus,
    #[ts(as = "String")]
    pub valid_until: DateTime<Utc>,
    /// `None` means unlimited invoices for the period.
    pub invoice_limit: Option<i64>,
    pub invoice_count: i64,
    /// Gateway payment that activated this subscription.
    pub payment_id: Option<String>,
    pub order_id: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

/// A purchasable plan from the configured catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SubscriptionPlan {
    pub id: String,
    pub name: String,
    pub price: Money,
    pub duration_days: i64,
    pub invoice_limit: Option<i64>,
}

/// A gateway order created at checkout, bound to the account and plan it
/// was created for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CheckoutOrder {
    pub order_id: String,
    pub account_id: String,
    pub plan_id: String,
    pub amount: Money,
    pub currency: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_gst_rate_from_bps() {
        let rate = GstRate::from_bps(150);
        assert_eq!(rate.percentage(), dec!(1.5));
        assert_eq!(rate, GstRate::from_percentage(dec!(1.50)));
        assert_eq!(rate.to_string(), "1.5%");
    }

    #[test]
    fn test_invoice_status_default_and_terminal() {
        assert_eq!(InvoiceStatus::default(), InvoiceStatus::Draft);
        assert!(!InvoiceStatus::Sent.is_terminal());
        assert!(InvoiceStatus::Paid.is_terminal());
        assert!(InvoiceStatus::Cancelled.is_terminal());
    }

    #[test]
    fn test_status_serialization() {
        let json = serde_json::to_string(&InvoiceStatus::Cancelled).unwrap();
        assert_eq!(json, "\"cancelled\"");
        let method: PaymentMethod = serde_json::from_str("\"bank_transfer\"").unwrap();
        assert_eq!(method, PaymentMethod::BankTransfer);
    }

    #[test]
    fn test_customer_new_has_fresh_id() {
        let now = Utc::now();
        let a = Customer::new("acct", "Asha", "MG Road", "9876543210", now);
        let b = Customer::new("acct", "Asha", "MG Road", "9876543210", now);
        assert_ne!(a.id, b.id);
        assert!(a.gstin.is_none());
    }
}

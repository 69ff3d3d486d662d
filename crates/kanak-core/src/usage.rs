//! # Usage Rules
//!
//! Pure quota decisions for invoice creation. The stateful side (loading
//! records, atomic increments, fail-open on outages) lives in
//! `kanak-billing`.
//!
//! ## May the Account Create an Invoice?
//! ```text
//! subscription grants creation (active, unexpired, below its limit)
//!     OR
//! free_invoices_used < free_invoices_limit
//! ```
//!
//! ## Which Counter Is Charged?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   Subscription active and not past valid_until?                         │
//! │        │                                                                │
//! │        ├── yes ──► subscription.invoice_count vs invoice_limit          │
//! │        │           (no limit = unlimited)                               │
//! │        │                                                                │
//! │        └── no ───► usage.free_invoices_used vs free_invoices_limit      │
//! │                                                                         │
//! │   A current subscription is the only counter charged, even when its     │
//! │   own limit is exhausted; the free tier is not a fallback.              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The two rules disagree for an exhausted current subscription with free
//! quota left: [`can_create_invoice`] says yes, [`record_invoice_created`]
//! refuses with `QuotaExceeded`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::types::{Subscription, SubscriptionStatus, UsageRecord};

// =============================================================================
// Usage Record
// =============================================================================

impl UsageRecord {
    /// A fresh record with nothing used.
    pub fn new(account_id: impl Into<String>, limit: i64, now: DateTime<Utc>) -> Self {
        UsageRecord {
            account_id: account_id.into(),
            free_invoices_used: 0,
            free_invoices_limit: limit,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn has_free_quota(&self) -> bool {
        self.free_invoices_used < self.free_invoices_limit
    }

    /// Free invoices left, never below zero.
    pub fn remaining(&self) -> i64 {
        (self.free_invoices_limit - self.free_invoices_used).max(0)
    }
}

// =============================================================================
// Subscription
// =============================================================================

impl Subscription {
    /// Active and not yet past `valid_until`.
    pub fn is_current(&self, now: DateTime<Utc>) -> bool {
        self.status == SubscriptionStatus::Active && now <= self.valid_until
    }

    /// Room for one more invoice under the plan limit.
    pub fn has_capacity(&self) -> bool {
        self.invoice_limit.is_none_or(|limit| self.invoice_count < limit)
    }

    /// Current and below its limit.
    pub fn grants_invoice_creation(&self, now: DateTime<Utc>) -> bool {
        self.is_current(now) && self.has_capacity()
    }

    /// Invoices left this period; `None` when unlimited.
    pub fn remaining_invoices(&self) -> Option<i64> {
        self.invoice_limit.map(|limit| (limit - self.invoice_count).max(0))
    }
}

// =============================================================================
// Decisions
// =============================================================================

/// The counter an invoice creation is charged to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum UsageCounter {
    FreeTier,
    Subscription,
}

impl UsageCounter {
    pub fn as_str(&self) -> &'static str {
        match self {
            UsageCounter::FreeTier => "free_tier",
            UsageCounter::Subscription => "subscription",
        }
    }
}

/// Outcome of a successful usage increment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct UsageReceipt {
    pub counter: UsageCounter,
    /// The subscription charged, for `UsageCounter::Subscription`.
    pub subscription_id: Option<String>,
    /// Count after the increment.
    pub used: i64,
    /// `None` for unlimited subscriptions.
    pub limit: Option<i64>,
    /// The free tier has exactly one invoice left.
    pub upgrade_warning: bool,
}

/// One invoice left on the free tier.
pub fn should_warn_upgrade(used: i64, limit: i64) -> bool {
    used == limit - 1
}

/// Whether the account may create another invoice right now.
pub fn can_create_invoice(
    usage: &UsageRecord,
    subscription: Option<&Subscription>,
    now: DateTime<Utc>,
) -> bool {
    subscription.is_some_and(|s| s.grants_invoice_creation(now)) || usage.has_free_quota()
}

/// Charges one invoice to the applicable counter.
///
/// Fails with [`CoreError::QuotaExceeded`] and mutates nothing when the
/// counter is already at its limit.
///
/// ## Example
/// ```rust
/// use chrono::Utc;
/// use kanak_core::types::UsageRecord;
/// use kanak_core::usage::{can_create_invoice, record_invoice_created};
///
/// let now = Utc::now();
/// let mut usage = UsageRecord::new("acct", 3, now);
/// usage.free_invoices_used = 2;
///
/// let receipt = record_invoice_created(&mut usage, None, now).unwrap();
/// assert_eq!(receipt.used, 3);
/// assert!(!can_create_invoice(&usage, None, now));
/// ```
pub fn record_invoice_created(
    usage: &mut UsageRecord,
    subscription: Option<&mut Subscription>,
    now: DateTime<Utc>,
) -> CoreResult<UsageReceipt> {
    if let Some(sub) = subscription.filter(|s| s.is_current(now)) {
        if !sub.has_capacity() {
            return Err(CoreError::QuotaExceeded {
                account_id: sub.account_id.clone(),
                counter: UsageCounter::Subscription.as_str().to_string(),
                used: sub.invoice_count,
                limit: sub.invoice_limit.unwrap_or_default(),
            });
        }
        sub.invoice_count += 1;
        sub.updated_at = now;
        return Ok(UsageReceipt {
            counter: UsageCounter::Subscription,
            subscription_id: Some(sub.id.clone()),
            used: sub.invoice_count,
            limit: sub.invoice_limit,
            upgrade_warning: false,
        });
    }

    if !usage.has_free_quota() {
        return Err(CoreError::QuotaExceeded {
            account_id: usage.account_id.clone(),
            counter: UsageCounter::FreeTier.as_str().to_string(),
            used: usage.free_invoices_used,
            limit: usage.free_invoices_limit,
        });
    }
    usage.free_invoices_used += 1;
    usage.updated_at = now;
    Ok(free_tier_receipt(usage))
}

/// Receipt for a free-tier record that has just been incremented.
pub fn free_tier_receipt(usage: &UsageRecord) -> UsageReceipt {
    UsageReceipt {
        counter: UsageCounter::FreeTier,
        subscription_id: None,
        used: usage.free_invoices_used,
        limit: Some(usage.free_invoices_limit),
        upgrade_warning: should_warn_upgrade(usage.free_invoices_used, usage.free_invoices_limit),
    }
}

// =============================================================================
// Entitlement Snapshot
// =============================================================================

/// What the account may do, as shown on the billing screen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct EntitlementSnapshot {
    pub account_id: String,
    pub can_create_invoice: bool,
    pub free_invoices_used: i64,
    pub free_invoices_limit: i64,
    pub free_invoices_remaining: i64,
    pub subscription_active: bool,
    pub plan_id: Option<String>,
    /// `None` when there is no current subscription or it is unlimited.
    pub subscription_invoices_remaining: Option<i64>,
    #[ts(as = "Option<String>")]
    pub valid_until: Option<DateTime<Utc>>,
    /// Built without reaching the usage store; creation is allowed anyway.
    pub degraded: bool,
}

impl EntitlementSnapshot {
    pub fn evaluate(
        usage: &UsageRecord,
        subscription: Option<&Subscription>,
        now: DateTime<Utc>,
    ) -> Self {
        let current = subscription.filter(|s| s.is_current(now));
        EntitlementSnapshot {
            account_id: usage.account_id.clone(),
            can_create_invoice: can_create_invoice(usage, subscription, now),
            free_invoices_used: usage.free_invoices_used,
            free_invoices_limit: usage.free_invoices_limit,
            free_invoices_remaining: usage.remaining(),
            subscription_active: current.is_some(),
            plan_id: current.map(|s| s.plan_id.clone()),
            subscription_invoices_remaining: current.and_then(|s| s.remaining_invoices()),
            valid_until: current.map(|s| s.valid_until),
            degraded: false,
        }
    }

    /// Allow-everything snapshot used when usage accounting is unreachable.
    pub fn permissive(account_id: impl Into<String>, free_limit: i64) -> Self {
        EntitlementSnapshot {
            account_id: account_id.into(),
            can_create_invoice: true,
            free_invoices_used: 0,
            free_invoices_limit: free_limit,
            free_invoices_remaining: free_limit,
            subscription_active: false,
            plan_id: None,
            subscription_invoices_remaining: None,
            valid_until: None,
            degraded: true,
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

//! # Entitlement Service
//!
//! Answers "may this account create an invoice?" and charges each created
//! invoice to the right counter.
//!
//! ## Check (fail-open)
//! ```text
//! check(account)
//!    │
//!    ├── get_or_create_usage ─┐
//!    ├── current_subscription ┤  each call bounded by accounting_timeout
//!    │                        │
//!    │     ┌──────────────────┴───────────────────┐
//!    │     │ Ok                                   │ AccountingUnavailable
//!    │     ▼                                      ▼   (outage or timeout)
//!    │  EntitlementSnapshot::evaluate      warn! + permissive snapshot
//!    │                                      (can_create_invoice = true,
//!    │                                       degraded = true)
//!    └── any other error ──► propagated
//! ```
//!
//! ## Record
//! Recording uses the store's conditional increments, so two requests
//! racing for the last free invoice cannot both be charged. A request that
//! loses the race gets [`BillingError::QuotaExceeded`]. Recording does not
//! fail open; the caller decides what an outage means for the invoice it is
//! about to store. Lock contention surfaces as `Store(DbError::Busy)`, not
//! as an outage.
//!
//! A charge whose invoice could not be stored is handed back with
//! [`EntitlementService::release`].

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use kanak_core::usage::{free_tier_receipt, UsageCounter};
use kanak_core::{EntitlementSnapshot, UsageReceipt};
use tracing::{debug, info, warn};

use crate::config::BillingConfig;
use crate::error::{BillingError, BillingResult};
use crate::store::EntitlementStore;

#[derive(Clone)]
pub struct EntitlementService {
    store: Arc<dyn EntitlementStore>,
    free_invoice_limit: i64,
    timeout: Duration,
}

impl EntitlementService {
    pub fn new(store: Arc<dyn EntitlementStore>, config: &BillingConfig) -> Self {
        EntitlementService {
            store,
            free_invoice_limit: config.free_invoice_limit,
            timeout: config.accounting_timeout(),
        }
    }

    pub fn free_invoice_limit(&self) -> i64 {
        self.free_invoice_limit
    }

    /// Runs one store call under the accounting timeout.
    async fn bounded<T>(
        &self,
        operation: &'static str,
        call: impl Future<Output = BillingResult<T>>,
    ) -> BillingResult<T> {
        match tokio::time::timeout(self.timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(BillingError::AccountingUnavailable(format!(
                "{operation} timed out after {} ms",
                self.timeout.as_millis()
            ))),
        }
    }

    async fn evaluate(&self, account_id: &str) -> BillingResult<EntitlementSnapshot> {
        let usage = self
            .bounded(
                "get_or_create_usage",
                self.store.get_or_create_usage(account_id, self.free_invoice_limit),
            )
            .await?;
        let subscription = self
            .bounded("current_subscription", self.store.current_subscription(account_id))
            .await?;

        Ok(EntitlementSnapshot::evaluate(&usage, subscription.as_ref(), Utc::now()))
    }

    /// Current entitlement for the account.
    ///
    /// Never fails because usage accounting is down: that case yields a
    /// permissive snapshot with `degraded = true`.
    pub async fn check(&self, account_id: &str) -> BillingResult<EntitlementSnapshot> {
        match self.evaluate(account_id).await {
            Ok(snapshot) => {
                debug!(
                    account_id = %account_id,
                    allowed = snapshot.can_create_invoice,
                    free_used = snapshot.free_invoices_used,
                    subscription = snapshot.subscription_active,
                    "Entitlement checked"
                );
                Ok(snapshot)
            }
            Err(BillingError::AccountingUnavailable(reason)) => {
                warn!(
                    account_id = %account_id,
                    reason = %reason,
                    "Usage accounting unavailable, allowing invoice creation"
                );
                Ok(EntitlementSnapshot::permissive(account_id, self.free_invoice_limit))
            }
            Err(other) => Err(other),
        }
    }

    pub async fn can_create_invoice(&self, account_id: &str) -> BillingResult<bool> {
        Ok(self.check(account_id).await?.can_create_invoice)
    }

    /// Charges one invoice to the account's current subscription, or to the
    /// free tier when there is none.
    pub async fn record_invoice_created(&self, account_id: &str) -> BillingResult<UsageReceipt> {
        let now = Utc::now();
        let usage = self
            .bounded(
                "get_or_create_usage",
                self.store.get_or_create_usage(account_id, self.free_invoice_limit),
            )
            .await?;
        let subscription = self
            .bounded("current_subscription", self.store.current_subscription(account_id))
            .await?;

        if let Some(sub) = subscription.filter(|s| s.is_current(now)) {
            let updated = self
                .bounded(
                    "increment_subscription_usage",
                    self.store.increment_subscription_usage(&sub.id),
                )
                .await?;

            return match updated {
                Some(updated) => {
                    info!(
                        account_id = %account_id,
                        subscription_id = %updated.id,
                        used = updated.invoice_count,
                        "Invoice charged to subscription"
                    );
                    Ok(UsageReceipt {
                        counter: UsageCounter::Subscription,
                        subscription_id: Some(updated.id),
                        used: updated.invoice_count,
                        limit: updated.invoice_limit,
                        upgrade_warning: false,
                    })
                }
                None => Err(BillingError::QuotaExceeded {
                    account_id: account_id.to_string(),
                    counter: UsageCounter::Subscription.as_str().to_string(),
                    used: sub.invoice_count,
                    limit: sub.invoice_limit.unwrap_or_default(),
                }),
            };
        }

        let updated = self
            .bounded("increment_free_usage", self.store.increment_free_usage(account_id))
            .await?;

        match updated {
            Some(updated) => {
                let receipt = free_tier_receipt(&updated);
                info!(
                    account_id = %account_id,
                    used = receipt.used,
                    limit = updated.free_invoices_limit,
                    upgrade_warning = receipt.upgrade_warning,
                    "Invoice charged to free tier"
                );
                Ok(receipt)
            }
            // The conditional increment only fails at or past the limit
            None => Err(BillingError::QuotaExceeded {
                account_id: account_id.to_string(),
                counter: UsageCounter::FreeTier.as_str().to_string(),
                used: usage.free_invoices_used.max(usage.free_invoices_limit),
                limit: usage.free_invoices_limit,
            }),
        }
    }

    /// Hands back a charge made by [`Self::record_invoice_created`] whose
    /// invoice was never stored.
    pub async fn release(&self, account_id: &str, receipt: &UsageReceipt) -> BillingResult<()> {
        let released = match (&receipt.counter, &receipt.subscription_id) {
            (UsageCounter::Subscription, Some(id)) => {
                self.bounded(
                    "release_subscription_usage",
                    self.store.release_subscription_usage(id),
                )
                .await?
            }
            _ => {
                self.bounded("release_free_usage", self.store.release_free_usage(account_id))
                    .await?
            }
        };

        info!(
            account_id = %account_id,
            counter = receipt.counter.as_str(),
            released,
            "Invoice charge released"
        );
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

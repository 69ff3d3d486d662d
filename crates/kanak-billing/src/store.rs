//! # Entitlement Store
//!
//! The seam between usage accounting and storage. [`Database`] is the
//! production implementation; tests substitute failing or slow stores to
//! exercise the fail-open path.
//!
//! Implementations report "could not reach storage" as
//! [`BillingError::AccountingUnavailable`]. Any other error means storage
//! answered and the answer was a failure.

use async_trait::async_trait;
use kanak_core::{Subscription, UsageRecord};
use kanak_db::Database;

use crate::error::BillingResult;

#[async_trait]
pub trait EntitlementStore: Send + Sync {
    /// The account's usage record, created with `limit` on first use.
    async fn get_or_create_usage(&self, account_id: &str, limit: i64) -> BillingResult<UsageRecord>;

    /// The account's latest active subscription, possibly past `valid_until`.
    async fn current_subscription(&self, account_id: &str) -> BillingResult<Option<Subscription>>;

    /// `free_invoices_used += 1` only while below the limit.
    async fn increment_free_usage(&self, account_id: &str) -> BillingResult<Option<UsageRecord>>;

    /// `invoice_count += 1` only while active and below the plan limit.
    async fn increment_subscription_usage(
        &self,
        subscription_id: &str,
    ) -> BillingResult<Option<Subscription>>;

    /// `free_invoices_used -= 1` while above zero.
    async fn release_free_usage(&self, account_id: &str) -> BillingResult<bool>;

    /// `invoice_count -= 1` while above zero.
    async fn release_subscription_usage(&self, subscription_id: &str) -> BillingResult<bool>;
}

#[async_trait]
impl EntitlementStore for Database {
    async fn get_or_create_usage(
        &self,
        account_id: &str,
        limit: i64,
    ) -> BillingResult<UsageRecord> {
        Ok(self.usage().get_or_create(account_id, limit).await?)
    }

    async fn current_subscription(&self, account_id: &str) -> BillingResult<Option<Subscription>> {
        Ok(self.subscriptions().current(account_id).await?)
    }

    async fn increment_free_usage(&self, account_id: &str) -> BillingResult<Option<UsageRecord>> {
        Ok(self.usage().try_increment(account_id).await?)
    }

    async fn increment_subscription_usage(
        &self,
        subscription_id: &str,
    ) -> BillingResult<Option<Subscription>> {
        Ok(self.subscriptions().try_increment(subscription_id).await?)
    }

    async fn release_free_usage(&self, account_id: &str) -> BillingResult<bool> {
        Ok(self.usage().release(account_id).await?)
    }

    async fn release_subscription_usage(&self, subscription_id: &str) -> BillingResult<bool> {
        Ok(self.subscriptions().release(subscription_id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BillingError;
    use kanak_db::DbConfig;

    #[tokio::test]
    async fn test_closed_database_is_unavailable() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.close().await;

        let err = db.get_or_create_usage("acct", 3).await.unwrap_err();
        assert!(matches!(err, BillingError::AccountingUnavailable(_)));
    }

    #[tokio::test]
    async fn test_database_store_round_trip() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        let usage = db.get_or_create_usage("acct", 3).await.unwrap();
        assert_eq!(usage.free_invoices_used, 0);
        assert!(db.current_subscription("acct").await.unwrap().is_none());

        let bumped = db.increment_free_usage("acct").await.unwrap().unwrap();
        assert_eq!(bumped.free_invoices_used, 1);
    }
}

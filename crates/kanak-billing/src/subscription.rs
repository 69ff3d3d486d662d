//! # Subscription Service
//!
//! Turns a verified gateway payment into an active subscription.
//!
//! Checkout records each gateway order with the account and plan it was
//! created for. The plan a payment buys is read from that record; the
//! caller never names it.
//!
//! ## Confirmation Rules
//! ```text
//! confirm_payment(account, confirmation)
//!      │
//!      ├── signature invalid ────────────► InvalidSignature (nothing stored)
//!      ├── order never checked out ──────► UnknownOrder
//!      ├── order of another account ─────► OrderAccountMismatch
//!      ├── order's plan left the catalog ► UnknownPlan
//!      ├── payment_id already activated ─► the existing subscription
//!      │                                   (replays are harmless)
//!      └── otherwise
//!            previous active subscription → expired
//!            new subscription             → active until now + duration
//! ```

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use kanak_core::{CheckoutOrder, Subscription, SubscriptionPlan, SubscriptionStatus};
use kanak_db::{Database, DbError};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::BillingConfig;
use crate::error::{BillingError, BillingResult};
use crate::payment::{PaymentConfirmation, PaymentOrder, PaymentProvider};

/// Everything the checkout widget needs to take a payment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutSession {
    pub account_id: String,
    pub plan: SubscriptionPlan,
    pub order: PaymentOrder,
}

#[derive(Clone)]
pub struct SubscriptionService {
    db: Database,
    provider: Option<Arc<dyn PaymentProvider>>,
    config: BillingConfig,
}

impl SubscriptionService {
    pub fn new(
        db: Database,
        provider: Option<Arc<dyn PaymentProvider>>,
        config: BillingConfig,
    ) -> Self {
        SubscriptionService {
            db,
            provider,
            config,
        }
    }

    pub fn plans(&self) -> &[SubscriptionPlan] {
        &self.config.plans
    }

    fn provider(&self) -> BillingResult<&dyn PaymentProvider> {
        self.provider
            .as_deref()
            .ok_or(BillingError::ProviderNotConfigured)
    }

    /// Creates a gateway order for the plan's price.
    pub async fn start_checkout(
        &self,
        account_id: &str,
        plan_id: &str,
    ) -> BillingResult<CheckoutSession> {
        let plan = self.config.plan(plan_id)?.clone();
        let provider = self.provider()?;

        let receipt = format!("sub_{}", Uuid::new_v4().simple());
        let metadata = serde_json::json!({
            "account_id": account_id,
            "plan_id": plan.id,
        });

        let order = provider
            .create_order(plan.price, &self.config.currency, &receipt, metadata)
            .await?;

        self.db
            .payment_orders()
            .insert(&CheckoutOrder {
                order_id: order.order_id.clone(),
                account_id: account_id.to_string(),
                plan_id: plan.id.clone(),
                amount: order.amount,
                currency: order.currency.clone(),
                created_at: Utc::now(),
            })
            .await?;

        info!(
            account_id = %account_id,
            plan = %plan.id,
            order_id = %order.order_id,
            "Checkout started"
        );

        Ok(CheckoutSession {
            account_id: account_id.to_string(),
            plan,
            order,
        })
    }

    /// Activates the plan the confirmed order was created for.
    pub async fn confirm_payment(
        &self,
        account_id: &str,
        confirmation: &PaymentConfirmation,
        now: DateTime<Utc>,
    ) -> BillingResult<Subscription> {
        let provider = self.provider()?;

        if !provider.verify_signature(
            &confirmation.order_id,
            &confirmation.payment_id,
            &confirmation.signature,
        ) {
            warn!(
                account_id = %account_id,
                order_id = %confirmation.order_id,
                "Rejected payment confirmation"
            );
            return Err(BillingError::InvalidSignature {
                order_id: confirmation.order_id.clone(),
            });
        }

        let order = self
            .db
            .payment_orders()
            .get_by_id(&confirmation.order_id)
            .await?
            .ok_or_else(|| BillingError::UnknownOrder(confirmation.order_id.clone()))?;
        if order.account_id != account_id {
            warn!(
                account_id = %account_id,
                order_id = %order.order_id,
                "Payment confirmation for another account's order"
            );
            return Err(BillingError::OrderAccountMismatch {
                order_id: order.order_id,
            });
        }
        let plan = self.config.plan(&order.plan_id)?;

        if let Some(existing) = self
            .already_activated(account_id, &confirmation.payment_id)
            .await?
        {
            return Ok(existing);
        }

        let subscription = Subscription {
            id: Uuid::new_v4().to_string(),
            account_id: account_id.to_string(),
            plan_id: plan.id.clone(),
            status: SubscriptionStatus::Active,
            valid_until: now + Duration::days(plan.duration_days),
            invoice_limit: plan.invoice_limit,
            invoice_count: 0,
            payment_id: Some(confirmation.payment_id.clone()),
            order_id: Some(confirmation.order_id.clone()),
            created_at: now,
            updated_at: now,
        };

        match self.db.subscriptions().activate(&subscription).await {
            Ok(()) => Ok(subscription),
            // A concurrent confirmation of the same payment (or a second
            // payment for the same order) won the insert
            Err(DbError::UniqueViolation { .. }) => self
                .already_activated(account_id, &confirmation.payment_id)
                .await?
                .ok_or_else(|| {
                    BillingError::PaymentProvider(format!(
                        "order {} is already paid",
                        confirmation.order_id
                    ))
                }),
            Err(other) => Err(other.into()),
        }
    }

    async fn already_activated(
        &self,
        account_id: &str,
        payment_id: &str,
    ) -> BillingResult<Option<Subscription>> {
        let Some(existing) = self.db.subscriptions().find_by_payment_id(payment_id).await? else {
            return Ok(None);
        };

        if existing.account_id != account_id {
            warn!(
                account_id = %account_id,
                payment_id = %payment_id,
                "Payment already activated for another account"
            );
            return Err(BillingError::PaymentProvider(format!(
                "payment {payment_id} belongs to another account"
            )));
        }

        info!(
            payment_id = %payment_id,
            subscription_id = %existing.id,
            "Payment already activated"
        );
        Ok(Some(existing))
    }

    /// Cancels the account's active subscription. The free tier applies
    /// again immediately.
    pub async fn cancel(&self, account_id: &str) -> BillingResult<Subscription> {
        let mut current = self
            .db
            .subscriptions()
            .current(account_id)
            .await?
            .ok_or_else(|| BillingError::Store(DbError::not_found("Subscription", account_id)))?;

        self.db
            .subscriptions()
            .set_status(&current.id, SubscriptionStatus::Cancelled)
            .await?;

        info!(account_id = %account_id, subscription_id = %current.id, "Subscription cancelled");
        current.status = SubscriptionStatus::Cancelled;
        current.updated_at = Utc::now();
        Ok(current)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payment::{sign_payment, verify_payment_signature};
    use async_trait::async_trait;
    use kanak_core::Money;
    use kanak_db::DbConfig;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const SECRET: &str = "test_secret";

    /// Provider that hands out sequential order ids and checks signatures
    /// against a fixed secret.
    #[derive(Default)]
    struct FakeProvider {
        orders: AtomicUsize,
    }

    #[async_trait]
    impl PaymentProvider for FakeProvider {
        async fn create_order(
            &self,
            amount: Money,
            currency: &str,
            receipt: &str,
            _metadata: serde_json::Value,
        ) -> BillingResult<PaymentOrder> {
            let n = self.orders.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(PaymentOrder {
                order_id: format!("order_{n}"),
                amount,
                currency: currency.to_string(),
                receipt: Some(receipt.to_string()),
                key_id: Some("rzp_test".to_string()),
            })
        }

        fn verify_signature(&self, order_id: &str, payment_id: &str, signature: &str) -> bool {
            verify_payment_signature(SECRET, order_id, payment_id, signature)
        }
    }

    async fn service() -> (Database, SubscriptionService) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let svc = SubscriptionService::new(
            db.clone(),
            Some(Arc::new(FakeProvider::default())),
            BillingConfig::default(),
        );
        (db, svc)
    }

    fn confirmation(order_id: &str, payment_id: &str) -> PaymentConfirmation {
        PaymentConfirmation {
            order_id: order_id.to_string(),
            payment_id: payment_id.to_string(),
            signature: sign_payment(SECRET, order_id, payment_id).unwrap(),
        }
    }

    /// Starts a checkout and signs a payment for the resulting order.
    async fn paid_checkout(
        svc: &SubscriptionService,
        account_id: &str,
        plan_id: &str,
        payment_id: &str,
    ) -> PaymentConfirmation {
        let session = svc.start_checkout(account_id, plan_id).await.unwrap();
        confirmation(&session.order.order_id, payment_id)
    }

    #[tokio::test]
    async fn test_checkout_uses_plan_price() {
        let (db, svc) = service().await;
        let session = svc.start_checkout("acct", "monthly").await.unwrap();

        assert_eq!(session.order.amount, Money::from_rupees(299));
        assert_eq!(session.order.currency, "INR");
        assert_eq!(session.plan.id, "monthly");

        let stored = db.payment_orders().get_by_id(&session.order.order_id).await.unwrap();
        let stored = stored.unwrap();
        assert_eq!(stored.account_id, "acct");
        assert_eq!(stored.plan_id, "monthly");
        assert_eq!(stored.amount, Money::from_rupees(299));

        assert!(matches!(
            svc.start_checkout("acct", "weekly").await,
            Err(BillingError::UnknownPlan(_))
        ));
    }

    #[tokio::test]
    async fn test_checkout_without_provider() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let svc = SubscriptionService::new(db, None, BillingConfig::default());
        assert!(matches!(
            svc.start_checkout("acct", "monthly").await,
            Err(BillingError::ProviderNotConfigured)
        ));
    }

    #[tokio::test]
    async fn test_confirm_activates_plan() {
        let (db, svc) = service().await;
        let now = Utc::now();
        let confirm = paid_checkout(&svc, "acct", "monthly", "pay_1").await;

        let sub = svc.confirm_payment("acct", &confirm, now).await.unwrap();
        assert_eq!(sub.status, SubscriptionStatus::Active);
        assert_eq!(sub.plan_id, "monthly");
        assert_eq!(sub.valid_until, now + Duration::days(30));
        assert_eq!(sub.invoice_count, 0);

        let current = db.subscriptions().current("acct").await.unwrap().unwrap();
        assert_eq!(current.id, sub.id);
        assert!(current.is_current(now));
    }

    #[tokio::test]
    async fn test_plan_comes_from_the_order() {
        let (db, svc) = service().await;
        let monthly = paid_checkout(&svc, "acct", "monthly", "pay_1").await;

        let sub = svc.confirm_payment("acct", &monthly, Utc::now()).await.unwrap();
        assert_eq!(sub.plan_id, "monthly");
        assert_ne!(sub.plan_id, "yearly");
        assert_eq!(db.subscriptions().list("acct").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_order_of_another_account_stores_nothing() {
        let (db, svc) = service().await;
        let confirm = paid_checkout(&svc, "acct", "monthly", "pay_1").await;

        let err = svc
            .confirm_payment("other-acct", &confirm, Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, BillingError::OrderAccountMismatch { .. }));
        assert!(db.subscriptions().list("other-acct").await.unwrap().is_empty());
        assert!(db.subscriptions().list("acct").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_order_stores_nothing() {
        let (db, svc) = service().await;
        // Correctly signed, but never created through checkout
        let confirm = confirmation("order_99", "pay_1");

        let err = svc.confirm_payment("acct", &confirm, Utc::now()).await.unwrap_err();
        assert!(matches!(err, BillingError::UnknownOrder(_)));
        assert!(db.subscriptions().list("acct").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_signature_stores_nothing() {
        let (db, svc) = service().await;
        let mut forged = paid_checkout(&svc, "acct", "monthly", "pay_1").await;
        forged.payment_id = "pay_2".to_string();

        let err = svc.confirm_payment("acct", &forged, Utc::now()).await.unwrap_err();
        assert!(matches!(err, BillingError::InvalidSignature { .. }));
        assert!(db.subscriptions().list("acct").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_replayed_confirmation_is_idempotent() {
        let (db, svc) = service().await;
        let confirm = paid_checkout(&svc, "acct", "monthly", "pay_1").await;

        let first = svc.confirm_payment("acct", &confirm, Utc::now()).await.unwrap();
        let again = svc.confirm_payment("acct", &confirm, Utc::now()).await.unwrap();
        assert_eq!(first.id, again.id);
        assert_eq!(db.subscriptions().list("acct").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_second_payment_for_same_order_rejected() {
        let (db, svc) = service().await;
        let first = paid_checkout(&svc, "acct", "monthly", "pay_1").await;
        svc.confirm_payment("acct", &first, Utc::now()).await.unwrap();

        let second = confirmation(&first.order_id, "pay_2");
        let err = svc.confirm_payment("acct", &second, Utc::now()).await.unwrap_err();
        assert!(matches!(err, BillingError::PaymentProvider(_)));
        assert_eq!(db.subscriptions().list("acct").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_new_payment_supersedes_previous() {
        let (db, svc) = service().await;
        let now = Utc::now();

        let first = paid_checkout(&svc, "acct", "monthly", "pay_1").await;
        let monthly = svc.confirm_payment("acct", &first, now).await.unwrap();
        let second = paid_checkout(&svc, "acct", "yearly", "pay_2").await;
        let yearly = svc
            .confirm_payment("acct", &second, now + Duration::seconds(5))
            .await
            .unwrap();
        assert_eq!(yearly.plan_id, "yearly");

        let current = db.subscriptions().current("acct").await.unwrap().unwrap();
        assert_eq!(current.id, yearly.id);
        let old = db.subscriptions().get_by_id(&monthly.id).await.unwrap().unwrap();
        assert_eq!(old.status, SubscriptionStatus::Expired);
    }

    #[tokio::test]
    async fn test_cancel() {
        let (db, svc) = service().await;
        let confirm = paid_checkout(&svc, "acct", "monthly", "pay_1").await;
        svc.confirm_payment("acct", &confirm, Utc::now()).await.unwrap();

        let cancelled = svc.cancel("acct").await.unwrap();
        assert_eq!(cancelled.status, SubscriptionStatus::Cancelled);
        assert!(db.subscriptions().current("acct").await.unwrap().is_none());

        assert!(matches!(
            svc.cancel("acct").await,
            Err(BillingError::Store(DbError::NotFound { .. }))
        ));
    }
}

//! # Payment Commands
//!
//! ```text
//! list_plans ──► start_checkout(plan) ──► gateway widget ──► confirm_payment
//!                     │                                            │
//!                     └── order created at the gateway,            └── signature checked,
//!                         recorded with its plan                       recorded plan activated
//! ```

use chrono::Utc;
use tracing::{debug, info};

use crate::error::ApiError;
use crate::state::{BillingState, ConfigState, DbState};
use kanak_billing::{CheckoutSession, PaymentConfirmation};
use kanak_core::{Subscription, SubscriptionPlan};

pub fn list_plans(billing: &BillingState) -> Vec<SubscriptionPlan> {
    debug!("list_plans command");
    billing.subscriptions().plans().to_vec()
}

/// Creates a gateway order for `plan_id`.
pub async fn start_checkout(
    config: &ConfigState,
    billing: &BillingState,
    plan_id: &str,
) -> Result<CheckoutSession, ApiError> {
    debug!(plan_id = %plan_id, "start_checkout command");
    Ok(billing
        .subscriptions()
        .start_checkout(config.account_id(), plan_id)
        .await?)
}

/// Activates the plan the order was checked out for, once the gateway has
/// signed the payment.
///
/// Confirming the same payment twice returns the same subscription.
pub async fn confirm_payment(
    config: &ConfigState,
    billing: &BillingState,
    confirmation: PaymentConfirmation,
) -> Result<Subscription, ApiError> {
    debug!(order_id = %confirmation.order_id, "confirm_payment command");
    let subscription = billing
        .subscriptions()
        .confirm_payment(config.account_id(), &confirmation, Utc::now())
        .await?;

    info!(
        subscription_id = %subscription.id,
        plan = %subscription.plan_id,
        valid_until = %subscription.valid_until,
        "Subscription active"
    );
    Ok(subscription)
}

pub async fn cancel_subscription(
    config: &ConfigState,
    billing: &BillingState,
) -> Result<Subscription, ApiError> {
    debug!("cancel_subscription command");
    Ok(billing.subscriptions().cancel(config.account_id()).await?)
}

/// Subscription history, newest first.
pub async fn list_subscriptions(
    db: &DbState,
    config: &ConfigState,
) -> Result<Vec<Subscription>, ApiError> {
    Ok(db.inner().subscriptions().list(config.account_id()).await?)
}

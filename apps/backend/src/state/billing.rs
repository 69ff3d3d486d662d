//! # Billing State
//!
//! Entitlement checks and the subscription checkout, built once from the
//! `[billing]` config section.
//!
//! Without Razorpay credentials the subscription service still lists plans,
//! but checkout and payment confirmation fail with `ProviderNotConfigured`.

use std::sync::Arc;

use kanak_billing::{
    BillingConfig, BillingResult, EntitlementService, PaymentProvider, RazorpayGateway,
    SubscriptionService,
};
use kanak_db::Database;
use tracing::{info, warn};

#[derive(Clone)]
pub struct BillingState {
    entitlements: EntitlementService,
    subscriptions: SubscriptionService,
}

impl BillingState {
    /// Wires billing to the database, with Razorpay as the gateway when it
    /// is configured.
    pub fn new(db: &Database, config: &BillingConfig) -> BillingResult<Self> {
        let provider: Option<Arc<dyn PaymentProvider>> = match &config.razorpay {
            Some(razorpay) if razorpay.is_configured() => {
                info!(key_id = %razorpay.key_id, "Razorpay gateway enabled");
                Some(Arc::new(RazorpayGateway::new(razorpay.clone())?))
            }
            _ => {
                warn!("No payment gateway configured; subscriptions cannot be purchased");
                None
            }
        };

        Ok(Self::with_provider(db, config, provider))
    }

    /// Same as [`BillingState::new`] with an explicit gateway.
    pub fn with_provider(
        db: &Database,
        config: &BillingConfig,
        provider: Option<Arc<dyn PaymentProvider>>,
    ) -> Self {
        BillingState {
            entitlements: EntitlementService::new(Arc::new(db.clone()), config),
            subscriptions: SubscriptionService::new(db.clone(), provider, config.clone()),
        }
    }

    pub fn entitlements(&self) -> &EntitlementService {
        &self.entitlements
    }

    pub fn subscriptions(&self) -> &SubscriptionService {
        &self.subscriptions
    }
}

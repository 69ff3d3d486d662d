//! # Payment Provider
//!
//! The gateway seam used by subscription checkout.
//!
//! ## Checkout Flow
//! ```text
//! ┌──────────┐   start_checkout    ┌──────────────┐  create_order  ┌─────────┐
//! │  Vendor  │ ──────────────────► │ Subscription │ ─────────────► │ Gateway │
//! │   (UI)   │ ◄── PaymentOrder ── │   Service    │ ◄── order_id ─ │         │
//! └────┬─────┘                     └──────▲───────┘                └────┬────┘
//!      │  pays in gateway widget          │                             │
//!      │ ◄────────────────────────────────┼──── payment_id, signature ──┘
//!      │                                  │
//!      └── confirm_payment(confirmation) ─┘  verify_signature first,
//!                                            activate only if valid
//! ```
//!
//! Signatures are `hex(HMAC-SHA256(key_secret, "<order_id>|<payment_id>"))`.

use async_trait::async_trait;
use hmac::{Hmac, Mac};
use kanak_core::Money;
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::error::{BillingError, BillingResult};

type HmacSha256 = Hmac<Sha256>;

/// An order created at the gateway, ready for the checkout widget.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentOrder {
    pub order_id: String,
    pub amount: Money,
    pub currency: String,
    pub receipt: Option<String>,
    /// Public key the widget needs; never the secret.
    pub key_id: Option<String>,
}

/// What the checkout widget hands back after a successful payment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentConfirmation {
    pub order_id: String,
    pub payment_id: String,
    pub signature: String,
}

#[async_trait]
pub trait PaymentProvider: Send + Sync {
    /// Creates an order for `amount`; `metadata` is attached as gateway notes.
    async fn create_order(
        &self,
        amount: Money,
        currency: &str,
        receipt: &str,
        metadata: serde_json::Value,
    ) -> BillingResult<PaymentOrder>;

    /// Whether `signature` proves the gateway saw `payment_id` for `order_id`.
    fn verify_signature(&self, order_id: &str, payment_id: &str, signature: &str) -> bool;
}

/// Hex signature the gateway produces for a payment.
pub fn sign_payment(secret: &str, order_id: &str, payment_id: &str) -> BillingResult<String> {
    let mac = payment_mac(secret, order_id, payment_id)?;
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Constant-time check of a hex payment signature.
pub fn verify_payment_signature(
    secret: &str,
    order_id: &str,
    payment_id: &str,
    signature: &str,
) -> bool {
    let Ok(expected) = hex::decode(signature.trim()) else {
        return false;
    };
    match payment_mac(secret, order_id, payment_id) {
        Ok(mac) => mac.verify_slice(&expected).is_ok(),
        Err(_) => false,
    }
}

fn payment_mac(secret: &str, order_id: &str, payment_id: &str) -> BillingResult<HmacSha256> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|_| BillingError::InvalidConfig("invalid payment key length".to_string()))?;
    mac.update(order_id.as_bytes());
    mac.update(b"|");
    mac.update(payment_id.as_bytes());
    Ok(mac)
}

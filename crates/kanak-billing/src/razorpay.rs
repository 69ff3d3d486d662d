//! # Razorpay Gateway
//!
//! [`PaymentProvider`] over Razorpay's Orders API. Amounts cross the wire
//! in paise; credentials travel as HTTP basic auth.

use std::time::Duration;

use async_trait::async_trait;
use kanak_core::Money;
use reqwest::Client;
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::config::RazorpayConfig;
use crate::error::{BillingError, BillingResult};
use crate::payment::{verify_payment_signature, PaymentOrder, PaymentProvider};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Serialize)]
struct CreateOrderRequest<'a> {
    /// Smallest currency unit.
    amount: i64,
    currency: &'a str,
    receipt: &'a str,
    notes: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct OrderResponse {
    id: String,
    amount: i64,
    currency: String,
    receipt: Option<String>,
    status: String,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    code: String,
    description: String,
}

#[derive(Clone)]
pub struct RazorpayGateway {
    client: Client,
    config: RazorpayConfig,
}

impl RazorpayGateway {
    pub fn new(config: RazorpayConfig) -> BillingResult<Self> {
        if !config.is_configured() {
            return Err(BillingError::ProviderNotConfigured);
        }
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(RazorpayGateway { client, config })
    }

    pub fn key_id(&self) -> &str {
        &self.config.key_id
    }
}

#[async_trait]
impl PaymentProvider for RazorpayGateway {
    async fn create_order(
        &self,
        amount: Money,
        currency: &str,
        receipt: &str,
        metadata: serde_json::Value,
    ) -> BillingResult<PaymentOrder> {
        let paise = amount.to_paise();
        if paise <= 0 {
            return Err(BillingError::PaymentProvider(format!(
                "order amount must be positive, got {amount}"
            )));
        }

        let url = format!("{}/orders", self.config.api_base_url.trim_end_matches('/'));
        let request = CreateOrderRequest {
            amount: paise,
            currency,
            receipt,
            notes: metadata,
        };

        let response = self
            .client
            .post(&url)
            .basic_auth(&self.config.key_id, Some(self.config.key_secret.expose_secret()))
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        debug!(status = %status, "Razorpay create_order response");

        if !status.is_success() {
            let (code, description) = match serde_json::from_str::<ErrorResponse>(&body) {
                Ok(parsed) => (parsed.error.code, parsed.error.description),
                Err(_) => (status.as_str().to_string(), body),
            };
            error!(code = %code, description = %description, "Razorpay order creation failed");
            return Err(BillingError::PaymentProvider(format!("{code}: {description}")));
        }

        let order: OrderResponse = serde_json::from_str(&body)?;
        info!(
            order_id = %order.id,
            amount = order.amount,
            currency = %order.currency,
            status = %order.status,
            "Razorpay order created"
        );

        Ok(PaymentOrder {
            order_id: order.id,
            amount: Money::from_paise(order.amount),
            currency: order.currency,
            receipt: order.receipt,
            key_id: Some(self.config.key_id.clone()),
        })
    }

    fn verify_signature(&self, order_id: &str, payment_id: &str, signature: &str) -> bool {
        let valid = verify_payment_signature(
            self.config.key_secret.expose_secret(),
            order_id,
            payment_id,
            signature,
        );
        if !valid {
            warn!(
                order_id = %order_id,
                payment_id = %payment_id,
                "Payment signature verification failed"
            );
        }
        valid
    }
}

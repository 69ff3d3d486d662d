//! # Billing Configuration
//!
//! Loaded as the `[billing]` section of the application config.
//!
//! ```toml
//! [billing]
//! free_invoice_limit = 3
//! accounting_timeout_ms = 2000
//! currency = "INR"
//!
//! [[billing.plans]]
//! id = "monthly"
//! name = "Kanak Pro (Monthly)"
//! price = "299.00"
//! duration_days = 30
//!
//! [billing.razorpay]
//! key_id = "rzp_test_..."
//! key_secret = "..."
//! ```

use std::time::Duration;

use kanak_core::{Money, SubscriptionPlan, FREE_INVOICE_LIMIT};
use secrecy::{ExposeSecret, Secret};
use serde::Deserialize;

use crate::error::{BillingError, BillingResult};

pub const DEFAULT_ACCOUNTING_TIMEOUT_MS: u64 = 2_000;
pub const DEFAULT_RAZORPAY_API_URL: &str = "https://api.razorpay.com/v1";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BillingConfig {
    /// Free invoices granted to a new account.
    pub free_invoice_limit: i64,

    /// Upper bound on any single usage-store call before failing open.
    pub accounting_timeout_ms: u64,

    /// ISO currency code sent to the gateway.
    pub currency: String,

    pub plans: Vec<SubscriptionPlan>,

    /// Absent until the vendor sets up payments.
    pub razorpay: Option<RazorpayConfig>,
}

impl Default for BillingConfig {
    fn default() -> Self {
        BillingConfig {
            free_invoice_limit: FREE_INVOICE_LIMIT,
            accounting_timeout_ms: DEFAULT_ACCOUNTING_TIMEOUT_MS,
            currency: "INR".to_string(),
            plans: default_plans(),
            razorpay: None,
        }
    }
}

fn default_plans() -> Vec<SubscriptionPlan> {
    vec![
        SubscriptionPlan {
            id: "monthly".to_string(),
            name: "Kanak Pro (Monthly)".to_string(),
            price: Money::from_rupees(299),
            duration_days: 30,
            invoice_limit: None,
        },
        SubscriptionPlan {
            id: "yearly".to_string(),
            name: "Kanak Pro (Yearly)".to_string(),
            price: Money::from_rupees(2_999),
            duration_days: 365,
            invoice_limit: None,
        },
    ]
}

impl BillingConfig {
    pub fn accounting_timeout(&self) -> Duration {
        Duration::from_millis(self.accounting_timeout_ms)
    }

    pub fn plan(&self, plan_id: &str) -> BillingResult<&SubscriptionPlan> {
        self.plans
            .iter()
            .find(|p| p.id == plan_id)
            .ok_or_else(|| BillingError::UnknownPlan(plan_id.to_string()))
    }

    pub fn validate(&self) -> BillingResult<()> {
        if self.free_invoice_limit < 0 {
            return Err(BillingError::InvalidConfig(
                "free_invoice_limit must not be negative".to_string(),
            ));
        }
        if self.accounting_timeout_ms == 0 {
            return Err(BillingError::InvalidConfig(
                "accounting_timeout_ms must be positive".to_string(),
            ));
        }
        if self.currency.len() != 3 {
            return Err(BillingError::InvalidConfig(format!(
                "currency must be a 3-letter code, got '{}'",
                self.currency
            )));
        }

        for (i, plan) in self.plans.iter().enumerate() {
            if plan.id.trim().is_empty() {
                return Err(BillingError::InvalidConfig(format!("plan #{} has no id", i + 1)));
            }
            if self.plans[..i].iter().any(|p| p.id == plan.id) {
                return Err(BillingError::InvalidConfig(format!(
                    "duplicate plan id '{}'",
                    plan.id
                )));
            }
            if !plan.price.is_positive() || plan.duration_days <= 0 {
                return Err(BillingError::InvalidConfig(format!(
                    "plan '{}' needs a positive price and duration",
                    plan.id
                )));
            }
            if plan.invoice_limit.is_some_and(|l| l <= 0) {
                return Err(BillingError::InvalidConfig(format!(
                    "plan '{}' invoice_limit must be positive",
                    plan.id
                )));
            }
        }

        if let Some(razorpay) = &self.razorpay {
            razorpay.validate()?;
        }
        Ok(())
    }
}

/// Razorpay API credentials.
#[derive(Debug, Clone, Deserialize)]
pub struct RazorpayConfig {
    pub key_id: String,
    pub key_secret: Secret<String>,
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
}

fn default_api_base_url() -> String {
    DEFAULT_RAZORPAY_API_URL.to_string()
}

impl RazorpayConfig {
    pub fn new(key_id: impl Into<String>, key_secret: impl Into<String>) -> Self {
        RazorpayConfig {
            key_id: key_id.into(),
            key_secret: Secret::new(key_secret.into()),
            api_base_url: default_api_base_url(),
        }
    }

    pub fn is_configured(&self) -> bool {
        !self.key_id.is_empty() && !self.key_secret.expose_secret().is_empty()
    }

    fn validate(&self) -> BillingResult<()> {
        if !self.is_configured() {
            return Err(BillingError::InvalidConfig(
                "razorpay key_id and key_secret are both required".to_string(),
            ));
        }
        if !self.api_base_url.starts_with("https://") && !self.api_base_url.starts_with("http://") {
            return Err(BillingError::InvalidConfig(format!(
                "razorpay api_base_url is not an http(s) URL: {}",
                self.api_base_url
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = BillingConfig::default();
        assert_eq!(config.free_invoice_limit, 3);
        assert_eq!(config.accounting_timeout(), Duration::from_secs(2));
        assert!(config.validate().is_ok());
        assert_eq!(config.plan("monthly").unwrap().duration_days, 30);
        assert!(matches!(config.plan("weekly"), Err(BillingError::UnknownPlan(_))));
    }

    #[test]
    fn test_duplicate_plan_rejected() {
        let mut config = BillingConfig::default();
        let copy = config.plans[0].clone();
        config.plans.push(copy);
        assert!(matches!(config.validate(), Err(BillingError::InvalidConfig(_))));
    }

    #[test]
    fn test_empty_secret_rejected() {
        let config = BillingConfig {
            razorpay: Some(RazorpayConfig::new("rzp_test_1", "")),
            ..BillingConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_secret_not_in_debug_output() {
        let razorpay = RazorpayConfig::new("rzp_test_1", "super-secret");
        assert!(!format!("{razorpay:?}").contains("super-secret"));
    }
}

//! # Config Commands

use serde::Serialize;
use tracing::debug;

use crate::state::{BusinessProfile, ConfigState, InvoicingConfig};
use kanak_core::TaxSettings;

/// Configuration the UI may see. Gateway credentials are reduced to a flag.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigView {
    pub account_id: String,
    pub business: BusinessProfile,
    pub tax: TaxSettings,
    pub invoicing: InvoicingConfig,
    pub currency: String,
    pub free_invoice_limit: i64,
    pub payment_gateway_configured: bool,
}

/// Gets the current application configuration.
///
/// ## When Used
/// - App startup (business name on the header)
/// - Invoice printing (vendor address and GSTIN)
/// - Item form (default GST rates)
pub fn get_config(config: &ConfigState) -> ConfigView {
    debug!("get_config command");
    let app = config.get();
    ConfigView {
        account_id: app.account_id.clone(),
        business: app.business.clone(),
        tax: app.tax,
        invoicing: app.invoicing.clone(),
        currency: app.billing.currency.clone(),
        free_invoice_limit: app.billing.free_invoice_limit,
        payment_gateway_configured: app
            .billing
            .razorpay
            .as_ref()
            .is_some_and(|r| r.is_configured()),
    }
}

//! # Customer Commands

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::ApiError;
use crate::state::{ConfigState, DbState};
use kanak_core::validation::{
    validate_customer_name, validate_email, validate_gstin, validate_phone,
};
use kanak_core::{Customer, ValidationError};
use kanak_db::CustomerFilter;

/// Customer details as entered in the form.
///
/// The address and phone may be left blank while drafting; an invoice
/// cannot be sent until they are filled in.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerInput {
    pub name: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub gstin: Option<String>,
}

impl CustomerInput {
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_customer_name(&self.name)?;
        if !self.phone.trim().is_empty() {
            validate_phone(&self.phone)?;
        }
        if let Some(email) = non_blank(&self.email) {
            validate_email(&email)?;
        }
        if let Some(gstin) = non_blank(&self.gstin) {
            validate_gstin(&gstin.to_uppercase())?;
        }
        Ok(())
    }

    /// Writes the trimmed input onto `customer`, keeping its id.
    pub fn apply_to(&self, customer: &mut Customer) {
        customer.name = self.name.trim().to_string();
        customer.address = self.address.trim().to_string();
        customer.phone = self.phone.trim().to_string();
        customer.email = non_blank(&self.email);
        customer.gstin = non_blank(&self.gstin).map(|g| g.to_uppercase());
        customer.updated_at = Utc::now();
    }

    /// A new customer of `account_id` built from this input.
    pub fn into_customer(self, account_id: &str) -> Customer {
        let mut customer = Customer::new(account_id, "", "", "", Utc::now());
        self.apply_to(&mut customer);
        customer
    }
}

fn non_blank(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

pub async fn create_customer(
    db: &DbState,
    config: &ConfigState,
    input: CustomerInput,
) -> Result<Customer, ApiError> {
    debug!(name = %input.name, "create_customer command");
    input.validate()?;

    let customer = input.into_customer(config.account_id());
    db.inner().customers().upsert(&customer).await?;

    info!(customer_id = %customer.id, "Customer created");
    Ok(customer)
}

pub async fn update_customer(
    db: &DbState,
    config: &ConfigState,
    id: &str,
    input: CustomerInput,
) -> Result<Customer, ApiError> {
    debug!(id = %id, "update_customer command");
    input.validate()?;

    let mut customer = get_customer(db, config, id).await?;
    input.apply_to(&mut customer);
    db.inner().customers().upsert(&customer).await?;
    Ok(customer)
}

pub async fn get_customer(
    db: &DbState,
    config: &ConfigState,
    id: &str,
) -> Result<Customer, ApiError> {
    db.inner()
        .customers()
        .get_by_id(config.account_id(), id)
        .await?
        .ok_or_else(|| ApiError::not_found("Customer", id))
}

/// Lists customers, optionally filtered by name, phone or GSTIN.
pub async fn list_customers(
    db: &DbState,
    config: &ConfigState,
    search: Option<String>,
    limit: Option<i64>,
) -> Result<Vec<Customer>, ApiError> {
    debug!(?search, ?limit, "list_customers command");
    let filter = CustomerFilter {
        search,
        limit: Some(limit.unwrap_or(50).clamp(1, 500)),
    };
    Ok(db.inner().customers().list(config.account_id(), &filter).await?)
}

/// Deletes a customer with no invoices.
pub async fn delete_customer(db: &DbState, config: &ConfigState, id: &str) -> Result<(), ApiError> {
    debug!(id = %id, "delete_customer command");
    db.inner().customers().delete(config.account_id(), id).await?;
    info!(customer_id = %id, "Customer deleted");
    Ok(())
}

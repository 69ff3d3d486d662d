//! # Configuration State
//!
//! Application configuration loaded once at startup.
//!
//! ## Configuration Sources (Priority Order)
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  1. Environment variables (highest)                                     │
//! │     KANAK_ACCOUNT_ID, KANAK_DB_PATH, KANAK_CGST_RATE, KANAK_SGST_RATE,  │
//! │     KANAK_FREE_INVOICE_LIMIT, KANAK_RAZORPAY_KEY_ID,                    │
//! │     KANAK_RAZORPAY_KEY_SECRET                                           │
//! │                                                                         │
//! │  2. TOML file                                                           │
//! │     $KANAK_CONFIG, else the platform config dir:                        │
//! │     ~/.config/kanak/kanak.toml (Linux)                                  │
//! │     ~/Library/Application Support/com.kanak.invoicing/kanak.toml (mac)  │
//! │                                                                         │
//! │  3. Defaults (lowest)                                                   │
//! │     CGST 1.5% + SGST 1.5%, 3 free invoices, INV-<year>-<seq>            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The merged result is validated before anything else starts.
//!
//! ## Configuration File Format
//! ```toml
//! account_id = "00000000-0000-0000-0000-000000000001"
//!
//! [business]
//! name = "Shree Ganesh Jewellers"
//! address = "12 Johari Bazaar, Jaipur"
//! phone = "9829012345"
//! gstin = "08AABCS1234L1ZQ"
//!
//! [tax]
//! default_cgst_rate = "1.5"
//! default_sgst_rate = "1.5"
//!
//! [invoicing]
//! number_prefix = "INV"
//! payment_terms_days = 15
//!
//! [billing]
//! free_invoice_limit = 3
//! ```
//!
//! ## Thread Safety
//! Read-only after startup, so no lock.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use kanak_billing::{BillingConfig, BillingError, RazorpayConfig};
use kanak_core::validation::{validate_gstin, validate_phone};
use kanak_core::{GstRate, TaxSettings, ValidationError, DEFAULT_ACCOUNT_ID};
use rust_decimal::Decimal;
use secrecy::Secret;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

/// Configuration loading failures.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid value for {var}: '{value}'")]
    InvalidEnv { var: String, value: String },

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Could not determine the application data directory")]
    NoDataDir,

    #[error(transparent)]
    Billing(#[from] BillingError),
}

impl From<ValidationError> for ConfigError {
    fn from(err: ValidationError) -> Self {
        ConfigError::Invalid(err.to_string())
    }
}

/// The vendor's own details, printed on every invoice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct BusinessProfile {
    pub name: String,
    pub address: String,
    pub phone: String,
    pub gstin: Option<String>,
    pub email: Option<String>,
}

impl Default for BusinessProfile {
    fn default() -> Self {
        BusinessProfile {
            name: "Kanak Jewellers".to_string(),
            address: "Zaveri Bazaar, Mumbai".to_string(),
            phone: "9820000000".to_string(),
            gstin: None,
            email: None,
        }
    }
}

/// Invoice numbering and payment terms.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InvoicingConfig {
    /// `<prefix>-<year>-<seq>`
    pub number_prefix: String,
    /// Days from the invoice date to the due date.
    pub payment_terms_days: i64,
}

impl Default for InvoicingConfig {
    fn default() -> Self {
        InvoicingConfig {
            number_prefix: "INV".to_string(),
            payment_terms_days: 15,
        }
    }
}

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Account all commands act for (single-vendor install).
    pub account_id: String,

    /// SQLite file; the platform data directory when unset.
    pub database_path: Option<PathBuf>,

    pub business: BusinessProfile,
    pub tax: TaxSettings,
    pub invoicing: InvoicingConfig,
    pub billing: BillingConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            account_id: DEFAULT_ACCOUNT_ID.to_string(),
            database_path: None,
            business: BusinessProfile::default(),
            tax: TaxSettings::default(),
            invoicing: InvoicingConfig::default(),
            billing: BillingConfig::default(),
        }
    }
}

impl AppConfig {
    /// Loads defaults, then the TOML file, then environment overrides, and
    /// validates the result.
    ///
    /// `config_path` wins over `KANAK_CONFIG`, which wins over the platform
    /// config directory. A missing file is not an error.
    pub fn load(config_path: Option<PathBuf>) -> Result<Self, ConfigError> {
        let path = config_path
            .or_else(|| std::env::var("KANAK_CONFIG").ok().map(PathBuf::from))
            .or_else(default_config_path);

        let mut config = match path {
            Some(path) if path.exists() => Self::from_file(&path)?,
            Some(path) => {
                debug!(?path, "Config file not found, using defaults");
                AppConfig::default()
            }
            None => AppConfig::default(),
        };

        config.apply_overrides(|var| std::env::var(var).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        info!(?path, "Loading config from file");
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(contents)?)
    }

    /// Applies `KANAK_*` overrides read through `lookup`.
    pub fn apply_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(account_id) = lookup("KANAK_ACCOUNT_ID") {
            debug!(account_id = %account_id, "Overriding account ID from environment");
            self.account_id = account_id;
        }

        if let Some(path) = lookup("KANAK_DB_PATH") {
            debug!(path = %path, "Overriding database path from environment");
            self.database_path = Some(PathBuf::from(path));
        }

        if let Some(raw) = lookup("KANAK_CGST_RATE") {
            self.tax.default_cgst_rate = parse_rate("KANAK_CGST_RATE", &raw)?;
        }
        if let Some(raw) = lookup("KANAK_SGST_RATE") {
            self.tax.default_sgst_rate = parse_rate("KANAK_SGST_RATE", &raw)?;
        }

        if let Some(raw) = lookup("KANAK_FREE_INVOICE_LIMIT") {
            self.billing.free_invoice_limit =
                raw.trim().parse().map_err(|_| ConfigError::InvalidEnv {
                    var: "KANAK_FREE_INVOICE_LIMIT".to_string(),
                    value: raw.clone(),
                })?;
        }

        let key_id = lookup("KANAK_RAZORPAY_KEY_ID");
        let key_secret = lookup("KANAK_RAZORPAY_KEY_SECRET");
        if key_id.is_some() || key_secret.is_some() {
            let mut razorpay = self
                .billing
                .razorpay
                .take()
                .unwrap_or_else(|| RazorpayConfig::new("", ""));
            if let Some(key_id) = key_id {
                razorpay.key_id = key_id;
            }
            if let Some(secret) = key_secret {
                razorpay.key_secret = Secret::new(secret);
            }
            self.billing.razorpay = Some(razorpay);
        }

        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.account_id.trim().is_empty() {
            return Err(ConfigError::Invalid("account_id must not be empty".to_string()));
        }

        for (name, rate) in [
            ("tax.default_cgst_rate", self.tax.default_cgst_rate),
            ("tax.default_sgst_rate", self.tax.default_sgst_rate),
        ] {
            kanak_core::validation::validate_gst_rate(name, rate)?;
        }

        if self.business.name.trim().is_empty() {
            return Err(ConfigError::Invalid("business.name must not be empty".to_string()));
        }
        if !self.business.phone.trim().is_empty() {
            validate_phone(&self.business.phone)?;
        }
        if let Some(gstin) = &self.business.gstin {
            validate_gstin(gstin)?;
        }

        let prefix = &self.invoicing.number_prefix;
        if prefix.is_empty()
            || prefix.len() > 10
            || !prefix.chars().all(|c| c.is_ascii_alphanumeric())
        {
            return Err(ConfigError::Invalid(format!(
                "invoicing.number_prefix must be 1-10 letters or digits, got '{prefix}'"
            )));
        }
        if !(0..=365).contains(&self.invoicing.payment_terms_days) {
            return Err(ConfigError::Invalid(
                "invoicing.payment_terms_days must be between 0 and 365".to_string(),
            ));
        }

        self.billing.validate()?;
        Ok(())
    }

    /// The configured database path, or `kanak.db` in the platform data
    /// directory (created if needed).
    pub fn resolve_database_path(&self) -> Result<PathBuf, ConfigError> {
        if let Some(path) = &self.database_path {
            return Ok(path.clone());
        }

        let dirs = directories::ProjectDirs::from("com", "kanak", "invoicing")
            .ok_or(ConfigError::NoDataDir)?;
        let data_dir = dirs.data_dir();
        std::fs::create_dir_all(data_dir).map_err(|source| ConfigError::Read {
            path: data_dir.to_path_buf(),
            source,
        })?;
        Ok(data_dir.join("kanak.db"))
    }
}

fn parse_rate(var: &str, raw: &str) -> Result<GstRate, ConfigError> {
    Decimal::from_str(raw.trim())
        .map(GstRate::from_percentage)
        .map_err(|_| ConfigError::InvalidEnv {
            var: var.to_string(),
            value: raw.to_string(),
        })
}

fn default_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("com", "kanak", "invoicing")
        .map(|dirs| dirs.config_dir().join("kanak.toml"))
}

/// Configuration as managed state.
#[derive(Debug, Clone)]
pub struct ConfigState {
    config: AppConfig,
}

impl ConfigState {
    pub fn new(config: AppConfig) -> Self {
        ConfigState { config }
    }

    pub fn get(&self) -> &AppConfig {
        &self.config
    }

    pub fn account_id(&self) -> &str {
        &self.config.account_id
    }

    pub fn tax(&self) -> &TaxSettings {
        &self.config.tax
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.account_id, DEFAULT_ACCOUNT_ID);
        assert_eq!(config.tax.default_cgst_rate.percentage(), dec!(1.5));
        assert_eq!(config.tax.default_sgst_rate.percentage(), dec!(1.5));
        assert_eq!(config.billing.free_invoice_limit, 3);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_toml_overrides_defaults() {
        let config = AppConfig::from_toml(
            r#"
            account_id = "acct-7"

            [business]
            name = "Shree Ganesh Jewellers"
            gstin = "08AABCS1234L1ZQ"

            [tax]
            default_cgst_rate = "2.5"

            [invoicing]
            number_prefix = "SGJ"
            "#,
        )
        .unwrap();

        assert_eq!(config.account_id, "acct-7");
        assert_eq!(config.business.name, "Shree Ganesh Jewellers");
        // Unset fields inside a present section keep their defaults
        assert_eq!(config.business.phone, "9820000000");
        assert_eq!(config.tax.default_cgst_rate.percentage(), dec!(2.5));
        assert_eq!(config.tax.default_sgst_rate.percentage(), dec!(1.5));
        assert_eq!(config.invoicing.number_prefix, "SGJ");
        assert_eq!(config.invoicing.payment_terms_days, 15);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_overrides_file() {
        let mut config = AppConfig::from_toml("[billing]\nfree_invoice_limit = 5\n").unwrap();
        config
            .apply_overrides(env(&[
                ("KANAK_FREE_INVOICE_LIMIT", "10"),
                ("KANAK_SGST_RATE", "2.5"),
                ("KANAK_DB_PATH", "/tmp/kanak-test.db"),
            ]))
            .unwrap();

        assert_eq!(config.billing.free_invoice_limit, 10);
        assert_eq!(config.tax.default_sgst_rate.percentage(), dec!(2.5));
        assert_eq!(
            config.resolve_database_path().unwrap(),
            PathBuf::from("/tmp/kanak-test.db")
        );
    }

    #[test]
    fn test_bad_env_value() {
        let mut config = AppConfig::default();
        let err = config
            .apply_overrides(env(&[("KANAK_CGST_RATE", "one and a half")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnv { .. }));
    }

    #[test]
    fn test_razorpay_from_env() {
        let mut config = AppConfig::default();
        config
            .apply_overrides(env(&[("KANAK_RAZORPAY_KEY_ID", "rzp_test_1")]))
            .unwrap();
        // Secret missing
        assert!(config.validate().is_err());

        config
            .apply_overrides(env(&[("KANAK_RAZORPAY_KEY_SECRET", "s3cret")]))
            .unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.billing.razorpay.unwrap().key_id, "rzp_test_1");
    }

    #[test]
    fn test_invalid_values_rejected() {
        let mut config = AppConfig::default();
        config.tax.default_cgst_rate = GstRate::from_percentage(dec!(150));
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.invoicing.number_prefix = "INV/".to_string();
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.business.gstin = Some("NOT-A-GSTIN".to_string());
        assert!(config.validate().is_err());
    }
}

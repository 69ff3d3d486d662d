//! # Validation Module
//!
//! Input validation utilities for Kanak.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Backend command (Rust)                                       │
//! │  ├── Type validation (deserialization)                                 │
//! │  └── THIS MODULE: field rules for customers and line items             │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: Invoice lifecycle                                            │
//! │  └── Invoice::validate_for_sending before draft → sent                 │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── NOT NULL / CHECK constraints                                      │
//! │  └── Foreign key constraints (customer delete is RESTRICTed)           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Drafts are allowed to be incomplete: an empty customer address is fine
//! while editing and only rejected when the invoice is sent.
//!
//! ## Usage
//! ```rust
//! use kanak_core::validation::{validate_gstin, validate_quantity};
//!
//! validate_gstin("33AABCT1332L1ZZ").unwrap();
//! validate_quantity(2).unwrap();
//! ```

use rust_decimal::Decimal;

use crate::error::ValidationError;
use crate::money::Money;
use crate::tax::ItemInput;
use crate::types::GstRate;
use crate::{MAX_AMOUNT, MAX_ITEM_QUANTITY, MAX_WEIGHT_GRAMS};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// String Validators
// =============================================================================

fn validate_name(field: &str, value: &str, max: usize) -> ValidationResult<()> {
    let value = value.trim();

    if value.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if value.chars().count() > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        });
    }

    Ok(())
}

/// Validates a customer name: required, at most 200 characters.
pub fn validate_customer_name(name: &str) -> ValidationResult<()> {
    validate_name("customer.name", name, 200)
}

/// Validates a line item description: required, at most 200 characters.
pub fn validate_item_name(name: &str) -> ValidationResult<()> {
    validate_name("item.name", name, 200)
}

/// Validates an Indian mobile or landline number.
///
/// ## Rules
/// - Spaces and hyphens are ignored
/// - An optional `+91` prefix is allowed
/// - The remainder must be exactly 10 digits
///
/// ## Example
/// ```rust
/// use kanak_core::validation::validate_phone;
///
/// assert!(validate_phone("98400 12345").is_ok());
/// assert!(validate_phone("+91-98400-12345").is_ok());
/// assert!(validate_phone("12345").is_err());
/// ```
pub fn validate_phone(phone: &str) -> ValidationResult<()> {
    let compact: String = phone
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '-')
        .collect();

    if compact.is_empty() {
        return Err(ValidationError::Required {
            field: "customer.phone".to_string(),
        });
    }

    let digits = compact.strip_prefix("+91").unwrap_or(&compact);
    if digits.len() != 10 || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(ValidationError::InvalidFormat {
            field: "customer.phone".to_string(),
            reason: "must be a 10-digit number, optionally prefixed with +91".to_string(),
        });
    }

    Ok(())
}

/// Validates a GST identification number.
///
/// ## Layout
/// ```text
/// 33 AABCT1332L 1 Z Z
/// ── ────────── ─ ─ ─
/// │      │      │ │ └─ check character
/// │      │      │ └─── always 'Z'
/// │      │      └───── entity number (1-9, A-Z)
/// │      └──────────── PAN of the holder
/// └─────────────────── state code
/// ```
/// The check character itself is not verified.
pub fn validate_gstin(gstin: &str) -> ValidationResult<()> {
    let invalid = |reason: &str| ValidationError::InvalidFormat {
        field: "customer.gstin".to_string(),
        reason: reason.to_string(),
    };

    let chars: Vec<char> = gstin.trim().chars().collect();
    if chars.len() != 15 {
        return Err(invalid("must be 15 characters"));
    }

    let state_ok = chars[0..2].iter().all(|c| c.is_ascii_digit());
    let pan_ok = chars[2..7].iter().all(|c| c.is_ascii_uppercase())
        && chars[7..11].iter().all(|c| c.is_ascii_digit())
        && chars[11].is_ascii_uppercase();
    let entity_ok = chars[12].is_ascii_uppercase() || ('1'..='9').contains(&chars[12]);
    let tail_ok = chars[13] == 'Z' && chars[14].is_ascii_alphanumeric();

    if !state_ok {
        return Err(invalid("must start with a 2-digit state code"));
    }
    if !(pan_ok && entity_ok && tail_ok) {
        return Err(invalid("does not match the GSTIN layout"));
    }

    Ok(())
}

/// Validates an HSN code: 4, 6 or 8 digits.
pub fn validate_hsn_code(code: &str) -> ValidationResult<()> {
    let code = code.trim();
    if !matches!(code.len(), 4 | 6 | 8) || !code.chars().all(|c| c.is_ascii_digit()) {
        return Err(ValidationError::InvalidFormat {
            field: "item.hsn_code".to_string(),
            reason: "must be 4, 6 or 8 digits".to_string(),
        });
    }
    Ok(())
}

/// Minimal email shape check: one `@` with text on both sides and a dot in
/// the domain.
pub fn validate_email(email: &str) -> ValidationResult<()> {
    let email = email.trim();
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
        }
        None => false,
    };
    if !valid {
        return Err(ValidationError::InvalidFormat {
            field: "customer.email".to_string(),
            reason: "must be an email address".to_string(),
        });
    }
    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a line item quantity.
///
/// ## Rules
/// - Must be positive (> 0)
/// - Must not exceed MAX_ITEM_QUANTITY
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "item.quantity".to_string(),
        });
    }

    if qty > MAX_ITEM_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "item.quantity".to_string(),
            min: "1".to_string(),
            max: MAX_ITEM_QUANTITY.to_string(),
        });
    }

    Ok(())
}

/// Validates a weight in grams: zero up to MAX_WEIGHT_GRAMS.
pub fn validate_weight(grams: Decimal) -> ValidationResult<()> {
    if grams.is_sign_negative() && !grams.is_zero() {
        return Err(ValidationError::MustNotBeNegative {
            field: "item.weight_in_grams".to_string(),
        });
    }
    if grams > Decimal::from(MAX_WEIGHT_GRAMS) {
        return Err(ValidationError::OutOfRange {
            field: "item.weight_in_grams".to_string(),
            min: "0".to_string(),
            max: MAX_WEIGHT_GRAMS.to_string(),
        });
    }
    Ok(())
}

/// Validates an entered amount: zero up to MAX_AMOUNT.
pub fn validate_amount(field: &str, amount: Money) -> ValidationResult<()> {
    if amount.is_negative() {
        return Err(ValidationError::MustNotBeNegative {
            field: field.to_string(),
        });
    }
    check_amount_cap(field, amount, "0")
}

/// Validates that a payment amount is above zero and at most MAX_AMOUNT.
pub fn validate_payment_amount(amount: Money) -> ValidationResult<()> {
    if !amount.is_positive() {
        return Err(ValidationError::MustBePositive {
            field: "paid_amount".to_string(),
        });
    }
    check_amount_cap("paid_amount", amount, "0.01")
}

fn check_amount_cap(field: &str, amount: Money, min: &str) -> ValidationResult<()> {
    if amount.amount() > Decimal::from(MAX_AMOUNT) {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: min.to_string(),
            max: MAX_AMOUNT.to_string(),
        });
    }
    Ok(())
}

/// Validates a GST rate percentage: 0 to 100 inclusive.
pub fn validate_gst_rate(field: &str, rate: GstRate) -> ValidationResult<()> {
    let pct = rate.percentage();
    if pct < Decimal::ZERO || pct > Decimal::ONE_HUNDRED {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: "0".to_string(),
            max: "100".to_string(),
        });
    }
    Ok(())
}

// =============================================================================
// Composite Validators
// =============================================================================

/// Validates everything a vendor can enter for a line item.
pub fn validate_item_input(input: &ItemInput) -> ValidationResult<()> {
    validate_item_name(&input.name)?;
    validate_quantity(input.quantity)?;

    if let Some(code) = &input.hsn_code {
        validate_hsn_code(code)?;
    }
    if let Some(weight) = input.weight_in_grams {
        validate_weight(weight)?;
    }
    if let Some(rate) = input.rate_per_gram {
        validate_amount("item.rate_per_gram", rate)?;
    }
    if let Some(price) = input.price {
        validate_amount("item.price", price)?;
    }
    if let Some(making) = input.making_charges {
        validate_amount("item.making_charges", making)?;
    }
    if let Some(rate) = input.cgst_rate {
        validate_gst_rate("item.cgst_rate", rate)?;
    }
    if let Some(rate) = input.sgst_rate {
        validate_gst_rate("item.sgst_rate", rate)?;
    }

    Ok(())
}

// =============================================================================
// UUID Validators
// =============================================================================

/// Validates a UUID string format.
pub fn validate_uuid(id: &str) -> ValidationResult<()> {
    if id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "id".to_string(),
        });
    }

    uuid::Uuid::parse_str(id).map_err(|_| ValidationError::InvalidFormat {
        field: "id".to_string(),
        reason: "must be a valid UUID".to_string(),
    })?;

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_validate_customer_name() {
        assert!(validate_customer_name("Lakshmi Jewellers").is_ok());
        assert!(validate_customer_name("  ").is_err());
        assert!(validate_customer_name(&"A".repeat(201)).is_err());
    }

    #[test]
    fn test_validate_phone() {
        assert!(validate_phone("9840012345").is_ok());
        assert!(validate_phone("+91 98400 12345").is_ok());
        assert!(validate_phone("").is_err());
        assert!(validate_phone("98400-1234x").is_err());
        assert!(validate_phone("+1 5551234567").is_err());
    }

    #[test]
    fn test_validate_gstin() {
        assert!(validate_gstin("33AABCT1332L1ZZ").is_ok());
        assert!(validate_gstin("27AAPFU0939F1ZV").is_ok());

        assert!(validate_gstin("33AABCT1332L1Z").is_err());
        assert!(validate_gstin("XXAABCT1332L1ZZ").is_err());
        assert!(validate_gstin("33aabct1332l1zz").is_err());
        assert!(validate_gstin("33AABCT1332L1YZ").is_err());
    }

    #[test]
    fn test_validate_hsn_code() {
        assert!(validate_hsn_code("7113").is_ok());
        assert!(validate_hsn_code("711319").is_ok());
        assert!(validate_hsn_code("71131910").is_ok());
        assert!(validate_hsn_code("71131").is_err());
        assert!(validate_hsn_code("71A3").is_err());
    }

    #[test]
    fn test_validate_email() {
        assert!(validate_email("orders@lakshmi.in").is_ok());
        assert!(validate_email("no-at-sign").is_err());
        assert!(validate_email("a@b").is_err());
        assert!(validate_email("@lakshmi.in").is_err());
    }

    #[test]
    fn test_validate_quantity() {
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(MAX_ITEM_QUANTITY).is_ok());
        assert!(validate_quantity(0).is_err());
        assert!(validate_quantity(MAX_ITEM_QUANTITY + 1).is_err());
    }

    #[test]
    fn test_validate_gst_rate() {
        assert!(validate_gst_rate("cgst", GstRate::zero()).is_ok());
        assert!(validate_gst_rate("cgst", GstRate::from_percentage(dec!(100))).is_ok());
        assert!(validate_gst_rate("cgst", GstRate::from_percentage(dec!(100.5))).is_err());
        assert!(validate_gst_rate("cgst", GstRate::from_percentage(dec!(-1))).is_err());
    }

    #[test]
    fn test_validate_item_input() {
        let mut input = ItemInput {
            name: "Gold Ring".to_string(),
            quantity: 1,
            weight_in_grams: Some(dec!(4.25)),
            rate_per_gram: Some(Money::from_rupees(6100)),
            ..Default::default()
        };
        assert!(validate_item_input(&input).is_ok());

        input.weight_in_grams = Some(dec!(-0.5));
        let err = validate_item_input(&input).unwrap_err();
        assert_eq!(err.field(), "item.weight_in_grams");

        input.weight_in_grams = None;
        input.making_charges = Some(Money::from_rupees(-1));
        assert!(validate_item_input(&input).is_err());
    }

    #[test]
    fn test_item_magnitudes_are_capped() {
        let huge = ItemInput {
            name: "Bullion Bar".to_string(),
            quantity: 1,
            weight_in_grams: Some(Decimal::from(1_000_000_000_000_000_i64)),
            rate_per_gram: Some(Money::from_rupees(1_000_000_000_000_000)),
            ..Default::default()
        };
        let err = validate_item_input(&huge).unwrap_err();
        assert!(matches!(err, ValidationError::OutOfRange { .. }));
        assert_eq!(err.field(), "item.weight_in_grams");

        let rate_only = ItemInput {
            weight_in_grams: Some(dec!(10)),
            ..huge.clone()
        };
        let err = validate_item_input(&rate_only).unwrap_err();
        assert!(matches!(err, ValidationError::OutOfRange { .. }));
        assert_eq!(err.field(), "item.rate_per_gram");

        let price = ItemInput {
            weight_in_grams: None,
            rate_per_gram: None,
            price: Some(Money::from_rupees(MAX_AMOUNT + 1)),
            ..huge.clone()
        };
        assert!(matches!(
            validate_item_input(&price),
            Err(ValidationError::OutOfRange { .. })
        ));

        assert!(matches!(
            validate_payment_amount(Money::from_rupees(i64::MAX)),
            Err(ValidationError::OutOfRange { .. })
        ));
    }

    #[test]
    fn test_largest_valid_invoice_does_not_overflow() {
        let input = ItemInput {
            name: "Bullion Bar".to_string(),
            quantity: 1,
            weight_in_grams: Some(Decimal::from(MAX_WEIGHT_GRAMS)),
            rate_per_gram: Some(Money::from_rupees(MAX_AMOUNT)),
            making_charges: Some(Money::from_rupees(MAX_AMOUNT)),
            cgst_rate: Some(GstRate::from_percentage(dec!(100))),
            sgst_rate: Some(GstRate::from_percentage(dec!(100))),
            ..Default::default()
        };
        assert!(validate_item_input(&input).is_ok());

        let item = crate::TaxSettings::default().build_item(input);
        let items = vec![item; crate::MAX_INVOICE_ITEMS];
        let totals = crate::tax::aggregate_invoice_totals(&items);
        assert!(totals.grand_total.is_positive());
    }

    #[test]
    fn test_validate_uuid() {
        assert!(validate_uuid("550e8400-e29b-41d4-a716-446655440000").is_ok());
        assert!(validate_uuid("").is_err());
        assert!(validate_uuid("not-a-uuid").is_err());
    }
}

//! # Repositories
//!
//! One repository per aggregate, each holding a clone of the pool.
//!
//! ```text
//! CustomerRepository      customers
//! InvoiceRepository       invoices + invoice_items (saved as one unit)
//! UsageRepository         usage_records
//! SubscriptionRepository  subscriptions
//! PaymentOrderRepository  payment_orders
//! ```
//!
//! ## Decimal Columns
//! SQLite has no decimal type. Amounts, weights and rates are written with
//! `Decimal::to_string()` and parsed back here; a value that fails to parse
//! surfaces as [`DbError::CorruptValue`] rather than a silent zero.

pub mod customer;
pub mod invoice;
pub mod payment_order;
pub mod subscription;
pub mod usage;

use std::str::FromStr;

use kanak_core::{GstRate, Money};
use rust_decimal::Decimal;

use crate::error::{DbError, DbResult};

pub(crate) fn parse_decimal(entity: &str, field: &str, raw: &str) -> DbResult<Decimal> {
    Decimal::from_str(raw).map_err(|_| DbError::corrupt(entity, field, raw))
}

pub(crate) fn parse_money(entity: &str, field: &str, raw: &str) -> DbResult<Money> {
    parse_decimal(entity, field, raw).map(Money::new)
}

pub(crate) fn parse_rate(entity: &str, field: &str, raw: &str) -> DbResult<GstRate> {
    parse_decimal(entity, field, raw).map(GstRate::from_percentage)
}

pub(crate) fn parse_opt_decimal(
    entity: &str,
    field: &str,
    raw: Option<&str>,
) -> DbResult<Option<Decimal>> {
    raw.map(|r| parse_decimal(entity, field, r)).transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_parse_round_trip_keeps_scale() {
        let stored = Money::new(dec!(862.50)).amount().to_string();
        assert_eq!(stored, "862.50");
        assert_eq!(
            parse_money("InvoiceItem", "cgst_amount", &stored).unwrap(),
            Money::new(dec!(862.5))
        );
    }

    #[test]
    fn test_corrupt_value() {
        let err = parse_rate("InvoiceItem", "cgst_rate", "one point five").unwrap_err();
        assert!(matches!(err, DbError::CorruptValue { .. }));
        assert_eq!(parse_opt_decimal("InvoiceItem", "weight_in_grams", None).unwrap(), None);
    }
}

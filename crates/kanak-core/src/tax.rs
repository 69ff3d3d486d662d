//! # GST Engine
//!
//! Pure functions that price jewelry line items and split GST into its
//! central (CGST) and state (SGST) halves.
//!
//! ## Calculation Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   ItemInput ──► TaxSettings::build_item                                 │
//! │                      │  (fills missing rates with the defaults)         │
//! │                      ▼                                                  │
//! │   compute_item_price(weight, rate, making)                              │
//! │        weight × rate + making      or the entered price                 │
//! │                      │                                                  │
//! │                      ▼                                                  │
//! │   compute_gst(price, cgst%, sgst%)                                      │
//! │        cgst = price × cgst% / 100                                       │
//! │        sgst = price × sgst% / 100                                       │
//! │        total = price + cgst + sgst                                      │
//! │                      │                                                  │
//! │                      ▼                                                  │
//! │   aggregate_invoice_totals(items)                                       │
//! │        subtotal, cgst_total, sgst_total, grand_total                    │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Nothing here rounds or clamps. Amounts stay exact until they are
//! displayed (see [`Money::round_to_paise`]). Zero or negative inputs are
//! computed arithmetically.
//!
//! `quantity` is informational and does not scale the price: for weighed
//! jewelry the weight already describes the whole line.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;
use crate::types::{GstRate, InvoiceItem};

// =============================================================================
// Tax Settings
// =============================================================================

/// Default GST rates applied to new line items.
///
/// Passed explicitly to whoever builds items; there is no process-wide
/// setting. Gold jewelry attracts 3% GST, split evenly between CGST and SGST.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TaxSettings {
    #[serde(default = "default_half_rate")]
    pub default_cgst_rate: GstRate,
    #[serde(default = "default_half_rate")]
    pub default_sgst_rate: GstRate,
}

fn default_half_rate() -> GstRate {
    GstRate::from_bps(150)
}

impl Default for TaxSettings {
    fn default() -> Self {
        TaxSettings {
            default_cgst_rate: default_half_rate(),
            default_sgst_rate: default_half_rate(),
        }
    }
}

/// Line item data as entered by the vendor.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ItemInput {
    pub name: String,
    #[serde(default)]
    pub hsn_code: Option<String>,
    #[serde(default = "default_quantity")]
    pub quantity: i64,
    #[serde(default)]
    #[ts(as = "Option<String>")]
    pub weight_in_grams: Option<Decimal>,
    #[serde(default)]
    pub rate_per_gram: Option<Money>,
    /// Used only when weight or rate is missing.
    #[serde(default)]
    pub price: Option<Money>,
    #[serde(default)]
    pub making_charges: Option<Money>,
    #[serde(default)]
    pub cgst_rate: Option<GstRate>,
    #[serde(default)]
    pub sgst_rate: Option<GstRate>,
}

fn default_quantity() -> i64 {
    1
}

impl TaxSettings {
    /// Builds a fully priced line item with a fresh id.
    ///
    /// ## Example
    /// ```rust
    /// use kanak_core::money::Money;
    /// use kanak_core::tax::{ItemInput, TaxSettings};
    /// use rust_decimal::Decimal;
    ///
    /// let item = TaxSettings::default().build_item(ItemInput {
    ///     name: "22K Gold Chain".into(),
    ///     quantity: 1,
    ///     weight_in_grams: Some(Decimal::from(10)),
    ///     rate_per_gram: Some(Money::from_rupees(5500)),
    ///     making_charges: Some(Money::from_rupees(2500)),
    ///     ..Default::default()
    /// });
    /// assert_eq!(item.price, Money::from_rupees(57_500));
    /// assert_eq!(item.total_amount, Money::from_rupees(59_225));
    /// ```
    pub fn build_item(&self, input: ItemInput) -> InvoiceItem {
        let making_charges = input.making_charges.unwrap_or_default();
        let price = resolve_item_price(
            input.weight_in_grams,
            input.rate_per_gram,
            making_charges,
            input.price.unwrap_or_default(),
        );
        let cgst_rate = input.cgst_rate.unwrap_or(self.default_cgst_rate);
        let sgst_rate = input.sgst_rate.unwrap_or(self.default_sgst_rate);
        let gst = compute_gst(price, cgst_rate, sgst_rate);

        InvoiceItem {
            id: uuid::Uuid::new_v4().to_string(),
            name: input.name,
            hsn_code: input.hsn_code,
            quantity: input.quantity,
            weight_in_grams: input.weight_in_grams,
            rate_per_gram: input.rate_per_gram,
            price,
            making_charges,
            cgst_rate,
            sgst_rate,
            cgst_amount: gst.cgst_amount,
            sgst_amount: gst.sgst_amount,
            total_amount: gst.total_amount,
        }
    }
}

// =============================================================================
// Item Price
// =============================================================================

/// Computes `weight × rate + making` when both weight and rate are present.
///
/// Returns `None` otherwise; the caller keeps whatever price was entered.
pub fn compute_item_price(
    weight_in_grams: Option<Decimal>,
    rate_per_gram: Option<Money>,
    making_charges: Money,
) -> Option<Money> {
    match (weight_in_grams, rate_per_gram) {
        (Some(weight), Some(rate)) => Some(rate.multiply(weight) + making_charges),
        _ => None,
    }
}

/// The computed price, or `entered` unchanged when it cannot be computed.
pub fn resolve_item_price(
    weight_in_grams: Option<Decimal>,
    rate_per_gram: Option<Money>,
    making_charges: Money,
    entered: Money,
) -> Money {
    compute_item_price(weight_in_grams, rate_per_gram, making_charges).unwrap_or(entered)
}

// =============================================================================
// GST Split
// =============================================================================

/// Tax amounts for one taxable value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct GstBreakdown {
    pub cgst_amount: Money,
    pub sgst_amount: Money,
    pub total_amount: Money,
}

/// Splits GST on `price` into CGST and SGST.
///
/// Rates are percentages (1.5 = 1.5%).
pub fn compute_gst(price: Money, cgst_rate: GstRate, sgst_rate: GstRate) -> GstBreakdown {
    let cgst_amount = price.apply_rate(cgst_rate);
    let sgst_amount = price.apply_rate(sgst_rate);
    GstBreakdown {
        cgst_amount,
        sgst_amount,
        total_amount: price + cgst_amount + sgst_amount,
    }
}

// =============================================================================
// Invoice Totals
// =============================================================================

/// Invoice-level sums over all line items.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct InvoiceTotals {
    pub subtotal: Money,
    pub cgst_total: Money,
    pub sgst_total: Money,
    pub grand_total: Money,
}

/// Sums item prices and taxes in list order. An empty list yields zeros.
pub fn aggregate_invoice_totals(items: &[InvoiceItem]) -> InvoiceTotals {
    let subtotal: Money = items.iter().map(|i| i.price).sum();
    let cgst_total: Money = items.iter().map(|i| i.cgst_amount).sum();
    let sgst_total: Money = items.iter().map(|i| i.sgst_amount).sum();

    InvoiceTotals {
        subtotal,
        cgst_total,
        sgst_total,
        grand_total: subtotal + cgst_total + sgst_total,
    }
}

// =============================================================================
// Item Consistency
// =============================================================================

impl InvoiceItem {
    /// Re-derives price and tax amounts from the item's own inputs.
    pub fn recompute(&mut self) {
        self.price = resolve_item_price(
            self.weight_in_grams,
            self.rate_per_gram,
            self.making_charges,
            self.price,
        );
        let gst = compute_gst(self.price, self.cgst_rate, self.sgst_rate);
        self.cgst_amount = gst.cgst_amount;
        self.sgst_amount = gst.sgst_amount;
        self.total_amount = gst.total_amount;
    }

    /// Whether the stored amounts match what [`InvoiceItem::recompute`] would produce.
    pub fn is_consistent(&self) -> bool {
        let mut expected = self.clone();
        expected.recompute();
        expected == *self
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

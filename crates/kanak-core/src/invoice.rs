//! # Invoice Lifecycle
//!
//! Item mutation, totals maintenance and the state machine of an [`Invoice`].
//!
//! ## State Machine
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   ┌───────┐  generate()   ┌──────┐  mark_paid()  ┌──────┐              │
//! │   │ Draft │──────────────►│ Sent │──────────────►│ Paid │              │
//! │   └───┬───┘  (validated)  └──┬───┘               └──────┘              │
//! │       │                      │                       ▲                  │
//! │       ├──────────────────────┼──── mark_paid() ──────┘                  │
//! │       │                      │                                          │
//! │       │      cancel()        ▼                                          │
//! │       └─────────────────►┌───────────┐                                  │
//! │                          │ Cancelled │                                  │
//! │                          └───────────┘                                  │
//! │                                                                         │
//! │   Items may change while Draft or Sent. Every change recomputes the    │
//! │   item and then the invoice totals.                                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, NaiveDate, Utc};

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::tax::{aggregate_invoice_totals, InvoiceTotals};
use crate::types::{Customer, Invoice, InvoiceItem, InvoiceStatus, PaymentMethod};
use crate::MAX_INVOICE_ITEMS;

/// Formats a sequential invoice number, e.g. `INV-2026-0001`.
pub fn format_invoice_number(prefix: &str, year: i32, sequence: i64) -> String {
    format!("{}-{}-{:04}", prefix, year, sequence)
}

impl Invoice {
    /// Creates an empty draft invoice for `customer`.
    pub fn new_draft(
        account_id: impl Into<String>,
        invoice_number: impl Into<String>,
        customer: Customer,
        date: NaiveDate,
        now: DateTime<Utc>,
    ) -> Self {
        Invoice {
            id: uuid::Uuid::new_v4().to_string(),
            account_id: account_id.into(),
            invoice_number: invoice_number.into(),
            date,
            due_date: None,
            customer,
            items: Vec::new(),
            subtotal: Money::zero(),
            cgst_total: Money::zero(),
            sgst_total: Money::zero(),
            grand_total: Money::zero(),
            status: InvoiceStatus::Draft,
            paid_amount: Money::zero(),
            paid_date: None,
            payment_method: None,
            notes: None,
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    // =========================================================================
    // Items
    // =========================================================================

    /// Whether items and customer details may still change.
    pub fn is_editable(&self) -> bool {
        !self.status.is_terminal()
    }

    fn ensure_editable(&self, operation: &str) -> CoreResult<()> {
        if self.is_editable() {
            Ok(())
        } else {
            Err(self.invalid_status(operation))
        }
    }

    fn invalid_status(&self, operation: &str) -> CoreError {
        CoreError::InvalidInvoiceStatus {
            invoice_id: self.id.clone(),
            current_status: self.status.to_string(),
            operation: operation.to_string(),
        }
    }

    /// Appends an item and recomputes totals.
    pub fn add_item(&mut self, mut item: InvoiceItem) -> CoreResult<()> {
        self.ensure_editable("add items")?;
        if self.items.len() >= MAX_INVOICE_ITEMS {
            return Err(CoreError::TooManyItems {
                max: MAX_INVOICE_ITEMS,
            });
        }
        item.recompute();
        self.items.push(item);
        self.recompute_totals();
        Ok(())
    }

    /// Replaces the item with `item_id`, keeping its id and position.
    pub fn update_item(&mut self, item_id: &str, mut item: InvoiceItem) -> CoreResult<()> {
        self.ensure_editable("update items")?;
        let slot = self
            .items
            .iter_mut()
            .find(|i| i.id == item_id)
            .ok_or_else(|| CoreError::ItemNotFound(item_id.to_string()))?;
        item.id = item_id.to_string();
        item.recompute();
        *slot = item;
        self.recompute_totals();
        Ok(())
    }

    /// Removes the item with `item_id` and recomputes totals.
    pub fn remove_item(&mut self, item_id: &str) -> CoreResult<InvoiceItem> {
        self.ensure_editable("remove items")?;
        let index = self
            .items
            .iter()
            .position(|i| i.id == item_id)
            .ok_or_else(|| CoreError::ItemNotFound(item_id.to_string()))?;
        let removed = self.items.remove(index);
        self.recompute_totals();
        Ok(removed)
    }

    /// Replaces the whole item list.
    pub fn replace_items(&mut self, items: Vec<InvoiceItem>) -> CoreResult<()> {
        self.ensure_editable("replace items")?;
        if items.len() > MAX_INVOICE_ITEMS {
            return Err(CoreError::TooManyItems {
                max: MAX_INVOICE_ITEMS,
            });
        }
        self.items = items;
        self.recompute_totals();
        Ok(())
    }

    /// Re-derives every item, then the invoice totals from the items.
    pub fn recompute_totals(&mut self) {
        for item in &mut self.items {
            item.recompute();
        }
        let totals = aggregate_invoice_totals(&self.items);
        self.subtotal = totals.subtotal;
        self.cgst_total = totals.cgst_total;
        self.sgst_total = totals.sgst_total;
        self.grand_total = totals.grand_total;
    }

    /// Current totals as a value.
    pub fn totals(&self) -> InvoiceTotals {
        InvoiceTotals {
            subtotal: self.subtotal,
            cgst_total: self.cgst_total,
            sgst_total: self.sgst_total,
            grand_total: self.grand_total,
        }
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Checks the invoice carries everything required to be issued.
    pub fn validate_for_sending(&self) -> Result<(), ValidationError> {
        let required = [
            ("customer.name", &self.customer.name),
            ("customer.address", &self.customer.address),
            ("customer.phone", &self.customer.phone),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(ValidationError::Required {
                    field: field.to_string(),
                });
            }
        }
        if self.items.is_empty() {
            return Err(ValidationError::NoItems {
                field: "items".to_string(),
            });
        }
        Ok(())
    }

    /// Issues a draft invoice (draft → sent).
    ///
    /// On validation failure the status is left at draft.
    pub fn generate(&mut self, now: DateTime<Utc>) -> CoreResult<()> {
        if self.status != InvoiceStatus::Draft {
            return Err(self.invalid_status("generate"));
        }
        self.validate_for_sending()?;
        self.recompute_totals();
        self.status = InvoiceStatus::Sent;
        self.updated_at = now;
        Ok(())
    }

    /// Records full settlement (draft or sent → paid).
    ///
    /// `amount` defaults to the grand total.
    pub fn mark_paid(
        &mut self,
        method: PaymentMethod,
        amount: Option<Money>,
        now: DateTime<Utc>,
    ) -> CoreResult<()> {
        self.ensure_editable("mark as paid")?;
        self.status = InvoiceStatus::Paid;
        self.paid_amount = amount.unwrap_or(self.grand_total);
        self.paid_date = Some(now);
        self.payment_method = Some(method);
        self.updated_at = now;
        Ok(())
    }

    /// Voids the invoice (draft or sent → cancelled).
    pub fn cancel(&mut self, now: DateTime<Utc>) -> CoreResult<()> {
        self.ensure_editable("cancel")?;
        self.status = InvoiceStatus::Cancelled;
        self.updated_at = now;
        Ok(())
    }

    /// A sent invoice whose due date has passed.
    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        self.status == InvoiceStatus::Sent && self.due_date.is_some_and(|due| due < today)
    }

    /// Amount still owed: zero for drafts and cancelled invoices.
    pub fn balance_due(&self) -> Money {
        match self.status {
            InvoiceStatus::Sent | InvoiceStatus::Paid => self.grand_total - self.paid_amount,
            InvoiceStatus::Draft | InvoiceStatus::Cancelled => Money::zero(),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tax::{ItemInput, TaxSettings};
    use rust_decimal_macros::dec;

    fn customer() -> Customer {
        Customer::new("acct", "Meera Iyer", "12 Temple Street, Madurai", "9840012345", Utc::now())
    }

    fn draft() -> Invoice {
        Invoice::new_draft(
            "acct",
            format_invoice_number("INV", 2026, 1),
            customer(),
            NaiveDate::from_ymd_opt(2026, 3, 14).unwrap(),
            Utc::now(),
        )
    }

    fn chain() -> InvoiceItem {
        TaxSettings::default().build_item(ItemInput {
            name: "22K Gold Chain".to_string(),
            quantity: 1,
            weight_in_grams: Some(dec!(10)),
            rate_per_gram: Some(Money::from_rupees(5500)),
            making_charges: Some(Money::from_rupees(2500)),
            ..Default::default()
        })
    }

    fn necklace() -> InvoiceItem {
        TaxSettings::default().build_item(ItemInput {
            name: "Bridal Necklace".to_string(),
            quantity: 1,
            price: Some(Money::from_rupees(125_000)),
            ..Default::default()
        })
    }

    #[test]
    fn test_invoice_number_format() {
        assert_eq!(format_invoice_number("INV", 2026, 1), "INV-2026-0001");
        assert_eq!(format_invoice_number("KJ", 2026, 12345), "KJ-2026-12345");
    }

    #[test]
    fn test_add_items_recomputes_totals() {
        let mut invoice = draft();
        invoice.add_item(chain()).unwrap();
        invoice.add_item(necklace()).unwrap();

        assert_eq!(invoice.subtotal, Money::from_rupees(182_500));
        assert_eq!(invoice.cgst_total, Money::new(dec!(2737.5)));
        assert_eq!(invoice.sgst_total, Money::new(dec!(2737.5)));
        assert_eq!(invoice.grand_total, Money::from_rupees(187_975));

        let item_sum: Money = invoice.items.iter().map(|i| i.total_amount).sum();
        assert_eq!(invoice.grand_total, item_sum);
    }

    #[test]
    fn test_update_and_remove_item() {
        let mut invoice = draft();
        invoice.add_item(chain()).unwrap();
        let id = invoice.items[0].id.clone();

        invoice.update_item(&id, necklace()).unwrap();
        assert_eq!(invoice.items[0].id, id);
        assert_eq!(invoice.subtotal, Money::from_rupees(125_000));

        invoice.remove_item(&id).unwrap();
        assert_eq!(invoice.totals(), InvoiceTotals::default());

        let err = invoice.remove_item(&id).unwrap_err();
        assert!(matches!(err, CoreError::ItemNotFound(_)));
    }

    #[test]
    fn test_recompute_twice_is_stable() {
        let mut invoice = draft();
        invoice.replace_items(vec![chain(), necklace()]).unwrap();
        let first = invoice.totals();
        invoice.recompute_totals();
        assert_eq!(invoice.totals(), first);
    }

    #[test]
    fn test_send_without_address_stays_draft() {
        let mut invoice = draft();
        invoice.customer.address = "   ".to_string();
        invoice.add_item(chain()).unwrap();

        let err = invoice.generate(Utc::now()).unwrap_err();
        match err {
            CoreError::Validation(v) => assert_eq!(v.field(), "customer.address"),
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(invoice.status, InvoiceStatus::Draft);
    }

    #[test]
    fn test_send_without_items_fails() {
        let mut invoice = draft();
        let err = invoice.generate(Utc::now()).unwrap_err();
        assert!(matches!(
            err,
            CoreError::Validation(ValidationError::NoItems { .. })
        ));
        assert_eq!(invoice.status, InvoiceStatus::Draft);
    }

    #[test]
    fn test_full_lifecycle() {
        let mut invoice = draft();
        invoice.add_item(chain()).unwrap();
        invoice.generate(Utc::now()).unwrap();
        assert_eq!(invoice.status, InvoiceStatus::Sent);
        assert_eq!(invoice.balance_due(), Money::from_rupees(59_225));

        // Sent invoices can still be corrected
        invoice.add_item(necklace()).unwrap();

        invoice.mark_paid(PaymentMethod::Upi, None, Utc::now()).unwrap();
        assert_eq!(invoice.status, InvoiceStatus::Paid);
        assert_eq!(invoice.paid_amount, invoice.grand_total);
        assert!(invoice.paid_date.is_some());
        assert!(invoice.balance_due().is_zero());

        let err = invoice.add_item(chain()).unwrap_err();
        assert!(matches!(err, CoreError::InvalidInvoiceStatus { .. }));
        assert!(invoice.cancel(Utc::now()).is_err());
    }

    #[test]
    fn test_generate_twice_rejected() {
        let mut invoice = draft();
        invoice.add_item(chain()).unwrap();
        invoice.generate(Utc::now()).unwrap();
        assert!(matches!(
            invoice.generate(Utc::now()),
            Err(CoreError::InvalidInvoiceStatus { .. })
        ));
    }

    #[test]
    fn test_draft_can_be_paid_directly() {
        let mut invoice = draft();
        invoice.add_item(chain()).unwrap();
        invoice
            .mark_paid(PaymentMethod::Cash, Some(Money::from_rupees(59_000)), Utc::now())
            .unwrap();
        assert_eq!(invoice.paid_amount, Money::from_rupees(59_000));
        assert_eq!(invoice.balance_due(), Money::from_rupees(225));
    }

    #[test]
    fn test_cancelled_invoice_rejects_edits() {
        let mut invoice = draft();
        invoice.cancel(Utc::now()).unwrap();
        assert!(!invoice.is_editable());
        assert!(invoice.replace_items(vec![chain()]).is_err());
        assert!(invoice.mark_paid(PaymentMethod::Cash, None, Utc::now()).is_err());
    }

    #[test]
    fn test_overdue() {
        let mut invoice = draft();
        invoice.add_item(chain()).unwrap();
        invoice.due_date = NaiveDate::from_ymd_opt(2026, 4, 1);
        let after = NaiveDate::from_ymd_opt(2026, 4, 2).unwrap();

        assert!(!invoice.is_overdue(after), "drafts are never overdue");
        invoice.generate(Utc::now()).unwrap();
        assert!(invoice.is_overdue(after));
        assert!(!invoice.is_overdue(NaiveDate::from_ymd_opt(2026, 4, 1).unwrap()));
    }

    #[test]
    fn test_too_many_items() {
        let mut invoice = draft();
        for _ in 0..MAX_INVOICE_ITEMS {
            invoice.add_item(necklace()).unwrap();
        }
        assert!(matches!(
            invoice.add_item(necklace()),
            Err(CoreError::TooManyItems { .. })
        ));
    }
}

//! # Dashboard Summary
//!
//! Aggregates a set of invoices into the numbers shown on the vendor's
//! dashboard.
//!
//! ```text
//!   billed      = Σ grand_total   (sent + paid)
//!   collected   = Σ paid_amount   (paid)
//!   outstanding = Σ balance_due   (sent)
//!   tax         = Σ cgst + sgst   (sent + paid)
//! ```
//! Drafts and cancelled invoices are counted but carry no money.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;
use crate::types::{Invoice, InvoiceStatus};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSummary {
    pub total_invoices: usize,
    pub draft_count: usize,
    pub sent_count: usize,
    pub paid_count: usize,
    pub cancelled_count: usize,
    pub overdue_count: usize,
    pub billed_total: Money,
    pub collected_total: Money,
    pub outstanding_total: Money,
    pub cgst_collected: Money,
    pub sgst_collected: Money,
}

/// Summarizes `invoices` as of `today`.
pub fn summarize(invoices: &[Invoice], today: NaiveDate) -> DashboardSummary {
    let mut summary = DashboardSummary {
        total_invoices: invoices.len(),
        ..Default::default()
    };

    for invoice in invoices {
        match invoice.status {
            InvoiceStatus::Draft => summary.draft_count += 1,
            InvoiceStatus::Sent => {
                summary.sent_count += 1;
                summary.outstanding_total += invoice.balance_due();
            }
            InvoiceStatus::Paid => {
                summary.paid_count += 1;
                summary.collected_total += invoice.paid_amount;
            }
            InvoiceStatus::Cancelled => summary.cancelled_count += 1,
        }

        if matches!(invoice.status, InvoiceStatus::Sent | InvoiceStatus::Paid) {
            summary.billed_total += invoice.grand_total;
            summary.cgst_collected += invoice.cgst_total;
            summary.sgst_collected += invoice.sgst_total;
        }

        if invoice.is_overdue(today) {
            summary.overdue_count += 1;
        }
    }

    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::invoice::format_invoice_number;
    use crate::tax::{ItemInput, TaxSettings};
    use crate::types::{Customer, PaymentMethod};
    use chrono::Utc;

    fn invoice(seq: i64, price: i64) -> Invoice {
        let customer = Customer::new("acct", "Ravi", "Anna Nagar", "9000000001", Utc::now());
        let mut invoice = Invoice::new_draft(
            "acct",
            format_invoice_number("INV", 2026, seq),
            customer,
            NaiveDate::from_ymd_opt(2026, 5, 1).unwrap(),
            Utc::now(),
        );
        invoice
            .add_item(TaxSettings::default().build_item(ItemInput {
                name: "Gold Coin".to_string(),
                quantity: 1,
                price: Some(Money::from_rupees(price)),
                ..Default::default()
            }))
            .unwrap();
        invoice
    }

    #[test]
    fn test_summary() {
        let today = NaiveDate::from_ymd_opt(2026, 6, 1).unwrap();

        let draft = invoice(1, 1000);

        let mut overdue = invoice(2, 10_000);
        overdue.due_date = NaiveDate::from_ymd_opt(2026, 5, 15);
        overdue.generate(Utc::now()).unwrap();

        let mut paid = invoice(3, 20_000);
        paid.mark_paid(PaymentMethod::Upi, None, Utc::now()).unwrap();

        let mut cancelled = invoice(4, 5000);
        cancelled.cancel(Utc::now()).unwrap();

        let summary = summarize(&[draft, overdue, paid, cancelled], today);

        assert_eq!(summary.total_invoices, 4);
        assert_eq!(
            (summary.draft_count, summary.sent_count, summary.paid_count, summary.cancelled_count),
            (1, 1, 1, 1)
        );
        assert_eq!(summary.overdue_count, 1);
        assert_eq!(summary.billed_total, Money::from_rupees(30_900));
        assert_eq!(summary.collected_total, Money::from_rupees(20_600));
        assert_eq!(summary.outstanding_total, Money::from_rupees(10_300));
        assert_eq!(summary.cgst_collected, Money::from_rupees(450));
    }

    #[test]
    fn test_empty_summary() {
        let summary = summarize(&[], NaiveDate::from_ymd_opt(2026, 1, 1).unwrap());
        assert_eq!(summary, DashboardSummary::default());
    }
}

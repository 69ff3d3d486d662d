//! # Invoice Repository
//!
//! Database operations for invoices and their line items.
//!
//! ## Save Protocol
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  save(&mut invoice)            one transaction                          │
//! │                                                                         │
//! │  1. recompute items and totals (persisted rows always satisfy the      │
//! │     GST invariant)                                                      │
//! │  2. upsert the embedded customer                                        │
//! │  3. version == 0 ─► INSERT with version 1                               │
//! │     version == n ─► UPDATE ... WHERE version = n  (→ n + 1)             │
//! │                     0 rows: StaleVersion if the row exists, else        │
//! │                     NotFound                                            │
//! │  4. DELETE all item rows, INSERT the current list in order              │
//! │  5. COMMIT                                                              │
//! │                                                                         │
//! │  Any failure rolls back every step.                                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::repository::customer::upsert_customer;
use crate::repository::{parse_money, parse_opt_decimal, parse_rate};
use kanak_core::invoice::format_invoice_number;
use kanak_core::{Customer, Invoice, InvoiceItem, InvoiceStatus, PaymentMethod};

/// Filters for [`InvoiceRepository::list`].
#[derive(Debug, Clone, Default)]
pub struct InvoiceFilter {
    pub status: Option<InvoiceStatus>,
    pub customer_id: Option<String>,
    /// Inclusive lower bound on the invoice date.
    pub from_date: Option<NaiveDate>,
    /// Inclusive upper bound on the invoice date.
    pub to_date: Option<NaiveDate>,
    pub limit: Option<i64>,
}

// =============================================================================
// Row Types
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct InvoiceRow {
    id: String,
    account_id: String,
    invoice_number: String,
    invoice_date: NaiveDate,
    due_date: Option<NaiveDate>,
    subtotal: String,
    cgst_total: String,
    sgst_total: String,
    grand_total: String,
    status: InvoiceStatus,
    paid_amount: String,
    paid_date: Option<DateTime<Utc>>,
    payment_method: Option<PaymentMethod>,
    notes: Option<String>,
    version: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    customer_id: String,
    customer_account_id: String,
    customer_name: String,
    customer_address: String,
    customer_phone: String,
    customer_email: Option<String>,
    customer_gstin: Option<String>,
    customer_created_at: DateTime<Utc>,
    customer_updated_at: DateTime<Utc>,
}

impl InvoiceRow {
    fn into_invoice(self, items: Vec<InvoiceItem>) -> DbResult<Invoice> {
        const E: &str = "Invoice";
        Ok(Invoice {
            subtotal: parse_money(E, "subtotal", &self.subtotal)?,
            cgst_total: parse_money(E, "cgst_total", &self.cgst_total)?,
            sgst_total: parse_money(E, "sgst_total", &self.sgst_total)?,
            grand_total: parse_money(E, "grand_total", &self.grand_total)?,
            paid_amount: parse_money(E, "paid_amount", &self.paid_amount)?,
            id: self.id,
            account_id: self.account_id,
            invoice_number: self.invoice_number,
            date: self.invoice_date,
            due_date: self.due_date,
            customer: Customer {
                id: self.customer_id,
                account_id: self.customer_account_id,
                name: self.customer_name,
                address: self.customer_address,
                phone: self.customer_phone,
                email: self.customer_email,
                gstin: self.customer_gstin,
                created_at: self.customer_created_at,
                updated_at: self.customer_updated_at,
            },
            items,
            status: self.status,
            paid_date: self.paid_date,
            payment_method: self.payment_method,
            notes: self.notes,
            version: self.version,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ItemRow {
    id: String,
    name: String,
    hsn_code: Option<String>,
    quantity: i64,
    weight_in_grams: Option<String>,
    rate_per_gram: Option<String>,
    price: String,
    making_charges: String,
    cgst_rate: String,
    sgst_rate: String,
    cgst_amount: String,
    sgst_amount: String,
    total_amount: String,
}

impl TryFrom<ItemRow> for InvoiceItem {
    type Error = DbError;

    fn try_from(row: ItemRow) -> DbResult<Self> {
        const E: &str = "InvoiceItem";
        Ok(InvoiceItem {
            weight_in_grams: parse_opt_decimal(
                E,
                "weight_in_grams",
                row.weight_in_grams.as_deref(),
            )?,
            rate_per_gram: row
                .rate_per_gram
                .as_deref()
                .map(|r| parse_money(E, "rate_per_gram", r))
                .transpose()?,
            price: parse_money(E, "price", &row.price)?,
            making_charges: parse_money(E, "making_charges", &row.making_charges)?,
            cgst_rate: parse_rate(E, "cgst_rate", &row.cgst_rate)?,
            sgst_rate: parse_rate(E, "sgst_rate", &row.sgst_rate)?,
            cgst_amount: parse_money(E, "cgst_amount", &row.cgst_amount)?,
            sgst_amount: parse_money(E, "sgst_amount", &row.sgst_amount)?,
            total_amount: parse_money(E, "total_amount", &row.total_amount)?,
            id: row.id,
            name: row.name,
            hsn_code: row.hsn_code,
            quantity: row.quantity,
        })
    }
}

const SELECT_INVOICE: &str = r#"
    SELECT
        i.id, i.account_id, i.invoice_number, i.invoice_date, i.due_date,
        i.subtotal, i.cgst_total, i.sgst_total, i.grand_total,
        i.status, i.paid_amount, i.paid_date, i.payment_method, i.notes,
        i.version, i.created_at, i.updated_at,
        c.id AS customer_id,
        c.account_id AS customer_account_id,
        c.name AS customer_name,
        c.address AS customer_address,
        c.phone AS customer_phone,
        c.email AS customer_email,
        c.gstin AS customer_gstin,
        c.created_at AS customer_created_at,
        c.updated_at AS customer_updated_at
    FROM invoices i
    JOIN customers c ON c.id = i.customer_id
"#;

async fn load_items(conn: &mut SqliteConnection, invoice_id: &str) -> DbResult<Vec<InvoiceItem>> {
    let rows: Vec<ItemRow> = sqlx::query_as(
        r#"
        SELECT
            id, name, hsn_code, quantity, weight_in_grams, rate_per_gram,
            price, making_charges, cgst_rate, sgst_rate,
            cgst_amount, sgst_amount, total_amount
        FROM invoice_items
        WHERE invoice_id = ?1
        ORDER BY position
        "#,
    )
    .bind(invoice_id)
    .fetch_all(&mut *conn)
    .await?;

    rows.into_iter().map(InvoiceItem::try_from).collect()
}

/// Replaces all item rows of an invoice with `items`, keeping list order.
async fn replace_items(
    conn: &mut SqliteConnection,
    invoice_id: &str,
    items: &[InvoiceItem],
) -> DbResult<()> {
    sqlx::query("DELETE FROM invoice_items WHERE invoice_id = ?1")
        .bind(invoice_id)
        .execute(&mut *conn)
        .await?;

    for (position, item) in items.iter().enumerate() {
        sqlx::query(
            r#"
            INSERT INTO invoice_items (
                id, invoice_id, position, name, hsn_code, quantity,
                weight_in_grams, rate_per_gram, price, making_charges,
                cgst_rate, sgst_rate, cgst_amount, sgst_amount, total_amount
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)
            "#,
        )
        .bind(&item.id)
        .bind(invoice_id)
        .bind(i64::try_from(position).unwrap_or(i64::MAX))
        .bind(&item.name)
        .bind(&item.hsn_code)
        .bind(item.quantity)
        .bind(item.weight_in_grams.map(|w| w.to_string()))
        .bind(item.rate_per_gram.map(|r| r.amount().to_string()))
        .bind(item.price.amount().to_string())
        .bind(item.making_charges.amount().to_string())
        .bind(item.cgst_rate.percentage().to_string())
        .bind(item.sgst_rate.percentage().to_string())
        .bind(item.cgst_amount.amount().to_string())
        .bind(item.sgst_amount.amount().to_string())
        .bind(item.total_amount.amount().to_string())
        .execute(&mut *conn)
        .await?;
    }

    Ok(())
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for invoice database operations.
#[derive(Debug, Clone)]
pub struct InvoiceRepository {
    pool: SqlitePool,
}

impl InvoiceRepository {
    /// Creates a new InvoiceRepository.
    pub fn new(pool: SqlitePool) -> Self {
        InvoiceRepository { pool }
    }

    /// Gets an invoice with its customer and items.
    pub async fn get_by_id(&self, account_id: &str, id: &str) -> DbResult<Option<Invoice>> {
        let mut conn = self.pool.acquire().await?;

        let sql = format!("{SELECT_INVOICE} WHERE i.account_id = ?1 AND i.id = ?2");
        let row: Option<InvoiceRow> = sqlx::query_as(&sql)
            .bind(account_id)
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;

        match row {
            Some(row) => {
                let items = load_items(&mut conn, &row.id).await?;
                Ok(Some(row.into_invoice(items)?))
            }
            None => Ok(None),
        }
    }

    /// Lists invoices, newest first.
    pub async fn list(&self, account_id: &str, filter: &InvoiceFilter) -> DbResult<Vec<Invoice>> {
        let mut conn = self.pool.acquire().await?;

        let sql = format!(
            "{SELECT_INVOICE}
             WHERE i.account_id = ?1
               AND (?2 IS NULL OR i.status = ?2)
               AND (?3 IS NULL OR i.customer_id = ?3)
               AND (?4 IS NULL OR i.invoice_date >= ?4)
               AND (?5 IS NULL OR i.invoice_date <= ?5)
             ORDER BY i.invoice_date DESC, i.invoice_number DESC
             LIMIT ?6"
        );
        let rows: Vec<InvoiceRow> = sqlx::query_as(&sql)
            .bind(account_id)
            .bind(filter.status)
            .bind(&filter.customer_id)
            .bind(filter.from_date)
            .bind(filter.to_date)
            .bind(filter.limit.unwrap_or(-1))
            .fetch_all(&mut *conn)
            .await?;

        let mut invoices = Vec::with_capacity(rows.len());
        for row in rows {
            let items = load_items(&mut conn, &row.id).await?;
            invoices.push(row.into_invoice(items)?);
        }
        Ok(invoices)
    }

    /// Persists the invoice, its customer and its items atomically.
    ///
    /// Totals are recomputed first. On success `invoice.version` holds the
    /// new stored version.
    pub async fn save(&self, invoice: &mut Invoice) -> DbResult<()> {
        invoice.recompute_totals();
        let expected = invoice.version;
        let new_version = expected + 1;

        debug!(
            id = %invoice.id,
            number = %invoice.invoice_number,
            version = expected,
            items = invoice.items.len(),
            "Saving invoice"
        );

        let mut tx = self.pool.begin().await?;

        upsert_customer(&mut tx, &invoice.customer).await?;

        if expected == 0 {
            sqlx::query(
                r#"
                INSERT INTO invoices (
                    id, account_id, invoice_number, invoice_date, due_date, customer_id,
                    subtotal, cgst_total, sgst_total, grand_total,
                    status, paid_amount, paid_date, payment_method, notes,
                    version, created_at, updated_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18)
                "#,
            )
            .bind(&invoice.id)
            .bind(&invoice.account_id)
            .bind(&invoice.invoice_number)
            .bind(invoice.date)
            .bind(invoice.due_date)
            .bind(&invoice.customer.id)
            .bind(invoice.subtotal.amount().to_string())
            .bind(invoice.cgst_total.amount().to_string())
            .bind(invoice.sgst_total.amount().to_string())
            .bind(invoice.grand_total.amount().to_string())
            .bind(invoice.status)
            .bind(invoice.paid_amount.amount().to_string())
            .bind(invoice.paid_date)
            .bind(invoice.payment_method)
            .bind(&invoice.notes)
            .bind(new_version)
            .bind(invoice.created_at)
            .bind(invoice.updated_at)
            .execute(&mut *tx)
            .await?;
        } else {
            let result = sqlx::query(
                r#"
                UPDATE invoices SET
                    invoice_number = ?3,
                    invoice_date = ?4,
                    due_date = ?5,
                    customer_id = ?6,
                    subtotal = ?7,
                    cgst_total = ?8,
                    sgst_total = ?9,
                    grand_total = ?10,
                    status = ?11,
                    paid_amount = ?12,
                    paid_date = ?13,
                    payment_method = ?14,
                    notes = ?15,
                    version = ?16,
                    updated_at = ?17
                WHERE id = ?1 AND account_id = ?2 AND version = ?18
                "#,
            )
            .bind(&invoice.id)
            .bind(&invoice.account_id)
            .bind(&invoice.invoice_number)
            .bind(invoice.date)
            .bind(invoice.due_date)
            .bind(&invoice.customer.id)
            .bind(invoice.subtotal.amount().to_string())
            .bind(invoice.cgst_total.amount().to_string())
            .bind(invoice.sgst_total.amount().to_string())
            .bind(invoice.grand_total.amount().to_string())
            .bind(invoice.status)
            .bind(invoice.paid_amount.amount().to_string())
            .bind(invoice.paid_date)
            .bind(invoice.payment_method)
            .bind(&invoice.notes)
            .bind(new_version)
            .bind(invoice.updated_at)
            .bind(expected)
            .execute(&mut *tx)
            .await?;

            if result.rows_affected() == 0 {
                let exists: i64 = sqlx::query_scalar(
                    "SELECT COUNT(*) FROM invoices WHERE id = ?1 AND account_id = ?2",
                )
                .bind(&invoice.id)
                .bind(&invoice.account_id)
                .fetch_one(&mut *tx)
                .await?;

                return Err(if exists > 0 {
                    DbError::StaleVersion {
                        entity: "Invoice".to_string(),
                        id: invoice.id.clone(),
                        expected,
                    }
                } else {
                    DbError::not_found("Invoice", &invoice.id)
                });
            }
        }

        replace_items(&mut tx, &invoice.id, &invoice.items).await?;

        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        invoice.version = new_version;
        Ok(())
    }

    /// Deletes an invoice; its items go with it.
    pub async fn delete(&self, account_id: &str, id: &str) -> DbResult<()> {
        debug!(id = %id, "Deleting invoice");
        let result = sqlx::query("DELETE FROM invoices WHERE account_id = ?1 AND id = ?2")
            .bind(account_id)
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Invoice", id));
        }
        Ok(())
    }

    /// Next free number in the `<prefix>-<year>-<seq>` series for the account.
    pub async fn next_invoice_number(
        &self,
        account_id: &str,
        prefix: &str,
        date: NaiveDate,
    ) -> DbResult<String> {
        let series = format!("{}-{}-", prefix, date.year());
        let numbers: Vec<String> = sqlx::query_scalar(
            "SELECT invoice_number FROM invoices WHERE account_id = ?1 AND invoice_number LIKE ?2",
        )
        .bind(account_id)
        .bind(format!("{series}%"))
        .fetch_all(&self.pool)
        .await?;

        let last = numbers
            .iter()
            .filter_map(|n| n.strip_prefix(&series))
            .filter_map(|seq| seq.parse::<i64>().ok())
            .max()
            .unwrap_or(0);

        Ok(format_invoice_number(prefix, date.year(), last + 1))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};
    use kanak_core::{ItemInput, Money, TaxSettings};
    use rust_decimal_macros::dec;

    async fn db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, d).unwrap()
    }

    fn draft(number: &str, d: u32) -> Invoice {
        let customer = Customer::new(
            "acct",
            "Priya Nair",
            "8 Beach Road, Kochi",
            "9847011111",
            Utc::now(),
        );
        let mut invoice = Invoice::new_draft("acct", number, customer, date(d), Utc::now());
        invoice
            .add_item(TaxSettings::default().build_item(ItemInput {
                name: "22K Gold Chain".to_string(),
                hsn_code: Some("7113".to_string()),
                quantity: 1,
                weight_in_grams: Some(dec!(10)),
                rate_per_gram: Some(Money::from_rupees(5500)),
                making_charges: Some(Money::from_rupees(2500)),
                ..Default::default()
            }))
            .unwrap();
        invoice
    }

    #[tokio::test]
    async fn test_save_and_load_round_trip() {
        let db = db().await;
        let repo = db.invoices();

        let mut invoice = draft("INV-2026-0001", 1);
        invoice
            .add_item(TaxSettings::default().build_item(ItemInput {
                name: "Bridal Necklace".to_string(),
                quantity: 1,
                price: Some(Money::from_rupees(125_000)),
                ..Default::default()
            }))
            .unwrap();
        repo.save(&mut invoice).await.unwrap();
        assert_eq!(invoice.version, 1);

        let loaded = repo.get_by_id("acct", &invoice.id).await.unwrap().unwrap();
        assert_eq!(loaded.invoice_number, "INV-2026-0001");
        assert_eq!(loaded.customer.name, "Priya Nair");
        assert_eq!(loaded.status, InvoiceStatus::Draft);
        assert_eq!(loaded.version, 1);
        assert_eq!(loaded.items.len(), 2);
        assert_eq!(loaded.totals(), invoice.totals());
        assert_eq!(loaded.grand_total, Money::from_rupees(187_975));
        assert_eq!(loaded.items[0].name, "22K Gold Chain");
        assert_eq!(loaded.items[0].cgst_amount, Money::new(dec!(862.5)));
        assert!(loaded.items.iter().all(InvoiceItem::is_consistent));
    }

    #[tokio::test]
    async fn test_save_replaces_items() {
        let db = db().await;
        let repo = db.invoices();

        let mut invoice = draft("INV-2026-0001", 1);
        repo.save(&mut invoice).await.unwrap();

        let removed = invoice.items[0].id.clone();
        invoice.remove_item(&removed).unwrap();
        repo.save(&mut invoice).await.unwrap();

        let loaded = repo.get_by_id("acct", &invoice.id).await.unwrap().unwrap();
        assert!(loaded.items.is_empty());
        assert_eq!(loaded.grand_total, Money::zero());
        assert_eq!(loaded.version, 2);
    }

    #[tokio::test]
    async fn test_stale_version_rejected() {
        let db = db().await;
        let repo = db.invoices();

        let mut invoice = draft("INV-2026-0001", 1);
        repo.save(&mut invoice).await.unwrap();

        let mut tab_a = repo.get_by_id("acct", &invoice.id).await.unwrap().unwrap();
        let mut tab_b = tab_a.clone();

        tab_a.notes = Some("Hallmarked".to_string());
        repo.save(&mut tab_a).await.unwrap();

        tab_b.notes = Some("Overwrite".to_string());
        let err = repo.save(&mut tab_b).await.unwrap_err();
        assert!(matches!(err, DbError::StaleVersion { expected: 1, .. }));
        assert_eq!(tab_b.version, 1);

        let stored = repo.get_by_id("acct", &invoice.id).await.unwrap().unwrap();
        assert_eq!(stored.notes.as_deref(), Some("Hallmarked"));
    }

    #[tokio::test]
    async fn test_update_of_missing_invoice() {
        let db = db().await;
        let mut invoice = draft("INV-2026-0001", 1);
        invoice.version = 4;
        assert!(matches!(
            db.invoices().save(&mut invoice).await,
            Err(DbError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_duplicate_number_rolls_back() {
        let db = db().await;
        let repo = db.invoices();

        repo.save(&mut draft("INV-2026-0001", 1)).await.unwrap();
        let mut clash = draft("INV-2026-0001", 2);
        assert!(matches!(
            repo.save(&mut clash).await,
            Err(DbError::UniqueViolation { .. })
        ));

        // The customer upsert in the failed transaction was rolled back too
        assert!(db
            .customers()
            .get_by_id("acct", &clash.customer.id)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_list_filters() {
        let db = db().await;
        let repo = db.invoices();

        let mut first = draft("INV-2026-0001", 1);
        repo.save(&mut first).await.unwrap();
        let mut second = draft("INV-2026-0002", 5);
        second.generate(Utc::now()).unwrap();
        repo.save(&mut second).await.unwrap();

        let all = repo.list("acct", &InvoiceFilter::default()).await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].invoice_number, "INV-2026-0002");

        let sent = repo
            .list(
                "acct",
                &InvoiceFilter {
                    status: Some(InvoiceStatus::Sent),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].id, second.id);

        let early = repo
            .list(
                "acct",
                &InvoiceFilter {
                    to_date: Some(date(3)),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(early.len(), 1);
        assert_eq!(early[0].id, first.id);
    }

    #[tokio::test]
    async fn test_customer_with_invoices_cannot_be_deleted() {
        let db = db().await;
        let mut invoice = draft("INV-2026-0001", 1);
        db.invoices().save(&mut invoice).await.unwrap();

        let err = db
            .customers()
            .delete("acct", &invoice.customer.id)
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Referenced { dependents: 1, .. }));

        db.invoices().delete("acct", &invoice.id).await.unwrap();
        db.customers().delete("acct", &invoice.customer.id).await.unwrap();
    }

    #[tokio::test]
    async fn test_next_invoice_number() {
        let db = db().await;
        let repo = db.invoices();

        assert_eq!(
            repo.next_invoice_number("acct", "INV", date(1)).await.unwrap(),
            "INV-2026-0001"
        );

        repo.save(&mut draft("INV-2026-0001", 1)).await.unwrap();
        repo.save(&mut draft("INV-2026-0007", 2)).await.unwrap();
        repo.save(&mut draft("INV-2025-0042", 3)).await.unwrap();

        assert_eq!(
            repo.next_invoice_number("acct", "INV", date(9)).await.unwrap(),
            "INV-2026-0008"
        );
    }
}

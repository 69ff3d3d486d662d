//! # Invoice Commands
//!
//! ## Creating an Invoice
//! ```text
//! create_invoice(request)
//!      │
//!      ├── validate items + customer ─────────────► VALIDATION_ERROR
//!      │
//!      ├── entitlements.can_create_invoice()
//!      │        └── false ────────────────────────► QUOTA_EXCEEDED
//!      │            (store unreachable → allowed)
//!      │
//!      ├── number = next INV-<year>-<seq>, build draft (not stored yet)
//!      │
//!      ├── entitlements.record_invoice_created()
//!      │        ├── Ok(receipt) ──────────────────► charged
//!      │        ├── AccountingUnavailable ────────► not charged, continue
//!      │        ├── QuotaExceeded ────────────────► QUOTA_EXCEEDED
//!      │        └── Busy / other store error ─────► CONFLICT / DATABASE_ERROR
//!      │
//!      └── save draft
//!               ├── Ok ──► invoice + receipt (+ upgrade warning)
//!               └── Err ─► charge released, error returned
//! ```
//! QuotaExceeded at the charge covers two requests that both passed the
//! check while only one free invoice was left; the loser stores nothing.
//!
//! ## Editing
//! Every edit loads the invoice, applies the change through the
//! `kanak_core::invoice` operations (which recompute totals) and saves it
//! back. Callers may pass the `version` they last saw; a mismatch is a
//! CONFLICT, as is a concurrent save between load and store.

use chrono::{Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use super::customer::CustomerInput;
use crate::error::{ApiError, ErrorCode};
use crate::state::{BillingState, ConfigState, DbState};
use kanak_core::report::{summarize, DashboardSummary};
use kanak_core::validation::{validate_item_input, validate_payment_amount};
use kanak_core::{
    Customer, CoreError, Invoice, InvoiceStatus, ItemInput, Money, PaymentMethod, UsageReceipt,
    ValidationError, MAX_INVOICE_ITEMS,
};
use kanak_db::InvoiceFilter;

// =============================================================================
// Request / Response Types
// =============================================================================

/// Who the invoice is for: an existing customer or new details.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "kind")]
pub enum CustomerRef {
    Existing { id: String },
    New(CustomerInput),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateInvoiceRequest {
    pub customer: CustomerRef,
    #[serde(default)]
    pub items: Vec<ItemInput>,
    /// Defaults to today.
    #[serde(default)]
    pub date: Option<NaiveDate>,
    /// Defaults to `date` plus the configured payment terms.
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateInvoiceResponse {
    pub invoice: Invoice,
    /// `None` when usage accounting was unreachable.
    pub usage: Option<UsageReceipt>,
    /// One free invoice left; show the upgrade prompt.
    pub upgrade_warning: bool,
}

/// Header fields that may change while the invoice is editable.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateInvoiceRequest {
    #[serde(default)]
    pub customer: Option<CustomerRef>,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkPaidRequest {
    pub method: PaymentMethod,
    /// Defaults to the grand total.
    #[serde(default)]
    pub amount: Option<Money>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListInvoicesRequest {
    #[serde(default)]
    pub status: Option<InvoiceStatus>,
    #[serde(default)]
    pub customer_id: Option<String>,
    #[serde(default)]
    pub from_date: Option<NaiveDate>,
    #[serde(default)]
    pub to_date: Option<NaiveDate>,
    #[serde(default)]
    pub limit: Option<i64>,
}

// =============================================================================
// Creation
// =============================================================================

pub async fn create_invoice(
    db: &DbState,
    config: &ConfigState,
    billing: &BillingState,
    request: CreateInvoiceRequest,
) -> Result<CreateInvoiceResponse, ApiError> {
    let account_id = config.account_id();
    debug!(account_id = %account_id, items = request.items.len(), "create_invoice command");

    if request.items.len() > MAX_INVOICE_ITEMS {
        return Err(CoreError::TooManyItems {
            max: MAX_INVOICE_ITEMS,
        }
        .into());
    }
    for input in &request.items {
        validate_item_input(input)?;
    }
    let customer = resolve_customer(db, config, request.customer).await?;

    if !billing.entitlements().can_create_invoice(account_id).await? {
        info!(account_id = %account_id, "Invoice refused, no allowance left");
        return Err(ApiError::new(
            ErrorCode::QuotaExceeded,
            "Invoice limit reached; upgrade your plan to create more invoices",
        ));
    }

    let settings = config.get();
    let date = request.date.unwrap_or_else(|| Utc::now().date_naive());
    let number = db
        .inner()
        .invoices()
        .next_invoice_number(account_id, &settings.invoicing.number_prefix, date)
        .await?;

    let now = Utc::now();
    let mut invoice = Invoice::new_draft(account_id, number, customer, date, now);
    invoice.due_date = Some(
        request
            .due_date
            .unwrap_or(date + Duration::days(settings.invoicing.payment_terms_days)),
    );
    invoice.notes = non_blank(request.notes);
    let items = request
        .items
        .into_iter()
        .map(|input| config.tax().build_item(input))
        .collect();
    invoice.replace_items(items)?;

    let usage = match billing.entitlements().record_invoice_created(account_id).await {
        Ok(receipt) => Some(receipt),
        Err(e) if e.is_unavailable() => {
            warn!(
                account_id = %account_id,
                number = %invoice.invoice_number,
                error = %e,
                "Usage accounting unavailable, creating invoice without recording usage"
            );
            None
        }
        Err(e) => return Err(e.into()),
    };

    if let Err(e) = db.inner().invoices().save(&mut invoice).await {
        if let Some(receipt) = &usage {
            if let Err(release) = billing.entitlements().release(account_id, receipt).await {
                error!(
                    account_id = %account_id,
                    counter = receipt.counter.as_str(),
                    error = %release,
                    "Could not release charge for unsaved invoice"
                );
            }
        }
        return Err(e.into());
    }

    let upgrade_warning = usage.as_ref().is_some_and(|r| r.upgrade_warning);
    info!(
        invoice_id = %invoice.id,
        number = %invoice.invoice_number,
        grand_total = %invoice.grand_total,
        upgrade_warning,
        "Invoice created"
    );

    Ok(CreateInvoiceResponse {
        invoice,
        usage,
        upgrade_warning,
    })
}

async fn resolve_customer(
    db: &DbState,
    config: &ConfigState,
    customer: CustomerRef,
) -> Result<Customer, ApiError> {
    match customer {
        CustomerRef::Existing { id } => super::customer::get_customer(db, config, &id).await,
        CustomerRef::New(input) => {
            input.validate()?;
            Ok(input.into_customer(config.account_id()))
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

// =============================================================================
// Editing
// =============================================================================

async fn load(db: &DbState, config: &ConfigState, id: &str) -> Result<Invoice, ApiError> {
    db.inner()
        .invoices()
        .get_by_id(config.account_id(), id)
        .await?
        .ok_or_else(|| ApiError::not_found("Invoice", id))
}

async fn load_for_edit(
    db: &DbState,
    config: &ConfigState,
    id: &str,
    expected_version: Option<i64>,
) -> Result<Invoice, ApiError> {
    let invoice = load(db, config, id).await?;
    match expected_version {
        Some(expected) if expected != invoice.version => {
            debug!(id = %id, expected, actual = invoice.version, "Version mismatch");
            Err(ApiError::conflict(format!(
                "Invoice {} was changed elsewhere; reload and try again",
                invoice.invoice_number
            )))
        }
        _ => Ok(invoice),
    }
}

async fn store(db: &DbState, mut invoice: Invoice) -> Result<Invoice, ApiError> {
    db.inner().invoices().save(&mut invoice).await?;
    Ok(invoice)
}

pub async fn add_item(
    db: &DbState,
    config: &ConfigState,
    invoice_id: &str,
    expected_version: Option<i64>,
    input: ItemInput,
) -> Result<Invoice, ApiError> {
    debug!(invoice_id = %invoice_id, name = %input.name, "add_item command");
    validate_item_input(&input)?;

    let mut invoice = load_for_edit(db, config, invoice_id, expected_version).await?;
    invoice.add_item(config.tax().build_item(input))?;
    store(db, invoice).await
}

/// Replaces an item's details; the item keeps its id and position.
pub async fn update_item(
    db: &DbState,
    config: &ConfigState,
    invoice_id: &str,
    item_id: &str,
    expected_version: Option<i64>,
    input: ItemInput,
) -> Result<Invoice, ApiError> {
    debug!(invoice_id = %invoice_id, item_id = %item_id, "update_item command");
    validate_item_input(&input)?;

    let mut invoice = load_for_edit(db, config, invoice_id, expected_version).await?;
    invoice.update_item(item_id, config.tax().build_item(input))?;
    store(db, invoice).await
}

pub async fn remove_item(
    db: &DbState,
    config: &ConfigState,
    invoice_id: &str,
    item_id: &str,
    expected_version: Option<i64>,
) -> Result<Invoice, ApiError> {
    debug!(invoice_id = %invoice_id, item_id = %item_id, "remove_item command");
    let mut invoice = load_for_edit(db, config, invoice_id, expected_version).await?;
    invoice.remove_item(item_id)?;
    store(db, invoice).await
}

pub async fn update_invoice(
    db: &DbState,
    config: &ConfigState,
    invoice_id: &str,
    expected_version: Option<i64>,
    request: UpdateInvoiceRequest,
) -> Result<Invoice, ApiError> {
    debug!(invoice_id = %invoice_id, "update_invoice command");
    let mut invoice = load_for_edit(db, config, invoice_id, expected_version).await?;

    if !invoice.is_editable() {
        return Err(CoreError::InvalidInvoiceStatus {
            invoice_id: invoice.id.clone(),
            current_status: invoice.status.to_string(),
            operation: "update details".to_string(),
        }
        .into());
    }

    match request.customer {
        Some(CustomerRef::Existing { id }) => {
            invoice.customer = super::customer::get_customer(db, config, &id).await?;
        }
        Some(CustomerRef::New(input)) => {
            // Edits the invoice's own customer record
            input.validate()?;
            input.apply_to(&mut invoice.customer);
        }
        None => {}
    }

    if let Some(due_date) = request.due_date {
        if due_date < invoice.date {
            return Err(ValidationError::InvalidFormat {
                field: "due_date".to_string(),
                reason: "must not be before the invoice date".to_string(),
            }
            .into());
        }
        invoice.due_date = Some(due_date);
    }
    if request.notes.is_some() {
        invoice.notes = non_blank(request.notes);
    }
    invoice.updated_at = Utc::now();

    store(db, invoice).await
}

// =============================================================================
// Lifecycle
// =============================================================================

/// Issues a draft (draft → sent) once customer and items are complete.
pub async fn generate_invoice(
    db: &DbState,
    config: &ConfigState,
    invoice_id: &str,
    expected_version: Option<i64>,
) -> Result<Invoice, ApiError> {
    debug!(invoice_id = %invoice_id, "generate_invoice command");
    let mut invoice = load_for_edit(db, config, invoice_id, expected_version).await?;
    invoice.generate(Utc::now())?;
    let invoice = store(db, invoice).await?;

    info!(invoice_id = %invoice.id, number = %invoice.invoice_number, "Invoice sent");
    Ok(invoice)
}

pub async fn mark_invoice_paid(
    db: &DbState,
    config: &ConfigState,
    invoice_id: &str,
    expected_version: Option<i64>,
    request: MarkPaidRequest,
) -> Result<Invoice, ApiError> {
    debug!(invoice_id = %invoice_id, method = ?request.method, "mark_invoice_paid command");
    if let Some(amount) = request.amount {
        validate_payment_amount(amount)?;
    }

    let mut invoice = load_for_edit(db, config, invoice_id, expected_version).await?;
    invoice.mark_paid(request.method, request.amount, Utc::now())?;
    let invoice = store(db, invoice).await?;

    info!(
        invoice_id = %invoice.id,
        paid_amount = %invoice.paid_amount,
        "Invoice paid"
    );
    Ok(invoice)
}

pub async fn cancel_invoice(
    db: &DbState,
    config: &ConfigState,
    invoice_id: &str,
    expected_version: Option<i64>,
) -> Result<Invoice, ApiError> {
    debug!(invoice_id = %invoice_id, "cancel_invoice command");
    let mut invoice = load_for_edit(db, config, invoice_id, expected_version).await?;
    invoice.cancel(Utc::now())?;
    let invoice = store(db, invoice).await?;

    info!(invoice_id = %invoice.id, "Invoice cancelled");
    Ok(invoice)
}

/// Deletes a draft. Issued invoices are cancelled instead so the number
/// series keeps no gaps.
pub async fn delete_invoice(
    db: &DbState,
    config: &ConfigState,
    invoice_id: &str,
) -> Result<(), ApiError> {
    debug!(invoice_id = %invoice_id, "delete_invoice command");
    let invoice = load(db, config, invoice_id).await?;
    if invoice.status != InvoiceStatus::Draft {
        return Err(CoreError::InvalidInvoiceStatus {
            invoice_id: invoice.id,
            current_status: invoice.status.to_string(),
            operation: "delete".to_string(),
        }
        .into());
    }

    db.inner()
        .invoices()
        .delete(config.account_id(), invoice_id)
        .await?;
    info!(invoice_id = %invoice_id, "Draft invoice deleted");
    Ok(())
}

// =============================================================================
// Queries
// =============================================================================

pub async fn get_invoice(
    db: &DbState,
    config: &ConfigState,
    invoice_id: &str,
) -> Result<Invoice, ApiError> {
    load(db, config, invoice_id).await
}

/// Lists invoices, newest first.
pub async fn list_invoices(
    db: &DbState,
    config: &ConfigState,
    request: ListInvoicesRequest,
) -> Result<Vec<Invoice>, ApiError> {
    debug!(?request, "list_invoices command");
    let filter = InvoiceFilter {
        status: request.status,
        customer_id: request.customer_id,
        from_date: request.from_date,
        to_date: request.to_date,
        limit: request.limit.map(|l| l.clamp(1, 1000)),
    };
    Ok(db.inner().invoices().list(config.account_id(), &filter).await?)
}

/// Totals across every invoice of the account, as of `today`.
pub async fn get_dashboard(
    db: &DbState,
    config: &ConfigState,
    today: Option<NaiveDate>,
) -> Result<DashboardSummary, ApiError> {
    let today = today.unwrap_or_else(|| Utc::now().date_naive());
    let invoices = db
        .inner()
        .invoices()
        .list(config.account_id(), &InvoiceFilter::default())
        .await?;
    Ok(summarize(&invoices, today))
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::AppConfig;
    use crate::Backend;
    use kanak_core::UsageCounter;
    use rust_decimal_macros::dec;

    async fn backend() -> Backend {
        Backend::in_memory(AppConfig::default()).await.unwrap()
    }

    fn customer(address: &str) -> CustomerRef {
        CustomerRef::New(CustomerInput {
            name: "Kavya Sharma".to_string(),
            address: address.to_string(),
            phone: "9829012345".to_string(),
            email: None,
            gstin: None,
        })
    }

    fn necklace() -> ItemInput {
        ItemInput {
            name: "22K Gold Necklace".to_string(),
            hsn_code: Some("7113".to_string()),
            quantity: 1,
            weight_in_grams: Some(dec!(10)),
            rate_per_gram: Some(Money::from_rupees(5500)),
            making_charges: Some(Money::from_rupees(2500)),
            ..Default::default()
        }
    }

    fn bangles() -> ItemInput {
        ItemInput {
            name: "Gold Bangles (pair)".to_string(),
            price: Some(Money::from_rupees(125_000)),
            ..Default::default()
        }
    }

    fn request(items: Vec<ItemInput>) -> CreateInvoiceRequest {
        CreateInvoiceRequest {
            customer: customer("22 Johari Bazaar, Jaipur"),
            items,
            date: NaiveDate::from_ymd_opt(2026, 3, 10),
            due_date: None,
            notes: None,
        }
    }

    async fn create(
        app: &Backend,
        items: Vec<ItemInput>,
    ) -> Result<CreateInvoiceResponse, ApiError> {
        create_invoice(&app.db, &app.config, &app.billing, request(items)).await
    }

    #[tokio::test]
    async fn test_create_invoice_totals() {
        let app = backend().await;
        let created = create(&app, vec![necklace(), bangles()]).await.unwrap();
        let invoice = created.invoice;

        assert_eq!(invoice.invoice_number, "INV-2026-0001");
        assert_eq!(invoice.status, InvoiceStatus::Draft);
        assert_eq!(invoice.due_date, NaiveDate::from_ymd_opt(2026, 3, 25));
        assert_eq!(invoice.items[0].total_amount, Money::from_rupees(59_225));
        assert_eq!(invoice.subtotal, Money::from_rupees(182_500));
        assert_eq!(invoice.cgst_total, Money::new(dec!(2737.5)));
        assert_eq!(invoice.sgst_total, Money::new(dec!(2737.5)));
        assert_eq!(invoice.grand_total, Money::from_rupees(187_975));

        let receipt = created.usage.unwrap();
        assert_eq!(receipt.counter, UsageCounter::FreeTier);
        assert_eq!(receipt.used, 1);
        assert!(!created.upgrade_warning);

        let stored = get_invoice(&app.db, &app.config, &invoice.id).await.unwrap();
        assert_eq!(stored.grand_total, invoice.grand_total);
        assert_eq!(stored.version, 1);
    }

    #[tokio::test]
    async fn test_free_tier_runs_out() {
        let app = backend().await;

        let first = create(&app, vec![necklace()]).await.unwrap();
        assert!(!first.upgrade_warning);
        let second = create(&app, vec![necklace()]).await.unwrap();
        assert!(second.upgrade_warning);
        let third = create(&app, vec![necklace()]).await.unwrap();
        assert_eq!(third.invoice.invoice_number, "INV-2026-0003");
        assert_eq!(third.usage.unwrap().used, 3);

        let err = create(&app, vec![necklace()]).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::QuotaExceeded);

        let all = list_invoices(&app.db, &app.config, ListInvoicesRequest::default())
            .await
            .unwrap();
        assert_eq!(all.len(), 3);
    }

    #[tokio::test]
    async fn test_racing_for_last_free_invoice() {
        let app = backend().await;
        create(&app, vec![necklace()]).await.unwrap();
        create(&app, vec![necklace()]).await.unwrap();

        // Different years so the two drafts never compete for a number
        let mut next_year = request(vec![bangles()]);
        next_year.date = NaiveDate::from_ymd_opt(2027, 1, 5);
        let (a, b) = tokio::join!(
            create(&app, vec![necklace()]),
            create_invoice(&app.db, &app.config, &app.billing, next_year)
        );
        let outcomes = [a, b];
        assert_eq!(outcomes.iter().filter(|r| r.is_ok()).count(), 1);
        let loser = outcomes.iter().find_map(|r| r.as_ref().err()).unwrap();
        assert_eq!(loser.code, ErrorCode::QuotaExceeded);

        let all = list_invoices(&app.db, &app.config, ListInvoicesRequest::default())
            .await
            .unwrap();
        assert_eq!(all.len(), 3);
    }

    #[tokio::test]
    async fn test_exhausted_plan_stores_nothing() {
        let app = backend().await;
        let now = Utc::now();
        let plan = kanak_core::Subscription {
            id: "sub-1".to_string(),
            account_id: app.config.account_id().to_string(),
            plan_id: "monthly".to_string(),
            status: kanak_core::SubscriptionStatus::Active,
            valid_until: now + Duration::days(30),
            invoice_limit: Some(2),
            invoice_count: 2,
            payment_id: Some("pay_1".to_string()),
            order_id: Some("order_1".to_string()),
            created_at: now,
            updated_at: now,
        };
        app.db.inner().subscriptions().activate(&plan).await.unwrap();

        // Free quota passes the check, but the charge goes to the full plan
        let err = create(&app, vec![necklace()]).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::QuotaExceeded);

        let all = list_invoices(&app.db, &app.config, ListInvoicesRequest::default())
            .await
            .unwrap();
        assert!(all.is_empty());
        let usage = app.db.inner().usage().get(app.config.account_id()).await.unwrap();
        assert_eq!(usage.unwrap().free_invoices_used, 0);

        // The next invoice still gets the first number
        app.db
            .inner()
            .subscriptions()
            .set_status("sub-1", kanak_core::SubscriptionStatus::Cancelled)
            .await
            .unwrap();
        let created = create(&app, vec![necklace()]).await.unwrap();
        assert_eq!(created.invoice.invoice_number, "INV-2026-0001");
    }

    #[tokio::test]
    async fn test_send_requires_address() {
        let app = backend().await;
        let mut req = request(vec![necklace()]);
        req.customer = customer("   ");
        let invoice = create_invoice(&app.db, &app.config, &app.billing, req)
            .await
            .unwrap()
            .invoice;

        let err = generate_invoice(&app.db, &app.config, &invoice.id, None)
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);
        assert_eq!(err.field.as_deref(), Some("customer.address"));

        let stored = get_invoice(&app.db, &app.config, &invoice.id).await.unwrap();
        assert_eq!(stored.status, InvoiceStatus::Draft);

        let fixed = update_invoice(
            &app.db,
            &app.config,
            &invoice.id,
            Some(stored.version),
            UpdateInvoiceRequest {
                customer: Some(customer("5 Chandpole Bazaar, Jaipur")),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        let sent = generate_invoice(&app.db, &app.config, &invoice.id, Some(fixed.version))
            .await
            .unwrap();
        assert_eq!(sent.status, InvoiceStatus::Sent);
    }

    #[tokio::test]
    async fn test_item_edits_recompute_totals() {
        let app = backend().await;
        let invoice = create(&app, vec![necklace()]).await.unwrap().invoice;

        let invoice = add_item(&app.db, &app.config, &invoice.id, Some(invoice.version), bangles())
            .await
            .unwrap();
        assert_eq!(invoice.grand_total, Money::from_rupees(187_975));

        let necklace_id = invoice.items[0].id.clone();
        let mut lighter = necklace();
        lighter.weight_in_grams = Some(dec!(5));
        let invoice = update_item(
            &app.db,
            &app.config,
            &invoice.id,
            &necklace_id,
            Some(invoice.version),
            lighter,
        )
        .await
        .unwrap();
        assert_eq!(invoice.items[0].id, necklace_id);
        assert_eq!(invoice.items[0].price, Money::from_rupees(30_000));

        let invoice = remove_item(&app.db, &app.config, &invoice.id, &necklace_id, None)
            .await
            .unwrap();
        assert_eq!(invoice.items.len(), 1);
        assert_eq!(invoice.subtotal, Money::from_rupees(125_000));
    }

    #[tokio::test]
    async fn test_stale_version_is_conflict() {
        let app = backend().await;
        let invoice = create(&app, vec![necklace()]).await.unwrap().invoice;
        let seen = invoice.version;

        add_item(&app.db, &app.config, &invoice.id, Some(seen), bangles())
            .await
            .unwrap();
        let err = add_item(&app.db, &app.config, &invoice.id, Some(seen), bangles())
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::Conflict);

        let stored = get_invoice(&app.db, &app.config, &invoice.id).await.unwrap();
        assert_eq!(stored.items.len(), 2);
    }

    #[tokio::test]
    async fn test_paid_invoice_is_locked() {
        let app = backend().await;
        let invoice = create(&app, vec![necklace()]).await.unwrap().invoice;

        let paid = mark_invoice_paid(
            &app.db,
            &app.config,
            &invoice.id,
            None,
            MarkPaidRequest {
                method: PaymentMethod::Upi,
                amount: None,
            },
        )
        .await
        .unwrap();
        assert_eq!(paid.status, InvoiceStatus::Paid);
        assert_eq!(paid.paid_amount, Money::from_rupees(59_225));

        let err = add_item(&app.db, &app.config, &invoice.id, None, bangles())
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::BusinessLogic);
        let err = cancel_invoice(&app.db, &app.config, &invoice.id, None)
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::BusinessLogic);
        let err = delete_invoice(&app.db, &app.config, &invoice.id).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::BusinessLogic);
    }

    #[tokio::test]
    async fn test_invalid_payment_amount() {
        let app = backend().await;
        let invoice = create(&app, vec![necklace()]).await.unwrap().invoice;
        let err = mark_invoice_paid(
            &app.db,
            &app.config,
            &invoice.id,
            None,
            MarkPaidRequest {
                method: PaymentMethod::Cash,
                amount: Some(Money::zero()),
            },
        )
        .await
        .unwrap_err();
        assert_eq!(err.field.as_deref(), Some("paid_amount"));
    }

    #[tokio::test]
    async fn test_invalid_item_rejected_before_counting() {
        let app = backend().await;
        let mut bad = necklace();
        bad.quantity = 0;

        let err = create(&app, vec![bad]).await.unwrap_err();
        assert_eq!(err.field.as_deref(), Some("item.quantity"));

        let usage = app.db.inner().usage().get(app.config.account_id()).await.unwrap();
        assert!(usage.is_none_or(|u| u.free_invoices_used == 0));
    }

    #[tokio::test]
    async fn test_dashboard_and_filters() {
        let app = backend().await;
        let a = create(&app, vec![necklace()]).await.unwrap().invoice;
        let b = create(&app, vec![bangles()]).await.unwrap().invoice;
        generate_invoice(&app.db, &app.config, &a.id, None).await.unwrap();
        cancel_invoice(&app.db, &app.config, &b.id, None).await.unwrap();

        let sent = list_invoices(
            &app.db,
            &app.config,
            ListInvoicesRequest {
                status: Some(InvoiceStatus::Sent),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].id, a.id);

        // Due 2026-03-25, so overdue by April
        let summary = get_dashboard(&app.db, &app.config, NaiveDate::from_ymd_opt(2026, 4, 1))
            .await
            .unwrap();
        assert_eq!(summary.total_invoices, 2);
        assert_eq!(summary.sent_count, 1);
        assert_eq!(summary.cancelled_count, 1);
        assert_eq!(summary.overdue_count, 1);
        assert_eq!(summary.outstanding_total, Money::from_rupees(59_225));
    }
}

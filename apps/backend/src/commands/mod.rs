//! # Commands Module
//!
//! Everything the UI can ask of the backend.
//!
//! ## Command Organization
//! ```text
//! commands/
//! ├── mod.rs      ◄─── You are here (exports)
//! ├── customer.rs ◄─── Customer CRUD
//! ├── invoice.rs  ◄─── Invoice creation, items, lifecycle, dashboard
//! ├── usage.rs    ◄─── Entitlement status for the billing screen
//! ├── payment.rs  ◄─── Plan catalog, checkout, payment confirmation
//! └── config.rs   ◄─── Configuration retrieval
//! ```
//!
//! ## Shape of a Command
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  pub async fn add_item(                                                 │
//! │      db: &DbState,          ◄── only the states it needs                │
//! │      config: &ConfigState,                                              │
//! │      invoice_id: &str,      ◄── request parameters                      │
//! │      expected_version: Option<i64>,                                     │
//! │      input: ItemInput,                                                  │
//! │  ) -> Result<Invoice, ApiError>                                         │
//! │         │                                                               │
//! │         │ (serde, camelCase)                                            │
//! │         ▼                                                               │
//! │  UI receives the invoice, or { code, message, field }                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every command acts for `ConfigState::account_id`.

pub mod config;
pub mod customer;
pub mod invoice;
pub mod payment;
pub mod usage;

//! # kanak-db: Record Store for Kanak
//!
//! SQLite persistence for customers, invoices, usage counters and
//! subscriptions, using sqlx for async access.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          Kanak Data Flow                                │
//! │                                                                         │
//! │  Backend command (create_invoice)                                       │
//! │       │                                                                 │
//! │       ├──────────────► kanak-billing (entitlement check / record)       │
//! │       │                        │                                        │
//! │       ▼                        ▼                                        │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     kanak-db (THIS CRATE)                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌──────────────────┐   ┌─────────────┐  │   │
//! │  │   │   Database    │    │   Repositories   │   │ Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │                  │   │ (embedded)  │  │   │
//! │  │   │               │    │ CustomerRepo     │   │             │  │   │
//! │  │   │ SqlitePool    │◄───│ InvoiceRepo      │   │ 001_initial │  │   │
//! │  │   │ WAL, FKs on   │    │ UsageRepo        │   │  _schema    │  │   │
//! │  │   │               │    │ SubscriptionRepo │   │             │  │   │
//! │  │   └───────────────┘    └──────────────────┘   └─────────────┘  │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     SQLite Database (kanak.db)                  │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - One repository per aggregate
//!
//! ## Usage
//!
//! ```rust,ignore
//! use kanak_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("kanak.db")).await?;
//!
//! let mut invoice = /* build a draft with kanak_core */;
//! db.invoices().save(&mut invoice).await?;   // version 0 → 1
//!
//! let usage = db.usage().get_or_create(account_id, 3).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::customer::{CustomerFilter, CustomerRepository};
pub use repository::invoice::{InvoiceFilter, InvoiceRepository};
pub use repository::payment_order::PaymentOrderRepository;
pub use repository::subscription::SubscriptionRepository;
pub use repository::usage::UsageRepository;

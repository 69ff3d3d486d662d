//! # State Module
//!
//! Shared state handed to the command handlers.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    State Architecture                                   │
//! │                                                                         │
//! │  ┌──────────────┐  ┌──────────────────┐  ┌──────────────────────────┐  │
//! │  │   DbState    │  │   ConfigState    │  │      BillingState        │  │
//! │  │              │  │                  │  │                          │  │
//! │  │  Database    │  │  account_id      │  │  EntitlementService      │  │
//! │  │  (SQLite     │  │  business        │  │  SubscriptionService     │  │
//! │  │   pool)      │  │  tax settings    │  │  (gateway, if set up)    │  │
//! │  └──────────────┘  └──────────────────┘  └──────────────────────────┘  │
//! │                                                                         │
//! │  THREAD SAFETY:                                                        │
//! │  • DbState: the pool is shared and thread-safe                         │
//! │  • ConfigState: read-only after startup                                │
//! │  • BillingState: services are cheap clones over the same pool          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Commands take only the states they use, e.g.
//! `create_invoice(&DbState, &ConfigState, &BillingState, ...)`.

mod billing;
mod config;
mod db;

pub use billing::BillingState;
pub use config::{AppConfig, BusinessProfile, ConfigError, ConfigState, InvoicingConfig};
pub use db::DbState;

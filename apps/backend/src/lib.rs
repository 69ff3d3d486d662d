//! # Kanak Backend Library
//!
//! Startup wiring and the command surface of the invoicing app.
//!
//! ## Module Organization
//! ```text
//! kanak_backend/
//! ├── lib.rs          ◄─── You are here (startup & tracing)
//! ├── state/
//! │   ├── mod.rs      ◄─── State type exports
//! │   ├── db.rs       ◄─── Database state wrapper
//! │   ├── config.rs   ◄─── AppConfig loading + ConfigState
//! │   └── billing.rs  ◄─── Entitlement + subscription services
//! ├── commands/
//! │   ├── customer.rs ◄─── Customer CRUD
//! │   ├── invoice.rs  ◄─── Invoice lifecycle, items, dashboard
//! │   ├── usage.rs    ◄─── Entitlement status
//! │   ├── payment.rs  ◄─── Plans, checkout, confirmation
//! │   └── config.rs   ◄─── Configuration retrieval
//! └── error.rs        ◄─── API error type for commands
//! ```
//!
//! ## Startup Sequence
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  1. init_tracing()        RUST_LOG, default info,kanak=debug,sqlx=warn  │
//! │  2. AppConfig::load()     defaults → kanak.toml → KANAK_* env vars      │
//! │  3. Database::new()       SQLite (WAL) + pending migrations             │
//! │  4. BillingState::new()   entitlements + Razorpay if configured         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod commands;
pub mod error;
pub mod state;

use tracing::info;
use tracing_subscriber::EnvFilter;

use kanak_db::{Database, DbConfig};
use state::{AppConfig, BillingState, ConfigState, DbState};

/// Everything a command may need, built once at startup.
#[derive(Clone)]
pub struct Backend {
    pub db: DbState,
    pub config: ConfigState,
    pub billing: BillingState,
}

impl Backend {
    /// Opens the configured database and wires the billing services.
    pub async fn start(config: AppConfig) -> Result<Self, Box<dyn std::error::Error>> {
        let db_path = config.resolve_database_path()?;
        info!(?db_path, "Database path determined");

        let db = Database::new(DbConfig::new(db_path)).await?;
        info!("Database connected and migrations applied");

        Ok(Self::assemble(db, config)?)
    }

    /// Backend over a fresh in-memory database.
    pub async fn in_memory(config: AppConfig) -> Result<Self, Box<dyn std::error::Error>> {
        let db = Database::new(DbConfig::in_memory()).await?;
        Ok(Self::assemble(db, config)?)
    }

    fn assemble(db: Database, config: AppConfig) -> Result<Self, kanak_billing::BillingError> {
        let billing = BillingState::new(&db, &config.billing)?;
        info!(account_id = %config.account_id, "State initialized");
        Ok(Backend {
            db: DbState::new(db),
            config: ConfigState::new(config),
            billing,
        })
    }

    pub async fn shutdown(&self) {
        self.db.inner().close().await;
    }
}

/// Initializes the tracing subscriber for structured logging.
///
/// ## Log Levels
/// - `RUST_LOG=debug` - Show debug messages
/// - `RUST_LOG=kanak=trace` - Show trace for kanak crates only
/// - Default: `info,kanak=debug,sqlx=warn`
///
/// Safe to call more than once; later calls are no-ops.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,kanak=debug,sqlx=warn"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .try_init();
}

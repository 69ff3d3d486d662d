//! # Connection Pool
//!
//! Opens the SQLite file behind every repository.
//!
//! ```text
//! DbConfig::new("kanak.db")          DbConfig::in_memory()
//!        │                                  │
//!        └──────────────┬───────────────────┘
//!                       ▼
//!            Database::new(config)
//!              ├── WAL journal, NORMAL sync, foreign keys on
//!              ├── busy_timeout for writers waiting on a lock
//!              └── pending migrations applied
//!                       │
//!     ┌─────────────┬───┴─────────┬──────────────────┐
//!     ▼             ▼             ▼                  ▼
//! customers()   invoices()     usage()        subscriptions()
//! ```
//!
//! Readers never wait on the writer saving an invoice (WAL). Writers queue
//! on SQLite's lock for up to `busy_timeout`, which is what serializes two
//! usage increments racing for the last free invoice.

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::migrations;
use crate::repository::customer::CustomerRepository;
use crate::repository::invoice::InvoiceRepository;
use crate::repository::payment_order::PaymentOrderRepository;
use crate::repository::subscription::SubscriptionRepository;
use crate::repository::usage::UsageRepository;

const IN_MEMORY: &str = ":memory:";

/// Where and how to open the database.
///
/// ```rust,ignore
/// let config = DbConfig::new(data_dir.join("kanak.db")).max_connections(4);
/// ```
#[derive(Debug, Clone)]
pub struct DbConfig {
    pub database_path: PathBuf,

    /// Default 5; always 1 in memory, where each connection would see its
    /// own empty database.
    pub max_connections: u32,

    /// How long a pool checkout may wait. Default 10s.
    pub acquire_timeout: Duration,

    /// How long a writer waits for SQLite's lock. Default 5s.
    pub busy_timeout: Duration,

    pub run_migrations: bool,
}

impl DbConfig {
    /// File-backed configuration; the file is created on first open.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        DbConfig {
            database_path: path.into(),
            max_connections: 5,
            acquire_timeout: Duration::from_secs(10),
            busy_timeout: Duration::from_secs(5),
            run_migrations: true,
        }
    }

    /// A private in-memory database, migrated and ready. Used by tests.
    pub fn in_memory() -> Self {
        DbConfig {
            max_connections: 1,
            acquire_timeout: Duration::from_secs(5),
            ..DbConfig::new(IN_MEMORY)
        }
    }

    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    pub fn busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }

    pub fn run_migrations(mut self, run: bool) -> Self {
        self.run_migrations = run;
        self
    }

    fn is_in_memory(&self) -> bool {
        self.database_path.as_os_str() == IN_MEMORY
    }
}

/// Handle to the invoicing database.
///
/// Cloning shares the pool. Repositories are built per call:
///
/// ```rust,ignore
/// let invoice = db.invoices().get_by_id(account_id, &invoice_id).await?;
/// let usage = db.usage().get_or_create(account_id, 3).await?;
/// ```
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Opens the pool and, unless disabled, applies pending migrations.
    pub async fn new(config: DbConfig) -> DbResult<Self> {
        info!(path = %config.database_path.display(), "Opening database");

        let in_memory = config.is_in_memory();
        let base = if in_memory {
            SqliteConnectOptions::from_str("sqlite::memory:")
                .map_err(|e| DbError::ConnectionFailed(e.to_string()))?
        } else {
            SqliteConnectOptions::new()
                .filename(&config.database_path)
                .create_if_missing(true)
                .journal_mode(SqliteJournalMode::Wal)
                .synchronous(SqliteSynchronous::Normal)
        };
        let options = base.foreign_keys(true).busy_timeout(config.busy_timeout);

        let max_connections = if in_memory { 1 } else { config.max_connections.max(1) };
        debug!(max_connections, in_memory, "Connecting pool");

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            // An in-memory database lives only as long as its connection
            .min_connections(if in_memory { 1 } else { 0 })
            .idle_timeout(if in_memory { None } else { Some(Duration::from_secs(600)) })
            .max_lifetime(if in_memory { None } else { Some(Duration::from_secs(1800)) })
            .acquire_timeout(config.acquire_timeout)
            .connect_with(options)
            .await
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?;

        let db = Database { pool };
        if config.run_migrations {
            db.run_migrations().await?;
        }

        info!(max_connections, "Database ready");
        Ok(db)
    }

    /// Applies all pending migrations. Idempotent.
    pub async fn run_migrations(&self) -> DbResult<()> {
        migrations::run_migrations(&self.pool).await
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn customers(&self) -> CustomerRepository {
        CustomerRepository::new(self.pool.clone())
    }

    pub fn invoices(&self) -> InvoiceRepository {
        InvoiceRepository::new(self.pool.clone())
    }

    /// Free-tier counters.
    pub fn usage(&self) -> UsageRepository {
        UsageRepository::new(self.pool.clone())
    }

    pub fn subscriptions(&self) -> SubscriptionRepository {
        SubscriptionRepository::new(self.pool.clone())
    }

    /// Checkout orders awaiting or past payment.
    pub fn payment_orders(&self) -> PaymentOrderRepository {
        PaymentOrderRepository::new(self.pool.clone())
    }

    /// Closes the pool. Later calls fail with an unavailable-class
    /// [`DbError`] (see [`DbError::is_unavailable`]).
    pub async fn close(&self) {
        info!("Closing database");
        self.pool.close().await;
    }

    pub async fn health_check(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.pool).await.is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_in_memory_database_is_migrated() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        assert!(db.health_check().await);

        let (total, applied) = migrations::migration_status(db.pool()).await.unwrap();
        assert_eq!(total, applied);
    }

    #[tokio::test]
    async fn test_closed_database_is_unhealthy() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.close().await;
        assert!(!db.health_check().await);
        assert!(db.usage().get("acct").await.unwrap_err().is_unavailable());
    }

    #[tokio::test]
    async fn test_clones_share_one_database() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let other = db.clone();
        db.usage().get_or_create("acct", 3).await.unwrap();
        assert!(other.usage().get("acct").await.unwrap().is_some());
    }

    #[test]
    fn test_config_builder() {
        let config = DbConfig::new("/tmp/kanak-test.db")
            .max_connections(10)
            .busy_timeout(Duration::from_millis(250))
            .run_migrations(false);

        assert_eq!(config.max_connections, 10);
        assert_eq!(config.busy_timeout, Duration::from_millis(250));
        assert!(!config.run_migrations);
        assert!(!config.is_in_memory());
        assert!(DbConfig::in_memory().is_in_memory());
    }
}

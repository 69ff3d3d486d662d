//! # Database Error Types
//!
//! Error types for database operations.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Propagation                                    │
//! │                                                                         │
//! │  SQLite Error (sqlx::Error)                                            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  DbError (this module) ← Adds context and categorization               │
//! │       │                                                                 │
//! │       ├──► BillingError::AccountingUnavailable (connection-level)      │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ApiError (backend) ← Serialized for callers                           │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

/// Database operation errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// Entity not found in database.
    ///
    /// ## When This Occurs
    /// - `fetch_one` returns no rows
    /// - ID doesn't exist or belongs to another account
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Unique constraint violation.
    ///
    /// ## When This Occurs
    /// - Duplicate invoice number within an account
    /// - A payment id already used to activate a subscription
    #[error("Duplicate {field}: '{value}' already exists")]
    UniqueViolation { field: String, value: String },

    /// Foreign key constraint violation.
    #[error("Foreign key violation: {message}")]
    ForeignKeyViolation { message: String },

    /// The row changed since it was loaded.
    ///
    /// ## When This Occurs
    /// ```text
    /// Tab A loads invoice (version 3)     Tab B loads invoice (version 3)
    ///         │                                   │
    ///         ▼                                   │
    /// save → version 4 ✓                          │
    ///                                             ▼
    ///                                  save (expects 3) → StaleVersion
    /// ```
    #[error("{entity} {id} was modified concurrently (expected version {expected})")]
    StaleVersion {
        entity: String,
        id: String,
        expected: i64,
    },

    /// Delete refused because other rows still reference the entity.
    #[error("{entity} {id} is referenced by {dependents} invoice(s)")]
    Referenced {
        entity: String,
        id: String,
        dependents: i64,
    },

    /// A stored value could not be parsed back into its domain type.
    #[error("Corrupt {entity}.{field} value: '{value}'")]
    CorruptValue {
        entity: String,
        field: String,
        value: String,
    },

    /// SQLite reported the database busy or locked past `busy_timeout`.
    ///
    /// The database is reachable; another writer holds the lock. Retrying
    /// the operation is safe.
    #[error("Database busy: {0}")]
    Busy(String),

    /// Database connection failed.
    ///
    /// ## When This Occurs
    /// - Database file doesn't exist and can't be created
    /// - File permissions issue
    /// - Pool already closed
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    #[error("Transaction failed: {0}")]
    TransactionFailed(String),

    /// Pool exhausted (all connections in use).
    #[error("Connection pool exhausted")]
    PoolExhausted,

    #[error("Internal database error: {0}")]
    Internal(String),
}

impl DbError {
    /// Creates a NotFound error for a given entity type and ID.
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        DbError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Creates a UniqueViolation error.
    pub fn duplicate(field: impl Into<String>, value: impl Into<String>) -> Self {
        DbError::UniqueViolation {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Creates a CorruptValue error.
    pub fn corrupt(
        entity: impl Into<String>,
        field: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        DbError::CorruptValue {
            entity: entity.into(),
            field: field.into(),
            value: value.into(),
        }
    }

    /// The database could not be reached at all, as opposed to a query that
    /// ran and failed.
    pub fn is_unavailable(&self) -> bool {
        matches!(
            self,
            DbError::ConnectionFailed(_) | DbError::PoolExhausted | DbError::Internal(_)
        )
    }
}

/// ```text
/// RowNotFound                    → NotFound
/// Database(unique violation)     → UniqueViolation { field: "<table>.<column>" }
/// Database(foreign key)          → ForeignKeyViolation
/// Database(SQLITE_BUSY / LOCKED) → Busy
/// Database(other)                → QueryFailed
/// PoolTimedOut                   → PoolExhausted      (unavailable)
/// PoolClosed / Io                → ConnectionFailed   (unavailable)
/// anything else                  → Internal           (unavailable)
/// ```
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        use sqlx::error::ErrorKind;

        match err {
            sqlx::Error::RowNotFound => DbError::not_found("Record", "unknown"),

            sqlx::Error::Database(db_err) => {
                let message = db_err.message().to_string();
                match db_err.kind() {
                    ErrorKind::UniqueViolation => {
                        // "UNIQUE constraint failed: invoices.account_id, invoices.invoice_number"
                        let field = message
                            .rsplit_once(": ")
                            .map_or("unknown", |(_, columns)| columns)
                            .to_string();
                        DbError::duplicate(field, "unknown")
                    }
                    ErrorKind::ForeignKeyViolation => DbError::ForeignKeyViolation { message },
                    _ if is_busy(db_err.code().as_deref()) => {
                        DbError::Busy(message)
                    }
                    _ => DbError::QueryFailed(message),
                }
            }

            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,
            sqlx::Error::PoolClosed => DbError::ConnectionFailed("pool is closed".to_string()),
            sqlx::Error::Io(io_err) => DbError::ConnectionFailed(io_err.to_string()),
            other => DbError::Internal(other.to_string()),
        }
    }
}

/// SQLITE_BUSY (5) and SQLITE_LOCKED (6), including extended codes.
fn is_busy(code: Option<&str>) -> bool {
    code.and_then(|c| c.parse::<i32>().ok())
        .is_some_and(|c| matches!(c & 0xff, 5 | 6))
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

/// Result type for database operations.
pub type DbResult<T> = Result<T, DbError>;

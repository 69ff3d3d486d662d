//! # Database State
//!
//! Wraps the `Database` connection for the command handlers.
//!
//! ## Thread Safety
//! `Database` holds a `SqlitePool`, so commands can run queries
//! concurrently without extra locking.

use kanak_db::Database;

#[derive(Debug, Clone)]
pub struct DbState {
    db: Database,
}

impl DbState {
    pub fn new(db: Database) -> Self {
        DbState { db }
    }

    /// Returns a reference to the inner Database.
    pub fn inner(&self) -> &Database {
        &self.db
    }
}

//! # Usage Repository
//!
//! Free-tier counters, one row per account.
//!
//! ## Atomic Increment
//! ```text
//! UPDATE usage_records
//!    SET free_invoices_used = free_invoices_used + 1
//!  WHERE account_id = ? AND free_invoices_used < free_invoices_limit
//! RETURNING ...
//!
//! 1 row  → incremented, new state returned
//! 0 rows → already at the limit (or no record); nothing changed
//! ```
//! Two requests racing for the last free invoice cannot both succeed.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};
use kanak_core::UsageRecord;

#[derive(Debug, sqlx::FromRow)]
struct UsageRow {
    account_id: String,
    free_invoices_used: i64,
    free_invoices_limit: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<UsageRow> for UsageRecord {
    fn from(row: UsageRow) -> Self {
        UsageRecord {
            account_id: row.account_id,
            free_invoices_used: row.free_invoices_used,
            free_invoices_limit: row.free_invoices_limit,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

const USAGE_COLUMNS: &str =
    "account_id, free_invoices_used, free_invoices_limit, created_at, updated_at";

/// Repository for free-tier usage records.
#[derive(Debug, Clone)]
pub struct UsageRepository {
    pool: SqlitePool,
}

impl UsageRepository {
    /// Creates a new UsageRepository.
    pub fn new(pool: SqlitePool) -> Self {
        UsageRepository { pool }
    }

    pub async fn get(&self, account_id: &str) -> DbResult<Option<UsageRecord>> {
        let sql = format!("SELECT {USAGE_COLUMNS} FROM usage_records WHERE account_id = ?1");
        let row: Option<UsageRow> = sqlx::query_as(&sql)
            .bind(account_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(UsageRecord::from))
    }

    /// Returns the account's record, creating it with `limit` on first use.
    ///
    /// Idempotent: an existing record (and its limit) is left untouched.
    pub async fn get_or_create(&self, account_id: &str, limit: i64) -> DbResult<UsageRecord> {
        let now = Utc::now();
        let inserted = sqlx::query(
            r#"
            INSERT OR IGNORE INTO usage_records (
                account_id, free_invoices_used, free_invoices_limit, created_at, updated_at
            ) VALUES (?1, 0, ?2, ?3, ?3)
            "#,
        )
        .bind(account_id)
        .bind(limit)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if inserted.rows_affected() > 0 {
            debug!(account_id = %account_id, limit, "Created usage record");
        }

        self.get(account_id)
            .await?
            .ok_or_else(|| DbError::not_found("UsageRecord", account_id))
    }

    /// Increments the free-tier counter if it is below its limit.
    ///
    /// Returns the updated record, or `None` when nothing was incremented.
    pub async fn try_increment(&self, account_id: &str) -> DbResult<Option<UsageRecord>> {
        let sql = format!(
            "UPDATE usage_records
                SET free_invoices_used = free_invoices_used + 1,
                    updated_at = ?2
              WHERE account_id = ?1
                AND free_invoices_used < free_invoices_limit
             RETURNING {USAGE_COLUMNS}"
        );
        let row: Option<UsageRow> = sqlx::query_as(&sql)
            .bind(account_id)
            .bind(Utc::now())
            .fetch_optional(&self.pool)
            .await?;

        debug!(account_id = %account_id, incremented = row.is_some(), "Free-tier increment");
        Ok(row.map(UsageRecord::from))
    }

    /// Gives back one free invoice charged for an invoice that was never
    /// stored. Returns `false` when the counter was already zero.
    pub async fn release(&self, account_id: &str) -> DbResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE usage_records
               SET free_invoices_used = free_invoices_used - 1,
                   updated_at = ?2
             WHERE account_id = ?1
               AND free_invoices_used > 0
            "#,
        )
        .bind(account_id)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};

    async fn db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    #[tokio::test]
    async fn test_get_or_create_is_idempotent() {
        let db = db().await;
        let repo = db.usage();

        assert!(repo.get("acct").await.unwrap().is_none());

        let first = repo.get_or_create("acct", 3).await.unwrap();
        assert_eq!(first.free_invoices_used, 0);
        assert_eq!(first.free_invoices_limit, 3);

        repo.try_increment("acct").await.unwrap();
        let again = repo.get_or_create("acct", 10).await.unwrap();
        assert_eq!(again.free_invoices_used, 1);
        assert_eq!(again.free_invoices_limit, 3);
    }

    #[tokio::test]
    async fn test_increment_stops_at_limit() {
        let db = db().await;
        let repo = db.usage();
        repo.get_or_create("acct", 3).await.unwrap();

        for expected in 1..=3 {
            let record = repo.try_increment("acct").await.unwrap().unwrap();
            assert_eq!(record.free_invoices_used, expected);
        }
        assert!(repo.try_increment("acct").await.unwrap().is_none());
        assert_eq!(repo.get("acct").await.unwrap().unwrap().free_invoices_used, 3);
    }

    #[tokio::test]
    async fn test_racing_for_last_free_invoice() {
        let db = db().await;
        let repo = db.usage();
        repo.get_or_create("acct", 3).await.unwrap();
        repo.try_increment("acct").await.unwrap();
        repo.try_increment("acct").await.unwrap();

        let (a, b) = tokio::join!(repo.try_increment("acct"), repo.try_increment("acct"));
        let winners = [a.unwrap(), b.unwrap()].iter().filter(|r| r.is_some()).count();
        assert_eq!(winners, 1);
        assert_eq!(repo.get("acct").await.unwrap().unwrap().free_invoices_used, 3);
    }

    #[tokio::test]
    async fn test_increment_without_record() {
        let db = db().await;
        assert!(db.usage().try_increment("nobody").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_release_gives_back_one() {
        let db = db().await;
        let repo = db.usage();
        repo.get_or_create("acct", 3).await.unwrap();
        repo.try_increment("acct").await.unwrap();

        assert!(repo.release("acct").await.unwrap());
        assert_eq!(repo.get("acct").await.unwrap().unwrap().free_invoices_used, 0);
        assert!(!repo.release("acct").await.unwrap());
        assert_eq!(repo.get("acct").await.unwrap().unwrap().free_invoices_used, 0);
    }
}

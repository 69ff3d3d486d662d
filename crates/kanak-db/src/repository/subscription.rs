//! # Subscription Repository
//!
//! Paid plans per account. At most one subscription per account is
//! `active`: [`SubscriptionRepository::activate`] expires the previous one in
//! the same transaction that stores the new one.
//!
//! Expiry (`valid_until`) is judged by the caller with
//! `Subscription::is_current`; SQL only filters on `status`.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use kanak_core::{Subscription, SubscriptionStatus};

#[derive(Debug, sqlx::FromRow)]
struct SubscriptionRow {
    id: String,
    account_id: String,
    plan_id: String,
    status: SubscriptionStatus,
    valid_until: DateTime<Utc>,
    invoice_limit: Option<i64>,
    invoice_count: i64,
    payment_id: Option<String>,
    order_id: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<SubscriptionRow> for Subscription {
    fn from(row: SubscriptionRow) -> Self {
        Subscription {
            id: row.id,
            account_id: row.account_id,
            plan_id: row.plan_id,
            status: row.status,
            valid_until: row.valid_until,
            invoice_limit: row.invoice_limit,
            invoice_count: row.invoice_count,
            payment_id: row.payment_id,
            order_id: row.order_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

const SUBSCRIPTION_COLUMNS: &str = "id, account_id, plan_id, status, valid_until, invoice_limit, \
     invoice_count, payment_id, order_id, created_at, updated_at";

/// Repository for subscriptions.
#[derive(Debug, Clone)]
pub struct SubscriptionRepository {
    pool: SqlitePool,
}

impl SubscriptionRepository {
    /// Creates a new SubscriptionRepository.
    pub fn new(pool: SqlitePool) -> Self {
        SubscriptionRepository { pool }
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Subscription>> {
        let sql = format!("SELECT {SUBSCRIPTION_COLUMNS} FROM subscriptions WHERE id = ?1");
        let row: Option<SubscriptionRow> = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Subscription::from))
    }

    /// The account's most recent `active` subscription, expired or not.
    pub async fn current(&self, account_id: &str) -> DbResult<Option<Subscription>> {
        let sql = format!(
            "SELECT {SUBSCRIPTION_COLUMNS} FROM subscriptions
             WHERE account_id = ?1 AND status = 'active'
             ORDER BY created_at DESC
             LIMIT 1"
        );
        let row: Option<SubscriptionRow> = sqlx::query_as(&sql)
            .bind(account_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Subscription::from))
    }

    /// The subscription a gateway payment activated, if any.
    pub async fn find_by_payment_id(&self, payment_id: &str) -> DbResult<Option<Subscription>> {
        let sql = format!("SELECT {SUBSCRIPTION_COLUMNS} FROM subscriptions WHERE payment_id = ?1");
        let row: Option<SubscriptionRow> = sqlx::query_as(&sql)
            .bind(payment_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Subscription::from))
    }

    /// All subscriptions of an account, newest first.
    pub async fn list(&self, account_id: &str) -> DbResult<Vec<Subscription>> {
        let sql = format!(
            "SELECT {SUBSCRIPTION_COLUMNS} FROM subscriptions
             WHERE account_id = ?1
             ORDER BY created_at DESC"
        );
        let rows: Vec<SubscriptionRow> = sqlx::query_as(&sql)
            .bind(account_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(Subscription::from).collect())
    }

    /// Inserts or updates a subscription row.
    pub async fn upsert(&self, sub: &Subscription) -> DbResult<()> {
        debug!(
            id = %sub.id,
            plan = %sub.plan_id,
            status = sub.status.as_str(),
            "Upserting subscription"
        );
        sqlx::query(
            r#"
            INSERT INTO subscriptions (
                id, account_id, plan_id, status, valid_until, invoice_limit,
                invoice_count, payment_id, order_id, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            ON CONFLICT (id) DO UPDATE SET
                plan_id = excluded.plan_id,
                status = excluded.status,
                valid_until = excluded.valid_until,
                invoice_limit = excluded.invoice_limit,
                invoice_count = excluded.invoice_count,
                payment_id = excluded.payment_id,
                order_id = excluded.order_id,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&sub.id)
        .bind(&sub.account_id)
        .bind(&sub.plan_id)
        .bind(sub.status)
        .bind(sub.valid_until)
        .bind(sub.invoice_limit)
        .bind(sub.invoice_count)
        .bind(&sub.payment_id)
        .bind(&sub.order_id)
        .bind(sub.created_at)
        .bind(sub.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Stores `sub` as the account's only active subscription.
    ///
    /// Any other active subscription of the account becomes `expired`.
    pub async fn activate(&self, sub: &Subscription) -> DbResult<()> {
        let mut tx = self.pool.begin().await?;

        let superseded = sqlx::query(
            r#"
            UPDATE subscriptions SET status = 'expired', updated_at = ?3
            WHERE account_id = ?1 AND status = 'active' AND id <> ?2
            "#,
        )
        .bind(&sub.account_id)
        .bind(&sub.id)
        .bind(sub.updated_at)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        sqlx::query(
            r#"
            INSERT INTO subscriptions (
                id, account_id, plan_id, status, valid_until, invoice_limit,
                invoice_count, payment_id, order_id, created_at, updated_at
            ) VALUES (?1, ?2, ?3, 'active', ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
        )
        .bind(&sub.id)
        .bind(&sub.account_id)
        .bind(&sub.plan_id)
        .bind(sub.valid_until)
        .bind(sub.invoice_limit)
        .bind(sub.invoice_count)
        .bind(&sub.payment_id)
        .bind(&sub.order_id)
        .bind(sub.created_at)
        .bind(sub.updated_at)
        .execute(&mut *tx)
        .await?;

        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        info!(
            account_id = %sub.account_id,
            plan = %sub.plan_id,
            valid_until = %sub.valid_until,
            superseded,
            "Subscription activated"
        );
        Ok(())
    }

    /// Increments the invoice count if the subscription is active and below
    /// its limit. Returns the updated subscription, or `None` if nothing
    /// changed.
    pub async fn try_increment(&self, id: &str) -> DbResult<Option<Subscription>> {
        let sql = format!(
            "UPDATE subscriptions
                SET invoice_count = invoice_count + 1,
                    updated_at = ?2
              WHERE id = ?1
                AND status = 'active'
                AND (invoice_limit IS NULL OR invoice_count < invoice_limit)
             RETURNING {SUBSCRIPTION_COLUMNS}"
        );
        let row: Option<SubscriptionRow> = sqlx::query_as(&sql)
            .bind(id)
            .bind(Utc::now())
            .fetch_optional(&self.pool)
            .await?;

        debug!(id = %id, incremented = row.is_some(), "Subscription increment");
        Ok(row.map(Subscription::from))
    }

    /// Gives back one invoice charged to the subscription. Returns `false`
    /// when the count was already zero.
    pub async fn release(&self, id: &str) -> DbResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE subscriptions
               SET invoice_count = invoice_count - 1,
                   updated_at = ?2
             WHERE id = ?1
               AND invoice_count > 0
            "#,
        )
        .bind(id)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn set_status(&self, id: &str, status: SubscriptionStatus) -> DbResult<()> {
        let result =
            sqlx::query("UPDATE subscriptions SET status = ?2, updated_at = ?3 WHERE id = ?1")
                .bind(id)
                .bind(status)
                .bind(Utc::now())
                .execute(&self.pool)
                .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Subscription", id));
        }
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

//! # Customer Repository
//!
//! Database operations for customers.
//!
//! Customers are also written as part of every invoice save (see
//! [`upsert_customer`]), so the invoice's embedded customer and the
//! customer list never drift apart.
//!
//! ## Deletion Rule
//! ```text
//! delete(customer)
//!      │
//!      ├── referenced by ≥1 invoice? ──► DbError::Referenced (nothing deleted)
//!      │
//!      └── otherwise ──► row removed
//! ```

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use kanak_core::Customer;

/// Filters for [`CustomerRepository::list`].
#[derive(Debug, Clone, Default)]
pub struct CustomerFilter {
    /// Matches name, phone or GSTIN (case-insensitive substring).
    pub search: Option<String>,
    pub limit: Option<i64>,
}

#[derive(Debug, sqlx::FromRow)]
struct CustomerRow {
    id: String,
    account_id: String,
    name: String,
    address: String,
    phone: String,
    email: Option<String>,
    gstin: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<CustomerRow> for Customer {
    fn from(row: CustomerRow) -> Self {
        Customer {
            id: row.id,
            account_id: row.account_id,
            name: row.name,
            address: row.address,
            phone: row.phone,
            email: row.email,
            gstin: row.gstin,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

const SELECT_CUSTOMER: &str = r#"
    SELECT id, account_id, name, address, phone, email, gstin, created_at, updated_at
    FROM customers
"#;

/// Inserts or updates a customer on an existing connection or transaction.
///
/// The update only applies when the stored row belongs to the same account.
pub(crate) async fn upsert_customer(
    conn: &mut SqliteConnection,
    customer: &Customer,
) -> DbResult<()> {
    let result = sqlx::query(
        r#"
        INSERT INTO customers (
            id, account_id, name, address, phone, email, gstin, created_at, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
        ON CONFLICT (id) DO UPDATE SET
            name = excluded.name,
            address = excluded.address,
            phone = excluded.phone,
            email = excluded.email,
            gstin = excluded.gstin,
            updated_at = excluded.updated_at
        WHERE customers.account_id = excluded.account_id
        "#,
    )
    .bind(&customer.id)
    .bind(&customer.account_id)
    .bind(&customer.name)
    .bind(&customer.address)
    .bind(&customer.phone)
    .bind(&customer.email)
    .bind(&customer.gstin)
    .bind(customer.created_at)
    .bind(customer.updated_at)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        // Conflict on a row owned by another account
        return Err(DbError::not_found("Customer", &customer.id));
    }

    Ok(())
}

/// Repository for customer database operations.
#[derive(Debug, Clone)]
pub struct CustomerRepository {
    pool: SqlitePool,
}

impl CustomerRepository {
    /// Creates a new CustomerRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CustomerRepository { pool }
    }

    /// Gets a customer by ID within an account.
    pub async fn get_by_id(&self, account_id: &str, id: &str) -> DbResult<Option<Customer>> {
        let sql = format!("{SELECT_CUSTOMER} WHERE account_id = ?1 AND id = ?2");
        let row: Option<CustomerRow> = sqlx::query_as(&sql)
            .bind(account_id)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(Customer::from))
    }

    /// Lists customers alphabetically.
    pub async fn list(&self, account_id: &str, filter: &CustomerFilter) -> DbResult<Vec<Customer>> {
        let pattern = filter
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| format!("%{}%", s.to_lowercase()));

        let sql = format!(
            "{SELECT_CUSTOMER}
             WHERE account_id = ?1
               AND (?2 IS NULL
                    OR lower(name) LIKE ?2
                    OR phone LIKE ?2
                    OR lower(coalesce(gstin, '')) LIKE ?2)
             ORDER BY name COLLATE NOCASE, created_at
             LIMIT ?3"
        );
        let rows: Vec<CustomerRow> = sqlx::query_as(&sql)
            .bind(account_id)
            .bind(pattern)
            .bind(filter.limit.unwrap_or(-1))
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(Customer::from).collect())
    }

    /// Inserts or updates a customer.
    pub async fn upsert(&self, customer: &Customer) -> DbResult<()> {
        debug!(id = %customer.id, name = %customer.name, "Upserting customer");
        let mut conn = self.pool.acquire().await?;
        upsert_customer(&mut conn, customer).await
    }

    /// Number of invoices referencing the customer.
    pub async fn invoice_count(&self, id: &str) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM invoices WHERE customer_id = ?1")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Deletes a customer that no invoice references.
    pub async fn delete(&self, account_id: &str, id: &str) -> DbResult<()> {
        let dependents = self.invoice_count(id).await?;
        if dependents > 0 {
            return Err(DbError::Referenced {
                entity: "Customer".to_string(),
                id: id.to_string(),
                dependents,
            });
        }

        debug!(id = %id, "Deleting customer");
        let result = sqlx::query("DELETE FROM customers WHERE account_id = ?1 AND id = ?2")
            .bind(account_id)
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Customer", id));
        }

        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

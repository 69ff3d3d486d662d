//! # Payment Order Repository
//!
//! Checkout orders, keyed by the gateway's order id. An order is written
//! once when checkout starts and read back when the payment is confirmed.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::debug;

use super::parse_money;
use crate::error::{DbError, DbResult};
use kanak_core::CheckoutOrder;

const E: &str = "CheckoutOrder";

#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    order_id: String,
    account_id: String,
    plan_id: String,
    amount: String,
    currency: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<OrderRow> for CheckoutOrder {
    type Error = DbError;

    fn try_from(row: OrderRow) -> DbResult<Self> {
        Ok(CheckoutOrder {
            amount: parse_money(E, "amount", &row.amount)?,
            order_id: row.order_id,
            account_id: row.account_id,
            plan_id: row.plan_id,
            currency: row.currency,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, Clone)]
pub struct PaymentOrderRepository {
    pool: SqlitePool,
}

impl PaymentOrderRepository {
    pub fn new(pool: SqlitePool) -> Self {
        PaymentOrderRepository { pool }
    }

    /// Records a new order. A repeated order id is a `UniqueViolation`.
    pub async fn insert(&self, order: &CheckoutOrder) -> DbResult<()> {
        debug!(order_id = %order.order_id, plan = %order.plan_id, "Recording checkout order");
        sqlx::query(
            r#"
            INSERT INTO payment_orders (
                order_id, account_id, plan_id, amount, currency, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(&order.order_id)
        .bind(&order.account_id)
        .bind(&order.plan_id)
        .bind(order.amount.amount().to_string())
        .bind(&order.currency)
        .bind(order.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn get_by_id(&self, order_id: &str) -> DbResult<Option<CheckoutOrder>> {
        let row: Option<OrderRow> = sqlx::query_as(
            "SELECT order_id, account_id, plan_id, amount, currency, created_at
             FROM payment_orders WHERE order_id = ?1",
        )
        .bind(order_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(CheckoutOrder::try_from).transpose()
    }
}

//! `PostgreSQL` order store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, QueryBuilder};

use order_portal_core::{OrderId, OrderStatus, UserId};

use super::{OrderFilter, OrderStore, StoreError, map_unique_violation};
use crate::models::{NewOrder, Order};

const ORDER_COLUMNS: &str = "id, user_id, account_ref, order_id, sku, details, notes, \
     handler_name, tracking_id, process_id, buy_price, sell_price, refund_amount, \
     net_profit, roi, status, is_deleted, created_at, updated_at";

/// Internal row type for `PostgreSQL` order queries.
#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: i32,
    user_id: i32,
    account_ref: String,
    order_id: String,
    sku: Option<String>,
    details: Option<String>,
    notes: Option<String>,
    handler_name: Option<String>,
    tracking_id: Option<String>,
    process_id: Option<String>,
    buy_price: Decimal,
    sell_price: Decimal,
    refund_amount: Decimal,
    net_profit: Decimal,
    roi: Decimal,
    status: String,
    is_deleted: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<OrderRow> for Order {
    type Error = StoreError;

    fn try_from(row: OrderRow) -> Result<Self, Self::Error> {
        let status: OrderStatus = row
            .status
            .parse()
            .map_err(|e: String| StoreError::Corrupt(e))?;

        Ok(Self {
            id: OrderId::new(row.id),
            user_id: UserId::new(row.user_id),
            account_ref: row.account_ref,
            order_id: row.order_id,
            sku: row.sku,
            details: row.details,
            notes: row.notes,
            handler_name: row.handler_name,
            tracking_id: row.tracking_id,
            process_id: row.process_id,
            buy_price: row.buy_price,
            sell_price: row.sell_price,
            refund_amount: row.refund_amount,
            net_profit: row.net_profit,
            roi: row.roi,
            status,
            is_deleted: row.is_deleted,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Order store backed by `PostgreSQL`.
#[derive(Clone)]
pub struct PgOrderStore {
    pool: PgPool,
}

impl PgOrderStore {
    /// Create a new order store on the given pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl OrderStore for PgOrderStore {
    async fn insert(&self, order: NewOrder) -> Result<Order, StoreError> {
        let sql = format!(
            "INSERT INTO portal_order \
                 (user_id, account_ref, order_id, sku, details, notes, handler_name, \
                  tracking_id, process_id, buy_price, sell_price, refund_amount, \
                  net_profit, roi, status) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15) \
             RETURNING {ORDER_COLUMNS}"
        );

        let row = sqlx::query_as::<_, OrderRow>(&sql)
            .bind(order.user_id.as_i32())
            .bind(&order.account_ref)
            .bind(&order.order_id)
            .bind(&order.sku)
            .bind(&order.details)
            .bind(&order.notes)
            .bind(&order.handler_name)
            .bind(&order.tracking_id)
            .bind(&order.process_id)
            .bind(order.buy_price)
            .bind(order.sell_price)
            .bind(order.refund_amount)
            .bind(order.net_profit)
            .bind(order.roi)
            .bind(order.status.to_string())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_unique_violation(e, "order id already exists for this account"))?;

        row.try_into()
    }

    async fn find(&self, owner: UserId, id: OrderId) -> Result<Option<Order>, StoreError> {
        let sql =
            format!("SELECT {ORDER_COLUMNS} FROM portal_order WHERE id = $1 AND user_id = $2");

        let row = sqlx::query_as::<_, OrderRow>(&sql)
            .bind(id.as_i32())
            .bind(owner.as_i32())
            .fetch_optional(&self.pool)
            .await?;

        row.map(TryInto::try_into).transpose()
    }

    async fn find_by_order_id(
        &self,
        owner: UserId,
        order_id: &str,
        account: Option<&str>,
    ) -> Result<Option<Order>, StoreError> {
        let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(format!(
            "SELECT {ORDER_COLUMNS} FROM portal_order WHERE user_id = "
        ));
        qb.push_bind(owner.as_i32());
        qb.push(" AND order_id = ").push_bind(order_id);
        if let Some(account) = account {
            qb.push(" AND account_ref = ").push_bind(account);
        }
        qb.push(" LIMIT 1");

        let row = qb
            .build_query_as::<OrderRow>()
            .fetch_optional(&self.pool)
            .await?;

        row.map(TryInto::try_into).transpose()
    }

    async fn update(&self, order: &Order) -> Result<(), StoreError> {
        let result = sqlx::query(
            "UPDATE portal_order \
             SET account_ref = $3, order_id = $4, sku = $5, details = $6, notes = $7, \
                 handler_name = $8, tracking_id = $9, process_id = $10, buy_price = $11, \
                 sell_price = $12, refund_amount = $13, net_profit = $14, roi = $15, \
                 status = $16, is_deleted = $17, updated_at = NOW() \
             WHERE id = $1 AND user_id = $2",
        )
        .bind(order.id.as_i32())
        .bind(order.user_id.as_i32())
        .bind(&order.account_ref)
        .bind(&order.order_id)
        .bind(&order.sku)
        .bind(&order.details)
        .bind(&order.notes)
        .bind(&order.handler_name)
        .bind(&order.tracking_id)
        .bind(&order.process_id)
        .bind(order.buy_price)
        .bind(order.sell_price)
        .bind(order.refund_amount)
        .bind(order.net_profit)
        .bind(order.roi)
        .bind(order.status.to_string())
        .bind(order.is_deleted)
        .execute(&self.pool)
        .await
        .map_err(|e| map_unique_violation(e, "order id already exists for this account"))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }

        Ok(())
    }

    async fn delete(&self, owner: UserId, id: OrderId) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM portal_order WHERE id = $1 AND user_id = $2")
            .bind(id.as_i32())
            .bind(owner.as_i32())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_many(&self, owner: UserId, ids: &[OrderId]) -> Result<u64, StoreError> {
        let ids: Vec<i32> = ids.iter().map(OrderId::as_i32).collect();

        let result = sqlx::query("DELETE FROM portal_order WHERE id = ANY($1) AND user_id = $2")
            .bind(&ids)
            .bind(owner.as_i32())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    async fn list(&self, filter: &OrderFilter) -> Result<Vec<Order>, StoreError> {
        let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(format!(
            "SELECT {ORDER_COLUMNS} FROM portal_order WHERE user_id = "
        ));
        qb.push_bind(filter.owner.as_i32());
        qb.push(" AND is_deleted = ").push_bind(filter.deleted);
        if let Some(account) = &filter.account {
            qb.push(" AND account_ref = ").push_bind(account);
        }
        if let Some(window) = filter.created {
            qb.push(" AND created_at >= ").push_bind(window.start);
            if let Some(end) = window.end {
                qb.push(" AND created_at < ").push_bind(end);
            }
        }
        qb.push(" ORDER BY created_at DESC");

        let rows = qb
            .build_query_as::<OrderRow>()
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }
}

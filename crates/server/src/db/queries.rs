//! `PostgreSQL` query store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, QueryBuilder};

use order_portal_core::{QueryId, QueryStatus, UserId};

use super::{QueryFilter, QueryStore, StoreError};
use crate::models::{NewQuery, Query};

const QUERY_COLUMNS: &str = "id, user_id, account_ref, order_id, sku, details, message, \
     answer, handler_name, status, expires_at, notified_expire, created_at, updated_at";

/// Internal row type for `PostgreSQL` query queries.
#[derive(Debug, sqlx::FromRow)]
struct QueryRow {
    id: i32,
    user_id: i32,
    account_ref: String,
    order_id: Option<String>,
    sku: String,
    details: String,
    message: Option<String>,
    answer: Option<String>,
    handler_name: Option<String>,
    status: String,
    expires_at: Option<DateTime<Utc>>,
    notified_expire: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<QueryRow> for Query {
    type Error = StoreError;

    fn try_from(row: QueryRow) -> Result<Self, Self::Error> {
        let status: QueryStatus = row
            .status
            .parse()
            .map_err(|e: String| StoreError::Corrupt(e))?;

        Ok(Self {
            id: QueryId::new(row.id),
            user_id: UserId::new(row.user_id),
            account_ref: row.account_ref,
            order_id: row.order_id,
            sku: row.sku,
            details: row.details,
            message: row.message,
            answer: row.answer,
            handler_name: row.handler_name,
            status,
            expires_at: row.expires_at,
            notified_expire: row.notified_expire,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Query store backed by `PostgreSQL`.
#[derive(Clone)]
pub struct PgQueryStore {
    pool: PgPool,
}

impl PgQueryStore {
    /// Create a new query store on the given pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl QueryStore for PgQueryStore {
    async fn insert(&self, query: NewQuery) -> Result<Query, StoreError> {
        let sql = format!(
            "INSERT INTO query \
                 (user_id, account_ref, order_id, sku, details, message, answer, \
                  handler_name, status, expires_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) \
             RETURNING {QUERY_COLUMNS}"
        );

        let row = sqlx::query_as::<_, QueryRow>(&sql)
            .bind(query.user_id.as_i32())
            .bind(&query.account_ref)
            .bind(&query.order_id)
            .bind(&query.sku)
            .bind(&query.details)
            .bind(&query.message)
            .bind(&query.answer)
            .bind(&query.handler_name)
            .bind(query.status.to_string())
            .bind(query.expires_at)
            .fetch_one(&self.pool)
            .await?;

        row.try_into()
    }

    async fn find(&self, owner: UserId, id: QueryId) -> Result<Option<Query>, StoreError> {
        let sql = format!("SELECT {QUERY_COLUMNS} FROM query WHERE id = $1 AND user_id = $2");

        let row = sqlx::query_as::<_, QueryRow>(&sql)
            .bind(id.as_i32())
            .bind(owner.as_i32())
            .fetch_optional(&self.pool)
            .await?;

        row.map(TryInto::try_into).transpose()
    }

    async fn update(&self, query: &Query) -> Result<(), StoreError> {
        let result = sqlx::query(
            "UPDATE query \
             SET account_ref = $3, order_id = $4, sku = $5, details = $6, message = $7, \
                 answer = $8, handler_name = $9, status = $10, expires_at = $11, \
                 notified_expire = $12, updated_at = NOW() \
             WHERE id = $1 AND user_id = $2",
        )
        .bind(query.id.as_i32())
        .bind(query.user_id.as_i32())
        .bind(&query.account_ref)
        .bind(&query.order_id)
        .bind(&query.sku)
        .bind(&query.details)
        .bind(&query.message)
        .bind(&query.answer)
        .bind(&query.handler_name)
        .bind(query.status.to_string())
        .bind(query.expires_at)
        .bind(query.notified_expire)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }

        Ok(())
    }

    async fn delete(&self, owner: UserId, id: QueryId) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM query WHERE id = $1 AND user_id = $2")
            .bind(id.as_i32())
            .bind(owner.as_i32())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn list(&self, filter: &QueryFilter) -> Result<Vec<Query>, StoreError> {
        let mut qb: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {QUERY_COLUMNS} FROM query WHERE user_id = "));
        qb.push_bind(filter.owner.as_i32());
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
            .build_query_as::<QueryRow>()
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn find_expiring(
        &self,
        cutoff: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<Query>, StoreError> {
        let sql = format!(
            "SELECT {QUERY_COLUMNS} FROM query \
             WHERE expires_at IS NOT NULL AND expires_at <= $1 AND notified_expire = FALSE \
             ORDER BY expires_at ASC \
             LIMIT $2"
        );

        let rows = sqlx::query_as::<_, QueryRow>(&sql)
            .bind(cutoff)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn mark_notified(&self, id: QueryId) -> Result<bool, StoreError> {
        let result = sqlx::query(
            "UPDATE query SET notified_expire = TRUE, updated_at = NOW() \
             WHERE id = $1 AND notified_expire = FALSE",
        )
        .bind(id.as_i32())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}

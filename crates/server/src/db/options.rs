//! Handler-option repository.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use order_portal_core::HandlerOptionId;

use super::{StoreError, map_unique_violation};
use crate::models::HandlerOption;

/// Internal row type for handler-option queries.
#[derive(Debug, sqlx::FromRow)]
struct HandlerOptionRow {
    id: i32,
    name: String,
    created_at: DateTime<Utc>,
}

impl From<HandlerOptionRow> for HandlerOption {
    fn from(row: HandlerOptionRow) -> Self {
        Self {
            id: HandlerOptionId::new(row.id),
            name: row.name,
            created_at: row.created_at,
        }
    }
}

/// Repository for the global handler-name option list.
pub struct HandlerOptionRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> HandlerOptionRepository<'a> {
    /// Create a new handler-option repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List all handler options, alphabetically.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Database` if the query fails.
    pub async fn list(&self) -> Result<Vec<HandlerOption>, StoreError> {
        let rows = sqlx::query_as::<_, HandlerOptionRow>(
            "SELECT id, name, created_at FROM handler_option ORDER BY name ASC",
        )
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Add a handler option.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Duplicate` if the name already exists.
    pub async fn insert(&self, name: &str) -> Result<HandlerOption, StoreError> {
        let row = sqlx::query_as::<_, HandlerOptionRow>(
            "INSERT INTO handler_option (name) VALUES ($1) RETURNING id, name, created_at",
        )
        .bind(name)
        .fetch_one(self.pool)
        .await
        .map_err(|e| map_unique_violation(e, "handler already exists"))?;

        Ok(row.into())
    }

    /// Remove a handler option. Unknown ids are ignored.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Database` if the delete fails.
    pub async fn delete(&self, id: HandlerOptionId) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM handler_option WHERE id = $1")
            .bind(id.as_i32())
            .execute(self.pool)
            .await?;

        Ok(())
    }
}

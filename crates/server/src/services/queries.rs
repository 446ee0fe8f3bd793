//! Buyer query service.
//!
//! Creation snapshots the linked order's sku/details into the query; the
//! snapshot is captured once and never refreshed from the order. Updating a
//! query's expiry re-arms its notification: a rescheduled deadline must
//! notify again, so `notified_expire` drops back to false whenever
//! `expires_at` changes.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer};

use order_portal_core::{QueryId, QueryStatus, UserId};

use crate::db::{OrderStore, QueryFilter, QueryStore};
use crate::error::AppError;
use crate::models::{NewQuery, Query};

/// Fallback for snapshot fields when the linked order has no value.
const SNAPSHOT_FALLBACK: &str = "N/A";

/// Request to create a query.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateQuery {
    #[serde(default)]
    pub account_ref: Option<String>,
    #[serde(default)]
    pub order_id: Option<String>,
    #[serde(default)]
    pub sku: Option<String>,
    #[serde(default)]
    pub details: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub answer: Option<String>,
    #[serde(default)]
    pub handler_name: Option<String>,
    #[serde(default)]
    pub status: Option<QueryStatus>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

/// Request to update a query. Absent fields keep their stored values;
/// `expiresAt` distinguishes "absent" from an explicit null, which clears
/// the deadline.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateQuery {
    #[serde(default)]
    pub order_id: Option<String>,
    #[serde(default)]
    pub sku: Option<String>,
    #[serde(default)]
    pub details: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub answer: Option<String>,
    #[serde(default)]
    pub handler_name: Option<String>,
    #[serde(default)]
    pub status: Option<QueryStatus>,
    #[serde(default, deserialize_with = "double_option")]
    pub expires_at: Option<Option<DateTime<Utc>>>,
}

/// Deserialize a field so that an absent key yields `None` while an explicit
/// `null` yields `Some(None)`.
fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Deserialize::deserialize(deserializer).map(Some)
}

/// Buyer query service.
pub struct QueryService {
    queries: Arc<dyn QueryStore>,
    orders: Arc<dyn OrderStore>,
}

impl QueryService {
    /// Create a new query service.
    #[must_use]
    pub fn new(queries: Arc<dyn QueryStore>, orders: Arc<dyn OrderStore>) -> Self {
        Self { queries, orders }
    }

    /// Create a query owned by `owner`.
    ///
    /// When `orderId` is given, the referenced order must exist for the same
    /// owner (and sub-account, when one is in scope); its sku/details are
    /// copied into the query at this point.
    ///
    /// # Errors
    ///
    /// Returns a validation error when the referenced order cannot be found.
    pub async fn create(
        &self,
        owner: UserId,
        scope_account: Option<&str>,
        req: CreateQuery,
    ) -> Result<Query, AppError> {
        let account_ref = req
            .account_ref
            .filter(|a| !a.is_empty())
            .or_else(|| scope_account.map(str::to_owned))
            .unwrap_or_default();

        let mut sku = req.sku;
        let mut details = req.details;

        let order_id = req.order_id.filter(|id| !id.trim().is_empty());
        if let Some(order_id) = &order_id {
            let account = (!account_ref.is_empty()).then_some(account_ref.as_str());
            let order = self
                .orders
                .find_by_order_id(owner, order_id, account)
                .await?
                .ok_or_else(|| {
                    AppError::Validation("Order ID not found for selected account".to_owned())
                })?;

            if order.sku.is_some() {
                sku = order.sku;
            }
            if order.details.is_some() {
                details = order.details;
            }
        }

        let query = self
            .queries
            .insert(NewQuery {
                user_id: owner,
                account_ref,
                order_id,
                sku: sku.unwrap_or_else(|| SNAPSHOT_FALLBACK.to_owned()),
                details: details.unwrap_or_else(|| SNAPSHOT_FALLBACK.to_owned()),
                message: req.message,
                answer: req.answer,
                handler_name: req.handler_name,
                status: req.status.unwrap_or_default(),
                expires_at: req.expires_at,
            })
            .await?;

        tracing::info!(query_id = %query.id, expires_at = ?query.expires_at, "Created query");

        Ok(query)
    }

    /// Update an owned query.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` when the query does not exist or belongs to a
    /// different user.
    pub async fn update(
        &self,
        owner: UserId,
        id: QueryId,
        req: UpdateQuery,
    ) -> Result<Query, AppError> {
        let mut query = self
            .queries
            .find(owner, id)
            .await?
            .ok_or_else(|| AppError::NotFound("Query not found".to_owned()))?;

        if let Some(order_id) = req.order_id {
            query.order_id = Some(order_id);
        }
        if let Some(sku) = req.sku {
            query.sku = sku;
        }
        if let Some(details) = req.details {
            query.details = details;
        }
        if let Some(message) = req.message {
            query.message = Some(message);
        }
        if let Some(answer) = req.answer {
            query.answer = Some(answer);
        }
        if let Some(handler_name) = req.handler_name {
            query.handler_name = Some(handler_name);
        }
        if let Some(status) = req.status {
            query.status = status;
        }
        if let Some(expires_at) = req.expires_at
            && expires_at != query.expires_at
        {
            // A rescheduled deadline re-arms the notification.
            query.expires_at = expires_at;
            query.notified_expire = false;
        }

        self.queries.update(&query).await?;

        Ok(query)
    }

    /// Permanently delete an owned query.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` when the query does not exist or belongs to a
    /// different user.
    pub async fn delete(&self, owner: UserId, id: QueryId) -> Result<(), AppError> {
        if !self.queries.delete(owner, id).await? {
            return Err(AppError::NotFound("Query not found".to_owned()));
        }
        Ok(())
    }

    /// List queries, newest first.
    ///
    /// # Errors
    ///
    /// Returns a store error if the listing fails.
    pub async fn list(
        &self,
        owner: UserId,
        account: Option<String>,
    ) -> Result<Vec<Query>, AppError> {
        let queries = self
            .queries
            .list(&QueryFilter {
                owner,
                account,
                created: None,
            })
            .await?;

        Ok(queries)
    }
}

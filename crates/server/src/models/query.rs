//! Buyer query domain types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use order_portal_core::{QueryId, QueryStatus, UserId};

/// A buyer query, optionally linked to one of the owner's orders.
///
/// When a query is created against an order, the order's `sku` and `details`
/// are copied in at creation time. The copy is a snapshot, not a live
/// reference: later edits to the order do not flow back into the query.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Query {
    /// Internal record ID.
    pub id: QueryId,
    /// Owning user.
    pub user_id: UserId,
    /// Sub-account this query belongs to (empty when unscoped).
    pub account_ref: String,
    /// Marketplace order identifier the query refers to, if any.
    pub order_id: Option<String>,
    /// Snapshot of the linked order's SKU, or "N/A".
    pub sku: String,
    /// Snapshot of the linked order's details, or "N/A".
    pub details: String,
    pub message: Option<String>,
    pub answer: Option<String>,
    pub handler_name: Option<String>,
    pub status: QueryStatus,
    /// Deadline after which the owner is emailed once.
    pub expires_at: Option<DateTime<Utc>>,
    /// Set to true only after a notification send has been confirmed
    /// successful; a false value with a due `expires_at` means the next
    /// sweep will (re)try.
    pub notified_expire: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A fully validated query ready for insertion.
#[derive(Debug, Clone)]
pub struct NewQuery {
    pub user_id: UserId,
    pub account_ref: String,
    pub order_id: Option<String>,
    pub sku: String,
    pub details: String,
    pub message: Option<String>,
    pub answer: Option<String>,
    pub handler_name: Option<String>,
    pub status: QueryStatus,
    pub expires_at: Option<DateTime<Utc>>,
}

//! Order domain types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use order_portal_core::{OrderId, OrderStatus, UserId};

/// A marketplace order owned by exactly one portal user.
///
/// `net_profit` and `roi` are derived from the money inputs and are never
/// accepted from callers; the order service recomputes them whenever a money
/// input changes.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    /// Internal record ID.
    pub id: OrderId,
    /// Owning user. Never changes, even under admin impersonation.
    pub user_id: UserId,
    /// Sub-account this order belongs to (empty when unscoped).
    pub account_ref: String,
    /// Marketplace order identifier, unique per (user, sub-account).
    pub order_id: String,
    pub sku: Option<String>,
    pub details: Option<String>,
    pub notes: Option<String>,
    pub handler_name: Option<String>,
    pub tracking_id: Option<String>,
    pub process_id: Option<String>,
    pub buy_price: Decimal,
    pub sell_price: Decimal,
    pub refund_amount: Decimal,
    /// Derived: sell - buy - refund.
    pub net_profit: Decimal,
    /// Derived: percentage return on the buy price, two decimal places.
    pub roi: Decimal,
    pub status: OrderStatus,
    /// Soft-delete flag; trashed orders are recoverable until purged.
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A fully validated order ready for insertion.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub user_id: UserId,
    pub account_ref: String,
    pub order_id: String,
    pub sku: Option<String>,
    pub details: Option<String>,
    pub notes: Option<String>,
    pub handler_name: Option<String>,
    pub tracking_id: Option<String>,
    pub process_id: Option<String>,
    pub buy_price: Decimal,
    pub sell_price: Decimal,
    pub refund_amount: Decimal,
    pub net_profit: Decimal,
    pub roi: Decimal,
    pub status: OrderStatus,
}

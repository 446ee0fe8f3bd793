//! Order lifecycle service.
//!
//! Owns the soft-delete state machine (active -> trashed -> active | gone)
//! and the derived-field rule: `net_profit` and `roi` are recomputed from
//! the money inputs on every create and on every update, merging unspecified
//! inputs from the stored record. Request types deliberately have no derived
//! fields, so callers cannot supply them.

use std::sync::Arc;

use rust_decimal::Decimal;
use serde::Deserialize;

use order_portal_core::{OrderId, OrderStatus, UserId, profit_and_roi};

use crate::db::{OrderFilter, OrderStore};
use crate::error::AppError;
use crate::models::{NewOrder, Order};

/// Request to create an order.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrder {
    #[serde(default)]
    pub account_ref: Option<String>,
    #[serde(default)]
    pub order_id: Option<String>,
    #[serde(default)]
    pub sku: Option<String>,
    #[serde(default)]
    pub details: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub handler_name: Option<String>,
    #[serde(default)]
    pub tracking_id: Option<String>,
    #[serde(default)]
    pub process_id: Option<String>,
    #[serde(default)]
    pub buy_price: Option<Decimal>,
    #[serde(default)]
    pub sell_price: Option<Decimal>,
    #[serde(default)]
    pub refund_amount: Option<Decimal>,
    #[serde(default)]
    pub status: Option<OrderStatus>,
}

/// Request to update an order. Absent fields keep their stored values.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateOrder {
    #[serde(default)]
    pub sku: Option<String>,
    #[serde(default)]
    pub details: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub handler_name: Option<String>,
    #[serde(default)]
    pub tracking_id: Option<String>,
    #[serde(default)]
    pub process_id: Option<String>,
    #[serde(default)]
    pub buy_price: Option<Decimal>,
    #[serde(default)]
    pub sell_price: Option<Decimal>,
    #[serde(default)]
    pub refund_amount: Option<Decimal>,
    #[serde(default)]
    pub status: Option<OrderStatus>,
}

/// Order lifecycle service.
pub struct OrderService {
    store: Arc<dyn OrderStore>,
}

impl OrderService {
    /// Create a new order service.
    #[must_use]
    pub fn new(store: Arc<dyn OrderStore>) -> Self {
        Self { store }
    }

    /// Create an order owned by `owner`.
    ///
    /// # Errors
    ///
    /// Returns a validation error when the order id or a money input is
    /// missing, and a duplicate-key error when (owner, account, order id)
    /// already exists.
    pub async fn create(&self, owner: UserId, req: CreateOrder) -> Result<Order, AppError> {
        let order_id = req
            .order_id
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| AppError::Validation("orderId is required".to_owned()))?
            .to_owned();

        let buy_price = req
            .buy_price
            .ok_or_else(|| AppError::Validation("buyPrice is required".to_owned()))?;
        let sell_price = req
            .sell_price
            .ok_or_else(|| AppError::Validation("sellPrice is required".to_owned()))?;
        let refund_amount = req.refund_amount.unwrap_or(Decimal::ZERO);

        let breakdown = profit_and_roi(buy_price, sell_price, refund_amount);

        let order = self
            .store
            .insert(NewOrder {
                user_id: owner,
                account_ref: req.account_ref.unwrap_or_default(),
                order_id,
                sku: req.sku,
                details: req.details,
                notes: req.notes,
                handler_name: req.handler_name,
                tracking_id: req.tracking_id,
                process_id: req.process_id,
                buy_price,
                sell_price,
                refund_amount,
                net_profit: breakdown.net_profit,
                roi: breakdown.roi,
                status: req.status.unwrap_or_default(),
            })
            .await?;

        Ok(order)
    }

    /// Update an owned order, recomputing derived fields from the merged
    /// money inputs.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` when the order does not exist or belongs to a
    /// different user.
    pub async fn update(
        &self,
        owner: UserId,
        id: OrderId,
        req: UpdateOrder,
    ) -> Result<Order, AppError> {
        let mut order = self
            .store
            .find(owner, id)
            .await?
            .ok_or_else(|| AppError::NotFound("Order not found".to_owned()))?;

        if let Some(sku) = req.sku {
            order.sku = Some(sku);
        }
        if let Some(details) = req.details {
            order.details = Some(details);
        }
        if let Some(notes) = req.notes {
            order.notes = Some(notes);
        }
        if let Some(handler_name) = req.handler_name {
            order.handler_name = Some(handler_name);
        }
        if let Some(tracking_id) = req.tracking_id {
            order.tracking_id = Some(tracking_id);
        }
        if let Some(process_id) = req.process_id {
            order.process_id = Some(process_id);
        }
        if let Some(status) = req.status {
            order.status = status;
        }

        order.buy_price = req.buy_price.unwrap_or(order.buy_price);
        order.sell_price = req.sell_price.unwrap_or(order.sell_price);
        order.refund_amount = req.refund_amount.unwrap_or(order.refund_amount);

        let breakdown = profit_and_roi(order.buy_price, order.sell_price, order.refund_amount);
        order.net_profit = breakdown.net_profit;
        order.roi = breakdown.roi;

        self.store.update(&order).await?;

        Ok(order)
    }

    /// Move an owned order to the trash (recoverable).
    ///
    /// # Errors
    ///
    /// Returns `NotFound` when the order does not exist or belongs to a
    /// different user.
    pub async fn soft_delete(&self, owner: UserId, id: OrderId) -> Result<(), AppError> {
        let mut order = self
            .store
            .find(owner, id)
            .await?
            .ok_or_else(|| AppError::NotFound("Order not found".to_owned()))?;

        order.is_deleted = true;
        self.store.update(&order).await?;

        Ok(())
    }

    /// Restore an owned order from the trash.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` when the order does not exist or belongs to a
    /// different user.
    pub async fn restore(&self, owner: UserId, id: OrderId) -> Result<Order, AppError> {
        let mut order = self
            .store
            .find(owner, id)
            .await?
            .ok_or_else(|| AppError::NotFound("Order not found".to_owned()))?;

        order.is_deleted = false;
        self.store.update(&order).await?;

        Ok(order)
    }

    /// Permanently delete one owned order. Irreversible.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` when the order does not exist or belongs to a
    /// different user.
    pub async fn purge(&self, owner: UserId, id: OrderId) -> Result<(), AppError> {
        if !self.store.delete(owner, id).await? {
            return Err(AppError::NotFound("Order not found".to_owned()));
        }
        Ok(())
    }

    /// Permanently delete a batch of orders. Ids that do not exist or belong
    /// to other users are skipped silently; returns the number removed.
    ///
    /// # Errors
    ///
    /// Returns a validation error for an empty id list.
    pub async fn purge_many(&self, owner: UserId, ids: &[OrderId]) -> Result<u64, AppError> {
        if ids.is_empty() {
            return Err(AppError::Validation("No order IDs provided".to_owned()));
        }

        Ok(self.store.delete_many(owner, ids).await?)
    }

    /// List active orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns a store error if the listing fails.
    pub async fn list(&self, owner: UserId, account: Option<String>) -> Result<Vec<Order>, AppError> {
        let orders = self
            .store
            .list(&OrderFilter {
                owner,
                account,
                deleted: false,
                created: None,
            })
            .await?;

        Ok(orders)
    }

    /// List trashed orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns a store error if the listing fails.
    pub async fn list_deleted(
        &self,
        owner: UserId,
        account: Option<String>,
    ) -> Result<Vec<Order>, AppError> {
        let orders = self
            .store
            .list(&OrderFilter {
                owner,
                account,
                deleted: true,
                created: None,
            })
            .await?;

        Ok(orders)
    }
}

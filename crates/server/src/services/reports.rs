//! Range-filtered aggregation over orders and queries.
//!
//! The summary and charts only ever see non-deleted orders. Date windows are
//! resolved by the caller (from the `range` keyword) so the aggregation
//! itself stays deterministic.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Datelike, Local, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use order_portal_core::UserId;

use crate::db::{CreatedWindow, OrderFilter, OrderStore, QueryFilter, QueryStore};
use crate::error::AppError;
use crate::services::export::ReportTable;

/// Aggregated money figures for a set of orders.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub total_orders: usize,
    pub total_sales: Decimal,
    pub net_profit: Decimal,
    /// Mean ROI over the matched orders, e.g. "12.34%".
    #[serde(rename = "avgROI")]
    pub avg_roi: String,
}

/// One day's summed profit for the dashboard chart.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct DailyProfit {
    /// Day of month (1-31) of `created_at`.
    pub day: u32,
    pub profit: Decimal,
}

/// Reporting service over the order and query stores.
pub struct ReportService {
    orders: Arc<dyn OrderStore>,
    queries: Arc<dyn QueryStore>,
}

impl ReportService {
    /// Create a new report service.
    #[must_use]
    pub fn new(orders: Arc<dyn OrderStore>, queries: Arc<dyn QueryStore>) -> Self {
        Self { orders, queries }
    }

    /// Profit/ROI summary over non-deleted orders in the window.
    ///
    /// # Errors
    ///
    /// Returns a store error if the listing fails.
    pub async fn summary(
        &self,
        owner: UserId,
        account: Option<String>,
        window: Option<CreatedWindow>,
    ) -> Result<Summary, AppError> {
        let orders = self
            .orders
            .list(&OrderFilter {
                owner,
                account,
                deleted: false,
                created: window,
            })
            .await?;

        let total_sales: Decimal = orders.iter().map(|o| o.sell_price).sum();
        let net_profit: Decimal = orders.iter().map(|o| o.net_profit).sum();
        let avg_roi = if orders.is_empty() {
            Decimal::ZERO
        } else {
            let count = Decimal::from(orders.len());
            (orders.iter().map(|o| o.roi).sum::<Decimal>() / count).round_dp(2)
        };

        Ok(Summary {
            total_orders: orders.len(),
            total_sales,
            net_profit,
            avg_roi: format!("{avg_roi:.2}%"),
        })
    }

    /// Net profit per day-of-month over non-deleted orders in the window,
    /// ascending by day.
    ///
    /// # Errors
    ///
    /// Returns a store error if the listing fails.
    pub async fn profit_by_day(
        &self,
        owner: UserId,
        account: Option<String>,
        window: Option<CreatedWindow>,
    ) -> Result<Vec<DailyProfit>, AppError> {
        let orders = self
            .orders
            .list(&OrderFilter {
                owner,
                account,
                deleted: false,
                created: window,
            })
            .await?;

        let mut by_day: BTreeMap<u32, Decimal> = BTreeMap::new();
        for order in &orders {
            *by_day.entry(order.created_at.day()).or_default() += order.net_profit;
        }

        Ok(by_day
            .into_iter()
            .map(|(day, profit)| DailyProfit { day, profit })
            .collect())
    }

    /// Non-deleted orders in the window as an export table, newest first.
    ///
    /// # Errors
    ///
    /// Returns a store error if the listing fails.
    pub async fn orders_table(
        &self,
        owner: UserId,
        account: Option<String>,
        window: Option<CreatedWindow>,
    ) -> Result<ReportTable, AppError> {
        let orders = self
            .orders
            .list(&OrderFilter {
                owner,
                account,
                deleted: false,
                created: window,
            })
            .await?;

        let rows = orders
            .iter()
            .enumerate()
            .map(|(idx, o)| {
                let (date, time) = local_date_time(o.created_at);
                vec![
                    (idx + 1).to_string(),
                    o.order_id.clone(),
                    o.sku.clone().unwrap_or_default(),
                    o.details.clone().unwrap_or_default(),
                    o.process_id.clone().unwrap_or_default(),
                    o.tracking_id.clone().unwrap_or_default(),
                    o.buy_price.to_string(),
                    o.sell_price.to_string(),
                    o.net_profit.to_string(),
                    o.status.to_string(),
                    date,
                    time,
                ]
            })
            .collect();

        Ok(ReportTable {
            name: "Orders",
            header: vec![
                "NO", "OrderID", "SKU", "Details", "ProcessID", "TrackingID", "Buy", "Sell",
                "Profit", "Status", "Date", "Time",
            ],
            rows,
        })
    }

    /// Queries in the window as an export table, newest first.
    ///
    /// # Errors
    ///
    /// Returns a store error if the listing fails.
    pub async fn queries_table(
        &self,
        owner: UserId,
        account: Option<String>,
        window: Option<CreatedWindow>,
    ) -> Result<ReportTable, AppError> {
        let queries = self
            .queries
            .list(&QueryFilter {
                owner,
                account,
                created: window,
            })
            .await?;

        let rows = queries
            .iter()
            .enumerate()
            .map(|(idx, q)| {
                let (date, time) = local_date_time(q.created_at);
                vec![
                    (idx + 1).to_string(),
                    q.order_id.clone().unwrap_or_default(),
                    q.sku.clone(),
                    q.message.clone().unwrap_or_default(),
                    q.handler_name.clone().unwrap_or_default(),
                    q.status.to_string(),
                    date,
                    time,
                ]
            })
            .collect();

        Ok(ReportTable {
            name: "Queries",
            header: vec![
                "NO", "OrderID", "SKU", "Message", "Handler", "Status", "Date", "Time",
            ],
            rows,
        })
    }
}

/// Render a timestamp as local (date, time) strings for report rows.
fn local_date_time(at: DateTime<Utc>) -> (String, String) {
    let local = at.with_timezone(&Local);
    (
        local.format("%Y-%m-%d").to_string(),
        local.format("%H:%M:%S").to_string(),
    )
}

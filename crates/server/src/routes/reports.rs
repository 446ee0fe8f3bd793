//! Reporting route handlers.
//!
//! The export endpoints stream whatever the configured [`ReportSink`]
//! produces and only add attachment headers around it.

use axum::{
    Json, Router,
    extract::{Query, State},
    http::header,
    response::IntoResponse,
    routing::get,
};
use chrono::Local;
use serde::Deserialize;

use order_portal_core::ReportRange;

use crate::db::CreatedWindow;
use crate::error::AppError;
use crate::middleware::Scope;
use crate::services::export::{ReportSink, ReportTable};
use crate::services::reports::{DailyProfit, Summary};
use crate::state::AppState;

/// Build the reports router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(summary))
        .route("/orders", get(export_orders))
        .route("/queries", get(export_queries))
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ReportParams {
    /// Date-range keyword (`1d`, `2d`, `week`, `month`, `year`, `yesterday`).
    /// Unknown keywords mean "no range filter".
    range: Option<String>,
}

impl ReportParams {
    /// Resolve the range keyword against the local clock.
    fn window(&self) -> Option<CreatedWindow> {
        let range = self.range.as_deref().and_then(ReportRange::parse)?;
        let (start, end) = range.window_ending(Local::now());
        Some(CreatedWindow { start, end })
    }
}

/// Profit/ROI summary over the effective owner's non-deleted orders.
///
/// # Errors
///
/// Returns 500 if the store is unreachable.
pub async fn summary(
    State(state): State<AppState>,
    scope: Scope,
    Query(params): Query<ReportParams>,
) -> Result<Json<Summary>, AppError> {
    let summary = state
        .reports()
        .summary(scope.owner, scope.account, params.window())
        .await?;

    Ok(Json(summary))
}

/// Net profit per day of month for the dashboard chart.
///
/// # Errors
///
/// Returns 500 if the store is unreachable.
pub async fn profit_chart(
    State(state): State<AppState>,
    scope: Scope,
    Query(params): Query<ReportParams>,
) -> Result<Json<Vec<DailyProfit>>, AppError> {
    let days = state
        .reports()
        .profit_by_day(scope.owner, scope.account, params.window())
        .await?;

    Ok(Json(days))
}

/// Download the effective owner's orders as a report attachment.
///
/// # Errors
///
/// Returns 500 if the store is unreachable.
pub async fn export_orders(
    State(state): State<AppState>,
    scope: Scope,
    Query(params): Query<ReportParams>,
) -> Result<impl IntoResponse, AppError> {
    let table = state
        .reports()
        .orders_table(scope.owner, scope.account, params.window())
        .await?;

    Ok(attachment(state.sink().as_ref(), &table))
}

/// Download the effective owner's queries as a report attachment.
///
/// # Errors
///
/// Returns 500 if the store is unreachable.
pub async fn export_queries(
    State(state): State<AppState>,
    scope: Scope,
    Query(params): Query<ReportParams>,
) -> Result<impl IntoResponse, AppError> {
    let table = state
        .reports()
        .queries_table(scope.owner, scope.account, params.window())
        .await?;

    Ok(attachment(state.sink().as_ref(), &table))
}

/// Render a table through the sink and wrap it in download headers.
fn attachment(sink: &dyn ReportSink, table: &ReportTable) -> impl IntoResponse + use<> {
    let filename = format!(
        "{}-{}.{}",
        table.name.to_lowercase(),
        Local::now().format("%Y%m%d"),
        sink.extension()
    );

    (
        [
            (header::CONTENT_TYPE, sink.media_type().to_owned()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        sink.render(table),
    )
}

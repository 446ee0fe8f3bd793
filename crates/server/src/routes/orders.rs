//! Order route handlers.
//!
//! Thin glue over [`crate::services::OrderService`]: every handler resolves
//! the effective owner through [`Scope`] and passes it down, so store access
//! is always owner-scoped.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, post, put},
};
use serde::Deserialize;
use serde_json::{Value, json};

use order_portal_core::OrderId;

use crate::error::AppError;
use crate::middleware::Scope;
use crate::models::Order;
use crate::services::orders::{CreateOrder, UpdateOrder};
use crate::state::AppState;

/// Build the orders router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create).get(list))
        .route("/deleted", get(list_deleted))
        .route("/{id}", put(update).delete(soft_delete))
        .route("/{id}/restore", put(restore))
        .route("/{id}/permanent", delete(purge))
        .route("/delete-multiple", post(purge_many))
}

/// Create an order for the effective owner.
///
/// # Errors
///
/// Returns 400 for missing order id or money inputs and 409 when the order
/// id is already used within the sub-account.
pub async fn create(
    State(state): State<AppState>,
    scope: Scope,
    Json(mut req): Json<CreateOrder>,
) -> Result<(StatusCode, Json<Order>), AppError> {
    if req.account_ref.as_deref().is_none_or(str::is_empty) {
        req.account_ref = scope.account.clone();
    }

    let order = state.orders().create(scope.owner, req).await?;

    Ok((StatusCode::CREATED, Json(order)))
}

/// List the effective owner's active orders, newest first.
///
/// # Errors
///
/// Returns 500 if the store is unreachable.
pub async fn list(
    State(state): State<AppState>,
    scope: Scope,
) -> Result<Json<Vec<Order>>, AppError> {
    let orders = state.orders().list(scope.owner, scope.account).await?;

    Ok(Json(orders))
}

/// List the effective owner's trashed orders, newest first.
///
/// # Errors
///
/// Returns 500 if the store is unreachable.
pub async fn list_deleted(
    State(state): State<AppState>,
    scope: Scope,
) -> Result<Json<Vec<Order>>, AppError> {
    let orders = state
        .orders()
        .list_deleted(scope.owner, scope.account)
        .await?;

    Ok(Json(orders))
}

/// Update an order, recomputing derived money fields.
///
/// # Errors
///
/// Returns 404 when the order is missing or owned by someone else.
pub async fn update(
    State(state): State<AppState>,
    scope: Scope,
    Path(id): Path<OrderId>,
    Json(req): Json<UpdateOrder>,
) -> Result<Json<Order>, AppError> {
    let order = state.orders().update(scope.owner, id, req).await?;

    Ok(Json(order))
}

/// Move an order to the trash.
///
/// # Errors
///
/// Returns 404 when the order is missing or owned by someone else.
pub async fn soft_delete(
    State(state): State<AppState>,
    scope: Scope,
    Path(id): Path<OrderId>,
) -> Result<Json<Value>, AppError> {
    state.orders().soft_delete(scope.owner, id).await?;

    Ok(Json(json!({ "message": "Order moved to trash" })))
}

/// Restore an order from the trash.
///
/// # Errors
///
/// Returns 404 when the order is missing or owned by someone else.
pub async fn restore(
    State(state): State<AppState>,
    scope: Scope,
    Path(id): Path<OrderId>,
) -> Result<Json<Order>, AppError> {
    let order = state.orders().restore(scope.owner, id).await?;

    Ok(Json(order))
}

/// Permanently delete one order. Irreversible.
///
/// # Errors
///
/// Returns 404 when the order is missing or owned by someone else.
pub async fn purge(
    State(state): State<AppState>,
    scope: Scope,
    Path(id): Path<OrderId>,
) -> Result<Json<Value>, AppError> {
    state.orders().purge(scope.owner, id).await?;

    Ok(Json(json!({ "message": "Order permanently deleted" })))
}

#[derive(Debug, Deserialize)]
struct PurgeMany {
    ids: Vec<OrderId>,
}

/// Permanently delete a batch of orders. Ids that are unknown or belong to
/// other users are skipped; the response reports how many were removed.
///
/// # Errors
///
/// Returns 400 for an empty id list.
async fn purge_many(
    State(state): State<AppState>,
    scope: Scope,
    Json(req): Json<PurgeMany>,
) -> Result<Json<Value>, AppError> {
    let deleted = state.orders().purge_many(scope.owner, &req.ids).await?;

    Ok(Json(json!({ "deletedCount": deleted })))
}

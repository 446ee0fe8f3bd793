//! Query route handlers.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{post, put},
};
use serde_json::{Value, json};

use order_portal_core::QueryId;

use crate::error::AppError;
use crate::middleware::Scope;
use crate::models::Query;
use crate::services::queries::{CreateQuery, UpdateQuery};
use crate::state::AppState;

/// Build the queries router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create).get(list))
        .route("/{id}", put(update).delete(delete_query))
}

/// Create a query for the effective owner. When the body names an order id,
/// the order's sku/details are snapshotted into the query.
///
/// # Errors
///
/// Returns 400 when the referenced order does not exist for the owner.
pub async fn create(
    State(state): State<AppState>,
    scope: Scope,
    Json(req): Json<CreateQuery>,
) -> Result<(StatusCode, Json<Query>), AppError> {
    let query = state
        .queries()
        .create(scope.owner, scope.account.as_deref(), req)
        .await?;

    Ok((StatusCode::CREATED, Json(query)))
}

/// List the effective owner's queries, newest first.
///
/// # Errors
///
/// Returns 500 if the store is unreachable.
pub async fn list(
    State(state): State<AppState>,
    scope: Scope,
) -> Result<Json<Vec<Query>>, AppError> {
    let queries = state.queries().list(scope.owner, scope.account).await?;

    Ok(Json(queries))
}

/// Update a query. Changing `expiresAt` re-arms the expiry notification.
///
/// # Errors
///
/// Returns 404 when the query is missing or owned by someone else.
pub async fn update(
    State(state): State<AppState>,
    scope: Scope,
    Path(id): Path<QueryId>,
    Json(req): Json<UpdateQuery>,
) -> Result<Json<Query>, AppError> {
    let query = state.queries().update(scope.owner, id, req).await?;

    Ok(Json(query))
}

/// Delete a query.
///
/// # Errors
///
/// Returns 404 when the query is missing or owned by someone else.
pub async fn delete_query(
    State(state): State<AppState>,
    scope: Scope,
    Path(id): Path<QueryId>,
) -> Result<Json<Value>, AppError> {
    state.queries().delete(scope.owner, id).await?;

    Ok(Json(json!({ "message": "Query deleted" })))
}

//! Handler-option route handlers.
//!
//! The option list is global: any authenticated user may read it, only
//! admins may change it.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get},
};
use serde::Deserialize;
use serde_json::{Value, json};

use order_portal_core::HandlerOptionId;

use crate::db::HandlerOptionRepository;
use crate::error::AppError;
use crate::middleware::{CurrentUser, RequireAdmin};
use crate::models::HandlerOption;
use crate::state::AppState;

/// Build the handler-options router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list).post(add))
        .route("/{id}", delete(remove))
}

/// List all handler names, alphabetically.
///
/// # Errors
///
/// Returns 500 if the store is unreachable.
pub async fn list(
    CurrentUser(_user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<HandlerOption>>, AppError> {
    let options = HandlerOptionRepository::new(state.pool()).list().await?;

    Ok(Json(options))
}

#[derive(Debug, Deserialize)]
struct AddOption {
    name: String,
}

/// Add a handler name. Admin only.
///
/// # Errors
///
/// Returns 400 for an empty name and 409 for a duplicate.
async fn add(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Json(req): Json<AddOption>,
) -> Result<(StatusCode, Json<HandlerOption>), AppError> {
    let name = req.name.trim();
    if name.is_empty() {
        return Err(AppError::Validation("name is required".to_owned()));
    }

    let option = HandlerOptionRepository::new(state.pool())
        .insert(name)
        .await?;

    Ok((StatusCode::CREATED, Json(option)))
}

/// Remove a handler name. Admin only; unknown ids are ignored.
///
/// # Errors
///
/// Returns 500 if the store is unreachable.
async fn remove(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<HandlerOptionId>,
) -> Result<Json<Value>, AppError> {
    HandlerOptionRepository::new(state.pool())
        .delete(id)
        .await?;

    Ok(Json(json!({ "message": "Handler removed" })))
}

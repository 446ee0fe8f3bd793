//! User management route handlers. Admin only.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, put},
};
use serde::Deserialize;
use serde_json::{Value, json};

use order_portal_core::{AccountId, UserId};

use crate::error::AppError;
use crate::middleware::RequireAdmin;
use crate::models::{Account, NewAccount, UserView};
use crate::services::auth::UpdateUser;
use crate::state::AppState;

/// Build the users router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list))
        .route("/{id}", put(update).delete(delete_user))
        .route("/{id}/accounts", get(list_accounts).post(add_account))
        .route(
            "/{id}/accounts/{account_id}",
            put(update_account).delete(remove_account),
        )
}

/// List all users, newest first.
///
/// # Errors
///
/// Returns 500 if the store is unreachable.
pub async fn list(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
) -> Result<Json<Vec<UserView>>, AppError> {
    let users = state.users().list().await?;

    Ok(Json(users.iter().map(UserView::from).collect()))
}

/// Update a user's profile and credentials.
///
/// # Errors
///
/// Returns 404 for an unknown user and 409 for a taken email.
pub async fn update(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<UserId>,
    Json(req): Json<UpdateUser>,
) -> Result<Json<UserView>, AppError> {
    let user = state.auth().update_user(id, req).await?;

    Ok(Json(UserView::from(&user)))
}

/// Delete a user. Their orders, queries, sub-accounts and sessions cascade.
///
/// # Errors
///
/// Returns 404 for an unknown user.
pub async fn delete_user(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<UserId>,
) -> Result<Json<Value>, AppError> {
    if !state.users().delete(id).await? {
        return Err(AppError::NotFound("User not found".to_owned()));
    }

    Ok(Json(json!({ "message": "User deleted" })))
}

/// List a user's sub-accounts.
///
/// # Errors
///
/// Returns 404 for an unknown user.
pub async fn list_accounts(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<UserId>,
) -> Result<Json<Vec<Account>>, AppError> {
    let user = state
        .users()
        .find(id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_owned()))?;

    Ok(Json(user.accounts))
}

/// Sub-account payload for create and update.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountPayload {
    #[serde(default)]
    pub platform: Option<String>,
    #[serde(default)]
    pub account_name: Option<String>,
    #[serde(default)]
    pub account_id: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
}

/// Attach a sub-account to a user.
///
/// # Errors
///
/// Returns 400 for missing fields and 409 when the user already has this
/// (platform, account id) pair.
pub async fn add_account(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<UserId>,
    Json(req): Json<AccountPayload>,
) -> Result<(StatusCode, Json<Account>), AppError> {
    let required = |field: Option<String>, name: &str| {
        field
            .map(|s| s.trim().to_owned())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| AppError::Validation(format!("{name} is required")))
    };

    let account = state
        .users()
        .add_account(
            id,
            NewAccount {
                platform: required(req.platform, "platform")?,
                account_name: required(req.account_name, "accountName")?,
                account_id: required(req.account_id, "accountId")?,
                image: req.image.unwrap_or_default(),
            },
        )
        .await?;

    Ok((StatusCode::CREATED, Json(account)))
}

/// Update a sub-account. Absent fields keep their stored values.
///
/// # Errors
///
/// Returns 404 when the account is missing or belongs to another user.
pub async fn update_account(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Path((id, account_id)): Path<(UserId, AccountId)>,
    Json(req): Json<AccountPayload>,
) -> Result<Json<Account>, AppError> {
    let user = state
        .users()
        .find(id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_owned()))?;

    let mut account = user
        .accounts
        .into_iter()
        .find(|a| a.id == account_id)
        .ok_or_else(|| AppError::NotFound("Account not found".to_owned()))?;

    if let Some(platform) = req.platform {
        account.platform = platform;
    }
    if let Some(account_name) = req.account_name {
        account.account_name = account_name;
    }
    if let Some(ext_id) = req.account_id {
        account.account_id = ext_id;
    }
    if let Some(image) = req.image {
        account.image = image;
    }

    state.users().update_account(id, &account).await?;

    Ok(Json(account))
}

/// Detach a sub-account from a user.
///
/// # Errors
///
/// Returns 404 when the account is missing or belongs to another user.
pub async fn remove_account(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Path((id, account_id)): Path<(UserId, AccountId)>,
) -> Result<Json<Value>, AppError> {
    if !state.users().remove_account(id, account_id).await? {
        return Err(AppError::NotFound("Account not found".to_owned()));
    }

    Ok(Json(json!({ "message": "Account removed" })))
}

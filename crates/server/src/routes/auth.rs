//! Authentication route handlers.

use axum::{
    Json, Router,
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::post,
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::db::SessionRepository;
use crate::error::AppError;
use crate::middleware::{RequireAdmin, bearer_token};
use crate::models::UserView;
use crate::services::auth::{Credentials, RegisterUser, ResetPassword};
use crate::state::AppState;

/// Build the auth router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/login", post(login))
        .route("/register", post(register))
        .route("/logout", post(logout))
        .route("/forgot", post(forgot))
        .route("/verify-code", post(verify_code))
        .route("/reset", post(reset))
}

/// Successful login payload.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub token: String,
    pub user: UserView,
}

/// Log in with email and password, issuing a bearer token.
///
/// # Errors
///
/// Returns 401 for bad credentials.
pub async fn login(
    State(state): State<AppState>,
    Json(credentials): Json<Credentials>,
) -> Result<Json<LoginResponse>, AppError> {
    let user = state.auth().login(&credentials).await?;
    let token = SessionRepository::new(state.pool()).issue(user.id).await?;

    Ok(Json(LoginResponse {
        token,
        user: UserView::from(&user),
    }))
}

/// Register a new user. Admin only.
///
/// # Errors
///
/// Returns 400 for invalid fields and 409 for a taken email.
pub async fn register(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Json(req): Json<RegisterUser>,
) -> Result<(StatusCode, Json<UserView>), AppError> {
    let user = state.auth().register(req).await?;

    Ok((StatusCode::CREATED, Json(UserView::from(&user))))
}

/// Revoke the caller's session token. Safe to call with an already-revoked
/// token.
///
/// # Errors
///
/// Returns 500 if the session store is unreachable.
pub async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Value>, AppError> {
    if let Some(token) = bearer_token(&headers) {
        SessionRepository::new(state.pool()).revoke(token).await?;
    }

    Ok(Json(json!({ "message": "Logged out" })))
}

#[derive(Debug, Deserialize)]
struct ForgotRequest {
    email: String,
}

/// Email a password-reset code to the account's address.
///
/// # Errors
///
/// Returns 404 for an unknown email and 500 when the code cannot be sent.
async fn forgot(
    State(state): State<AppState>,
    Json(req): Json<ForgotRequest>,
) -> Result<Json<Value>, AppError> {
    state.auth().forgot_password(&req.email).await?;

    Ok(Json(json!({ "message": "Verification code sent" })))
}

#[derive(Debug, Deserialize)]
struct VerifyRequest {
    email: String,
    code: String,
}

/// Check a reset code without consuming it.
///
/// # Errors
///
/// Returns 400 for a wrong or expired code.
async fn verify_code(
    State(state): State<AppState>,
    Json(req): Json<VerifyRequest>,
) -> Result<Json<Value>, AppError> {
    state.auth().verify_code(&req.email, &req.code).await?;

    Ok(Json(json!({ "message": "Code verified" })))
}

/// Reset the password using an emailed code.
///
/// # Errors
///
/// Returns 400 for a wrong or expired code or a weak password.
async fn reset(
    State(state): State<AppState>,
    Json(req): Json<ResetPassword>,
) -> Result<Json<Value>, AppError> {
    state.auth().reset_password(&req).await?;

    Ok(Json(json!({ "message": "Password updated" })))
}

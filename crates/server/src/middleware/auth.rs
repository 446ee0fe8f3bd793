//! Authentication extractors.
//!
//! Handlers declare what they need in their signature:
//!
//! - [`CurrentUser`] - any authenticated caller.
//! - [`RequireAdmin`] - an authenticated admin.
//! - [`Scope`] - the effective data owner for this request. Admins may pass
//!   `?user=<id>` to act on another user's data; everyone else is always
//!   scoped to themselves. `?account=<ref>` narrows listings to one
//!   sub-account.

use axum::{
    extract::{FromRequestParts, Query},
    http::{HeaderMap, header, request::Parts},
};
use serde::Deserialize;

use order_portal_core::UserId;

use crate::db::SessionRepository;
use crate::error::AppError;
use crate::models::User;
use crate::services::auth::resolve_effective_owner;
use crate::state::AppState;

/// Extractor that requires a valid bearer-token session.
///
/// # Example
///
/// ```rust,ignore
/// async fn handler(CurrentUser(user): CurrentUser) -> impl IntoResponse {
///     format!("Hello, {}!", user.name)
/// }
/// ```
pub struct CurrentUser(pub User);

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers)
            .ok_or_else(|| AppError::Unauthorized("Missing bearer token".to_owned()))?;

        let user_id = SessionRepository::new(state.pool())
            .resolve(token)
            .await?
            .ok_or_else(|| AppError::Unauthorized("Invalid or expired session".to_owned()))?;

        let user = state
            .users()
            .find(user_id)
            .await?
            .ok_or_else(|| AppError::Unauthorized("Invalid or expired session".to_owned()))?;

        Ok(Self(user))
    }
}

/// Extractor that requires an authenticated admin.
pub struct RequireAdmin(pub User);

impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let CurrentUser(user) = CurrentUser::from_request_parts(parts, state).await?;

        if !user.role.is_admin() {
            return Err(AppError::Forbidden("Admins only".to_owned()));
        }

        Ok(Self(user))
    }
}

#[derive(Debug, Deserialize)]
struct ScopeParams {
    /// Target user for admin impersonation.
    user: Option<i32>,
    /// Sub-account filter.
    account: Option<String>,
}

/// The effective data owner of a request.
///
/// Every store access in a handler goes through `scope.owner`; this is the
/// single place impersonation is resolved, so a handler cannot forget the
/// ownership check.
pub struct Scope {
    /// The authenticated caller.
    pub caller: User,
    /// The user whose data this request operates on.
    pub owner: UserId,
    /// Sub-account narrowing, when requested.
    pub account: Option<String>,
}

impl FromRequestParts<AppState> for Scope {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let CurrentUser(caller) = CurrentUser::from_request_parts(parts, state).await?;

        let Query(params) = Query::<ScopeParams>::try_from_uri(&parts.uri)
            .map_err(|e| AppError::Validation(e.to_string()))?;

        let owner = resolve_effective_owner(&caller, params.user.map(UserId::new))?;
        let account = params.account.filter(|a| !a.is_empty());

        Ok(Self {
            caller,
            owner,
            account,
        })
    }
}

/// Extract the bearer token from an `Authorization` header, if present.
#[must_use]
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_bearer_token_extraction() {
        let mut headers = HeaderMap::new();
        assert_eq!(bearer_token(&headers), None);

        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_static("Bearer abc123"),
        );
        assert_eq!(bearer_token(&headers), Some("abc123"));
    }

    #[test]
    fn test_non_bearer_schemes_are_ignored() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_static("Basic dXNlcjpwYXNz"),
        );
        assert_eq!(bearer_token(&headers), None);

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer "));
        assert_eq!(bearer_token(&headers), None);
    }
}

//! User and sub-account domain types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use order_portal_core::{AccountId, Email, UserId, UserRole};

/// A portal user with their embedded sub-account list.
///
/// Not serializable: it carries the password hash and reset-code state.
/// Use [`UserView`] for API responses.
#[derive(Debug, Clone)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: Email,
    pub role: UserRole,
    pub image: String,
    pub password_hash: String,
    /// SHA-256 of the outstanding password-reset code, if any.
    pub reset_code_hash: Option<String>,
    pub reset_code_expires: Option<DateTime<Utc>>,
    /// Marketplace sub-accounts owned by this user.
    pub accounts: Vec<Account>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A marketplace sub-account embedded in a user.
///
/// Orders and queries reference an account by its string-rendered ID
/// (`account_ref`).
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub id: AccountId,
    pub platform: String,
    pub account_name: String,
    pub account_id: String,
    pub image: String,
}

/// A new user ready for insertion.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: Email,
    pub password_hash: String,
    pub role: UserRole,
    pub image: String,
}

/// A new sub-account ready for insertion.
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub platform: String,
    pub account_name: String,
    pub account_id: String,
    pub image: String,
}

/// API-safe projection of a [`User`], without credential material.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserView {
    pub id: UserId,
    pub name: String,
    pub email: Email,
    pub role: UserRole,
    pub image: String,
    pub accounts: Vec<Account>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&User> for UserView {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
            role: user.role,
            image: user.image.clone(),
            accounts: user.accounts.clone(),
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

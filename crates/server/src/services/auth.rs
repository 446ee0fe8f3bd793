//! Authentication service.
//!
//! Passwords are hashed with argon2; password-reset codes are 6-digit values
//! emailed to the user and stored only as SHA-256 digests with a short
//! expiry. Session issuance lives in the route layer on top of
//! [`crate::db::SessionRepository`]; this service only establishes who the
//! caller is.

use std::sync::Arc;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use chrono::{Duration, Utc};
use serde::Deserialize;

use order_portal_core::{Email, UserId, UserRole};

use crate::db::{StoreError, UserStore, sessions::token_digest};
use crate::error::AppError;
use crate::models::{NewUser, User};
use crate::services::mailer::{MailMessage, Mailer, generate_verification_code};

/// Minimum password length.
const MIN_PASSWORD_LENGTH: usize = 8;

/// How long a password-reset code stays valid.
const RESET_CODE_LIFETIME_MINUTES: i64 = 15;

/// Request to register a new user. Registration is admin-only; the route
/// layer enforces that before calling the service.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterUser {
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub role: Option<UserRole>,
    #[serde(default)]
    pub image: Option<String>,
}

/// Login request.
#[derive(Debug, Clone, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

/// Admin request to update a user's profile. Absent fields keep their
/// stored values; a supplied password is re-hashed.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUser {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub role: Option<UserRole>,
    #[serde(default)]
    pub image: Option<String>,
}

/// Password-reset request carrying the emailed verification code.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetPassword {
    pub email: String,
    pub code: String,
    pub password: String,
}

/// Authentication service over the user store and mail transport.
pub struct AuthService {
    users: Arc<dyn UserStore>,
    mailer: Arc<dyn Mailer>,
}

impl AuthService {
    /// Create a new authentication service.
    #[must_use]
    pub fn new(users: Arc<dyn UserStore>, mailer: Arc<dyn Mailer>) -> Self {
        Self { users, mailer }
    }

    /// Register a new user.
    ///
    /// # Errors
    ///
    /// Returns a validation error for a malformed email or weak password and
    /// a duplicate-key error when the email is already registered.
    pub async fn register(&self, req: RegisterUser) -> Result<User, AppError> {
        let name = req.name.trim();
        if name.is_empty() {
            return Err(AppError::Validation("name is required".to_owned()));
        }

        let email =
            Email::parse(&req.email).map_err(|e| AppError::Validation(e.to_string()))?;
        validate_password(&req.password)?;
        let password_hash = hash_password(&req.password)?;

        let user = self
            .users
            .insert(NewUser {
                name: name.to_owned(),
                email,
                password_hash,
                role: req.role.unwrap_or_default(),
                image: req.image.unwrap_or_default(),
            })
            .await?;

        tracing::info!(user_id = %user.id, "Registered user");

        Ok(user)
    }

    /// Authenticate with email and password.
    ///
    /// # Errors
    ///
    /// Returns `Unauthorized` when the email is unknown or the password does
    /// not match; the two cases are indistinguishable to the caller.
    pub async fn login(&self, credentials: &Credentials) -> Result<User, AppError> {
        let user = self
            .lookup(&credentials.email)
            .await?
            .ok_or_else(invalid_credentials)?;

        verify_password(&credentials.password, &user.password_hash)?;

        Ok(user)
    }

    /// Start a password reset: store a hashed 6-digit code with a short
    /// expiry and email the code to the account's address.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown email and a mail error when the
    /// code cannot be sent.
    pub async fn forgot_password(&self, email: &str) -> Result<(), AppError> {
        let mut user = self
            .lookup(email)
            .await?
            .ok_or_else(|| AppError::NotFound("No account with that email".to_owned()))?;

        let code = generate_verification_code();
        user.reset_code_hash = Some(token_digest(&code));
        user.reset_code_expires = Some(Utc::now() + Duration::minutes(RESET_CODE_LIFETIME_MINUTES));
        self.users.update(&user).await?;

        self.mailer.send(&build_reset_email(&user, &code)).await?;

        tracing::info!(user_id = %user.id, "Sent password reset code");

        Ok(())
    }

    /// Check a reset code without consuming it, so the client can gate the
    /// new-password form.
    ///
    /// # Errors
    ///
    /// Returns a validation error when the code is wrong or expired.
    pub async fn verify_code(&self, email: &str, code: &str) -> Result<(), AppError> {
        let user = self
            .lookup(email)
            .await?
            .ok_or_else(|| AppError::NotFound("No account with that email".to_owned()))?;

        check_reset_code(&user, code)
    }

    /// Complete a password reset: validate the code, store the new password
    /// hash and clear the code.
    ///
    /// # Errors
    ///
    /// Returns a validation error when the code is wrong or expired, or the
    /// new password is too weak.
    pub async fn reset_password(&self, req: &ResetPassword) -> Result<(), AppError> {
        let mut user = self
            .lookup(&req.email)
            .await?
            .ok_or_else(|| AppError::NotFound("No account with that email".to_owned()))?;

        check_reset_code(&user, &req.code)?;
        validate_password(&req.password)?;

        user.password_hash = hash_password(&req.password)?;
        user.reset_code_hash = None;
        user.reset_code_expires = None;
        self.users.update(&user).await?;

        tracing::info!(user_id = %user.id, "Password reset");

        Ok(())
    }

    /// Update a user's profile and credentials (admin surface).
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown user, a validation error for a
    /// malformed email or weak password, and a duplicate-key error when the
    /// new email is taken.
    pub async fn update_user(&self, id: UserId, req: UpdateUser) -> Result<User, AppError> {
        let mut user = self
            .users
            .find(id)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_owned()))?;

        if let Some(name) = req.name {
            let name = name.trim();
            if name.is_empty() {
                return Err(AppError::Validation("name is required".to_owned()));
            }
            user.name = name.to_owned();
        }
        if let Some(email) = req.email {
            user.email = Email::parse(&email).map_err(|e| AppError::Validation(e.to_string()))?;
        }
        if let Some(password) = req.password {
            validate_password(&password)?;
            user.password_hash = hash_password(&password)?;
        }
        if let Some(role) = req.role {
            user.role = role;
        }
        if let Some(image) = req.image {
            user.image = image;
        }

        self.users.update(&user).await?;

        Ok(user)
    }

    /// Resolve an email to its user, treating a malformed address as
    /// unknown.
    async fn lookup(&self, email: &str) -> Result<Option<User>, StoreError> {
        let Ok(email) = Email::parse(email) else {
            return Ok(None);
        };
        self.users.find_by_email(email.as_str()).await
    }
}

/// Resolve an admin's target user id: admins may act as any user via the
/// explicit `user` parameter, everyone else is always scoped to themselves.
///
/// # Errors
///
/// Returns `Forbidden` when a non-admin supplies a `user` parameter naming
/// someone else.
pub fn resolve_effective_owner(
    caller: &User,
    requested: Option<UserId>,
) -> Result<UserId, AppError> {
    match requested {
        None => Ok(caller.id),
        Some(target) if target == caller.id => Ok(caller.id),
        Some(target) if caller.role.is_admin() => Ok(target),
        Some(_) => Err(AppError::Forbidden(
            "Only admins may act on behalf of another user".to_owned(),
        )),
    }
}

fn invalid_credentials() -> AppError {
    AppError::Unauthorized("Invalid email or password".to_owned())
}

fn validate_password(password: &str) -> Result<(), AppError> {
    if password.len() < MIN_PASSWORD_LENGTH {
        return Err(AppError::Validation(format!(
            "password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }
    Ok(())
}

/// Hash a password with argon2 and a fresh salt.
fn hash_password(password: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut OsRng);

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::Internal(format!("password hashing failed: {e}")))
}

/// Verify a password against a stored argon2 hash.
fn verify_password(password: &str, hash: &str) -> Result<(), AppError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| invalid_credentials())?;

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| invalid_credentials())
}

/// Validate a stored reset code against the submitted one.
fn check_reset_code(user: &User, code: &str) -> Result<(), AppError> {
    let (Some(hash), Some(expires)) = (&user.reset_code_hash, user.reset_code_expires) else {
        return Err(AppError::Validation(
            "No reset code requested for this account".to_owned(),
        ));
    };

    if expires < Utc::now() || token_digest(code.trim()) != *hash {
        return Err(AppError::Validation("Invalid or expired code".to_owned()));
    }

    Ok(())
}

fn build_reset_email(user: &User, code: &str) -> MailMessage {
    let subject = "Password Reset Code".to_owned();
    let text = format!(
        "Hello {name},\n\nYour password reset code is: {code}\n\n\
         The code expires in {RESET_CODE_LIFETIME_MINUTES} minutes. If you did not \
         request a reset, you can ignore this email.\n\n\
         Regards,\nOrder Portal",
        name = user.name,
    );
    let html = format!(
        "<p>Hello {name},</p>\
         <p>Your password reset code is: <b>{code}</b></p>\
         <p>The code expires in {RESET_CODE_LIFETIME_MINUTES} minutes. If you did not \
         request a reset, you can ignore this email.</p>\
         <p>Regards,<br/>Order Portal</p>",
        name = user.name,
    );

    MailMessage {
        to: user.email.to_string(),
        subject,
        text,
        html,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn sample_user() -> User {
        User {
            id: UserId::new(1),
            name: "Asha".to_owned(),
            email: Email::parse("asha@example.com").unwrap(),
            role: UserRole::User,
            image: String::new(),
            password_hash: String::new(),
            reset_code_hash: None,
            reset_code_expires: None,
            accounts: Vec::new(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn admin_user() -> User {
        User {
            id: UserId::new(2),
            role: UserRole::Admin,
            ..sample_user()
        }
    }

    #[test]
    fn test_password_hash_roundtrip() {
        let hash = hash_password("correct horse battery").unwrap();
        assert!(verify_password("correct horse battery", &hash).is_ok());
        assert!(verify_password("wrong password", &hash).is_err());
    }

    #[test]
    fn test_short_password_rejected() {
        assert!(matches!(
            validate_password("short"),
            Err(AppError::Validation(_))
        ));
        assert!(validate_password("long enough").is_ok());
    }

    #[test]
    fn test_reset_code_must_match_and_be_fresh() {
        let mut user = sample_user();
        user.reset_code_hash = Some(token_digest("123456"));
        user.reset_code_expires = Some(Utc::now() + Duration::minutes(10));

        assert!(check_reset_code(&user, "123456").is_ok());
        assert!(check_reset_code(&user, " 123456 ").is_ok());
        assert!(check_reset_code(&user, "654321").is_err());

        user.reset_code_expires = Some(Utc::now() - Duration::minutes(1));
        assert!(check_reset_code(&user, "123456").is_err());
    }

    #[test]
    fn test_reset_code_absent_is_rejected() {
        assert!(check_reset_code(&sample_user(), "123456").is_err());
    }

    #[test]
    fn test_users_are_scoped_to_themselves() {
        let caller = sample_user();
        assert_eq!(resolve_effective_owner(&caller, None).unwrap(), caller.id);
        assert_eq!(
            resolve_effective_owner(&caller, Some(caller.id)).unwrap(),
            caller.id
        );
        assert!(matches!(
            resolve_effective_owner(&caller, Some(UserId::new(99))),
            Err(AppError::Forbidden(_))
        ));
    }

    #[test]
    fn test_admin_may_impersonate() {
        let admin = admin_user();
        let target = UserId::new(99);
        assert_eq!(
            resolve_effective_owner(&admin, Some(target)).unwrap(),
            target
        );
        assert_eq!(resolve_effective_owner(&admin, None).unwrap(), admin.id);
    }
}

//! Session repository for bearer-token authentication.
//!
//! Tokens are opaque 32-byte random values handed to the client once at
//! login; only their SHA-256 digest is stored. Sessions expire after a fixed
//! lifetime and expired rows are swept opportunistically on issue.

use chrono::{DateTime, Duration, Utc};
use rand::RngCore;
use sha2::{Digest, Sha256};
use sqlx::PgPool;

use order_portal_core::UserId;

use super::StoreError;

/// How long a login session stays valid.
pub const SESSION_LIFETIME_DAYS: i64 = 7;

/// Repository for session database operations.
pub struct SessionRepository<'a> {
    pool: &'a PgPool,
}

/// Hash a bearer token for storage or lookup.
#[must_use]
pub fn token_digest(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

impl<'a> SessionRepository<'a> {
    /// Create a new session repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Issue a fresh session for a user and return the bearer token.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Database` if the insert fails.
    pub async fn issue(&self, user_id: UserId) -> Result<String, StoreError> {
        // Sweep expired rows so the table does not grow without bound.
        sqlx::query("DELETE FROM session WHERE expires_at < NOW()")
            .execute(self.pool)
            .await?;

        let mut bytes = [0u8; 32];
        rand::rng().fill_bytes(&mut bytes);
        let token = hex::encode(bytes);

        let expires_at: DateTime<Utc> = Utc::now() + Duration::days(SESSION_LIFETIME_DAYS);

        sqlx::query("INSERT INTO session (token_hash, user_id, expires_at) VALUES ($1, $2, $3)")
            .bind(token_digest(&token))
            .bind(user_id.as_i32())
            .bind(expires_at)
            .execute(self.pool)
            .await?;

        Ok(token)
    }

    /// Resolve a bearer token to the owning user id, if the session is still
    /// valid.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Database` if the lookup fails.
    pub async fn resolve(&self, token: &str) -> Result<Option<UserId>, StoreError> {
        let row: Option<(i32,)> = sqlx::query_as(
            "SELECT user_id FROM session WHERE token_hash = $1 AND expires_at > NOW()",
        )
        .bind(token_digest(token))
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(|(id,)| UserId::new(id)))
    }

    /// Revoke a session (logout). Unknown tokens are ignored.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Database` if the delete fails.
    pub async fn revoke(&self, token: &str) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM session WHERE token_hash = $1")
            .bind(token_digest(token))
            .execute(self.pool)
            .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_digest_is_stable_and_hex() {
        let digest = token_digest("abc123");
        assert_eq!(digest, token_digest("abc123"));
        assert_eq!(digest.len(), 64);
        assert!(digest.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(digest, token_digest("abc124"));
    }
}

//! `PostgreSQL` user store.
//!
//! Users embed their sub-account list; the rows live in a separate `account`
//! table and are stitched back onto the user on every read.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use order_portal_core::{AccountId, Email, UserId, UserRole};

use super::{StoreError, UserStore, map_unique_violation};
use crate::models::{Account, NewAccount, NewUser, User};

const USER_COLUMNS: &str = "id, name, email, password_hash, role, image, \
     reset_code_hash, reset_code_expires, created_at, updated_at";

/// Internal row type for `PostgreSQL` user queries.
#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: i32,
    name: String,
    email: String,
    password_hash: String,
    role: String,
    image: String,
    reset_code_hash: Option<String>,
    reset_code_expires: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl UserRow {
    fn into_user(self, accounts: Vec<Account>) -> Result<User, StoreError> {
        let email = Email::parse(&self.email)
            .map_err(|e| StoreError::Corrupt(format!("invalid email in store: {e}")))?;
        let role: UserRole = self
            .role
            .parse()
            .map_err(|e: String| StoreError::Corrupt(e))?;

        Ok(User {
            id: UserId::new(self.id),
            name: self.name,
            email,
            role,
            image: self.image,
            password_hash: self.password_hash,
            reset_code_hash: self.reset_code_hash,
            reset_code_expires: self.reset_code_expires,
            accounts,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// Internal row type for `PostgreSQL` sub-account queries.
#[derive(Debug, sqlx::FromRow)]
struct AccountRow {
    id: i32,
    user_id: i32,
    platform: String,
    account_name: String,
    account_id: String,
    image: String,
}

impl From<AccountRow> for Account {
    fn from(row: AccountRow) -> Self {
        Self {
            id: AccountId::new(row.id),
            platform: row.platform,
            account_name: row.account_name,
            account_id: row.account_id,
            image: row.image,
        }
    }
}

/// User store backed by `PostgreSQL`.
#[derive(Clone)]
pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    /// Create a new user store on the given pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn accounts_for(&self, user_id: i32) -> Result<Vec<Account>, StoreError> {
        let rows = sqlx::query_as::<_, AccountRow>(
            "SELECT id, user_id, platform, account_name, account_id, image \
             FROM account WHERE user_id = $1 ORDER BY id ASC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn insert(&self, user: NewUser) -> Result<User, StoreError> {
        let sql = format!(
            "INSERT INTO portal_user (name, email, password_hash, role, image) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING {USER_COLUMNS}"
        );

        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(&user.name)
            .bind(user.email.as_str())
            .bind(&user.password_hash)
            .bind(user.role.to_string())
            .bind(&user.image)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_unique_violation(e, "email already exists"))?;

        row.into_user(Vec::new())
    }

    async fn find(&self, id: UserId) -> Result<Option<User>, StoreError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM portal_user WHERE id = $1");

        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(id.as_i32())
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => {
                let accounts = self.accounts_for(row.id).await?;
                Ok(Some(row.into_user(accounts)?))
            }
            None => Ok(None),
        }
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM portal_user WHERE email = $1");

        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(email.to_lowercase())
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => {
                let accounts = self.accounts_for(row.id).await?;
                Ok(Some(row.into_user(accounts)?))
            }
            None => Ok(None),
        }
    }

    async fn list(&self) -> Result<Vec<User>, StoreError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM portal_user ORDER BY created_at DESC");
        let rows = sqlx::query_as::<_, UserRow>(&sql)
            .fetch_all(&self.pool)
            .await?;

        let account_rows = sqlx::query_as::<_, AccountRow>(
            "SELECT id, user_id, platform, account_name, account_id, image \
             FROM account ORDER BY id ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut by_user: HashMap<i32, Vec<Account>> = HashMap::new();
        for row in account_rows {
            by_user.entry(row.user_id).or_default().push(row.into());
        }

        rows.into_iter()
            .map(|row| {
                let accounts = by_user.remove(&row.id).unwrap_or_default();
                row.into_user(accounts)
            })
            .collect()
    }

    async fn update(&self, user: &User) -> Result<(), StoreError> {
        let result = sqlx::query(
            "UPDATE portal_user \
             SET name = $2, email = $3, password_hash = $4, role = $5, image = $6, \
                 reset_code_hash = $7, reset_code_expires = $8, updated_at = NOW() \
             WHERE id = $1",
        )
        .bind(user.id.as_i32())
        .bind(&user.name)
        .bind(user.email.as_str())
        .bind(&user.password_hash)
        .bind(user.role.to_string())
        .bind(&user.image)
        .bind(&user.reset_code_hash)
        .bind(user.reset_code_expires)
        .execute(&self.pool)
        .await
        .map_err(|e| map_unique_violation(e, "email already exists"))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }

        Ok(())
    }

    async fn delete(&self, id: UserId) -> Result<bool, StoreError> {
        // Orders, queries, sub-accounts and sessions cascade at the schema
        // level.
        let result = sqlx::query("DELETE FROM portal_user WHERE id = $1")
            .bind(id.as_i32())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn add_account(&self, owner: UserId, account: NewAccount) -> Result<Account, StoreError> {
        let row = sqlx::query_as::<_, AccountRow>(
            "INSERT INTO account (user_id, platform, account_name, account_id, image) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING id, user_id, platform, account_name, account_id, image",
        )
        .bind(owner.as_i32())
        .bind(&account.platform)
        .bind(&account.account_name)
        .bind(&account.account_id)
        .bind(&account.image)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_unique_violation(e, "account already exists for this user"))?;

        Ok(row.into())
    }

    async fn update_account(&self, owner: UserId, account: &Account) -> Result<(), StoreError> {
        let result = sqlx::query(
            "UPDATE account \
             SET platform = $3, account_name = $4, account_id = $5, image = $6 \
             WHERE id = $1 AND user_id = $2",
        )
        .bind(account.id.as_i32())
        .bind(owner.as_i32())
        .bind(&account.platform)
        .bind(&account.account_name)
        .bind(&account.account_id)
        .bind(&account.image)
        .execute(&self.pool)
        .await
        .map_err(|e| map_unique_violation(e, "account already exists for this user"))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }

        Ok(())
    }

    async fn remove_account(&self, owner: UserId, account: AccountId) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM account WHERE id = $1 AND user_id = $2")
            .bind(account.as_i32())
            .bind(owner.as_i32())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

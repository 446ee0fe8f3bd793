//! Document store for portal data.
//!
//! The services consume the store through the narrow traits defined here
//! ([`OrderStore`], [`QueryStore`], [`UserStore`]); the `Pg*` types in the
//! submodules are the production `PostgreSQL` implementations. Tests swap in
//! in-memory implementations of the same traits.
//!
//! Uniqueness is enforced by the store at insert time (unique indexes), not
//! by pre-checks, so concurrent inserts of the same key cannot both succeed.

pub mod options;
pub mod orders;
pub mod queries;
pub mod sessions;
pub mod users;

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use order_portal_core::{AccountId, OrderId, QueryId, UserId};

use crate::models::{Account, NewAccount, NewOrder, NewQuery, NewUser, Order, Query, User};

pub use options::HandlerOptionRepository;
pub use orders::PgOrderStore;
pub use queries::PgQueryStore;
pub use sessions::SessionRepository;
pub use users::PgUserStore;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the store is corrupted or invalid.
    #[error("data corruption: {0}")]
    Corrupt(String),

    /// Requested record was not found (or is not owned by the caller).
    #[error("not found")]
    NotFound,

    /// Uniqueness violation (e.g. duplicate order id within a sub-account).
    #[error("duplicate key: {0}")]
    Duplicate(String),
}

/// Map a sqlx unique-constraint violation to [`StoreError::Duplicate`] with
/// the given message; all other errors pass through as database errors.
pub(crate) fn map_unique_violation(e: sqlx::Error, message: &str) -> StoreError {
    if let sqlx::Error::Database(ref db_err) = e
        && db_err.is_unique_violation()
    {
        return StoreError::Duplicate(message.to_owned());
    }
    StoreError::Database(e)
}

/// A half-open `[start, end)` window over `created_at`. An absent end means
/// the window is open-ended at "now".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CreatedWindow {
    pub start: DateTime<Utc>,
    pub end: Option<DateTime<Utc>>,
}

impl CreatedWindow {
    /// Whether a timestamp falls inside the window.
    #[must_use]
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        at >= self.start && self.end.is_none_or(|end| at < end)
    }
}

/// Filter for order listings. Always scoped to a single owner.
#[derive(Debug, Clone)]
pub struct OrderFilter {
    pub owner: UserId,
    pub account: Option<String>,
    pub deleted: bool,
    pub created: Option<CreatedWindow>,
}

impl OrderFilter {
    /// Active (non-trashed) orders for an owner.
    #[must_use]
    pub const fn active(owner: UserId) -> Self {
        Self {
            owner,
            account: None,
            deleted: false,
            created: None,
        }
    }
}

/// Filter for query listings. Always scoped to a single owner.
#[derive(Debug, Clone)]
pub struct QueryFilter {
    pub owner: UserId,
    pub account: Option<String>,
    pub created: Option<CreatedWindow>,
}

/// Store operations for orders.
///
/// Every operation that targets an existing record is scoped by the owning
/// user id; a record belonging to another user behaves as if it did not
/// exist.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Insert a new order. Fails with [`StoreError::Duplicate`] when
    /// (user, `account_ref`, `order_id`) already exists.
    async fn insert(&self, order: NewOrder) -> Result<Order, StoreError>;

    /// Fetch an order by record id, scoped to its owner.
    async fn find(&self, owner: UserId, id: OrderId) -> Result<Option<Order>, StoreError>;

    /// Fetch an order by its marketplace order id, scoped to owner and
    /// (optionally) sub-account.
    async fn find_by_order_id(
        &self,
        owner: UserId,
        order_id: &str,
        account: Option<&str>,
    ) -> Result<Option<Order>, StoreError>;

    /// Persist an order in place, scoped by (id, owner). Fails with
    /// [`StoreError::NotFound`] when no such owned record exists.
    async fn update(&self, order: &Order) -> Result<(), StoreError>;

    /// Permanently remove one order. Returns false when no owned record
    /// matched.
    async fn delete(&self, owner: UserId, id: OrderId) -> Result<bool, StoreError>;

    /// Permanently remove every listed order that belongs to the owner,
    /// ignoring foreign and unknown ids. Returns the number removed.
    async fn delete_many(&self, owner: UserId, ids: &[OrderId]) -> Result<u64, StoreError>;

    /// List orders matching the filter, newest first.
    async fn list(&self, filter: &OrderFilter) -> Result<Vec<Order>, StoreError>;
}

/// Store operations for buyer queries.
#[async_trait]
pub trait QueryStore: Send + Sync {
    async fn insert(&self, query: NewQuery) -> Result<Query, StoreError>;

    async fn find(&self, owner: UserId, id: QueryId) -> Result<Option<Query>, StoreError>;

    /// Persist a query in place, scoped by (id, owner).
    async fn update(&self, query: &Query) -> Result<(), StoreError>;

    /// Permanently remove one query. Returns false when no owned record
    /// matched.
    async fn delete(&self, owner: UserId, id: QueryId) -> Result<bool, StoreError>;

    /// List queries matching the filter, newest first.
    async fn list(&self, filter: &QueryFilter) -> Result<Vec<Query>, StoreError>;

    /// Up to `limit` queries with a set expiry at or before `cutoff` that
    /// have not been notified yet, soonest deadline first.
    async fn find_expiring(
        &self,
        cutoff: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<Query>, StoreError>;

    /// Flip `notified_expire` to true for a query that has not been notified
    /// yet. Returns false when the query was already notified (or gone), so
    /// a lost race never records a second notification.
    async fn mark_notified(&self, id: QueryId) -> Result<bool, StoreError>;
}

/// Store operations for users and their embedded sub-accounts.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Insert a new user. Fails with [`StoreError::Duplicate`] when the email
    /// is taken.
    async fn insert(&self, user: NewUser) -> Result<User, StoreError>;

    async fn find(&self, id: UserId) -> Result<Option<User>, StoreError>;

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    /// All users, newest first.
    async fn list(&self) -> Result<Vec<User>, StoreError>;

    /// Persist a user's profile and credential fields (not the account
    /// list).
    async fn update(&self, user: &User) -> Result<(), StoreError>;

    /// Remove a user and cascade to their orders, queries, sub-accounts and
    /// sessions. Returns false when the user did not exist.
    async fn delete(&self, id: UserId) -> Result<bool, StoreError>;

    /// Attach a sub-account. Fails with [`StoreError::Duplicate`] when the
    /// user already has this (platform, account id) pair, compared
    /// case-insensitively.
    async fn add_account(&self, owner: UserId, account: NewAccount) -> Result<Account, StoreError>;

    /// Persist a sub-account in place, scoped by (id, owner).
    async fn update_account(&self, owner: UserId, account: &Account) -> Result<(), StoreError>;

    /// Detach a sub-account. Returns false when no owned record matched.
    async fn remove_account(&self, owner: UserId, account: AccountId) -> Result<bool, StoreError>;
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// Run pending migrations from the crate's `migrations/` directory.
///
/// # Errors
///
/// Returns an error if a migration fails to apply.
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}

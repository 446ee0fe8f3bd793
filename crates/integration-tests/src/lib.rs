//! In-memory collaborators for exercising the portal services.
//!
//! The stores here implement the same traits as the `PostgreSQL` stores,
//! including the behaviors the services rely on: uniqueness enforced at
//! insert time, owner-scoped mutation, newest-first listings and the
//! conditional `mark_notified` update. [`MockMailer`] stands in for the SMTP
//! transport and records every attempt so tests can count sends.

use std::sync::atomic::{AtomicBool, AtomicI32, AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use order_portal_core::{AccountId, OrderId, QueryId, UserId};
use order_portal_server::db::{
    OrderFilter, OrderStore, QueryFilter, QueryStore, StoreError, UserStore,
};
use order_portal_server::models::{
    Account, NewAccount, NewOrder, NewQuery, NewUser, Order, Query, User,
};
use order_portal_server::services::mailer::{MailError, MailMessage, Mailer};

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Sort newest first, with the id as a tiebreak for rows created in the
/// same instant.
fn newest_first<T>(rows: &mut [T], key: impl Fn(&T) -> (DateTime<Utc>, i32)) {
    rows.sort_by(|a, b| key(b).cmp(&key(a)));
}

// =============================================================================
// Orders
// =============================================================================

/// In-memory [`OrderStore`].
#[derive(Default)]
pub struct MemoryOrderStore {
    rows: Mutex<Vec<Order>>,
    next_id: AtomicI32,
}

impl MemoryOrderStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all rows, for assertions.
    #[must_use]
    pub fn rows(&self) -> Vec<Order> {
        lock(&self.rows).clone()
    }
}

#[async_trait]
impl OrderStore for MemoryOrderStore {
    async fn insert(&self, order: NewOrder) -> Result<Order, StoreError> {
        let mut rows = lock(&self.rows);

        let taken = rows.iter().any(|r| {
            r.user_id == order.user_id
                && r.account_ref == order.account_ref
                && r.order_id == order.order_id
        });
        if taken {
            return Err(StoreError::Duplicate(
                "order id already exists for this account".to_owned(),
            ));
        }

        let now = Utc::now();
        let row = Order {
            id: OrderId::new(self.next_id.fetch_add(1, Ordering::SeqCst) + 1),
            user_id: order.user_id,
            account_ref: order.account_ref,
            order_id: order.order_id,
            sku: order.sku,
            details: order.details,
            notes: order.notes,
            handler_name: order.handler_name,
            tracking_id: order.tracking_id,
            process_id: order.process_id,
            buy_price: order.buy_price,
            sell_price: order.sell_price,
            refund_amount: order.refund_amount,
            net_profit: order.net_profit,
            roi: order.roi,
            status: order.status,
            is_deleted: false,
            created_at: now,
            updated_at: now,
        };
        rows.push(row.clone());

        Ok(row)
    }

    async fn find(&self, owner: UserId, id: OrderId) -> Result<Option<Order>, StoreError> {
        Ok(lock(&self.rows)
            .iter()
            .find(|r| r.id == id && r.user_id == owner)
            .cloned())
    }

    async fn find_by_order_id(
        &self,
        owner: UserId,
        order_id: &str,
        account: Option<&str>,
    ) -> Result<Option<Order>, StoreError> {
        Ok(lock(&self.rows)
            .iter()
            .find(|r| {
                r.user_id == owner
                    && r.order_id == order_id
                    && account.is_none_or(|a| r.account_ref == a)
            })
            .cloned())
    }

    async fn update(&self, order: &Order) -> Result<(), StoreError> {
        let mut rows = lock(&self.rows);

        let row = rows
            .iter_mut()
            .find(|r| r.id == order.id && r.user_id == order.user_id)
            .ok_or(StoreError::NotFound)?;

        *row = Order {
            updated_at: Utc::now(),
            ..order.clone()
        };

        Ok(())
    }

    async fn delete(&self, owner: UserId, id: OrderId) -> Result<bool, StoreError> {
        let mut rows = lock(&self.rows);
        let before = rows.len();
        rows.retain(|r| !(r.id == id && r.user_id == owner));
        Ok(rows.len() < before)
    }

    async fn delete_many(&self, owner: UserId, ids: &[OrderId]) -> Result<u64, StoreError> {
        let mut rows = lock(&self.rows);
        let before = rows.len();
        rows.retain(|r| !(r.user_id == owner && ids.contains(&r.id)));
        Ok((before - rows.len()) as u64)
    }

    async fn list(&self, filter: &OrderFilter) -> Result<Vec<Order>, StoreError> {
        let mut rows: Vec<Order> = lock(&self.rows)
            .iter()
            .filter(|r| {
                r.user_id == filter.owner
                    && r.is_deleted == filter.deleted
                    && filter.account.as_ref().is_none_or(|a| r.account_ref == *a)
                    && filter.created.is_none_or(|w| w.contains(r.created_at))
            })
            .cloned()
            .collect();

        newest_first(&mut rows, |r| (r.created_at, r.id.as_i32()));

        Ok(rows)
    }
}

// =============================================================================
// Queries
// =============================================================================

/// In-memory [`QueryStore`].
#[derive(Default)]
pub struct MemoryQueryStore {
    rows: Mutex<Vec<Query>>,
    next_id: AtomicI32,
}

impl MemoryQueryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all rows, for assertions.
    #[must_use]
    pub fn rows(&self) -> Vec<Query> {
        lock(&self.rows).clone()
    }

    /// Fetch one row by id regardless of owner, for assertions.
    #[must_use]
    pub fn get(&self, id: QueryId) -> Option<Query> {
        lock(&self.rows).iter().find(|r| r.id == id).cloned()
    }
}

#[async_trait]
impl QueryStore for MemoryQueryStore {
    async fn insert(&self, query: NewQuery) -> Result<Query, StoreError> {
        let mut rows = lock(&self.rows);

        let now = Utc::now();
        let row = Query {
            id: QueryId::new(self.next_id.fetch_add(1, Ordering::SeqCst) + 1),
            user_id: query.user_id,
            account_ref: query.account_ref,
            order_id: query.order_id,
            sku: query.sku,
            details: query.details,
            message: query.message,
            answer: query.answer,
            handler_name: query.handler_name,
            status: query.status,
            expires_at: query.expires_at,
            notified_expire: false,
            created_at: now,
            updated_at: now,
        };
        rows.push(row.clone());

        Ok(row)
    }

    async fn find(&self, owner: UserId, id: QueryId) -> Result<Option<Query>, StoreError> {
        Ok(lock(&self.rows)
            .iter()
            .find(|r| r.id == id && r.user_id == owner)
            .cloned())
    }

    async fn update(&self, query: &Query) -> Result<(), StoreError> {
        let mut rows = lock(&self.rows);

        let row = rows
            .iter_mut()
            .find(|r| r.id == query.id && r.user_id == query.user_id)
            .ok_or(StoreError::NotFound)?;

        *row = Query {
            updated_at: Utc::now(),
            ..query.clone()
        };

        Ok(())
    }

    async fn delete(&self, owner: UserId, id: QueryId) -> Result<bool, StoreError> {
        let mut rows = lock(&self.rows);
        let before = rows.len();
        rows.retain(|r| !(r.id == id && r.user_id == owner));
        Ok(rows.len() < before)
    }

    async fn list(&self, filter: &QueryFilter) -> Result<Vec<Query>, StoreError> {
        let mut rows: Vec<Query> = lock(&self.rows)
            .iter()
            .filter(|r| {
                r.user_id == filter.owner
                    && filter.account.as_ref().is_none_or(|a| r.account_ref == *a)
                    && filter.created.is_none_or(|w| w.contains(r.created_at))
            })
            .cloned()
            .collect();

        newest_first(&mut rows, |r| (r.created_at, r.id.as_i32()));

        Ok(rows)
    }

    async fn find_expiring(
        &self,
        cutoff: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<Query>, StoreError> {
        let mut rows: Vec<Query> = lock(&self.rows)
            .iter()
            .filter(|r| {
                !r.notified_expire && r.expires_at.is_some_and(|at| at <= cutoff)
            })
            .cloned()
            .collect();

        rows.sort_by_key(|r| r.expires_at);
        rows.truncate(usize::try_from(limit).unwrap_or(usize::MAX));

        Ok(rows)
    }

    async fn mark_notified(&self, id: QueryId) -> Result<bool, StoreError> {
        let mut rows = lock(&self.rows);

        match rows.iter_mut().find(|r| r.id == id && !r.notified_expire) {
            Some(row) => {
                row.notified_expire = true;
                row.updated_at = Utc::now();
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

// =============================================================================
// Users
// =============================================================================

/// In-memory [`UserStore`].
#[derive(Default)]
pub struct MemoryUserStore {
    rows: Mutex<Vec<User>>,
    next_user_id: AtomicI32,
    next_account_id: AtomicI32,
}

impl MemoryUserStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn insert(&self, user: NewUser) -> Result<User, StoreError> {
        let mut rows = lock(&self.rows);

        if rows.iter().any(|r| r.email == user.email) {
            return Err(StoreError::Duplicate("email already exists".to_owned()));
        }

        let now = Utc::now();
        let row = User {
            id: UserId::new(self.next_user_id.fetch_add(1, Ordering::SeqCst) + 1),
            name: user.name,
            email: user.email,
            role: user.role,
            image: user.image,
            password_hash: user.password_hash,
            reset_code_hash: None,
            reset_code_expires: None,
            accounts: Vec::new(),
            created_at: now,
            updated_at: now,
        };
        rows.push(row.clone());

        Ok(row)
    }

    async fn find(&self, id: UserId) -> Result<Option<User>, StoreError> {
        Ok(lock(&self.rows).iter().find(|r| r.id == id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        Ok(lock(&self.rows)
            .iter()
            .find(|r| r.email.as_str() == email)
            .cloned())
    }

    async fn list(&self) -> Result<Vec<User>, StoreError> {
        let mut rows = lock(&self.rows).clone();
        newest_first(&mut rows, |r| (r.created_at, r.id.as_i32()));
        Ok(rows)
    }

    async fn update(&self, user: &User) -> Result<(), StoreError> {
        let mut rows = lock(&self.rows);

        let taken = rows
            .iter()
            .any(|r| r.id != user.id && r.email == user.email);
        if taken {
            return Err(StoreError::Duplicate("email already exists".to_owned()));
        }

        let row = rows
            .iter_mut()
            .find(|r| r.id == user.id)
            .ok_or(StoreError::NotFound)?;

        // The account list is managed through the account operations.
        let accounts = std::mem::take(&mut row.accounts);
        *row = User {
            accounts,
            updated_at: Utc::now(),
            ..user.clone()
        };

        Ok(())
    }

    async fn delete(&self, id: UserId) -> Result<bool, StoreError> {
        let mut rows = lock(&self.rows);
        let before = rows.len();
        rows.retain(|r| r.id != id);
        Ok(rows.len() < before)
    }

    async fn add_account(&self, owner: UserId, account: NewAccount) -> Result<Account, StoreError> {
        let mut rows = lock(&self.rows);

        let user = rows
            .iter_mut()
            .find(|r| r.id == owner)
            .ok_or(StoreError::NotFound)?;

        let taken = user.accounts.iter().any(|a| {
            a.platform.eq_ignore_ascii_case(&account.platform)
                && a.account_id.eq_ignore_ascii_case(&account.account_id)
        });
        if taken {
            return Err(StoreError::Duplicate(
                "account already exists for this user".to_owned(),
            ));
        }

        let row = Account {
            id: AccountId::new(self.next_account_id.fetch_add(1, Ordering::SeqCst) + 1),
            platform: account.platform,
            account_name: account.account_name,
            account_id: account.account_id,
            image: account.image,
        };
        user.accounts.push(row.clone());

        Ok(row)
    }

    async fn update_account(&self, owner: UserId, account: &Account) -> Result<(), StoreError> {
        let mut rows = lock(&self.rows);

        let user = rows
            .iter_mut()
            .find(|r| r.id == owner)
            .ok_or(StoreError::NotFound)?;

        let row = user
            .accounts
            .iter_mut()
            .find(|a| a.id == account.id)
            .ok_or(StoreError::NotFound)?;
        *row = account.clone();

        Ok(())
    }

    async fn remove_account(&self, owner: UserId, account: AccountId) -> Result<bool, StoreError> {
        let mut rows = lock(&self.rows);

        let user = rows
            .iter_mut()
            .find(|r| r.id == owner)
            .ok_or(StoreError::NotFound)?;

        let before = user.accounts.len();
        user.accounts.retain(|a| a.id != account);
        Ok(user.accounts.len() < before)
    }
}

// =============================================================================
// Mail transport
// =============================================================================

/// Mock [`Mailer`] that records every attempt.
///
/// While `failing` is set, sends are declined with a transport error; the
/// attempt is still counted so tests can distinguish "never tried" from
/// "tried and failed".
#[derive(Default)]
pub struct MockMailer {
    sent: Mutex<Vec<MailMessage>>,
    attempts: AtomicUsize,
    failing: AtomicBool,
}

impl MockMailer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A mailer that declines every send until told otherwise.
    #[must_use]
    pub fn failing() -> Self {
        let mailer = Self::default();
        mailer.set_failing(true);
        mailer
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Number of sends the transport accepted.
    #[must_use]
    pub fn sent_count(&self) -> usize {
        lock(&self.sent).len()
    }

    /// Number of send attempts, accepted or declined.
    #[must_use]
    pub fn attempt_count(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    /// Copies of the accepted messages, in send order.
    #[must_use]
    pub fn sent(&self) -> Vec<MailMessage> {
        lock(&self.sent).clone()
    }
}

#[async_trait]
impl Mailer for MockMailer {
    async fn send(&self, message: &MailMessage) -> Result<(), MailError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);

        if self.failing.load(Ordering::SeqCst) {
            return Err(MailError::NotConfigured);
        }

        lock(&self.sent).push(message.clone());
        Ok(())
    }
}

//! Expiry scheduler properties: at-most-once notification, retry after
//! transport failure, the lookahead boundary and the per-sweep batch cap.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tokio::sync::Notify;

use order_portal_core::{Email, QueryStatus, UserId, UserRole};
use order_portal_integration_tests::{MemoryQueryStore, MemoryUserStore, MockMailer};
use order_portal_server::db::{QueryStore, UserStore};
use order_portal_server::models::{NewQuery, NewUser, Query};
use order_portal_server::services::mailer::{MailError, MailMessage, Mailer};
use order_portal_server::services::scheduler::SWEEP_BATCH_SIZE;
use order_portal_server::services::ExpiryScheduler;

struct Fixture {
    queries: Arc<MemoryQueryStore>,
    users: Arc<MemoryUserStore>,
    mailer: Arc<MockMailer>,
    scheduler: Arc<ExpiryScheduler>,
    owner: UserId,
}

async fn fixture(mailer: MockMailer) -> Fixture {
    let queries = Arc::new(MemoryQueryStore::new());
    let users = Arc::new(MemoryUserStore::new());
    let mailer = Arc::new(mailer);

    let owner = users
        .insert(NewUser {
            name: "Asha".to_owned(),
            email: Email::parse("asha@example.com").unwrap(),
            password_hash: String::new(),
            role: UserRole::User,
            image: String::new(),
        })
        .await
        .unwrap()
        .id;

    let scheduler = Arc::new(ExpiryScheduler::new(
        queries.clone(),
        users.clone(),
        mailer.clone(),
    ));

    Fixture {
        queries,
        users,
        mailer,
        scheduler,
        owner,
    }
}

fn pending_query(owner: UserId, expires_at: Option<DateTime<Utc>>) -> NewQuery {
    NewQuery {
        user_id: owner,
        account_ref: String::new(),
        order_id: Some("ORD-1".to_owned()),
        sku: "SKU-1".to_owned(),
        details: "Blue widget".to_owned(),
        message: Some("Where is my parcel?".to_owned()),
        answer: None,
        handler_name: None,
        status: QueryStatus::InProgress,
        expires_at,
    }
}

#[tokio::test]
async fn test_notifies_exactly_once() {
    let fx = fixture(MockMailer::new()).await;
    let now = Utc::now();

    let query = fx
        .queries
        .insert(pending_query(fx.owner, Some(now + Duration::minutes(30))))
        .await
        .unwrap();

    let report = fx.scheduler.run_sweep(now).await;
    assert_eq!(report.notified, 1);
    assert_eq!(fx.mailer.sent_count(), 1);
    assert!(fx.queries.get(query.id).unwrap().notified_expire);

    // Sweeping again, immediately or later, never re-sends.
    fx.scheduler.run_sweep(now).await;
    fx.scheduler.run_sweep(now + Duration::hours(2)).await;
    assert_eq!(fx.mailer.sent_count(), 1);
    assert_eq!(fx.mailer.attempt_count(), 1);
}

#[tokio::test]
async fn test_failed_send_is_retried_until_success() {
    let fx = fixture(MockMailer::failing()).await;
    let now = Utc::now();

    let query = fx
        .queries
        .insert(pending_query(fx.owner, Some(now)))
        .await
        .unwrap();

    // The transport declines: the obligation stays pending.
    let report = fx.scheduler.run_sweep(now).await;
    assert_eq!(report.deferred, 1);
    assert_eq!(fx.mailer.sent_count(), 0);
    assert!(!fx.queries.get(query.id).unwrap().notified_expire);

    // Transport recovers: exactly one notification goes out.
    fx.mailer.set_failing(false);
    let report = fx.scheduler.run_sweep(now + Duration::minutes(1)).await;
    assert_eq!(report.notified, 1);
    assert_eq!(fx.mailer.sent_count(), 1);
    assert!(fx.queries.get(query.id).unwrap().notified_expire);

    fx.scheduler.run_sweep(now + Duration::minutes(2)).await;
    assert_eq!(fx.mailer.sent_count(), 1);
}

#[tokio::test]
async fn test_lookahead_window_boundary() {
    let fx = fixture(MockMailer::new()).await;
    let now = Utc::now();

    let inside = fx
        .queries
        .insert(pending_query(fx.owner, Some(now + Duration::minutes(59))))
        .await
        .unwrap();
    let outside = fx
        .queries
        .insert(pending_query(fx.owner, Some(now + Duration::minutes(61))))
        .await
        .unwrap();

    let report = fx.scheduler.run_sweep(now).await;
    assert_eq!(report.examined, 1);
    assert!(fx.queries.get(inside.id).unwrap().notified_expire);
    assert!(!fx.queries.get(outside.id).unwrap().notified_expire);

    // A later sweep brings the second query inside the window.
    fx.scheduler.run_sweep(now + Duration::minutes(2)).await;
    assert!(fx.queries.get(outside.id).unwrap().notified_expire);
    assert_eq!(fx.mailer.sent_count(), 2);
}

#[tokio::test]
async fn test_sweep_respects_batch_cap() {
    let fx = fixture(MockMailer::new()).await;
    let now = Utc::now();

    for i in 0..75 {
        fx.queries
            .insert(pending_query(
                fx.owner,
                Some(now - Duration::minutes(i)),
            ))
            .await
            .unwrap();
    }

    let cap = usize::try_from(SWEEP_BATCH_SIZE).unwrap();

    let report = fx.scheduler.run_sweep(now).await;
    assert_eq!(report.examined, cap);
    assert_eq!(report.notified, cap);
    assert_eq!(fx.mailer.sent_count(), cap);

    // The remainder is picked up by the next sweep.
    let report = fx.scheduler.run_sweep(now).await;
    assert_eq!(report.examined, 75 - cap);
    assert_eq!(fx.mailer.sent_count(), 75);
}

#[tokio::test]
async fn test_queries_without_expiry_are_never_candidates() {
    let fx = fixture(MockMailer::new()).await;
    let now = Utc::now();

    let query = fx
        .queries
        .insert(pending_query(fx.owner, None))
        .await
        .unwrap();

    let report = fx.scheduler.run_sweep(now).await;
    assert_eq!(report.examined, 0);
    assert_eq!(fx.mailer.attempt_count(), 0);
    assert!(!fx.queries.get(query.id).unwrap().notified_expire);
}

#[tokio::test]
async fn test_one_bad_candidate_does_not_abort_the_sweep() {
    let fx = fixture(MockMailer::new()).await;
    let now = Utc::now();

    // A query owned by a user that no longer exists, sorted first by
    // deadline, and a healthy one behind it.
    fx.queries
        .insert(pending_query(UserId::new(999), Some(now - Duration::minutes(5))))
        .await
        .unwrap();
    let healthy = fx
        .queries
        .insert(pending_query(fx.owner, Some(now)))
        .await
        .unwrap();

    let report = fx.scheduler.run_sweep(now).await;

    assert_eq!(report.failed, 1);
    assert_eq!(report.notified, 1);
    assert!(fx.queries.get(healthy.id).unwrap().notified_expire);
}

#[tokio::test]
async fn test_notification_names_the_matched_account() {
    let fx = fixture(MockMailer::new()).await;
    let now = Utc::now();

    let account = fx
        .users
        .add_account(
            fx.owner,
            order_portal_server::models::NewAccount {
                platform: "ebay".to_owned(),
                account_name: "Main Store".to_owned(),
                account_id: "store-1".to_owned(),
                image: String::new(),
            },
        )
        .await
        .unwrap();

    let mut query = pending_query(fx.owner, Some(now - Duration::minutes(5)));
    query.account_ref = account.id.to_string();
    fx.queries.insert(query).await.unwrap();

    fx.scheduler.run_sweep(now).await;

    let sent = fx.mailer.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, "asha@example.com");
    assert!(sent[0].subject.contains("has expired"));
    assert!(sent[0].text.contains("Main Store"));
}

/// Mailer that parks every send until the test releases it, to hold a sweep
/// open.
struct GatedMailer {
    entered: Notify,
    release: Notify,
}

impl GatedMailer {
    fn new() -> Self {
        Self {
            entered: Notify::new(),
            release: Notify::new(),
        }
    }
}

#[async_trait]
impl Mailer for GatedMailer {
    async fn send(&self, _message: &MailMessage) -> Result<(), MailError> {
        self.entered.notify_one();
        self.release.notified().await;
        Ok(())
    }
}

#[tokio::test]
async fn test_concurrent_sweeps_do_not_overlap() {
    let queries = Arc::new(MemoryQueryStore::new());
    let users = Arc::new(MemoryUserStore::new());
    let mailer = Arc::new(GatedMailer::new());

    let owner = users
        .insert(NewUser {
            name: "Asha".to_owned(),
            email: Email::parse("asha@example.com").unwrap(),
            password_hash: String::new(),
            role: UserRole::User,
            image: String::new(),
        })
        .await
        .unwrap()
        .id;

    let now = Utc::now();
    queries
        .insert(pending_query(owner, Some(now)))
        .await
        .unwrap();

    let scheduler = Arc::new(ExpiryScheduler::new(queries, users, mailer.clone()));

    // First sweep parks inside the transport send.
    let first = tokio::spawn({
        let scheduler = scheduler.clone();
        async move { scheduler.run_sweep(now).await }
    });
    mailer.entered.notified().await;

    // A second sweep during that window is skipped outright.
    let report = scheduler.run_sweep(now).await;
    assert!(report.skipped);
    assert_eq!(report.examined, 0);

    mailer.release.notify_one();
    let report = first.await.unwrap();
    assert!(!report.skipped);
    assert_eq!(report.notified, 1);
}

/// Double-check the pending state machine edge: a query marked notified by
/// hand is invisible to `find_expiring` even when its deadline is due.
#[tokio::test]
async fn test_notified_queries_are_not_candidates() {
    let fx = fixture(MockMailer::new()).await;
    let now = Utc::now();

    let query = fx
        .queries
        .insert(pending_query(fx.owner, Some(now - Duration::hours(1))))
        .await
        .unwrap();
    assert!(fx.queries.mark_notified(query.id).await.unwrap());

    let due: Vec<Query> = fx
        .queries
        .find_expiring(now + Duration::hours(1), SWEEP_BATCH_SIZE)
        .await
        .unwrap();
    assert!(due.is_empty());

    // And marking again reports "already notified".
    assert!(!fx.queries.mark_notified(query.id).await.unwrap());
}

//! Query service properties: the creation-time snapshot, owner scoping and
//! the expiry re-arm rule.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use chrono::{Duration, Utc};
use rust_decimal::Decimal;

use order_portal_core::{Email, UserId, UserRole};
use order_portal_integration_tests::{
    MemoryOrderStore, MemoryQueryStore, MemoryUserStore, MockMailer,
};
use order_portal_server::db::UserStore;
use order_portal_server::error::AppError;
use order_portal_server::models::NewUser;
use order_portal_server::services::orders::{CreateOrder, UpdateOrder};
use order_portal_server::services::queries::{CreateQuery, UpdateQuery};
use order_portal_server::services::{ExpiryScheduler, OrderService, QueryService};

fn dec(s: &str) -> Decimal {
    s.parse().unwrap()
}

struct Fixture {
    orders: OrderService,
    queries: QueryService,
    query_store: Arc<MemoryQueryStore>,
}

fn fixture() -> Fixture {
    let order_store = Arc::new(MemoryOrderStore::new());
    let query_store = Arc::new(MemoryQueryStore::new());

    Fixture {
        orders: OrderService::new(order_store.clone()),
        queries: QueryService::new(query_store.clone(), order_store),
        query_store,
    }
}

const ALICE: UserId = UserId::new(1);
const BOB: UserId = UserId::new(2);

async fn seed_order(fx: &Fixture, account: &str, order_id: &str) {
    fx.orders
        .create(
            ALICE,
            CreateOrder {
                account_ref: Some(account.to_owned()),
                order_id: Some(order_id.to_owned()),
                sku: Some("SKU-9".to_owned()),
                details: Some("Red widget".to_owned()),
                buy_price: Some(dec("10.00")),
                sell_price: Some(dec("20.00")),
                ..CreateOrder::default()
            },
        )
        .await
        .unwrap();
}

#[tokio::test]
async fn test_snapshot_copied_from_linked_order() {
    let fx = fixture();
    seed_order(&fx, "acct-1", "ORD-9").await;

    let query = fx
        .queries
        .create(
            ALICE,
            Some("acct-1"),
            CreateQuery {
                order_id: Some("ORD-9".to_owned()),
                message: Some("Where is it?".to_owned()),
                ..CreateQuery::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(query.sku, "SKU-9");
    assert_eq!(query.details, "Red widget");
    assert_eq!(query.account_ref, "acct-1");
}

#[tokio::test]
async fn test_snapshot_does_not_track_later_order_edits() {
    let fx = fixture();
    seed_order(&fx, "acct-1", "ORD-9").await;

    let query = fx
        .queries
        .create(
            ALICE,
            Some("acct-1"),
            CreateQuery {
                order_id: Some("ORD-9".to_owned()),
                ..CreateQuery::default()
            },
        )
        .await
        .unwrap();

    // Edit the order after the snapshot was taken.
    let order_row = fx.orders.list(ALICE, None).await.unwrap().remove(0);
    fx.orders
        .update(
            ALICE,
            order_row.id,
            UpdateOrder {
                sku: Some("SKU-CHANGED".to_owned()),
                details: Some("Now green".to_owned()),
                ..UpdateOrder::default()
            },
        )
        .await
        .unwrap();

    let stored = fx.query_store.get(query.id).unwrap();
    assert_eq!(stored.sku, "SKU-9");
    assert_eq!(stored.details, "Red widget");
}

#[tokio::test]
async fn test_snapshot_falls_back_when_order_has_no_sku() {
    let fx = fixture();
    fx.orders
        .create(
            ALICE,
            CreateOrder {
                account_ref: Some("acct-1".to_owned()),
                order_id: Some("ORD-9".to_owned()),
                buy_price: Some(dec("1.00")),
                sell_price: Some(dec("2.00")),
                ..CreateOrder::default()
            },
        )
        .await
        .unwrap();

    let query = fx
        .queries
        .create(
            ALICE,
            Some("acct-1"),
            CreateQuery {
                order_id: Some("ORD-9".to_owned()),
                ..CreateQuery::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(query.sku, "N/A");
    assert_eq!(query.details, "N/A");
}

#[tokio::test]
async fn test_unknown_order_reference_rejected() {
    let fx = fixture();
    seed_order(&fx, "acct-1", "ORD-9").await;

    // Right id, wrong sub-account.
    let err = fx
        .queries
        .create(
            ALICE,
            Some("acct-2"),
            CreateQuery {
                order_id: Some("ORD-9".to_owned()),
                ..CreateQuery::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    // Another user's order is invisible.
    let err = fx
        .queries
        .create(
            BOB,
            Some("acct-1"),
            CreateQuery {
                order_id: Some("ORD-9".to_owned()),
                ..CreateQuery::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
}

#[tokio::test]
async fn test_query_operations_are_owner_scoped() {
    let fx = fixture();

    let query = fx
        .queries
        .create(ALICE, None, CreateQuery::default())
        .await
        .unwrap();

    assert!(matches!(
        fx.queries.update(BOB, query.id, UpdateQuery::default()).await,
        Err(AppError::NotFound(_))
    ));
    assert!(matches!(
        fx.queries.delete(BOB, query.id).await,
        Err(AppError::NotFound(_))
    ));
    assert!(fx.queries.list(BOB, None).await.unwrap().is_empty());
    assert_eq!(fx.queries.list(ALICE, None).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_rescheduling_expiry_rearms_notification() {
    let order_store = Arc::new(MemoryOrderStore::new());
    let query_store = Arc::new(MemoryQueryStore::new());
    let user_store = Arc::new(MemoryUserStore::new());
    let mailer = Arc::new(MockMailer::new());

    let owner = user_store
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

    let queries = QueryService::new(query_store.clone(), order_store);
    let scheduler = Arc::new(ExpiryScheduler::new(
        query_store.clone(),
        user_store,
        mailer.clone(),
    ));

    let now = Utc::now();
    let query = queries
        .create(
            owner,
            None,
            CreateQuery {
                expires_at: Some(now + Duration::minutes(10)),
                ..CreateQuery::default()
            },
        )
        .await
        .unwrap();

    scheduler.run_sweep(now).await;
    assert_eq!(mailer.sent_count(), 1);
    assert!(query_store.get(query.id).unwrap().notified_expire);

    // Moving the deadline re-arms the notification...
    queries
        .update(
            owner,
            query.id,
            UpdateQuery {
                expires_at: Some(Some(now + Duration::minutes(30))),
                ..UpdateQuery::default()
            },
        )
        .await
        .unwrap();
    assert!(!query_store.get(query.id).unwrap().notified_expire);

    scheduler.run_sweep(now).await;
    assert_eq!(mailer.sent_count(), 2);

    // ...while unrelated edits leave the flag alone.
    queries
        .update(
            owner,
            query.id,
            UpdateQuery {
                answer: Some("On its way".to_owned()),
                ..UpdateQuery::default()
            },
        )
        .await
        .unwrap();
    assert!(query_store.get(query.id).unwrap().notified_expire);

    scheduler.run_sweep(now).await;
    assert_eq!(mailer.sent_count(), 2);
}

#[tokio::test]
async fn test_clearing_expiry_stops_notifications() {
    let fx = fixture();
    let now = Utc::now();

    let query = fx
        .queries
        .create(
            ALICE,
            None,
            CreateQuery {
                expires_at: Some(now + Duration::minutes(10)),
                ..CreateQuery::default()
            },
        )
        .await
        .unwrap();

    // An explicit null clears the deadline entirely.
    fx.queries
        .update(
            ALICE,
            query.id,
            UpdateQuery {
                expires_at: Some(None),
                ..UpdateQuery::default()
            },
        )
        .await
        .unwrap();

    let stored = fx.query_store.get(query.id).unwrap();
    assert!(stored.expires_at.is_none());
    assert!(!stored.notified_expire);
}

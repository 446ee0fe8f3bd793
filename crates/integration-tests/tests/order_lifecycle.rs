//! Order lifecycle properties: uniqueness, derived fields, soft delete and
//! owner scoping.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use rust_decimal::Decimal;

use order_portal_core::{OrderId, OrderStatus, UserId};
use order_portal_integration_tests::MemoryOrderStore;
use order_portal_server::db::StoreError;
use order_portal_server::error::AppError;
use order_portal_server::services::OrderService;
use order_portal_server::services::orders::{CreateOrder, UpdateOrder};

fn dec(s: &str) -> Decimal {
    s.parse().unwrap()
}

fn service() -> (OrderService, Arc<MemoryOrderStore>) {
    let store = Arc::new(MemoryOrderStore::new());
    (OrderService::new(store.clone()), store)
}

fn order_req(account: &str, order_id: &str) -> CreateOrder {
    CreateOrder {
        account_ref: Some(account.to_owned()),
        order_id: Some(order_id.to_owned()),
        sku: Some("SKU-1".to_owned()),
        details: Some("Blue widget".to_owned()),
        buy_price: Some(dec("10.00")),
        sell_price: Some(dec("25.00")),
        ..CreateOrder::default()
    }
}

const ALICE: UserId = UserId::new(1);
const BOB: UserId = UserId::new(2);

#[tokio::test]
async fn test_duplicate_order_id_rejected_within_account() {
    let (orders, _) = service();

    orders.create(ALICE, order_req("acct-1", "ORD-1")).await.unwrap();

    let err = orders
        .create(ALICE, order_req("acct-1", "ORD-1"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        AppError::Store(StoreError::Duplicate(_))
    ));

    // A different sub-account or a different order id is fine.
    orders.create(ALICE, order_req("acct-2", "ORD-1")).await.unwrap();
    orders.create(ALICE, order_req("acct-1", "ORD-2")).await.unwrap();

    // And so is the same key under another user.
    orders.create(BOB, order_req("acct-1", "ORD-1")).await.unwrap();
}

#[tokio::test]
async fn test_create_computes_derived_fields_and_defaults() {
    let (orders, _) = service();

    let order = orders
        .create(
            ALICE,
            CreateOrder {
                refund_amount: Some(dec("5.00")),
                ..order_req("acct-1", "ORD-1")
            },
        )
        .await
        .unwrap();

    assert_eq!(order.net_profit, dec("10.00"));
    assert_eq!(order.roi, dec("100.00"));
    assert_eq!(order.status, OrderStatus::Pending);
    assert!(!order.is_deleted);
}

#[tokio::test]
async fn test_missing_money_inputs_rejected() {
    let (orders, _) = service();

    let err = orders
        .create(
            ALICE,
            CreateOrder {
                buy_price: None,
                ..order_req("acct-1", "ORD-1")
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    let err = orders
        .create(
            ALICE,
            CreateOrder {
                order_id: Some("  ".to_owned()),
                ..order_req("acct-1", "ORD-1")
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
}

#[tokio::test]
async fn test_update_merges_money_inputs_before_recomputing() {
    let (orders, _) = service();

    let order = orders.create(ALICE, order_req("acct-1", "ORD-1")).await.unwrap();

    // Only the sell price changes; buy price and refund merge from storage.
    let updated = orders
        .update(
            ALICE,
            order.id,
            UpdateOrder {
                sell_price: Some(dec("13.00")),
                ..UpdateOrder::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(updated.buy_price, dec("10.00"));
    assert_eq!(updated.net_profit, dec("3.00"));
    assert_eq!(updated.roi, dec("30.00"));
}

#[tokio::test]
async fn test_soft_delete_restore_round_trip() {
    let (orders, _) = service();

    let original = orders.create(ALICE, order_req("acct-1", "ORD-1")).await.unwrap();

    orders.soft_delete(ALICE, original.id).await.unwrap();

    // Trashed orders leave the active listing and appear in the trash.
    assert!(orders.list(ALICE, None).await.unwrap().is_empty());
    let trashed = orders.list_deleted(ALICE, None).await.unwrap();
    assert_eq!(trashed.len(), 1);
    assert!(trashed[0].is_deleted);

    let restored = orders.restore(ALICE, original.id).await.unwrap();

    assert!(!restored.is_deleted);
    assert_eq!(restored.order_id, original.order_id);
    assert_eq!(restored.account_ref, original.account_ref);
    assert_eq!(restored.sku, original.sku);
    assert_eq!(restored.details, original.details);
    assert_eq!(restored.buy_price, original.buy_price);
    assert_eq!(restored.sell_price, original.sell_price);
    assert_eq!(restored.net_profit, original.net_profit);
    assert_eq!(restored.roi, original.roi);
    assert_eq!(restored.status, original.status);
    assert_eq!(restored.created_at, original.created_at);
}

#[tokio::test]
async fn test_permanent_delete_is_gone() {
    let (orders, _) = service();

    let order = orders.create(ALICE, order_req("acct-1", "ORD-1")).await.unwrap();

    orders.soft_delete(ALICE, order.id).await.unwrap();
    orders.purge(ALICE, order.id).await.unwrap();

    let err = orders
        .update(ALICE, order.id, UpdateOrder::default())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
    assert!(orders.list_deleted(ALICE, None).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_bulk_purge_ignores_foreign_and_unknown_ids() {
    let (orders, store) = service();

    let mine_1 = orders.create(ALICE, order_req("acct-1", "ORD-1")).await.unwrap();
    let mine_2 = orders.create(ALICE, order_req("acct-1", "ORD-2")).await.unwrap();
    let theirs = orders.create(BOB, order_req("acct-1", "ORD-1")).await.unwrap();

    let removed = orders
        .purge_many(
            ALICE,
            &[mine_1.id, theirs.id, OrderId::new(9999)],
        )
        .await
        .unwrap();

    assert_eq!(removed, 1);

    let remaining: Vec<OrderId> = store.rows().iter().map(|o| o.id).collect();
    assert!(remaining.contains(&mine_2.id));
    assert!(remaining.contains(&theirs.id));
    assert!(!remaining.contains(&mine_1.id));
}

#[tokio::test]
async fn test_bulk_purge_rejects_empty_id_list() {
    let (orders, _) = service();

    let err = orders.purge_many(ALICE, &[]).await.unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
}

#[tokio::test]
async fn test_operations_are_owner_scoped() {
    let (orders, _) = service();

    let order = orders.create(ALICE, order_req("acct-1", "ORD-1")).await.unwrap();

    // Another user cannot touch the order by guessing its id.
    assert!(matches!(
        orders.update(BOB, order.id, UpdateOrder::default()).await,
        Err(AppError::NotFound(_))
    ));
    assert!(matches!(
        orders.soft_delete(BOB, order.id).await,
        Err(AppError::NotFound(_))
    ));
    assert!(matches!(
        orders.restore(BOB, order.id).await,
        Err(AppError::NotFound(_))
    ));
    assert!(matches!(
        orders.purge(BOB, order.id).await,
        Err(AppError::NotFound(_))
    ));
    assert!(orders.list(BOB, None).await.unwrap().is_empty());

    // The owner still sees it untouched.
    assert_eq!(orders.list(ALICE, None).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_listing_filters_by_account_newest_first() {
    let (orders, _) = service();

    orders.create(ALICE, order_req("acct-1", "ORD-1")).await.unwrap();
    orders.create(ALICE, order_req("acct-2", "ORD-2")).await.unwrap();
    orders.create(ALICE, order_req("acct-1", "ORD-3")).await.unwrap();

    let all = orders.list(ALICE, None).await.unwrap();
    assert_eq!(all.len(), 3);
    assert_eq!(all[0].order_id, "ORD-3");

    let scoped = orders.list(ALICE, Some("acct-1".to_owned())).await.unwrap();
    assert_eq!(scoped.len(), 2);
    assert!(scoped.iter().all(|o| o.account_ref == "acct-1"));
}

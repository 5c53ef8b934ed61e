use chrono::{Duration, TimeZone, Utc};
use common::model::{
    ExchangeCredentials, ExchangeType, NewUnprocessedOrder, NewUser, OrderDraft, ReceiptRecord, ReceiptStatus,
    Side,
};
use order_service::{InMemoryOrderRepository, OrderRepository};
use rust_decimal_macros::dec;

async fn repo_with_user() -> (InMemoryOrderRepository, i64) {
    let repo = InMemoryOrderRepository::new();
    let user = repo
        .create_user(NewUser {
            login: "trader".to_string(),
            password_hash: "hash".to_string(),
            email: None,
            is_admin: false,
            bybit: ExchangeCredentials::default(),
        })
        .await
        .unwrap();
    (repo, user.id)
}

fn staged(user_id: i64, order_id: &str, minutes_ago: i64) -> NewUnprocessedOrder {
    NewUnprocessedOrder {
        user_id,
        order_id: order_id.to_string(),
        exchange_type: ExchangeType::Bybit,
        side: Side::Sell,
        price: dec!(95),
        quantity: dec!(10),
        amount: dec!(950),
        created_at: Utc::now() - Duration::minutes(minutes_ago),
    }
}

#[tokio::test]
async fn test_duplicate_login_is_rejected() {
    let (repo, _) = repo_with_user().await;
    let result = repo
        .create_user(NewUser {
            login: "trader".to_string(),
            password_hash: "other".to_string(),
            email: None,
            is_admin: true,
            bybit: ExchangeCredentials::default(),
        })
        .await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_upsert_keeps_one_order_per_key() {
    let (repo, user_id) = repo_with_user().await;

    let mut first = OrderDraft::new("123", ExchangeType::Bybit, Side::Buy);
    first.price = Some(dec!(95.10));
    first.quantity = Some(dec!(10));
    first.cost = Some(dec!(951));
    let (created, inserted) = repo.upsert_order(user_id, first).await.unwrap();
    assert!(inserted);

    let mut second = OrderDraft::new("123", ExchangeType::Bybit, Side::Sell);
    second.cost = Some(dec!(1000));
    second.commission = dec!(1.5);
    let (updated, inserted) = repo.upsert_order(user_id, second).await.unwrap();
    assert!(!inserted);
    assert_eq!(updated.id, created.id);
    assert_eq!(updated.side, Side::Sell);
    assert_eq!(updated.cost, dec!(1000));
    assert_eq!(updated.price, dec!(95.10));
    assert_eq!(updated.commission, dec!(1.5));

    // Same external id on another exchange is a separate order
    let (other, inserted) = repo
        .upsert_order(user_id, OrderDraft::new("123", ExchangeType::Htx, Side::Buy))
        .await
        .unwrap();
    assert!(inserted);
    assert_ne!(other.id, created.id);

    assert_eq!(repo.list_orders(user_id, 500).await.unwrap().len(), 2);
    let latest = repo.find_latest_order(user_id, "123").await.unwrap().unwrap();
    assert_eq!(latest.id, other.id);
}

#[tokio::test]
async fn test_orders_are_scoped_to_their_owner() {
    let (repo, user_id) = repo_with_user().await;
    let (order, _) = repo
        .upsert_order(user_id, OrderDraft::new("555", ExchangeType::Bybit, Side::Buy))
        .await
        .unwrap();

    assert!(repo.get_order_by_id(user_id + 100, order.id).await.unwrap().is_none());
    assert!(repo.get_order(user_id + 100, "555", ExchangeType::Bybit).await.unwrap().is_none());
    assert!(repo
        .delete_order(user_id + 100, "555", ExchangeType::Bybit)
        .await
        .unwrap()
        .is_none());
    assert!(repo.get_order(user_id, "555", ExchangeType::Bybit).await.unwrap().is_some());
}

#[tokio::test]
async fn test_bank_detail_soft_delete() {
    let (repo, user_id) = repo_with_user().await;
    let sber = repo.create_bank_detail(user_id, "Sber").await.unwrap();
    let tinkoff = repo.create_bank_detail(user_id, "Tinkoff").await.unwrap();

    assert!(repo.soft_delete_bank_detail(user_id, sber.id).await.unwrap());
    assert!(!repo.soft_delete_bank_detail(user_id + 1, tinkoff.id).await.unwrap());

    let active = repo.list_bank_details(user_id, false).await.unwrap();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].name, "Tinkoff");

    let all = repo.list_bank_details(user_id, true).await.unwrap();
    assert_eq!(all.len(), 2);
    assert!(repo.get_bank_detail(user_id, sber.id).await.unwrap().unwrap().is_deleted);
}

#[tokio::test]
async fn test_staging_ignores_duplicates() {
    let (repo, user_id) = repo_with_user().await;

    assert!(repo.insert_unprocessed(staged(user_id, "A", 30)).await.unwrap());
    assert!(repo.insert_unprocessed(staged(user_id, "B", 10)).await.unwrap());
    assert!(!repo.insert_unprocessed(staged(user_id, "A", 5)).await.unwrap());

    let list = repo.list_unprocessed(user_id).await.unwrap();
    let ids: Vec<&str> = list.iter().map(|o| o.order_id.as_str()).collect();
    assert_eq!(ids, vec!["B", "A"]);

    let mut staged_ids = repo.staged_order_ids(user_id, ExchangeType::Bybit).await.unwrap();
    staged_ids.sort();
    assert_eq!(staged_ids, vec!["A".to_string(), "B".to_string()]);
    assert!(repo.staged_order_ids(user_id, ExchangeType::Mexc).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_receipt_is_attached_and_removed_with_order() {
    let (repo, user_id) = repo_with_user().await;
    let (order, _) = repo
        .upsert_order(user_id, OrderDraft::new("777", ExchangeType::Bybit, Side::Sell))
        .await
        .unwrap();

    let mut record = ReceiptRecord::pending(order.id);
    record.status = ReceiptStatus::Sent;
    record.provider_uuid = Some("uuid-1".to_string());
    repo.save_receipt(&record).await.unwrap();

    let loaded = repo.get_order_by_id(user_id, order.id).await.unwrap().unwrap();
    assert_eq!(loaded.receipt.as_ref().map(|r| r.status), Some(ReceiptStatus::Sent));

    repo.delete_order(user_id, "777", ExchangeType::Bybit).await.unwrap();
    assert!(repo.get_receipt(order.id).await.unwrap().is_none());

    // Receipts need an existing order
    assert!(repo.save_receipt(&ReceiptRecord::pending(order.id)).await.is_err());
}

#[tokio::test]
async fn test_orders_between_is_half_open() {
    let (repo, user_id) = repo_with_user().await;
    let day = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();

    for (id, at) in [
        ("before", day - Duration::seconds(1)),
        ("start", day),
        ("late", day + Duration::hours(23)),
        ("next", day + Duration::days(1)),
    ] {
        let mut draft = OrderDraft::new(id, ExchangeType::Bybit, Side::Buy);
        draft.created_at = Some(at);
        repo.upsert_order(user_id, draft).await.unwrap();
    }

    let orders = repo
        .list_orders_between(user_id, day, day + Duration::days(1))
        .await
        .unwrap();
    let ids: Vec<&str> = orders.iter().map(|o| o.external_id.as_str()).collect();
    assert_eq!(ids, vec!["late", "start"]);
}

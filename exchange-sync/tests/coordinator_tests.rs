mod support;

use std::sync::Arc;

use chrono::{Duration, Utc};
use common::model::{ExchangeCredentials, ExchangeType, Side};
use exchange_sync::{AccountHandle, ExchangeSyncConfig, FetchCoordinator, Reconciler, StatsFilter};

use support::{trade, MockAccount, MockConnector};

fn account(user_id: i64, key: &str) -> AccountHandle {
    AccountHandle {
        user_id,
        login: format!("user{}", user_id),
        credentials: ExchangeCredentials::new(key, "secret-12345"),
    }
}

fn coordinator(connector: MockConnector) -> FetchCoordinator {
    let reconciler = Reconciler::new(Arc::new(connector), &ExchangeSyncConfig::default());
    FetchCoordinator::new(Arc::new(reconciler), 10)
}

#[tokio::test]
async fn test_window_keeps_only_recent_trades() {
    let now = Utc::now();
    let hours_ago = |h: i64| (now - Duration::hours(h)).timestamp_millis();

    let mut undated = trade("undated", "0", 0);
    undated.create_date = None;

    let connector = MockConnector::default().with_account(
        "key-one",
        MockAccount {
            history: vec![trade("old", "0", hours_ago(25)), trade("fresh", "1", hours_ago(23)), undated],
            ..Default::default()
        },
    );

    let orders = coordinator(connector)
        .collect_since(vec![account(1, "key-one")], &StatsFilter::default(), now - Duration::hours(24))
        .await;

    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0].external_id, "fresh");
    assert_eq!(orders[0].login, "user1");
}

#[tokio::test]
async fn test_panicking_worker_does_not_drop_other_results() {
    let now = Utc::now().timestamp_millis();
    let connector = MockConnector::default()
        .with_account(
            "key-good",
            MockAccount {
                pending: vec![trade("G1", "0", now)],
                ..Default::default()
            },
        )
        .with_account(
            "key-boom",
            MockAccount {
                panics: true,
                ..Default::default()
            },
        );

    let orders = coordinator(connector)
        .collect(vec![account(1, "key-boom"), account(2, "key-good")], &StatsFilter::default())
        .await;

    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0].user_id, 2);
}

#[tokio::test]
async fn test_results_are_filtered_and_sorted_newest_first() {
    let now = Utc::now();
    let ms = |minutes: i64| (now - Duration::minutes(minutes)).timestamp_millis();
    let connector = MockConnector::default()
        .with_account(
            "key-one",
            MockAccount {
                history: vec![trade("s-old", "1", ms(90)), trade("b", "0", ms(10))],
                ..Default::default()
            },
        )
        .with_account(
            "key-two",
            MockAccount {
                history: vec![trade("s-new", "1", ms(5))],
                ..Default::default()
            },
        );
    let coordinator = coordinator(connector);
    let accounts = vec![account(1, "key-one"), account(2, "key-two")];

    let sells = coordinator
        .collect(
            accounts.clone(),
            &StatsFilter {
                side: Some(Side::Sell),
                exchange: None,
            },
        )
        .await;
    let ids: Vec<_> = sells.iter().map(|o| o.external_id.as_str()).collect();
    assert_eq!(ids, vec!["s-new", "s-old"]);

    let other_exchange = coordinator
        .collect(
            accounts,
            &StatsFilter {
                side: None,
                exchange: Some(ExchangeType::Mexc),
            },
        )
        .await;
    assert!(other_exchange.is_empty());
}

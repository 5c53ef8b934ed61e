//! Concurrent fetch across many accounts for the statistics view

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use common::decimal::{Amount, Price, Quantity};
use common::model::{ExchangeCredentials, ExchangeType, Side};
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::normalize::NormalizedTrade;
use crate::reconciler::Reconciler;

/// Hours covered by the statistics window
pub const STATS_WINDOW_HOURS: i64 = 24;

/// One account to poll
#[derive(Debug, Clone)]
pub struct AccountHandle {
    pub user_id: i64,
    pub login: String,
    pub credentials: ExchangeCredentials,
}

/// Optional filters applied after collection
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StatsFilter {
    pub side: Option<Side>,
    pub exchange: Option<ExchangeType>,
}

/// A fetched trade, ready for display; never persisted
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplayOrder {
    pub external_id: String,
    pub user_id: i64,
    pub login: String,
    pub exchange_type: ExchangeType,
    #[serde(rename = "type")]
    pub side: Side,
    #[serde(with = "rust_decimal::serde::str")]
    pub quantity: Quantity,
    #[serde(with = "rust_decimal::serde::str")]
    pub price: Price,
    #[serde(with = "rust_decimal::serde::str")]
    pub cost: Amount,
    pub created_at: DateTime<Utc>,
    pub status_raw: Option<String>,
}

impl DisplayOrder {
    fn from_trade(trade: NormalizedTrade, account: &AccountHandle, exchange_type: ExchangeType) -> Self {
        Self {
            external_id: trade.external_id,
            user_id: account.user_id,
            login: account.login.clone(),
            exchange_type,
            side: trade.side,
            quantity: trade.quantity,
            price: trade.price,
            cost: trade.fiat_amount,
            created_at: trade.created_at,
            status_raw: trade.status_raw,
        }
    }
}

/// Dashboard aggregates over a result list
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsSummary {
    pub total: usize,
    pub buy_count: usize,
    pub sell_count: usize,
    #[serde(with = "rust_decimal::serde::str")]
    pub total_amount: Amount,
}

impl StatsSummary {
    pub fn from_orders(orders: &[DisplayOrder]) -> Self {
        orders.iter().fold(Self::default(), |mut acc, order| {
            acc.total += 1;
            match order.side {
                Side::Buy => acc.buy_count += 1,
                Side::Sell => acc.sell_count += 1,
            }
            acc.total_amount += order.cost;
            acc
        })
    }
}

/// Slice of `orders` for a 1-based page
pub fn paginate(orders: &[DisplayOrder], page: usize, limit: usize) -> &[DisplayOrder] {
    let limit = limit.max(1);
    let start = page.saturating_sub(1).saturating_mul(limit);
    if start >= orders.len() {
        return &[];
    }
    let end = (start + limit).min(orders.len());
    &orders[start..end]
}

/// Runs the fetch-only path for many accounts on a bounded pool
pub struct FetchCoordinator {
    reconciler: Arc<Reconciler>,
    workers: usize,
}

impl FetchCoordinator {
    /// Create a coordinator with `workers` concurrent fetches
    pub fn new(reconciler: Arc<Reconciler>, workers: usize) -> Self {
        Self {
            reconciler,
            workers: workers.max(1),
        }
    }

    /// Trades of the last 24 hours, newest first
    pub async fn collect(&self, accounts: Vec<AccountHandle>, filter: &StatsFilter) -> Vec<DisplayOrder> {
        let window_start = Utc::now() - Duration::hours(STATS_WINDOW_HOURS);
        self.collect_since(accounts, filter, window_start).await
    }

    /// Trades created at or after `window_start`, newest first
    pub async fn collect_since(
        &self,
        accounts: Vec<AccountHandle>,
        filter: &StatsFilter,
        window_start: DateTime<Utc>,
    ) -> Vec<DisplayOrder> {
        let exchange = self.reconciler.exchange();
        if filter.exchange.is_some_and(|requested| requested != exchange) {
            return Vec::new();
        }

        let account_count = accounts.len();
        let tasks = accounts.into_iter().map(|account| {
            let reconciler = Arc::clone(&self.reconciler);
            tokio::spawn(async move {
                reconciler
                    .fetch_recent(&account.credentials, window_start)
                    .await
                    .into_iter()
                    .map(|trade| DisplayOrder::from_trade(trade, &account, exchange))
                    .collect::<Vec<_>>()
            })
        });

        let batches: Vec<Vec<DisplayOrder>> = stream::iter(tasks)
            .buffer_unordered(self.workers)
            .map(|joined| match joined {
                Ok(orders) => orders,
                Err(e) => {
                    warn!("Statistics worker failed: {}", e);
                    Vec::new()
                }
            })
            .collect()
            .await;

        let mut orders: Vec<DisplayOrder> = batches
            .into_iter()
            .flatten()
            .filter(|order| filter.side.map_or(true, |side| order.side == side))
            .collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        info!("Collected {} orders from {} accounts", orders.len(), account_count);
        orders
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn order(id: &str, side: Side, cost: Amount) -> DisplayOrder {
        DisplayOrder {
            external_id: id.to_string(),
            user_id: 1,
            login: "trader".to_string(),
            exchange_type: ExchangeType::Bybit,
            side,
            quantity: dec!(1),
            price: cost,
            cost,
            created_at: Utc::now(),
            status_raw: None,
        }
    }

    #[test]
    fn test_summary_counts_sides() {
        let orders = vec![
            order("a", Side::Buy, dec!(100)),
            order("b", Side::Sell, dec!(250.50)),
            order("c", Side::Sell, dec!(49.50)),
        ];
        let summary = StatsSummary::from_orders(&orders);
        assert_eq!(summary.total, 3);
        assert_eq!(summary.buy_count, 1);
        assert_eq!(summary.sell_count, 2);
        assert_eq!(summary.total_amount, dec!(400));
    }

    #[test]
    fn test_paginate_bounds() {
        let orders: Vec<_> = (0..5).map(|i| order(&i.to_string(), Side::Buy, dec!(1))).collect();
        assert_eq!(paginate(&orders, 1, 2).len(), 2);
        assert_eq!(paginate(&orders, 3, 2).len(), 1);
        assert!(paginate(&orders, 4, 2).is_empty());
        assert_eq!(paginate(&orders, 0, 50).len(), 5);
    }
}

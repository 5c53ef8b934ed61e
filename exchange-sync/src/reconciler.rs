//! Reconciliation of exchange trades against stored orders

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use common::model::{ExchangeCredentials, ExchangeType, NewUnprocessedOrder};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::client::{ExchangeConnector, P2pOrderSource};
use crate::config::ExchangeSyncConfig;
use crate::normalize::NormalizedTrade;
use crate::raw::RawTrade;

/// External ids already known for a user, snapshotted before a fetch
#[derive(Debug, Clone, Default)]
pub struct ExclusionSets {
    /// Ids of confirmed trade orders
    pub confirmed: HashSet<String>,
    /// Ids already sitting in the staging table
    pub staged: HashSet<String>,
}

impl ExclusionSets {
    pub fn new(confirmed: impl IntoIterator<Item = String>, staged: impl IntoIterator<Item = String>) -> Self {
        Self {
            confirmed: confirmed.into_iter().collect(),
            staged: staged.into_iter().collect(),
        }
    }

    /// Whether the id is known in either set
    pub fn contains(&self, external_id: &str) -> bool {
        self.confirmed.contains(external_id) || self.staged.contains(external_id)
    }
}

/// Outcome kind of a sync
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncStatus {
    /// Nothing was fetched because the credentials are unusable
    Skipped,
    /// Both lists were requested; some calls may still have failed
    Completed,
}

/// Result of one reconciliation run
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncReport {
    pub status: SyncStatus,
    /// Records to stage, deduplicated
    #[serde(skip)]
    pub new_orders: Vec<NewUnprocessedOrder>,
    /// Items received across both lists
    pub fetched: usize,
    /// List calls that failed and contributed nothing
    pub failed_calls: usize,
    pub message: String,
}

impl SyncReport {
    fn skipped(exchange: ExchangeType) -> Self {
        Self {
            status: SyncStatus::Skipped,
            new_orders: Vec::new(),
            fetched: 0,
            failed_calls: 0,
            message: format!("{} API keys are not configured", exchange),
        }
    }
}

/// Fetches a user's recent trades and decides which are new
pub struct Reconciler {
    connector: Arc<dyn ExchangeConnector>,
    page_size: u32,
    min_credential_len: usize,
}

impl Reconciler {
    /// Create a new reconciler
    pub fn new(connector: Arc<dyn ExchangeConnector>, config: &ExchangeSyncConfig) -> Self {
        Self {
            connector,
            page_size: config.page_size,
            min_credential_len: config.min_credential_len,
        }
    }

    /// Exchange this reconciler syncs
    pub fn exchange(&self) -> ExchangeType {
        self.connector.exchange()
    }

    /// Request pending orders then order history; failed calls are logged and skipped
    async fn fetch_lists(&self, source: &dyn P2pOrderSource) -> (Vec<RawTrade>, usize) {
        let mut items = Vec::new();
        let mut failed = 0;

        match source.pending_orders(1, self.page_size).await {
            Ok(batch) => items.extend(batch),
            Err(e) => {
                warn!("Pending orders request failed: {}", e);
                failed += 1;
            }
        }

        match source.order_history(1, self.page_size).await {
            Ok(batch) => items.extend(batch),
            Err(e) => {
                warn!("Order history request failed: {}", e);
                failed += 1;
            }
        }

        (items, failed)
    }

    /// Produce the staging records for trades not yet known to the user
    pub async fn reconcile(
        &self,
        user_id: i64,
        credentials: &ExchangeCredentials,
        exclusions: &ExclusionSets,
    ) -> SyncReport {
        let exchange = self.exchange();
        let Some((api_key, api_secret)) = credentials.usable(self.min_credential_len) else {
            debug!("Skipping sync for user {}: keys not configured", user_id);
            return SyncReport::skipped(exchange);
        };

        let source = self.connector.connect(api_key, api_secret);
        let (items, failed_calls) = self.fetch_lists(source.as_ref()).await;
        let fetched = items.len();
        let now = Utc::now();

        let mut seen = HashSet::new();
        let new_orders: Vec<NewUnprocessedOrder> = items
            .iter()
            .filter_map(|raw| NormalizedTrade::from_raw(raw, now))
            .filter(|trade| !exclusions.contains(&trade.external_id))
            .filter(|trade| seen.insert(trade.external_id.clone()))
            .map(|trade| trade.into_unprocessed(user_id, exchange))
            .collect();

        info!(
            "Sync for user {}: fetched {}, new {}, failed calls {}",
            user_id,
            fetched,
            new_orders.len(),
            failed_calls
        );

        SyncReport {
            status: SyncStatus::Completed,
            message: format!("Fetched {} orders, {} new", fetched, new_orders.len()),
            new_orders,
            fetched,
            failed_calls,
        }
    }

    /// Fetch-only path: trades created at or after `window_start`
    ///
    /// Records without parseable creation millis are discarded here.
    pub async fn fetch_recent(
        &self,
        credentials: &ExchangeCredentials,
        window_start: DateTime<Utc>,
    ) -> Vec<NormalizedTrade> {
        let Some((api_key, api_secret)) = credentials.usable(self.min_credential_len) else {
            return Vec::new();
        };

        let source = self.connector.connect(api_key, api_secret);
        let (items, _) = self.fetch_lists(source.as_ref()).await;
        let threshold_ms = window_start.timestamp_millis();
        let now = Utc::now();

        let mut seen = HashSet::new();
        items
            .iter()
            .filter_map(|raw| NormalizedTrade::from_raw(raw, now))
            .filter(|trade| trade.created_ms.is_some_and(|ms| ms >= threshold_ms))
            .filter(|trade| seen.insert(trade.external_id.clone()))
            .collect()
    }
}

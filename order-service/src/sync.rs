//! Exchange reconciliation into the staging table

use std::sync::Arc;

use common::error::{Error, Result};
use common::model::{UnprocessedOrder, User};
use exchange_sync::{
    AccountHandle, DisplayOrder, ExclusionSets, FetchCoordinator, Reconciler, StatsFilter, SyncReport,
};
use tracing::{debug, info};

use crate::repository::OrderRepository;

/// Stages new exchange trades and serves the admin trade feed
pub struct SyncService {
    repo: Arc<dyn OrderRepository>,
    reconciler: Arc<Reconciler>,
    coordinator: FetchCoordinator,
}

impl SyncService {
    /// Create a sync service running up to `workers` concurrent statistics fetches
    pub fn new(repo: Arc<dyn OrderRepository>, reconciler: Arc<Reconciler>, workers: usize) -> Self {
        let coordinator = FetchCoordinator::new(Arc::clone(&reconciler), workers);
        Self {
            repo,
            reconciler,
            coordinator,
        }
    }

    /// Pull the user's recent trades and stage the ones not seen before
    ///
    /// Returns the run report together with the full staging list.
    pub async fn sync_user(&self, user_id: i64) -> Result<(SyncReport, Vec<UnprocessedOrder>)> {
        let user = self
            .repo
            .get_user(user_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("User not found: {}", user_id)))?;
        let exchange = self.reconciler.exchange();

        let exclusions = ExclusionSets::new(
            self.repo.order_external_ids(user_id, exchange).await?,
            self.repo.staged_order_ids(user_id, exchange).await?,
        );

        let report = self
            .reconciler
            .reconcile(user_id, user.credentials_for(exchange), &exclusions)
            .await;

        let mut staged = 0;
        for order in &report.new_orders {
            if self.repo.insert_unprocessed(order.clone()).await? {
                staged += 1;
            } else {
                debug!("Order {} was staged concurrently", order.order_id);
            }
        }
        if staged > 0 {
            info!("Staged {} new {} orders for user {}", staged, exchange, user_id);
        }

        let unprocessed = self.repo.list_unprocessed(user_id).await?;
        Ok((report, unprocessed))
    }

    pub async fn list_unprocessed(&self, user_id: i64) -> Result<Vec<UnprocessedOrder>> {
        self.repo.list_unprocessed(user_id).await
    }

    /// Last-24-hour trades across accounts, newest first
    ///
    /// With `user_id` only that user is fetched; otherwise every user with
    /// keys configured for the synced exchange.
    pub async fn recent_trades(&self, user_id: Option<i64>, filter: &StatsFilter) -> Result<Vec<DisplayOrder>> {
        let accounts = self.stats_accounts(user_id).await?;
        Ok(self.coordinator.collect(accounts, filter).await)
    }

    async fn stats_accounts(&self, user_id: Option<i64>) -> Result<Vec<AccountHandle>> {
        let exchange = self.reconciler.exchange();
        let users: Vec<User> = match user_id {
            Some(id) => self.repo.get_user(id).await?.into_iter().collect(),
            None => self.repo.list_users().await?,
        };

        Ok(users
            .into_iter()
            .filter(|user| user.credentials_for(exchange).is_configured())
            .map(|user| AccountHandle {
                user_id: user.id,
                credentials: user.credentials_for(exchange).clone(),
                login: user.login,
            })
            .collect())
    }
}

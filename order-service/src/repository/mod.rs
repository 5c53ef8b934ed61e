//! Storage for users, bank details, orders, staged trades and receipts

mod memory;
mod postgres;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::error::Result;
use common::model::{
    BankDetail, ExchangeType, NewUnprocessedOrder, NewUser, OrderDraft, ReceiptRecord, TradeOrder,
    UnprocessedOrder, User,
};

pub use memory::InMemoryOrderRepository;
pub use postgres::PostgresOrderRepository;

use crate::config::OrderServiceConfig;

/// Order repository trait defining the interface for back-office storage
///
/// Every order lookup is scoped to its owner; a record owned by someone
/// else is reported as absent.
#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Create a user; fails with a validation error if the login is taken
    async fn create_user(&self, user: NewUser) -> Result<User>;

    async fn get_user(&self, id: i64) -> Result<Option<User>>;

    async fn get_user_by_login(&self, login: &str) -> Result<Option<User>>;

    /// Persist profile and credential fields
    async fn update_user(&self, user: &User) -> Result<()>;

    /// All users ordered by login
    async fn list_users(&self) -> Result<Vec<User>>;

    async fn set_password_hash(&self, user_id: i64, password_hash: &str) -> Result<()>;

    /// Users whose login contains `query` ignoring case, or whose id contains it, by id
    async fn search_users(&self, query: &str, limit: usize) -> Result<Vec<User>>;

    async fn create_bank_detail(&self, user_id: i64, name: &str) -> Result<BankDetail>;

    async fn get_bank_detail(&self, user_id: i64, id: i64) -> Result<Option<BankDetail>>;

    /// Details ordered by id, soft-deleted ones only if asked for
    async fn list_bank_details(&self, user_id: i64, include_deleted: bool) -> Result<Vec<BankDetail>>;

    /// Flag a detail as deleted; `false` if the user does not own it
    async fn soft_delete_bank_detail(&self, user_id: i64, id: i64) -> Result<bool>;

    /// Insert or update on `(user, external_id, exchange_type)`; the flag is `true` on insert
    async fn upsert_order(&self, user_id: i64, draft: OrderDraft) -> Result<(TradeOrder, bool)>;

    async fn get_order(&self, user_id: i64, external_id: &str, exchange: ExchangeType) -> Result<Option<TradeOrder>>;

    async fn get_order_by_id(&self, user_id: i64, id: i64) -> Result<Option<TradeOrder>>;

    /// Newest order with this external id on any exchange
    async fn find_latest_order(&self, user_id: i64, external_id: &str) -> Result<Option<TradeOrder>>;

    /// Order by internal id, whoever owns it
    async fn get_order_any(&self, id: i64) -> Result<Option<TradeOrder>>;

    /// Oldest order with this external id across all users and exchanges
    async fn find_order_any(&self, external_id: &str) -> Result<Option<TradeOrder>>;

    /// Overwrite the editable columns of an existing order, keeping its owner
    ///
    /// A key taken by another order of the same user is a validation error.
    async fn update_order(&self, order: &TradeOrder) -> Result<TradeOrder>;

    /// Remove an order with its receipt, returning what was removed
    async fn delete_order(&self, user_id: i64, external_id: &str, exchange: ExchangeType) -> Result<Option<TradeOrder>>;

    /// Newest first by id
    async fn list_orders(&self, user_id: i64, limit: usize) -> Result<Vec<TradeOrder>>;

    /// Orders created in `[start, end)`, newest first
    async fn list_orders_between(&self, user_id: i64, start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Vec<TradeOrder>>;

    async fn set_screenshot(&self, order_id: i64, file_name: Option<&str>) -> Result<()>;

    /// External ids of the user's confirmed orders on one exchange
    async fn order_external_ids(&self, user_id: i64, exchange: ExchangeType) -> Result<Vec<String>>;

    /// External ids already staged for the user on one exchange
    async fn staged_order_ids(&self, user_id: i64, exchange: ExchangeType) -> Result<Vec<String>>;

    /// Stage a trade; `false` when it was already staged
    async fn insert_unprocessed(&self, order: NewUnprocessedOrder) -> Result<bool>;

    /// Staged trades, newest first by exchange creation time
    async fn list_unprocessed(&self, user_id: i64) -> Result<Vec<UnprocessedOrder>>;

    async fn get_receipt(&self, order_id: i64) -> Result<Option<ReceiptRecord>>;

    /// Insert or replace the receipt record of an order
    async fn save_receipt(&self, record: &ReceiptRecord) -> Result<()>;

    /// Store a `PENDING` record unless the current one blocks a send
    ///
    /// Check and write happen atomically; `false` means another request
    /// holds the order's receipt or it is already final.
    async fn claim_receipt(&self, record: &ReceiptRecord, stale_before: DateTime<Utc>) -> Result<bool>;
}

/// Repository Type
pub enum RepositoryType {
    /// In-memory repository
    InMemory,
    /// PostgreSQL repository
    Postgres { database_url: String, pool_size: u32 },
}

impl RepositoryType {
    /// Pick the backend from configuration
    pub fn from_config(config: &OrderServiceConfig) -> Self {
        match &config.database_url {
            Some(url) => RepositoryType::Postgres {
                database_url: url.clone(),
                pool_size: config.db_pool_size,
            },
            None => RepositoryType::InMemory,
        }
    }
}

/// Open a repository of the given type
pub async fn open_repository(repo_type: RepositoryType) -> Result<Arc<dyn OrderRepository>> {
    let repo: Arc<dyn OrderRepository> = match repo_type {
        RepositoryType::InMemory => Arc::new(InMemoryOrderRepository::new()),
        RepositoryType::Postgres { database_url, pool_size } => {
            Arc::new(PostgresOrderRepository::connect(&database_url, pool_size).await?)
        }
    };
    Ok(repo)
}

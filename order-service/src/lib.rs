//! Order service for the P2P back-office
//!
//! Owns persistence (in-memory or PostgreSQL) and the workflows that sit on
//! top of it: user and bank-detail management, the order upsert, exchange
//! reconciliation into the staging table and fiscal receipts.

pub mod config;
pub mod repository;
pub mod service;
pub mod sync;
pub mod receipt;

pub use config::OrderServiceConfig;
pub use repository::{
    open_repository, InMemoryOrderRepository, OrderRepository, PostgresOrderRepository, RepositoryType,
};
pub use service::{OrderService, Screenshot, Turnover, TurnoverLine};
pub use sync::SyncService;
pub use receipt::{ReceiptOutcome, ReceiptService};

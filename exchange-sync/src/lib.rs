//! Exchange synchronization for P2P trades
//!
//! Pulls a user's recent P2P orders from the exchange, maps them onto the
//! internal schema and decides which of them are new. Persistence is left
//! to the caller; this crate only fetches and reconciles.

pub mod config;
pub mod error;
pub mod signing;
pub mod raw;
pub mod client;
pub mod normalize;
pub mod reconciler;
pub mod coordinator;

pub use config::ExchangeSyncConfig;
pub use error::ExchangeError;
pub use client::{BybitConnector, BybitP2pClient, ExchangeConnector, P2pOrderSource};
pub use normalize::NormalizedTrade;
pub use reconciler::{ExclusionSets, Reconciler, SyncReport, SyncStatus};
pub use coordinator::{AccountHandle, DisplayOrder, FetchCoordinator, StatsFilter, StatsSummary};

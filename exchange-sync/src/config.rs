//! Configuration for exchange synchronization

use std::env;
use std::time::Duration;

/// Default Bybit API host
pub const DEFAULT_BYBIT_BASE_URL: &str = "https://api.bytick.com";

/// Configuration for the exchange client and fetch coordinator
#[derive(Debug, Clone)]
pub struct ExchangeSyncConfig {
    /// Exchange API base URL
    pub base_url: String,
    /// Receive window sent with every signed request, in milliseconds
    pub recv_window: u64,
    /// Per-request timeout
    pub request_timeout: Duration,
    /// Page size for the list calls
    pub page_size: u32,
    /// Worker pool width for the statistics fan-out
    pub stats_workers: usize,
    /// Minimum length of an API key or secret worth trying
    pub min_credential_len: usize,
}

impl Default for ExchangeSyncConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BYBIT_BASE_URL.to_string(),
            recv_window: 10_000,
            request_timeout: Duration::from_secs(15),
            page_size: 20,
            stats_workers: 10,
            min_credential_len: 5,
        }
    }
}

impl ExchangeSyncConfig {
    /// Create a new configuration using environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            base_url: env::var("BYBIT_BASE_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or(defaults.base_url),
            recv_window: env::var("BYBIT_RECV_WINDOW")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.recv_window),
            stats_workers: env::var("STATS_WORKERS")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|n: &usize| *n > 0)
                .unwrap_or(defaults.stats_workers),
            ..defaults
        }
    }

    /// Point the client at another host, e.g. a local mock
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

//! Configuration for the fiscal provider client

use std::env;
use std::time::Duration;

/// Default provider API root
pub const DEFAULT_EVOTOR_BASE_URL: &str = "https://fiscalization.evotor.ru/possystem/v5";

/// Configuration for the fiscal provider client
#[derive(Debug, Clone)]
pub struct FiscalConfig {
    /// Provider API root
    pub base_url: String,
    /// Timeout of the token request
    pub token_timeout: Duration,
    /// Timeout of the registration request
    pub register_timeout: Duration,
}

impl Default for FiscalConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_EVOTOR_BASE_URL.to_string(),
            token_timeout: Duration::from_secs(10),
            register_timeout: Duration::from_secs(30),
        }
    }
}

impl FiscalConfig {
    /// Create a new configuration using environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            base_url: env::var("EVOTOR_BASE_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or(defaults.base_url),
            ..defaults
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

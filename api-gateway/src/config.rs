//! Application configuration

use std::env;

use rand::distributions::Alphanumeric;
use rand::Rng;
use tracing::warn;

pub const DEFAULT_ADDR: &str = "127.0.0.1:8080";

/// Application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Listening address
    pub addr: String,
    /// HMAC secret for access tokens
    pub jwt_secret: String,
    /// Access token lifetime
    pub jwt_ttl_hours: i64,
}

impl AppConfig {
    /// Create a new configuration from environment variables
    ///
    /// Without `JWT_SECRET` a random secret is generated, so tokens do not
    /// survive a restart.
    pub fn from_env() -> Self {
        let jwt_secret = env::var("JWT_SECRET")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| {
                warn!("JWT_SECRET is not set, using a random secret");
                random_secret()
            });

        Self {
            addr: env::var("ADDR").unwrap_or_else(|_| DEFAULT_ADDR.to_string()),
            jwt_secret,
            jwt_ttl_hours: env::var("JWT_TTL_HOURS")
                .ok()
                .and_then(|h| h.parse().ok())
                .unwrap_or(24),
        }
    }

    /// Override the listening address
    pub fn with_addr(mut self, addr: impl Into<String>) -> Self {
        self.addr = addr.into();
        self
    }
}

fn random_secret() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(48)
        .map(char::from)
        .collect()
}

//! Configuration for the order service

use std::env;
use std::path::PathBuf;

/// Configuration for the order service
#[derive(Debug, Clone)]
pub struct OrderServiceConfig {
    /// Database URL; `None` selects the in-memory repository
    pub database_url: Option<String>,
    /// Database connection pool size
    pub db_pool_size: u32,
    /// Root directory for uploaded files
    pub media_root: PathBuf,
    /// Maximum number of orders returned by the "my orders" list
    pub order_list_limit: usize,
    /// bcrypt work factor for new password hashes
    pub password_cost: u32,
}

impl Default for OrderServiceConfig {
    fn default() -> Self {
        Self {
            database_url: env::var("DATABASE_URL").ok().filter(|url| !url.trim().is_empty()),
            db_pool_size: env::var("DB_POOL_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(5),
            media_root: env::var("MEDIA_ROOT")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("./media")),
            order_list_limit: 500,
            password_cost: bcrypt::DEFAULT_COST,
        }
    }
}

impl OrderServiceConfig {
    /// Create a new configuration using environment variables
    pub fn from_env() -> Self {
        Self::default()
    }

    /// In-memory configuration storing media under `media_root`
    pub fn in_memory(media_root: impl Into<PathBuf>) -> Self {
        Self {
            database_url: None,
            db_pool_size: 1,
            media_root: media_root.into(),
            order_list_limit: 500,
            password_cost: bcrypt::DEFAULT_COST,
        }
    }

    /// Use a cheaper bcrypt work factor
    pub fn with_password_cost(mut self, cost: u32) -> Self {
        self.password_cost = cost;
        self
    }

    /// Directory holding order screenshots
    pub fn screenshot_dir(&self) -> PathBuf {
        self.media_root.join("orders").join("screenshots")
    }

    /// Screenshot directory of one user; external ids repeat across users
    pub fn user_screenshot_dir(&self, user_id: i64) -> PathBuf {
        self.screenshot_dir().join(user_id.to_string())
    }
}

//! Signed HTTP client for the Bybit P2P order lists

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use common::model::ExchangeType;
use reqwest::Client;
use serde_json::json;
use tracing::debug;

use crate::config::ExchangeSyncConfig;
use crate::error::ExchangeError;
use crate::raw::{OrderListEnvelope, RawTrade};
use crate::signing;

const PENDING_ORDERS_PATH: &str = "/v5/p2p/order/pending/simplifyList";
const ORDER_HISTORY_PATH: &str = "/v5/p2p/order/simplifyList";

/// A source of P2P order lists for one account
#[async_trait]
pub trait P2pOrderSource: Send + Sync {
    /// Orders still in progress
    async fn pending_orders(&self, page: u32, size: u32) -> Result<Vec<RawTrade>, ExchangeError>;

    /// Recently finished orders
    async fn order_history(&self, page: u32, size: u32) -> Result<Vec<RawTrade>, ExchangeError>;
}

/// Opens an order source for a key pair
pub trait ExchangeConnector: Send + Sync {
    /// Exchange this connector talks to
    fn exchange(&self) -> ExchangeType;

    /// Bind a client to the given credentials
    fn connect(&self, api_key: &str, api_secret: &str) -> Arc<dyn P2pOrderSource>;
}

/// Bybit P2P client bound to one key pair
pub struct BybitP2pClient {
    http: Client,
    base_url: String,
    recv_window: String,
    api_key: String,
    api_secret: String,
}

impl BybitP2pClient {
    /// Create a client sharing an existing connection pool
    pub fn new(http: Client, config: &ExchangeSyncConfig, api_key: &str, api_secret: &str) -> Self {
        Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            recv_window: config.recv_window.to_string(),
            api_key: api_key.to_string(),
            api_secret: api_secret.to_string(),
        }
    }

    /// Signed POST of a `{page,size}` body
    async fn post_list(&self, path: &str, page: u32, size: u32) -> Result<Vec<RawTrade>, ExchangeError> {
        let body = json!({ "page": page, "size": size }).to_string();
        let timestamp = Utc::now().timestamp_millis().to_string();
        let signature = signing::sign(&self.api_secret, &timestamp, &self.api_key, &self.recv_window, &body)?;

        let url = format!("{}{}", self.base_url, path);
        debug!("POST {}", url);

        let response = self
            .http
            .post(&url)
            .header("Content-Type", "application/json")
            .header("X-BAPI-API-KEY", &self.api_key)
            .header("X-BAPI-SIGN", signature)
            .header("X-BAPI-TIMESTAMP", timestamp)
            .header("X-BAPI-RECV-WINDOW", &self.recv_window)
            .body(body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(ExchangeError::status(status.as_u16(), &text));
        }

        serde_json::from_str::<OrderListEnvelope>(&text)?.into_items()
    }
}

#[async_trait]
impl P2pOrderSource for BybitP2pClient {
    async fn pending_orders(&self, page: u32, size: u32) -> Result<Vec<RawTrade>, ExchangeError> {
        self.post_list(PENDING_ORDERS_PATH, page, size).await
    }

    async fn order_history(&self, page: u32, size: u32) -> Result<Vec<RawTrade>, ExchangeError> {
        self.post_list(ORDER_HISTORY_PATH, page, size).await
    }
}

/// Builds `BybitP2pClient`s over one shared HTTP client
#[derive(Clone)]
pub struct BybitConnector {
    http: Client,
    config: ExchangeSyncConfig,
}

impl BybitConnector {
    /// Create a connector; fails only if the TLS backend cannot initialise
    pub fn new(config: ExchangeSyncConfig) -> Result<Self, ExchangeError> {
        let http = Client::builder()
            .timeout(config.request_timeout)
            .user_agent(concat!("p2p-ledger/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { http, config })
    }
}

impl ExchangeConnector for BybitConnector {
    fn exchange(&self) -> ExchangeType {
        ExchangeType::Bybit
    }

    fn connect(&self, api_key: &str, api_secret: &str) -> Arc<dyn P2pOrderSource> {
        Arc::new(BybitP2pClient::new(self.http.clone(), &self.config, api_key, api_secret))
    }
}

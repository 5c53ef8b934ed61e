//! Provider client and the receipt issuing flow

use std::sync::Arc;

use async_trait::async_trait;
use common::decimal::{Amount, Price, Quantity};
use common::model::{Side, TradeOrder};
use reqwest::Client;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::builder::{ReceiptBuilder, ReceiptOverrides, ReceiptPayload};
use crate::config::FiscalConfig;
use crate::error::ReceiptError;
use crate::profile::FiscalProfile;

/// Provider operation verb
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// Income
    Sell,
    /// Expense
    Buy,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Sell => "sell",
            Operation::Buy => "buy",
        }
    }
}

impl From<Side> for Operation {
    fn from(side: Side) -> Self {
        match side {
            Side::Sell => Operation::Sell,
            Side::Buy => Operation::Buy,
        }
    }
}

/// Accepted registration
#[derive(Debug, Clone)]
pub struct Registration {
    /// Provider transaction uuid
    pub uuid: Option<String>,
    /// Full response body
    pub body: Value,
}

/// Online-cashbox provider
#[async_trait]
pub trait FiscalProvider: Send + Sync {
    /// Exchange login and password for a session token
    async fn get_token(&self, login: &str, password: &str) -> Result<String, ReceiptError>;

    /// Register a receipt under the given cashbox group
    async fn register(
        &self,
        token: &str,
        group_code: &str,
        operation: Operation,
        payload: &ReceiptPayload,
    ) -> Result<Registration, ReceiptError>;
}

/// HTTP client for the Evotor v5 API
pub struct EvotorClient {
    http: Client,
    config: FiscalConfig,
}

impl EvotorClient {
    pub fn new(config: FiscalConfig) -> Result<Self, ReceiptError> {
        let http = Client::builder()
            .user_agent(concat!("p2p-ledger/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { http, config })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), path)
    }
}

/// `error` is present and not null
fn has_error(body: &Value) -> Option<&Value> {
    body.get("error").filter(|e| !e.is_null())
}

#[async_trait]
impl FiscalProvider for EvotorClient {
    async fn get_token(&self, login: &str, password: &str) -> Result<String, ReceiptError> {
        let response = self
            .http
            .post(self.url("getToken"))
            .timeout(self.config.token_timeout)
            .json(&json!({ "login": login, "pass": password }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ReceiptError::Provider(format!("Token error: HTTP {}: {}", status.as_u16(), body)));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| ReceiptError::Provider(format!("Token error: {}", e)))?;

        if let Some(error) = has_error(&body) {
            return Err(ReceiptError::Provider(format!("Auth error: {}", error)));
        }

        body.get("token")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| ReceiptError::Provider("Token error: response carries no token".to_string()))
    }

    async fn register(
        &self,
        token: &str,
        group_code: &str,
        operation: Operation,
        payload: &ReceiptPayload,
    ) -> Result<Registration, ReceiptError> {
        let url = self.url(&format!("{}/{}", group_code, operation.as_str()));
        debug!("Registering receipt {} at {}", payload.external_id, url);

        let response = self
            .http
            .post(&url)
            .timeout(self.config.register_timeout)
            .header("Token", token)
            .json(payload)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        let body: Value = serde_json::from_str(&text).unwrap_or_else(|_| json!({ "text": text }));

        if status.as_u16() >= 400 {
            return Err(ReceiptError::Provider(format!("HTTP {}: {}", status.as_u16(), body)));
        }

        if body.get("status").and_then(Value::as_str) == Some("fail") || has_error(&body).is_some() {
            let error = has_error(&body).cloned().unwrap_or(Value::Null);
            return Err(ReceiptError::Provider(format!("Provider rejected receipt: {}", error)));
        }

        Ok(Registration {
            uuid: body.get("uuid").and_then(Value::as_str).map(str::to_string),
            body,
        })
    }
}

/// What was sent and what the provider answered
#[derive(Debug, Clone, PartialEq)]
pub struct IssuedReceipt {
    pub uuid: Option<String>,
    /// Timestamp string carried by the payload
    pub timestamp: String,
    pub contact: Option<String>,
    pub price: Price,
    pub quantity: Quantity,
    pub sum: Amount,
}

/// Builds and registers receipts through a provider
pub struct ReceiptIssuer {
    provider: Arc<dyn FiscalProvider>,
}

impl ReceiptIssuer {
    pub fn new(provider: Arc<dyn FiscalProvider>) -> Self {
        Self { provider }
    }

    /// Authenticate, build the payload and register it
    pub async fn issue(
        &self,
        order: &TradeOrder,
        profile: &FiscalProfile,
        overrides: &ReceiptOverrides,
    ) -> Result<IssuedReceipt, ReceiptError> {
        let token = self.provider.get_token(&profile.login, &profile.password).await?;
        let operation = Operation::from(order.side);
        let payload = ReceiptBuilder::build(order, profile, overrides);

        let registration = match self
            .provider
            .register(&token, &profile.group_code, operation, &payload)
            .await
        {
            Ok(registration) => registration,
            Err(e) => {
                warn!("Receipt for order {} rejected: {}", order.id, e);
                return Err(e);
            }
        };

        info!(
            "Receipt for order {} registered as {} ({})",
            order.id,
            registration.uuid.as_deref().unwrap_or("-"),
            operation.as_str()
        );

        let item = &payload.receipt.items[0];
        Ok(IssuedReceipt {
            uuid: registration.uuid,
            timestamp: payload.timestamp.clone(),
            contact: overrides.contact.clone(),
            price: item.price,
            quantity: item.quantity,
            sum: payload.receipt.total,
        })
    }
}

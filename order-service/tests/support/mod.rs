#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use common::model::{ExchangeType, OrderDraft, Side, UserProfileUpdate};
use exchange_sync::raw::RawTrade;
use exchange_sync::{ExchangeConnector, ExchangeError, P2pOrderSource};
use fiscal_receipt::{FiscalProvider, Operation, ReceiptError, ReceiptPayload, Registration};
use order_service::{InMemoryOrderRepository, OrderRepository, OrderService, OrderServiceConfig};
use rust_decimal::Decimal;
use serde_json::json;

/// Fresh media directory under the system temp dir
pub fn temp_media_root(tag: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!(
        "order-service-{}-{}-{}",
        tag,
        std::process::id(),
        chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default()
    ));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

pub fn in_memory_service(tag: &str) -> (OrderService, Arc<dyn OrderRepository>) {
    let repo: Arc<dyn OrderRepository> = Arc::new(InMemoryOrderRepository::new());
    let config = OrderServiceConfig::in_memory(temp_media_root(tag)).with_password_cost(4);
    (OrderService::new(Arc::clone(&repo), config), repo)
}

pub fn draft(external_id: &str, side: Side, cost: Decimal) -> OrderDraft {
    let mut draft = OrderDraft::new(external_id, ExchangeType::Bybit, side);
    draft.price = Some(Decimal::new(9500, 2));
    draft.quantity = Some(cost / Decimal::new(9500, 2));
    draft.cost = Some(cost);
    draft
}

pub fn fiscal_settings() -> UserProfileUpdate {
    UserProfileUpdate {
        email: Some("shop@example.com".to_string()),
        inn: Some("7700000000".to_string()),
        kkt_id: Some("group-1".to_string()),
        payment_address: Some("https://shop.example.com".to_string()),
        tax_type: Some("УСН доход".to_string()),
        evotor_login: Some("cashier".to_string()),
        evotor_password: Some("secret".to_string()),
        ..Default::default()
    }
}

/// Exchange serving the same trades to every key pair
pub struct StaticConnector {
    pub trades: Vec<RawTrade>,
    pub calls: Arc<AtomicUsize>,
}

impl StaticConnector {
    pub fn new(trades: Vec<RawTrade>) -> Self {
        Self {
            trades,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }
}

struct StaticSource {
    trades: Vec<RawTrade>,
    calls: Arc<AtomicUsize>,
}

#[async_trait]
impl P2pOrderSource for StaticSource {
    async fn pending_orders(&self, _page: u32, _size: u32) -> Result<Vec<RawTrade>, ExchangeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(Vec::new())
    }

    async fn order_history(&self, _page: u32, _size: u32) -> Result<Vec<RawTrade>, ExchangeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.trades.clone())
    }
}

impl ExchangeConnector for StaticConnector {
    fn exchange(&self) -> ExchangeType {
        ExchangeType::Bybit
    }

    fn connect(&self, _api_key: &str, _api_secret: &str) -> Arc<dyn P2pOrderSource> {
        Arc::new(StaticSource {
            trades: self.trades.clone(),
            calls: Arc::clone(&self.calls),
        })
    }
}

pub fn trade(id: &str, side: &str, created_ms: i64) -> RawTrade {
    RawTrade {
        id: Some(id.to_string()),
        side: Some(side.to_string()),
        price: Some(Decimal::new(9500, 2)),
        notify_token_quantity: Some(Decimal::new(10, 0)),
        amount: Some(Decimal::new(950, 0)),
        create_date: Some(created_ms.to_string()),
        order_status: Some("50".to_string()),
        ..Default::default()
    }
}

/// Fiscal provider that accepts everything and counts registrations
#[derive(Default)]
pub struct CountingProvider {
    pub registrations: AtomicUsize,
    pub reject: bool,
}

impl CountingProvider {
    pub fn count(&self) -> usize {
        self.registrations.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FiscalProvider for CountingProvider {
    async fn get_token(&self, _login: &str, _password: &str) -> Result<String, ReceiptError> {
        Ok("tok".to_string())
    }

    async fn register(
        &self,
        _token: &str,
        _group_code: &str,
        _operation: Operation,
        _payload: &ReceiptPayload,
    ) -> Result<Registration, ReceiptError> {
        let n = self.registrations.fetch_add(1, Ordering::SeqCst) + 1;
        if self.reject {
            return Err(ReceiptError::Provider("HTTP 400: Invalid payload".to_string()));
        }
        Ok(Registration {
            uuid: Some(format!("uuid-{}", n)),
            body: json!({ "status": "wait" }),
        })
    }
}

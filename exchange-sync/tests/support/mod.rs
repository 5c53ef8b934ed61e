#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use common::model::ExchangeType;
use exchange_sync::raw::RawTrade;
use exchange_sync::{ExchangeConnector, ExchangeError, P2pOrderSource};
use rust_decimal::Decimal;

/// Canned responses for one API key
#[derive(Clone, Default)]
pub struct MockAccount {
    pub pending: Vec<RawTrade>,
    pub history: Vec<RawTrade>,
    pub fail_pending: bool,
    pub panics: bool,
}

struct MockSource {
    account: MockAccount,
    calls: Arc<AtomicUsize>,
}

#[async_trait]
impl P2pOrderSource for MockSource {
    async fn pending_orders(&self, _page: u32, _size: u32) -> Result<Vec<RawTrade>, ExchangeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.account.panics {
            panic!("exchange client blew up");
        }
        if self.account.fail_pending {
            return Err(ExchangeError::Api {
                code: 10003,
                message: "API key is invalid.".to_string(),
            });
        }
        Ok(self.account.pending.clone())
    }

    async fn order_history(&self, _page: u32, _size: u32) -> Result<Vec<RawTrade>, ExchangeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.account.history.clone())
    }
}

/// Connector serving `MockAccount`s keyed by API key
#[derive(Default)]
pub struct MockConnector {
    pub accounts: HashMap<String, MockAccount>,
    pub calls: Arc<AtomicUsize>,
}

impl MockConnector {
    pub fn with_account(mut self, api_key: &str, account: MockAccount) -> Self {
        self.accounts.insert(api_key.to_string(), account);
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl ExchangeConnector for MockConnector {
    fn exchange(&self) -> ExchangeType {
        ExchangeType::Bybit
    }

    fn connect(&self, api_key: &str, _api_secret: &str) -> Arc<dyn P2pOrderSource> {
        Arc::new(MockSource {
            account: self.accounts.get(api_key).cloned().unwrap_or_default(),
            calls: Arc::clone(&self.calls),
        })
    }
}

/// Raw trade with the fields the reconciler reads
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

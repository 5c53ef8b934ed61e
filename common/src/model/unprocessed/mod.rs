//! Staged exchange trades awaiting review

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::decimal::{Amount, Price, Quantity};
use crate::model::order::{ExchangeType, Side};

/// A trade pulled from an exchange but not yet reviewed into a `TradeOrder`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnprocessedOrder {
    /// Internal id
    pub id: i64,
    /// Owning user
    pub user_id: i64,
    /// Id assigned by the exchange
    pub order_id: String,
    pub exchange_type: ExchangeType,
    pub side: Side,
    pub price: Price,
    /// Crypto quantity
    pub quantity: Quantity,
    /// Fiat amount reported by the exchange
    pub amount: Amount,
    /// Creation time on the exchange
    pub created_at: DateTime<Utc>,
}

/// Insert payload produced by the reconciler
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewUnprocessedOrder {
    pub user_id: i64,
    pub order_id: String,
    pub exchange_type: ExchangeType,
    pub side: Side,
    pub price: Price,
    pub quantity: Quantity,
    pub amount: Amount,
    pub created_at: DateTime<Utc>,
}

impl NewUnprocessedOrder {
    /// Attach a storage id
    pub fn with_id(self, id: i64) -> UnprocessedOrder {
        UnprocessedOrder {
            id,
            user_id: self.user_id,
            order_id: self.order_id,
            exchange_type: self.exchange_type,
            side: self.side,
            price: self.price,
            quantity: self.quantity,
            amount: self.amount,
            created_at: self.created_at,
        }
    }
}

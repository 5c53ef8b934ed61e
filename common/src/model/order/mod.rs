//! Trade order models and related types

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::decimal::{Amount, Price, Quantity};
use crate::error::Error;
use crate::model::receipt::ReceiptRecord;
#[cfg(feature = "utoipa")]
use crate::utoipa::ToSchema;

/// Operation direction of a P2P trade, from the merchant's point of view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "utoipa", derive(ToSchema))]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    /// Stored representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Buy => "BUY",
            Side::Sell => "SELL",
        }
    }

    /// Map the Bybit P2P side code: `1` is a sell, anything else a buy
    pub fn from_exchange_code(code: Option<&str>) -> Self {
        match code.map(str::trim) {
            Some("1") => Side::Sell,
            _ => Side::Buy,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Side {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "BUY" => Ok(Side::Buy),
            "SELL" => Ok(Side::Sell),
            other => Err(Error::ValidationError(format!("Unknown operation type: {}", other))),
        }
    }
}

/// Exchange the trade happened on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "utoipa", derive(ToSchema))]
pub enum ExchangeType {
    Bybit,
    #[serde(rename = "HTX")]
    Htx,
    #[serde(rename = "MEXC")]
    Mexc,
}

impl ExchangeType {
    /// Stored representation
    pub fn as_str(&self) -> &'static str {
        match self {
            ExchangeType::Bybit => "Bybit",
            ExchangeType::Htx => "HTX",
            ExchangeType::Mexc => "MEXC",
        }
    }

    /// Numeric id used by the browser extension
    pub fn wire_id(&self) -> i64 {
        match self {
            ExchangeType::Bybit => 1,
            ExchangeType::Htx => 2,
            ExchangeType::Mexc => 3,
        }
    }

    /// Resolve an extension id; unknown ids fall back to Bybit
    pub fn from_wire_id(id: i64) -> Self {
        match id {
            2 => ExchangeType::Htx,
            3 => ExchangeType::Mexc,
            _ => ExchangeType::Bybit,
        }
    }
}

impl fmt::Display for ExchangeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExchangeType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "BYBIT" | "1" => Ok(ExchangeType::Bybit),
            "HTX" | "2" => Ok(ExchangeType::Htx),
            "MEXC" | "3" => Ok(ExchangeType::Mexc),
            other => Err(Error::ValidationError(format!("Unknown exchange: {}", other))),
        }
    }
}

/// How the commission value is expressed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "utoipa", derive(ToSchema))]
#[serde(rename_all = "UPPERCASE")]
pub enum CommissionType {
    /// Percent of the fiat cost
    #[default]
    Percent,
    /// Fixed fiat amount
    Fix,
}

impl CommissionType {
    /// Stored representation
    pub fn as_str(&self) -> &'static str {
        match self {
            CommissionType::Percent => "PERCENT",
            CommissionType::Fix => "FIX",
        }
    }
}

impl FromStr for CommissionType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "PERCENT" | "%" => Ok(CommissionType::Percent),
            "FIX" | "FIXED" => Ok(CommissionType::Fix),
            other => Err(Error::ValidationError(format!("Unknown commission type: {}", other))),
        }
    }
}

/// A confirmed, user-owned trade
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeOrder {
    /// Internal id
    pub id: i64,
    /// Owning user
    pub user_id: i64,
    /// Id assigned by the exchange
    pub external_id: String,
    /// Exchange the trade happened on
    pub exchange_type: ExchangeType,
    /// Buy or sell
    pub side: Side,
    /// Unit price in fiat
    pub price: Price,
    /// Crypto quantity
    pub quantity: Quantity,
    /// Fiat cost
    pub cost: Amount,
    /// Commission value
    pub commission: Amount,
    /// Commission interpretation
    pub commission_type: CommissionType,
    /// Linked bank payment detail
    pub bank_detail_id: Option<i64>,
    /// Stored screenshot file name
    pub screenshot: Option<String>,
    /// Fiscal receipt state, if one was ever attempted
    pub receipt: Option<ReceiptRecord>,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl TradeOrder {
    /// Commission in fiat
    pub fn commission_amount(&self) -> Amount {
        match self.commission_type {
            CommissionType::Percent => crate::decimal::precision::round_amount(
                self.cost * self.commission / Amount::ONE_HUNDRED,
            ),
            CommissionType::Fix => self.commission,
        }
    }
}

/// Upsert input for a trade order, keyed by `(user, external_id, exchange_type)`
///
/// `None` numeric fields leave an existing order's values untouched and
/// default to zero on creation.
#[derive(Debug, Clone)]
pub struct OrderDraft {
    pub external_id: String,
    pub exchange_type: ExchangeType,
    pub side: Side,
    pub price: Option<Price>,
    pub quantity: Option<Quantity>,
    pub cost: Option<Amount>,
    pub commission: Amount,
    pub commission_type: CommissionType,
    pub bank_detail_id: Option<i64>,
    pub created_at: Option<DateTime<Utc>>,
    pub screenshot: Option<String>,
}

impl OrderDraft {
    /// Draft with only the key fields set
    pub fn new(external_id: impl Into<String>, exchange_type: ExchangeType, side: Side) -> Self {
        Self {
            external_id: external_id.into(),
            exchange_type,
            side,
            price: None,
            quantity: None,
            cost: None,
            commission: Amount::ZERO,
            commission_type: CommissionType::Percent,
            bank_detail_id: None,
            created_at: None,
            screenshot: None,
        }
    }

    /// Apply this draft over an existing order
    pub fn apply_to(&self, order: &mut TradeOrder) {
        order.side = self.side;
        order.commission = self.commission;
        order.commission_type = self.commission_type;
        order.bank_detail_id = self.bank_detail_id;
        if let Some(created_at) = self.created_at {
            order.created_at = created_at;
        }
        if let Some(screenshot) = &self.screenshot {
            order.screenshot = Some(screenshot.clone());
        }
        if let Some(price) = self.price {
            order.price = price;
        }
        if let Some(quantity) = self.quantity {
            order.quantity = quantity;
        }
        if let Some(cost) = self.cost {
            order.cost = cost;
        }
    }

    /// Materialize a new order from this draft
    pub fn into_order(self, id: i64, user_id: i64) -> TradeOrder {
        TradeOrder {
            id,
            user_id,
            external_id: self.external_id,
            exchange_type: self.exchange_type,
            side: self.side,
            price: self.price.unwrap_or(Price::ZERO),
            quantity: self.quantity.unwrap_or(Quantity::ZERO),
            cost: self.cost.unwrap_or(Amount::ZERO),
            commission: self.commission,
            commission_type: self.commission_type,
            bank_detail_id: self.bank_detail_id,
            screenshot: self.screenshot,
            receipt: None,
            created_at: self.created_at.unwrap_or_else(Utc::now),
        }
    }
}

/// Admin edit of a stored order; `None` keeps the stored value
#[derive(Debug, Clone, Default)]
pub struct OrderEdit {
    pub external_id: Option<String>,
    pub exchange_type: Option<ExchangeType>,
    pub side: Option<Side>,
    pub price: Option<Price>,
    pub quantity: Option<Quantity>,
    pub cost: Option<Amount>,
    pub commission: Option<Amount>,
    pub commission_type: Option<CommissionType>,
    /// `Some(None)` unlinks the bank detail
    pub bank_detail_id: Option<Option<i64>>,
    pub created_at: Option<DateTime<Utc>>,
}

impl OrderEdit {
    pub fn apply_to(self, order: &mut TradeOrder) {
        if let Some(external_id) = self.external_id {
            order.external_id = external_id.trim().to_string();
        }
        if let Some(exchange_type) = self.exchange_type {
            order.exchange_type = exchange_type;
        }
        if let Some(side) = self.side {
            order.side = side;
        }
        if let Some(price) = self.price {
            order.price = price;
        }
        if let Some(quantity) = self.quantity {
            order.quantity = quantity;
        }
        if let Some(cost) = self.cost {
            order.cost = cost;
        }
        if let Some(commission) = self.commission {
            order.commission = commission;
        }
        if let Some(commission_type) = self.commission_type {
            order.commission_type = commission_type;
        }
        if let Some(bank_detail_id) = self.bank_detail_id {
            order.bank_detail_id = bank_detail_id;
        }
        if let Some(created_at) = self.created_at {
            order.created_at = created_at;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decimal::dec;

    #[test]
    fn test_side_from_exchange_code() {
        assert_eq!(Side::from_exchange_code(Some("1")), Side::Sell);
        assert_eq!(Side::from_exchange_code(Some("0")), Side::Buy);
        assert_eq!(Side::from_exchange_code(None), Side::Buy);
    }

    #[test]
    fn test_exchange_wire_ids() {
        assert_eq!(ExchangeType::from_wire_id(2), ExchangeType::Htx);
        assert_eq!(ExchangeType::from_wire_id(3).wire_id(), 3);
        assert_eq!(ExchangeType::from_wire_id(42), ExchangeType::Bybit);
        assert_eq!("BYBIT".parse::<ExchangeType>().unwrap(), ExchangeType::Bybit);
    }

    #[test]
    fn test_draft_only_overwrites_provided_numbers() {
        let mut draft = OrderDraft::new("123", ExchangeType::Bybit, Side::Buy);
        draft.price = Some(dec!(95.10));
        draft.quantity = Some(dec!(10));
        draft.cost = Some(dec!(951));
        let mut order = draft.into_order(1, 7);

        let mut second = OrderDraft::new("123", ExchangeType::Bybit, Side::Sell);
        second.cost = Some(dec!(1000));
        second.apply_to(&mut order);

        assert_eq!(order.side, Side::Sell);
        assert_eq!(order.price, dec!(95.10));
        assert_eq!(order.cost, dec!(1000));
    }

    #[test]
    fn test_percent_commission_amount() {
        let mut draft = OrderDraft::new("1", ExchangeType::Bybit, Side::Sell);
        draft.cost = Some(dec!(1000));
        draft.commission = dec!(1.5);
        let order = draft.into_order(1, 1);
        assert_eq!(order.commission_amount(), dec!(15.00));
    }

    #[test]
    fn test_edit_keeps_omitted_fields() {
        let mut draft = OrderDraft::new("555", ExchangeType::Bybit, Side::Buy);
        draft.price = Some(dec!(90));
        draft.cost = Some(dec!(900));
        draft.bank_detail_id = Some(3);
        let mut order = draft.into_order(1, 7);

        OrderEdit {
            external_id: Some(" 556 ".to_string()),
            exchange_type: Some(ExchangeType::Htx),
            cost: Some(dec!(910)),
            bank_detail_id: Some(None),
            ..Default::default()
        }
        .apply_to(&mut order);

        assert_eq!(order.external_id, "556");
        assert_eq!(order.exchange_type, ExchangeType::Htx);
        assert_eq!(order.side, Side::Buy);
        assert_eq!(order.price, dec!(90));
        assert_eq!(order.cost, dec!(910));
        assert_eq!(order.bank_detail_id, None);
        assert_eq!(order.user_id, 7);
    }
}

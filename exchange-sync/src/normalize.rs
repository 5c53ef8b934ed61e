//! Mapping of exchange records onto the internal schema

use chrono::{DateTime, Utc};
use common::decimal::{precision, Amount, Price, Quantity};
use common::model::{ExchangeType, NewUnprocessedOrder, Side};
use rust_decimal::Decimal;

use crate::raw::RawTrade;

/// An exchange trade with every field resolved
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedTrade {
    pub external_id: String,
    pub side: Side,
    pub price: Price,
    pub quantity: Quantity,
    pub fiat_amount: Amount,
    /// Creation time, wall clock if the exchange sent none
    pub created_at: DateTime<Utc>,
    /// Creation millis exactly as reported, if parseable
    pub created_ms: Option<i64>,
    pub status_raw: Option<String>,
}

impl NormalizedTrade {
    /// Normalize one raw record; records without an id are dropped
    pub fn from_raw(raw: &RawTrade, now: DateTime<Utc>) -> Option<Self> {
        let external_id = raw.external_id()?.to_string();
        let price = raw.price.unwrap_or(Decimal::ZERO);
        let fiat_amount = raw.amount.unwrap_or(Decimal::ZERO);
        let quantity = derive_quantity(raw.notify_token_quantity, price, fiat_amount);
        let created_ms = parse_epoch_millis(raw.created_raw());
        let created_at = created_ms
            .and_then(DateTime::from_timestamp_millis)
            .unwrap_or(now);

        Some(Self {
            external_id,
            side: Side::from_exchange_code(raw.side.as_deref()),
            price,
            quantity,
            fiat_amount,
            created_at,
            created_ms,
            status_raw: raw.status_raw().map(str::to_string),
        })
    }

    /// Staging record for this trade
    pub fn into_unprocessed(self, user_id: i64, exchange_type: ExchangeType) -> NewUnprocessedOrder {
        NewUnprocessedOrder {
            user_id,
            order_id: self.external_id,
            exchange_type,
            side: self.side,
            price: self.price,
            quantity: self.quantity,
            amount: self.fiat_amount,
            created_at: self.created_at,
        }
    }
}

/// Reported quantity, or `fiat / price` at 8 dp when the exchange sent zero
pub fn derive_quantity(reported: Option<Quantity>, price: Price, fiat_amount: Amount) -> Quantity {
    let reported = reported.unwrap_or(Decimal::ZERO);
    if reported.is_zero() && price > Decimal::ZERO {
        return fiat_amount
            .checked_div(price)
            .map(precision::round_quantity)
            .unwrap_or(Decimal::ZERO);
    }
    reported
}

/// Positive, in-range epoch millis; anything else is `None`
pub fn parse_epoch_millis(raw: Option<&str>) -> Option<i64> {
    let millis = raw?.trim().parse::<i64>().ok()?;
    if millis <= 0 {
        return None;
    }
    DateTime::from_timestamp_millis(millis).map(|_| millis)
}

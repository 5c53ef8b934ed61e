//! Wire records returned by the Bybit P2P order list endpoints

use common::wire;
use rust_decimal::Decimal;
use serde::Deserialize;

/// One item of an order list, as sent by the exchange
///
/// Every field is optional and accepted as either a string or a number.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawTrade {
    #[serde(default, deserialize_with = "wire::opt_string")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "wire::opt_string")]
    pub order_id: Option<String>,
    /// Side code, `1` for a sell
    #[serde(default, deserialize_with = "wire::opt_string")]
    pub side: Option<String>,
    #[serde(default, deserialize_with = "wire::opt_decimal")]
    pub price: Option<Decimal>,
    /// Crypto quantity
    #[serde(default, deserialize_with = "wire::opt_decimal")]
    pub notify_token_quantity: Option<Decimal>,
    /// Fiat amount
    #[serde(default, deserialize_with = "wire::opt_decimal")]
    pub amount: Option<Decimal>,
    /// Creation time in epoch millis
    #[serde(default, deserialize_with = "wire::opt_string")]
    pub create_date: Option<String>,
    #[serde(default, deserialize_with = "wire::opt_string")]
    pub create_time: Option<String>,
    #[serde(default, deserialize_with = "wire::opt_string")]
    pub order_status: Option<String>,
    #[serde(default, deserialize_with = "wire::opt_string")]
    pub status: Option<String>,
    #[serde(default, deserialize_with = "wire::opt_string")]
    pub token_id: Option<String>,
}

impl RawTrade {
    /// External id: `id`, falling back to `orderId`
    pub fn external_id(&self) -> Option<&str> {
        self.id.as_deref().or(self.order_id.as_deref())
    }

    /// Creation millis as reported: `createDate`, falling back to `createTime`
    pub fn created_raw(&self) -> Option<&str> {
        self.create_date.as_deref().or(self.create_time.as_deref())
    }

    /// Raw status code for display
    pub fn status_raw(&self) -> Option<&str> {
        self.order_status.as_deref().or(self.status.as_deref())
    }
}

/// `{ret_code, ret_msg, result: {items}}` envelope
#[derive(Debug, Clone, Deserialize)]
pub struct OrderListEnvelope {
    #[serde(default, alias = "retCode")]
    pub ret_code: Option<i64>,
    #[serde(default, alias = "retMsg")]
    pub ret_msg: Option<String>,
    #[serde(default)]
    pub result: Option<OrderListResult>,
}

/// Payload of a successful list call
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OrderListResult {
    #[serde(default)]
    pub items: Vec<RawTrade>,
}

impl OrderListEnvelope {
    /// Items of a successful envelope, or the exchange's error
    pub fn into_items(self) -> Result<Vec<RawTrade>, crate::error::ExchangeError> {
        match self.ret_code {
            Some(0) => Ok(self.result.map(|r| r.items).unwrap_or_default()),
            code => Err(crate::error::ExchangeError::Api {
                code: code.unwrap_or(-1),
                message: self.ret_msg.unwrap_or_else(|| "missing ret_code".to_string()),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_decodes_mixed_types() {
        let body = r#"{
            "ret_code": 0,
            "ret_msg": "SUCCESS",
            "result": {"count": 2, "items": [
                {"id": "1850000000000001", "side": 1, "price": "95.10", "notifyTokenQuantity": "10.5",
                 "amount": "998.55", "createDate": "1700000000000", "orderStatus": 50,
                 "judgeInfo": {"autoJudgeUnlockTime": "0"}},
                {"orderId": 42, "side": "0", "price": 96, "amount": 960, "createTime": 1700000000001}
            ]}
        }"#;
        let items = serde_json::from_str::<OrderListEnvelope>(body).unwrap().into_items().unwrap();

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].external_id(), Some("1850000000000001"));
        assert_eq!(items[0].side.as_deref(), Some("1"));
        assert_eq!(items[0].notify_token_quantity, Some(dec!(10.5)));
        assert_eq!(items[0].status_raw(), Some("50"));
        assert_eq!(items[1].external_id(), Some("42"));
        assert_eq!(items[1].created_raw(), Some("1700000000001"));
        assert!(items[1].notify_token_quantity.is_none());
    }

    #[test]
    fn test_non_zero_ret_code_is_an_error() {
        let body = r#"{"retCode": 10003, "retMsg": "API key is invalid.", "result": {}}"#;
        let err = serde_json::from_str::<OrderListEnvelope>(body).unwrap().into_items().unwrap_err();
        assert!(err.to_string().contains("10003"));
    }
}

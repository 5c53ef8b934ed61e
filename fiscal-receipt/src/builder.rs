//! v5 receipt payload construction

use chrono::{DateTime, Local};
use common::decimal::{precision, Amount, Price, Quantity};
use common::model::TradeOrder;
use common::wire;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::contact::{normalize_contact, ReceiptClient};
use crate::profile::{FiscalProfile, TaxRegime};

const MAX_EXTERNAL_ID_LEN: usize = 128;
const MAX_ITEM_NAME_LEN: usize = 128;
const TIMESTAMP_FORMAT: &str = "%d.%m.%Y %H:%M:%S";

/// Values entered by the user for the receipt, each overriding the order
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptOverrides {
    #[serde(default, deserialize_with = "wire::opt_string")]
    pub contact: Option<String>,
    #[serde(default, deserialize_with = "wire::opt_decimal")]
    pub price: Option<Price>,
    /// Crypto quantity; the extension calls it `amount`
    #[serde(default, alias = "amount", deserialize_with = "wire::opt_decimal")]
    pub quantity: Option<Quantity>,
    #[serde(default, deserialize_with = "wire::opt_decimal")]
    pub sum: Option<Amount>,
    /// Item name
    #[serde(default, deserialize_with = "wire::opt_string")]
    pub purpose: Option<String>,
}

impl ReceiptOverrides {
    /// Whether these fields alone ask for a receipt
    pub fn requests_receipt(&self) -> bool {
        self.contact.is_some() || self.sum.is_some()
    }
}

/// Effective `(price, quantity, sum)` for the receipt line
///
/// A non-positive sum becomes 1. If price or quantity is not positive the
/// line is a single unit at the full sum; otherwise the price is recomputed
/// from the sum so that `price * quantity` matches it to the kopeck.
pub fn reconcile_amounts(price: Price, quantity: Quantity, sum: Amount) -> (Price, Quantity, Amount) {
    let sum = if sum <= Decimal::ZERO { Decimal::ONE } else { sum };

    if price <= Decimal::ZERO || quantity <= Decimal::ZERO {
        return (sum, Decimal::ONE, sum);
    }

    match sum.checked_div(quantity) {
        Some(unit) => (precision::round_price(unit), quantity, sum),
        None => (sum, Decimal::ONE, sum),
    }
}

fn truncate_chars(value: &str, max: usize) -> String {
    value.chars().take(max).collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReceiptPayload {
    pub timestamp: String,
    pub external_id: String,
    pub receipt: ReceiptBody,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReceiptBody {
    pub client: ReceiptClient,
    pub company: ReceiptCompany,
    pub items: Vec<ReceiptItem>,
    pub payments: Vec<ReceiptPayment>,
    #[serde(with = "rust_decimal::serde::float")]
    pub total: Amount,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReceiptCompany {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub sno: TaxRegime,
    pub inn: String,
    pub payment_address: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReceiptItem {
    pub name: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Price,
    #[serde(with = "rust_decimal::serde::float")]
    pub quantity: Quantity,
    /// Unit of measure, 0 is "piece"
    pub measure: u8,
    #[serde(with = "rust_decimal::serde::float")]
    pub sum: Amount,
    pub payment_method: String,
    /// 4 is "service"
    pub payment_object: u8,
    pub vat: Vat,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Vat {
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReceiptPayment {
    /// 1 is electronic payment
    #[serde(rename = "type")]
    pub kind: u8,
    #[serde(with = "rust_decimal::serde::float")]
    pub sum: Amount,
}

/// Builds receipt payloads for orders
pub struct ReceiptBuilder;

impl ReceiptBuilder {
    /// Build a payload stamped with the current local time
    pub fn build(order: &TradeOrder, profile: &FiscalProfile, overrides: &ReceiptOverrides) -> ReceiptPayload {
        Self::build_at(order, profile, overrides, Local::now())
    }

    /// Build a payload stamped with `now`
    pub fn build_at(
        order: &TradeOrder,
        profile: &FiscalProfile,
        overrides: &ReceiptOverrides,
        now: DateTime<Local>,
    ) -> ReceiptPayload {
        let (price, quantity, sum) = reconcile_amounts(
            overrides.price.unwrap_or(order.price),
            overrides.quantity.unwrap_or(order.quantity),
            overrides.sum.unwrap_or(order.cost),
        );

        let name = match overrides.purpose.as_deref().map(str::trim) {
            Some(purpose) if !purpose.is_empty() => truncate_chars(purpose, MAX_ITEM_NAME_LEN),
            _ => truncate_chars(&format!("Order {}", order.external_id), MAX_ITEM_NAME_LEN),
        };

        let external_id = truncate_chars(
            &format!("ord_{}_{}", order.id, Uuid::new_v4().simple()),
            MAX_EXTERNAL_ID_LEN,
        );

        ReceiptPayload {
            timestamp: now.format(TIMESTAMP_FORMAT).to_string(),
            external_id,
            receipt: ReceiptBody {
                client: normalize_contact(overrides.contact.as_deref()),
                company: ReceiptCompany {
                    email: profile.email.clone(),
                    sno: profile.tax_regime,
                    inn: profile.inn.clone(),
                    payment_address: profile.payment_address.clone(),
                },
                items: vec![ReceiptItem {
                    name,
                    price,
                    quantity,
                    measure: 0,
                    sum,
                    payment_method: "full_payment".to_string(),
                    payment_object: 4,
                    vat: Vat {
                        kind: "none".to_string(),
                    },
                }],
                payments: vec![ReceiptPayment { kind: 1, sum }],
                total: sum,
            },
        }
    }
}

//! Trade order endpoints and the extension's order wire format

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::{DateTime, Utc};
use common::decimal::{Amount, Price, Quantity};
use common::model::{CommissionType, ExchangeType, OrderDraft, ReceiptRecord, ReceiptStatus, Side, TradeOrder};
use common::wire::{self, Loose};
use fiscal_receipt::ReceiptOverrides;
use order_service::ReceiptOutcome;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::api::response::SuccessResponse;
use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::AppState;

/// Bank detail reference: `{"id": 3}` or a bare id
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum DetailsRef {
    Object {
        #[serde(default, deserialize_with = "wire::opt_i64")]
        id: Option<i64>,
    },
    Bare(Loose),
}

impl DetailsRef {
    fn id(self) -> Option<i64> {
        match self {
            DetailsRef::Object { id } => id,
            DetailsRef::Bare(raw) => raw.into_i64(),
        }
    }
}

/// Order as posted by the extension
///
/// Numbers may be strings or numbers; absent price, quantity and amount
/// fall back to the receipt block.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderPayload {
    #[serde(default, deserialize_with = "wire::opt_string")]
    pub order_id: Option<String>,
    #[serde(default, deserialize_with = "wire::opt_string")]
    pub string_order_id: Option<String>,
    #[serde(default, rename = "type", deserialize_with = "wire::opt_string")]
    pub side: Option<String>,
    #[serde(default, deserialize_with = "wire::opt_i64")]
    pub exchange_type: Option<i64>,
    /// Fiat cost
    #[serde(default, deserialize_with = "wire::opt_decimal")]
    pub amount: Option<Amount>,
    /// Crypto quantity
    #[serde(default, deserialize_with = "wire::opt_decimal")]
    pub quantity: Option<Quantity>,
    #[serde(default, deserialize_with = "wire::opt_decimal")]
    pub price: Option<Price>,
    #[serde(default, deserialize_with = "wire::opt_decimal")]
    pub commission: Option<Amount>,
    #[serde(default, deserialize_with = "wire::opt_string")]
    pub commission_type: Option<String>,
    #[serde(default)]
    pub details: Option<DetailsRef>,
    /// RFC 3339
    #[serde(default, deserialize_with = "wire::opt_string")]
    pub created_at: Option<String>,
    #[serde(default, deserialize_with = "wire::opt_string")]
    pub screenshot_name: Option<String>,
    #[serde(default, deserialize_with = "wire::truthy")]
    pub has_receipt: bool,
    #[serde(default)]
    pub receipt: Option<ReceiptOverrides>,
}

/// Decoded order submission
#[derive(Debug, Clone)]
pub struct OrderSubmission {
    pub draft: OrderDraft,
    pub overrides: ReceiptOverrides,
    pub wants_receipt: bool,
}

impl OrderPayload {
    pub fn into_submission(self) -> Result<OrderSubmission, ApiError> {
        let external_id = self
            .order_id
            .or(self.string_order_id)
            .ok_or_else(|| ApiError::BadRequest("orderId is required".to_string()))?;

        let side = match self.side.as_deref() {
            Some(raw) => raw.parse::<Side>()?,
            None => Side::Buy,
        };
        let exchange = ExchangeType::from_wire_id(self.exchange_type.unwrap_or(1));
        let overrides = self.receipt.unwrap_or_default();

        let mut draft = OrderDraft::new(external_id, exchange, side);
        draft.price = self.price.or(overrides.price);
        draft.quantity = self.quantity.or(overrides.quantity);
        draft.cost = self.amount.or(overrides.sum);
        draft.commission = self.commission.unwrap_or(Amount::ZERO);
        draft.commission_type = match self.commission_type.as_deref() {
            Some(raw) => raw.parse::<CommissionType>()?,
            None => CommissionType::default(),
        };
        draft.bank_detail_id = self.details.and_then(DetailsRef::id);
        draft.created_at = self
            .created_at
            .as_deref()
            .map(|raw| {
                DateTime::parse_from_rfc3339(raw)
                    .map(|dt| dt.with_timezone(&Utc))
                    .map_err(|_| ApiError::BadRequest(format!("Invalid createdAt: {}", raw)))
            })
            .transpose()?;
        draft.screenshot = self.screenshot_name;

        Ok(OrderSubmission {
            wants_receipt: self.has_receipt || overrides.requests_receipt(),
            draft,
            overrides,
        })
    }
}

/// Bank detail as embedded in an order
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DetailsView {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Receipt state as embedded in an order
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptView {
    pub status: ReceiptStatus,
    pub uuid: Option<String>,
    pub timestamp: Option<String>,
    pub contact: Option<String>,
    #[serde(with = "rust_decimal::serde::str_option")]
    pub price: Option<Price>,
    #[serde(with = "rust_decimal::serde::str_option")]
    pub quantity: Option<Quantity>,
    #[serde(with = "rust_decimal::serde::str_option")]
    pub sum: Option<Amount>,
    pub error: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl From<ReceiptRecord> for ReceiptView {
    fn from(record: ReceiptRecord) -> Self {
        Self {
            status: record.status,
            uuid: record.provider_uuid,
            timestamp: record.provider_timestamp,
            contact: record.contact,
            price: record.price,
            quantity: record.quantity,
            sum: record.sum,
            error: record.error_text,
            updated_at: record.updated_at,
        }
    }
}

/// Order as returned to the extension
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderView {
    pub id: i64,
    pub order_id: String,
    /// 1 Bybit, 2 HTX, 3 MEXC
    pub exchange_type: i64,
    #[serde(rename = "type")]
    pub side: Side,
    #[serde(with = "rust_decimal::serde::str")]
    #[schema(value_type = String)]
    pub commission: Amount,
    pub commission_type: CommissionType,
    pub details: Option<DetailsView>,
    pub created_at: DateTime<Utc>,
    #[serde(with = "rust_decimal::serde::str")]
    #[schema(value_type = String)]
    pub price: Price,
    /// Fiat cost
    #[serde(with = "rust_decimal::serde::str")]
    #[schema(value_type = String)]
    pub amount: Amount,
    /// Crypto quantity
    #[serde(with = "rust_decimal::serde::str")]
    #[schema(value_type = String)]
    pub quantity: Quantity,
    pub screenshot_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub receipt: Option<ReceiptView>,
}

impl OrderView {
    fn from_order(order: TradeOrder, details: Option<DetailsView>) -> Self {
        Self {
            id: order.id,
            order_id: order.external_id,
            exchange_type: order.exchange_type.wire_id(),
            side: order.side,
            commission: order.commission,
            commission_type: order.commission_type,
            details,
            created_at: order.created_at,
            price: order.price,
            amount: order.cost,
            quantity: order.quantity,
            screenshot_name: order.screenshot,
            receipt: order.receipt.map(ReceiptView::from),
        }
    }

    /// Single-order shape: details carry the id
    pub fn with_detail_id(order: TradeOrder) -> Self {
        let details = order.bank_detail_id.map(|id| DetailsView {
            id: Some(id),
            name: None,
        });
        Self::from_order(order, details)
    }

    /// List shape: details carry the name
    pub fn with_detail_name(order: TradeOrder, names: &HashMap<i64, String>) -> Self {
        let details = order
            .bank_detail_id
            .and_then(|id| names.get(&id))
            .map(|name| DetailsView {
                id: None,
                name: Some(name.clone()),
            });
        Self::from_order(order, details)
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SaveOrderResponse {
    pub success: bool,
    pub id: i64,
    /// `false` when an existing order was updated
    pub created: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub receipt: Option<ReceiptOutcome>,
}

/// Exchange from a query parameter: a wire id or a name
pub fn parse_exchange(raw: Option<&str>, default_id: i64) -> ExchangeType {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return ExchangeType::from_wire_id(default_id);
    };
    match raw.parse::<i64>() {
        Ok(id) => ExchangeType::from_wire_id(id),
        Err(_) => raw
            .parse::<ExchangeType>()
            .unwrap_or_else(|_| ExchangeType::from_wire_id(default_id)),
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderQuery {
    pub id: Option<String>,
    pub exchange_type: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StringIdQuery {
    pub string_order_id: Option<String>,
    pub exchange_type: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExchangeQuery {
    pub exchange_type: Option<String>,
}

#[utoipa::path(
    get,
    path = "/api/order",
    params(
        ("id" = String, Query, description = "External order id"),
        ("exchangeType" = Option<i64>, Query, description = "1 Bybit (default), 2 HTX, 3 MEXC")
    ),
    responses(
        (status = 200, description = "Order found", body = OrderView),
        (status = 400, description = "id is blank"),
        (status = 404, description = "Order not found")
    ),
    tag = "order"
)]
pub async fn get_order(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Query(query): Query<OrderQuery>,
) -> Result<Json<OrderView>, ApiError> {
    let exchange = parse_exchange(query.exchange_type.as_deref(), 1);
    let order = state
        .orders
        .get_order(user.id(), query.id.as_deref().unwrap_or_default(), exchange)
        .await?;
    Ok(Json(OrderView::with_detail_id(order)))
}

/// Create or update an order, optionally issuing its receipt
#[utoipa::path(
    post,
    path = "/api/order",
    request_body = Object,
    responses(
        (status = 200, description = "Order saved", body = SaveOrderResponse),
        (status = 400, description = "Invalid order")
    ),
    tag = "order"
)]
pub async fn save_order(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(payload): Json<OrderPayload>,
) -> Result<Json<SaveOrderResponse>, ApiError> {
    let submission = payload.into_submission()?;
    let (order, created) = state.orders.save_order(user.id(), submission.draft).await?;

    let receipt = if submission.wants_receipt {
        Some(state.receipts.send_for(&order, &submission.overrides).await?)
    } else {
        None
    };

    Ok(Json(SaveOrderResponse {
        success: true,
        id: order.id,
        created,
        receipt,
    }))
}

#[utoipa::path(
    delete,
    path = "/api/order/{orderId}",
    params(
        ("orderId" = String, Path, description = "External order id"),
        ("exchangeType" = Option<i64>, Query, description = "1 Bybit (default), 2 HTX, 3 MEXC")
    ),
    responses(
        (status = 200, description = "Order deleted", body = SuccessResponse),
        (status = 404, description = "Order not found")
    ),
    tag = "order"
)]
pub async fn delete_order(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(order_id): Path<String>,
    Query(query): Query<ExchangeQuery>,
) -> Result<SuccessResponse, ApiError> {
    let exchange = parse_exchange(query.exchange_type.as_deref(), 1);
    state.orders.delete_order(user.id(), &order_id, exchange).await?;
    Ok(SuccessResponse::ok())
}

#[utoipa::path(
    get,
    path = "/api/order/my",
    responses((status = 200, description = "Newest orders first", body = [OrderView])),
    tag = "order"
)]
pub async fn my_orders(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> Result<Json<Vec<OrderView>>, ApiError> {
    let orders = state.orders.list_my_orders(user.id()).await?;
    let names = state.orders.bank_detail_names(user.id()).await?;
    Ok(Json(
        orders
            .into_iter()
            .map(|order| OrderView::with_detail_name(order, &names))
            .collect(),
    ))
}

#[utoipa::path(
    get,
    path = "/api/order/by-string-id",
    params(
        ("stringOrderId" = String, Query, description = "External order id"),
        ("exchangeType" = Option<i64>, Query, description = "1 Bybit, 2 HTX, 3 MEXC (default)")
    ),
    responses(
        (status = 200, description = "Order found", body = OrderView),
        (status = 404, description = "Order not found")
    ),
    tag = "order"
)]
pub async fn get_order_by_string_id(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Query(query): Query<StringIdQuery>,
) -> Result<Json<OrderView>, ApiError> {
    let exchange = parse_exchange(query.exchange_type.as_deref(), 3);
    let order = state
        .orders
        .get_order(user.id(), query.string_order_id.as_deref().unwrap_or_default(), exchange)
        .await?;
    Ok(Json(OrderView::with_detail_id(order)))
}

//! Admin order editor across all users

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use chrono::{DateTime, Utc};
use common::decimal::{Amount, Price, Quantity};
use common::model::{CommissionType, ExchangeType, OrderEdit, Side, TradeOrder};
use common::wire;
use serde::{Deserialize, Deserializer, Serialize};
use tracing::info;
use utoipa::ToSchema;

use crate::api::details::DetailView;
use crate::api::order::OrderView;
use crate::auth::AdminUser;
use crate::error::ApiError;
use crate::AppState;

/// Explicit `null` or blank unlinks, absent keeps
fn nullable_i64<'de, D>(deserializer: D) -> Result<Option<Option<i64>>, D::Error>
where
    D: Deserializer<'de>,
{
    wire::opt_i64(deserializer).map(Some)
}

/// Fields to change; absent fields keep their value
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderEditPayload {
    #[serde(default, deserialize_with = "wire::opt_string")]
    pub order_id: Option<String>,
    #[serde(default, deserialize_with = "wire::opt_i64")]
    pub exchange_type: Option<i64>,
    #[serde(default, rename = "type", deserialize_with = "wire::opt_string")]
    pub side: Option<String>,
    #[serde(default, deserialize_with = "wire::opt_decimal")]
    pub price: Option<Price>,
    #[serde(default, deserialize_with = "wire::opt_decimal")]
    pub quantity: Option<Quantity>,
    /// Fiat cost
    #[serde(default, deserialize_with = "wire::opt_decimal")]
    pub amount: Option<Amount>,
    #[serde(default, deserialize_with = "wire::opt_decimal")]
    pub commission: Option<Amount>,
    #[serde(default, deserialize_with = "wire::opt_string")]
    pub commission_type: Option<String>,
    #[serde(default, deserialize_with = "nullable_i64")]
    pub bank_detail_id: Option<Option<i64>>,
    /// RFC 3339
    #[serde(default, deserialize_with = "wire::opt_string")]
    pub created_at: Option<String>,
}

impl OrderEditPayload {
    pub fn into_edit(self) -> Result<OrderEdit, ApiError> {
        let side = self.side.as_deref().map(str::parse::<Side>).transpose()?;
        let commission_type = self
            .commission_type
            .as_deref()
            .map(str::parse::<CommissionType>)
            .transpose()?;
        let created_at = self
            .created_at
            .as_deref()
            .map(|raw| {
                DateTime::parse_from_rfc3339(raw)
                    .map(|dt| dt.with_timezone(&Utc))
                    .map_err(|_| ApiError::BadRequest(format!("Invalid createdAt: {}", raw)))
            })
            .transpose()?;

        Ok(OrderEdit {
            external_id: self.order_id,
            exchange_type: self.exchange_type.map(ExchangeType::from_wire_id),
            side,
            price: self.price,
            quantity: self.quantity,
            cost: self.amount,
            commission: self.commission,
            commission_type,
            bank_detail_id: self.bank_detail_id,
            created_at,
        })
    }
}

/// Order with its owner and the owner's bank details to pick from
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AdminOrderView {
    pub user_id: i64,
    #[serde(flatten)]
    pub order: OrderView,
    pub user_details: Vec<DetailView>,
}

impl AdminOrderView {
    async fn load(state: &AppState, order: TradeOrder) -> Result<Self, ApiError> {
        let details = state.orders.list_bank_details(order.user_id).await?;
        Ok(Self {
            user_id: order.user_id,
            order: OrderView::with_detail_id(order),
            user_details: details.into_iter().map(DetailView::from).collect(),
        })
    }
}

/// Find an order by external id, or by internal id when nothing matches
#[utoipa::path(
    get,
    path = "/api/admin/orders/{key}",
    params(("key" = String, Path, description = "External order id or internal id")),
    responses(
        (status = 200, description = "Order found", body = AdminOrderView),
        (status = 403, description = "Admin access required"),
        (status = 404, description = "Order not found")
    ),
    tag = "admin"
)]
pub async fn get_order(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    Path(key): Path<String>,
) -> Result<Json<AdminOrderView>, ApiError> {
    let order = state.orders.find_order_any(&key).await?;
    Ok(Json(AdminOrderView::load(&state, order).await?))
}

#[utoipa::path(
    put,
    path = "/api/admin/orders/{key}",
    params(("key" = String, Path, description = "External order id or internal id")),
    request_body = Object,
    responses(
        (status = 200, description = "Order updated", body = AdminOrderView),
        (status = 400, description = "Invalid field or the new key is taken"),
        (status = 403, description = "Admin access required"),
        (status = 404, description = "Order not found")
    ),
    tag = "admin"
)]
pub async fn update_order(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    Path(key): Path<String>,
    Json(payload): Json<OrderEditPayload>,
) -> Result<Json<AdminOrderView>, ApiError> {
    let edit = payload.into_edit()?;
    let order = state.orders.admin_update_order(&key, edit).await?;
    info!("Admin {} edited order {}", admin.login, order.id);
    Ok(Json(AdminOrderView::load(&state, order).await?))
}

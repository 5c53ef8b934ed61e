//! Staged exchange trades

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use chrono::{DateTime, Utc};
use common::decimal::{Amount, Price, Quantity};
use common::model::{Side, UnprocessedOrder};
use exchange_sync::SyncReport;
use serde::Serialize;

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnprocessedView {
    pub id: i64,
    pub order_id: String,
    pub exchange_type: i64,
    #[serde(rename = "type")]
    pub side: Side,
    #[serde(with = "rust_decimal::serde::str")]
    pub price: Price,
    #[serde(with = "rust_decimal::serde::str")]
    pub quantity: Quantity,
    #[serde(with = "rust_decimal::serde::str")]
    pub amount: Amount,
    pub created_at: DateTime<Utc>,
}

impl From<UnprocessedOrder> for UnprocessedView {
    fn from(order: UnprocessedOrder) -> Self {
        Self {
            id: order.id,
            order_id: order.order_id,
            exchange_type: order.exchange_type.wire_id(),
            side: order.side,
            price: order.price,
            quantity: order.quantity,
            amount: order.amount,
            created_at: order.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct UnprocessedResponse {
    pub sync: SyncReport,
    pub orders: Vec<UnprocessedView>,
}

/// Pull new trades from the exchange, then list everything staged
#[utoipa::path(
    get,
    path = "/api/unprocessed",
    responses((status = 200, description = "Sync report and staged orders, newest first")),
    tag = "order"
)]
pub async fn list_unprocessed(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> Result<Json<UnprocessedResponse>, ApiError> {
    let (sync, orders) = state.sync.sync_user(user.id()).await?;
    Ok(Json(UnprocessedResponse {
        sync,
        orders: orders.into_iter().map(UnprocessedView::from).collect(),
    }))
}

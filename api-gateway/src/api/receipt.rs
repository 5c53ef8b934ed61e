//! Receipt issuance for a stored order

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use fiscal_receipt::ReceiptOverrides;
use order_service::ReceiptOutcome;

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::AppState;

/// Issue the fiscal receipt of an order
///
/// Provider failures are reported in the body with status `ERROR`.
#[utoipa::path(
    post,
    path = "/api/order/{id}/receipt",
    params(("id" = i64, Path, description = "Internal order id")),
    request_body = Object,
    responses(
        (status = 200, description = "Receipt status"),
        (status = 404, description = "Order not found")
    ),
    tag = "order"
)]
pub async fn send_receipt(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(id): Path<i64>,
    body: Option<Json<ReceiptOverrides>>,
) -> Result<Json<ReceiptOutcome>, ApiError> {
    let overrides = body.map(|Json(o)| o).unwrap_or_default();
    let outcome = state.receipts.send(user.id(), id, &overrides).await?;
    Ok(Json(outcome))
}

//! Bank payment details of the calling user

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use common::model::BankDetail;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::api::response::SuccessResponse;
use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::AppState;

#[derive(Debug, Serialize, ToSchema)]
pub struct DetailView {
    pub id: i64,
    pub name: String,
}

impl From<BankDetail> for DetailView {
    fn from(detail: BankDetail) -> Self {
        Self {
            id: detail.id,
            name: detail.name,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateDetailRequest {
    #[serde(default)]
    pub name: String,
}

#[utoipa::path(
    get,
    path = "/api/details",
    responses((status = 200, description = "Active bank details ordered by id", body = [DetailView])),
    tag = "user"
)]
pub async fn list_details(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> Result<Json<Vec<DetailView>>, ApiError> {
    let details = state.orders.list_bank_details(user.id()).await?;
    Ok(Json(details.into_iter().map(DetailView::from).collect()))
}

#[utoipa::path(
    post,
    path = "/api/details",
    request_body = CreateDetailRequest,
    responses(
        (status = 200, description = "Bank detail created", body = DetailView),
        (status = 400, description = "Name is blank")
    ),
    tag = "user"
)]
pub async fn create_detail(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(request): Json<CreateDetailRequest>,
) -> Result<Json<DetailView>, ApiError> {
    let detail = state.orders.add_bank_detail(user.id(), &request.name).await?;
    Ok(Json(detail.into()))
}

#[utoipa::path(
    delete,
    path = "/api/details/{id}",
    params(("id" = i64, Path, description = "Bank detail id")),
    responses(
        (status = 200, description = "Bank detail deleted", body = SuccessResponse),
        (status = 404, description = "Bank detail not found")
    ),
    tag = "user"
)]
pub async fn delete_detail(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> Result<SuccessResponse, ApiError> {
    state.orders.delete_bank_detail(user.id(), id).await?;
    Ok(SuccessResponse::ok())
}

//! Profile of the calling user

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use common::model::{User, UserProfileUpdate};
use serde::Serialize;
use utoipa::ToSchema;

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::AppState;

/// Profile as shown in the extension settings
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProfileView {
    pub id: i64,
    pub login: String,
    pub email: Option<String>,
    pub is_admin: bool,
    pub inn: Option<String>,
    pub kkt_id: Option<String>,
    pub payment_address: Option<String>,
    pub tax_type: Option<String>,
    pub evotor_login: Option<String>,
    pub evotor_password: Option<String>,
    /// Whether a key pair is stored; the keys themselves are never returned
    pub bybit_configured: bool,
    pub htx_configured: bool,
    pub mexc_configured: bool,
}

impl From<User> for ProfileView {
    fn from(user: User) -> Self {
        Self {
            bybit_configured: user.bybit.is_configured(),
            htx_configured: user.htx.is_configured(),
            mexc_configured: user.mexc.is_configured(),
            id: user.id,
            login: user.login,
            email: user.email,
            is_admin: user.is_admin,
            inn: user.fiscal.inn,
            kkt_id: user.fiscal.group_code,
            payment_address: user.fiscal.payment_address,
            tax_type: user.fiscal.tax_type,
            evotor_login: user.fiscal.login,
            evotor_password: user.fiscal.password,
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/users/me",
    responses((status = 200, description = "Current profile", body = ProfileView)),
    tag = "user"
)]
pub async fn get_profile(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> Result<Json<ProfileView>, ApiError> {
    let user = state.orders.get_user(user.id()).await?;
    Ok(Json(user.into()))
}

/// Partial update; fields left out are kept, empty strings clear them
#[utoipa::path(
    put,
    path = "/api/users/me",
    request_body = Object,
    responses((status = 200, description = "Updated profile", body = ProfileView)),
    tag = "user"
)]
pub async fn update_profile(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(update): Json<UserProfileUpdate>,
) -> Result<Json<ProfileView>, ApiError> {
    let user = state.orders.update_profile(user.id(), update).await?;
    Ok(Json(user.into()))
}

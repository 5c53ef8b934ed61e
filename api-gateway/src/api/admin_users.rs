//! Admin management of user accounts

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::Json;
use common::model::{AdminUserUpdate, User, UserProfileUpdate};
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::ToSchema;

use crate::api::user::ProfileView;
use crate::auth::AdminUser;
use crate::error::ApiError;
use crate::AppState;

/// Search hit for the admin user picker
#[derive(Debug, Serialize, ToSchema)]
pub struct UserRef {
    pub id: i64,
    pub login: String,
}

impl From<User> for UserRef {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            login: user.login,
        }
    }
}

/// New account with optional profile fields
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserRequest {
    #[serde(default)]
    pub login: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub is_admin: bool,
    #[serde(flatten)]
    pub profile: UserProfileUpdate,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,
}

#[utoipa::path(
    get,
    path = "/api/admin/users",
    responses(
        (status = 200, description = "All users ordered by login", body = [ProfileView]),
        (status = 403, description = "Admin access required")
    ),
    tag = "admin"
)]
pub async fn list_users(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
) -> Result<Json<Vec<ProfileView>>, ApiError> {
    let users = state.orders.list_users().await?;
    Ok(Json(users.into_iter().map(ProfileView::from).collect()))
}

#[utoipa::path(
    post,
    path = "/api/admin/users",
    request_body = Object,
    responses(
        (status = 200, description = "User created", body = ProfileView),
        (status = 400, description = "Login or password missing, or login taken"),
        (status = 403, description = "Admin access required")
    ),
    tag = "admin"
)]
pub async fn create_user(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    Json(request): Json<CreateUserRequest>,
) -> Result<Json<ProfileView>, ApiError> {
    let user = state
        .orders
        .admin_create_user(&request.login, &request.password, request.is_admin, request.profile)
        .await?;
    info!("Admin {} created user {}", admin.login, user.login);
    Ok(Json(user.into()))
}

/// Partial update of any user; a non-blank `password` replaces the current one
#[utoipa::path(
    put,
    path = "/api/admin/users/{id}",
    params(("id" = i64, Path, description = "User id")),
    request_body = Object,
    responses(
        (status = 200, description = "Updated user", body = ProfileView),
        (status = 403, description = "Admin access required"),
        (status = 404, description = "User not found")
    ),
    tag = "admin"
)]
pub async fn update_user(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    Path(id): Path<i64>,
    Json(update): Json<AdminUserUpdate>,
) -> Result<Json<ProfileView>, ApiError> {
    let user = state.orders.admin_update_user(id, update).await?;
    Ok(Json(user.into()))
}

/// Up to ten users whose login or id contains `q`
#[utoipa::path(
    get,
    path = "/api/admin/users/search",
    params(("q" = Option<String>, Query, description = "Login fragment or id")),
    responses(
        (status = 200, description = "Matches ordered by id", body = [UserRef]),
        (status = 403, description = "Admin access required")
    ),
    tag = "admin"
)]
pub async fn search_users(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<UserRef>>, ApiError> {
    let users = state.orders.search_users(query.q.as_deref().unwrap_or_default()).await?;
    Ok(Json(users.into_iter().map(UserRef::from).collect()))
}

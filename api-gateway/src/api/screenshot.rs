//! Order screenshot upload and download

use std::sync::Arc;

use axum::extract::{Multipart, Query, State};
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use tracing::debug;

use crate::api::response::SuccessResponse;
use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::AppState;

/// Upload a screenshot
///
/// Multipart fields: `file` and `name`. Without `name` the uploaded file
/// name is used. The order is the one whose external id is `name` without
/// its extension.
#[utoipa::path(
    post,
    path = "/api/order/screenshot",
    request_body(content = String, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Screenshot stored", body = SuccessResponse),
        (status = 400, description = "Missing file or name"),
        (status = 404, description = "Order not found")
    ),
    tag = "order"
)]
pub async fn upload_screenshot(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    mut multipart: Multipart,
) -> Result<SuccessResponse, ApiError> {
    let mut name: Option<String> = None;
    let mut upload_name: Option<String> = None;
    let mut bytes = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Invalid multipart body: {}", e)))?
    {
        match field.name() {
            Some("file") => {
                upload_name = field.file_name().map(str::to_string);
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("Failed to read file: {}", e)))?;
                bytes = Some(data);
            }
            Some("name") => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("Failed to read name: {}", e)))?;
                name = Some(text.trim().to_string()).filter(|n| !n.is_empty());
            }
            other => debug!("Ignoring multipart field {:?}", other),
        }
    }

    let bytes = bytes.ok_or_else(|| ApiError::BadRequest("file is required".to_string()))?;
    let name = name
        .or(upload_name)
        .ok_or_else(|| ApiError::BadRequest("name is required".to_string()))?;

    let stored = state.orders.save_screenshot(user.id(), &name, &bytes).await?;
    Ok(SuccessResponse::with_message(stored))
}

#[derive(Debug, Deserialize)]
pub struct ScreenshotQuery {
    pub name: Option<String>,
}

#[utoipa::path(
    get,
    path = "/api/order/screenshot",
    params(("name" = String, Query, description = "Screenshot file name")),
    responses(
        (status = 200, description = "Stored image", content_type = "image/png"),
        (status = 404, description = "No screenshot")
    ),
    tag = "order"
)]
pub async fn get_screenshot(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Query(query): Query<ScreenshotQuery>,
) -> Result<Response, ApiError> {
    let name = query
        .name
        .ok_or_else(|| ApiError::BadRequest("name is required".to_string()))?;
    let shot = state.orders.load_screenshot(user.id(), &name).await?;

    Ok((
        [
            (CONTENT_TYPE, shot.content_type.to_string()),
            (CONTENT_DISPOSITION, format!("inline; filename=\"{}\"", shot.file_name)),
        ],
        shot.bytes,
    )
        .into_response())
}

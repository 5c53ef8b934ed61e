//! Shared response shapes

use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use utoipa::ToSchema;

/// Acknowledgement for writes that return nothing else
#[derive(Debug, Serialize, ToSchema)]
pub struct SuccessResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl SuccessResponse {
    pub fn ok() -> Self {
        Self {
            success: true,
            message: None,
        }
    }

    pub fn with_message(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
        }
    }
}

impl IntoResponse for SuccessResponse {
    fn into_response(self) -> Response {
        Json(self).into_response()
    }
}

/// A page of items with an optional summary of the whole result
#[derive(Debug, Serialize)]
pub struct PaginatedResponse<T, S> {
    /// The items in this page
    pub data: Vec<T>,
    /// Pagination metadata
    pub pagination: PaginationMetadata,
    /// Aggregates over all pages
    pub summary: S,
}

/// Pagination metadata
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaginationMetadata {
    /// The current page number (1-based)
    pub page: usize,
    /// The number of items per page
    pub per_page: usize,
    /// The total number of items
    pub total: usize,
    /// The total number of pages
    pub total_pages: usize,
}

impl PaginationMetadata {
    pub fn new(page: usize, per_page: usize, total: usize) -> Self {
        let total_pages = if per_page == 0 { 0 } else { total.div_ceil(per_page) };
        Self {
            page,
            per_page,
            total,
            total_pages,
        }
    }
}

impl<T, S> IntoResponse for PaginatedResponse<T, S>
where
    T: Serialize,
    S: Serialize,
{
    fn into_response(self) -> Response {
        Json(self).into_response()
    }
}

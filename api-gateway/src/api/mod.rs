//! API handlers
//!
//! Handlers are grouped by resource. Each one extracts the caller from the
//! token, decodes the extension's loose JSON into typed values, calls the
//! services and maps the result back to the wire shape.

pub mod admin;
pub mod admin_orders;
pub mod admin_users;
pub mod auth;
pub mod details;
pub mod order;
pub mod receipt;
pub mod response;
pub mod screenshot;
pub mod unprocessed;
pub mod user;

use axum::Json;
use serde_json::{json, Value};

pub use response::{PaginatedResponse, SuccessResponse};

/// Liveness probe
#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "Service is up")),
    tag = "admin"
)]
pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

//! HTTP surface of the P2P back-office
//!
//! JSON endpoints for the browser extension plus the admin views. The
//! binary builds an [`AppState`] and serves [`router`].

pub mod api;
pub mod auth;
pub mod config;
pub mod error;

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use order_service::{OrderService, ReceiptService, SyncService};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer};
use tracing::Level;
use utoipa::OpenApi;

use crate::auth::JwtKeys;

/// Screenshots are larger than axum's default body limit
const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// App state shared across handlers
pub struct AppState {
    /// Users, bank details, orders and screenshots
    pub orders: Arc<OrderService>,
    /// Exchange reconciliation and the statistics feed
    pub sync: Arc<SyncService>,
    /// Fiscal receipts
    pub receipts: Arc<ReceiptService>,
    /// Token keys
    pub jwt: JwtKeys,
}

/// API documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        api::auth::login,
        api::user::get_profile,
        api::user::update_profile,
        api::details::list_details,
        api::details::create_detail,
        api::details::delete_detail,
        api::order::get_order,
        api::order::save_order,
        api::order::delete_order,
        api::order::my_orders,
        api::order::get_order_by_string_id,
        api::screenshot::upload_screenshot,
        api::screenshot::get_screenshot,
        api::receipt::send_receipt,
        api::unprocessed::list_unprocessed,
        api::admin::statistics_24h,
        api::admin::turnover,
        api::admin_users::list_users,
        api::admin_users::create_user,
        api::admin_users::update_user,
        api::admin_users::search_users,
        api::admin_orders::get_order,
        api::admin_orders::update_order,
        api::health,
    ),
    components(
        schemas(
            api::auth::LoginRequest,
            api::auth::LoginResponse,
            api::user::ProfileView,
            api::details::DetailView,
            api::details::CreateDetailRequest,
            api::order::OrderView,
            api::order::DetailsView,
            api::order::SaveOrderResponse,
            api::admin_users::UserRef,
            api::admin_orders::AdminOrderView,
            api::response::SuccessResponse,
            api::response::PaginationMetadata,
            common::model::ExchangeType,
            common::model::Side,
            common::model::CommissionType,
            common::model::ReceiptStatus,
        )
    ),
    tags(
        (name = "auth", description = "Token issuance"),
        (name = "user", description = "Profile and bank details"),
        (name = "order", description = "Trade orders, screenshots and receipts"),
        (name = "admin", description = "Admin statistics, users and order editor")
    ),
    info(
        title = "P2P Ledger API",
        version = "1.0.0",
        description = "Back-office API for P2P trade orders, exchange sync and fiscal receipts"
    )
)]
pub struct ApiDoc;

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

/// Build the application router
pub fn router(state: Arc<AppState>) -> Router {
    router_with_log_level(state, Level::INFO)
}

/// Build the application router, tracing requests at `log_level`
pub fn router_with_log_level(state: Arc<AppState>, log_level: Level) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_routes = Router::new()
        .route("/auth/login", post(api::auth::login))
        .route("/users/me", get(api::user::get_profile).put(api::user::update_profile))
        .route("/details", get(api::details::list_details).post(api::details::create_detail))
        .route("/details/:id", delete(api::details::delete_detail))
        .route("/order", get(api::order::get_order).post(api::order::save_order))
        .route("/order/my", get(api::order::my_orders))
        .route("/order/by-string-id", get(api::order::get_order_by_string_id))
        .route(
            "/order/screenshot",
            get(api::screenshot::get_screenshot).post(api::screenshot::upload_screenshot),
        )
        .route("/order/:id/receipt", post(api::receipt::send_receipt))
        .route("/order/:id", delete(api::order::delete_order))
        .route("/unprocessed", get(api::unprocessed::list_unprocessed))
        .route("/admin/statistics-24h", get(api::admin::statistics_24h))
        .route("/admin/turnover/:user_id", get(api::admin::turnover))
        .route(
            "/admin/users",
            get(api::admin_users::list_users).post(api::admin_users::create_user),
        )
        .route("/admin/users/search", get(api::admin_users::search_users))
        .route("/admin/users/:id", put(api::admin_users::update_user))
        .route(
            "/admin/orders/:key",
            get(api::admin_orders::get_order).put(api::admin_orders::update_order),
        );

    Router::new()
        .nest("/api", api_routes)
        .route("/health", get(api::health))
        .route("/api-docs/openapi.json", get(openapi_json))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(cors)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(log_level))
                .on_request(DefaultOnRequest::new().level(log_level))
                .on_response(DefaultOnResponse::new().level(log_level)),
        )
        .with_state(state)
}

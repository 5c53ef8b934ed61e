//! Admin views across all users

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::NaiveDate;
use common::model::Side;
use exchange_sync::coordinator::paginate;
use exchange_sync::{DisplayOrder, StatsFilter, StatsSummary};
use order_service::Turnover;
use serde::Deserialize;
use tracing::info;

use crate::api::order::parse_exchange;
use crate::api::response::{PaginatedResponse, PaginationMetadata};
use crate::auth::AdminUser;
use crate::error::ApiError;
use crate::AppState;

pub const DEFAULT_PAGE_LIMIT: usize = 50;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatisticsQuery {
    pub page: Option<usize>,
    pub limit: Option<usize>,
    /// `BUY` or `SELL`
    #[serde(rename = "type")]
    pub side: Option<String>,
    pub exchange_type: Option<String>,
    /// Restrict to one user id
    pub user: Option<i64>,
}

impl StatisticsQuery {
    fn filter(&self) -> Result<StatsFilter, ApiError> {
        let side = match self.side.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            Some(raw) => Some(raw.parse::<Side>()?),
            None => None,
        };
        let exchange = self
            .exchange_type
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .map(|raw| parse_exchange(Some(raw), 1));
        Ok(StatsFilter { side, exchange })
    }
}

/// Trades of the last 24 hours pulled live from the exchange
#[utoipa::path(
    get,
    path = "/api/admin/statistics-24h",
    params(
        ("page" = Option<usize>, Query, description = "1-based page"),
        ("limit" = Option<usize>, Query, description = "Page size, default 50"),
        ("type" = Option<String>, Query, description = "BUY or SELL"),
        ("exchangeType" = Option<i64>, Query, description = "1 Bybit, 2 HTX, 3 MEXC"),
        ("user" = Option<i64>, Query, description = "Only this user")
    ),
    responses(
        (status = 200, description = "One page of trades with aggregates"),
        (status = 403, description = "Admin access required")
    ),
    tag = "admin"
)]
pub async fn statistics_24h(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    Query(query): Query<StatisticsQuery>,
) -> Result<PaginatedResponse<DisplayOrder, StatsSummary>, ApiError> {
    let filter = query.filter()?;
    let page = query.page.unwrap_or(1).max(1);
    let limit = query.limit.unwrap_or(DEFAULT_PAGE_LIMIT).max(1);

    let orders = state.sync.recent_trades(query.user, &filter).await?;
    info!("Admin {} loaded {} trades for the last 24 hours", admin.login, orders.len());

    Ok(PaginatedResponse {
        data: paginate(&orders, page, limit).to_vec(),
        pagination: PaginationMetadata::new(page, limit, orders.len()),
        summary: StatsSummary::from_orders(&orders),
    })
}

#[derive(Debug, Deserialize)]
pub struct TurnoverQuery {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

/// Buy and sell totals of one user, `start..=end` in UTC days
#[utoipa::path(
    get,
    path = "/api/admin/turnover/{userId}",
    params(
        ("userId" = i64, Path, description = "User id"),
        ("start" = String, Query, description = "First day, YYYY-MM-DD"),
        ("end" = String, Query, description = "Last day, YYYY-MM-DD")
    ),
    responses(
        (status = 200, description = "Turnover report"),
        (status = 403, description = "Admin access required")
    ),
    tag = "admin"
)]
pub async fn turnover(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    Path(user_id): Path<i64>,
    Query(query): Query<TurnoverQuery>,
) -> Result<Json<Turnover>, ApiError> {
    state.orders.get_user(user_id).await?;
    let report = state.orders.turnover(user_id, query.start, query.end).await?;
    Ok(Json(report))
}

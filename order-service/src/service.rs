//! Order service implementation

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use common::decimal::{precision, Amount, Quantity};
use common::error::{Error, ErrorExt, IntoError, Result};
use common::model::{
    AdminUserUpdate, BankDetail, ExchangeCredentials, ExchangeType, NewUser, OrderDraft, OrderEdit, Side,
    TradeOrder, User, UserProfileUpdate,
};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::OrderServiceConfig;
use crate::repository::OrderRepository;

/// Stored screenshot content
#[derive(Debug, Clone)]
pub struct Screenshot {
    pub file_name: String,
    pub content_type: &'static str,
    pub bytes: Vec<u8>,
}

/// One order in a turnover report
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnoverLine {
    pub id: i64,
    pub external_id: String,
    #[serde(with = "rust_decimal::serde::str")]
    pub quantity: Quantity,
    #[serde(with = "rust_decimal::serde::str")]
    pub cost: Amount,
    pub created_at: DateTime<Utc>,
}

impl From<&TradeOrder> for TurnoverLine {
    fn from(order: &TradeOrder) -> Self {
        Self {
            id: order.id,
            external_id: order.external_id.clone(),
            quantity: order.quantity,
            cost: order.cost,
            created_at: order.created_at,
        }
    }
}

/// Buy and sell totals of one user over a date range
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Turnover {
    pub user_id: i64,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub buy_count: usize,
    pub sell_count: usize,
    #[serde(with = "rust_decimal::serde::str")]
    pub buy_quantity: Quantity,
    #[serde(with = "rust_decimal::serde::str")]
    pub sell_quantity: Quantity,
    #[serde(with = "rust_decimal::serde::str")]
    pub buy_cost: Amount,
    #[serde(with = "rust_decimal::serde::str")]
    pub sell_cost: Amount,
    #[serde(with = "rust_decimal::serde::str")]
    pub total_cost: Amount,
    #[serde(with = "rust_decimal::serde::str")]
    pub commission: Amount,
    /// Sell cost minus buy cost
    #[serde(with = "rust_decimal::serde::str")]
    pub profit: Amount,
    pub buy_orders: Vec<TurnoverLine>,
    pub sell_orders: Vec<TurnoverLine>,
}

/// User, bank-detail, order and screenshot operations
pub struct OrderService {
    /// Repository for back-office data
    repo: Arc<dyn OrderRepository>,
    config: OrderServiceConfig,
}

impl OrderService {
    /// Create a new order service
    pub fn new(repo: Arc<dyn OrderRepository>, config: OrderServiceConfig) -> Self {
        Self { repo, config }
    }

    /// Shared repository handle
    pub fn repository(&self) -> Arc<dyn OrderRepository> {
        Arc::clone(&self.repo)
    }

    pub fn config(&self) -> &OrderServiceConfig {
        &self.config
    }

    /// Register a user with a bcrypt-hashed password
    pub async fn create_user(&self, login: &str, password: &str, is_admin: bool) -> Result<User> {
        let login = login.trim();
        if login.is_empty() || password.is_empty() {
            return Err(Error::ValidationError("login and password are required".to_string()));
        }

        let password_hash = self.hash_password(password).await?;
        let user = self
            .repo
            .create_user(NewUser {
                login: login.to_string(),
                password_hash,
                email: None,
                is_admin,
                bybit: ExchangeCredentials::default(),
            })
            .await?;

        info!("Created user {} (id {}, admin: {})", user.login, user.id, user.is_admin);
        Ok(user)
    }

    /// Create an admin unless the login is taken; `true` when created
    pub async fn ensure_admin(&self, login: &str, password: &str) -> Result<bool> {
        if self.repo.get_user_by_login(login.trim()).await?.is_some() {
            debug!("Admin account {} already exists", login.trim());
            return Ok(false);
        }
        self.create_user(login, password, true).await?;
        Ok(true)
    }

    /// Register a user from the admin views, with profile fields set up front
    pub async fn admin_create_user(
        &self,
        login: &str,
        password: &str,
        is_admin: bool,
        profile: UserProfileUpdate,
    ) -> Result<User> {
        let mut user = self.create_user(login, password, is_admin).await?;
        user.apply_update(profile);
        self.repo
            .update_user(&user)
            .await
            .with_context(|| format!("Failed to store profile of new user {}", user.id))?;
        Ok(user)
    }

    /// Edit any user: profile fields, role and password
    pub async fn admin_update_user(&self, user_id: i64, update: AdminUserUpdate) -> Result<User> {
        let mut user = self.get_user(user_id).await?;
        user.apply_update(update.profile);
        if let Some(is_admin) = update.is_admin {
            user.is_admin = is_admin;
        }
        self.repo
            .update_user(&user)
            .await
            .with_context(|| format!("Failed to update user {}", user_id))?;

        if let Some(password) = update.password.filter(|p| !p.is_empty()) {
            user.password_hash = self.hash_password(&password).await?;
            self.repo.set_password_hash(user_id, &user.password_hash).await?;
        }
        info!("Admin updated user {} (admin: {})", user.login, user.is_admin);
        Ok(user)
    }

    /// Users matching a login fragment or id, at most [`USER_SEARCH_LIMIT`]
    pub async fn search_users(&self, query: &str) -> Result<Vec<User>> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }
        self.repo.search_users(query, USER_SEARCH_LIMIT).await
    }

    async fn hash_password(&self, password: &str) -> Result<String> {
        let cost = self.config.password_cost;
        let password = password.to_string();
        tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
            .await
            .map_err(|e| e.into_error("Password hashing task failed"))?
            .map_err(|e| e.into_error("Failed to hash password"))
    }

    /// Verify a login and password
    pub async fn authenticate(&self, login: &str, password: &str) -> Result<User> {
        let invalid = || Error::AuthenticationError("Invalid login or password".to_string());

        let user = self.repo.get_user_by_login(login.trim()).await?.ok_or_else(invalid)?;

        let hash = user.password_hash.clone();
        let password = password.to_string();
        let valid = tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
            .await
            .map_err(|e| e.into_error("Password verification task failed"))?
            .unwrap_or(false);

        if !valid {
            debug!("Rejected login attempt for {}", user.login);
            return Err(invalid());
        }
        Ok(user)
    }

    pub async fn get_user(&self, user_id: i64) -> Result<User> {
        self.repo
            .get_user(user_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("User not found: {}", user_id)))
    }

    pub async fn list_users(&self) -> Result<Vec<User>> {
        self.repo.list_users().await
    }

    /// Apply a partial profile update
    pub async fn update_profile(&self, user_id: i64, update: UserProfileUpdate) -> Result<User> {
        let mut user = self.get_user(user_id).await?;
        user.apply_update(update);
        self.repo
            .update_user(&user)
            .await
            .with_context(|| format!("Failed to update profile of user {}", user_id))?;
        info!("Updated profile of user {}", user_id);
        Ok(user)
    }

    pub async fn list_bank_details(&self, user_id: i64) -> Result<Vec<BankDetail>> {
        self.repo.list_bank_details(user_id, false).await
    }

    pub async fn add_bank_detail(&self, user_id: i64, name: &str) -> Result<BankDetail> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::ValidationError("name is required".to_string()));
        }
        self.repo.create_bank_detail(user_id, name).await
    }

    pub async fn delete_bank_detail(&self, user_id: i64, id: i64) -> Result<()> {
        if !self.repo.soft_delete_bank_detail(user_id, id).await? {
            return Err(Error::NotFound(format!("Bank detail not found: {}", id)));
        }
        Ok(())
    }

    /// Names of all the user's bank details, deleted ones included
    pub async fn bank_detail_names(&self, user_id: i64) -> Result<HashMap<i64, String>> {
        Ok(self
            .repo
            .list_bank_details(user_id, true)
            .await?
            .into_iter()
            .map(|d| (d.id, d.name))
            .collect())
    }

    /// Upsert an order on `(user, external_id, exchange_type)`
    ///
    /// A bank detail that is not owned or is deleted is dropped rather than
    /// rejected. Numbers are rounded to their stored precision.
    pub async fn save_order(&self, user_id: i64, mut draft: OrderDraft) -> Result<(TradeOrder, bool)> {
        draft.external_id = draft.external_id.trim().to_string();
        if draft.external_id.is_empty() {
            return Err(Error::ValidationError("orderId is required".to_string()));
        }

        if let Some(detail_id) = draft.bank_detail_id {
            let usable = self
                .repo
                .get_bank_detail(user_id, detail_id)
                .await?
                .is_some_and(|d| !d.is_deleted);
            if !usable {
                debug!("Ignoring bank detail {} for user {}", detail_id, user_id);
                draft.bank_detail_id = None;
            }
        }

        draft.price = draft.price.map(precision::round_price);
        draft.quantity = draft.quantity.map(precision::round_quantity);
        draft.cost = draft.cost.map(precision::round_amount);
        draft.commission = precision::round_amount(draft.commission);
        check_column_limits(
            &draft.external_id,
            [draft.price, draft.quantity, draft.cost, Some(draft.commission)],
        )?;

        let (order, created) = self.repo.upsert_order(user_id, draft).await?;
        info!(
            "{} order {} ({}) for user {}",
            if created { "Created" } else { "Updated" },
            order.external_id,
            order.exchange_type,
            user_id
        );
        Ok((order, created))
    }

    pub async fn get_order(&self, user_id: i64, external_id: &str, exchange: ExchangeType) -> Result<TradeOrder> {
        let external_id = external_id.trim();
        if external_id.is_empty() {
            return Err(Error::ValidationError("id is required".to_string()));
        }
        self.repo
            .get_order(user_id, external_id, exchange)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Order not found: {}", external_id)))
    }

    pub async fn get_order_by_id(&self, user_id: i64, id: i64) -> Result<TradeOrder> {
        self.repo
            .get_order_by_id(user_id, id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Order not found: {}", id)))
    }

    /// Any user's order by external id, falling back to the internal id for numeric keys
    pub async fn find_order_any(&self, key: &str) -> Result<TradeOrder> {
        let key = key.trim();
        if key.is_empty() {
            return Err(Error::ValidationError("id is required".to_string()));
        }
        if let Some(order) = self.repo.find_order_any(key).await? {
            return Ok(order);
        }
        if let Ok(id) = key.parse::<i64>() {
            if let Some(order) = self.repo.get_order_any(id).await? {
                return Ok(order);
            }
        }
        Err(Error::NotFound(format!("Order not found: {}", key)))
    }

    /// Edit any field of the order found by `key`
    ///
    /// The bank detail must belong to the order's owner and be active.
    pub async fn admin_update_order(&self, key: &str, edit: OrderEdit) -> Result<TradeOrder> {
        let mut order = self.find_order_any(key).await?;

        if let Some(Some(detail_id)) = edit.bank_detail_id {
            let usable = self
                .repo
                .get_bank_detail(order.user_id, detail_id)
                .await?
                .is_some_and(|d| !d.is_deleted);
            if !usable {
                return Err(Error::ValidationError(format!(
                    "Bank detail {} is not an active detail of user {}",
                    detail_id, order.user_id
                )));
            }
        }

        edit.apply_to(&mut order);
        if order.external_id.is_empty() {
            return Err(Error::ValidationError("orderId is required".to_string()));
        }
        order.price = precision::round_price(order.price);
        order.quantity = precision::round_quantity(order.quantity);
        order.cost = precision::round_amount(order.cost);
        order.commission = precision::round_amount(order.commission);
        check_column_limits(
            &order.external_id,
            [Some(order.price), Some(order.quantity), Some(order.cost), Some(order.commission)],
        )?;

        let order = self.repo.update_order(&order).await?;
        info!("Admin edited order {} ({}) of user {}", order.id, order.external_id, order.user_id);
        Ok(order)
    }

    /// Delete an order and its screenshot file
    pub async fn delete_order(&self, user_id: i64, external_id: &str, exchange: ExchangeType) -> Result<TradeOrder> {
        let order = self
            .repo
            .delete_order(user_id, external_id.trim(), exchange)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Order not found: {}", external_id)))?;

        if let Some(file_name) = &order.screenshot {
            self.remove_screenshot_file(user_id, file_name).await;
        }

        info!("Deleted order {} ({}) of user {}", order.external_id, order.exchange_type, user_id);
        Ok(order)
    }

    /// Newest orders, capped by the configured limit
    pub async fn list_my_orders(&self, user_id: i64) -> Result<Vec<TradeOrder>> {
        self.repo.list_orders(user_id, self.config.order_list_limit).await
    }

    /// Store an uploaded screenshot for the order named by `name` without its extension
    pub async fn save_screenshot(&self, user_id: i64, name: &str, bytes: &[u8]) -> Result<String> {
        let file_name = sanitize_file_name(name)?;
        let order = self.order_for_screenshot(user_id, &file_name).await?;

        let dir = self.config.user_screenshot_dir(user_id);
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| e.into_error("Failed to create screenshot directory"))?;
        tokio::fs::write(dir.join(&file_name), bytes)
            .await
            .map_err(|e| e.into_error("Failed to store screenshot"))?;

        if let Some(previous) = order.screenshot.as_deref().filter(|p| *p != file_name) {
            self.remove_screenshot_file(user_id, previous).await;
        }

        self.repo.set_screenshot(order.id, Some(&file_name)).await?;
        info!("Stored screenshot {} for order {}", file_name, order.id);
        Ok(file_name)
    }

    /// Load the screenshot of the order named by `name`
    pub async fn load_screenshot(&self, user_id: i64, name: &str) -> Result<Screenshot> {
        let file_name = sanitize_file_name(name)?;
        let order = self.order_for_screenshot(user_id, &file_name).await?;
        let stored = order
            .screenshot
            .ok_or_else(|| Error::NotFound(format!("No screenshot for order {}", order.external_id)))?;

        let bytes = tokio::fs::read(self.screenshot_path(user_id, &stored))
            .await
            .map_err(|_| Error::NotFound(format!("Screenshot file missing: {}", stored)))?;

        Ok(Screenshot {
            file_name: stored,
            content_type: "image/png",
            bytes,
        })
    }

    async fn order_for_screenshot(&self, user_id: i64, file_name: &str) -> Result<TradeOrder> {
        let order_key = file_name.rsplit_once('.').map_or(file_name, |(key, _)| key);
        self.repo
            .find_latest_order(user_id, order_key)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Order not found: {}", order_key)))
    }

    fn screenshot_path(&self, user_id: i64, file_name: &str) -> PathBuf {
        self.config.user_screenshot_dir(user_id).join(file_name)
    }

    async fn remove_screenshot_file(&self, user_id: i64, file_name: &str) {
        let path = self.screenshot_path(user_id, file_name);
        if let Err(e) = tokio::fs::remove_file(&path).await {
            warn!("Failed to remove screenshot {}: {}", path.display(), e);
        }
    }

    /// Buy and sell totals for orders created on `start..=end` (UTC dates)
    pub async fn turnover(&self, user_id: i64, start: NaiveDate, end: NaiveDate) -> Result<Turnover> {
        if end < start {
            return Err(Error::ValidationError("end must not be before start".to_string()));
        }
        let next_day = end
            .succ_opt()
            .ok_or_else(|| Error::ValidationError(format!("Date out of range: {}", end)))?;

        let orders = self
            .repo
            .list_orders_between(user_id, day_start(start)?, day_start(next_day)?)
            .await?;

        let (buys, sells): (Vec<&TradeOrder>, Vec<&TradeOrder>) = orders.iter().partition(|o| o.side == Side::Buy);
        let buy_cost = total(&buys, |o| o.cost);
        let sell_cost = total(&sells, |o| o.cost);

        Ok(Turnover {
            user_id,
            start,
            end,
            buy_count: buys.len(),
            sell_count: sells.len(),
            buy_quantity: total(&buys, |o| o.quantity),
            sell_quantity: total(&sells, |o| o.quantity),
            buy_cost,
            sell_cost,
            total_cost: buy_cost + sell_cost,
            commission: orders.iter().map(TradeOrder::commission_amount).sum(),
            profit: sell_cost - buy_cost,
            buy_orders: buys.iter().map(|o| TurnoverLine::from(*o)).collect(),
            sell_orders: sells.iter().map(|o| TurnoverLine::from(*o)).collect(),
        })
    }
}

/// Longest external id the `trade_orders` table accepts
pub const MAX_EXTERNAL_ID_LEN: usize = 100;

/// Most users a search returns
pub const USER_SEARCH_LIMIT: usize = 10;

/// Reject values the `trade_orders` columns cannot hold
///
/// Limits follow the NUMERIC precisions of the migration, so the in-memory
/// and PostgreSQL repositories reject the same drafts.
///
/// `numbers` are price, quantity, amount and commission.
fn check_column_limits(external_id: &str, numbers: [Option<Decimal>; 4]) -> Result<()> {
    if external_id.chars().count() > MAX_EXTERNAL_ID_LEN {
        return Err(Error::ValidationError(format!(
            "orderId must be at most {} characters",
            MAX_EXTERNAL_ID_LEN
        )));
    }

    // (name, digits before the decimal point)
    let columns = [("price", 18), ("quantity", 12), ("amount", 18), ("commission", 8)];
    for ((name, int_digits), value) in columns.into_iter().zip(numbers) {
        if let Some(value) = value {
            let bound = Decimal::from_i128_with_scale(10i128.pow(int_digits), 0);
            if value.abs() >= bound {
                return Err(Error::ValidationError(format!("{} is out of range: {}", name, value)));
            }
        }
    }
    Ok(())
}

fn total(orders: &[&TradeOrder], field: fn(&TradeOrder) -> Decimal) -> Decimal {
    orders.iter().map(|o| field(o)).sum()
}

fn day_start(date: NaiveDate) -> Result<DateTime<Utc>> {
    date.and_hms_opt(0, 0, 0)
        .map(|dt| dt.and_utc())
        .ok_or_else(|| Error::ValidationError(format!("Date out of range: {}", date)))
}

/// Accept a bare file name only
fn sanitize_file_name(name: &str) -> Result<String> {
    let name = name.trim();
    let bare = Path::new(name).file_name().and_then(|n| n.to_str());
    match bare {
        Some(bare) if bare == name && !name.starts_with('.') => Ok(name.to_string()),
        _ => Err(Error::ValidationError(format!("Invalid file name: {:?}", name))),
    }
}

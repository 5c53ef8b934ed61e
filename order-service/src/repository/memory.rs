use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::error::{Error, Result};
use common::model::{
    BankDetail, ExchangeType, NewUnprocessedOrder, NewUser, OrderDraft, ReceiptRecord, TradeOrder,
    UnprocessedOrder, User,
};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::debug;

use super::OrderRepository;

type OrderKey = (i64, String, ExchangeType);

/// In-memory repository with the same uniqueness rules as the database
pub struct InMemoryOrderRepository {
    /// Users by ID
    pub users: DashMap<i64, User>,
    /// User IDs by login
    logins: DashMap<String, i64>,
    /// Bank details by ID
    pub bank_details: DashMap<i64, BankDetail>,
    /// Orders by ID, without their receipts
    pub orders: DashMap<i64, TradeOrder>,
    /// Order IDs by `(user, external_id, exchange)`
    order_keys: DashMap<OrderKey, i64>,
    /// Staged trades by `(user, order_id, exchange)`
    pub unprocessed: DashMap<OrderKey, UnprocessedOrder>,
    /// Receipts by order ID
    pub receipts: DashMap<i64, ReceiptRecord>,
    /// Shared ID sequence
    next_id: AtomicI64,
}

impl Default for InMemoryOrderRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryOrderRepository {
    /// Create a new in-memory order repository
    pub fn new() -> Self {
        Self {
            users: DashMap::new(),
            logins: DashMap::new(),
            bank_details: DashMap::new(),
            orders: DashMap::new(),
            order_keys: DashMap::new(),
            unprocessed: DashMap::new(),
            receipts: DashMap::new(),
            next_id: AtomicI64::new(1),
        }
    }

    fn next_id(&self) -> i64 {
        self.next_id.fetch_add(1, Ordering::SeqCst)
    }

    /// Attach the stored receipt
    fn hydrate(&self, mut order: TradeOrder) -> TradeOrder {
        order.receipt = self.receipts.get(&order.id).map(|r| r.clone());
        order
    }

    fn user_orders(&self, user_id: i64) -> Vec<TradeOrder> {
        self.orders
            .iter()
            .filter(|entry| entry.user_id == user_id)
            .map(|entry| entry.value().clone())
            .collect()
    }
}

#[async_trait]
impl OrderRepository for InMemoryOrderRepository {
    async fn create_user(&self, new_user: NewUser) -> Result<User> {
        match self.logins.entry(new_user.login.clone()) {
            Entry::Occupied(_) => Err(Error::ValidationError(format!("Login already taken: {}", new_user.login))),
            Entry::Vacant(slot) => {
                let user = User {
                    id: self.next_id(),
                    login: new_user.login,
                    password_hash: new_user.password_hash,
                    email: new_user.email,
                    is_admin: new_user.is_admin,
                    bybit: new_user.bybit,
                    htx: Default::default(),
                    mexc: Default::default(),
                    fiscal: Default::default(),
                };
                slot.insert(user.id);
                self.users.insert(user.id, user.clone());
                debug!("Created user {} ({})", user.login, user.id);
                Ok(user)
            }
        }
    }

    async fn get_user(&self, id: i64) -> Result<Option<User>> {
        Ok(self.users.get(&id).map(|u| u.clone()))
    }

    async fn get_user_by_login(&self, login: &str) -> Result<Option<User>> {
        let id = self.logins.get(login).map(|id| *id);
        Ok(id.and_then(|id| self.users.get(&id).map(|u| u.clone())))
    }

    async fn update_user(&self, user: &User) -> Result<()> {
        match self.users.get_mut(&user.id) {
            Some(mut stored) => {
                *stored = user.clone();
                Ok(())
            }
            None => Err(Error::NotFound(format!("User not found: {}", user.id))),
        }
    }

    async fn list_users(&self) -> Result<Vec<User>> {
        let mut users: Vec<User> = self.users.iter().map(|u| u.value().clone()).collect();
        users.sort_by(|a, b| a.login.cmp(&b.login));
        Ok(users)
    }

    async fn set_password_hash(&self, user_id: i64, password_hash: &str) -> Result<()> {
        match self.users.get_mut(&user_id) {
            Some(mut user) => {
                user.password_hash = password_hash.to_string();
                Ok(())
            }
            None => Err(Error::NotFound(format!("User not found: {}", user_id))),
        }
    }

    async fn search_users(&self, query: &str, limit: usize) -> Result<Vec<User>> {
        let needle = query.to_lowercase();
        let mut users: Vec<User> = self
            .users
            .iter()
            .filter(|u| u.login.to_lowercase().contains(&needle) || u.id.to_string().contains(&needle))
            .map(|u| u.value().clone())
            .collect();
        users.sort_by_key(|u| u.id);
        users.truncate(limit);
        Ok(users)
    }

    async fn create_bank_detail(&self, user_id: i64, name: &str) -> Result<BankDetail> {
        let detail = BankDetail {
            id: self.next_id(),
            user_id,
            name: name.to_string(),
            is_deleted: false,
        };
        self.bank_details.insert(detail.id, detail.clone());
        Ok(detail)
    }

    async fn get_bank_detail(&self, user_id: i64, id: i64) -> Result<Option<BankDetail>> {
        Ok(self
            .bank_details
            .get(&id)
            .filter(|d| d.user_id == user_id)
            .map(|d| d.clone()))
    }

    async fn list_bank_details(&self, user_id: i64, include_deleted: bool) -> Result<Vec<BankDetail>> {
        let mut details: Vec<BankDetail> = self
            .bank_details
            .iter()
            .filter(|d| d.user_id == user_id && (include_deleted || !d.is_deleted))
            .map(|d| d.value().clone())
            .collect();
        details.sort_by_key(|d| d.id);
        Ok(details)
    }

    async fn soft_delete_bank_detail(&self, user_id: i64, id: i64) -> Result<bool> {
        match self.bank_details.get_mut(&id) {
            Some(mut detail) if detail.user_id == user_id => {
                detail.is_deleted = true;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn upsert_order(&self, user_id: i64, draft: OrderDraft) -> Result<(TradeOrder, bool)> {
        let key = (user_id, draft.external_id.clone(), draft.exchange_type);
        match self.order_keys.entry(key) {
            Entry::Occupied(slot) => {
                let id = *slot.get();
                let mut order = self
                    .orders
                    .get_mut(&id)
                    .ok_or_else(|| Error::Internal(format!("Order index points at missing order {}", id)))?;
                draft.apply_to(&mut order);
                let updated = order.clone();
                drop(order);
                Ok((self.hydrate(updated), false))
            }
            Entry::Vacant(slot) => {
                let order = draft.into_order(self.next_id(), user_id);
                self.orders.insert(order.id, order.clone());
                slot.insert(order.id);
                Ok((order, true))
            }
        }
    }

    async fn get_order(&self, user_id: i64, external_id: &str, exchange: ExchangeType) -> Result<Option<TradeOrder>> {
        let key = (user_id, external_id.to_string(), exchange);
        let id = self.order_keys.get(&key).map(|id| *id);
        let order = id.and_then(|id| self.orders.get(&id).map(|o| o.clone()));
        Ok(order.map(|o| self.hydrate(o)))
    }

    async fn get_order_by_id(&self, user_id: i64, id: i64) -> Result<Option<TradeOrder>> {
        let order = self.orders.get(&id).filter(|o| o.user_id == user_id).map(|o| o.clone());
        Ok(order.map(|o| self.hydrate(o)))
    }

    async fn find_latest_order(&self, user_id: i64, external_id: &str) -> Result<Option<TradeOrder>> {
        let latest = self
            .user_orders(user_id)
            .into_iter()
            .filter(|o| o.external_id == external_id)
            .max_by_key(|o| o.id);
        Ok(latest.map(|o| self.hydrate(o)))
    }

    async fn get_order_any(&self, id: i64) -> Result<Option<TradeOrder>> {
        let order = self.orders.get(&id).map(|o| o.clone());
        Ok(order.map(|o| self.hydrate(o)))
    }

    async fn find_order_any(&self, external_id: &str) -> Result<Option<TradeOrder>> {
        let oldest = self
            .orders
            .iter()
            .filter(|entry| entry.external_id == external_id)
            .map(|entry| entry.value().clone())
            .min_by_key(|o| o.id);
        Ok(oldest.map(|o| self.hydrate(o)))
    }

    async fn update_order(&self, order: &TradeOrder) -> Result<TradeOrder> {
        let current = self
            .orders
            .get(&order.id)
            .map(|o| o.clone())
            .ok_or_else(|| Error::NotFound(format!("Order not found: {}", order.id)))?;

        let old_key = (current.user_id, current.external_id.clone(), current.exchange_type);
        let new_key = (current.user_id, order.external_id.clone(), order.exchange_type);
        if new_key != old_key {
            match self.order_keys.entry(new_key) {
                Entry::Occupied(_) => {
                    return Err(Error::ValidationError(format!(
                        "Order {} ({}) already exists",
                        order.external_id, order.exchange_type
                    )))
                }
                Entry::Vacant(slot) => {
                    slot.insert(order.id);
                }
            }
            self.order_keys.remove(&old_key);
        }

        let mut updated = order.clone();
        updated.user_id = current.user_id;
        updated.receipt = None;
        self.orders.insert(updated.id, updated.clone());
        Ok(self.hydrate(updated))
    }

    async fn delete_order(&self, user_id: i64, external_id: &str, exchange: ExchangeType) -> Result<Option<TradeOrder>> {
        let key = (user_id, external_id.to_string(), exchange);
        let Some((_, id)) = self.order_keys.remove(&key) else {
            return Ok(None);
        };
        let removed_receipt = self.receipts.remove(&id).map(|(_, r)| r);
        Ok(self.orders.remove(&id).map(|(_, mut order)| {
            order.receipt = removed_receipt;
            order
        }))
    }

    async fn list_orders(&self, user_id: i64, limit: usize) -> Result<Vec<TradeOrder>> {
        let mut orders = self.user_orders(user_id);
        orders.sort_by(|a, b| b.id.cmp(&a.id));
        orders.truncate(limit);
        Ok(orders.into_iter().map(|o| self.hydrate(o)).collect())
    }

    async fn list_orders_between(&self, user_id: i64, start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Vec<TradeOrder>> {
        let mut orders: Vec<TradeOrder> = self
            .user_orders(user_id)
            .into_iter()
            .filter(|o| o.created_at >= start && o.created_at < end)
            .collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(orders)
    }

    async fn set_screenshot(&self, order_id: i64, file_name: Option<&str>) -> Result<()> {
        match self.orders.get_mut(&order_id) {
            Some(mut order) => {
                order.screenshot = file_name.map(str::to_string);
                Ok(())
            }
            None => Err(Error::NotFound(format!("Order not found: {}", order_id))),
        }
    }

    async fn order_external_ids(&self, user_id: i64, exchange: ExchangeType) -> Result<Vec<String>> {
        Ok(self
            .order_keys
            .iter()
            .filter(|entry| entry.key().0 == user_id && entry.key().2 == exchange)
            .map(|entry| entry.key().1.clone())
            .collect())
    }

    async fn staged_order_ids(&self, user_id: i64, exchange: ExchangeType) -> Result<Vec<String>> {
        Ok(self
            .unprocessed
            .iter()
            .filter(|entry| entry.key().0 == user_id && entry.key().2 == exchange)
            .map(|entry| entry.key().1.clone())
            .collect())
    }

    async fn insert_unprocessed(&self, order: NewUnprocessedOrder) -> Result<bool> {
        let key = (order.user_id, order.order_id.clone(), order.exchange_type);
        match self.unprocessed.entry(key) {
            Entry::Occupied(_) => Ok(false),
            Entry::Vacant(slot) => {
                slot.insert(order.with_id(self.next_id()));
                Ok(true)
            }
        }
    }

    async fn list_unprocessed(&self, user_id: i64) -> Result<Vec<UnprocessedOrder>> {
        let mut staged: Vec<UnprocessedOrder> = self
            .unprocessed
            .iter()
            .filter(|entry| entry.user_id == user_id)
            .map(|entry| entry.value().clone())
            .collect();
        staged.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(staged)
    }

    async fn get_receipt(&self, order_id: i64) -> Result<Option<ReceiptRecord>> {
        Ok(self.receipts.get(&order_id).map(|r| r.clone()))
    }

    async fn save_receipt(&self, record: &ReceiptRecord) -> Result<()> {
        if !self.orders.contains_key(&record.order_id) {
            return Err(Error::NotFound(format!("Order not found: {}", record.order_id)));
        }
        self.receipts.insert(record.order_id, record.clone());
        Ok(())
    }

    async fn claim_receipt(&self, record: &ReceiptRecord, stale_before: DateTime<Utc>) -> Result<bool> {
        if !self.orders.contains_key(&record.order_id) {
            return Err(Error::NotFound(format!("Order not found: {}", record.order_id)));
        }
        match self.receipts.entry(record.order_id) {
            Entry::Occupied(existing) if existing.get().blocks_send(stale_before) => Ok(false),
            Entry::Occupied(mut existing) => {
                existing.insert(record.clone());
                Ok(true)
            }
            Entry::Vacant(slot) => {
                slot.insert(record.clone());
                Ok(true)
            }
        }
    }
}

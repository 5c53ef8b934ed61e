use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::db::models::{DbBankDetail, DbReceipt, DbTradeOrder, DbUnprocessedOrder, DbUser};
use common::db::{init_db_pool, DbPool};
use common::error::{Error, Result};
use common::model::{
    BankDetail, ExchangeType, NewUnprocessedOrder, NewUser, OrderDraft, ReceiptRecord, TradeOrder,
    UnprocessedOrder, User,
};
use sqlx::Row;
use tracing::debug;

use super::OrderRepository;

const USER_COLUMNS: &str = "SELECT id, login, password_hash, email, is_admin, \
     bybit_api_key, bybit_api_secret, htx_access_key, htx_private_key, mexc_api_key, mexc_api_secret, \
     evotor_login, evotor_password, kkt_id, inn, tax_type, payment_address FROM users";

const ORDER_COLUMNS: &str = "SELECT o.id, o.user_id, o.external_id, o.exchange_type, o.operation_type, \
     o.price, o.amount, o.cost, o.commission, o.commission_type, o.bank_detail_id, o.screenshot, o.created_at, \
     r.status AS receipt_status, r.provider_uuid AS receipt_uuid, r.provider_timestamp AS receipt_timestamp, \
     r.contact AS receipt_contact, r.price AS receipt_price, r.quantity AS receipt_quantity, \
     r.sum AS receipt_sum, r.error_text AS receipt_error, r.updated_at AS receipt_updated_at \
     FROM trade_orders o LEFT JOIN receipts r ON r.order_id = o.id";

const UNPROCESSED_COLUMNS: &str = "SELECT id, user_id, order_id, exchange_type, operation_type, \
     price, amount, cost, created_at FROM unprocessed_orders";

/// PostgreSQL repository for back-office data
pub struct PostgresOrderRepository {
    /// Database connection pool
    pool: DbPool,
}

impl PostgresOrderRepository {
    /// Wrap an existing pool
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Connect a new pool
    pub async fn connect(database_url: &str, pool_size: u32) -> Result<Self> {
        Ok(Self::new(init_db_pool(database_url, pool_size).await?))
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    fn into_orders(rows: Vec<DbTradeOrder>) -> Result<Vec<TradeOrder>> {
        rows.into_iter().map(TradeOrder::try_from).collect()
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}

/// `%query%` with LIKE wildcards in the query escaped
fn contains_pattern(query: &str) -> String {
    let escaped = query.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_");
    format!("%{}%", escaped)
}

#[async_trait]
impl OrderRepository for PostgresOrderRepository {
    async fn create_user(&self, user: NewUser) -> Result<User> {
        debug!("Creating user {}", user.login);

        let inserted = sqlx::query(
            "INSERT INTO users (login, password_hash, email, is_admin, bybit_api_key, bybit_api_secret) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING id",
        )
        .bind(&user.login)
        .bind(&user.password_hash)
        .bind(&user.email)
        .bind(user.is_admin)
        .bind(&user.bybit.api_key)
        .bind(&user.bybit.api_secret)
        .fetch_one(&self.pool)
        .await;

        let row = match inserted {
            Ok(row) => row,
            Err(e) if is_unique_violation(&e) => {
                return Err(Error::ValidationError(format!("Login already taken: {}", user.login)));
            }
            Err(e) => return Err(e.into()),
        };

        let id: i64 = row.get("id");
        self.get_user(id)
            .await?
            .ok_or_else(|| Error::Internal(format!("User {} vanished after insert", id)))
    }

    async fn get_user(&self, id: i64) -> Result<Option<User>> {
        let row = sqlx::query_as::<_, DbUser>(&format!("{} WHERE id = $1", USER_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(User::from))
    }

    async fn get_user_by_login(&self, login: &str) -> Result<Option<User>> {
        let row = sqlx::query_as::<_, DbUser>(&format!("{} WHERE login = $1", USER_COLUMNS))
            .bind(login)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(User::from))
    }

    async fn update_user(&self, user: &User) -> Result<()> {
        let result = sqlx::query(
            "UPDATE users SET email = $2, is_admin = $3, \
             bybit_api_key = $4, bybit_api_secret = $5, htx_access_key = $6, htx_private_key = $7, \
             mexc_api_key = $8, mexc_api_secret = $9, evotor_login = $10, evotor_password = $11, \
             kkt_id = $12, inn = $13, tax_type = $14, payment_address = $15 \
             WHERE id = $1",
        )
        .bind(user.id)
        .bind(&user.email)
        .bind(user.is_admin)
        .bind(&user.bybit.api_key)
        .bind(&user.bybit.api_secret)
        .bind(&user.htx.api_key)
        .bind(&user.htx.api_secret)
        .bind(&user.mexc.api_key)
        .bind(&user.mexc.api_secret)
        .bind(&user.fiscal.login)
        .bind(&user.fiscal.password)
        .bind(&user.fiscal.group_code)
        .bind(&user.fiscal.inn)
        .bind(&user.fiscal.tax_type)
        .bind(&user.fiscal.payment_address)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("User not found: {}", user.id)));
        }
        Ok(())
    }

    async fn list_users(&self) -> Result<Vec<User>> {
        let rows = sqlx::query_as::<_, DbUser>(&format!("{} ORDER BY login", USER_COLUMNS))
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(User::from).collect())
    }

    async fn set_password_hash(&self, user_id: i64, password_hash: &str) -> Result<()> {
        let result = sqlx::query("UPDATE users SET password_hash = $2 WHERE id = $1")
            .bind(user_id)
            .bind(password_hash)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("User not found: {}", user_id)));
        }
        Ok(())
    }

    async fn search_users(&self, query: &str, limit: usize) -> Result<Vec<User>> {
        let rows = sqlx::query_as::<_, DbUser>(&format!(
            "{} WHERE login ILIKE $1 OR id::TEXT LIKE $1 ORDER BY id LIMIT $2",
            USER_COLUMNS
        ))
        .bind(contains_pattern(query))
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(User::from).collect())
    }

    async fn create_bank_detail(&self, user_id: i64, name: &str) -> Result<BankDetail> {
        let row = sqlx::query_as::<_, DbBankDetail>(
            "INSERT INTO bank_details (user_id, name) VALUES ($1, $2) RETURNING id, user_id, name, is_deleted",
        )
        .bind(user_id)
        .bind(name)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.into())
    }

    async fn get_bank_detail(&self, user_id: i64, id: i64) -> Result<Option<BankDetail>> {
        let row = sqlx::query_as::<_, DbBankDetail>(
            "SELECT id, user_id, name, is_deleted FROM bank_details WHERE id = $1 AND user_id = $2",
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(BankDetail::from))
    }

    async fn list_bank_details(&self, user_id: i64, include_deleted: bool) -> Result<Vec<BankDetail>> {
        let rows = sqlx::query_as::<_, DbBankDetail>(
            "SELECT id, user_id, name, is_deleted FROM bank_details \
             WHERE user_id = $1 AND ($2 OR NOT is_deleted) ORDER BY id",
        )
        .bind(user_id)
        .bind(include_deleted)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(BankDetail::from).collect())
    }

    async fn soft_delete_bank_detail(&self, user_id: i64, id: i64) -> Result<bool> {
        let result = sqlx::query("UPDATE bank_details SET is_deleted = TRUE WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn upsert_order(&self, user_id: i64, draft: OrderDraft) -> Result<(TradeOrder, bool)> {
        debug!("Upserting order {} ({}) for user {}", draft.external_id, draft.exchange_type, user_id);

        // Absent numbers keep the stored value on conflict and default to zero on insert
        let row = sqlx::query(
            "INSERT INTO trade_orders (user_id, external_id, exchange_type, operation_type, price, amount, cost, \
                 commission, commission_type, bank_detail_id, screenshot, created_at) \
             VALUES ($1, $2, $3, $4, COALESCE($5::NUMERIC, 0), COALESCE($6::NUMERIC, 0), COALESCE($7::NUMERIC, 0), \
                 $8, $9, $10, $11, COALESCE($12::TIMESTAMPTZ, NOW())) \
             ON CONFLICT (user_id, external_id, exchange_type) DO UPDATE SET \
                 operation_type = EXCLUDED.operation_type, \
                 price = COALESCE($5::NUMERIC, trade_orders.price), \
                 amount = COALESCE($6::NUMERIC, trade_orders.amount), \
                 cost = COALESCE($7::NUMERIC, trade_orders.cost), \
                 commission = EXCLUDED.commission, \
                 commission_type = EXCLUDED.commission_type, \
                 bank_detail_id = EXCLUDED.bank_detail_id, \
                 screenshot = COALESCE($11, trade_orders.screenshot), \
                 created_at = COALESCE($12::TIMESTAMPTZ, trade_orders.created_at) \
             RETURNING id, (xmax = 0) AS inserted",
        )
        .bind(user_id)
        .bind(&draft.external_id)
        .bind(draft.exchange_type.as_str())
        .bind(draft.side.as_str())
        .bind(draft.price)
        .bind(draft.quantity)
        .bind(draft.cost)
        .bind(draft.commission)
        .bind(draft.commission_type.as_str())
        .bind(draft.bank_detail_id)
        .bind(&draft.screenshot)
        .bind(draft.created_at)
        .fetch_one(&self.pool)
        .await?;

        let id: i64 = row.get("id");
        let inserted: bool = row.get("inserted");
        let order = self
            .get_order_by_id(user_id, id)
            .await?
            .ok_or_else(|| Error::Internal(format!("Order {} vanished after upsert", id)))?;
        Ok((order, inserted))
    }

    async fn get_order(&self, user_id: i64, external_id: &str, exchange: ExchangeType) -> Result<Option<TradeOrder>> {
        let row = sqlx::query_as::<_, DbTradeOrder>(&format!(
            "{} WHERE o.user_id = $1 AND o.external_id = $2 AND o.exchange_type = $3",
            ORDER_COLUMNS
        ))
        .bind(user_id)
        .bind(external_id)
        .bind(exchange.as_str())
        .fetch_optional(&self.pool)
        .await?;
        row.map(TradeOrder::try_from).transpose()
    }

    async fn get_order_by_id(&self, user_id: i64, id: i64) -> Result<Option<TradeOrder>> {
        let row = sqlx::query_as::<_, DbTradeOrder>(&format!("{} WHERE o.id = $1 AND o.user_id = $2", ORDER_COLUMNS))
            .bind(id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(TradeOrder::try_from).transpose()
    }

    async fn find_latest_order(&self, user_id: i64, external_id: &str) -> Result<Option<TradeOrder>> {
        let row = sqlx::query_as::<_, DbTradeOrder>(&format!(
            "{} WHERE o.user_id = $1 AND o.external_id = $2 ORDER BY o.id DESC LIMIT 1",
            ORDER_COLUMNS
        ))
        .bind(user_id)
        .bind(external_id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(TradeOrder::try_from).transpose()
    }

    async fn get_order_any(&self, id: i64) -> Result<Option<TradeOrder>> {
        let row = sqlx::query_as::<_, DbTradeOrder>(&format!("{} WHERE o.id = $1", ORDER_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(TradeOrder::try_from).transpose()
    }

    async fn find_order_any(&self, external_id: &str) -> Result<Option<TradeOrder>> {
        let row = sqlx::query_as::<_, DbTradeOrder>(&format!(
            "{} WHERE o.external_id = $1 ORDER BY o.id LIMIT 1",
            ORDER_COLUMNS
        ))
        .bind(external_id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(TradeOrder::try_from).transpose()
    }

    async fn update_order(&self, order: &TradeOrder) -> Result<TradeOrder> {
        debug!("Editing order {}", order.id);

        let updated = sqlx::query(
            "UPDATE trade_orders SET external_id = $2, exchange_type = $3, operation_type = $4, \
                 price = $5, amount = $6, cost = $7, commission = $8, commission_type = $9, \
                 bank_detail_id = $10, screenshot = $11, created_at = $12 \
             WHERE id = $1 RETURNING user_id",
        )
        .bind(order.id)
        .bind(&order.external_id)
        .bind(order.exchange_type.as_str())
        .bind(order.side.as_str())
        .bind(order.price)
        .bind(order.quantity)
        .bind(order.cost)
        .bind(order.commission)
        .bind(order.commission_type.as_str())
        .bind(order.bank_detail_id)
        .bind(&order.screenshot)
        .bind(order.created_at)
        .fetch_optional(&self.pool)
        .await;

        let user_id: i64 = match updated {
            Ok(Some(row)) => row.get("user_id"),
            Ok(None) => return Err(Error::NotFound(format!("Order not found: {}", order.id))),
            Err(e) if is_unique_violation(&e) => {
                return Err(Error::ValidationError(format!(
                    "Order {} ({}) already exists",
                    order.external_id, order.exchange_type
                )));
            }
            Err(e) => return Err(e.into()),
        };

        self.get_order_by_id(user_id, order.id)
            .await?
            .ok_or_else(|| Error::Internal(format!("Order {} vanished after update", order.id)))
    }

    async fn delete_order(&self, user_id: i64, external_id: &str, exchange: ExchangeType) -> Result<Option<TradeOrder>> {
        let Some(order) = self.get_order(user_id, external_id, exchange).await? else {
            return Ok(None);
        };

        // receipts go with the order via ON DELETE CASCADE
        let result = sqlx::query("DELETE FROM trade_orders WHERE id = $1 AND user_id = $2")
            .bind(order.id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok((result.rows_affected() > 0).then_some(order))
    }

    async fn list_orders(&self, user_id: i64, limit: usize) -> Result<Vec<TradeOrder>> {
        let rows = sqlx::query_as::<_, DbTradeOrder>(&format!(
            "{} WHERE o.user_id = $1 ORDER BY o.id DESC LIMIT $2",
            ORDER_COLUMNS
        ))
        .bind(user_id)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;
        Self::into_orders(rows)
    }

    async fn list_orders_between(&self, user_id: i64, start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Vec<TradeOrder>> {
        let rows = sqlx::query_as::<_, DbTradeOrder>(&format!(
            "{} WHERE o.user_id = $1 AND o.created_at >= $2 AND o.created_at < $3 ORDER BY o.created_at DESC",
            ORDER_COLUMNS
        ))
        .bind(user_id)
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await?;
        Self::into_orders(rows)
    }

    async fn set_screenshot(&self, order_id: i64, file_name: Option<&str>) -> Result<()> {
        let result = sqlx::query("UPDATE trade_orders SET screenshot = $2 WHERE id = $1")
            .bind(order_id)
            .bind(file_name)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("Order not found: {}", order_id)));
        }
        Ok(())
    }

    async fn order_external_ids(&self, user_id: i64, exchange: ExchangeType) -> Result<Vec<String>> {
        let rows = sqlx::query("SELECT external_id FROM trade_orders WHERE user_id = $1 AND exchange_type = $2")
            .bind(user_id)
            .bind(exchange.as_str())
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.iter().map(|row| row.get("external_id")).collect())
    }

    async fn staged_order_ids(&self, user_id: i64, exchange: ExchangeType) -> Result<Vec<String>> {
        let rows = sqlx::query("SELECT order_id FROM unprocessed_orders WHERE user_id = $1 AND exchange_type = $2")
            .bind(user_id)
            .bind(exchange.as_str())
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.iter().map(|row| row.get("order_id")).collect())
    }

    async fn insert_unprocessed(&self, order: NewUnprocessedOrder) -> Result<bool> {
        let result = sqlx::query(
            "INSERT INTO unprocessed_orders (user_id, order_id, exchange_type, operation_type, price, amount, cost, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             ON CONFLICT (user_id, order_id, exchange_type) DO NOTHING",
        )
        .bind(order.user_id)
        .bind(&order.order_id)
        .bind(order.exchange_type.as_str())
        .bind(order.side.as_str())
        .bind(order.price)
        .bind(order.quantity)
        .bind(order.amount)
        .bind(order.created_at)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_unprocessed(&self, user_id: i64) -> Result<Vec<UnprocessedOrder>> {
        let rows = sqlx::query_as::<_, DbUnprocessedOrder>(&format!(
            "{} WHERE user_id = $1 ORDER BY created_at DESC, id DESC",
            UNPROCESSED_COLUMNS
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(UnprocessedOrder::try_from).collect()
    }

    async fn get_receipt(&self, order_id: i64) -> Result<Option<ReceiptRecord>> {
        let row = sqlx::query_as::<_, DbReceipt>(
            "SELECT order_id, status, provider_uuid, provider_timestamp, contact, price, quantity, sum, \
             error_text, updated_at FROM receipts WHERE order_id = $1",
        )
        .bind(order_id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(ReceiptRecord::try_from).transpose()
    }

    async fn save_receipt(&self, record: &ReceiptRecord) -> Result<()> {
        let saved = sqlx::query(
            "INSERT INTO receipts (order_id, status, provider_uuid, provider_timestamp, contact, price, quantity, sum, \
                 error_text, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) \
             ON CONFLICT (order_id) DO UPDATE SET \
                 status = EXCLUDED.status, provider_uuid = EXCLUDED.provider_uuid, \
                 provider_timestamp = EXCLUDED.provider_timestamp, contact = EXCLUDED.contact, \
                 price = EXCLUDED.price, quantity = EXCLUDED.quantity, sum = EXCLUDED.sum, \
                 error_text = EXCLUDED.error_text, updated_at = EXCLUDED.updated_at",
        )
        .bind(record.order_id)
        .bind(record.status.as_str())
        .bind(&record.provider_uuid)
        .bind(&record.provider_timestamp)
        .bind(&record.contact)
        .bind(record.price)
        .bind(record.quantity)
        .bind(record.sum)
        .bind(&record.error_text)
        .bind(record.updated_at)
        .execute(&self.pool)
        .await;

        match saved {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(db)) if db.is_foreign_key_violation() => {
                Err(Error::NotFound(format!("Order not found: {}", record.order_id)))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn claim_receipt(&self, record: &ReceiptRecord, stale_before: DateTime<Utc>) -> Result<bool> {
        let claimed = sqlx::query(
            "INSERT INTO receipts (order_id, status, contact, updated_at) \
             VALUES ($1, $2, $3, $4) \
             ON CONFLICT (order_id) DO UPDATE SET \
                 status = EXCLUDED.status, provider_uuid = NULL, provider_timestamp = NULL, \
                 contact = EXCLUDED.contact, price = NULL, quantity = NULL, sum = NULL, \
                 error_text = NULL, updated_at = EXCLUDED.updated_at \
             WHERE receipts.status NOT IN ('SENT', 'DONE') \
               AND NOT (receipts.status = 'PENDING' AND receipts.updated_at > $5) \
             RETURNING order_id",
        )
        .bind(record.order_id)
        .bind(record.status.as_str())
        .bind(&record.contact)
        .bind(record.updated_at)
        .bind(stale_before)
        .fetch_optional(&self.pool)
        .await;

        match claimed {
            Ok(row) => Ok(row.is_some()),
            Err(sqlx::Error::Database(db)) if db.is_foreign_key_violation() => {
                Err(Error::NotFound(format!("Order not found: {}", record.order_id)))
            }
            Err(e) => Err(e.into()),
        }
    }
}

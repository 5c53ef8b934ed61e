use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::FromRow;

use crate::error::{Error, Result};
use crate::model::{
    BankDetail, ExchangeCredentials, FiscalCredentials, ReceiptRecord, TradeOrder,
    UnprocessedOrder, User,
};

/// Database model for the users table
#[derive(Debug, Clone, FromRow)]
pub struct DbUser {
    pub id: i64,
    pub login: String,
    pub password_hash: String,
    pub email: Option<String>,
    pub is_admin: bool,
    pub bybit_api_key: Option<String>,
    pub bybit_api_secret: Option<String>,
    pub htx_access_key: Option<String>,
    pub htx_private_key: Option<String>,
    pub mexc_api_key: Option<String>,
    pub mexc_api_secret: Option<String>,
    pub evotor_login: Option<String>,
    pub evotor_password: Option<String>,
    pub kkt_id: Option<String>,
    pub inn: Option<String>,
    pub tax_type: Option<String>,
    pub payment_address: Option<String>,
}

impl From<DbUser> for User {
    fn from(row: DbUser) -> Self {
        User {
            id: row.id,
            login: row.login,
            password_hash: row.password_hash,
            email: row.email,
            is_admin: row.is_admin,
            bybit: ExchangeCredentials {
                api_key: row.bybit_api_key,
                api_secret: row.bybit_api_secret,
            },
            htx: ExchangeCredentials {
                api_key: row.htx_access_key,
                api_secret: row.htx_private_key,
            },
            mexc: ExchangeCredentials {
                api_key: row.mexc_api_key,
                api_secret: row.mexc_api_secret,
            },
            fiscal: FiscalCredentials {
                login: row.evotor_login,
                password: row.evotor_password,
                group_code: row.kkt_id,
                inn: row.inn,
                tax_type: row.tax_type,
                payment_address: row.payment_address,
            },
        }
    }
}

/// Database model for the bank_details table
#[derive(Debug, Clone, FromRow)]
pub struct DbBankDetail {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
    pub is_deleted: bool,
}

impl From<DbBankDetail> for BankDetail {
    fn from(row: DbBankDetail) -> Self {
        BankDetail {
            id: row.id,
            user_id: row.user_id,
            name: row.name,
            is_deleted: row.is_deleted,
        }
    }
}

/// Database model for the receipts table
#[derive(Debug, Clone, FromRow)]
pub struct DbReceipt {
    pub order_id: i64,
    pub status: String,
    pub provider_uuid: Option<String>,
    pub provider_timestamp: Option<String>,
    pub contact: Option<String>,
    pub price: Option<Decimal>,
    pub quantity: Option<Decimal>,
    pub sum: Option<Decimal>,
    pub error_text: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<DbReceipt> for ReceiptRecord {
    type Error = Error;

    fn try_from(row: DbReceipt) -> Result<Self> {
        Ok(ReceiptRecord {
            order_id: row.order_id,
            status: row.status.parse()?,
            provider_uuid: row.provider_uuid,
            provider_timestamp: row.provider_timestamp,
            contact: row.contact,
            price: row.price,
            quantity: row.quantity,
            sum: row.sum,
            error_text: row.error_text,
            updated_at: row.updated_at,
        })
    }
}

/// Database model for the trade_orders table joined with its receipt
#[derive(Debug, Clone, FromRow)]
pub struct DbTradeOrder {
    pub id: i64,
    pub user_id: i64,
    pub external_id: String,
    pub exchange_type: String,
    pub operation_type: String,
    pub price: Decimal,
    pub amount: Decimal,
    pub cost: Decimal,
    pub commission: Decimal,
    pub commission_type: String,
    pub bank_detail_id: Option<i64>,
    pub screenshot: Option<String>,
    pub created_at: DateTime<Utc>,
    pub receipt_status: Option<String>,
    pub receipt_uuid: Option<String>,
    pub receipt_timestamp: Option<String>,
    pub receipt_contact: Option<String>,
    pub receipt_price: Option<Decimal>,
    pub receipt_quantity: Option<Decimal>,
    pub receipt_sum: Option<Decimal>,
    pub receipt_error: Option<String>,
    pub receipt_updated_at: Option<DateTime<Utc>>,
}

impl TryFrom<DbTradeOrder> for TradeOrder {
    type Error = Error;

    fn try_from(row: DbTradeOrder) -> Result<Self> {
        let receipt = match (row.receipt_status, row.receipt_updated_at) {
            (Some(status), Some(updated_at)) => Some(ReceiptRecord {
                order_id: row.id,
                status: status.parse()?,
                provider_uuid: row.receipt_uuid,
                provider_timestamp: row.receipt_timestamp,
                contact: row.receipt_contact,
                price: row.receipt_price,
                quantity: row.receipt_quantity,
                sum: row.receipt_sum,
                error_text: row.receipt_error,
                updated_at,
            }),
            _ => None,
        };

        Ok(TradeOrder {
            id: row.id,
            user_id: row.user_id,
            external_id: row.external_id,
            exchange_type: row.exchange_type.parse()?,
            side: row.operation_type.parse()?,
            price: row.price,
            quantity: row.amount,
            cost: row.cost,
            commission: row.commission,
            commission_type: row.commission_type.parse()?,
            bank_detail_id: row.bank_detail_id,
            screenshot: row.screenshot,
            receipt,
            created_at: row.created_at,
        })
    }
}

/// Database model for the unprocessed_orders table
#[derive(Debug, Clone, FromRow)]
pub struct DbUnprocessedOrder {
    pub id: i64,
    pub user_id: i64,
    pub order_id: String,
    pub exchange_type: String,
    pub operation_type: String,
    pub price: Decimal,
    pub amount: Decimal,
    pub cost: Decimal,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<DbUnprocessedOrder> for UnprocessedOrder {
    type Error = Error;

    fn try_from(row: DbUnprocessedOrder) -> Result<Self> {
        Ok(UnprocessedOrder {
            id: row.id,
            user_id: row.user_id,
            order_id: row.order_id,
            exchange_type: row.exchange_type.parse()?,
            side: row.operation_type.parse()?,
            price: row.price,
            quantity: row.amount,
            amount: row.cost,
            created_at: row.created_at,
        })
    }
}

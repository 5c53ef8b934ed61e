//! Domain models for the back-office

pub mod order;
pub mod unprocessed;
pub mod bank_detail;
pub mod user;
pub mod receipt;

pub use order::{CommissionType, ExchangeType, OrderDraft, OrderEdit, Side, TradeOrder};
pub use unprocessed::{NewUnprocessedOrder, UnprocessedOrder};
pub use bank_detail::BankDetail;
pub use user::{AdminUserUpdate, ExchangeCredentials, FiscalCredentials, NewUser, User, UserProfileUpdate};
pub use receipt::{ReceiptRecord, ReceiptStatus};

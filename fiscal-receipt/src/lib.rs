//! Fiscal receipts through an online-cashbox provider
//!
//! The builder turns a trade order and the owner's fiscal profile into a
//! v5 receipt payload; the sender authenticates and registers it.

pub mod config;
pub mod error;
pub mod profile;
pub mod contact;
pub mod builder;
pub mod sender;

pub use config::FiscalConfig;
pub use error::ReceiptError;
pub use profile::{FiscalProfile, TaxRegime};
pub use contact::{normalize_contact, ReceiptClient};
pub use builder::{ReceiptBuilder, ReceiptOverrides, ReceiptPayload};
pub use sender::{EvotorClient, FiscalProvider, IssuedReceipt, Operation, ReceiptIssuer, Registration};

//! Fiscal receipt state attached to an order

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::decimal::{Amount, Price, Quantity};
use crate::error::Error;
#[cfg(feature = "utoipa")]
use crate::utoipa::ToSchema;

/// Lifecycle of a receipt request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "utoipa", derive(ToSchema))]
#[serde(rename_all = "UPPERCASE")]
pub enum ReceiptStatus {
    /// A send is in flight
    Pending,
    /// Accepted by the provider
    Sent,
    /// Rejected or failed
    Error,
    /// Confirmed as fiscalized
    Done,
}

impl ReceiptStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReceiptStatus::Pending => "PENDING",
            ReceiptStatus::Sent => "SENT",
            ReceiptStatus::Error => "ERROR",
            ReceiptStatus::Done => "DONE",
        }
    }

    /// Whether a new send must be refused
    pub fn is_final(&self) -> bool {
        matches!(self, ReceiptStatus::Sent | ReceiptStatus::Done)
    }
}

impl fmt::Display for ReceiptStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReceiptStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(ReceiptStatus::Pending),
            "SENT" => Ok(ReceiptStatus::Sent),
            "ERROR" => Ok(ReceiptStatus::Error),
            "DONE" => Ok(ReceiptStatus::Done),
            other => Err(Error::Internal(format!("Unknown receipt status: {}", other))),
        }
    }
}

/// One receipt record per order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReceiptRecord {
    pub order_id: i64,
    pub status: ReceiptStatus,
    /// Transaction uuid returned by the provider
    pub provider_uuid: Option<String>,
    /// Timestamp string sent in the payload
    pub provider_timestamp: Option<String>,
    /// Echoed request fields
    pub contact: Option<String>,
    pub price: Option<Price>,
    pub quantity: Option<Quantity>,
    pub sum: Option<Amount>,
    pub error_text: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl ReceiptRecord {
    /// Fresh record in `PENDING`
    pub fn pending(order_id: i64) -> Self {
        Self {
            order_id,
            status: ReceiptStatus::Pending,
            provider_uuid: None,
            provider_timestamp: None,
            contact: None,
            price: None,
            quantity: None,
            sum: None,
            error_text: None,
            updated_at: Utc::now(),
        }
    }

    /// Whether this record refuses a new send
    ///
    /// `SENT` and `DONE` always do. A `PENDING` record does while it is newer
    /// than `stale_before`; an older one is left over from an interrupted
    /// send and may be retried.
    pub fn blocks_send(&self, stale_before: DateTime<Utc>) -> bool {
        self.status.is_final() || (self.status == ReceiptStatus::Pending && self.updated_at > stale_before)
    }

    /// Move to `ERROR` with a message
    pub fn failed(mut self, message: impl Into<String>) -> Self {
        self.status = ReceiptStatus::Error;
        self.error_text = Some(message.into());
        self.updated_at = Utc::now();
        self
    }
}

//! Fiscal receipt workflow for stored orders

use std::sync::Arc;

use chrono::{Duration, Utc};
use common::error::{Error, Result};
use common::model::{ReceiptRecord, ReceiptStatus, TradeOrder};
use fiscal_receipt::{FiscalProfile, ReceiptIssuer, ReceiptOverrides};
use serde::Serialize;
use tracing::{info, warn};

use crate::repository::OrderRepository;

/// How long a `PENDING` claim keeps other sends out
///
/// Longer than the provider's token and register timeouts combined.
pub const IN_FLIGHT_WINDOW_SECS: i64 = 120;

/// Result of a receipt request
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptOutcome {
    pub status: ReceiptStatus,
    pub uuid: Option<String>,
    pub error_text: Option<String>,
    /// Whether the provider was contacted during this request
    #[serde(skip)]
    pub attempted: bool,
    #[serde(skip)]
    pub record: ReceiptRecord,
}

impl ReceiptOutcome {
    fn from_record(record: ReceiptRecord, attempted: bool) -> Self {
        Self {
            status: record.status,
            uuid: record.provider_uuid.clone(),
            error_text: record.error_text.clone(),
            attempted,
            record,
        }
    }
}

/// Sends receipts for stored orders and tracks their state
pub struct ReceiptService {
    repo: Arc<dyn OrderRepository>,
    issuer: ReceiptIssuer,
}

impl ReceiptService {
    pub fn new(repo: Arc<dyn OrderRepository>, issuer: ReceiptIssuer) -> Self {
        Self { repo, issuer }
    }

    /// Send a receipt for the order `order_id` owned by `user_id`
    ///
    /// An order whose receipt is already `SENT` or `DONE` is returned as is.
    /// Failures are stored as `ERROR` and reported in the outcome rather than
    /// as an error.
    pub async fn send(&self, user_id: i64, order_id: i64, overrides: &ReceiptOverrides) -> Result<ReceiptOutcome> {
        let order = self
            .repo
            .get_order_by_id(user_id, order_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Order not found: {}", order_id)))?;
        self.send_for(&order, overrides).await
    }

    /// Send a receipt for an already loaded order
    ///
    /// The order's receipt is claimed as `PENDING` before the provider is
    /// contacted. While a claim is younger than [`IN_FLIGHT_WINDOW_SECS`]
    /// concurrent requests get the pending record back instead of sending a
    /// second receipt.
    pub async fn send_for(&self, order: &TradeOrder, overrides: &ReceiptOverrides) -> Result<ReceiptOutcome> {
        let stale_before = Utc::now() - Duration::seconds(IN_FLIGHT_WINDOW_SECS);
        if let Some(existing) = order.receipt.as_ref().filter(|r| r.blocks_send(stale_before)) {
            info!("Receipt for order {} already {}", order.id, existing.status);
            return Ok(ReceiptOutcome::from_record(existing.clone(), false));
        }

        let user = self
            .repo
            .get_user(order.user_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("User not found: {}", order.user_id)))?;

        let mut record = ReceiptRecord::pending(order.id);
        record.contact = overrides.contact.clone();
        if !self.repo.claim_receipt(&record, stale_before).await? {
            let current = self
                .repo
                .get_receipt(order.id)
                .await?
                .ok_or_else(|| Error::Internal(format!("Receipt of order {} vanished", order.id)))?;
            info!("Receipt for order {} already {}", order.id, current.status);
            return Ok(ReceiptOutcome::from_record(current, false));
        }

        let profile = match FiscalProfile::from_user(&user) {
            Ok(profile) => profile,
            Err(e) => {
                warn!("Receipt for order {} not sent: {}", order.id, e);
                let record = record.failed(e.to_string());
                self.repo.save_receipt(&record).await?;
                return Ok(ReceiptOutcome::from_record(record, false));
            }
        };

        let record = match self.issuer.issue(order, &profile, overrides).await {
            Ok(issued) => ReceiptRecord {
                order_id: order.id,
                status: ReceiptStatus::Sent,
                provider_uuid: issued.uuid,
                provider_timestamp: Some(issued.timestamp),
                contact: issued.contact,
                price: Some(issued.price),
                quantity: Some(issued.quantity),
                sum: Some(issued.sum),
                error_text: None,
                updated_at: Utc::now(),
            },
            Err(e) => record.failed(e.to_string()),
        };

        self.repo.save_receipt(&record).await?;
        Ok(ReceiptOutcome::from_record(record, true))
    }

    /// Current receipt record of an order
    pub async fn status(&self, user_id: i64, order_id: i64) -> Result<Option<ReceiptRecord>> {
        let order = self
            .repo
            .get_order_by_id(user_id, order_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Order not found: {}", order_id)))?;
        Ok(order.receipt)
    }
}

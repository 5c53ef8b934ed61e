//! Bank payment details

use serde::{Deserialize, Serialize};

/// A named payment method belonging to a user
///
/// Deletion only sets `is_deleted` so that historic orders keep a valid
/// reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BankDetail {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
    pub is_deleted: bool,
}

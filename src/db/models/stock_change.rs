//! Stock Change Model (audit record)
//!
//! Append-only. One row per inventory ledger mutation; never updated or
//! deleted.

use super::serde_helpers;
use serde::{Deserialize, Serialize};
use surrealdb::RecordId;

/// Why a stock counter moved
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StockChangeType {
    /// Checkout decrement
    Order,
    /// Admin direct overwrite
    Manual,
    /// Cancellation restock
    Return,
    /// Reconciliation correction
    Adjustment,
}

/// Stock change audit row
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockChange {
    #[serde(default, with = "serde_helpers::option_record_id")]
    pub id: Option<RecordId>,
    #[serde(with = "serde_helpers::record_id")]
    pub product: RecordId,
    pub product_name: String,
    pub previous_stock: i64,
    pub new_stock: i64,
    /// Signed delta (new - previous)
    pub change_amount: i64,
    pub change_type: StockChangeType,
    /// Optional cross-reference, e.g. the order id that caused the change
    pub reference: Option<String>,
    pub note: Option<String>,
    pub created_at: String,
}

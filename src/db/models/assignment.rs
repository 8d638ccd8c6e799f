//! Delivery Assignment Model
//!
//! The join entity linking one order to one driver for a single delivery
//! attempt. At most one non-terminal assignment may exist per order and per
//! driver; the dispatcher enforces both before creating a row.

use super::serde_helpers;
use serde::{Deserialize, Serialize};
use surrealdb::RecordId;

/// Assignment status enum
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentStatus {
    Pending,
    Accepted,
    Completed,
    Cancelled,
}

impl AssignmentStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, AssignmentStatus::Completed | AssignmentStatus::Cancelled)
    }
}

/// Delivery assignment entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryAssignment {
    #[serde(default, with = "serde_helpers::option_record_id")]
    pub id: Option<RecordId>,
    #[serde(with = "serde_helpers::record_id")]
    pub order: RecordId,
    #[serde(with = "serde_helpers::record_id")]
    pub driver: RecordId,
    pub status: AssignmentStatus,
    /// Snapshot of the driver's location when assigned (JSON blob)
    pub start_location: Option<serde_json::Value>,
    /// Requested destination (JSON blob)
    pub delivery_location: Option<serde_json::Value>,
    pub assigned_at: String,
    pub accepted_at: Option<String>,
    pub completed_at: Option<String>,
    pub cancelled_at: Option<String>,
}

// =============================================================================
// API Request / Response Types
// =============================================================================

/// Assign driver payload
#[derive(Debug, Clone, Deserialize)]
pub struct AssignmentCreate {
    pub order_id: String,
    pub driver_id: String,
    pub delivery_location: Option<serde_json::Value>,
}

/// Assignment transition payload (`cancel` or `complete`)
#[derive(Debug, Clone, Deserialize)]
pub struct AssignmentTransition {
    pub assignment_id: String,
    pub action: String,
}

/// Assignment list row with denormalized order/driver context
///
/// Location and customer blobs that fail to parse are nulled out rather than
/// failing the whole list.
#[derive(Debug, Clone, Serialize)]
pub struct AssignmentView {
    pub assignment_id: String,
    pub status: AssignmentStatus,
    pub order_id: String,
    pub order_status: Option<super::OrderStatus>,
    pub order_total: Option<f64>,
    pub customer_info: Option<serde_json::Value>,
    pub driver_id: String,
    pub driver_name: Option<String>,
    pub start_location: Option<serde_json::Value>,
    pub delivery_location: Option<serde_json::Value>,
    pub assigned_at: String,
    pub accepted_at: Option<String>,
    pub completed_at: Option<String>,
    pub cancelled_at: Option<String>,
}

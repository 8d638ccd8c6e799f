//! Order Model
//!
//! Orders carry their line items as a JSON blob (`items`). Historical rows
//! exist in heterogeneous shapes (string-encoded JSON, string ids/quantities),
//! so the blob is normalized once at read time by [`crate::orders::items`]
//! rather than re-inspected deeper in the call stack.

use super::serde_helpers;
use serde::{Deserialize, Serialize};
use surrealdb::RecordId;
use validator::Validate;

// =============================================================================
// Order Status
// =============================================================================

/// Order status enum
///
/// Canonical names are English; the Spanish names used by older clients are
/// accepted as aliases on deserialization.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Pre-checkout accumulation state for in-restaurant tabs
    #[serde(alias = "mesa_abierta")]
    OpenTable,
    #[serde(alias = "pendiente")]
    Pending,
    #[serde(alias = "confirmado")]
    Confirmed,
    #[serde(alias = "preparando", alias = "en_preparacion")]
    Preparing,
    #[serde(alias = "listo")]
    Ready,
    #[serde(alias = "asignado")]
    AssignedToDriver,
    #[serde(alias = "aceptado")]
    AcceptedByDriver,
    #[serde(alias = "en_camino", alias = "en_reparto")]
    InDelivery,
    #[serde(alias = "entregado")]
    Delivered,
    #[serde(alias = "cancelado")]
    Cancelled,
}

impl OrderStatus {
    /// Terminal states admit no further transitions
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Delivered | OrderStatus::Cancelled)
    }

    /// Whether a transition from `self` to `target` is legal
    ///
    /// The kitchen chain is linear; `Cancelled` is reachable from any
    /// non-terminal state. `AssignedToDriver -> Ready` exists so a cancelled
    /// delivery assignment can put the order back in the dispatch pool.
    pub fn can_transition_to(&self, target: OrderStatus) -> bool {
        use OrderStatus::*;

        if self.is_terminal() {
            return false;
        }
        if target == Cancelled {
            return true;
        }

        matches!(
            (self, target),
            (OpenTable, Pending)
                | (Pending, Confirmed)
                | (Confirmed, Preparing)
                | (Preparing, Ready)
                | (Preparing, AssignedToDriver)
                | (Ready, AssignedToDriver)
                | (AssignedToDriver, AcceptedByDriver)
                | (AssignedToDriver, Ready)
                | (AcceptedByDriver, InDelivery)
                | (InDelivery, Delivered)
        )
    }

    /// Parse a status name, accepting both canonical and Spanish alias forms
    pub fn parse(value: &str) -> Option<OrderStatus> {
        serde_json::from_value(serde_json::Value::String(value.to_string())).ok()
    }

    /// Canonical (English) name
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::OpenTable => "open_table",
            OrderStatus::Pending => "pending",
            OrderStatus::Confirmed => "confirmed",
            OrderStatus::Preparing => "preparing",
            OrderStatus::Ready => "ready",
            OrderStatus::AssignedToDriver => "assigned_to_driver",
            OrderStatus::AcceptedByDriver => "accepted_by_driver",
            OrderStatus::InDelivery => "in_delivery",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
        }
    }
}

/// Payment status enum
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    #[serde(alias = "pendiente")]
    Pending,
    #[serde(alias = "pagado")]
    Paid,
}

// =============================================================================
// Order
// =============================================================================

/// Order entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    #[serde(default, with = "serde_helpers::option_record_id")]
    pub id: Option<RecordId>,
    /// Owning user id (None for guest checkouts and waiter-opened tables)
    pub user_id: Option<String>,
    /// Line items, stored as a JSON blob and normalized on read
    pub items: serde_json::Value,
    pub total: f64,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub payment_method: Option<String>,
    /// Customer contact blob, parsed defensively on read
    pub customer_info: Option<serde_json::Value>,
    /// Delivery address blob, parsed defensively on read
    pub delivery_address: Option<serde_json::Value>,
    #[serde(default, deserialize_with = "serde_helpers::bool_false")]
    pub is_delivery: bool,
    /// Table reference for in-restaurant open-table orders
    pub table_name: Option<String>,
    pub notes: Option<String>,
    /// Idempotency marker for the stock reconciliation engine
    #[serde(default, deserialize_with = "serde_helpers::bool_false")]
    pub stock_processed: bool,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
    pub delivered_at: Option<String>,
}

/// Structured line item as written by checkout
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderItem {
    /// Product record key ("product:xyz" stripped to "xyz")
    pub product_id: String,
    pub name: String,
    pub quantity: i64,
    /// Unit price captured at order time; client prices are never trusted
    pub unit_price: f64,
}

// =============================================================================
// API Request Types
// =============================================================================

/// Checkout line item (product reference + quantity only)
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CheckoutItem {
    pub product_id: String,
    #[validate(range(min = 1, message = "quantity must be at least 1"))]
    pub quantity: i64,
}

/// Create order payload
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct OrderCreate {
    #[validate(length(min = 1, message = "order must contain at least one item"))]
    #[validate(nested)]
    pub items: Vec<CheckoutItem>,
    pub customer_info: Option<serde_json::Value>,
    pub delivery_address: Option<serde_json::Value>,
    #[serde(default)]
    pub is_delivery: bool,
    pub payment_method: Option<String>,
    pub notes: Option<String>,
    /// When true and `table_name` already has an open tab, items are merged
    /// into it instead of creating a second order
    #[serde(default)]
    pub is_waiter_order: bool,
    pub table_name: Option<String>,
}

/// Status transition payload
#[derive(Debug, Clone, Deserialize)]
pub struct OrderStatusUpdate {
    pub status: String,
}

/// Checkout result
#[derive(Debug, Clone, Serialize)]
pub struct OrderReceipt {
    pub order_id: String,
    pub total: f64,
    pub status: OrderStatus,
    /// True when items were merged into an existing open table
    pub merged: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kitchen_chain_is_linear() {
        use OrderStatus::*;
        assert!(Pending.can_transition_to(Confirmed));
        assert!(Confirmed.can_transition_to(Preparing));
        assert!(Preparing.can_transition_to(Ready));
        assert!(Ready.can_transition_to(AssignedToDriver));
        assert!(AssignedToDriver.can_transition_to(AcceptedByDriver));
        assert!(AcceptedByDriver.can_transition_to(InDelivery));
        assert!(InDelivery.can_transition_to(Delivered));

        assert!(!Pending.can_transition_to(Ready));
        assert!(!Ready.can_transition_to(Delivered));
    }

    #[test]
    fn cancel_reachable_from_any_non_terminal_state() {
        use OrderStatus::*;
        for status in [
            OpenTable,
            Pending,
            Confirmed,
            Preparing,
            Ready,
            AssignedToDriver,
            AcceptedByDriver,
            InDelivery,
        ] {
            assert!(status.can_transition_to(Cancelled), "{:?}", status);
        }
    }

    #[test]
    fn terminal_states_are_sinks() {
        use OrderStatus::*;
        for target in [Pending, Ready, Delivered, Cancelled] {
            assert!(!Delivered.can_transition_to(target));
            assert!(!Cancelled.can_transition_to(target));
        }
    }

    #[test]
    fn open_table_closes_to_pending() {
        assert!(OrderStatus::OpenTable.can_transition_to(OrderStatus::Pending));
        assert!(!OrderStatus::OpenTable.can_transition_to(OrderStatus::Confirmed));
    }

    #[test]
    fn assignment_cancel_reverts_to_ready() {
        assert!(OrderStatus::AssignedToDriver.can_transition_to(OrderStatus::Ready));
    }

    #[test]
    fn spanish_aliases_parse_to_canonical_statuses() {
        assert_eq!(OrderStatus::parse("entregado"), Some(OrderStatus::Delivered));
        assert_eq!(OrderStatus::parse("cancelado"), Some(OrderStatus::Cancelled));
        assert_eq!(OrderStatus::parse("pendiente"), Some(OrderStatus::Pending));
        assert_eq!(OrderStatus::parse("pending"), Some(OrderStatus::Pending));
        assert_eq!(OrderStatus::parse("mesa_abierta"), Some(OrderStatus::OpenTable));
        assert_eq!(OrderStatus::parse("no_such_status"), None);
    }
}

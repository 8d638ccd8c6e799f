//! Delivery Driver Model

use super::serde_helpers;
use serde::{Deserialize, Serialize};
use surrealdb::RecordId;

/// Driver location coordinate
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

/// Delivery driver entity
///
/// `is_active` is employment status (admin-controlled); `is_available` flips
/// false while a non-terminal assignment references the driver.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryDriver {
    #[serde(default, with = "serde_helpers::option_record_id")]
    pub id: Option<RecordId>,
    /// Linked auth principal, when the driver has a login
    pub user_id: Option<String>,
    pub name: String,
    pub phone: Option<String>,
    #[serde(default = "default_true", deserialize_with = "serde_helpers::bool_true")]
    pub is_active: bool,
    #[serde(default = "default_true", deserialize_with = "serde_helpers::bool_true")]
    pub is_available: bool,
    #[serde(default, with = "serde_helpers::option_record_id")]
    pub current_order: Option<RecordId>,
    pub current_location: Option<GeoPoint>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

fn default_true() -> bool {
    true
}

/// Register driver payload
#[derive(Debug, Clone, Deserialize, validator::Validate)]
pub struct DriverCreate {
    pub user_id: Option<String>,
    #[validate(length(min = 1, message = "name cannot be empty"))]
    pub name: String,
    pub phone: Option<String>,
}

/// Admin/driver update payload
#[derive(Debug, Clone, Deserialize)]
pub struct DriverUpdate {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub is_active: Option<bool>,
    pub current_location: Option<GeoPoint>,
}

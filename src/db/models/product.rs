//! Product Model
//!
//! `stock` is the single authoritative counter; every change to it goes
//! through the inventory ledger, which appends a [`super::StockChange`] row.

use super::serde_helpers;
use serde::{Deserialize, Serialize};
use surrealdb::RecordId;

/// Product entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    #[serde(default, with = "serde_helpers::option_record_id")]
    pub id: Option<RecordId>,
    pub name: String,
    pub price: f64,
    #[serde(default)]
    pub stock: i64,
    pub category: Option<String>,
    #[serde(default = "default_true", deserialize_with = "serde_helpers::bool_true")]
    pub is_available: bool,
    #[serde(default, deserialize_with = "serde_helpers::bool_false")]
    pub is_featured: bool,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

fn default_true() -> bool {
    true
}

/// Create product payload
#[derive(Debug, Clone, Deserialize, validator::Validate)]
pub struct ProductCreate {
    #[validate(length(min = 1, message = "name cannot be empty"))]
    pub name: String,
    #[validate(range(min = 0.0, message = "price cannot be negative"))]
    pub price: f64,
    #[validate(range(min = 0, message = "stock cannot be negative"))]
    pub stock: Option<i64>,
    pub category: Option<String>,
    pub is_available: Option<bool>,
    pub is_featured: Option<bool>,
}

/// Update product payload (stock is excluded: stock moves through the ledger)
#[derive(Debug, Clone, Deserialize)]
pub struct ProductUpdate {
    pub name: Option<String>,
    pub price: Option<f64>,
    pub category: Option<String>,
    pub is_available: Option<bool>,
    pub is_featured: Option<bool>,
}

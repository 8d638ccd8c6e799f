//! Inventory Ledger
//!
//! The single write path for the `stock` counter. Every mutation goes through
//! one conditional UPDATE statement in [`ProductRepository`] and appends one
//! [`StockChange`] audit row.

use crate::db::models::{Product, StockChange, StockChangeType};
use crate::db::repository::{ProductRepository, StockChangeRepository};
use crate::utils::error::AppError;
use crate::utils::result::AppResult;
use crate::utils::time::now_rfc3339;
use surrealdb::Surreal;
use surrealdb::engine::local::Db;
use tracing::warn;

/// How checkout decrements behave when stock is short
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StockPolicy {
    /// `stock = max(0, stock - qty)`, never fails on quantity
    #[default]
    Clamp,
    /// Decrement only when `stock >= qty`, otherwise insufficient-stock
    Strict,
}

impl StockPolicy {
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_lowercase().as_str() {
            "clamp" => Some(Self::Clamp),
            "strict" => Some(Self::Strict),
            _ => None,
        }
    }
}

/// Outcome of one ledger mutation
#[derive(Debug, Clone, serde::Serialize)]
pub struct StockMovement {
    pub product_id: String,
    pub previous_stock: i64,
    pub new_stock: i64,
}

#[derive(Clone)]
pub struct StockLedger {
    products: ProductRepository,
    changes: StockChangeRepository,
    policy: StockPolicy,
}

impl StockLedger {
    pub fn new(db: Surreal<Db>, policy: StockPolicy) -> Self {
        Self {
            products: ProductRepository::new(db.clone()),
            changes: StockChangeRepository::new(db),
            policy,
        }
    }

    pub fn policy(&self) -> StockPolicy {
        self.policy
    }

    /// Decrement stock for a checkout line
    ///
    /// Under [`StockPolicy::Strict`] the decrement is a compare-and-swap and
    /// fails with insufficient-stock when the counter is short. Under
    /// [`StockPolicy::Clamp`] the counter floors at zero.
    pub async fn decrement(
        &self,
        product: &Product,
        quantity: i64,
        change_type: StockChangeType,
        reference: Option<String>,
    ) -> AppResult<StockMovement> {
        let key = product_key(product)?;
        let moved = match self.policy {
            StockPolicy::Strict => self
                .products
                .decrement_stock_checked(&key, quantity)
                .await?
                .ok_or_else(|| {
                    AppError::insufficient_stock(format!(
                        "Not enough stock for '{}' (requested {})",
                        product.name, quantity
                    ))
                })?,
            StockPolicy::Clamp => self
                .products
                .decrement_stock_clamped(&key, quantity)
                .await?
                .ok_or_else(|| {
                    AppError::not_found(format!("Product {} not found", key))
                })?,
        };

        self.record(&key, &product.name, moved, change_type, reference, None)
            .await
    }

    /// Restock (cancellations, returns)
    pub async fn increment(
        &self,
        product: &Product,
        quantity: i64,
        change_type: StockChangeType,
        reference: Option<String>,
    ) -> AppResult<StockMovement> {
        let key = product_key(product)?;
        let moved = self
            .products
            .increment_stock(&key, quantity)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Product {} not found", key)))?;

        self.record(&key, &product.name, moved, change_type, reference, None)
            .await
    }

    /// Overwrite the counter directly (admin set, reconciliation corrections)
    ///
    /// No audit row is written when the value does not change.
    pub async fn overwrite(
        &self,
        product: &Product,
        new_stock: i64,
        change_type: StockChangeType,
        note: Option<String>,
    ) -> AppResult<StockMovement> {
        let key = product_key(product)?;
        let moved = self
            .products
            .set_stock(&key, new_stock)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Product {} not found", key)))?;

        if moved.0 == moved.1 {
            return Ok(StockMovement {
                product_id: key,
                previous_stock: moved.0,
                new_stock: moved.1,
            });
        }
        self.record(&key, &product.name, moved, change_type, None, note)
            .await
    }

    async fn record(
        &self,
        key: &str,
        product_name: &str,
        (previous, new): (i64, i64),
        change_type: StockChangeType,
        reference: Option<String>,
        note: Option<String>,
    ) -> AppResult<StockMovement> {
        let append = self
            .changes
            .append(StockChange {
                id: None,
                product: surrealdb::RecordId::from_table_key("product", key),
                product_name: product_name.to_string(),
                previous_stock: previous,
                new_stock: new,
                change_amount: new - previous,
                change_type,
                reference,
                note,
                created_at: now_rfc3339(),
            })
            .await;

        // the counter moved; a lost audit row is logged, not rolled back
        if let Err(e) = append {
            warn!(product = %key, error = %e, "failed to append stock change audit row");
        }

        Ok(StockMovement {
            product_id: key.to_string(),
            previous_stock: previous,
            new_stock: new,
        })
    }
}

fn product_key(product: &Product) -> AppResult<String> {
    product
        .id
        .as_ref()
        .map(|id| id.key().to_string())
        .ok_or_else(|| AppError::internal("Product row has no id".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn policy_parses_known_values() {
        assert_eq!(StockPolicy::parse("clamp"), Some(StockPolicy::Clamp));
        assert_eq!(StockPolicy::parse("STRICT"), Some(StockPolicy::Strict));
        assert_eq!(StockPolicy::parse("other"), None);
    }
}

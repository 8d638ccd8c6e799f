//! Stock Reconciliation Engine
//!
//! Rebuilds product stock counters from order history. Three entry points:
//!
//! - [`StockReconciler::recompute_all`]: full recompute over every
//!   non-cancelled order (or only the unapplied ones, see below)
//! - [`StockReconciler::recompute_for_order`]: apply a single order's
//!   decrements
//! - [`StockReconciler::process_pending`]: apply every order not yet marked
//!   `stock_processed`
//!
//! One broken order or product never aborts a batch; failures are reported
//! per row and the pass continues.

use crate::db::models::{Order, StockChangeType};
use crate::db::repository::{OrderRepository, ProductRepository};
use crate::inventory::ledger::{StockLedger, StockPolicy};
use crate::inventory::matcher::ProductIndex;
use crate::orders::items::{self, LineItem};
use crate::utils::error::AppError;
use crate::utils::result::AppResult;
use serde::Serialize;
use std::collections::HashMap;
use surrealdb::Surreal;
use surrealdb::engine::local::Db;
use tracing::{info, warn};

/// Fallback baseline when recomputing from a fixed starting stock
pub const DEFAULT_BASELINE: i64 = 100;

/// Per-order outcome row
#[derive(Debug, Clone, Serialize)]
pub struct OrderOutcome {
    pub order_id: String,
    /// "processed", "skipped" or "invalid"
    pub result: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// Per-product outcome row
#[derive(Debug, Clone, Serialize)]
pub struct ProductOutcome {
    pub product_id: String,
    pub name: String,
    pub previous_stock: i64,
    pub new_stock: i64,
    pub total_sold: i64,
    /// "updated", "unchanged" or "error"
    pub result: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// Aggregate report returned by every reconciliation entry point
#[derive(Debug, Default, Serialize)]
pub struct ReconcileReport {
    pub orders_processed: usize,
    pub orders_skipped: usize,
    pub orders_invalid: usize,
    pub products_updated: usize,
    pub products_failed: usize,
    pub orders: Vec<OrderOutcome>,
    pub products: Vec<ProductOutcome>,
}

impl ReconcileReport {
    fn push_order(&mut self, order_id: String, result: &'static str, detail: Option<String>) {
        match result {
            "processed" => self.orders_processed += 1,
            "skipped" => self.orders_skipped += 1,
            _ => self.orders_invalid += 1,
        }
        self.orders.push(OrderOutcome {
            order_id,
            result,
            detail,
        });
    }
}

#[derive(Clone)]
pub struct StockReconciler {
    orders: OrderRepository,
    products: ProductRepository,
    ledger: StockLedger,
    baseline: i64,
}

impl StockReconciler {
    pub fn new(db: Surreal<Db>, baseline: i64) -> Self {
        Self {
            orders: OrderRepository::new(db.clone()),
            products: ProductRepository::new(db.clone()),
            // recomputation always floors at zero regardless of checkout policy
            ledger: StockLedger::new(db, StockPolicy::Clamp),
            baseline,
        }
    }

    /// Recompute stock for every product from order history
    ///
    /// With `reset_to_baseline` every non-cancelled order is tallied and each
    /// counter becomes `max(0, baseline - sold)`. Without it, only orders not
    /// yet applied to stock are tallied against the current counters, which
    /// makes back-to-back runs converge instead of double-subtracting.
    pub async fn recompute_all(&self, reset_to_baseline: bool) -> AppResult<ReconcileReport> {
        let index = ProductIndex::new(self.products.find_all().await?);
        let orders = if reset_to_baseline {
            self.orders.find_non_cancelled().await?
        } else {
            self.orders.find_unprocessed().await?
        };

        let mut report = ReconcileReport::default();
        let mut sold: HashMap<String, i64> = HashMap::new();
        let mut tallied: Vec<String> = Vec::new();

        for order in &orders {
            let order_id = order_key(order);
            match self.tally_order(order, &index, &mut sold) {
                Ok(skipped_lines) => {
                    let detail = (skipped_lines > 0)
                        .then(|| format!("{} line(s) skipped", skipped_lines));
                    report.push_order(order_id.clone(), "processed", detail);
                    tallied.push(order_id);
                }
                Err(reason) => {
                    warn!(order = %order_id, %reason, "order excluded from recompute");
                    report.push_order(order_id, "invalid", Some(reason));
                }
            }
        }

        for product in index.products() {
            let Some(id) = &product.id else { continue };
            let key = id.key().to_string();
            let total_sold = sold.get(&key).copied().unwrap_or(0);
            let start = if reset_to_baseline {
                self.baseline
            } else {
                product.stock
            };
            let target = (start - total_sold).max(0);

            match self
                .ledger
                .overwrite(
                    product,
                    target,
                    StockChangeType::Adjustment,
                    Some("stock recompute".to_string()),
                )
                .await
            {
                Ok(moved) => {
                    let changed = moved.previous_stock != moved.new_stock;
                    if changed {
                        report.products_updated += 1;
                    }
                    report.products.push(ProductOutcome {
                        product_id: key,
                        name: product.name.clone(),
                        previous_stock: moved.previous_stock,
                        new_stock: moved.new_stock,
                        total_sold,
                        result: if changed { "updated" } else { "unchanged" },
                        detail: None,
                    });
                }
                Err(e) => {
                    warn!(product = %key, error = %e, "stock write failed during recompute");
                    report.products_failed += 1;
                    report.products.push(ProductOutcome {
                        product_id: key,
                        name: product.name.clone(),
                        previous_stock: product.stock,
                        new_stock: product.stock,
                        total_sold,
                        result: "error",
                        detail: Some(e.to_string()),
                    });
                }
            }
        }

        for order_id in &tallied {
            if let Err(e) = self.orders.set_stock_processed(order_id, true).await {
                warn!(order = %order_id, error = %e, "failed to mark order as processed");
            }
        }

        info!(
            orders = report.orders_processed,
            invalid = report.orders_invalid,
            updated = report.products_updated,
            reset = reset_to_baseline,
            "stock recompute finished"
        );
        Ok(report)
    }

    /// Apply a single order's decrements to stock
    pub async fn recompute_for_order(&self, order_id: &str) -> AppResult<ReconcileReport> {
        let order = self
            .orders
            .find_by_id(order_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Order {} not found", order_id)))?;

        if order.status == crate::db::models::OrderStatus::Cancelled {
            return Err(AppError::invalid_status(format!(
                "Order {} is cancelled and cannot be applied to stock",
                order_id
            )));
        }

        let mut report = ReconcileReport::default();
        if order.stock_processed {
            report.push_order(
                order_key(&order),
                "skipped",
                Some("already applied to stock".to_string()),
            );
            return Ok(report);
        }

        let index = ProductIndex::new(self.products.find_all().await?);
        self.apply_order(&order, &index, &mut report).await;
        Ok(report)
    }

    /// Apply every order not yet marked as applied to stock
    pub async fn process_pending(&self) -> AppResult<ReconcileReport> {
        let orders = self.orders.find_unprocessed().await?;
        let index = ProductIndex::new(self.products.find_all().await?);

        let mut report = ReconcileReport::default();
        for order in &orders {
            self.apply_order(order, &index, &mut report).await;
        }

        info!(
            processed = report.orders_processed,
            invalid = report.orders_invalid,
            "pending orders pass finished"
        );
        Ok(report)
    }

    /// Decrement stock for each resolvable line of one order, then mark it
    /// processed. Failures are recorded in the report; the batch continues.
    async fn apply_order(&self, order: &Order, index: &ProductIndex, report: &mut ReconcileReport) {
        let order_id = order_key(order);

        let (lines, skipped) = match items::normalize_items(&order.items) {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!(order = %order_id, error = %e, "unusable items blob");
                report.push_order(order_id, "invalid", Some(e.to_string()));
                return;
            }
        };

        let mut unresolved = 0usize;
        for line in &lines {
            let Some(product) = index.resolve(line) else {
                unresolved += 1;
                warn!(
                    order = %order_id,
                    product_id = ?line.product_id,
                    name = ?line.name,
                    "line references no known product"
                );
                continue;
            };
            match self
                .ledger
                .decrement(
                    product,
                    line.quantity,
                    StockChangeType::Order,
                    Some(order_id.clone()),
                )
                .await
            {
                Ok(moved) => {
                    report.products_updated += 1;
                    report.products.push(ProductOutcome {
                        product_id: moved.product_id,
                        name: product.name.clone(),
                        previous_stock: moved.previous_stock,
                        new_stock: moved.new_stock,
                        total_sold: line.quantity,
                        result: "updated",
                        detail: None,
                    });
                }
                Err(e) => {
                    warn!(order = %order_id, product = %product.name, error = %e, "decrement failed");
                    report.products_failed += 1;
                    report.products.push(ProductOutcome {
                        product_id: product
                            .id
                            .as_ref()
                            .map(|id| id.key().to_string())
                            .unwrap_or_default(),
                        name: product.name.clone(),
                        previous_stock: product.stock,
                        new_stock: product.stock,
                        total_sold: line.quantity,
                        result: "error",
                        detail: Some(e.to_string()),
                    });
                }
            }
        }

        let mut details = Vec::new();
        if !skipped.is_empty() {
            details.push(format!("{} line(s) skipped", skipped.len()));
        }
        if unresolved > 0 {
            details.push(format!("{} line(s) matched no product", unresolved));
        }
        report.push_order(
            order_id.clone(),
            "processed",
            (!details.is_empty()).then(|| details.join(", ")),
        );

        if let Err(e) = self.orders.set_stock_processed(&order_id, true).await {
            warn!(order = %order_id, error = %e, "failed to mark order as processed");
        }
    }

    /// Tally one order's lines into the sold-per-product map
    ///
    /// Returns the number of skipped lines, or an error string when the whole
    /// items blob is unusable.
    fn tally_order(
        &self,
        order: &Order,
        index: &ProductIndex,
        sold: &mut HashMap<String, i64>,
    ) -> Result<usize, String> {
        let (lines, skipped) =
            items::normalize_items(&order.items).map_err(|e| e.to_string())?;

        for line in &lines {
            if let Some(key) = resolve_key(index, line) {
                *sold.entry(key).or_insert(0) += line.quantity;
            }
        }
        Ok(skipped.len())
    }
}

fn resolve_key(index: &ProductIndex, line: &LineItem) -> Option<String> {
    index
        .resolve(line)
        .and_then(|p| p.id.as_ref())
        .map(|id| id.key().to_string())
}

fn order_key(order: &Order) -> String {
    order
        .id
        .as_ref()
        .map(|id| id.key().to_string())
        .unwrap_or_default()
}

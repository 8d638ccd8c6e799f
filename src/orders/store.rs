//! Order Store
//!
//! Checkout, open-table merging, status transitions, and the stock side
//! effects that go with them. All stock movement goes through the
//! [`StockLedger`]; multi-step writes that fail midway are compensated, not
//! left half-applied.

use crate::auth::CurrentUser;
use crate::db::models::{
    Order, OrderCreate, OrderItem, OrderReceipt, OrderStatus, PaymentStatus, Product,
    StockChangeType,
};
use crate::db::repository::{OrderRepository, ProductRepository};
use crate::inventory::ledger::{StockLedger, StockPolicy};
use crate::orders::{items, money};
use crate::utils::error::AppError;
use crate::utils::result::AppResult;
use crate::utils::time::now_rfc3339;
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use surrealdb::Surreal;
use surrealdb::engine::local::Db;
use tracing::{info, warn};
use validator::Validate;

#[derive(Clone)]
pub struct OrderStore {
    orders: OrderRepository,
    products: ProductRepository,
    ledger: StockLedger,
}

/// A checkout line after product resolution and price capture
struct ResolvedLine {
    product: Product,
    quantity: i64,
}

impl OrderStore {
    pub fn new(db: Surreal<Db>, policy: StockPolicy) -> Self {
        Self {
            orders: OrderRepository::new(db.clone()),
            products: ProductRepository::new(db.clone()),
            ledger: StockLedger::new(db, policy),
        }
    }

    /// Checkout
    ///
    /// Every line is validated against the live product catalog before any
    /// write happens: unknown product, unavailable product, or insufficient
    /// stock each fail the whole request with the offending product named.
    /// Totals are computed server side from catalog prices.
    pub async fn create_order(
        &self,
        user: &CurrentUser,
        req: OrderCreate,
    ) -> AppResult<OrderReceipt> {
        req.validate()?;

        if req.is_waiter_order && !(user.is_waiter() || user.is_admin()) {
            return Err(AppError::forbidden("Waiter role required for table orders"));
        }

        let lines = self.resolve_lines(&req).await?;
        let increment: Decimal = lines
            .iter()
            .map(|l| money::line_total(l.product.price, l.quantity))
            .sum();

        // waiter orders merge into an already-open tab for the same table
        if req.is_waiter_order
            && let Some(table) = &req.table_name
            && let Some(open) = self.orders.find_open_table(table).await?
        {
            return self.merge_into_open_table(open, lines, increment).await;
        }

        let status = if req.is_waiter_order {
            OrderStatus::OpenTable
        } else {
            OrderStatus::Pending
        };
        let total = money::to_f64(increment);
        let now = now_rfc3339();
        let order = Order {
            id: None,
            user_id: Some(user.id.clone()),
            items: items_blob(&lines),
            total,
            status,
            payment_status: PaymentStatus::Pending,
            payment_method: req.payment_method,
            customer_info: req.customer_info,
            delivery_address: req.delivery_address,
            is_delivery: req.is_delivery,
            table_name: req.table_name,
            notes: req.notes,
            // stock is decremented synchronously below
            stock_processed: true,
            created_at: Some(now.clone()),
            updated_at: Some(now),
            delivered_at: None,
        };

        let created = self.orders.create(order).await?;
        let order_id = key_of(&created)?;

        if let Err(e) = self.decrement_lines(&lines, &order_id).await {
            // roll the order row back; restocks already happened inside
            // decrement_lines for the lines it applied
            if let Err(del) = self.orders.delete(&order_id).await {
                warn!(order = %order_id, error = %del, "failed to remove order after rollback");
            }
            return Err(e);
        }

        info!(order = %order_id, total, status = status.as_str(), "order created");
        Ok(OrderReceipt {
            order_id,
            total: created.total,
            status: created.status,
            merged: false,
        })
    }

    /// Fetch one order; non-admins only see their own
    pub async fn get_order(&self, user: &CurrentUser, order_id: &str) -> AppResult<Order> {
        let order = self
            .orders
            .find_by_id(order_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Order {} not found", order_id)))?;

        if !user.is_admin()
            && !user.is_waiter()
            && order.user_id.as_deref() != Some(user.id.as_str())
        {
            return Err(AppError::forbidden("Not your order"));
        }
        Ok(order)
    }

    /// List orders; non-staff callers are always scoped to their own
    pub async fn list_orders(
        &self,
        user: &CurrentUser,
        status: Option<&str>,
        mine: bool,
        limit: i64,
    ) -> AppResult<Vec<Order>> {
        let status = match status {
            Some(raw) => Some(
                OrderStatus::parse(raw)
                    .ok_or_else(|| AppError::invalid(format!("Unknown status '{}'", raw)))?,
            ),
            None => None,
        };
        let staff = user.is_admin() || user.is_waiter();
        let owner = if staff && !mine {
            None
        } else {
            Some(user.id.clone())
        };
        Ok(self.orders.find_all(status, owner, limit).await?)
    }

    /// Transition an order to a new status
    ///
    /// Accepts canonical and Spanish status names. Cancelling an order whose
    /// stock was already decremented restocks every resolvable line.
    pub async fn update_status(
        &self,
        user: &CurrentUser,
        order_id: &str,
        target_raw: &str,
    ) -> AppResult<Order> {
        let target = OrderStatus::parse(target_raw)
            .ok_or_else(|| AppError::invalid_status(format!("Unknown status '{}'", target_raw)))?;

        let order = self
            .orders
            .find_by_id(order_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Order {} not found", order_id)))?;

        self.authorize_transition(user, &order, target)?;

        if !order.status.can_transition_to(target) {
            return Err(AppError::invalid_status(format!(
                "Cannot move order from '{}' to '{}'",
                order.status.as_str(),
                target.as_str()
            )));
        }

        // commit the transition first; stock only moves for orders that are
        // actually cancelled
        let updated = self.orders.update_status(order_id, target).await?;
        if target == OrderStatus::Cancelled && order.stock_processed {
            self.restock_order(&order, order_id).await;
        }
        info!(order = %order_id, from = order.status.as_str(), to = target.as_str(), "order status updated");
        Ok(updated)
    }

    /// Hard delete (admin, cancelled orders only)
    pub async fn delete_order(&self, user: &CurrentUser, order_id: &str) -> AppResult<()> {
        user.require_admin()?;
        let order = self
            .orders
            .find_by_id(order_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Order {} not found", order_id)))?;
        if order.status != OrderStatus::Cancelled {
            return Err(AppError::invalid(
                "Only cancelled orders can be deleted".to_string(),
            ));
        }
        self.orders.delete(order_id).await?;
        Ok(())
    }

    // =========================================================================
    // Internals
    // =========================================================================

    /// Validate every requested line against the catalog before any write
    ///
    /// Duplicate product references are merged by summing quantities.
    async fn resolve_lines(&self, req: &OrderCreate) -> AppResult<Vec<ResolvedLine>> {
        let mut quantities: BTreeMap<String, i64> = BTreeMap::new();
        for item in &req.items {
            let key = item
                .product_id
                .strip_prefix("product:")
                .unwrap_or(&item.product_id)
                .to_string();
            *quantities.entry(key).or_insert(0) += item.quantity;
        }

        let mut lines = Vec::with_capacity(quantities.len());
        for (product_id, quantity) in quantities {
            let product = self
                .products
                .find_by_id(&product_id)
                .await?
                .ok_or_else(|| {
                    AppError::not_found(format!("Product {} not found", product_id))
                })?;
            if !product.is_available {
                return Err(AppError::product_unavailable(format!(
                    "'{}' is not available",
                    product.name
                )));
            }
            if product.stock < quantity {
                return Err(AppError::insufficient_stock(format!(
                    "Not enough stock for '{}' (requested {}, available {})",
                    product.name, quantity, product.stock
                )));
            }
            lines.push(ResolvedLine { product, quantity });
        }
        Ok(lines)
    }

    /// Decrement stock for each line; on failure, restock the lines already
    /// applied and return the error
    async fn decrement_lines(&self, lines: &[ResolvedLine], order_id: &str) -> AppResult<()> {
        let mut applied: Vec<&ResolvedLine> = Vec::new();
        for line in lines {
            match self
                .ledger
                .decrement(
                    &line.product,
                    line.quantity,
                    StockChangeType::Order,
                    Some(order_id.to_string()),
                )
                .await
            {
                Ok(_) => applied.push(line),
                Err(e) => {
                    warn!(order = %order_id, product = %line.product.name, error = %e,
                        "checkout decrement failed, rolling back");
                    for done in applied {
                        if let Err(undo) = self
                            .ledger
                            .increment(
                                &done.product,
                                done.quantity,
                                StockChangeType::Return,
                                Some(order_id.to_string()),
                            )
                            .await
                        {
                            warn!(order = %order_id, product = %done.product.name, error = %undo,
                                "rollback restock failed");
                        }
                    }
                    return Err(e);
                }
            }
        }
        Ok(())
    }

    /// Merge new lines into an existing open table
    ///
    /// Quantities are summed for products already on the tab; the total grows
    /// by the new lines only. Stock is decremented for the new lines. Legacy
    /// lines that cannot be resolved to a product are carried over verbatim,
    /// so the tab's total keeps covering them.
    async fn merge_into_open_table(
        &self,
        open: Order,
        lines: Vec<ResolvedLine>,
        increment: Decimal,
    ) -> AppResult<OrderReceipt> {
        let order_id = key_of(&open)?;

        let raw_lines = items::parse_items(&open.items).map_err(|e| {
            AppError::invalid(format!(
                "Open table {} has an unusable items list: {}",
                order_id, e
            ))
        })?;

        let mut preserved: Vec<serde_json::Value> = Vec::new();
        let mut existing: Vec<OrderItem> = Vec::new();
        for (index, raw) in raw_lines.iter().enumerate() {
            match items::coerce_item(index, raw) {
                Ok(line) => match line.product_id {
                    Some(product_id) => existing.push(OrderItem {
                        product_id,
                        name: line.name.unwrap_or_default(),
                        quantity: line.quantity,
                        unit_price: line.unit_price,
                    }),
                    // name-only legacy line, kept untouched
                    None => preserved.push(raw.clone()),
                },
                Err(e) => {
                    warn!(order = %order_id, error = %e, "malformed tab line carried over unchanged");
                    preserved.push(raw.clone());
                }
            }
        }

        for line in &lines {
            let key = line
                .product
                .id
                .as_ref()
                .map(|id| id.key().to_string())
                .unwrap_or_default();
            match existing.iter_mut().find(|i| i.product_id == key) {
                Some(slot) => slot.quantity += line.quantity,
                None => existing.push(OrderItem {
                    product_id: key,
                    name: line.product.name.clone(),
                    quantity: line.quantity,
                    unit_price: line.product.price,
                }),
            }
        }

        let previous_items = open.items.clone();
        let previous_total = open.total;
        let new_total = money::to_f64(money::to_decimal(previous_total) + increment);

        let mut merged: Vec<serde_json::Value> = preserved;
        for item in &existing {
            merged.push(serde_json::to_value(item).map_err(|e| AppError::internal(e.to_string()))?);
        }
        self.orders
            .update_items(&order_id, serde_json::Value::Array(merged), new_total)
            .await?;

        if let Err(e) = self.decrement_lines(&lines, &order_id).await {
            // put the tab back the way it was
            if let Err(undo) = self
                .orders
                .update_items(&order_id, previous_items, previous_total)
                .await
            {
                warn!(order = %order_id, error = %undo, "failed to restore open table after rollback");
            }
            return Err(e);
        }

        info!(order = %order_id, added = %increment, "items merged into open table");
        Ok(OrderReceipt {
            order_id,
            total: new_total,
            status: OrderStatus::OpenTable,
            merged: true,
        })
    }

    /// Put the stock of a cancelled order's lines back
    ///
    /// Best effort per line: an unresolvable line is logged and skipped, it
    /// never blocks the cancellation itself.
    async fn restock_order(&self, order: &Order, order_id: &str) {
        let (lines, skipped) = match items::normalize_items(&order.items) {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!(order = %order_id, error = %e, "cannot restock: unusable items list");
                return;
            }
        };
        if !skipped.is_empty() {
            warn!(order = %order_id, skipped = skipped.len(), "some lines cannot be restocked");
        }

        for line in lines {
            let Some(product_id) = line.product_id else {
                warn!(order = %order_id, name = ?line.name, "line without product id not restocked");
                continue;
            };
            let product = match self.products.find_by_id(&product_id).await {
                Ok(Some(p)) => p,
                Ok(None) => {
                    warn!(order = %order_id, product = %product_id, "product gone, not restocked");
                    continue;
                }
                Err(e) => {
                    warn!(order = %order_id, product = %product_id, error = %e, "restock lookup failed");
                    continue;
                }
            };
            if let Err(e) = self
                .ledger
                .increment(
                    &product,
                    line.quantity,
                    StockChangeType::Return,
                    Some(order_id.to_string()),
                )
                .await
            {
                warn!(order = %order_id, product = %product.name, error = %e, "restock failed");
            }
        }
    }

    fn authorize_transition(
        &self,
        user: &CurrentUser,
        order: &Order,
        target: OrderStatus,
    ) -> AppResult<()> {
        if user.is_admin() {
            return Ok(());
        }
        if user.is_driver()
            && matches!(
                target,
                OrderStatus::AcceptedByDriver | OrderStatus::InDelivery | OrderStatus::Delivered
            )
        {
            return Ok(());
        }
        if user.is_waiter()
            && matches!(target, OrderStatus::Pending | OrderStatus::Cancelled)
        {
            return Ok(());
        }
        // owners may cancel their own order
        if target == OrderStatus::Cancelled
            && order.user_id.as_deref() == Some(user.id.as_str())
        {
            return Ok(());
        }
        Err(AppError::forbidden(format!(
            "Not allowed to move this order to '{}'",
            target.as_str()
        )))
    }
}

fn key_of(order: &Order) -> AppResult<String> {
    order
        .id
        .as_ref()
        .map(|id| id.key().to_string())
        .ok_or_else(|| AppError::internal("Order row has no id".to_string()))
}

fn items_blob(lines: &[ResolvedLine]) -> serde_json::Value {
    let items: Vec<OrderItem> = lines
        .iter()
        .map(|l| OrderItem {
            product_id: l
                .product
                .id
                .as_ref()
                .map(|id| id.key().to_string())
                .unwrap_or_default(),
            name: l.product.name.clone(),
            quantity: l.quantity,
            unit_price: l.product.price,
        })
        .collect();
    serde_json::to_value(items).unwrap_or(serde_json::Value::Array(vec![]))
}

//! Order Repository

use super::{BaseRepository, RepoError, RepoResult, record_id};
use crate::db::models::{Order, OrderStatus};
use crate::utils::time::now_rfc3339;
use surrealdb::Surreal;
use surrealdb::engine::local::Db;

const TABLE: &str = "order";

#[derive(Clone)]
pub struct OrderRepository {
    base: BaseRepository,
}

impl OrderRepository {
    pub fn new(db: Surreal<Db>) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }

    /// Create a new order row
    pub async fn create(&self, order: Order) -> RepoResult<Order> {
        let created: Option<Order> = self.base.db().create(TABLE).content(order).await?;
        created.ok_or_else(|| RepoError::Database("Failed to create order".to_string()))
    }

    /// Find order by id
    pub async fn find_by_id(&self, id: &str) -> RepoResult<Option<Order>> {
        let rid = record_id(TABLE, id)?;
        let order: Option<Order> = self.base.db().select(rid).await?;
        Ok(order)
    }

    /// List orders, newest first, optionally filtered by status and owner
    pub async fn find_all(
        &self,
        status: Option<OrderStatus>,
        user_id: Option<String>,
        limit: i64,
    ) -> RepoResult<Vec<Order>> {
        let mut conditions: Vec<&str> = Vec::new();
        if status.is_some() {
            conditions.push("status = $status");
        }
        if user_id.is_some() {
            conditions.push("user_id = $user_id");
        }
        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", conditions.join(" AND "))
        };
        let query_str = format!(
            "SELECT * FROM order{} ORDER BY created_at DESC LIMIT $limit",
            where_clause
        );

        let mut query = self.base.db().query(query_str).bind(("limit", limit));
        if let Some(s) = status {
            query = query.bind(("status", s));
        }
        if let Some(u) = user_id {
            query = query.bind(("user_id", u));
        }

        let orders: Vec<Order> = query.await?.take(0)?;
        Ok(orders)
    }

    /// Find the open tab for a table, if any
    pub async fn find_open_table(&self, table_name: &str) -> RepoResult<Option<Order>> {
        let orders: Vec<Order> = self
            .base
            .db()
            .query("SELECT * FROM order WHERE status = $status AND table_name = $table LIMIT 1")
            .bind(("status", OrderStatus::OpenTable))
            .bind(("table", table_name.to_string()))
            .await?
            .take(0)?;
        Ok(orders.into_iter().next())
    }

    /// All orders that count toward sold totals (status != cancelled)
    pub async fn find_non_cancelled(&self) -> RepoResult<Vec<Order>> {
        let orders: Vec<Order> = self
            .base
            .db()
            .query("SELECT * FROM order WHERE status != $cancelled")
            .bind(("cancelled", OrderStatus::Cancelled))
            .await?
            .take(0)?;
        Ok(orders)
    }

    /// Non-cancelled orders not yet applied to stock
    pub async fn find_unprocessed(&self) -> RepoResult<Vec<Order>> {
        let orders: Vec<Order> = self
            .base
            .db()
            .query("SELECT * FROM order WHERE status != $cancelled AND stock_processed != true")
            .bind(("cancelled", OrderStatus::Cancelled))
            .await?
            .take(0)?;
        Ok(orders)
    }

    /// Claim an order for dispatch (compare-and-swap)
    ///
    /// Moves the order to `AssignedToDriver` only while it is still in the
    /// dispatch window. Returns the pre-claim row; `None` when no row was
    /// updated, i.e. the order is missing, finished, or already claimed by a
    /// concurrent assignment.
    pub async fn claim_for_dispatch(&self, id: &str) -> RepoResult<Option<Order>> {
        let rid = record_id(TABLE, id)?;
        let mut result = self
            .base
            .db()
            .query(
                "UPDATE $id SET status = $assigned, updated_at = $now \
                 WHERE status IN [$preparing, $ready] RETURN BEFORE",
            )
            .bind(("id", rid))
            .bind(("assigned", OrderStatus::AssignedToDriver))
            .bind(("preparing", OrderStatus::Preparing))
            .bind(("ready", OrderStatus::Ready))
            .bind(("now", now_rfc3339()))
            .await?;
        let before: Vec<Order> = result.take(0)?;
        Ok(before.into_iter().next())
    }

    /// Set order status; stamps `delivered_at` when the target is Delivered
    pub async fn update_status(&self, id: &str, status: OrderStatus) -> RepoResult<Order> {
        let rid = record_id(TABLE, id)?;
        let now = now_rfc3339();

        let query_str = if status == OrderStatus::Delivered {
            "UPDATE $id SET status = $status, updated_at = $now, delivered_at = $now RETURN AFTER"
        } else {
            "UPDATE $id SET status = $status, updated_at = $now RETURN AFTER"
        };

        let mut result = self
            .base
            .db()
            .query(query_str)
            .bind(("id", rid))
            .bind(("status", status))
            .bind(("now", now))
            .await?;
        let orders: Vec<Order> = result.take(0)?;
        orders
            .into_iter()
            .next()
            .ok_or_else(|| RepoError::NotFound(format!("Order {} not found", id)))
    }

    /// Replace the items blob and total (open-table merge)
    pub async fn update_items(
        &self,
        id: &str,
        items: serde_json::Value,
        total: f64,
    ) -> RepoResult<Order> {
        let rid = record_id(TABLE, id)?;
        let mut result = self
            .base
            .db()
            .query("UPDATE $id SET items = $items, total = $total, updated_at = $now RETURN AFTER")
            .bind(("id", rid))
            .bind(("items", items))
            .bind(("total", total))
            .bind(("now", now_rfc3339()))
            .await?;
        let orders: Vec<Order> = result.take(0)?;
        orders
            .into_iter()
            .next()
            .ok_or_else(|| RepoError::NotFound(format!("Order {} not found", id)))
    }

    /// Flip the reconciliation idempotency marker
    pub async fn set_stock_processed(&self, id: &str, processed: bool) -> RepoResult<()> {
        let rid = record_id(TABLE, id)?;
        self.base
            .db()
            .query("UPDATE $id SET stock_processed = $processed, updated_at = $now")
            .bind(("id", rid))
            .bind(("processed", processed))
            .bind(("now", now_rfc3339()))
            .await?;
        Ok(())
    }

    /// Hard delete an order row (admin-only, cancelled orders only; the
    /// service layer enforces the status check)
    pub async fn delete(&self, id: &str) -> RepoResult<()> {
        let rid = record_id(TABLE, id)?;
        let deleted: Option<Order> = self.base.db().delete(rid).await?;
        if deleted.is_none() {
            return Err(RepoError::NotFound(format!("Order {} not found", id)));
        }
        Ok(())
    }
}

//! Delivery Dispatcher
//!
//! Pairs ready orders with available drivers. Driver exclusivity rests on a
//! single conditional UPDATE (the claim); everything after the claim is
//! compensated on failure so a driver is never left stuck on a dead
//! assignment.

use crate::auth::CurrentUser;
use crate::db::models::{
    AssignmentCreate, AssignmentStatus, AssignmentTransition, AssignmentView, DeliveryAssignment,
    OrderStatus,
};
use crate::db::repository::{
    AssignmentFilter, AssignmentRepository, DriverRepository, OrderRepository, record_id,
};
use crate::utils::error::AppError;
use crate::utils::result::AppResult;
use crate::utils::time::now_rfc3339;
use surrealdb::Surreal;
use surrealdb::engine::local::Db;
use tracing::{info, warn};

#[derive(Clone)]
pub struct DeliveryDispatcher {
    orders: OrderRepository,
    drivers: DriverRepository,
    assignments: AssignmentRepository,
}

impl DeliveryDispatcher {
    pub fn new(db: Surreal<Db>) -> Self {
        Self {
            orders: OrderRepository::new(db.clone()),
            drivers: DriverRepository::new(db.clone()),
            assignments: AssignmentRepository::new(db),
        }
    }

    /// Assign a driver to an order
    ///
    /// Preconditions are checked in a fixed sequence so each failure mode is
    /// distinct: order dispatchability, driver existence, driver
    /// availability, then no live assignment for the order. Both sides are
    /// then claimed with conditional UPDATEs (order first, then driver), so
    /// concurrent assigns for the same order or the same driver resolve to
    /// one winner.
    pub async fn assign(
        &self,
        user: &CurrentUser,
        req: AssignmentCreate,
    ) -> AppResult<DeliveryAssignment> {
        user.require_admin()?;

        let order = self
            .orders
            .find_by_id(&req.order_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Order {} not found", req.order_id)))?;
        if !matches!(order.status, OrderStatus::Preparing | OrderStatus::Ready) {
            return Err(AppError::order_not_ready(format!(
                "Order {} is '{}', expected 'preparing' or 'ready'",
                req.order_id,
                order.status.as_str()
            )));
        }
        let order_rid = record_id("order", &req.order_id)?;

        let driver = self
            .drivers
            .find_by_id(&req.driver_id)
            .await?
            .filter(|d| d.is_active)
            .ok_or_else(|| AppError::not_found(format!("Driver {} not found", req.driver_id)))?;
        if !driver.is_available {
            return Err(AppError::driver_unavailable(format!(
                "Driver '{}' is not available",
                driver.name
            )));
        }

        if let Some(existing) = self.assignments.find_active_for_order(&order_rid).await? {
            return Err(AppError::already_assigned(format!(
                "Order {} already has assignment {}",
                req.order_id,
                existing
                    .id
                    .as_ref()
                    .map(|id| id.key().to_string())
                    .unwrap_or_default()
            )));
        }

        // claim the order: moves it to assigned_to_driver only while it is
        // still dispatchable, so a racing assign loses here
        let before = self
            .orders
            .claim_for_dispatch(&req.order_id)
            .await?
            .ok_or_else(|| {
                AppError::already_assigned(format!(
                    "Order {} was claimed by a concurrent assignment",
                    req.order_id
                ))
            })?;

        // claim the driver the same way
        let claimed = match self.drivers.claim(&req.driver_id, order_rid.clone()).await {
            Ok(Some(d)) => d,
            Ok(None) => {
                self.restore_order_status(&req.order_id, before.status).await;
                return Err(AppError::driver_unavailable(format!(
                    "Driver '{}' was claimed by a concurrent assignment",
                    driver.name
                )));
            }
            Err(e) => {
                self.restore_order_status(&req.order_id, before.status).await;
                return Err(e.into());
            }
        };

        let driver_rid = match claimed.id.clone() {
            Some(id) => id,
            None => {
                self.release_driver(&req.driver_id).await;
                self.restore_order_status(&req.order_id, before.status).await;
                return Err(AppError::internal("Driver row has no id".to_string()));
            }
        };
        let assignment = DeliveryAssignment {
            id: None,
            order: order_rid,
            driver: driver_rid,
            status: AssignmentStatus::Pending,
            start_location: claimed
                .current_location
                .and_then(|loc| serde_json::to_value(loc).ok()),
            delivery_location: req.delivery_location,
            assigned_at: now_rfc3339(),
            accepted_at: None,
            completed_at: None,
            cancelled_at: None,
        };

        let created = match self.assignments.create(assignment).await {
            Ok(a) => a,
            Err(e) => {
                // undo both claims
                self.release_driver(&req.driver_id).await;
                self.restore_order_status(&req.order_id, before.status).await;
                return Err(e.into());
            }
        };

        info!(order = %req.order_id, driver = %req.driver_id, "driver assigned");
        Ok(created)
    }

    /// Move an assignment through its lifecycle
    ///
    /// `accept` and `complete` advance it; `cancel` ends it and returns the
    /// order to the dispatch pool. The driver is freed on either ending.
    pub async fn transition(
        &self,
        user: &CurrentUser,
        req: AssignmentTransition,
    ) -> AppResult<DeliveryAssignment> {
        if !user.is_admin() && !user.is_driver() {
            return Err(AppError::forbidden("Driver or administrator role required"));
        }

        let assignment = self
            .assignments
            .find_by_id(&req.assignment_id)
            .await?
            .ok_or_else(|| {
                AppError::not_found(format!("Assignment {} not found", req.assignment_id))
            })?;
        if assignment.status.is_terminal() {
            return Err(AppError::invalid_status(format!(
                "Assignment {} is already finished",
                req.assignment_id
            )));
        }

        let order_id = assignment.order.key().to_string();
        let driver_id = assignment.driver.key().to_string();

        match req.action.as_str() {
            "accept" => {
                if assignment.status != AssignmentStatus::Pending {
                    return Err(AppError::invalid_status(
                        "Only pending assignments can be accepted".to_string(),
                    ));
                }
                let updated = self
                    .assignments
                    .set_status(&req.assignment_id, AssignmentStatus::Accepted)
                    .await?;
                if let Err(e) = self
                    .orders
                    .update_status(&order_id, OrderStatus::AcceptedByDriver)
                    .await
                {
                    warn!(order = %order_id, error = %e, "order status not advanced on accept");
                }
                Ok(updated)
            }
            "complete" => {
                let updated = self
                    .assignments
                    .set_status(&req.assignment_id, AssignmentStatus::Completed)
                    .await?;
                if let Err(e) = self
                    .orders
                    .update_status(&order_id, OrderStatus::Delivered)
                    .await
                {
                    warn!(order = %order_id, error = %e, "order not marked delivered on completion");
                }
                self.release_driver(&driver_id).await;
                info!(assignment = %req.assignment_id, order = %order_id, "delivery completed");
                Ok(updated)
            }
            "cancel" => {
                let updated = self
                    .assignments
                    .set_status(&req.assignment_id, AssignmentStatus::Cancelled)
                    .await?;
                // back to the dispatch pool
                if let Err(e) = self.orders.update_status(&order_id, OrderStatus::Ready).await {
                    warn!(order = %order_id, error = %e, "order not returned to ready on cancel");
                }
                self.release_driver(&driver_id).await;
                info!(assignment = %req.assignment_id, order = %order_id, "assignment cancelled");
                Ok(updated)
            }
            other => Err(AppError::invalid(format!(
                "Unsupported action '{}', expected 'accept', 'complete' or 'cancel'",
                other
            ))),
        }
    }

    /// Assignment list with denormalized order and driver context
    ///
    /// Rows whose order or driver lookup fails still appear, with the missing
    /// side nulled out.
    pub async fn list(
        &self,
        user: &CurrentUser,
        filter: AssignmentFilter,
    ) -> AppResult<Vec<AssignmentView>> {
        if !user.is_admin() && !user.is_driver() {
            return Err(AppError::forbidden("Driver or administrator role required"));
        }

        let assignments = self.assignments.find_filtered(filter).await?;
        let mut views = Vec::with_capacity(assignments.len());
        for assignment in assignments {
            let order_id = assignment.order.key().to_string();
            let driver_id = assignment.driver.key().to_string();

            let order = self.orders.find_by_id(&order_id).await.ok().flatten();
            let driver = self.drivers.find_by_id(&driver_id).await.ok().flatten();

            views.push(AssignmentView {
                assignment_id: assignment
                    .id
                    .as_ref()
                    .map(|id| id.key().to_string())
                    .unwrap_or_default(),
                status: assignment.status,
                order_id,
                order_status: order.as_ref().map(|o| o.status),
                order_total: order.as_ref().map(|o| o.total),
                customer_info: order.and_then(|o| parse_blob(o.customer_info)),
                driver_id,
                driver_name: driver.map(|d| d.name),
                start_location: parse_blob(assignment.start_location),
                delivery_location: parse_blob(assignment.delivery_location),
                assigned_at: assignment.assigned_at,
                accepted_at: assignment.accepted_at,
                completed_at: assignment.completed_at,
                cancelled_at: assignment.cancelled_at,
            });
        }
        Ok(views)
    }

    async fn release_driver(&self, driver_id: &str) {
        if let Err(e) = self.drivers.release(driver_id).await {
            warn!(driver = %driver_id, error = %e, "failed to release driver");
        }
    }

    /// Undo a dispatch claim by putting the order back in its pre-claim state
    async fn restore_order_status(&self, order_id: &str, status: OrderStatus) {
        if let Err(e) = self.orders.update_status(order_id, status).await {
            warn!(order = %order_id, error = %e, "failed to restore order status after rollback");
        }
    }
}

/// Legacy rows sometimes store location/contact blobs as JSON strings;
/// unparseable ones become null rather than failing the list
fn parse_blob(value: Option<serde_json::Value>) -> Option<serde_json::Value> {
    match value? {
        serde_json::Value::String(s) => serde_json::from_str(&s).ok(),
        serde_json::Value::Null => None,
        other => Some(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn blob_parsing_tolerates_strings_and_garbage() {
        assert_eq!(
            parse_blob(Some(json!({"lat": 1.0}))),
            Some(json!({"lat": 1.0}))
        );
        assert_eq!(
            parse_blob(Some(json!(r#"{"lat": 1.0}"#))),
            Some(json!({"lat": 1.0}))
        );
        assert_eq!(parse_blob(Some(json!("not json"))), None);
        assert_eq!(parse_blob(Some(serde_json::Value::Null)), None);
        assert_eq!(parse_blob(None), None);
    }
}

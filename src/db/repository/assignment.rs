//! Delivery Assignment Repository

use super::{BaseRepository, RepoError, RepoResult, record_id};
use crate::db::models::{AssignmentStatus, DeliveryAssignment};
use crate::utils::time::now_rfc3339;
use surrealdb::engine::local::Db;
use surrealdb::{RecordId, Surreal};

const TABLE: &str = "delivery_assignment";

/// Optional filters for the assignment list view
#[derive(Debug, Default, Clone)]
pub struct AssignmentFilter {
    pub status: Option<AssignmentStatus>,
    pub driver_id: Option<String>,
    pub order_id: Option<String>,
}

#[derive(Clone)]
pub struct AssignmentRepository {
    base: BaseRepository,
}

impl AssignmentRepository {
    pub fn new(db: Surreal<Db>) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }

    /// Insert a new assignment row
    pub async fn create(&self, assignment: DeliveryAssignment) -> RepoResult<DeliveryAssignment> {
        let created: Option<DeliveryAssignment> =
            self.base.db().create(TABLE).content(assignment).await?;
        created.ok_or_else(|| RepoError::Database("Failed to create assignment".to_string()))
    }

    /// Find assignment by id
    pub async fn find_by_id(&self, id: &str) -> RepoResult<Option<DeliveryAssignment>> {
        let rid = record_id(TABLE, id)?;
        let assignment: Option<DeliveryAssignment> = self.base.db().select(rid).await?;
        Ok(assignment)
    }

    /// The non-terminal assignment for an order, if one exists
    ///
    /// `order` is a reserved word in SurrealQL, so the field must be escaped
    /// in expression position.
    pub async fn find_active_for_order(
        &self,
        order: &RecordId,
    ) -> RepoResult<Option<DeliveryAssignment>> {
        let assignments: Vec<DeliveryAssignment> = self
            .base
            .db()
            .query(
                "SELECT * FROM delivery_assignment \
                 WHERE `order` = $order AND status IN [$pending, $accepted] LIMIT 1",
            )
            .bind(("order", order.clone()))
            .bind(("pending", AssignmentStatus::Pending))
            .bind(("accepted", AssignmentStatus::Accepted))
            .await?
            .take(0)?;
        Ok(assignments.into_iter().next())
    }

    /// List assignments newest first with optional filters
    pub async fn find_filtered(
        &self,
        filter: AssignmentFilter,
    ) -> RepoResult<Vec<DeliveryAssignment>> {
        let mut conditions: Vec<&str> = Vec::new();
        if filter.status.is_some() {
            conditions.push("status = $status");
        }
        if filter.driver_id.is_some() {
            conditions.push("driver = $driver");
        }
        if filter.order_id.is_some() {
            conditions.push("`order` = $order");
        }
        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", conditions.join(" AND "))
        };
        let query_str = format!(
            "SELECT * FROM delivery_assignment{} ORDER BY assigned_at DESC",
            where_clause
        );

        let mut query = self.base.db().query(query_str);
        if let Some(s) = filter.status {
            query = query.bind(("status", s));
        }
        if let Some(d) = filter.driver_id {
            query = query.bind(("driver", record_id("delivery_driver", &d)?));
        }
        if let Some(o) = filter.order_id {
            query = query.bind(("order", record_id("order", &o)?));
        }

        let assignments: Vec<DeliveryAssignment> = query.await?.take(0)?;
        Ok(assignments)
    }

    /// Set assignment status and stamp the matching timestamp field
    pub async fn set_status(
        &self,
        id: &str,
        status: AssignmentStatus,
    ) -> RepoResult<DeliveryAssignment> {
        let rid = record_id(TABLE, id)?;
        let stamp_field = match status {
            AssignmentStatus::Pending => None,
            AssignmentStatus::Accepted => Some("accepted_at"),
            AssignmentStatus::Completed => Some("completed_at"),
            AssignmentStatus::Cancelled => Some("cancelled_at"),
        };
        let query_str = match stamp_field {
            Some(field) => format!("UPDATE $id SET status = $status, {} = $now RETURN AFTER", field),
            None => "UPDATE $id SET status = $status RETURN AFTER".to_string(),
        };

        let mut result = self
            .base
            .db()
            .query(query_str)
            .bind(("id", rid))
            .bind(("status", status))
            .bind(("now", now_rfc3339()))
            .await?;
        let assignments: Vec<DeliveryAssignment> = result.take(0)?;
        assignments
            .into_iter()
            .next()
            .ok_or_else(|| RepoError::NotFound(format!("Assignment {} not found", id)))
    }
}

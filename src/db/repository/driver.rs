//! Delivery Driver Repository
//!
//! The availability claim is a conditional UPDATE: two concurrent claims for
//! the same driver resolve to exactly one winner.

use super::{BaseRepository, RepoError, RepoResult, record_id};
use crate::db::models::{DeliveryDriver, DriverCreate, DriverUpdate, GeoPoint};
use crate::utils::time::now_rfc3339;
use surrealdb::engine::local::Db;
use surrealdb::{RecordId, Surreal};

const TABLE: &str = "delivery_driver";

#[derive(Clone)]
pub struct DriverRepository {
    base: BaseRepository,
}

impl DriverRepository {
    pub fn new(db: Surreal<Db>) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }

    /// Find all active drivers, optionally only the assignable ones
    pub async fn find_all(&self, available_only: bool) -> RepoResult<Vec<DeliveryDriver>> {
        let query_str = if available_only {
            "SELECT * FROM delivery_driver WHERE is_active = true AND is_available = true ORDER BY name"
        } else {
            "SELECT * FROM delivery_driver WHERE is_active = true ORDER BY name"
        };
        let drivers: Vec<DeliveryDriver> = self.base.db().query(query_str).await?.take(0)?;
        Ok(drivers)
    }

    /// Find driver by id
    pub async fn find_by_id(&self, id: &str) -> RepoResult<Option<DeliveryDriver>> {
        let rid = record_id(TABLE, id)?;
        let driver: Option<DeliveryDriver> = self.base.db().select(rid).await?;
        Ok(driver)
    }

    /// Register a new driver
    pub async fn create(&self, data: DriverCreate) -> RepoResult<DeliveryDriver> {
        let now = now_rfc3339();
        let driver = DeliveryDriver {
            id: None,
            user_id: data.user_id,
            name: data.name,
            phone: data.phone,
            is_active: true,
            is_available: true,
            current_order: None,
            current_location: None,
            created_at: Some(now.clone()),
            updated_at: Some(now),
        };
        let created: Option<DeliveryDriver> = self.base.db().create(TABLE).content(driver).await?;
        created.ok_or_else(|| RepoError::Database("Failed to create driver".to_string()))
    }

    /// Update driver fields (admin edits and driver location updates)
    pub async fn update(&self, id: &str, data: DriverUpdate) -> RepoResult<DeliveryDriver> {
        let rid = record_id(TABLE, id)?;
        let existing = self
            .find_by_id(id)
            .await?
            .ok_or_else(|| RepoError::NotFound(format!("Driver {} not found", id)))?;

        let name = data.name.unwrap_or(existing.name);
        let phone = data.phone.or(existing.phone);
        let is_active = data.is_active.unwrap_or(existing.is_active);
        let current_location = data.current_location.or(existing.current_location);

        let mut result = self
            .base
            .db()
            .query(
                "UPDATE $id SET name = $name, phone = $phone, is_active = $is_active, \
                 current_location = $location, updated_at = $now RETURN AFTER",
            )
            .bind(("id", rid))
            .bind(("name", name))
            .bind(("phone", phone))
            .bind(("is_active", is_active))
            .bind(("location", current_location))
            .bind(("now", now_rfc3339()))
            .await?;
        let drivers: Vec<DeliveryDriver> = result.take(0)?;
        drivers
            .into_iter()
            .next()
            .ok_or_else(|| RepoError::NotFound(format!("Driver {} not found", id)))
    }

    /// Update only the driver's location (driver self-service)
    pub async fn update_location(&self, id: &str, location: GeoPoint) -> RepoResult<()> {
        let rid = record_id(TABLE, id)?;
        self.base
            .db()
            .query("UPDATE $id SET current_location = $location, updated_at = $now")
            .bind(("id", rid))
            .bind(("location", location))
            .bind(("now", now_rfc3339()))
            .await?;
        Ok(())
    }

    /// Claim the driver for an order (compare-and-swap on availability)
    ///
    /// Returns the updated driver, or `None` when the driver was not
    /// available (already claimed, inactive, or missing).
    pub async fn claim(
        &self,
        id: &str,
        order: RecordId,
    ) -> RepoResult<Option<DeliveryDriver>> {
        let rid = record_id(TABLE, id)?;
        let mut result = self
            .base
            .db()
            .query(
                "UPDATE $id SET is_available = false, current_order = $order, updated_at = $now \
                 WHERE is_available = true AND is_active = true RETURN AFTER",
            )
            .bind(("id", rid))
            .bind(("order", order))
            .bind(("now", now_rfc3339()))
            .await?;
        let drivers: Vec<DeliveryDriver> = result.take(0)?;
        Ok(drivers.into_iter().next())
    }

    /// Free the driver (assignment completed or cancelled)
    pub async fn release(&self, id: &str) -> RepoResult<()> {
        let rid = record_id(TABLE, id)?;
        self.base
            .db()
            .query(
                "UPDATE $id SET is_available = true, current_order = NONE, updated_at = $now",
            )
            .bind(("id", rid))
            .bind(("now", now_rfc3339()))
            .await?;
        Ok(())
    }
}

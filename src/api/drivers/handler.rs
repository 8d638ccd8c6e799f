//! Driver API Handlers

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;
use validator::Validate;

use crate::auth::CurrentUser;
use crate::core::ServerState;
use crate::db::models::{DeliveryDriver, DriverCreate, DriverUpdate, GeoPoint};
use crate::db::repository::DriverRepository;
use crate::utils::error::{AppError, AppResponse, ok, ok_with_message};
use crate::utils::result::AppResult;

#[derive(Debug, Deserialize)]
pub struct DriverListQuery {
    /// Only drivers currently assignable
    #[serde(default)]
    pub available: bool,
}

/// GET /api/drivers (admin)
pub async fn list(
    State(state): State<ServerState>,
    user: CurrentUser,
    Query(query): Query<DriverListQuery>,
) -> AppResult<Json<AppResponse<Vec<DeliveryDriver>>>> {
    user.require_admin()?;
    let repo = DriverRepository::new(state.db.clone());
    let drivers = repo.find_all(query.available).await?;
    Ok(ok(drivers))
}

/// POST /api/drivers - register a driver (admin)
pub async fn create(
    State(state): State<ServerState>,
    user: CurrentUser,
    Json(payload): Json<DriverCreate>,
) -> AppResult<Json<AppResponse<DeliveryDriver>>> {
    user.require_admin()?;
    payload.validate()?;
    let repo = DriverRepository::new(state.db.clone());
    let driver = repo.create(payload).await?;
    Ok(ok(driver))
}

/// PATCH /api/drivers/{id} (admin)
pub async fn update(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(id): Path<String>,
    Json(payload): Json<DriverUpdate>,
) -> AppResult<Json<AppResponse<DeliveryDriver>>> {
    user.require_admin()?;
    let repo = DriverRepository::new(state.db.clone());
    let driver = repo.update(&id, payload).await?;
    Ok(ok(driver))
}

/// PUT /api/drivers/{id}/location - position ping (the driver, or admin)
pub async fn update_location(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(id): Path<String>,
    Json(location): Json<GeoPoint>,
) -> AppResult<Json<AppResponse<()>>> {
    let repo = DriverRepository::new(state.db.clone());
    if !user.is_admin() {
        let driver = repo
            .find_by_id(&id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Driver {} not found", id)))?;
        if driver.user_id.as_deref() != Some(user.id.as_str()) {
            return Err(AppError::forbidden("Not your driver profile"));
        }
    }
    repo.update_location(&id, location).await?;
    Ok(ok_with_message((), "Location updated"))
}

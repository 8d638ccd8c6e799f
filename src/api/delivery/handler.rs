//! Delivery API Handlers

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;

use crate::auth::CurrentUser;
use crate::core::ServerState;
use crate::db::models::{
    AssignmentCreate, AssignmentStatus, AssignmentTransition, AssignmentView, DeliveryAssignment,
};
use crate::db::repository::AssignmentFilter;
use crate::utils::error::{AppError, AppResponse, ok};
use crate::utils::result::AppResult;

/// POST /api/delivery/assignments - assign a driver to an order (admin)
pub async fn assign(
    State(state): State<ServerState>,
    user: CurrentUser,
    Json(payload): Json<AssignmentCreate>,
) -> AppResult<Json<AppResponse<DeliveryAssignment>>> {
    let assignment = state.dispatcher().assign(&user, payload).await?;
    Ok(ok(assignment))
}

#[derive(Debug, Deserialize)]
pub struct AssignmentListQuery {
    pub status: Option<String>,
    pub driver_id: Option<String>,
    pub order_id: Option<String>,
}

/// GET /api/delivery/assignments - denormalized list (admin or driver)
pub async fn list(
    State(state): State<ServerState>,
    user: CurrentUser,
    Query(query): Query<AssignmentListQuery>,
) -> AppResult<Json<AppResponse<Vec<AssignmentView>>>> {
    let status = match query.status.as_deref() {
        Some(raw) => Some(parse_status(raw)?),
        None => None,
    };
    let filter = AssignmentFilter {
        status,
        driver_id: query.driver_id,
        order_id: query.order_id,
    };
    let views = state.dispatcher().list(&user, filter).await?;
    Ok(ok(views))
}

#[derive(Debug, Deserialize)]
pub struct TransitionRequest {
    /// "accept", "complete" or "cancel"
    pub action: String,
}

/// PATCH /api/delivery/assignments/{id} - lifecycle action
pub async fn transition(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(id): Path<String>,
    Json(payload): Json<TransitionRequest>,
) -> AppResult<Json<AppResponse<DeliveryAssignment>>> {
    let assignment = state
        .dispatcher()
        .transition(
            &user,
            AssignmentTransition {
                assignment_id: id,
                action: payload.action,
            },
        )
        .await?;
    Ok(ok(assignment))
}

fn parse_status(raw: &str) -> AppResult<AssignmentStatus> {
    serde_json::from_value(serde_json::Value::String(raw.to_string()))
        .map_err(|_| AppError::invalid(format!("Unknown assignment status '{}'", raw)))
}

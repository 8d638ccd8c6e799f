//! Order API Handlers

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;

use crate::auth::CurrentUser;
use crate::core::ServerState;
use crate::db::models::{Order, OrderCreate, OrderReceipt, OrderStatusUpdate};
use crate::utils::error::{AppResponse, ok, ok_with_message};
use crate::utils::result::AppResult;

#[derive(Debug, Deserialize)]
pub struct OrderListQuery {
    pub status: Option<String>,
    /// Restrict to the caller's own orders even for staff
    #[serde(default)]
    pub mine: bool,
    pub limit: Option<i64>,
}

/// POST /api/orders - checkout (or merge into an open table)
pub async fn create(
    State(state): State<ServerState>,
    user: CurrentUser,
    Json(payload): Json<OrderCreate>,
) -> AppResult<Json<AppResponse<OrderReceipt>>> {
    let receipt = state.order_store().create_order(&user, payload).await?;
    Ok(ok(receipt))
}

/// GET /api/orders - list orders (non-staff callers see only their own)
pub async fn list(
    State(state): State<ServerState>,
    user: CurrentUser,
    Query(query): Query<OrderListQuery>,
) -> AppResult<Json<AppResponse<Vec<Order>>>> {
    let orders = state
        .order_store()
        .list_orders(
            &user,
            query.status.as_deref(),
            query.mine,
            query.limit.unwrap_or(100),
        )
        .await?;
    Ok(ok(orders))
}

/// GET /api/orders/{id}
pub async fn get_by_id(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> AppResult<Json<AppResponse<Order>>> {
    let order = state.order_store().get_order(&user, &id).await?;
    Ok(ok(order))
}

/// PATCH /api/orders/{id}/status - lifecycle transition
pub async fn update_status(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(id): Path<String>,
    Json(payload): Json<OrderStatusUpdate>,
) -> AppResult<Json<AppResponse<Order>>> {
    let order = state
        .order_store()
        .update_status(&user, &id, &payload.status)
        .await?;
    Ok(ok(order))
}

/// DELETE /api/orders/{id} (admin, cancelled orders only)
pub async fn delete(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> AppResult<Json<AppResponse<()>>> {
    state.order_store().delete_order(&user, &id).await?;
    Ok(ok_with_message((), format!("Order {} deleted", id)))
}

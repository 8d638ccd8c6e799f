//! Stock API Handlers
//!
//! Admin surface for the inventory ledger and the reconciliation engine.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;

use crate::auth::CurrentUser;
use crate::core::ServerState;
use crate::db::models::{StockChange, StockChangeType};
use crate::db::repository::{ProductRepository, StockChangeRepository};
use crate::inventory::ReconcileReport;
use crate::inventory::ledger::StockMovement;
use crate::utils::error::{AppError, AppResponse, ok};
use crate::utils::result::AppResult;

#[derive(Debug, Deserialize)]
pub struct ForceUpdateRequest {
    /// When set, only this order is applied to stock
    pub order_id: Option<String>,
    /// Recompute every counter from the configured baseline
    #[serde(default)]
    pub reset_to_baseline: bool,
}

/// POST /api/stock/force-update (admin)
///
/// Full recompute, or a single-order recompute when `order_id` is given.
pub async fn force_update(
    State(state): State<ServerState>,
    user: CurrentUser,
    Json(payload): Json<ForceUpdateRequest>,
) -> AppResult<Json<AppResponse<ReconcileReport>>> {
    user.require_admin()?;
    let reconciler = state.reconciler();
    let report = match payload.order_id {
        Some(order_id) => reconciler.recompute_for_order(&order_id).await?,
        None => reconciler.recompute_all(payload.reset_to_baseline).await?,
    };
    Ok(ok(report))
}

/// POST /api/stock/process-pending-orders (admin)
pub async fn process_pending(
    State(state): State<ServerState>,
    user: CurrentUser,
) -> AppResult<Json<AppResponse<ReconcileReport>>> {
    user.require_admin()?;
    let report = state.reconciler().process_pending().await?;
    Ok(ok(report))
}

#[derive(Debug, Deserialize)]
pub struct SetStockRequest {
    pub stock: i64,
    pub note: Option<String>,
}

/// PATCH /api/stock/{product_id} - manual counter overwrite (admin)
pub async fn set_stock(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(product_id): Path<String>,
    Json(payload): Json<SetStockRequest>,
) -> AppResult<Json<AppResponse<StockMovement>>> {
    user.require_admin()?;
    if payload.stock < 0 {
        return Err(AppError::validation("stock cannot be negative"));
    }

    let repo = ProductRepository::new(state.db.clone());
    let product = repo
        .find_by_id(&product_id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Product {} not found", product_id)))?;

    let movement = state
        .ledger()
        .overwrite(&product, payload.stock, StockChangeType::Manual, payload.note)
        .await?;
    Ok(ok(movement))
}

#[derive(Debug, Deserialize)]
pub struct ChangesQuery {
    pub product_id: Option<String>,
    pub limit: Option<i64>,
}

/// GET /api/stock/changes - audit trail, newest first (admin)
pub async fn changes(
    State(state): State<ServerState>,
    user: CurrentUser,
    Query(query): Query<ChangesQuery>,
) -> AppResult<Json<AppResponse<Vec<StockChange>>>> {
    user.require_admin()?;
    let repo = StockChangeRepository::new(state.db.clone());
    let changes = repo
        .find_recent(query.product_id, query.limit.unwrap_or(100))
        .await?;
    Ok(ok(changes))
}

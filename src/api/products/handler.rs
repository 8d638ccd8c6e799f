//! Product API Handlers

use axum::{
    Json,
    extract::{Path, State},
};
use serde::Deserialize;
use validator::Validate;

use crate::auth::CurrentUser;
use crate::core::ServerState;
use crate::db::models::{Product, ProductCreate, ProductUpdate};
use crate::db::repository::ProductRepository;
use crate::utils::error::{AppError, AppResponse, ok, ok_with_message};
use crate::utils::result::AppResult;

/// GET /api/products - available products (the public menu)
pub async fn list(State(state): State<ServerState>) -> AppResult<Json<AppResponse<Vec<Product>>>> {
    let repo = ProductRepository::new(state.db.clone());
    let products = repo.find_available().await?;
    Ok(ok(products))
}

/// GET /api/products/all - full catalog including hidden products (admin)
pub async fn list_all(
    State(state): State<ServerState>,
    user: CurrentUser,
) -> AppResult<Json<AppResponse<Vec<Product>>>> {
    user.require_admin()?;
    let repo = ProductRepository::new(state.db.clone());
    let products = repo.find_all().await?;
    Ok(ok(products))
}

/// GET /api/products/{id}
pub async fn get_by_id(
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> AppResult<Json<AppResponse<Product>>> {
    let repo = ProductRepository::new(state.db.clone());
    let product = repo
        .find_by_id(&id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Product {} not found", id)))?;
    Ok(ok(product))
}

/// POST /api/products (admin)
pub async fn create(
    State(state): State<ServerState>,
    user: CurrentUser,
    Json(payload): Json<ProductCreate>,
) -> AppResult<Json<AppResponse<Product>>> {
    user.require_admin()?;
    payload.validate()?;
    let repo = ProductRepository::new(state.db.clone());
    let product = repo.create(payload).await?;
    Ok(ok(product))
}

/// PATCH /api/products/{id} (admin; stock is not editable here)
pub async fn update(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(id): Path<String>,
    Json(payload): Json<ProductUpdate>,
) -> AppResult<Json<AppResponse<Product>>> {
    user.require_admin()?;
    let repo = ProductRepository::new(state.db.clone());
    let product = repo.update(&id, payload).await?;
    Ok(ok(product))
}

#[derive(Debug, Deserialize)]
pub struct AvailabilityUpdate {
    pub is_available: bool,
}

/// PATCH /api/products/{id}/availability (admin)
pub async fn set_availability(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(id): Path<String>,
    Json(payload): Json<AvailabilityUpdate>,
) -> AppResult<Json<AppResponse<Product>>> {
    user.require_admin()?;
    let repo = ProductRepository::new(state.db.clone());
    let product = repo
        .update(
            &id,
            ProductUpdate {
                name: None,
                price: None,
                category: None,
                is_available: Some(payload.is_available),
                is_featured: None,
            },
        )
        .await?;
    Ok(ok(product))
}

/// DELETE /api/products/{id} (admin)
pub async fn delete(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> AppResult<Json<AppResponse<()>>> {
    user.require_admin()?;
    let repo = ProductRepository::new(state.db.clone());
    repo.delete(&id).await?;
    Ok(ok_with_message((), format!("Product {} deleted", id)))
}

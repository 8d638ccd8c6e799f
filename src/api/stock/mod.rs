//! Stock API module

mod handler;

use axum::{
    Router,
    routing::{get, patch, post},
};

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/stock", stock_routes())
}

fn stock_routes() -> Router<ServerState> {
    Router::new()
        .route("/force-update", post(handler::force_update))
        .route("/process-pending-orders", post(handler::process_pending))
        .route("/changes", get(handler::changes))
        .route("/{product_id}", patch(handler::set_stock))
}

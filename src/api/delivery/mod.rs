//! Delivery API module

mod handler;

use axum::{
    Router,
    routing::{get, patch},
};

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/delivery", delivery_routes())
}

fn delivery_routes() -> Router<ServerState> {
    Router::new()
        .route(
            "/assignments",
            get(handler::list).post(handler::assign),
        )
        .route("/assignments/{id}", patch(handler::transition))
}

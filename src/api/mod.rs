//! HTTP API
//!
//! One module per resource, each exposing a `router()` merged here.

pub mod delivery;
pub mod drivers;
pub mod health;
pub mod orders;
pub mod products;
pub mod stock;

use crate::core::ServerState;
use axum::Router;

pub fn router(state: ServerState) -> Router {
    Router::new()
        .merge(health::router())
        .merge(products::router())
        .merge(orders::router())
        .merge(stock::router())
        .merge(drivers::router())
        .merge(delivery::router())
        .with_state(state)
}

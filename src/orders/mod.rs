//! Orders: checkout, status lifecycle, line-item normalization

pub mod items;
pub mod money;
pub mod store;

pub use store::OrderStore;

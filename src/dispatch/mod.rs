//! Dispatch: driver assignment lifecycle

pub mod dispatcher;

pub use dispatcher::DeliveryDispatcher;

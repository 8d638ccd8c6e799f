//! Database Models
//!
//! Entity structs and API payload types for the five persisted tables:
//! `product`, `order`, `delivery_driver`, `delivery_assignment`,
//! `stock_change`.

pub mod assignment;
pub mod driver;
pub mod order;
pub mod product;
pub mod serde_helpers;
pub mod stock_change;

pub use assignment::{
    AssignmentCreate, AssignmentStatus, AssignmentTransition, AssignmentView, DeliveryAssignment,
};
pub use driver::{DeliveryDriver, DriverCreate, DriverUpdate, GeoPoint};
pub use order::{
    CheckoutItem, Order, OrderCreate, OrderItem, OrderReceipt, OrderStatus, OrderStatusUpdate,
    PaymentStatus,
};
pub use product::{Product, ProductCreate, ProductUpdate};
pub use stock_change::{StockChange, StockChangeType};

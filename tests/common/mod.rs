//! Shared helpers for integration tests
#![allow(dead_code)]

use comanda_server::CurrentUser;
use comanda_server::db::DbService;
use comanda_server::db::models::{
    Order, OrderStatus, PaymentStatus, Product, ProductCreate,
};
use comanda_server::db::repository::ProductRepository;
use surrealdb::Surreal;
use surrealdb::engine::local::Db;

pub async fn mem_db() -> Surreal<Db> {
    DbService::memory().await.expect("in-memory database").db
}

pub fn admin() -> CurrentUser {
    CurrentUser {
        id: "user-admin".to_string(),
        username: "admin".to_string(),
        role: "admin".to_string(),
    }
}

pub fn customer(id: &str) -> CurrentUser {
    CurrentUser {
        id: id.to_string(),
        username: format!("customer-{id}"),
        role: "customer".to_string(),
    }
}

pub fn waiter() -> CurrentUser {
    CurrentUser {
        id: "user-waiter".to_string(),
        username: "maria".to_string(),
        role: "waiter".to_string(),
    }
}

pub async fn seed_product(db: &Surreal<Db>, name: &str, price: f64, stock: i64) -> Product {
    ProductRepository::new(db.clone())
        .create(ProductCreate {
            name: name.to_string(),
            price,
            stock: Some(stock),
            category: None,
            is_available: Some(true),
            is_featured: None,
        })
        .await
        .expect("seed product")
}

pub fn product_key(product: &Product) -> String {
    product.id.as_ref().expect("product id").key().to_string()
}

/// Bare order row for tests that bypass checkout (legacy/imported data)
pub fn order_row(items: serde_json::Value, status: OrderStatus, total: f64) -> Order {
    Order {
        id: None,
        user_id: Some("user-legacy".to_string()),
        items,
        total,
        status,
        payment_status: PaymentStatus::Pending,
        payment_method: None,
        customer_info: None,
        delivery_address: None,
        is_delivery: false,
        table_name: None,
        notes: None,
        stock_processed: false,
        created_at: Some("2026-01-01T00:00:00.000Z".to_string()),
        updated_at: None,
        delivered_at: None,
    }
}

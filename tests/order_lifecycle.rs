//! Checkout and order lifecycle integration tests

mod common;

use comanda_server::db::models::{CheckoutItem, OrderCreate, OrderStatus, StockChangeType};
use comanda_server::db::repository::{OrderRepository, ProductRepository, StockChangeRepository};
use comanda_server::{AppError, OrderStore, StockLedger, StockPolicy};
use common::{admin, customer, mem_db, order_row, product_key, seed_product, waiter};

fn checkout(items: Vec<(String, i64)>) -> OrderCreate {
    OrderCreate {
        items: items
            .into_iter()
            .map(|(product_id, quantity)| CheckoutItem {
                product_id,
                quantity,
            })
            .collect(),
        customer_info: None,
        delivery_address: None,
        is_delivery: false,
        payment_method: Some("cash".to_string()),
        notes: None,
        is_waiter_order: false,
        table_name: None,
    }
}

#[tokio::test]
async fn checkout_decrements_stock_and_records_audit() {
    let db = mem_db().await;
    let burger = seed_product(&db, "Burger", 12.0, 20).await;
    let store = OrderStore::new(db.clone(), StockPolicy::Clamp);

    let receipt = store
        .create_order(&customer("c1"), checkout(vec![(product_key(&burger), 5)]))
        .await
        .expect("checkout");

    assert_eq!(receipt.total, 60.0);
    assert_eq!(receipt.status, OrderStatus::Pending);
    assert!(!receipt.merged);

    let after = ProductRepository::new(db.clone())
        .find_by_id(&product_key(&burger))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(after.stock, 15);

    let changes = StockChangeRepository::new(db.clone())
        .find_recent(Some(product_key(&burger)), 10)
        .await
        .unwrap();
    assert_eq!(changes.len(), 1);
    assert_eq!(changes[0].change_type, StockChangeType::Order);
    assert_eq!(changes[0].previous_stock, 20);
    assert_eq!(changes[0].new_stock, 15);
    assert_eq!(changes[0].reference.as_deref(), Some(receipt.order_id.as_str()));

    let order = store
        .get_order(&customer("c1"), &receipt.order_id)
        .await
        .unwrap();
    assert!(order.stock_processed);
}

#[tokio::test]
async fn checkout_fails_whole_order_when_one_line_is_short() {
    let db = mem_db().await;
    let burger = seed_product(&db, "Burger", 12.0, 20).await;
    let flan = seed_product(&db, "Flan", 4.0, 2).await;
    let store = OrderStore::new(db.clone(), StockPolicy::Clamp);

    let err = store
        .create_order(
            &customer("c1"),
            checkout(vec![(product_key(&burger), 3), (product_key(&flan), 5)]),
        )
        .await
        .expect_err("insufficient stock must fail checkout");
    assert!(matches!(err, AppError::InsufficientStock(_)), "{err:?}");

    // nothing was written
    let products = ProductRepository::new(db.clone());
    assert_eq!(products.find_by_id(&product_key(&burger)).await.unwrap().unwrap().stock, 20);
    assert_eq!(products.find_by_id(&product_key(&flan)).await.unwrap().unwrap().stock, 2);
    let orders = store.list_orders(&admin(), None, false, 100).await.unwrap();
    assert!(orders.is_empty());
}

#[tokio::test]
async fn unknown_and_unavailable_products_are_rejected() {
    let db = mem_db().await;
    let store = OrderStore::new(db.clone(), StockPolicy::Clamp);

    let err = store
        .create_order(&customer("c1"), checkout(vec![("nope".to_string(), 1)]))
        .await
        .expect_err("unknown product");
    assert!(matches!(err, AppError::NotFound(_)), "{err:?}");

    let hidden = seed_product(&db, "Secret", 9.0, 10).await;
    ProductRepository::new(db.clone())
        .update(
            &product_key(&hidden),
            comanda_server::db::models::ProductUpdate {
                name: None,
                price: None,
                category: None,
                is_available: Some(false),
                is_featured: None,
            },
        )
        .await
        .unwrap();

    let err = store
        .create_order(&customer("c1"), checkout(vec![(product_key(&hidden), 1)]))
        .await
        .expect_err("unavailable product");
    assert!(matches!(err, AppError::ProductUnavailable(_)), "{err:?}");
}

#[tokio::test]
async fn cancellation_restocks_every_line() {
    let db = mem_db().await;
    let burger = seed_product(&db, "Burger", 12.0, 20).await;
    let store = OrderStore::new(db.clone(), StockPolicy::Clamp);

    let receipt = store
        .create_order(&customer("c1"), checkout(vec![(product_key(&burger), 5)]))
        .await
        .unwrap();
    assert_eq!(
        ProductRepository::new(db.clone())
            .find_by_id(&product_key(&burger))
            .await
            .unwrap()
            .unwrap()
            .stock,
        15
    );

    let cancelled = store
        .update_status(&customer("c1"), &receipt.order_id, "cancelado")
        .await
        .expect("owner cancels with a Spanish alias");
    assert_eq!(cancelled.status, OrderStatus::Cancelled);

    let after = ProductRepository::new(db.clone())
        .find_by_id(&product_key(&burger))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(after.stock, 20);

    let changes = StockChangeRepository::new(db.clone())
        .find_recent(Some(product_key(&burger)), 10)
        .await
        .unwrap();
    assert!(changes
        .iter()
        .any(|c| c.change_type == StockChangeType::Return && c.change_amount == 5));
}

#[tokio::test]
async fn owner_may_only_cancel_their_own_order() {
    let db = mem_db().await;
    let burger = seed_product(&db, "Burger", 12.0, 20).await;
    let store = OrderStore::new(db.clone(), StockPolicy::Clamp);

    let receipt = store
        .create_order(&customer("c1"), checkout(vec![(product_key(&burger), 1)]))
        .await
        .unwrap();

    let err = store
        .update_status(&customer("c1"), &receipt.order_id, "confirmed")
        .await
        .expect_err("owners cannot advance the kitchen chain");
    assert!(matches!(err, AppError::Forbidden(_)), "{err:?}");

    let err = store
        .update_status(&customer("c2"), &receipt.order_id, "cancelled")
        .await
        .expect_err("strangers cannot cancel");
    assert!(matches!(err, AppError::Forbidden(_)), "{err:?}");
}

#[tokio::test]
async fn illegal_transitions_are_rejected() {
    let db = mem_db().await;
    let burger = seed_product(&db, "Burger", 12.0, 20).await;
    let store = OrderStore::new(db.clone(), StockPolicy::Clamp);

    let receipt = store
        .create_order(&customer("c1"), checkout(vec![(product_key(&burger), 1)]))
        .await
        .unwrap();

    let err = store
        .update_status(&admin(), &receipt.order_id, "ready")
        .await
        .expect_err("pending cannot jump to ready");
    assert!(matches!(err, AppError::InvalidStatus(_)), "{err:?}");

    let err = store
        .update_status(&admin(), &receipt.order_id, "definitely_not_a_status")
        .await
        .expect_err("unknown status name");
    assert!(matches!(err, AppError::InvalidStatus(_)), "{err:?}");

    // terminal states are sinks
    store
        .update_status(&admin(), &receipt.order_id, "cancelled")
        .await
        .unwrap();
    let err = store
        .update_status(&admin(), &receipt.order_id, "pending")
        .await
        .expect_err("cancelled is terminal");
    assert!(matches!(err, AppError::InvalidStatus(_)), "{err:?}");
}

#[tokio::test]
async fn waiter_orders_merge_into_the_open_table() {
    let db = mem_db().await;
    let burger = seed_product(&db, "Burger", 12.0, 20).await;
    let flan = seed_product(&db, "Flan", 4.0, 10).await;
    let store = OrderStore::new(db.clone(), StockPolicy::Clamp);

    let mut first = checkout(vec![(product_key(&burger), 2)]);
    first.is_waiter_order = true;
    first.table_name = Some("T1".to_string());
    let opened = store.create_order(&waiter(), first).await.unwrap();
    assert_eq!(opened.status, OrderStatus::OpenTable);
    assert!(!opened.merged);
    assert_eq!(opened.total, 24.0);

    let mut second = checkout(vec![(product_key(&burger), 1), (product_key(&flan), 3)]);
    second.is_waiter_order = true;
    second.table_name = Some("T1".to_string());
    let merged = store.create_order(&waiter(), second).await.unwrap();
    assert!(merged.merged);
    assert_eq!(merged.order_id, opened.order_id);
    assert_eq!(merged.total, 24.0 + 12.0 + 12.0);

    // quantities summed per product on the tab
    let order = store.get_order(&admin(), &opened.order_id).await.unwrap();
    let items = order.items.as_array().expect("structured items");
    assert_eq!(items.len(), 2);
    let burger_line = items
        .iter()
        .find(|i| i["product_id"] == serde_json::json!(product_key(&burger)))
        .unwrap();
    assert_eq!(burger_line["quantity"], serde_json::json!(3));

    // stock reflects both rounds
    let products = ProductRepository::new(db.clone());
    assert_eq!(products.find_by_id(&product_key(&burger)).await.unwrap().unwrap().stock, 17);
    assert_eq!(products.find_by_id(&product_key(&flan)).await.unwrap().unwrap().stock, 7);

    // closing the tab moves it into the normal lifecycle
    let closed = store
        .update_status(&waiter(), &opened.order_id, "pending")
        .await
        .unwrap();
    assert_eq!(closed.status, OrderStatus::Pending);
}

#[tokio::test]
async fn customers_cannot_open_tables_and_lists_are_scoped() {
    let db = mem_db().await;
    let burger = seed_product(&db, "Burger", 12.0, 20).await;
    let store = OrderStore::new(db.clone(), StockPolicy::Clamp);

    let mut req = checkout(vec![(product_key(&burger), 1)]);
    req.is_waiter_order = true;
    req.table_name = Some("T1".to_string());
    let err = store
        .create_order(&customer("c1"), req)
        .await
        .expect_err("customers cannot open tables");
    assert!(matches!(err, AppError::Forbidden(_)), "{err:?}");

    store
        .create_order(&customer("c1"), checkout(vec![(product_key(&burger), 1)]))
        .await
        .unwrap();
    store
        .create_order(&customer("c2"), checkout(vec![(product_key(&burger), 1)]))
        .await
        .unwrap();

    assert_eq!(store.list_orders(&customer("c1"), None, false, 100).await.unwrap().len(), 1);
    assert_eq!(store.list_orders(&admin(), None, false, 100).await.unwrap().len(), 2);
    assert!(store.list_orders(&admin(), None, true, 100).await.unwrap().is_empty());
}

#[tokio::test]
async fn strict_policy_rejects_checkout_racing_past_validation() {
    let db = mem_db().await;
    let burger = seed_product(&db, "Burger", 12.0, 3).await;
    let store = OrderStore::new(db.clone(), StockPolicy::Strict);

    // within recorded stock: fine
    store
        .create_order(&customer("c1"), checkout(vec![(product_key(&burger), 3)]))
        .await
        .unwrap();

    // counter is now 0; the next checkout fails at validation already
    let err = store
        .create_order(&customer("c2"), checkout(vec![(product_key(&burger), 1)]))
        .await
        .expect_err("no stock left");
    assert!(matches!(err, AppError::InsufficientStock(_)), "{err:?}");
}

#[tokio::test]
async fn checkout_works_against_an_on_disk_database() {
    let dir = tempfile::tempdir().expect("tempdir");
    let db = comanda_server::db::DbService::new(&dir.path().join("database"))
        .await
        .expect("on-disk database")
        .db;

    let burger = seed_product(&db, "Burger", 12.0, 20).await;
    let store = OrderStore::new(db.clone(), StockPolicy::Clamp);
    let receipt = store
        .create_order(&customer("c1"), checkout(vec![(product_key(&burger), 2)]))
        .await
        .unwrap();

    assert_eq!(receipt.total, 24.0);
    let after = ProductRepository::new(db.clone())
        .find_by_id(&product_key(&burger))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(after.stock, 18);
}

#[tokio::test]
async fn totals_are_exact_in_cents() {
    let db = mem_db().await;
    let cortado = seed_product(&db, "Cortado", 1.10, 50).await;
    let store = OrderStore::new(db.clone(), StockPolicy::Clamp);

    // 3 * 1.10 accumulates to 3.3000000000000003 in raw f64
    let receipt = store
        .create_order(&customer("c1"), checkout(vec![(product_key(&cortado), 3)]))
        .await
        .unwrap();
    assert_eq!(receipt.total, 3.30);

    let order = store.get_order(&admin(), &receipt.order_id).await.unwrap();
    assert_eq!(order.total, 3.30);
}

#[tokio::test]
async fn clamped_decrement_floors_the_counter_at_zero() {
    let db = mem_db().await;
    let flan = seed_product(&db, "Flan", 4.0, 3).await;
    let ledger = StockLedger::new(db.clone(), StockPolicy::Clamp);

    let moved = ledger
        .decrement(&flan, 10, StockChangeType::Manual, None)
        .await
        .expect("clamp decrements past stock without failing");
    assert_eq!(moved.previous_stock, 3);
    assert_eq!(moved.new_stock, 0);

    let after = ProductRepository::new(db.clone())
        .find_by_id(&product_key(&flan))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(after.stock, 0);
}

#[tokio::test]
async fn legacy_tab_lines_survive_a_merge() {
    let db = mem_db().await;
    let burger = seed_product(&db, "Burger", 12.0, 20).await;
    let store = OrderStore::new(db.clone(), StockPolicy::Clamp);

    // an imported tab carrying a name-only line no catalog entry matches
    let mut tab = order_row(
        serde_json::json!([{"name": "Empanada casera", "quantity": 2, "price": 2.5}]),
        OrderStatus::OpenTable,
        5.0,
    );
    tab.table_name = Some("T9".to_string());
    let tab = OrderRepository::new(db.clone()).create(tab).await.unwrap();
    let tab_id = tab.id.as_ref().unwrap().key().to_string();

    let mut req = checkout(vec![(product_key(&burger), 1)]);
    req.is_waiter_order = true;
    req.table_name = Some("T9".to_string());
    let merged = store.create_order(&waiter(), req).await.unwrap();
    assert!(merged.merged);
    assert_eq!(merged.order_id, tab_id);
    assert_eq!(merged.total, 17.0);

    let order = store.get_order(&admin(), &tab_id).await.unwrap();
    let items = order.items.as_array().expect("structured items");
    assert_eq!(items.len(), 2);
    assert!(
        items.iter().any(|i| i["name"] == serde_json::json!("Empanada casera")
            && i["quantity"] == serde_json::json!(2)),
        "legacy line must survive the merge: {items:?}"
    );
}

#[tokio::test]
async fn repeated_cancellation_never_restocks_twice() {
    let db = mem_db().await;
    let burger = seed_product(&db, "Burger", 12.0, 20).await;
    let store = OrderStore::new(db.clone(), StockPolicy::Clamp);

    let receipt = store
        .create_order(&customer("c1"), checkout(vec![(product_key(&burger), 5)]))
        .await
        .unwrap();
    store
        .update_status(&admin(), &receipt.order_id, "cancelled")
        .await
        .unwrap();

    let err = store
        .update_status(&admin(), &receipt.order_id, "cancelled")
        .await
        .expect_err("cancelled is terminal");
    assert!(matches!(err, AppError::InvalidStatus(_)), "{err:?}");

    // the failed second transition moved no stock
    let after = ProductRepository::new(db.clone())
        .find_by_id(&product_key(&burger))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(after.stock, 20);
    let returns = StockChangeRepository::new(db.clone())
        .find_recent(Some(product_key(&burger)), 10)
        .await
        .unwrap()
        .into_iter()
        .filter(|c| c.change_type == StockChangeType::Return)
        .count();
    assert_eq!(returns, 1);
}

#[tokio::test]
async fn only_cancelled_orders_can_be_deleted_and_only_by_admin() {
    let db = mem_db().await;
    let burger = seed_product(&db, "Burger", 12.0, 20).await;
    let store = OrderStore::new(db.clone(), StockPolicy::Clamp);

    let receipt = store
        .create_order(&customer("c1"), checkout(vec![(product_key(&burger), 1)]))
        .await
        .unwrap();

    let err = store
        .delete_order(&customer("c1"), &receipt.order_id)
        .await
        .expect_err("non-admin delete");
    assert!(matches!(err, AppError::Forbidden(_)), "{err:?}");

    let err = store
        .delete_order(&admin(), &receipt.order_id)
        .await
        .expect_err("live order delete");
    assert!(matches!(err, AppError::Invalid(_)), "{err:?}");

    store
        .update_status(&admin(), &receipt.order_id, "cancelled")
        .await
        .unwrap();
    store.delete_order(&admin(), &receipt.order_id).await.unwrap();
    let err = store
        .get_order(&admin(), &receipt.order_id)
        .await
        .expect_err("order is gone");
    assert!(matches!(err, AppError::NotFound(_)), "{err:?}");
}

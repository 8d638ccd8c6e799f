//! Delivery dispatch integration tests

mod common;

use comanda_server::db::models::{
    AssignmentCreate, AssignmentStatus, AssignmentTransition, DriverCreate, OrderStatus,
};
use comanda_server::db::repository::{AssignmentFilter, DriverRepository, OrderRepository};
use comanda_server::{AppError, DeliveryDispatcher};
use common::{admin, mem_db, order_row};
use serde_json::json;
use surrealdb::Surreal;
use surrealdb::engine::local::Db;

async fn seed_ready_order(db: &Surreal<Db>) -> String {
    let order = OrderRepository::new(db.clone())
        .create(order_row(json!([]), OrderStatus::Ready, 25.0))
        .await
        .unwrap();
    order.id.as_ref().unwrap().key().to_string()
}

async fn seed_driver(db: &Surreal<Db>, name: &str) -> String {
    let driver = DriverRepository::new(db.clone())
        .create(DriverCreate {
            user_id: None,
            name: name.to_string(),
            phone: None,
        })
        .await
        .unwrap();
    driver.id.as_ref().unwrap().key().to_string()
}

fn assign_req(order_id: &str, driver_id: &str) -> AssignmentCreate {
    AssignmentCreate {
        order_id: order_id.to_string(),
        driver_id: driver_id.to_string(),
        delivery_location: Some(json!({"lat": 41.38, "lng": 2.17})),
    }
}

#[tokio::test]
async fn assign_claims_the_driver_and_advances_the_order() {
    let db = mem_db().await;
    let order_id = seed_ready_order(&db).await;
    let driver_id = seed_driver(&db, "Pedro").await;
    let dispatcher = DeliveryDispatcher::new(db.clone());

    let assignment = dispatcher
        .assign(&admin(), assign_req(&order_id, &driver_id))
        .await
        .expect("assignment");
    assert_eq!(assignment.status, AssignmentStatus::Pending);

    let driver = DriverRepository::new(db.clone())
        .find_by_id(&driver_id)
        .await
        .unwrap()
        .unwrap();
    assert!(!driver.is_available);
    assert_eq!(
        driver.current_order.as_ref().map(|o| o.key().to_string()),
        Some(order_id.clone())
    );

    let order = OrderRepository::new(db.clone())
        .find_by_id(&order_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(order.status, OrderStatus::AssignedToDriver);
}

#[tokio::test]
async fn assign_rejects_orders_outside_the_dispatch_window() {
    let db = mem_db().await;
    let driver_id = seed_driver(&db, "Pedro").await;
    let dispatcher = DeliveryDispatcher::new(db.clone());

    let pending = OrderRepository::new(db.clone())
        .create(order_row(json!([]), OrderStatus::Pending, 10.0))
        .await
        .unwrap();
    let pending_id = pending.id.as_ref().unwrap().key().to_string();

    let err = dispatcher
        .assign(&admin(), assign_req(&pending_id, &driver_id))
        .await
        .expect_err("pending orders are not dispatchable");
    assert!(matches!(err, AppError::OrderNotReady(_)), "{err:?}");

    let err = dispatcher
        .assign(&admin(), assign_req("missing", &driver_id))
        .await
        .expect_err("unknown order");
    assert!(matches!(err, AppError::NotFound(_)), "{err:?}");
}

#[tokio::test]
async fn assign_rejects_busy_or_unknown_drivers() {
    let db = mem_db().await;
    let first_order = seed_ready_order(&db).await;
    let second_order = seed_ready_order(&db).await;
    let driver_id = seed_driver(&db, "Pedro").await;
    let dispatcher = DeliveryDispatcher::new(db.clone());

    let err = dispatcher
        .assign(&admin(), assign_req(&first_order, "missing"))
        .await
        .expect_err("unknown driver");
    assert!(matches!(err, AppError::NotFound(_)), "{err:?}");

    dispatcher
        .assign(&admin(), assign_req(&first_order, &driver_id))
        .await
        .unwrap();

    let err = dispatcher
        .assign(&admin(), assign_req(&second_order, &driver_id))
        .await
        .expect_err("driver is already out");
    assert!(matches!(err, AppError::DriverUnavailable(_)), "{err:?}");
}

#[tokio::test]
async fn an_order_gets_at_most_one_live_assignment() {
    let db = mem_db().await;
    let order_id = seed_ready_order(&db).await;
    let first_driver = seed_driver(&db, "Pedro").await;
    let second_driver = seed_driver(&db, "Lucia").await;
    let dispatcher = DeliveryDispatcher::new(db.clone());

    dispatcher
        .assign(&admin(), assign_req(&order_id, &first_driver))
        .await
        .unwrap();

    // put the order back in the window while its assignment stays live
    OrderRepository::new(db.clone())
        .update_status(&order_id, OrderStatus::Ready)
        .await
        .unwrap();

    let err = dispatcher
        .assign(&admin(), assign_req(&order_id, &second_driver))
        .await
        .expect_err("second live assignment");
    assert!(matches!(err, AppError::AlreadyAssigned(_)), "{err:?}");
}

#[tokio::test]
async fn concurrent_assigns_for_one_driver_have_exactly_one_winner() {
    let db = mem_db().await;
    let first_order = seed_ready_order(&db).await;
    let second_order = seed_ready_order(&db).await;
    let driver_id = seed_driver(&db, "Pedro").await;

    let a = {
        let dispatcher = DeliveryDispatcher::new(db.clone());
        let order = first_order.clone();
        let driver = driver_id.clone();
        tokio::spawn(async move { dispatcher.assign(&admin(), assign_req(&order, &driver)).await })
    };
    let b = {
        let dispatcher = DeliveryDispatcher::new(db.clone());
        let order = second_order.clone();
        let driver = driver_id.clone();
        tokio::spawn(async move { dispatcher.assign(&admin(), assign_req(&order, &driver)).await })
    };

    let results = [a.await.unwrap(), b.await.unwrap()];
    let wins = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(wins, 1, "exactly one assignment must win: {results:?}");
    assert!(
        results
            .iter()
            .filter(|r| r.is_err())
            .all(|r| matches!(r, Err(AppError::DriverUnavailable(_)))),
        "{results:?}"
    );
}

#[tokio::test]
async fn concurrent_assigns_for_one_order_have_exactly_one_winner() {
    let db = mem_db().await;
    let order_id = seed_ready_order(&db).await;
    let first_driver = seed_driver(&db, "Pedro").await;
    let second_driver = seed_driver(&db, "Lucia").await;

    let a = {
        let dispatcher = DeliveryDispatcher::new(db.clone());
        let order = order_id.clone();
        let driver = first_driver.clone();
        tokio::spawn(async move { dispatcher.assign(&admin(), assign_req(&order, &driver)).await })
    };
    let b = {
        let dispatcher = DeliveryDispatcher::new(db.clone());
        let order = order_id.clone();
        let driver = second_driver.clone();
        tokio::spawn(async move { dispatcher.assign(&admin(), assign_req(&order, &driver)).await })
    };

    let results = [a.await.unwrap(), b.await.unwrap()];
    let wins = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(wins, 1, "exactly one assignment must win: {results:?}");
    assert!(
        results.iter().filter(|r| r.is_err()).all(|r| matches!(
            r,
            Err(AppError::AlreadyAssigned(_)) | Err(AppError::OrderNotReady(_))
        )),
        "{results:?}"
    );

    // exactly one live assignment row exists and one driver stayed free
    let dispatcher = DeliveryDispatcher::new(db.clone());
    let views = dispatcher
        .list(&admin(), AssignmentFilter::default())
        .await
        .unwrap();
    assert_eq!(views.len(), 1);
    assert_eq!(views[0].status, AssignmentStatus::Pending);

    let drivers = DriverRepository::new(db.clone());
    let mut free = 0;
    for id in [&first_driver, &second_driver] {
        if drivers.find_by_id(id).await.unwrap().unwrap().is_available {
            free += 1;
        }
    }
    assert_eq!(free, 1, "the losing driver must stay available");
}

#[tokio::test]
async fn cancel_frees_the_driver_and_requeues_the_order() {
    let db = mem_db().await;
    let order_id = seed_ready_order(&db).await;
    let driver_id = seed_driver(&db, "Pedro").await;
    let dispatcher = DeliveryDispatcher::new(db.clone());

    let assignment = dispatcher
        .assign(&admin(), assign_req(&order_id, &driver_id))
        .await
        .unwrap();
    let assignment_id = assignment.id.as_ref().unwrap().key().to_string();

    let cancelled = dispatcher
        .transition(
            &admin(),
            AssignmentTransition {
                assignment_id: assignment_id.clone(),
                action: "cancel".to_string(),
            },
        )
        .await
        .unwrap();
    assert_eq!(cancelled.status, AssignmentStatus::Cancelled);
    assert!(cancelled.cancelled_at.is_some());

    let driver = DriverRepository::new(db.clone())
        .find_by_id(&driver_id)
        .await
        .unwrap()
        .unwrap();
    assert!(driver.is_available);
    assert!(driver.current_order.is_none());

    let order = OrderRepository::new(db.clone())
        .find_by_id(&order_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(order.status, OrderStatus::Ready);

    // terminal assignments stay terminal
    let err = dispatcher
        .transition(
            &admin(),
            AssignmentTransition {
                assignment_id,
                action: "complete".to_string(),
            },
        )
        .await
        .expect_err("cancelled assignment cannot complete");
    assert!(matches!(err, AppError::InvalidStatus(_)), "{err:?}");
}

#[tokio::test]
async fn accept_then_complete_delivers_the_order() {
    let db = mem_db().await;
    let order_id = seed_ready_order(&db).await;
    let driver_id = seed_driver(&db, "Pedro").await;
    let dispatcher = DeliveryDispatcher::new(db.clone());

    let assignment = dispatcher
        .assign(&admin(), assign_req(&order_id, &driver_id))
        .await
        .unwrap();
    let assignment_id = assignment.id.as_ref().unwrap().key().to_string();

    let accepted = dispatcher
        .transition(
            &admin(),
            AssignmentTransition {
                assignment_id: assignment_id.clone(),
                action: "accept".to_string(),
            },
        )
        .await
        .unwrap();
    assert_eq!(accepted.status, AssignmentStatus::Accepted);
    assert!(accepted.accepted_at.is_some());

    let completed = dispatcher
        .transition(
            &admin(),
            AssignmentTransition {
                assignment_id,
                action: "complete".to_string(),
            },
        )
        .await
        .unwrap();
    assert_eq!(completed.status, AssignmentStatus::Completed);
    assert!(completed.completed_at.is_some());

    let order = OrderRepository::new(db.clone())
        .find_by_id(&order_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(order.status, OrderStatus::Delivered);
    assert!(order.delivered_at.is_some());

    let driver = DriverRepository::new(db.clone())
        .find_by_id(&driver_id)
        .await
        .unwrap()
        .unwrap();
    assert!(driver.is_available);
}

#[tokio::test]
async fn unsupported_actions_are_rejected() {
    let db = mem_db().await;
    let order_id = seed_ready_order(&db).await;
    let driver_id = seed_driver(&db, "Pedro").await;
    let dispatcher = DeliveryDispatcher::new(db.clone());

    let assignment = dispatcher
        .assign(&admin(), assign_req(&order_id, &driver_id))
        .await
        .unwrap();

    let err = dispatcher
        .transition(
            &admin(),
            AssignmentTransition {
                assignment_id: assignment.id.as_ref().unwrap().key().to_string(),
                action: "teleport".to_string(),
            },
        )
        .await
        .expect_err("unsupported action");
    assert!(matches!(err, AppError::Invalid(_)), "{err:?}");
}

#[tokio::test]
async fn assignment_list_denormalizes_order_and_driver() {
    let db = mem_db().await;
    let order_id = seed_ready_order(&db).await;
    let driver_id = seed_driver(&db, "Pedro").await;
    let dispatcher = DeliveryDispatcher::new(db.clone());

    dispatcher
        .assign(&admin(), assign_req(&order_id, &driver_id))
        .await
        .unwrap();

    let views = dispatcher
        .list(&admin(), AssignmentFilter::default())
        .await
        .unwrap();
    assert_eq!(views.len(), 1);
    let view = &views[0];
    assert_eq!(view.order_id, order_id);
    assert_eq!(view.driver_id, driver_id);
    assert_eq!(view.driver_name.as_deref(), Some("Pedro"));
    assert_eq!(view.order_status, Some(OrderStatus::AssignedToDriver));
    assert_eq!(view.order_total, Some(25.0));
    assert_eq!(view.delivery_location, Some(json!({"lat": 41.38, "lng": 2.17})));
    assert!(view.accepted_at.is_none());

    dispatcher
        .transition(
            &admin(),
            AssignmentTransition {
                assignment_id: view.assignment_id.clone(),
                action: "accept".to_string(),
            },
        )
        .await
        .unwrap();
    let views = dispatcher
        .list(&admin(), AssignmentFilter::default())
        .await
        .unwrap();
    assert!(views[0].accepted_at.is_some());

    let filtered = dispatcher
        .list(
            &admin(),
            AssignmentFilter {
                status: Some(AssignmentStatus::Completed),
                driver_id: None,
                order_id: None,
            },
        )
        .await
        .unwrap();
    assert!(filtered.is_empty());
}

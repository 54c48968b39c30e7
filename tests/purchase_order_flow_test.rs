//! End-to-end purchase-order workflow: batch creation with supplier
//! grouping, the status state machine, and the completion stock receipt.

mod common;

use common::TestApp;
use rust_decimal_macros::dec;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};
use stocktrack_api::{
    entities::{
        purchase_order::PurchaseOrderStatus, stock_transaction, stock_transaction_item,
        user::UserRole,
    },
    errors::ServiceError,
    services::purchase_orders::OrderLineRequest,
};

fn line(product_id: &str, supplier_id: &str, quantity: i32) -> OrderLineRequest {
    OrderLineRequest {
        product_id: product_id.to_string(),
        supplier_id: supplier_id.to_string(),
        quantity,
        unit_price: dec!(4.50),
    }
}

// ==================== Batch creation ====================

#[tokio::test]
async fn one_order_per_supplier_with_contiguous_ids() {
    let app = TestApp::new().await;
    let p1 = app.seed_product("Bolts", 0).await;
    let p2 = app.seed_product("Nuts", 0).await;
    let p3 = app.seed_product("Washers", 0).await;
    let s1 = app.seed_supplier("Acme Hardware").await;
    let s2 = app.seed_supplier("Bolt Bros").await;

    // Three lines across two suppliers, s1 appearing first
    let created = app
        .services
        .purchase_orders
        .create_purchase_orders(
            vec![line(&p1, &s1, 10), line(&p2, &s2, 4), line(&p3, &s1, 2)],
            Some("quarterly restock".to_string()),
            "U001",
        )
        .await
        .unwrap();

    assert_eq!(created.created_count, 2);
    // First-appearance order decides id assignment
    assert_eq!(created.po_ids, vec!["PR0001", "PR0002"]);

    let first = app
        .services
        .purchase_orders
        .get_order("PR0001")
        .await
        .unwrap();
    assert_eq!(first.supplier_id, s1);
    assert_eq!(first.status, "Pending");
    assert_eq!(first.remarks.as_deref(), Some("quarterly restock"));

    let second = app
        .services
        .purchase_orders
        .get_order("PR0002")
        .await
        .unwrap();
    assert_eq!(second.supplier_id, s2);

    let first_items = app
        .services
        .purchase_orders
        .get_order_items("PR0001")
        .await
        .unwrap();
    assert_eq!(first_items.len(), 2);
    let second_items = app
        .services
        .purchase_orders
        .get_order_items("PR0002")
        .await
        .unwrap();
    assert_eq!(second_items.len(), 1);

    // total = unit price * quantity on every line
    for item in first_items.iter().chain(second_items.iter()) {
        assert_eq!(
            item.total_price,
            item.unit_price * rust_decimal::Decimal::from(item.quantity_ordered)
        );
    }
}

#[tokio::test]
async fn id_runs_continue_after_existing_orders() {
    let app = TestApp::new().await;
    let p1 = app.seed_product("Screws", 0).await;
    let s1 = app.seed_supplier("Acme Hardware").await;
    let s2 = app.seed_supplier("Bolt Bros").await;

    app.services
        .purchase_orders
        .create_purchase_orders(vec![line(&p1, &s1, 1)], None, "U001")
        .await
        .unwrap();

    let created = app
        .services
        .purchase_orders
        .create_purchase_orders(vec![line(&p1, &s1, 2), line(&p1, &s2, 3)], None, "U001")
        .await
        .unwrap();

    assert_eq!(created.po_ids, vec!["PR0002", "PR0003"]);
}

#[tokio::test]
async fn empty_batches_are_rejected_without_writes() {
    let app = TestApp::new().await;

    let err = app
        .services
        .purchase_orders
        .create_purchase_orders(vec![], None, "U001")
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::ValidationError(_)));

    let err = app
        .services
        .purchase_orders
        .create_purchase_orders(vec![line("P0001", "S0001", 0)], None, "U001")
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::ValidationError(_)));

    let (orders, total) = app
        .services
        .purchase_orders
        .list_orders(Default::default(), 1, 50)
        .await
        .unwrap();
    assert_eq!(total, 0);
    assert!(orders.is_empty());
}

#[tokio::test]
async fn non_positive_lines_are_dropped_from_mixed_batches() {
    let app = TestApp::new().await;
    let p1 = app.seed_product("Hinges", 0).await;
    let s1 = app.seed_supplier("Acme Hardware").await;

    let created = app
        .services
        .purchase_orders
        .create_purchase_orders(
            vec![line(&p1, &s1, 5), line(&p1, &s1, 0), line(&p1, &s1, -3)],
            None,
            "U001",
        )
        .await
        .unwrap();

    assert_eq!(created.created_count, 1);
    let items = app
        .services
        .purchase_orders
        .get_order_items(&created.po_ids[0])
        .await
        .unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].quantity_ordered, 5);
}

// ==================== Status state machine ====================

#[tokio::test]
async fn pending_orders_cannot_jump_straight_to_completed() {
    let app = TestApp::new().await;
    let p1 = app.seed_product("Clamps", 0).await;
    let s1 = app.seed_supplier("Acme Hardware").await;
    let created = app
        .services
        .purchase_orders
        .create_purchase_orders(vec![line(&p1, &s1, 1)], None, "U001")
        .await
        .unwrap();
    let po_id = &created.po_ids[0];

    let err = app
        .services
        .purchase_orders
        .change_status(po_id, PurchaseOrderStatus::Completed, None, "U001")
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Conflict(_)));

    // The order is untouched
    let order = app.services.purchase_orders.get_order(po_id).await.unwrap();
    assert_eq!(order.status, "Pending");
}

#[tokio::test]
async fn cancelling_requires_real_remarks() {
    let app = TestApp::new().await;
    let p1 = app.seed_product("Rivets", 0).await;
    let s1 = app.seed_supplier("Acme Hardware").await;
    let created = app
        .services
        .purchase_orders
        .create_purchase_orders(vec![line(&p1, &s1, 1)], None, "U001")
        .await
        .unwrap();
    let po_id = &created.po_ids[0];

    for bad_remarks in [None, Some("".to_string()), Some("   ".to_string()), Some("NULL".to_string())] {
        let err = app
            .services
            .purchase_orders
            .change_status(po_id, PurchaseOrderStatus::Cancelled, bad_remarks, "U001")
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::ValidationError(_)));
        let order = app.services.purchase_orders.get_order(po_id).await.unwrap();
        assert_eq!(order.status, "Pending");
    }

    let outcome = app
        .services
        .purchase_orders
        .change_status(
            po_id,
            PurchaseOrderStatus::Cancelled,
            Some("supplier discontinued the part".to_string()),
            "U001",
        )
        .await
        .unwrap();
    assert_eq!(outcome.new_status, PurchaseOrderStatus::Cancelled);

    let order = app.services.purchase_orders.get_order(po_id).await.unwrap();
    assert_eq!(order.status, "Cancelled");
    assert_eq!(
        order.remarks.as_deref(),
        Some("supplier discontinued the part")
    );
}

#[tokio::test]
async fn same_status_update_reports_no_changes() {
    let app = TestApp::new().await;
    let p1 = app.seed_product("Springs", 0).await;
    let s1 = app.seed_supplier("Acme Hardware").await;
    let created = app
        .services
        .purchase_orders
        .create_purchase_orders(vec![line(&p1, &s1, 1)], None, "U001")
        .await
        .unwrap();
    let po_id = &created.po_ids[0];

    let outcome = app
        .services
        .purchase_orders
        .change_status(po_id, PurchaseOrderStatus::Pending, None, "U001")
        .await
        .unwrap();
    assert_eq!(outcome.message, "No changes were made.");
    assert_eq!(outcome.old_status, outcome.new_status);
}

// ==================== Completion and the stock receipt ====================

#[tokio::test]
async fn completion_posts_one_in_transaction_and_increments_stock() {
    let app = TestApp::new().await;
    let p1 = app.seed_product("Gears", 10).await;
    let p2 = app.seed_product("Belts", 10).await;
    let s1 = app.seed_supplier("Acme Hardware").await;

    let mut l1 = line(&p1, &s1, 5);
    l1.unit_price = dec!(2.00);
    let mut l2 = line(&p2, &s1, 3);
    l2.unit_price = dec!(3.25);

    let created = app
        .services
        .purchase_orders
        .create_purchase_orders(vec![l1, l2], None, "U001")
        .await
        .unwrap();
    let po_id = &created.po_ids[0];

    app.services
        .purchase_orders
        .change_status(po_id, PurchaseOrderStatus::Approved, None, "U001")
        .await
        .unwrap();
    let outcome = app
        .services
        .purchase_orders
        .change_status(po_id, PurchaseOrderStatus::Completed, None, "U001")
        .await
        .unwrap();
    assert!(outcome.skipped_products.is_empty());

    // Quantities: (10, 10) -> (15, 13)
    assert_eq!(app.services.products.get(&p1).await.unwrap().quantity, 15);
    assert_eq!(app.services.products.get(&p2).await.unwrap().quantity, 13);

    // Exactly one IN transaction with two item rows (+5, +3)
    let headers = stock_transaction::Entity::find()
        .all(app.db.as_ref())
        .await
        .unwrap();
    assert_eq!(headers.len(), 1);
    assert_eq!(headers[0].tx_type, "IN");
    assert!(headers[0].reason.contains(po_id.as_str()));

    let mut items = stock_transaction_item::Entity::find()
        .filter(stock_transaction_item::Column::TransactionId.eq(headers[0].transaction_id.as_str()))
        .all(app.db.as_ref())
        .await
        .unwrap();
    items.sort_by(|a, b| b.qty_change.cmp(&a.qty_change));
    assert_eq!(items.len(), 2);
    assert_eq!((items[0].product_id.as_str(), items[0].qty_change), (p1.as_str(), 5));
    assert_eq!((items[1].product_id.as_str(), items[1].qty_change), (p2.as_str(), 3));
}

#[tokio::test]
async fn completed_orders_are_frozen_forever() {
    let app = TestApp::new().await;
    let p1 = app.seed_product("Axles", 10).await;
    let s1 = app.seed_supplier("Acme Hardware").await;
    let created = app
        .services
        .purchase_orders
        .create_purchase_orders(vec![line(&p1, &s1, 5)], None, "U001")
        .await
        .unwrap();
    let po_id = &created.po_ids[0];

    app.services
        .purchase_orders
        .change_status(po_id, PurchaseOrderStatus::Approved, None, "U001")
        .await
        .unwrap();
    app.services
        .purchase_orders
        .change_status(po_id, PurchaseOrderStatus::Completed, None, "U001")
        .await
        .unwrap();

    for next in [
        PurchaseOrderStatus::Pending,
        PurchaseOrderStatus::Approved,
        PurchaseOrderStatus::Completed,
        PurchaseOrderStatus::Cancelled,
        PurchaseOrderStatus::Rejected,
    ] {
        let err = app
            .services
            .purchase_orders
            .change_status(po_id, next, Some("attempted change".to_string()), "U001")
            .await
            .unwrap_err();
        match err {
            ServiceError::Conflict(msg) => {
                assert!(msg.contains("cannot revert a completed order"))
            }
            other => panic!("expected Conflict, got {:?}", other),
        }
    }

    // No second receipt was posted, stock unchanged after the first one
    assert_eq!(app.services.products.get(&p1).await.unwrap().quantity, 15);
    let headers = stock_transaction::Entity::find()
        .all(app.db.as_ref())
        .await
        .unwrap();
    assert_eq!(headers.len(), 1);

    let order = app.services.purchase_orders.get_order(po_id).await.unwrap();
    assert_eq!(order.status, "Completed");
}

#[tokio::test]
async fn unknown_products_in_a_completing_order_are_skipped_and_reported() {
    let app = TestApp::new().await;
    let p1 = app.seed_product("Pulleys", 10).await;
    let s1 = app.seed_supplier("Acme Hardware").await;

    let created = app
        .services
        .purchase_orders
        .create_purchase_orders(
            vec![line(&p1, &s1, 4), line("P9999", &s1, 6)],
            None,
            "U001",
        )
        .await
        .unwrap();
    let po_id = &created.po_ids[0];

    app.services
        .purchase_orders
        .change_status(po_id, PurchaseOrderStatus::Approved, None, "U001")
        .await
        .unwrap();
    let outcome = app
        .services
        .purchase_orders
        .change_status(po_id, PurchaseOrderStatus::Completed, None, "U001")
        .await
        .unwrap();

    assert_eq!(outcome.skipped_products, vec!["P9999".to_string()]);
    assert_eq!(app.services.products.get(&p1).await.unwrap().quantity, 14);

    // Only the resolvable line got a ledger row
    let items = stock_transaction_item::Entity::find()
        .all(app.db.as_ref())
        .await
        .unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].product_id, p1);
}

#[tokio::test]
async fn completion_effects_do_not_depend_on_the_actor() {
    let app = TestApp::new().await;
    let admin = app.seed_user("admin@example.com", UserRole::Admin).await;
    let supplier_user = app
        .seed_user("supplier@example.com", UserRole::Supplier)
        .await;

    let p1 = app.seed_product("Left Widget", 10).await;
    let p2 = app.seed_product("Right Widget", 10).await;
    let s1 = app.seed_supplier("Acme Hardware").await;
    let s2 = app.seed_supplier("Bolt Bros").await;

    // Identical orders, driven by different roles
    for (product, supplier, actor) in [(&p1, &s1, &admin), (&p2, &s2, &supplier_user)] {
        let created = app
            .services
            .purchase_orders
            .create_purchase_orders(vec![line(product, supplier, 7)], None, actor)
            .await
            .unwrap();
        let po_id = &created.po_ids[0];
        app.services
            .purchase_orders
            .change_status(po_id, PurchaseOrderStatus::Approved, None, actor)
            .await
            .unwrap();
        app.services
            .purchase_orders
            .change_status(po_id, PurchaseOrderStatus::Completed, None, actor)
            .await
            .unwrap();
    }

    assert_eq!(app.services.products.get(&p1).await.unwrap().quantity, 17);
    assert_eq!(app.services.products.get(&p2).await.unwrap().quantity, 17);

    let headers = stock_transaction::Entity::find()
        .all(app.db.as_ref())
        .await
        .unwrap();
    assert_eq!(headers.len(), 2);
    assert!(headers.iter().all(|h| h.tx_type == "IN"));
}

#[tokio::test]
async fn rejected_orders_stay_terminal() {
    let app = TestApp::new().await;
    let p1 = app.seed_product("Shafts", 0).await;
    let s1 = app.seed_supplier("Acme Hardware").await;
    let created = app
        .services
        .purchase_orders
        .create_purchase_orders(vec![line(&p1, &s1, 1)], None, "U001")
        .await
        .unwrap();
    let po_id = &created.po_ids[0];

    app.services
        .purchase_orders
        .change_status(
            po_id,
            PurchaseOrderStatus::Rejected,
            Some("price no longer valid".to_string()),
            "U001",
        )
        .await
        .unwrap();

    let err = app
        .services
        .purchase_orders
        .change_status(po_id, PurchaseOrderStatus::Approved, None, "U001")
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Conflict(_)));
}

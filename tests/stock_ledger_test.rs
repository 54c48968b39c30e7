//! Manual stock adjustments and the ledger invariant.

mod common;

use common::TestApp;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};
use stocktrack_api::{
    entities::{
        stock_transaction::StockTransactionType, stock_transaction_item,
    },
    errors::ServiceError,
    services::stock_ledger::AdjustmentLine,
};

fn adjustment(product_id: &str, quantity: i32) -> AdjustmentLine {
    AdjustmentLine {
        product_id: product_id.to_string(),
        quantity,
        remarks: None,
    }
}

#[tokio::test]
async fn out_adjustments_that_would_go_negative_are_rejected_before_any_write() {
    let app = TestApp::new().await;
    let p1 = app.seed_product("Filters", 5).await;

    let err = app
        .services
        .stock
        .post_manual_adjustment(
            vec![adjustment(&p1, 8)],
            StockTransactionType::Out,
            "shrinkage count".to_string(),
            "U001",
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::InsufficientStock(_)));

    // Nothing was written
    assert_eq!(app.services.products.get(&p1).await.unwrap().quantity, 5);
    let transactions = app.services.stock.list_transactions(None, None).await.unwrap();
    assert!(transactions.is_empty());
}

#[tokio::test]
async fn out_adjustments_within_stock_succeed() {
    let app = TestApp::new().await;
    let p1 = app.seed_product("Filters", 10).await;

    let posting = app
        .services
        .stock
        .post_manual_adjustment(
            vec![adjustment(&p1, 8)],
            StockTransactionType::Out,
            "shrinkage count".to_string(),
            "U001",
        )
        .await
        .unwrap();

    assert_eq!(posting.posted_lines, 1);
    assert_eq!(app.services.products.get(&p1).await.unwrap().quantity, 2);

    let (header, items) = app
        .services
        .stock
        .get_transaction(&posting.transaction_id)
        .await
        .unwrap();
    assert_eq!(header.tx_type, "OUT");
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].qty_change, -8);
}

#[tokio::test]
async fn in_adjustments_add_stock() {
    let app = TestApp::new().await;
    let p1 = app.seed_product("Gaskets", 3).await;

    let posting = app
        .services
        .stock
        .post_manual_adjustment(
            vec![adjustment(&p1, 12)],
            StockTransactionType::In,
            "supplier drop-off".to_string(),
            "U002",
        )
        .await
        .unwrap();

    assert_eq!(posting.transaction_id, "T0001");
    assert_eq!(app.services.products.get(&p1).await.unwrap().quantity, 15);
}

#[tokio::test]
async fn a_whole_batch_fails_when_one_line_is_short() {
    let app = TestApp::new().await;
    let p1 = app.seed_product("Valves", 20).await;
    let p2 = app.seed_product("Seals", 1).await;

    let err = app
        .services
        .stock
        .post_manual_adjustment(
            vec![adjustment(&p1, 5), adjustment(&p2, 4)],
            StockTransactionType::Out,
            "install job".to_string(),
            "U001",
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::InsufficientStock(_)));

    // The in-stock line was not applied either
    assert_eq!(app.services.products.get(&p1).await.unwrap().quantity, 20);
    assert_eq!(app.services.products.get(&p2).await.unwrap().quantity, 1);
}

#[tokio::test]
async fn unknown_products_fail_manual_adjustments_before_any_write() {
    let app = TestApp::new().await;
    let p1 = app.seed_product("Caps", 5).await;

    let err = app
        .services
        .stock
        .post_manual_adjustment(
            vec![adjustment(&p1, 2), adjustment("P9999", 1)],
            StockTransactionType::In,
            "mixed batch".to_string(),
            "U001",
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(_)));

    assert_eq!(app.services.products.get(&p1).await.unwrap().quantity, 5);
    let transactions = app.services.stock.list_transactions(None, None).await.unwrap();
    assert!(transactions.is_empty());
}

#[tokio::test]
async fn non_positive_quantities_are_invalid() {
    let app = TestApp::new().await;
    let p1 = app.seed_product("Plugs", 5).await;

    for bad in [0, -4] {
        let err = app
            .services
            .stock
            .post_manual_adjustment(
                vec![adjustment(&p1, bad)],
                StockTransactionType::In,
                "bad input".to_string(),
                "U001",
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::ValidationError(_)));
    }
}

#[tokio::test]
async fn ledger_rows_reconcile_with_the_cached_quantity() {
    let app = TestApp::new().await;
    let seed = 10;
    let p1 = app.seed_product("Bearings", seed).await;

    app.services
        .stock
        .post_manual_adjustment(
            vec![adjustment(&p1, 7)],
            StockTransactionType::In,
            "receiving".to_string(),
            "U001",
        )
        .await
        .unwrap();
    app.services
        .stock
        .post_manual_adjustment(
            vec![adjustment(&p1, 4)],
            StockTransactionType::Out,
            "workshop use".to_string(),
            "U001",
        )
        .await
        .unwrap();
    app.services
        .stock
        .post_manual_adjustment(
            vec![adjustment(&p1, 2)],
            StockTransactionType::In,
            "returned parts".to_string(),
            "U001",
        )
        .await
        .unwrap();

    let rows = stock_transaction_item::Entity::find()
        .filter(stock_transaction_item::Column::ProductId.eq(p1.as_str()))
        .all(app.db.as_ref())
        .await
        .unwrap();
    let ledger_sum: i32 = rows.iter().map(|r| r.qty_change).sum();

    let current = app.services.products.get(&p1).await.unwrap().quantity;
    assert_eq!(current, seed + ledger_sum);
    assert_eq!(current, 15);
}

#[tokio::test]
async fn transaction_listing_filters_by_id_and_user() {
    let app = TestApp::new().await;
    let p1 = app.seed_product("Diodes", 50).await;

    let first = app
        .services
        .stock
        .post_manual_adjustment(
            vec![adjustment(&p1, 1)],
            StockTransactionType::In,
            "first".to_string(),
            "U001",
        )
        .await
        .unwrap();
    app.services
        .stock
        .post_manual_adjustment(
            vec![adjustment(&p1, 1)],
            StockTransactionType::In,
            "second".to_string(),
            "U002",
        )
        .await
        .unwrap();

    let all = app.services.stock.list_transactions(None, None).await.unwrap();
    assert_eq!(all.len(), 2);

    let by_id = app
        .services
        .stock
        .list_transactions(Some(&first.transaction_id), None)
        .await
        .unwrap();
    assert_eq!(by_id.len(), 1);
    assert_eq!(by_id[0].reason, "first");

    let by_user = app
        .services
        .stock
        .list_transactions(None, Some("U002"))
        .await
        .unwrap();
    assert_eq!(by_user.len(), 1);
    assert_eq!(by_user[0].reason, "second");
}

//! Sequential id generation over the live store.

mod common;

use common::TestApp;
use sea_orm::{ActiveModelTrait, Set};
use stocktrack_api::entities::product;
use stocktrack_api::services::sequence::{EntityKind, SequenceService};
use uuid::Uuid;

#[tokio::test]
async fn empty_collections_start_each_sequence_at_one() {
    let app = TestApp::new().await;
    let sequence = SequenceService::new(app.db.clone());

    assert_eq!(sequence.next_id(EntityKind::Product).await.unwrap(), "P0001");
    assert_eq!(
        sequence.next_id(EntityKind::Supplier).await.unwrap(),
        "S0001"
    );
    assert_eq!(
        sequence.next_id(EntityKind::PurchaseOrder).await.unwrap(),
        "PR0001"
    );
    assert_eq!(
        sequence.next_id(EntityKind::StockTransaction).await.unwrap(),
        "T0001"
    );
    assert_eq!(sequence.next_id(EntityKind::User).await.unwrap(), "U001");
}

#[tokio::test]
async fn next_id_increments_the_greatest_stored_id() {
    let app = TestApp::new().await;
    let sequence = SequenceService::new(app.db.clone());

    for existing in ["P0007", "P0042", "P0015"] {
        insert_raw_product(&app, existing).await;
    }

    assert_eq!(sequence.next_id(EntityKind::Product).await.unwrap(), "P0043");
}

#[tokio::test]
async fn sequences_are_independent_per_entity_kind() {
    let app = TestApp::new().await;
    let sequence = SequenceService::new(app.db.clone());

    app.seed_product("Keyboard", 5).await;
    app.seed_product("Mouse", 5).await;

    // Two products exist, but other sequences are untouched
    assert_eq!(sequence.next_id(EntityKind::Product).await.unwrap(), "P0003");
    assert_eq!(
        sequence.next_id(EntityKind::Supplier).await.unwrap(),
        "S0001"
    );
}

#[tokio::test]
async fn unparseable_suffix_falls_back_to_a_random_id() {
    let app = TestApp::new().await;
    let sequence = SequenceService::new(app.db.clone());

    // 'X' sorts above any digit, so this row becomes the sequence maximum.
    insert_raw_product(&app, "PXXXX").await;

    let next = sequence.next_id(EntityKind::Product).await.unwrap();
    let suffix = next.strip_prefix('P').expect("prefix preserved");
    suffix
        .parse::<u32>()
        .expect("fallback id still has a numeric suffix");
}

#[tokio::test]
async fn creating_a_product_consumes_the_next_number() {
    let app = TestApp::new().await;

    let first = app.seed_product("Cable", 1).await;
    let second = app.seed_product("Adapter", 1).await;

    assert_eq!(first, "P0001");
    assert_eq!(second, "P0002");
}

async fn insert_raw_product(app: &TestApp, product_id: &str) {
    let now = chrono::Utc::now();
    product::ActiveModel {
        id: Set(Uuid::new_v4()),
        product_id: Set(product_id.to_string()),
        name: Set(format!("raw {}", product_id)),
        category: Set("General".to_string()),
        quantity: Set(0),
        reorder_level: Set(0),
        price: Set(rust_decimal::Decimal::ZERO),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(app.db.as_ref())
    .await
    .expect("raw insert failed");
}

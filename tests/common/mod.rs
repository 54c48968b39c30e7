// Not every test binary exercises every helper.
#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use rust_decimal::Decimal;
use tokio::sync::mpsc;

use stocktrack_api::{
    auth::{AuthConfig, AuthService},
    db::{self, DbConfig, DbPool},
    entities::user::UserRole,
    events::{self, EventSender},
    handlers::AppServices,
    services::products::NewProduct,
};

/// Test harness: the full service stack on a fresh in-memory SQLite
/// database with the schema migrated.
pub struct TestApp {
    pub db: Arc<DbPool>,
    pub services: AppServices,
    pub auth: Arc<AuthService>,
}

impl TestApp {
    pub async fn new() -> Self {
        // A single connection keeps every query on the same in-memory
        // database.
        let db_cfg = DbConfig {
            url: "sqlite::memory:".to_string(),
            max_connections: 1,
            min_connections: 1,
            ..Default::default()
        };
        let pool = db::establish_connection_with_config(&db_cfg)
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool).await.expect("migrations failed");
        let db = Arc::new(pool);

        let (event_tx, event_rx) = mpsc::channel(256);
        let event_sender = EventSender::new(event_tx);
        tokio::spawn(events::process_events(event_rx));

        let services = AppServices::new(db.clone(), Arc::new(event_sender));

        let auth_cfg = AuthConfig::new(
            "test_secret_key_for_testing_purposes_only_0123456789".to_string(),
            Duration::from_secs(3600),
            60,
        );
        let auth = Arc::new(AuthService::new(auth_cfg, db.clone()));

        Self { db, services, auth }
    }

    /// Seeds a product and returns its business id (`P####`).
    pub async fn seed_product(&self, name: &str, quantity: i32) -> String {
        let created = self
            .services
            .products
            .create(NewProduct {
                name: name.to_string(),
                category: "General".to_string(),
                quantity,
                reorder_level: 2,
                price: Decimal::new(999, 2),
            })
            .await
            .expect("failed to seed product");
        created.product_id
    }

    /// Seeds a supplier and returns its business id (`S####`).
    pub async fn seed_supplier(&self, company: &str) -> String {
        let created = self
            .services
            .suppliers
            .create(stocktrack_api::services::suppliers::NewSupplier {
                company: company.to_string(),
                contact_person: None,
                email: None,
                phone: None,
                address: None,
            })
            .await
            .expect("failed to seed supplier");
        created.supplier_id
    }

    /// Seeds a member account and returns its business id (`U###`).
    pub async fn seed_user(&self, email: &str, role: UserRole) -> String {
        let created = self
            .services
            .users
            .create(email, role)
            .await
            .expect("failed to seed user");
        created.user_id
    }
}

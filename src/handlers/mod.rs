pub mod auth;
pub mod common;
pub mod products;
pub mod purchase_orders;
pub mod reports;
pub mod stock;
pub mod suppliers;
pub mod users;

use std::sync::Arc;

use crate::db::DbPool;
use crate::events::EventSender;

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub products: Arc<crate::services::products::ProductService>,
    pub suppliers: Arc<crate::services::suppliers::SupplierService>,
    pub purchase_orders: Arc<crate::services::purchase_orders::PurchaseOrderService>,
    pub stock: Arc<crate::services::stock_ledger::StockLedgerService>,
    pub users: Arc<crate::services::users::UserService>,
    pub reports: Arc<crate::services::reports::ReportService>,
}

impl AppServices {
    /// Builds the service container on a shared store handle. The handle is
    /// opened once at process start and passed by reference everywhere; no
    /// service re-creates its own connection.
    pub fn new(db_pool: Arc<DbPool>, event_sender: Arc<EventSender>) -> Self {
        let stock = crate::services::stock_ledger::StockLedgerService::new(
            db_pool.clone(),
            event_sender.clone(),
        );
        let purchase_orders = crate::services::purchase_orders::PurchaseOrderService::new(
            db_pool.clone(),
            stock.clone(),
            event_sender.clone(),
        );

        Self {
            products: Arc::new(crate::services::products::ProductService::new(
                db_pool.clone(),
                event_sender.clone(),
            )),
            suppliers: Arc::new(crate::services::suppliers::SupplierService::new(
                db_pool.clone(),
                event_sender.clone(),
            )),
            purchase_orders: Arc::new(purchase_orders),
            stock: Arc::new(stock),
            users: Arc::new(crate::services::users::UserService::new(
                db_pool.clone(),
                event_sender,
            )),
            reports: Arc::new(crate::services::reports::ReportService::new(db_pool)),
        }
    }
}

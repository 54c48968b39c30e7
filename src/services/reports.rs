use std::collections::HashMap;
use std::sync::Arc;

use rust_decimal::Decimal;
use sea_orm::EntityTrait;
use serde::Serialize;
use strum::IntoEnumIterator;
use utoipa::ToSchema;

use crate::{
    db::DbPool,
    entities::{product, purchase_order, purchase_order_item, purchase_order::PurchaseOrderStatus},
    errors::ServiceError,
};

/// Headline numbers for the inventory dashboard.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct InventorySummary {
    pub total_products: u64,
    pub total_quantity: i64,
    pub low_stock_count: u64,
    pub out_of_stock_count: u64,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PurchaseOrderStatusLine {
    pub status: String,
    pub order_count: u64,
    pub total_value: Decimal,
}

/// Read-only projections over the catalog and order collections. Admin-tool
/// scale: aggregation happens in memory.
#[derive(Clone)]
pub struct ReportService {
    db: Arc<DbPool>,
}

impl ReportService {
    pub fn new(db: Arc<DbPool>) -> Self {
        Self { db }
    }

    pub async fn inventory_summary(&self) -> Result<InventorySummary, ServiceError> {
        let products = product::Entity::find().all(self.db.as_ref()).await?;

        let total_products = products.len() as u64;
        let total_quantity = products.iter().map(|p| p.quantity as i64).sum();
        let low_stock_count = products.iter().filter(|p| p.is_low_stock()).count() as u64;
        let out_of_stock_count = products.iter().filter(|p| p.is_out_of_stock()).count() as u64;

        Ok(InventorySummary {
            total_products,
            total_quantity,
            low_stock_count,
            out_of_stock_count,
        })
    }

    /// Order counts and total ordered value per status, in declaration
    /// order of the status enum.
    pub async fn purchase_order_breakdown(
        &self,
    ) -> Result<Vec<PurchaseOrderStatusLine>, ServiceError> {
        let db = self.db.as_ref();
        let orders = purchase_order::Entity::find().all(db).await?;
        let items = purchase_order_item::Entity::find().all(db).await?;

        let mut value_by_po: HashMap<&str, Decimal> = HashMap::new();
        for item in &items {
            *value_by_po.entry(item.po_id.as_str()).or_default() += item.total_price;
        }

        let mut lines = Vec::new();
        for status in PurchaseOrderStatus::iter() {
            let in_status: Vec<_> = orders
                .iter()
                .filter(|o| o.status == status.as_str())
                .collect();
            let total_value = in_status
                .iter()
                .filter_map(|o| value_by_po.get(o.po_id.as_str()))
                .copied()
                .sum();
            lines.push(PurchaseOrderStatusLine {
                status: status.as_str().to_string(),
                order_count: in_status.len() as u64,
                total_value,
            });
        }

        Ok(lines)
    }
}

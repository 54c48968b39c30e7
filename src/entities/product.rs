use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue, Set};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A catalog product with its materialized stock level.
///
/// `quantity` is a cache over the stock-transaction ledger: every ledger
/// posting for this product applies a signed increment here. Direct edits
/// are manual corrections, not ledger events.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "products")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    /// Human-readable business key, format `P####`
    #[sea_orm(unique)]
    pub product_id: String,
    pub name: String,
    pub category: String,
    pub quantity: i32,
    pub reorder_level: i32,
    pub price: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Model {
    /// Low stock means on-hand has fallen to or below the reorder level.
    pub fn is_low_stock(&self) -> bool {
        self.quantity <= self.reorder_level
    }

    pub fn is_out_of_stock(&self) -> bool {
        self.quantity <= 0
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

#[async_trait]
impl ActiveModelBehavior for ActiveModel {
    async fn before_save<C: ConnectionTrait>(self, _db: &C, _insert: bool) -> Result<Self, DbErr>
    where
        C: ConnectionTrait,
    {
        let mut active_model = self;
        if let ActiveValue::NotSet = active_model.created_at {
            active_model.created_at = Set(Utc::now());
        }
        if let ActiveValue::NotSet = active_model.updated_at {
            active_model.updated_at = Set(Utc::now());
        }
        Ok(active_model)
    }
}

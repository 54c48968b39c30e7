use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

/// Direction of a stock movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
pub enum StockTransactionType {
    #[strum(serialize = "IN")]
    #[serde(rename = "IN")]
    In,
    #[strum(serialize = "OUT")]
    #[serde(rename = "OUT")]
    Out,
}

impl StockTransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            StockTransactionType::In => "IN",
            StockTransactionType::Out => "OUT",
        }
    }

    /// Sign applied to a line quantity when posting.
    pub fn signed(&self, quantity: i32) -> i32 {
        match self {
            StockTransactionType::In => quantity,
            StockTransactionType::Out => -quantity,
        }
    }
}

/// Header of one logical stock-affecting event: a manual adjustment batch
/// or the receipt of a completed purchase order. Append-only.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "stock_transactions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    /// Human-readable business key, format `T####`
    #[sea_orm(unique)]
    pub transaction_id: String,
    pub user_id: String,
    pub date: DateTime<Utc>,
    pub reason: String,
    /// "IN" or "OUT", converted through [`StockTransactionType`]
    pub tx_type: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::stock_transaction_item::Entity")]
    Items,
}

impl Related<super::stock_transaction_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Items.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

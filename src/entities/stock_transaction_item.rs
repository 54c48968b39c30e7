use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One affected product within a stock transaction. `qty_change` is signed:
/// positive for IN movements, negative for OUT.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "stock_transaction_items")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub transaction_id: String,
    pub product_id: String,
    pub qty_change: i32,
    pub remarks: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::stock_transaction::Entity",
        from = "Column::TransactionId",
        to = "super::stock_transaction::Column::TransactionId"
    )]
    StockTransaction,
}

impl Related<super::stock_transaction::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::StockTransaction.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

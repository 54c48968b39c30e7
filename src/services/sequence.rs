use std::sync::Arc;

use rand::Rng;
use sea_orm::{EntityTrait, QueryOrder, QuerySelect};
use strum::{Display, EnumIter, EnumString};
use tracing::{instrument, warn};

use crate::{
    db::DbPool,
    entities::{product, purchase_order, stock_transaction, supplier, user},
    errors::ServiceError,
};

/// Entity families that carry a human-readable sequential id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, EnumIter)]
pub enum EntityKind {
    Product,
    Supplier,
    PurchaseOrder,
    StockTransaction,
    User,
}

impl EntityKind {
    pub fn prefix(&self) -> &'static str {
        match self {
            EntityKind::Product => "P",
            EntityKind::Supplier => "S",
            EntityKind::PurchaseOrder => "PR",
            EntityKind::StockTransaction => "T",
            EntityKind::User => "U",
        }
    }

    /// Zero-padded width of the numeric suffix.
    pub fn width(&self) -> usize {
        match self {
            EntityKind::User => 3,
            _ => 4,
        }
    }
}

/// Allocates the next id in a per-entity numbered sequence (`P0001`,
/// `S0001`, `PR0001`, `T0001`, `U001`).
///
/// The read-then-format step is racy by design: two concurrent writers can
/// compute the same next number. Uniqueness is enforced by the unique index
/// on the business-id column; callers retry allocation when an insert is
/// rejected (see the bounded-retry loops in the purchase-order and
/// stock-ledger services).
#[derive(Clone)]
pub struct SequenceService {
    db: Arc<DbPool>,
}

impl SequenceService {
    pub fn new(db: Arc<DbPool>) -> Self {
        Self { db }
    }

    /// Returns the next id for `kind`, e.g. `PR0007`.
    #[instrument(skip(self))]
    pub async fn next_id(&self, kind: EntityKind) -> Result<String, ServiceError> {
        let next = self.next_sequence_number(kind).await?;
        Ok(format_id(kind, next))
    }

    /// Returns the next free sequence number for `kind`. Callers creating a
    /// contiguous run of ids (one order per supplier group) read this once
    /// and increment locally.
    #[instrument(skip(self))]
    pub async fn next_sequence_number(&self, kind: EntityKind) -> Result<u32, ServiceError> {
        let last = self.last_business_id(kind).await?;

        let Some(last) = last else {
            return Ok(1);
        };

        match parse_suffix(kind, &last) {
            Some(n) => Ok(n + 1),
            None => {
                // Anomalous id in the store. Fall back to a random suffix so
                // the caller can still proceed; the unique index catches any
                // collision.
                warn!(
                    kind = %kind,
                    last_id = %last,
                    "latest id has an unparseable numeric suffix, falling back to a random suffix"
                );
                let ceiling = 10u32.pow(kind.width() as u32);
                Ok(rand::thread_rng().gen_range(1..ceiling))
            }
        }
    }

    /// The greatest stored business id for `kind`. Fixed-width zero padding
    /// makes the lexicographic descending sort numerically correct.
    async fn last_business_id(&self, kind: EntityKind) -> Result<Option<String>, ServiceError> {
        let db = self.db.as_ref();
        let last = match kind {
            EntityKind::Product => product::Entity::find()
                .order_by_desc(product::Column::ProductId)
                .limit(1)
                .one(db)
                .await?
                .map(|m| m.product_id),
            EntityKind::Supplier => supplier::Entity::find()
                .order_by_desc(supplier::Column::SupplierId)
                .limit(1)
                .one(db)
                .await?
                .map(|m| m.supplier_id),
            EntityKind::PurchaseOrder => purchase_order::Entity::find()
                .order_by_desc(purchase_order::Column::PoId)
                .limit(1)
                .one(db)
                .await?
                .map(|m| m.po_id),
            EntityKind::StockTransaction => stock_transaction::Entity::find()
                .order_by_desc(stock_transaction::Column::TransactionId)
                .limit(1)
                .one(db)
                .await?
                .map(|m| m.transaction_id),
            EntityKind::User => user::Entity::find()
                .order_by_desc(user::Column::UserId)
                .limit(1)
                .one(db)
                .await?
                .map(|m| m.user_id),
        };
        Ok(last)
    }
}

/// Renders a sequence number as a business id, e.g. (PurchaseOrder, 7) ->
/// "PR0007".
pub fn format_id(kind: EntityKind, number: u32) -> String {
    format!(
        "{}{:0width$}",
        kind.prefix(),
        number,
        width = kind.width()
    )
}

fn parse_suffix(kind: EntityKind, id: &str) -> Option<u32> {
    id.strip_prefix(kind.prefix())?.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_zero_padded_to_entity_width() {
        assert_eq!(format_id(EntityKind::Product, 1), "P0001");
        assert_eq!(format_id(EntityKind::Supplier, 42), "S0042");
        assert_eq!(format_id(EntityKind::PurchaseOrder, 7), "PR0007");
        assert_eq!(format_id(EntityKind::StockTransaction, 9999), "T9999");
        assert_eq!(format_id(EntityKind::User, 3), "U003");
    }

    #[test]
    fn wide_sequences_outgrow_their_padding() {
        // Over-width numbers render without truncation
        assert_eq!(format_id(EntityKind::Product, 10001), "P10001");
    }

    #[test]
    fn suffix_parsing_strips_the_exact_prefix() {
        assert_eq!(parse_suffix(EntityKind::PurchaseOrder, "PR0042"), Some(42));
        assert_eq!(parse_suffix(EntityKind::Product, "P0042"), Some(42));
        assert_eq!(parse_suffix(EntityKind::Product, "PR0042"), None);
        assert_eq!(parse_suffix(EntityKind::Product, "PXXXX"), None);
    }
}

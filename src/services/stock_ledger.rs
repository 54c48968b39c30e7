use std::sync::Arc;

use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set, SqlErr};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::{
    db::DbPool,
    entities::{
        product,
        stock_transaction::{self, StockTransactionType},
        stock_transaction_item,
    },
    errors::ServiceError,
    events::{Event, EventSender},
    services::sequence::{EntityKind, SequenceService},
};

/// How many times an id allocation is retried when the unique index
/// rejects the header insert (two writers racing for the same number).
const ID_ALLOCATION_ATTEMPTS: usize = 3;

/// One line of a manual stock adjustment request.
#[derive(Debug, Clone)]
pub struct AdjustmentLine {
    pub product_id: String,
    pub quantity: i32,
    pub remarks: Option<String>,
}

/// Outcome of a ledger posting.
#[derive(Debug, Clone)]
pub struct LedgerPosting {
    pub transaction_id: String,
    pub posted_lines: usize,
    /// Order lines whose product no longer exists. Surfaced to the caller
    /// instead of silently dropped; their stock effect is not applied.
    pub skipped_products: Vec<String>,
}

/// Posts stock movements: one immutable transaction header + item rows per
/// logical event, plus a signed increment applied to each affected
/// product's cached quantity.
///
/// Writes are ordered header -> items -> increments, each its own storage
/// call, so a partial failure under-credits stock rather than
/// double-crediting it.
#[derive(Clone)]
pub struct StockLedgerService {
    db: Arc<DbPool>,
    sequence: SequenceService,
    event_sender: Arc<EventSender>,
}

impl StockLedgerService {
    pub fn new(db: Arc<DbPool>, event_sender: Arc<EventSender>) -> Self {
        let sequence = SequenceService::new(db.clone());
        Self {
            db,
            sequence,
            event_sender,
        }
    }

    /// Records the receipt of a completed purchase order: a single `IN`
    /// transaction with one `+quantity_ordered` row per order line, and a
    /// matching increment on each product.
    ///
    /// Lines referencing an unknown product are skipped and reported in
    /// `skipped_products`; receipt postings are never blocked by stock
    /// levels.
    #[instrument(skip(self, items), fields(po_id = %po_id, lines = items.len()))]
    pub async fn post_order_receipt(
        &self,
        po_id: &str,
        items: &[crate::entities::purchase_order_item::Model],
        actor_user_id: &str,
    ) -> Result<LedgerPosting, ServiceError> {
        let db = self.db.as_ref();

        let mut deltas: Vec<(String, i32, Option<String>)> = Vec::with_capacity(items.len());
        let mut skipped = Vec::new();
        for item in items {
            let exists = product::Entity::find()
                .filter(product::Column::ProductId.eq(item.product_id.as_str()))
                .one(db)
                .await?
                .is_some();
            if exists {
                deltas.push((item.product_id.clone(), item.quantity_ordered, None));
            } else {
                warn!(
                    product_id = %item.product_id,
                    po_id = %po_id,
                    "order line references an unknown product, skipping its stock effect"
                );
                skipped.push(item.product_id.clone());
            }
        }

        let transaction_id = self
            .insert_header(
                StockTransactionType::In,
                format!("Received purchase order {}", po_id),
                actor_user_id,
            )
            .await?;

        self.insert_items(&transaction_id, &deltas).await?;
        self.apply_increments(&deltas).await?;

        self.event_sender
            .send(Event::StockTransactionPosted {
                transaction_id: transaction_id.clone(),
                tx_type: StockTransactionType::In.as_str().to_string(),
                line_count: deltas.len(),
            })
            .await;

        info!(
            transaction_id = %transaction_id,
            posted = deltas.len(),
            skipped = skipped.len(),
            "posted order receipt"
        );

        Ok(LedgerPosting {
            transaction_id,
            posted_lines: deltas.len(),
            skipped_products: skipped,
        })
    }

    /// Posts a manual stock adjustment batch.
    ///
    /// Every line must name an existing product and a positive quantity.
    /// For `OUT` batches the whole request is rejected before any write if
    /// a line would drive its product's on-hand quantity negative.
    #[instrument(skip(self, lines), fields(tx_type = %tx_type, lines = lines.len()))]
    pub async fn post_manual_adjustment(
        &self,
        lines: Vec<AdjustmentLine>,
        tx_type: StockTransactionType,
        reason: String,
        actor_user_id: &str,
    ) -> Result<LedgerPosting, ServiceError> {
        if lines.is_empty() {
            return Err(ServiceError::ValidationError(
                "Please add at least one valid product.".to_string(),
            ));
        }
        if let Some(bad) = lines.iter().find(|l| l.quantity <= 0) {
            return Err(ServiceError::ValidationError(format!(
                "Quantity for product '{}' must be greater than zero.",
                bad.product_id
            )));
        }

        let db = self.db.as_ref();

        // Pre-flight: resolve every product and check OUT sufficiency before
        // the first write.
        let mut deltas: Vec<(String, i32, Option<String>)> = Vec::with_capacity(lines.len());
        for line in &lines {
            let on_hand = product::Entity::find()
                .filter(product::Column::ProductId.eq(line.product_id.as_str()))
                .one(db)
                .await?
                .ok_or_else(|| {
                    ServiceError::NotFound(format!(
                        "Product '{}' does not exist in the database.",
                        line.product_id
                    ))
                })?
                .quantity;

            if tx_type == StockTransactionType::Out && on_hand < line.quantity {
                return Err(ServiceError::InsufficientStock(format!(
                    "product '{}' has {} on hand, cannot remove {}",
                    line.product_id, on_hand, line.quantity
                )));
            }

            deltas.push((
                line.product_id.clone(),
                tx_type.signed(line.quantity),
                line.remarks.clone(),
            ));
        }

        let transaction_id = self
            .insert_header(tx_type, reason, actor_user_id)
            .await?;
        self.insert_items(&transaction_id, &deltas).await?;
        self.apply_increments(&deltas).await?;

        self.event_sender
            .send(Event::StockTransactionPosted {
                transaction_id: transaction_id.clone(),
                tx_type: tx_type.as_str().to_string(),
                line_count: deltas.len(),
            })
            .await;

        Ok(LedgerPosting {
            transaction_id,
            posted_lines: deltas.len(),
            skipped_products: Vec::new(),
        })
    }

    /// Lists transactions, newest first, optionally filtered by transaction
    /// or user id.
    pub async fn list_transactions(
        &self,
        transaction_id: Option<&str>,
        user_id: Option<&str>,
    ) -> Result<Vec<stock_transaction::Model>, ServiceError> {
        let mut query = stock_transaction::Entity::find();
        if let Some(tid) = transaction_id {
            query = query.filter(stock_transaction::Column::TransactionId.eq(tid));
        }
        if let Some(uid) = user_id {
            query = query.filter(stock_transaction::Column::UserId.eq(uid));
        }
        let rows = query
            .order_by_desc(stock_transaction::Column::Date)
            .all(self.db.as_ref())
            .await?;
        Ok(rows)
    }

    /// A transaction header with its item rows.
    pub async fn get_transaction(
        &self,
        transaction_id: &str,
    ) -> Result<(stock_transaction::Model, Vec<stock_transaction_item::Model>), ServiceError> {
        let db = self.db.as_ref();
        let header = stock_transaction::Entity::find()
            .filter(stock_transaction::Column::TransactionId.eq(transaction_id))
            .one(db)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Stock transaction {} not found", transaction_id))
            })?;
        let items = stock_transaction_item::Entity::find()
            .filter(stock_transaction_item::Column::TransactionId.eq(transaction_id))
            .all(db)
            .await?;
        Ok((header, items))
    }

    /// Allocates a `T####` id and inserts the header, retrying allocation
    /// when a concurrent writer takes the same number.
    async fn insert_header(
        &self,
        tx_type: StockTransactionType,
        reason: String,
        actor_user_id: &str,
    ) -> Result<String, ServiceError> {
        let db = self.db.as_ref();
        let mut last_err: Option<ServiceError> = None;

        for attempt in 1..=ID_ALLOCATION_ATTEMPTS {
            let transaction_id = self.sequence.next_id(EntityKind::StockTransaction).await?;
            let header = stock_transaction::ActiveModel {
                id: Set(Uuid::new_v4()),
                transaction_id: Set(transaction_id.clone()),
                user_id: Set(actor_user_id.to_string()),
                date: Set(Utc::now()),
                reason: Set(reason.clone()),
                tx_type: Set(tx_type.as_str().to_string()),
            };

            match stock_transaction::Entity::insert(header).exec(db).await {
                Ok(_) => return Ok(transaction_id),
                Err(e) if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
                    warn!(
                        transaction_id = %transaction_id,
                        attempt,
                        "transaction id already taken, retrying allocation"
                    );
                    last_err = Some(ServiceError::DatabaseError(e));
                }
                Err(e) => return Err(ServiceError::DatabaseError(e)),
            }
        }

        Err(last_err.unwrap_or_else(|| {
            ServiceError::InternalError("transaction id allocation failed".to_string())
        }))
    }

    async fn insert_items(
        &self,
        transaction_id: &str,
        deltas: &[(String, i32, Option<String>)],
    ) -> Result<(), ServiceError> {
        if deltas.is_empty() {
            return Ok(());
        }
        let rows: Vec<stock_transaction_item::ActiveModel> = deltas
            .iter()
            .map(
                |(product_id, qty_change, remarks)| stock_transaction_item::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    transaction_id: Set(transaction_id.to_string()),
                    product_id: Set(product_id.clone()),
                    qty_change: Set(*qty_change),
                    remarks: Set(remarks.clone()),
                },
            )
            .collect();
        stock_transaction_item::Entity::insert_many(rows)
            .exec(self.db.as_ref())
            .await?;
        Ok(())
    }

    /// Applies `quantity = quantity + delta` per product as an expression
    /// update, not a read-modify-write, so interleaved readers cannot cause
    /// lost updates.
    async fn apply_increments(
        &self,
        deltas: &[(String, i32, Option<String>)],
    ) -> Result<(), ServiceError> {
        let db = self.db.as_ref();
        for (product_id, delta, _) in deltas {
            product::Entity::update_many()
                .col_expr(
                    product::Column::Quantity,
                    Expr::col(product::Column::Quantity).add(*delta),
                )
                .col_expr(product::Column::UpdatedAt, Expr::value(Utc::now()))
                .filter(product::Column::ProductId.eq(product_id.as_str()))
                .exec(db)
                .await?;
        }
        Ok(())
    }
}

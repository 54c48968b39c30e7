use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set,
    SqlErr,
};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::{
    db::DbPool,
    entities::{
        purchase_order::{self, PurchaseOrderStatus},
        purchase_order_item,
    },
    errors::ServiceError,
    events::{Event, EventSender},
    services::{
        sequence::{format_id, EntityKind, SequenceService},
        stock_ledger::StockLedgerService,
    },
};

const ID_ALLOCATION_ATTEMPTS: usize = 3;

/// One requested order line: which product, from which supplier, how many,
/// at what unit price.
#[derive(Debug, Clone)]
pub struct OrderLineRequest {
    pub product_id: String,
    pub supplier_id: String,
    pub quantity: i32,
    pub unit_price: Decimal,
}

/// Outcome of a batch order creation.
#[derive(Debug, Clone)]
pub struct CreatedPurchaseOrders {
    pub created_count: usize,
    pub po_ids: Vec<String>,
    pub message: String,
}

/// Outcome of a status change.
#[derive(Debug, Clone)]
pub struct StatusChangeOutcome {
    pub po_id: String,
    pub old_status: PurchaseOrderStatus,
    pub new_status: PurchaseOrderStatus,
    pub message: String,
    /// Products skipped during the completion receipt (unknown ids).
    pub skipped_products: Vec<String>,
}

/// Filters for the purchase-order listing.
#[derive(Debug, Clone, Default)]
pub struct PurchaseOrderFilter {
    pub status: Option<PurchaseOrderStatus>,
    pub supplier_id: Option<String>,
    /// Which timestamp the date range applies to
    pub date_field: Option<PurchaseOrderDateField>,
    pub date_from: Option<DateTime<Utc>>,
    pub date_to: Option<DateTime<Utc>>,
    pub sort: Option<PurchaseOrderSort>,
    pub descending: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PurchaseOrderDateField {
    Created,
    LastUpdated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PurchaseOrderSort {
    PoId,
    SupplierId,
    Status,
    Created,
    LastUpdated,
}

/// Creates purchase orders from flat line-item batches and drives their
/// status lifecycle. Completion posts the stock receipt through
/// [`StockLedgerService`] before the status write, so a failed posting
/// leaves the order un-completed.
#[derive(Clone)]
pub struct PurchaseOrderService {
    db: Arc<DbPool>,
    sequence: SequenceService,
    ledger: StockLedgerService,
    event_sender: Arc<EventSender>,
}

impl PurchaseOrderService {
    pub fn new(
        db: Arc<DbPool>,
        ledger: StockLedgerService,
        event_sender: Arc<EventSender>,
    ) -> Self {
        let sequence = SequenceService::new(db.clone());
        Self {
            db,
            sequence,
            ledger,
            event_sender,
        }
    }

    /// Groups the submitted lines by supplier (order of first appearance)
    /// and creates one Pending order per group, with a contiguous run of
    /// `PR####` ids. Headers are batch-inserted before items; an id
    /// collision with a concurrent creator retries the whole allocation.
    #[instrument(skip(self, lines), fields(lines = lines.len(), actor = %actor_user_id))]
    pub async fn create_purchase_orders(
        &self,
        lines: Vec<OrderLineRequest>,
        remarks: Option<String>,
        actor_user_id: &str,
    ) -> Result<CreatedPurchaseOrders, ServiceError> {
        if lines.is_empty() || !lines.iter().any(|l| l.quantity > 0) {
            return Err(ServiceError::ValidationError(
                "Please add at least one valid product.".to_string(),
            ));
        }

        let usable: Vec<&OrderLineRequest> = lines
            .iter()
            .filter(|l| !l.product_id.is_empty() && l.quantity > 0)
            .collect();

        // Stable grouping: the first supplier to appear gets the first id.
        let mut groups: Vec<(String, Vec<&OrderLineRequest>)> = Vec::new();
        for line in usable {
            match groups.iter_mut().find(|(sid, _)| *sid == line.supplier_id) {
                Some((_, bucket)) => bucket.push(line),
                None => groups.push((line.supplier_id.clone(), vec![line])),
            }
        }

        if groups.is_empty() {
            return Err(ServiceError::ValidationError(
                "Please add at least one valid product.".to_string(),
            ));
        }

        let db = self.db.as_ref();
        let mut last_err: Option<ServiceError> = None;

        for attempt in 1..=ID_ALLOCATION_ATTEMPTS {
            let base = self
                .sequence
                .next_sequence_number(EntityKind::PurchaseOrder)
                .await?;

            let now = Utc::now();
            let mut headers = Vec::with_capacity(groups.len());
            let mut items = Vec::new();
            let mut po_ids = Vec::with_capacity(groups.len());

            for (offset, (supplier_id, group)) in groups.iter().enumerate() {
                let po_id = format_id(EntityKind::PurchaseOrder, base + offset as u32);

                headers.push(purchase_order::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    po_id: Set(po_id.clone()),
                    supplier_id: Set(supplier_id.clone()),
                    user_id: Set(actor_user_id.to_string()),
                    status: Set(PurchaseOrderStatus::Pending.as_str().to_string()),
                    created_date: Set(now),
                    last_updated: Set(now),
                    remarks: Set(remarks.clone()),
                });

                for line in group {
                    items.push(purchase_order_item::ActiveModel {
                        id: Set(Uuid::new_v4()),
                        po_id: Set(po_id.clone()),
                        product_id: Set(line.product_id.clone()),
                        quantity_ordered: Set(line.quantity),
                        unit_price: Set(line.unit_price),
                        total_price: Set(line.unit_price * Decimal::from(line.quantity)),
                    });
                }

                po_ids.push(po_id);
            }

            match purchase_order::Entity::insert_many(headers).exec(db).await {
                Ok(_) => {
                    // Headers exist before items; a crash here leaves orders
                    // without lines (accepted non-transactional risk).
                    if !items.is_empty() {
                        purchase_order_item::Entity::insert_many(items)
                            .exec(db)
                            .await?;
                    }

                    for (po_id, (supplier_id, _)) in po_ids.iter().zip(groups.iter()) {
                        self.event_sender
                            .send(Event::PurchaseOrderCreated {
                                po_id: po_id.clone(),
                                supplier_id: supplier_id.clone(),
                            })
                            .await;
                    }

                    let created_count = po_ids.len();
                    info!(created = created_count, "created purchase orders");
                    return Ok(CreatedPurchaseOrders {
                        created_count,
                        po_ids,
                        message: format!(
                            "Generated {} Purchase Order(s) successfully!",
                            created_count
                        ),
                    });
                }
                Err(e) if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
                    warn!(attempt, "purchase order id run already taken, retrying allocation");
                    last_err = Some(ServiceError::DatabaseError(e));
                }
                Err(e) => return Err(ServiceError::DatabaseError(e)),
            }
        }

        Err(last_err.unwrap_or_else(|| {
            ServiceError::InternalError("purchase order id allocation failed".to_string())
        }))
    }

    /// Applies a status change through the transition table.
    ///
    /// A completed order is frozen forever; reaching `Completed` posts the
    /// stock receipt first and only then persists the status.
    #[instrument(skip(self), fields(po_id = %po_id, new_status = %new_status))]
    pub async fn change_status(
        &self,
        po_id: &str,
        new_status: PurchaseOrderStatus,
        remarks: Option<String>,
        actor_user_id: &str,
    ) -> Result<StatusChangeOutcome, ServiceError> {
        let db = self.db.as_ref();

        let order = self.get_order(po_id).await?;
        let old_status = order.status()?;

        if old_status == PurchaseOrderStatus::Completed {
            return Err(ServiceError::Conflict(
                "cannot revert a completed order".to_string(),
            ));
        }
        if old_status.is_terminal() && old_status != new_status {
            return Err(ServiceError::Conflict(format!(
                "order {} is {} and can no longer change status",
                po_id, old_status
            )));
        }

        if new_status.requires_remarks() && is_blank_remarks(remarks.as_deref()) {
            return Err(ServiceError::ValidationError(
                "Remarks are required when cancelling or rejecting an order.".to_string(),
            ));
        }

        if !old_status.can_transition_to(new_status) {
            return Err(ServiceError::Conflict(format!(
                "cannot transition order {} from {} to {}",
                po_id, old_status, new_status
            )));
        }

        // Stock first: the status write must not happen if posting fails.
        let mut skipped_products = Vec::new();
        if new_status == PurchaseOrderStatus::Completed
            && old_status != PurchaseOrderStatus::Completed
        {
            let items = self.get_order_items(po_id).await?;
            let posting = self
                .ledger
                .post_order_receipt(po_id, &items, actor_user_id)
                .await?;
            skipped_products = posting.skipped_products;
        }

        let mut active: purchase_order::ActiveModel = order.into();
        active.status = Set(new_status.as_str().to_string());
        active.remarks = Set(remarks);
        active.last_updated = Set(Utc::now());
        active.update(db).await?;

        if old_status != new_status {
            self.event_sender
                .send(Event::PurchaseOrderStatusChanged {
                    po_id: po_id.to_string(),
                    old_status: old_status.as_str().to_string(),
                    new_status: new_status.as_str().to_string(),
                })
                .await;
        }

        let message = if old_status == new_status {
            "No changes were made.".to_string()
        } else if !skipped_products.is_empty() {
            format!(
                "Order updated successfully! Skipped unknown products: {}",
                skipped_products.join(", ")
            )
        } else {
            "Order updated successfully!".to_string()
        };

        Ok(StatusChangeOutcome {
            po_id: po_id.to_string(),
            old_status,
            new_status,
            message,
            skipped_products,
        })
    }

    pub async fn get_order(&self, po_id: &str) -> Result<purchase_order::Model, ServiceError> {
        purchase_order::Entity::find()
            .filter(purchase_order::Column::PoId.eq(po_id))
            .one(self.db.as_ref())
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Purchase order {} not found", po_id)))
    }

    pub async fn get_order_items(
        &self,
        po_id: &str,
    ) -> Result<Vec<purchase_order_item::Model>, ServiceError> {
        let items = purchase_order_item::Entity::find()
            .filter(purchase_order_item::Column::PoId.eq(po_id))
            .all(self.db.as_ref())
            .await?;
        Ok(items)
    }

    /// Paged listing with the browse filters the order index offers.
    pub async fn list_orders(
        &self,
        filter: PurchaseOrderFilter,
        page: u64,
        per_page: u64,
    ) -> Result<(Vec<purchase_order::Model>, u64), ServiceError> {
        let mut query = purchase_order::Entity::find();

        if let Some(status) = filter.status {
            query = query.filter(purchase_order::Column::Status.eq(status.as_str()));
        }
        if let Some(supplier_id) = &filter.supplier_id {
            query = query.filter(purchase_order::Column::SupplierId.eq(supplier_id.as_str()));
        }
        if let Some(field) = filter.date_field {
            let column = match field {
                PurchaseOrderDateField::Created => purchase_order::Column::CreatedDate,
                PurchaseOrderDateField::LastUpdated => purchase_order::Column::LastUpdated,
            };
            if let Some(from) = filter.date_from {
                query = query.filter(column.gte(from));
            }
            if let Some(to) = filter.date_to {
                query = query.filter(column.lte(to));
            }
        }

        let sort = filter.sort.unwrap_or(PurchaseOrderSort::PoId);
        let column = match sort {
            PurchaseOrderSort::PoId => purchase_order::Column::PoId,
            PurchaseOrderSort::SupplierId => purchase_order::Column::SupplierId,
            PurchaseOrderSort::Status => purchase_order::Column::Status,
            PurchaseOrderSort::Created => purchase_order::Column::CreatedDate,
            PurchaseOrderSort::LastUpdated => purchase_order::Column::LastUpdated,
        };
        query = if filter.descending {
            query.order_by_desc(column)
        } else {
            query.order_by_asc(column)
        };

        let paginator = query.paginate(self.db.as_ref(), per_page.max(1));
        let total = paginator.num_items().await?;
        let rows = paginator.fetch_page(page.saturating_sub(1)).await?;
        Ok((rows, total))
    }
}

/// The literal string "NULL" came from a legacy data-entry convention and
/// counts as blank.
fn is_blank_remarks(remarks: Option<&str>) -> bool {
    match remarks {
        None => true,
        Some(r) => {
            let trimmed = r.trim();
            trimmed.is_empty() || trimmed == "NULL"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_remarks_detection_covers_the_legacy_null_marker() {
        assert!(is_blank_remarks(None));
        assert!(is_blank_remarks(Some("")));
        assert!(is_blank_remarks(Some("   ")));
        assert!(is_blank_remarks(Some("NULL")));
        assert!(is_blank_remarks(Some("  NULL  ")));
        assert!(!is_blank_remarks(Some("null but lowercase")));
        assert!(!is_blank_remarks(Some("damaged goods")));
    }
}

use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, ModelTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set, SqlErr,
};
use tracing::{instrument, warn};
use uuid::Uuid;

use crate::{
    db::DbPool,
    entities::product,
    errors::ServiceError,
    events::{Event, EventSender},
    services::sequence::{EntityKind, SequenceService},
};

const ID_ALLOCATION_ATTEMPTS: usize = 3;

/// Stock-level classification for the catalog listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StockLevelFilter {
    Low,
    Out,
}

#[derive(Debug, Clone, Default)]
pub struct ProductFilter {
    /// Substring match on the product name
    pub search: Option<String>,
    pub category: Option<String>,
    pub stock_level: Option<StockLevelFilter>,
    pub sort: Option<ProductSort>,
    pub descending: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProductSort {
    ProductId,
    Name,
    Category,
    Quantity,
    Price,
}

#[derive(Debug, Clone)]
pub struct NewProduct {
    pub name: String,
    pub category: String,
    pub quantity: i32,
    pub reorder_level: i32,
    pub price: Decimal,
}

#[derive(Debug, Clone, Default)]
pub struct ProductUpdate {
    pub name: Option<String>,
    pub category: Option<String>,
    pub reorder_level: Option<i32>,
    pub price: Option<Decimal>,
    /// Direct quantity correction; routine stock movement goes through the
    /// ledger instead.
    pub quantity: Option<i32>,
}

#[derive(Clone)]
pub struct ProductService {
    db: Arc<DbPool>,
    sequence: SequenceService,
    event_sender: Arc<EventSender>,
}

impl ProductService {
    pub fn new(db: Arc<DbPool>, event_sender: Arc<EventSender>) -> Self {
        let sequence = SequenceService::new(db.clone());
        Self {
            db,
            sequence,
            event_sender,
        }
    }

    pub async fn list(
        &self,
        filter: ProductFilter,
        page: u64,
        per_page: u64,
    ) -> Result<(Vec<product::Model>, u64), ServiceError> {
        let mut query = product::Entity::find();

        if let Some(search) = &filter.search {
            query = query.filter(product::Column::Name.contains(search.as_str()));
        }
        if let Some(category) = &filter.category {
            if category != "all" {
                query = query.filter(product::Column::Category.eq(category.as_str()));
            }
        }
        match filter.stock_level {
            Some(StockLevelFilter::Low) => {
                query = query.filter(
                    Expr::col(product::Column::Quantity)
                        .lte(Expr::col(product::Column::ReorderLevel)),
                );
            }
            Some(StockLevelFilter::Out) => {
                query = query.filter(product::Column::Quantity.eq(0));
            }
            None => {}
        }

        let sort = filter.sort.unwrap_or(ProductSort::Name);
        let column = match sort {
            ProductSort::ProductId => product::Column::ProductId,
            ProductSort::Name => product::Column::Name,
            ProductSort::Category => product::Column::Category,
            ProductSort::Quantity => product::Column::Quantity,
            ProductSort::Price => product::Column::Price,
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

    pub async fn get(&self, product_id: &str) -> Result<product::Model, ServiceError> {
        product::Entity::find()
            .filter(product::Column::ProductId.eq(product_id))
            .one(self.db.as_ref())
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", product_id)))
    }

    /// Products at or below their reorder level, most depleted first.
    pub async fn low_stock(&self) -> Result<Vec<product::Model>, ServiceError> {
        let rows = product::Entity::find()
            .filter(
                Expr::col(product::Column::Quantity)
                    .lte(Expr::col(product::Column::ReorderLevel)),
            )
            .order_by_asc(product::Column::Quantity)
            .all(self.db.as_ref())
            .await?;
        Ok(rows)
    }

    #[instrument(skip(self, input), fields(name = %input.name))]
    pub async fn create(&self, input: NewProduct) -> Result<product::Model, ServiceError> {
        let db = self.db.as_ref();
        let mut last_err: Option<ServiceError> = None;

        for attempt in 1..=ID_ALLOCATION_ATTEMPTS {
            let product_id = self.sequence.next_id(EntityKind::Product).await?;
            let now = Utc::now();
            let model = product::ActiveModel {
                id: Set(Uuid::new_v4()),
                product_id: Set(product_id.clone()),
                name: Set(input.name.clone()),
                category: Set(input.category.clone()),
                quantity: Set(input.quantity),
                reorder_level: Set(input.reorder_level),
                price: Set(input.price),
                created_at: Set(now),
                updated_at: Set(now),
            };

            match model.insert(db).await {
                Ok(created) => {
                    self.event_sender
                        .send(Event::ProductCreated {
                            product_id: created.product_id.clone(),
                        })
                        .await;
                    return Ok(created);
                }
                Err(e) if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
                    warn!(product_id = %product_id, attempt, "product id already taken, retrying allocation");
                    last_err = Some(ServiceError::DatabaseError(e));
                }
                Err(e) => return Err(ServiceError::DatabaseError(e)),
            }
        }

        Err(last_err
            .unwrap_or_else(|| ServiceError::InternalError("product id allocation failed".into())))
    }

    pub async fn update(
        &self,
        product_id: &str,
        changes: ProductUpdate,
    ) -> Result<product::Model, ServiceError> {
        let existing = self.get(product_id).await?;
        let mut active: product::ActiveModel = existing.into();

        if let Some(name) = changes.name {
            active.name = Set(name);
        }
        if let Some(category) = changes.category {
            active.category = Set(category);
        }
        if let Some(reorder_level) = changes.reorder_level {
            active.reorder_level = Set(reorder_level);
        }
        if let Some(price) = changes.price {
            active.price = Set(price);
        }
        if let Some(quantity) = changes.quantity {
            active.quantity = Set(quantity);
        }
        active.updated_at = Set(Utc::now());

        let updated = active.update(self.db.as_ref()).await?;
        Ok(updated)
    }

    pub async fn delete(&self, product_id: &str) -> Result<(), ServiceError> {
        let existing = self.get(product_id).await?;
        existing.delete(self.db.as_ref()).await?;
        Ok(())
    }
}

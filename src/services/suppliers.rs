use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, ModelTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Set, SqlErr,
};
use tracing::{instrument, warn};
use uuid::Uuid;

use crate::{
    db::DbPool,
    entities::{supplier, supplier_product},
    errors::ServiceError,
    events::{Event, EventSender},
    services::sequence::{EntityKind, SequenceService},
};

const ID_ALLOCATION_ATTEMPTS: usize = 3;

#[derive(Debug, Clone)]
pub struct NewSupplier {
    pub company: String,
    pub contact_person: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct SupplierUpdate {
    pub company: Option<String>,
    pub contact_person: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
}

#[derive(Clone)]
pub struct SupplierService {
    db: Arc<DbPool>,
    sequence: SequenceService,
    event_sender: Arc<EventSender>,
}

impl SupplierService {
    pub fn new(db: Arc<DbPool>, event_sender: Arc<EventSender>) -> Self {
        let sequence = SequenceService::new(db.clone());
        Self {
            db,
            sequence,
            event_sender,
        }
    }

    /// Paged listing; `search` matches company or contact person.
    pub async fn list(
        &self,
        search: Option<&str>,
        page: u64,
        per_page: u64,
    ) -> Result<(Vec<supplier::Model>, u64), ServiceError> {
        let mut query = supplier::Entity::find();

        if let Some(term) = search {
            query = query.filter(
                Condition::any()
                    .add(supplier::Column::Company.contains(term))
                    .add(supplier::Column::ContactPerson.contains(term)),
            );
        }

        let paginator = query
            .order_by_asc(supplier::Column::SupplierId)
            .paginate(self.db.as_ref(), per_page.max(1));
        let total = paginator.num_items().await?;
        let rows = paginator.fetch_page(page.saturating_sub(1)).await?;
        Ok((rows, total))
    }

    pub async fn get(&self, supplier_id: &str) -> Result<supplier::Model, ServiceError> {
        supplier::Entity::find()
            .filter(supplier::Column::SupplierId.eq(supplier_id))
            .one(self.db.as_ref())
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Supplier {} not found", supplier_id)))
    }

    #[instrument(skip(self, input), fields(company = %input.company))]
    pub async fn create(&self, input: NewSupplier) -> Result<supplier::Model, ServiceError> {
        let db = self.db.as_ref();
        let mut last_err: Option<ServiceError> = None;

        for attempt in 1..=ID_ALLOCATION_ATTEMPTS {
            let supplier_id = self.sequence.next_id(EntityKind::Supplier).await?;
            let model = supplier::ActiveModel {
                id: Set(Uuid::new_v4()),
                supplier_id: Set(supplier_id.clone()),
                company: Set(input.company.clone()),
                contact_person: Set(input.contact_person.clone()),
                email: Set(input.email.clone()),
                phone: Set(input.phone.clone()),
                address: Set(input.address.clone()),
                last_updated: Set(Utc::now()),
            };

            match model.insert(db).await {
                Ok(created) => {
                    self.event_sender
                        .send(Event::SupplierCreated {
                            supplier_id: created.supplier_id.clone(),
                        })
                        .await;
                    return Ok(created);
                }
                Err(e) if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
                    warn!(supplier_id = %supplier_id, attempt, "supplier id already taken, retrying allocation");
                    last_err = Some(ServiceError::DatabaseError(e));
                }
                Err(e) => return Err(ServiceError::DatabaseError(e)),
            }
        }

        Err(last_err
            .unwrap_or_else(|| ServiceError::InternalError("supplier id allocation failed".into())))
    }

    pub async fn update(
        &self,
        supplier_id: &str,
        changes: SupplierUpdate,
    ) -> Result<supplier::Model, ServiceError> {
        let existing = self.get(supplier_id).await?;
        let mut active: supplier::ActiveModel = existing.into();

        if let Some(company) = changes.company {
            active.company = Set(company);
        }
        if let Some(contact_person) = changes.contact_person {
            active.contact_person = Set(Some(contact_person));
        }
        if let Some(email) = changes.email {
            active.email = Set(Some(email));
        }
        if let Some(phone) = changes.phone {
            active.phone = Set(Some(phone));
        }
        if let Some(address) = changes.address {
            active.address = Set(Some(address));
        }
        active.last_updated = Set(Utc::now());

        let updated = active.update(self.db.as_ref()).await?;
        Ok(updated)
    }

    pub async fn delete(&self, supplier_id: &str) -> Result<(), ServiceError> {
        let existing = self.get(supplier_id).await?;
        existing.delete(self.db.as_ref()).await?;
        Ok(())
    }

    /// The supplier's offered product prices.
    pub async fn list_products(
        &self,
        supplier_id: &str,
    ) -> Result<Vec<supplier_product::Model>, ServiceError> {
        // Ensure the supplier exists so an empty result is unambiguous.
        self.get(supplier_id).await?;
        let rows = supplier_product::Entity::find()
            .filter(supplier_product::Column::SupplierId.eq(supplier_id))
            .all(self.db.as_ref())
            .await?;
        Ok(rows)
    }

    pub async fn add_product(
        &self,
        supplier_id: &str,
        product_id: &str,
        supplier_price: Decimal,
    ) -> Result<supplier_product::Model, ServiceError> {
        self.get(supplier_id).await?;
        let model = supplier_product::ActiveModel {
            id: Set(Uuid::new_v4()),
            supplier_id: Set(supplier_id.to_string()),
            product_id: Set(product_id.to_string()),
            supplier_price: Set(supplier_price),
        };
        let created = model.insert(self.db.as_ref()).await?;
        Ok(created)
    }

    pub async fn remove_product(
        &self,
        supplier_id: &str,
        product_id: &str,
    ) -> Result<(), ServiceError> {
        supplier_product::Entity::delete_many()
            .filter(supplier_product::Column::SupplierId.eq(supplier_id))
            .filter(supplier_product::Column::ProductId.eq(product_id))
            .exec(self.db.as_ref())
            .await?;
        Ok(())
    }
}

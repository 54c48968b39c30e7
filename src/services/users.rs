use std::sync::Arc;

use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, ModelTrait, QueryFilter, QueryOrder, Set, SqlErr,
};
use tracing::{instrument, warn};
use uuid::Uuid;

use crate::{
    db::DbPool,
    entities::user::{self, UserRole},
    errors::ServiceError,
    events::{Event, EventSender},
    services::sequence::{EntityKind, SequenceService},
};

const ID_ALLOCATION_ATTEMPTS: usize = 3;

#[derive(Clone)]
pub struct UserService {
    db: Arc<DbPool>,
    sequence: SequenceService,
    event_sender: Arc<EventSender>,
}

impl UserService {
    pub fn new(db: Arc<DbPool>, event_sender: Arc<EventSender>) -> Self {
        let sequence = SequenceService::new(db.clone());
        Self {
            db,
            sequence,
            event_sender,
        }
    }

    /// Listing with optional role filter and email substring search.
    pub async fn list(
        &self,
        role: Option<UserRole>,
        search: Option<&str>,
    ) -> Result<Vec<user::Model>, ServiceError> {
        let mut query = user::Entity::find();
        if let Some(role) = role {
            query = query.filter(user::Column::Role.eq(role.as_str()));
        }
        if let Some(term) = search {
            query = query.filter(user::Column::Email.contains(term));
        }
        let rows = query
            .order_by_asc(user::Column::UserId)
            .all(self.db.as_ref())
            .await?;
        Ok(rows)
    }

    pub async fn get(&self, user_id: &str) -> Result<user::Model, ServiceError> {
        user::Entity::find()
            .filter(user::Column::UserId.eq(user_id))
            .one(self.db.as_ref())
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("User {} not found", user_id)))
    }

    pub async fn get_by_email(&self, email: &str) -> Result<Option<user::Model>, ServiceError> {
        let normalized = normalize_email(email);
        let found = user::Entity::find()
            .filter(user::Column::Email.eq(normalized))
            .one(self.db.as_ref())
            .await?;
        Ok(found)
    }

    /// Provisions an account without credentials; the user sets a password
    /// on first login.
    #[instrument(skip(self), fields(email = %email, role = %role))]
    pub async fn create(&self, email: &str, role: UserRole) -> Result<user::Model, ServiceError> {
        let email = normalize_email(email);
        validate_email(&email)?;

        if self.get_by_email(&email).await?.is_some() {
            return Err(ServiceError::Conflict(
                "This email is already registered!".to_string(),
            ));
        }

        let db = self.db.as_ref();
        let mut last_err: Option<ServiceError> = None;

        for attempt in 1..=ID_ALLOCATION_ATTEMPTS {
            let user_id = self.sequence.next_id(EntityKind::User).await?;
            let model = user::ActiveModel {
                id: Set(Uuid::new_v4()),
                user_id: Set(user_id.clone()),
                email: Set(email.clone()),
                password_hash: Set(None),
                role: Set(role.as_str().to_string()),
                reset_token_hash: Set(None),
                reset_token_expires_at: Set(None),
                created_at: Set(chrono::Utc::now()),
            };

            match model.insert(db).await {
                Ok(created) => {
                    self.event_sender
                        .send(Event::UserCreated {
                            user_id: created.user_id.clone(),
                        })
                        .await;
                    return Ok(created);
                }
                Err(e) if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
                    warn!(user_id = %user_id, attempt, "user id already taken, retrying allocation");
                    last_err = Some(ServiceError::DatabaseError(e));
                }
                Err(e) => return Err(ServiceError::DatabaseError(e)),
            }
        }

        Err(last_err
            .unwrap_or_else(|| ServiceError::InternalError("user id allocation failed".into())))
    }

    pub async fn update(
        &self,
        user_id: &str,
        email: Option<&str>,
        role: Option<UserRole>,
    ) -> Result<user::Model, ServiceError> {
        let existing = self.get(user_id).await?;
        let mut active: user::ActiveModel = existing.clone().into();

        if let Some(email) = email {
            let normalized = normalize_email(email);
            validate_email(&normalized)?;
            if let Some(other) = self.get_by_email(&normalized).await? {
                if other.user_id != existing.user_id {
                    return Err(ServiceError::Conflict(format!(
                        "Email '{}' is already in use by another member.",
                        normalized
                    )));
                }
            }
            active.email = Set(normalized);
        }
        if let Some(role) = role {
            active.role = Set(role.as_str().to_string());
        }

        let updated = active.update(self.db.as_ref()).await?;
        Ok(updated)
    }

    pub async fn delete(&self, user_id: &str) -> Result<(), ServiceError> {
        let existing = self.get(user_id).await?;
        existing.delete(self.db.as_ref()).await?;
        Ok(())
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Minimal shape check: one '@', at least one alphanumeric in the local
/// part. Full RFC validation is deliberately not attempted.
fn validate_email(email: &str) -> Result<(), ServiceError> {
    let parts: Vec<&str> = email.split('@').collect();
    if parts.len() != 2 || parts[1].is_empty() {
        return Err(ServiceError::ValidationError(
            "Invalid email format".to_string(),
        ));
    }
    if !parts[0].chars().any(|c| c.is_alphanumeric()) {
        return Err(ServiceError::ValidationError(
            "Email must contain at least one letter or number before @".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emails_are_normalized_to_lowercase() {
        assert_eq!(normalize_email("  Staff@Example.COM "), "staff@example.com");
    }

    #[test]
    fn email_shape_is_checked() {
        assert!(validate_email("ops@example.com").is_ok());
        assert!(validate_email("no-at-sign").is_err());
        assert!(validate_email("a@b@c").is_err());
        assert!(validate_email("...@example.com").is_err());
        assert!(validate_email("x@").is_err());
    }
}

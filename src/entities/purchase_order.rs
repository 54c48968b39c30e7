use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter as StrumEnumIter, EnumString};
use uuid::Uuid;

/// Lifecycle states of a purchase order.
///
/// The full transition table lives in [`PurchaseOrderStatus::can_transition_to`];
/// every status change in the system goes through that single chokepoint.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, StrumEnumIter,
)]
pub enum PurchaseOrderStatus {
    Pending,
    Approved,
    Completed,
    Cancelled,
    Rejected,
}

impl PurchaseOrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PurchaseOrderStatus::Pending => "Pending",
            PurchaseOrderStatus::Approved => "Approved",
            PurchaseOrderStatus::Completed => "Completed",
            PurchaseOrderStatus::Cancelled => "Cancelled",
            PurchaseOrderStatus::Rejected => "Rejected",
        }
    }

    /// Terminal states admit no outgoing transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            PurchaseOrderStatus::Completed
                | PurchaseOrderStatus::Cancelled
                | PurchaseOrderStatus::Rejected
        )
    }

    /// Whether a remarks entry is mandatory when entering this state.
    pub fn requires_remarks(&self) -> bool {
        matches!(
            self,
            PurchaseOrderStatus::Cancelled | PurchaseOrderStatus::Rejected
        )
    }

    /// The one transition table. Same-status updates are permitted (no-op
    /// status-wise, remarks and timestamp still refresh).
    pub fn can_transition_to(&self, next: PurchaseOrderStatus) -> bool {
        use PurchaseOrderStatus::*;
        if *self == next {
            return true;
        }
        match (*self, next) {
            (Pending, Approved) | (Pending, Rejected) | (Pending, Cancelled) => true,
            (Approved, Completed) | (Approved, Cancelled) => true,
            _ => false,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "purchase_orders")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    /// Human-readable business key, format `PR####`
    #[sea_orm(unique)]
    pub po_id: String,
    pub supplier_id: String,
    /// Creator's business user id
    pub user_id: String,
    /// Stored as string, converted through [`PurchaseOrderStatus`]
    pub status: String,
    pub created_date: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
    pub remarks: Option<String>,
}

impl Model {
    pub fn status(&self) -> Result<PurchaseOrderStatus, crate::errors::ServiceError> {
        self.status.parse().map_err(|_| {
            crate::errors::ServiceError::InvalidStatus(format!(
                "purchase order {} has unknown status '{}'",
                self.po_id, self.status
            ))
        })
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::purchase_order_item::Entity")]
    Items,
}

impl Related<super::purchase_order_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Items.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    use super::PurchaseOrderStatus::*;

    #[test]
    fn pending_can_move_to_review_outcomes() {
        assert!(Pending.can_transition_to(Approved));
        assert!(Pending.can_transition_to(Rejected));
        assert!(Pending.can_transition_to(Cancelled));
        assert!(!Pending.can_transition_to(Completed));
    }

    #[test]
    fn approved_can_complete_or_cancel() {
        assert!(Approved.can_transition_to(Completed));
        assert!(Approved.can_transition_to(Cancelled));
        assert!(!Approved.can_transition_to(Rejected));
        assert!(!Approved.can_transition_to(Pending));
    }

    #[test]
    fn terminal_states_admit_nothing_but_themselves() {
        for terminal in [Completed, Cancelled, Rejected] {
            assert!(terminal.is_terminal());
            for next in [Pending, Approved, Completed, Cancelled, Rejected] {
                assert_eq!(terminal.can_transition_to(next), terminal == next);
            }
        }
    }

    #[test]
    fn remarks_are_required_for_cancel_and_reject() {
        assert!(Cancelled.requires_remarks());
        assert!(Rejected.requires_remarks());
        assert!(!Approved.requires_remarks());
        assert!(!Completed.requires_remarks());
    }
}

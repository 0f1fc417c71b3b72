//! Manual balance corrections. They bypass solvency checks and are kept as
//! an audit record.

use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;

use crate::MoneyCents;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExceptionnalMovement {
    pub id: i64,
    pub operator_id: i64,
    pub recipient_id: i64,
    /// Signed: positive credits the recipient, negative debits them.
    pub amount: MoneyCents,
    pub justification: String,
    pub created_at: DateTime<Utc>,
}

impl ExceptionnalMovement {
    pub fn is_credit(&self) -> bool {
        self.amount.is_positive()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "exceptionnal_movements")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub operator_id: i64,
    pub recipient_id: i64,
    pub amount: i64,
    pub justification: String,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for ExceptionnalMovement {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            operator_id: model.operator_id,
            recipient_id: model.recipient_id,
            amount: MoneyCents::new(model.amount),
            justification: model.justification,
            created_at: model.created_at,
        }
    }
}

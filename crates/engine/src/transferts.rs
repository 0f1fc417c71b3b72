//! Transfers between two users.

use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;

use crate::MoneyCents;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Transfert {
    pub id: i64,
    pub operator_id: i64,
    pub sender_id: i64,
    pub recipient_id: i64,
    pub amount: MoneyCents,
    pub justification: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "transferts")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub operator_id: i64,
    pub sender_id: i64,
    pub recipient_id: i64,
    pub amount: i64,
    pub justification: Option<String>,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for Transfert {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            operator_id: model.operator_id,
            sender_id: model.sender_id,
            recipient_id: model.recipient_id,
            amount: MoneyCents::new(model.amount),
            justification: model.justification,
            created_at: model.created_at,
        }
    }
}

//! Audit trail of every balance adjustment.
//!
//! A row is written in the same database transaction as the balance update
//! it describes.

use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;

use crate::{EngineError, MoneyCents};

/// Why a balance moved.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AdjustmentReason {
    Sale,
    TransferDebit,
    TransferCredit,
    ExceptionalMovement,
    SharedEvent,
    Manual,
}

impl AdjustmentReason {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Sale => "sale",
            Self::TransferDebit => "transfer_debit",
            Self::TransferCredit => "transfer_credit",
            Self::ExceptionalMovement => "exceptional_movement",
            Self::SharedEvent => "shared_event",
            Self::Manual => "manual",
        }
    }
}

impl TryFrom<&str> for AdjustmentReason {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "sale" => Ok(Self::Sale),
            "transfer_debit" => Ok(Self::TransferDebit),
            "transfer_credit" => Ok(Self::TransferCredit),
            "exceptional_movement" => Ok(Self::ExceptionalMovement),
            "shared_event" => Ok(Self::SharedEvent),
            "manual" => Ok(Self::Manual),
            other => Err(EngineError::InvalidInput(format!(
                "invalid adjustment reason: {other}"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LedgerEntry {
    pub id: i64,
    pub user_id: i64,
    pub delta: MoneyCents,
    pub balance_after: MoneyCents,
    pub reason: AdjustmentReason,
    /// Id of the sale, transfer, movement or event that caused the entry.
    pub reference_id: Option<i64>,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "ledger_entries")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub user_id: i64,
    pub delta: i64,
    pub balance_after: i64,
    pub reason: String,
    pub reference_id: Option<i64>,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::UserId",
        to = "super::users::Column::Id",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    Users,
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Users.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<Model> for LedgerEntry {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: model.id,
            user_id: model.user_id,
            delta: MoneyCents::new(model.delta),
            balance_after: MoneyCents::new(model.balance_after),
            reason: AdjustmentReason::try_from(model.reason.as_str())?,
            reference_id: model.reference_id,
            created_at: model.created_at,
        })
    }
}

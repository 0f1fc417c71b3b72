//! Sales: immutable records of what a client bought, at which price.

use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;

use crate::{EngineError, MoneyCents, ModuleKind, sale_products};

/// A committed sale with the lines captured at sale time.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Sale {
    pub id: i64,
    pub shop_id: i64,
    pub module: ModuleKind,
    /// User who entered the sale.
    pub operator_id: i64,
    /// Client whose balance was debited.
    pub sender_id: i64,
    pub amount: MoneyCents,
    pub created_at: DateTime<Utc>,
    pub lines: Vec<SaleLine>,
}

/// One product line of a sale.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SaleLine {
    pub product_id: i64,
    pub quantity: i64,
    pub unit_price: MoneyCents,
    pub price: MoneyCents,
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "sales")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub shop_id: i64,
    pub module: String,
    pub operator_id: i64,
    pub sender_id: i64,
    pub amount: i64,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::sale_products::Entity")]
    SaleProducts,
}

impl Related<super::sale_products::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SaleProducts.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<(Model, Vec<sale_products::Model>)> for Sale {
    type Error = EngineError;

    fn try_from((model, lines): (Model, Vec<sale_products::Model>)) -> Result<Self, Self::Error> {
        Ok(Self {
            id: model.id,
            shop_id: model.shop_id,
            module: ModuleKind::try_from(model.module.as_str())?,
            operator_id: model.operator_id,
            sender_id: model.sender_id,
            amount: MoneyCents::new(model.amount),
            created_at: model.created_at,
            lines: lines.into_iter().map(SaleLine::from).collect(),
        })
    }
}

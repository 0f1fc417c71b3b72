//! Sale lines. Prices are captured when the sale is committed and never
//! recomputed.

use sea_orm::entity::prelude::*;

use crate::{MoneyCents, SaleLine};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "sale_products")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub sale_id: i64,
    pub product_id: i64,
    pub quantity: i64,
    pub unit_price: i64,
    pub price: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::sales::Entity",
        from = "Column::SaleId",
        to = "super::sales::Column::Id",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    Sales,
}

impl Related<super::sales::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Sales.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for SaleLine {
    fn from(model: Model) -> Self {
        Self {
            product_id: model.product_id,
            quantity: model.quantity,
            unit_price: MoneyCents::new(model.unit_price),
            price: MoneyCents::new(model.price),
        }
    }
}

//! Sale modules of a shop.
//!
//! Each shop has one self-sale module (the client serves themselves) and
//! one operator-sale module (a shop operator sells to a chosen client).

use sea_orm::entity::prelude::*;

use crate::{Capability, EngineError, MoneyCents};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ModuleKind {
    SelfSale,
    OperatorSale,
}

impl ModuleKind {
    pub const ALL: [ModuleKind; 2] = [Self::SelfSale, Self::OperatorSale];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::SelfSale => "self_sale",
            Self::OperatorSale => "operator_sale",
        }
    }

    /// Capability the acting user needs to use the module.
    pub fn capability(self) -> Capability {
        match self {
            Self::SelfSale => Capability::UseSelfSaleModule,
            Self::OperatorSale => Capability::UseOperatorSaleModule,
        }
    }
}

impl TryFrom<&str> for ModuleKind {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "self_sale" => Ok(Self::SelfSale),
            "operator_sale" => Ok(Self::OperatorSale),
            other => Err(EngineError::InvalidInput(format!(
                "invalid sale module: {other}"
            ))),
        }
    }
}

/// Configuration of a sale module.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ModuleConfig {
    pub enabled: bool,
    /// Maximum amount of a single order, if any.
    pub limit_purchase: Option<MoneyCents>,
    pub logout_post_purchase: bool,
    /// Seconds the order summary stays on screen, `None` means forever.
    pub delay_post_purchase: Option<i64>,
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "sale_modules")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub shop_id: i64,
    #[sea_orm(primary_key, auto_increment = false)]
    pub kind: String,
    pub enabled: bool,
    pub limit_purchase: Option<i64>,
    pub logout_post_purchase: bool,
    pub delay_post_purchase: Option<i64>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::shops::Entity",
        from = "Column::ShopId",
        to = "super::shops::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Shops,
}

impl Related<super::shops::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Shops.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Model> for ModuleConfig {
    fn from(model: &Model) -> Self {
        Self {
            enabled: model.enabled,
            limit_purchase: model.limit_purchase.map(MoneyCents::new),
            logout_post_purchase: model.logout_post_purchase,
            delay_post_purchase: model.delay_post_purchase,
        }
    }
}

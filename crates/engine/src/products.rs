//! The module contains `Product` and its pricing rules.
//!
//! A product is sold either at a manual price or at its "moded usual"
//! price: the base price corrected by a factor stored in thousandths.

use sea_orm::entity::prelude::*;

use crate::{EngineError, MoneyCents, ResultEngine};

/// Unit a product is measured in.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Unit {
    #[default]
    Unit,
    Centiliter,
    Gram,
}

impl Unit {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unit => "unit",
            Self::Centiliter => "cl",
            Self::Gram => "g",
        }
    }

    /// Unit used when quantities are shown in bulk (`L`, `Kg`).
    pub fn upper_display(self) -> &'static str {
        match self {
            Self::Unit => "unit",
            Self::Centiliter => "L",
            Self::Gram => "Kg",
        }
    }
}

impl TryFrom<&str> for Unit {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "unit" => Ok(Self::Unit),
            "cl" => Ok(Self::Centiliter),
            "g" => Ok(Self::Gram),
            other => Err(EngineError::InvalidInput(format!("invalid unit: {other}"))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Product {
    pub id: i64,
    pub shop_id: i64,
    pub name: String,
    pub unit: Unit,
    pub is_manual: bool,
    pub manual_price: Option<MoneyCents>,
    pub base_price: MoneyCents,
    /// Correcting factor in thousandths, `1000` means no correction.
    pub correcting_factor: i64,
    pub stock: i64,
    pub is_active: bool,
    pub is_removed: bool,
}

impl Product {
    /// Price charged for one unit right now.
    pub fn unit_price(&self) -> ResultEngine<MoneyCents> {
        if self.is_manual {
            return Ok(self.manual_price.unwrap_or(MoneyCents::ZERO));
        }
        self.base_price
            .scale_permille(self.correcting_factor)
            .ok_or_else(|| EngineError::InvalidAmount("price too large".to_string()))
    }

    /// Checks the product can be put in an order.
    pub fn ensure_sellable(&self) -> ResultEngine<MoneyCents> {
        if !self.is_active || self.is_removed {
            return Err(EngineError::InvalidProduct(format!(
                "{} is not on sale",
                self.name
            )));
        }
        if self.stock <= 0 {
            return Err(EngineError::InvalidProduct(format!(
                "{} is out of stock",
                self.name
            )));
        }
        let price = self.unit_price()?;
        if !price.is_positive() {
            return Err(EngineError::InvalidProduct(format!(
                "{} has no price",
                self.name
            )));
        }
        Ok(price)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "products")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub shop_id: i64,
    pub name: String,
    pub unit: String,
    pub is_manual: bool,
    pub manual_price: Option<i64>,
    pub base_price: i64,
    pub correcting_factor: i64,
    pub stock: i64,
    pub is_active: bool,
    pub is_removed: bool,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::shops::Entity",
        from = "Column::ShopId",
        to = "super::shops::Column::Id",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    Shops,
}

impl Related<super::shops::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Shops.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<Model> for Product {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: model.id,
            shop_id: model.shop_id,
            name: model.name,
            unit: Unit::try_from(model.unit.as_str())?,
            is_manual: model.is_manual,
            manual_price: model.manual_price.map(MoneyCents::new),
            base_price: MoneyCents::new(model.base_price),
            correcting_factor: model.correcting_factor,
            stock: model.stock,
            is_active: model.is_active,
            is_removed: model.is_removed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product() -> Product {
        Product {
            id: 1,
            shop_id: 1,
            name: "skoll".to_string(),
            unit: Unit::Unit,
            is_manual: false,
            manual_price: None,
            base_price: MoneyCents::new(150),
            correcting_factor: 1_000,
            stock: 10,
            is_active: true,
            is_removed: false,
        }
    }

    #[test]
    fn computed_price_applies_correcting_factor() {
        let mut p = product();
        assert_eq!(p.unit_price().unwrap(), MoneyCents::new(150));
        p.correcting_factor = 1_100;
        assert_eq!(p.unit_price().unwrap(), MoneyCents::new(165));
    }

    #[test]
    fn manual_price_wins_over_base_price() {
        let mut p = product();
        p.is_manual = true;
        p.manual_price = Some(MoneyCents::new(200));
        assert_eq!(p.unit_price().unwrap(), MoneyCents::new(200));
        p.manual_price = None;
        assert_eq!(p.unit_price().unwrap(), MoneyCents::ZERO);
    }

    #[test]
    fn unsellable_products_are_rejected() {
        let mut p = product();
        p.stock = 0;
        assert!(matches!(
            p.ensure_sellable(),
            Err(EngineError::InvalidProduct(_))
        ));

        let mut p = product();
        p.base_price = MoneyCents::ZERO;
        assert!(matches!(
            p.ensure_sellable(),
            Err(EngineError::InvalidProduct(_))
        ));

        let mut p = product();
        p.is_removed = true;
        assert!(matches!(
            p.ensure_sellable(),
            Err(EngineError::InvalidProduct(_))
        ));
    }

    #[test]
    fn unit_displays() {
        assert_eq!(Unit::Centiliter.as_str(), "cl");
        assert_eq!(Unit::Centiliter.upper_display(), "L");
        assert_eq!(Unit::Gram.upper_display(), "Kg");
        assert_eq!(Unit::Unit.upper_display(), "unit");
        assert_eq!(Unit::try_from("g").unwrap(), Unit::Gram);
        assert!(Unit::try_from("kg").is_err());
    }
}

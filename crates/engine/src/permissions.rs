//! Permissions table.
//!
//! A permission is a capability keyed by its codename. Permissions flagged
//! `human_usable = false` exist for bookkeeping but are never offered when a
//! group is managed.

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Permission {
    pub id: i64,
    pub codename: String,
    pub name: String,
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "permissions")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    #[sea_orm(unique)]
    pub codename: String,
    pub name: String,
    pub human_usable: bool,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::group_permissions::Entity")]
    GroupPermissions,
}

impl Related<super::group_permissions::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::GroupPermissions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for Permission {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            codename: model.codename,
            name: model.name,
        }
    }
}

//! Groups table.
//!
//! Shop groups come in pairs named `chiefs-<shop>` and `associates-<shop>`.

use sea_orm::entity::prelude::*;

const CHIEFS_PREFIX: &str = "chiefs-";
const ASSOCIATES_PREFIX: &str = "associates-";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Group {
    pub id: i64,
    pub name: String,
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "groups")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    #[sea_orm(unique)]
    pub name: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::user_groups::Entity")]
    UserGroups,
    #[sea_orm(has_many = "super::group_permissions::Entity")]
    GroupPermissions,
}

impl Related<super::user_groups::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::UserGroups.def()
    }
}

impl Related<super::group_permissions::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::GroupPermissions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for Group {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
        }
    }
}

/// Name of the chiefs group of a shop.
pub fn chiefs_group_name(shop_name: &str) -> String {
    format!("{CHIEFS_PREFIX}{shop_name}")
}

/// Name of the associates group of a shop.
pub fn associates_group_name(shop_name: &str) -> String {
    format!("{ASSOCIATES_PREFIX}{shop_name}")
}

/// For `associates-<shop>` returns `chiefs-<shop>`.
pub fn chiefs_of_associates(group_name: &str) -> Option<String> {
    group_name
        .strip_prefix(ASSOCIATES_PREFIX)
        .filter(|shop| !shop.is_empty())
        .map(chiefs_group_name)
}

/// Shop a `chiefs-<shop>` or `associates-<shop>` group belongs to.
pub fn shop_of_group(group_name: &str) -> Option<&str> {
    group_name
        .strip_prefix(CHIEFS_PREFIX)
        .or_else(|| group_name.strip_prefix(ASSOCIATES_PREFIX))
        .filter(|shop| !shop.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shop_groups_name_their_shop() {
        assert_eq!(shop_of_group("chiefs-pi"), Some("pi"));
        assert_eq!(shop_of_group("associates-bar"), Some("bar"));
        assert_eq!(shop_of_group("presidents"), None);
        assert_eq!(shop_of_group("chiefs-"), None);
    }

    #[test]
    fn associates_map_to_their_chiefs() {
        assert_eq!(
            chiefs_of_associates("associates-pi"),
            Some("chiefs-pi".to_string())
        );
        assert_eq!(chiefs_of_associates("chiefs-pi"), None);
        assert_eq!(chiefs_of_associates("associates-"), None);
        assert_eq!(chiefs_of_associates("members"), None);
    }
}

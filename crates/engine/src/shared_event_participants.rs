//! Participants of a shared event and their weight.

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "shared_event_participants")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub event_id: i64,
    #[sea_orm(primary_key, auto_increment = false)]
    pub user_id: i64,
    pub weight: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::shared_events::Entity",
        from = "Column::EventId",
        to = "super::shared_events::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    SharedEvents,
}

impl Related<super::shared_events::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SharedEvents.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

//! Users table and the `User` snapshot handed out by the engine.
//!
//! `balance` is the single source of truth for spendable credit. It is only
//! ever written by the ledger (`ops::ledger`), never by profile updates.

use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;

use crate::MoneyCents;

/// A member of the cooperative with their wallet.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    /// Nickname ("bucque").
    pub surname: Option<String>,
    /// Family affiliation ("fam's"), may hold several tokens.
    pub family: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub campus: Option<String>,
    pub year: Option<i32>,
    pub theme: Option<String>,
    pub balance: MoneyCents,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    #[sea_orm(unique)]
    pub username: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub surname: Option<String>,
    pub family: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub campus: Option<String>,
    pub year: Option<i32>,
    pub theme: Option<String>,
    pub balance: i64,
    pub is_active: bool,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::user_groups::Entity")]
    UserGroups,
    #[sea_orm(has_many = "super::ledger_entries::Entity")]
    LedgerEntries,
}

impl Related<super::user_groups::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::UserGroups.def()
    }
}

impl Related<super::ledger_entries::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::LedgerEntries.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for User {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            username: model.username,
            first_name: model.first_name,
            last_name: model.last_name,
            surname: model.surname,
            family: model.family,
            email: model.email,
            phone: model.phone,
            campus: model.campus,
            year: model.year,
            theme: model.theme,
            balance: MoneyCents::new(model.balance),
            is_active: model.is_active,
            created_at: model.created_at,
        }
    }
}

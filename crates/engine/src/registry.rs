//! Reserved groups, resolved by name once when the engine is built.

use sea_orm::{ConnectionTrait, QueryFilter, prelude::*};

use crate::{EngineError, ResultEngine, groups};

/// Groups with a fixed role in the cooperative.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ReservedGroup {
    /// Users outside the cooperative. Hidden from listings.
    Externals,
    Members,
    /// Protected category: deactivation collapses their memberships.
    Specials,
    Presidents,
}

impl ReservedGroup {
    pub const ALL: [ReservedGroup; 4] = [
        Self::Externals,
        Self::Members,
        Self::Specials,
        Self::Presidents,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::Externals => "externals",
            Self::Members => "members",
            Self::Specials => "specials",
            Self::Presidents => "presidents",
        }
    }
}

/// Database ids of the reserved groups.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Registry {
    externals: i64,
    members: i64,
    specials: i64,
    presidents: i64,
}

impl Registry {
    pub(crate) async fn load<C: ConnectionTrait>(db: &C) -> ResultEngine<Self> {
        let names: Vec<&str> = ReservedGroup::ALL.iter().map(|g| g.name()).collect();
        let rows = groups::Entity::find()
            .filter(groups::Column::Name.is_in(names))
            .all(db)
            .await?;

        let lookup = |group: ReservedGroup| {
            rows.iter()
                .find(|row| row.name == group.name())
                .map(|row| row.id)
                .ok_or_else(|| EngineError::GroupNotFound(group.name().to_string()))
        };

        Ok(Self {
            externals: lookup(ReservedGroup::Externals)?,
            members: lookup(ReservedGroup::Members)?,
            specials: lookup(ReservedGroup::Specials)?,
            presidents: lookup(ReservedGroup::Presidents)?,
        })
    }

    pub fn id(&self, group: ReservedGroup) -> i64 {
        match group {
            ReservedGroup::Externals => self.externals,
            ReservedGroup::Members => self.members,
            ReservedGroup::Specials => self.specials,
            ReservedGroup::Presidents => self.presidents,
        }
    }
}

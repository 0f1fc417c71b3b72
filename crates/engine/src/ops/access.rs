use sea_orm::{ConnectionTrait, QueryFilter, QuerySelect, prelude::*};

use crate::{
    Capability, EngineError, ReservedGroup, ResultEngine, group_permissions, groups,
    permissions, shops, user_groups, users,
};

use super::Engine;

/// Outcome of a capability check.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Access {
    Allow,
    Deny { capability: Capability },
}

impl Access {
    pub fn is_allowed(self) -> bool {
        matches!(self, Self::Allow)
    }

    /// Turns a deny into `PermissionDenied` naming the missing capability.
    pub fn into_result(self) -> ResultEngine<()> {
        match self {
            Self::Allow => Ok(()),
            Self::Deny { capability } => Err(EngineError::PermissionDenied(format!(
                "missing capability {capability}"
            ))),
        }
    }
}

impl Engine {
    /// Whether `user_id` holds `capability` through one of their groups.
    /// Inactive or unknown users are denied.
    pub async fn check(&self, user_id: i64, capability: Capability) -> ResultEngine<Access> {
        self.access(&self.database, user_id, capability).await
    }

    /// Allows `requester_id` to read data about `target_id` when they are
    /// the same user or the requester holds `capability`.
    pub async fn authorize_self_or(
        &self,
        requester_id: i64,
        target_id: i64,
        capability: Capability,
    ) -> ResultEngine<()> {
        if requester_id == target_id {
            self.require_active_user(&self.database, requester_id)
                .await
                .map(|_| ())
        } else {
            self.check(requester_id, capability).await?.into_result()
        }
    }

    pub(super) async fn access<C: ConnectionTrait>(
        &self,
        db: &C,
        user_id: i64,
        capability: Capability,
    ) -> ResultEngine<Access> {
        self.scoped_access(db, user_id, capability, None).await
    }

    /// Like `access`, but grants held through the chiefs or associates
    /// group of another shop do not count.
    async fn scoped_access<C: ConnectionTrait>(
        &self,
        db: &C,
        user_id: i64,
        capability: Capability,
        shop_name: Option<&str>,
    ) -> ResultEngine<Access> {
        let active = users::Entity::find_by_id(user_id)
            .one(db)
            .await?
            .is_some_and(|user| user.is_active);
        if active && holds_codename(db, user_id, capability.codename(), shop_name).await? {
            Ok(Access::Allow)
        } else {
            Ok(Access::Deny { capability })
        }
    }

    pub(super) async fn require<C: ConnectionTrait>(
        &self,
        db: &C,
        user_id: i64,
        capability: Capability,
    ) -> ResultEngine<()> {
        let access = self.access(db, user_id, capability).await?;
        if let Access::Deny { capability } = access {
            tracing::debug!(user_id, %capability, "access denied");
        }
        access.into_result()
    }

    /// Requires `capability` for an operation on `shop_id`.
    pub(super) async fn require_in_shop<C: ConnectionTrait>(
        &self,
        db: &C,
        user_id: i64,
        shop_id: i64,
        capability: Capability,
    ) -> ResultEngine<()> {
        let shop = shops::Entity::find_by_id(shop_id)
            .one(db)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("shop not exists".to_string()))?;
        let access = self
            .scoped_access(db, user_id, capability, Some(&shop.name))
            .await?;
        if let Access::Deny { capability } = access {
            tracing::debug!(user_id, shop_id, %capability, "access denied");
        }
        access.into_result()
    }

    pub(super) async fn require_user<C: ConnectionTrait>(
        &self,
        db: &C,
        user_id: i64,
    ) -> ResultEngine<users::Model> {
        users::Entity::find_by_id(user_id)
            .one(db)
            .await?
            .ok_or_else(|| EngineError::UserNotFound(user_id.to_string()))
    }

    pub(super) async fn require_active_user<C: ConnectionTrait>(
        &self,
        db: &C,
        user_id: i64,
    ) -> ResultEngine<users::Model> {
        let user = self.require_user(db, user_id).await?;
        if !user.is_active {
            return Err(EngineError::UserNotFound(format!(
                "{} is inactive",
                user.username
            )));
        }
        Ok(user)
    }

    pub(super) async fn require_group<C: ConnectionTrait>(
        &self,
        db: &C,
        group_id: i64,
    ) -> ResultEngine<groups::Model> {
        groups::Entity::find_by_id(group_id)
            .one(db)
            .await?
            .ok_or_else(|| EngineError::GroupNotFound(group_id.to_string()))
    }

    pub(super) async fn is_member<C: ConnectionTrait>(
        &self,
        db: &C,
        user_id: i64,
        group_id: i64,
    ) -> ResultEngine<bool> {
        user_groups::Entity::find_by_id((user_id, group_id))
            .one(db)
            .await
            .map(|model| model.is_some())
            .map_err(Into::into)
    }

    pub(super) async fn is_reserved_member<C: ConnectionTrait>(
        &self,
        db: &C,
        user_id: i64,
        group: ReservedGroup,
    ) -> ResultEngine<bool> {
        self.is_member(db, user_id, self.registry.id(group)).await
    }
}

/// With `shop_name`, only groups that are not bound to a shop or that
/// belong to that shop are considered.
async fn holds_codename<C: ConnectionTrait>(
    db: &C,
    user_id: i64,
    codename: &str,
    shop_name: Option<&str>,
) -> ResultEngine<bool> {
    let mut group_ids: Vec<i64> = user_groups::Entity::find()
        .select_only()
        .column(user_groups::Column::GroupId)
        .filter(user_groups::Column::UserId.eq(user_id))
        .into_tuple()
        .all(db)
        .await?;
    if let Some(shop_name) = shop_name
        && !group_ids.is_empty()
    {
        group_ids = groups::Entity::find()
            .filter(groups::Column::Id.is_in(group_ids))
            .all(db)
            .await?
            .into_iter()
            .filter(|group| groups::shop_of_group(&group.name).is_none_or(|shop| shop == shop_name))
            .map(|group| group.id)
            .collect();
    }
    if group_ids.is_empty() {
        return Ok(false);
    }
    group_holds_codename(db, group_ids, codename).await
}

/// Whether one of `group_ids` holds the permission `codename`.
pub(super) async fn group_holds_codename<C: ConnectionTrait>(
    db: &C,
    group_ids: Vec<i64>,
    codename: &str,
) -> ResultEngine<bool> {
    group_permissions::Entity::find()
        .inner_join(permissions::Entity)
        .filter(group_permissions::Column::GroupId.is_in(group_ids))
        .filter(permissions::Column::Codename.eq(codename))
        .one(db)
        .await
        .map(|model| model.is_some())
        .map_err(Into::into)
}

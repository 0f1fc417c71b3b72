use std::collections::BTreeSet;

use sea_orm::{
    ActiveValue, ConnectionTrait, QueryFilter, QueryOrder, QuerySelect, TransactionTrait,
    prelude::*, sea_query::OnConflict,
};

use crate::{
    EngineError, Group, GroupUpdateCmd, Permission, ReservedGroup, ResultEngine, User,
    group_permissions, groups, locks::LockKey, manage_group_codename, permissions, user_groups,
    users,
};

use super::{Engine, access::group_holds_codename, with_tx};

/// What an actor group sees when it manages a target group.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GroupState {
    pub group: Group,
    pub members: Vec<i64>,
    pub permissions: Vec<i64>,
    /// Permissions the target group may be granted.
    pub offered_permissions: Vec<Permission>,
    /// Users that may be added to the target group.
    pub possible_members: Vec<User>,
}

/// Differences applied by a group update.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GroupUpdateSummary {
    pub added_members: Vec<i64>,
    pub removed_members: Vec<i64>,
    pub added_permissions: Vec<i64>,
    pub removed_permissions: Vec<i64>,
}

impl GroupUpdateSummary {
    pub fn is_empty(&self) -> bool {
        self.added_members.is_empty()
            && self.removed_members.is_empty()
            && self.added_permissions.is_empty()
            && self.removed_permissions.is_empty()
    }
}

impl Engine {
    /// `true` iff `actor_group` holds `manage_<target>_group`.
    pub async fn can_manage(&self, actor_group_id: i64, target_group_id: i64) -> ResultEngine<bool> {
        self.require_group(&self.database, actor_group_id).await?;
        let target = self.require_group(&self.database, target_group_id).await?;
        can_manage_in(&self.database, actor_group_id, &target).await
    }

    pub async fn group_by_name(&self, name: &str) -> ResultEngine<Group> {
        groups::Entity::find()
            .filter(groups::Column::Name.eq(name.trim()))
            .one(&self.database)
            .await?
            .map(Group::from)
            .ok_or_else(|| EngineError::GroupNotFound(name.to_string()))
    }

    /// Groups a user belongs to, by name.
    pub async fn groups_of(&self, user_id: i64) -> ResultEngine<Vec<Group>> {
        self.require_user(&self.database, user_id).await?;
        let group_ids: Vec<i64> = user_groups::Entity::find()
            .select_only()
            .column(user_groups::Column::GroupId)
            .filter(user_groups::Column::UserId.eq(user_id))
            .into_tuple()
            .all(&self.database)
            .await?;
        Ok(groups::Entity::find()
            .filter(groups::Column::Id.is_in(group_ids))
            .order_by_asc(groups::Column::Name)
            .all(&self.database)
            .await?
            .into_iter()
            .map(Group::from)
            .collect())
    }

    /// Current members and permissions of `target_group`, with what may be
    /// offered to it, as seen by a member of `actor_group`.
    pub async fn group_state(
        &self,
        acting_user_id: i64,
        actor_group_id: i64,
        target_group_id: i64,
    ) -> ResultEngine<GroupState> {
        let target = self
            .require_manager(&self.database, acting_user_id, actor_group_id, target_group_id)
            .await?;

        let members = group_member_ids(&self.database, target.id).await?;
        let permissions = group_permission_ids(&self.database, target.id).await?;
        let offered_permissions = offered_permissions(&self.database, &target).await?;
        let possible_members = self
            .possible_members(&self.database)
            .await?
            .into_iter()
            .map(User::from)
            .collect();

        Ok(GroupState {
            group: Group::from(target),
            members: members.into_iter().collect(),
            permissions: permissions.into_iter().collect(),
            offered_permissions,
            possible_members,
        })
    }

    /// Brings the members and permissions of the target group to the
    /// requested sets by applying only the differences.
    ///
    /// The right to manage the target is checked in the same transaction
    /// as the writes. A difference that no longer applies (row already
    /// inserted or removed elsewhere) fails with `StaleGroupState`.
    pub async fn apply_group_update(&self, cmd: GroupUpdateCmd) -> ResultEngine<GroupUpdateSummary> {
        let _locks = self
            .locks
            .acquire([LockKey::Group(cmd.target_group_id)])
            .await?;
        let summary = self
            .commit_group_update(&cmd)
            .await
            .inspect_err(|err| tracing::debug!(%err, "group update rejected"))?;
        if !summary.is_empty() {
            tracing::info!(
                actor_group_id = cmd.actor_group_id,
                target_group_id = cmd.target_group_id,
                added_members = ?summary.added_members,
                removed_members = ?summary.removed_members,
                added_permissions = ?summary.added_permissions,
                removed_permissions = ?summary.removed_permissions,
                "group updated"
            );
        }
        Ok(summary)
    }

    async fn commit_group_update(&self, cmd: &GroupUpdateCmd) -> ResultEngine<GroupUpdateSummary> {
        with_tx!(self, |db_tx| {
            let target = self
                .require_manager(
                    &db_tx,
                    cmd.acting_user_id,
                    cmd.actor_group_id,
                    cmd.target_group_id,
                )
                .await?;

            let current_members = group_member_ids(&db_tx, target.id).await?;
            let current_permissions = group_permission_ids(&db_tx, target.id).await?;
            let desired_members: BTreeSet<i64> = cmd.members.iter().copied().collect();
            let desired_permissions: BTreeSet<i64> = cmd.permissions.iter().copied().collect();

            let summary = GroupUpdateSummary {
                added_members: desired_members.difference(&current_members).copied().collect(),
                removed_members: current_members.difference(&desired_members).copied().collect(),
                added_permissions: desired_permissions
                    .difference(&current_permissions)
                    .copied()
                    .collect(),
                removed_permissions: current_permissions
                    .difference(&desired_permissions)
                    .copied()
                    .collect(),
            };

            if !summary.added_permissions.is_empty() {
                let offered: BTreeSet<i64> = offered_permissions(&db_tx, &target)
                    .await?
                    .into_iter()
                    .map(|permission| permission.id)
                    .collect();
                if let Some(refused) = summary
                    .added_permissions
                    .iter()
                    .find(|permission_id| !offered.contains(permission_id))
                {
                    return Err(EngineError::PermissionDenied(format!(
                        "permission {refused} cannot be granted to {}",
                        target.name
                    )));
                }
            }
            for user_id in &summary.added_members {
                self.require_eligible_member(&db_tx, *user_id, &target).await?;
            }

            for user_id in &summary.added_members {
                let inserted = user_groups::Entity::insert(user_groups::ActiveModel {
                    user_id: ActiveValue::Set(*user_id),
                    group_id: ActiveValue::Set(target.id),
                })
                .on_conflict(
                    OnConflict::columns([user_groups::Column::UserId, user_groups::Column::GroupId])
                        .do_nothing()
                        .to_owned(),
                )
                .exec_without_returning(&db_tx)
                .await?;
                if inserted == 0 {
                    return Err(stale(&target, "member", *user_id, "added"));
                }
            }
            for user_id in &summary.removed_members {
                let deleted = user_groups::Entity::delete_many()
                    .filter(user_groups::Column::UserId.eq(*user_id))
                    .filter(user_groups::Column::GroupId.eq(target.id))
                    .exec(&db_tx)
                    .await?;
                if deleted.rows_affected == 0 {
                    return Err(stale(&target, "member", *user_id, "removed"));
                }
            }
            for permission_id in &summary.added_permissions {
                let inserted = group_permissions::Entity::insert(group_permissions::ActiveModel {
                    group_id: ActiveValue::Set(target.id),
                    permission_id: ActiveValue::Set(*permission_id),
                })
                .on_conflict(
                    OnConflict::columns([
                        group_permissions::Column::GroupId,
                        group_permissions::Column::PermissionId,
                    ])
                    .do_nothing()
                    .to_owned(),
                )
                .exec_without_returning(&db_tx)
                .await?;
                if inserted == 0 {
                    return Err(stale(&target, "permission", *permission_id, "added"));
                }
            }
            for permission_id in &summary.removed_permissions {
                let deleted = group_permissions::Entity::delete_many()
                    .filter(group_permissions::Column::GroupId.eq(target.id))
                    .filter(group_permissions::Column::PermissionId.eq(*permission_id))
                    .exec(&db_tx)
                    .await?;
                if deleted.rows_affected == 0 {
                    return Err(stale(&target, "permission", *permission_id, "removed"));
                }
            }

            Ok(summary)
        })
    }

    /// Checks that `acting_user` belongs to `actor_group` and that this group
    /// may manage the target. Returns the target group.
    async fn require_manager<C: ConnectionTrait>(
        &self,
        db: &C,
        acting_user_id: i64,
        actor_group_id: i64,
        target_group_id: i64,
    ) -> ResultEngine<groups::Model> {
        let actor = self.require_group(db, actor_group_id).await?;
        let target = self.require_group(db, target_group_id).await?;
        self.require_active_user(db, acting_user_id).await?;
        if !self.is_member(db, acting_user_id, actor.id).await? {
            return Err(EngineError::PermissionDenied(format!(
                "user {acting_user_id} is not a member of {}",
                actor.name
            )));
        }
        if !can_manage_in(db, actor.id, &target).await? {
            return Err(EngineError::PermissionDenied(format!(
                "{} cannot manage {}",
                actor.name, target.name
            )));
        }
        Ok(target)
    }

    /// Active users outside the externals group.
    async fn possible_members<C: ConnectionTrait>(&self, db: &C) -> ResultEngine<Vec<users::Model>> {
        let externals = self.external_ids(db).await?;
        users::Entity::find()
            .filter(users::Column::IsActive.eq(true))
            .filter(users::Column::Id.is_not_in(externals))
            .order_by_asc(users::Column::Username)
            .all(db)
            .await
            .map_err(Into::into)
    }

    pub(super) async fn external_ids<C: ConnectionTrait>(&self, db: &C) -> ResultEngine<Vec<i64>> {
        group_member_ids(db, self.registry.id(ReservedGroup::Externals))
            .await
            .map(|ids| ids.into_iter().collect())
    }

    async fn require_eligible_member<C: ConnectionTrait>(
        &self,
        db: &C,
        user_id: i64,
        target: &groups::Model,
    ) -> ResultEngine<()> {
        let user = self.require_user(db, user_id).await?;
        let external = self
            .is_reserved_member(db, user_id, ReservedGroup::Externals)
            .await?;
        if !user.is_active || external {
            return Err(EngineError::PermissionDenied(format!(
                "{} cannot join {}",
                user.username, target.name
            )));
        }
        Ok(())
    }
}

fn stale(target: &groups::Model, kind: &str, id: i64, action: &str) -> EngineError {
    EngineError::StaleGroupState(format!(
        "{kind} {id} of {} was already {action}",
        target.name
    ))
}

async fn can_manage_in<C: ConnectionTrait>(
    db: &C,
    actor_group_id: i64,
    target: &groups::Model,
) -> ResultEngine<bool> {
    group_holds_codename(db, vec![actor_group_id], &manage_group_codename(&target.name)).await
}

pub(super) async fn group_member_ids<C: ConnectionTrait>(
    db: &C,
    group_id: i64,
) -> ResultEngine<BTreeSet<i64>> {
    let ids: Vec<i64> = user_groups::Entity::find()
        .select_only()
        .column(user_groups::Column::UserId)
        .filter(user_groups::Column::GroupId.eq(group_id))
        .into_tuple()
        .all(db)
        .await?;
    Ok(ids.into_iter().collect())
}

async fn group_permission_ids<C: ConnectionTrait>(
    db: &C,
    group_id: i64,
) -> ResultEngine<BTreeSet<i64>> {
    let ids: Vec<i64> = group_permissions::Entity::find()
        .select_only()
        .column(group_permissions::Column::PermissionId)
        .filter(group_permissions::Column::GroupId.eq(group_id))
        .into_tuple()
        .all(db)
        .await?;
    Ok(ids.into_iter().collect())
}

/// Permissions that may be granted to `target`.
///
/// An associates group is restricted to what its chiefs group holds. No
/// group is ever offered the permission to manage itself, nor a permission
/// that is not human usable.
async fn offered_permissions<C: ConnectionTrait>(
    db: &C,
    target: &groups::Model,
) -> ResultEngine<Vec<Permission>> {
    let self_management = manage_group_codename(&target.name);
    let mut query = permissions::Entity::find()
        .filter(permissions::Column::HumanUsable.eq(true))
        .filter(permissions::Column::Codename.ne(self_management));

    if let Some(chiefs_name) = groups::chiefs_of_associates(&target.name) {
        let chiefs = groups::Entity::find()
            .filter(groups::Column::Name.eq(chiefs_name.as_str()))
            .one(db)
            .await?
            .ok_or(EngineError::GroupNotFound(chiefs_name))?;
        let held = group_permission_ids(db, chiefs.id).await?;
        query = query.filter(permissions::Column::Id.is_in(held));
    }

    Ok(query
        .order_by_asc(permissions::Column::Codename)
        .all(db)
        .await?
        .into_iter()
        .map(Permission::from)
        .collect())
}

use api_types::group::{GroupStateView, GroupUpdate, GroupUpdateSummary, MemberView, PermissionView};
use axum::{
    Extension, Json,
    extract::{Path, State},
};
use engine::{GroupState, GroupUpdateCmd, User};

use crate::{ServerError, server::ServerState};

fn view(state: GroupState) -> GroupStateView {
    GroupStateView {
        id: state.group.id,
        name: state.group.name,
        members: state.members,
        permissions: state.permissions,
        offered_permissions: state
            .offered_permissions
            .into_iter()
            .map(|permission| PermissionView {
                id: permission.id,
                codename: permission.codename,
                name: permission.name,
            })
            .collect(),
        possible_members: state
            .possible_members
            .into_iter()
            .map(|user| MemberView {
                id: user.id,
                username: user.username,
            })
            .collect(),
    }
}

/// What the acting group may change on the target group.
pub async fn state(
    Extension(user): Extension<User>,
    State(state): State<ServerState>,
    Path((acting, target)): Path<(i64, i64)>,
) -> Result<Json<GroupStateView>, ServerError> {
    let group_state = state.engine.group_state(user.id, acting, target).await?;

    Ok(Json(view(group_state)))
}

pub async fn update(
    Extension(user): Extension<User>,
    State(state): State<ServerState>,
    Path((acting, target)): Path<(i64, i64)>,
    Json(payload): Json<GroupUpdate>,
) -> Result<Json<GroupUpdateSummary>, ServerError> {
    let summary = state
        .engine
        .apply_group_update(GroupUpdateCmd {
            acting_user_id: user.id,
            actor_group_id: acting,
            target_group_id: target,
            members: payload.members,
            permissions: payload.permissions,
        })
        .await?;

    Ok(Json(GroupUpdateSummary {
        added_members: summary.added_members,
        removed_members: summary.removed_members,
        added_permissions: summary.added_permissions,
        removed_permissions: summary.removed_permissions,
    }))
}

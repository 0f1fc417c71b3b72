use api_types::user::{
    Activation, Balance, LedgerEntryView, SelfUpdate, UserList, UserNew, UserSummary, UserUpdate,
    UserView,
};
use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use engine::{Capability, LedgerEntry, NewUser, User, UserFilter};

use crate::{ServerError, server::ServerState};

fn view(user: User) -> UserView {
    UserView {
        id: user.id,
        username: user.username,
        first_name: user.first_name,
        last_name: user.last_name,
        surname: user.surname,
        family: user.family,
        email: user.email,
        phone: user.phone,
        campus: user.campus,
        year: user.year,
        theme: user.theme,
        balance_minor: user.balance.cents(),
        is_active: user.is_active,
    }
}

fn summary(user: User) -> UserSummary {
    UserSummary {
        id: user.id,
        username: user.username,
        first_name: user.first_name,
        last_name: user.last_name,
        surname: user.surname,
        family: user.family,
        year: user.year,
    }
}

fn new_user(payload: UserNew) -> NewUser {
    NewUser {
        username: payload.username,
        password: payload.password,
        first_name: payload.first_name,
        last_name: payload.last_name,
        email: payload.email,
        surname: payload.surname,
        family: payload.family,
        campus: payload.campus,
        year: payload.year,
        is_external_member: payload.is_external_member,
    }
}

/// Public listing of active members.
pub async fn list(
    State(state): State<ServerState>,
    Query(query): Query<UserList>,
) -> Result<Json<Vec<UserSummary>>, ServerError> {
    let users = state
        .engine
        .list_users(UserFilter {
            search: query.search,
            year: query.year,
            state: None,
        })
        .await?;

    Ok(Json(users.into_iter().map(summary).collect()))
}

pub async fn create(
    Extension(operator): Extension<User>,
    State(state): State<ServerState>,
    Json(payload): Json<UserNew>,
) -> Result<(StatusCode, Json<UserView>), ServerError> {
    let user = state
        .engine
        .create_user(operator.id, new_user(payload))
        .await?;

    Ok((StatusCode::CREATED, Json(view(user))))
}

pub async fn register(
    State(state): State<ServerState>,
    Json(payload): Json<UserNew>,
) -> Result<(StatusCode, Json<UserView>), ServerError> {
    let user = state.engine.register_user(new_user(payload)).await?;

    Ok((StatusCode::CREATED, Json(view(user))))
}

pub async fn get(
    Extension(requester): Extension<User>,
    State(state): State<ServerState>,
    Path(id): Path<i64>,
) -> Result<Json<UserView>, ServerError> {
    state
        .engine
        .authorize_self_or(requester.id, id, Capability::ViewUser)
        .await?;
    let user = state.engine.user(id).await?;

    Ok(Json(view(user)))
}

pub async fn update(
    Extension(operator): Extension<User>,
    State(state): State<ServerState>,
    Path(id): Path<i64>,
    Json(payload): Json<UserUpdate>,
) -> Result<Json<UserView>, ServerError> {
    let update = engine::UserUpdate {
        first_name: payload.first_name,
        last_name: payload.last_name,
        surname: payload.surname,
        family: payload.family,
        email: payload.email,
        phone: payload.phone,
        campus: payload.campus,
        year: payload.year,
    };
    let user = state.engine.update_user(operator.id, id, update).await?;

    Ok(Json(view(user)))
}

pub async fn self_update(
    Extension(user): Extension<User>,
    State(state): State<ServerState>,
    Json(payload): Json<SelfUpdate>,
) -> Result<Json<UserView>, ServerError> {
    let update = engine::SelfUpdate {
        email: payload.email,
        phone: payload.phone,
        theme: payload.theme,
    };
    let user = state.engine.self_update(user.id, update).await?;

    Ok(Json(view(user)))
}

pub async fn deactivate(
    Extension(operator): Extension<User>,
    State(state): State<ServerState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ServerError> {
    state.engine.set_user_active(operator.id, id, false).await?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn activate(
    Extension(operator): Extension<User>,
    State(state): State<ServerState>,
    Path(id): Path<i64>,
    Json(payload): Json<Activation>,
) -> Result<Json<UserView>, ServerError> {
    let user = state
        .engine
        .set_user_active(operator.id, id, payload.active)
        .await?;

    Ok(Json(view(user)))
}

pub async fn balance(
    Extension(requester): Extension<User>,
    State(state): State<ServerState>,
    Path(id): Path<i64>,
) -> Result<Json<Balance>, ServerError> {
    state
        .engine
        .authorize_self_or(requester.id, id, Capability::ViewUser)
        .await?;
    let balance = state.engine.get_balance(id).await?;
    let forecast = state.engine.forecast_balance(id).await?;

    Ok(Json(Balance {
        balance_minor: balance.cents(),
        forecast_minor: forecast.cents(),
    }))
}

pub async fn ledger(
    Extension(requester): Extension<User>,
    State(state): State<ServerState>,
    Path(id): Path<i64>,
) -> Result<Json<Vec<LedgerEntryView>>, ServerError> {
    state
        .engine
        .authorize_self_or(requester.id, id, Capability::ViewUser)
        .await?;
    let entries = state.engine.ledger_entries(id).await?;

    Ok(Json(entries.into_iter().map(entry_view).collect()))
}

fn entry_view(entry: LedgerEntry) -> LedgerEntryView {
    LedgerEntryView {
        id: entry.id,
        delta_minor: entry.delta.cents(),
        balance_after_minor: entry.balance_after.cents(),
        reason: entry.reason.as_str().to_string(),
        reference_id: entry.reference_id,
        created_at: entry.created_at,
    }
}

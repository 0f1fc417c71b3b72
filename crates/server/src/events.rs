use api_types::event::{EventNew, EventView, Participant, Price};
use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use engine::{MoneyCents, SharedEvent, User};

use crate::{ServerError, server::ServerState};

fn view(event: SharedEvent) -> EventView {
    EventView {
        id: event.id,
        description: event.description,
        manager_id: event.manager_id,
        date: event.date,
        price_minor: event.price.map(MoneyCents::cents),
        done: event.done,
    }
}

pub async fn event_new(
    Extension(operator): Extension<User>,
    State(state): State<ServerState>,
    Json(payload): Json<EventNew>,
) -> Result<(StatusCode, Json<EventView>), ServerError> {
    let event = state
        .engine
        .create_shared_event(operator.id, &payload.description, payload.date)
        .await?;

    Ok((StatusCode::CREATED, Json(view(event))))
}

pub async fn get(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
) -> Result<Json<EventView>, ServerError> {
    let event = state.engine.shared_event(id).await?;

    Ok(Json(view(event)))
}

/// Adds a participant or changes their weight.
pub async fn participant_upsert(
    Extension(operator): Extension<User>,
    State(state): State<ServerState>,
    Path(id): Path<i64>,
    Json(payload): Json<Participant>,
) -> Result<StatusCode, ServerError> {
    state
        .engine
        .register_participant(operator.id, id, payload.user_id, payload.weight)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn participant_remove(
    Extension(operator): Extension<User>,
    State(state): State<ServerState>,
    Path((id, user_id)): Path<(i64, i64)>,
) -> Result<StatusCode, ServerError> {
    state
        .engine
        .remove_participant(operator.id, id, user_id)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn set_price(
    Extension(operator): Extension<User>,
    State(state): State<ServerState>,
    Path(id): Path<i64>,
    Json(payload): Json<Price>,
) -> Result<Json<EventView>, ServerError> {
    let event = state
        .engine
        .set_event_price(operator.id, id, MoneyCents::new(payload.price_minor))
        .await?;

    Ok(Json(view(event)))
}

pub async fn finish(
    Extension(operator): Extension<User>,
    State(state): State<ServerState>,
    Path(id): Path<i64>,
) -> Result<Json<EventView>, ServerError> {
    let event = state.engine.finish_shared_event(operator.id, id).await?;

    Ok(Json(view(event)))
}

use api_types::movement::{MovementNew, MovementView};
use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use engine::{ExceptionnalMovement, MoneyCents, MovementCmd, User};

use crate::{ServerError, server::ServerState};

fn view(movement: ExceptionnalMovement) -> MovementView {
    MovementView {
        id: movement.id,
        operator_id: movement.operator_id,
        recipient_id: movement.recipient_id,
        amount_minor: movement.amount.cents(),
        justification: movement.justification,
        created_at: movement.created_at,
    }
}

pub async fn movement_new(
    Extension(operator): Extension<User>,
    State(state): State<ServerState>,
    Json(payload): Json<MovementNew>,
) -> Result<(StatusCode, Json<MovementView>), ServerError> {
    let cmd = MovementCmd::new(
        operator.id,
        payload.recipient_id,
        MoneyCents::new(payload.amount_minor),
        payload.justification,
    );
    let movement = state.engine.record_exceptional_movement(cmd).await?;

    Ok((StatusCode::CREATED, Json(view(movement))))
}

pub async fn get(
    Extension(requester): Extension<User>,
    State(state): State<ServerState>,
    Path(id): Path<i64>,
) -> Result<Json<MovementView>, ServerError> {
    let movement = state.engine.exceptional_movement(requester.id, id).await?;

    Ok(Json(view(movement)))
}

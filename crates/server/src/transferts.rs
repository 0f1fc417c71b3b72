use api_types::transfert::{TransfertNew, TransfertView};
use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use engine::{MoneyCents, TransferCmd, Transfert, User};

use crate::{ServerError, server::ServerState};

fn view(transfert: Transfert) -> TransfertView {
    TransfertView {
        id: transfert.id,
        operator_id: transfert.operator_id,
        sender_id: transfert.sender_id,
        recipient_id: transfert.recipient_id,
        amount_minor: transfert.amount.cents(),
        justification: transfert.justification,
        created_at: transfert.created_at,
    }
}

/// The authenticated user sends money from their own balance.
pub async fn transfert_new(
    Extension(user): Extension<User>,
    State(state): State<ServerState>,
    Json(payload): Json<TransfertNew>,
) -> Result<(StatusCode, Json<TransfertView>), ServerError> {
    let mut cmd = TransferCmd::new(
        user.id,
        user.id,
        payload.recipient_id,
        MoneyCents::new(payload.amount_minor),
    );
    if let Some(justification) = payload.justification {
        cmd = cmd.justification(justification);
    }
    let transfert = state.engine.record_transfer(cmd).await?;

    Ok((StatusCode::CREATED, Json(view(transfert))))
}

pub async fn get(
    Extension(requester): Extension<User>,
    State(state): State<ServerState>,
    Path(id): Path<i64>,
) -> Result<Json<TransfertView>, ServerError> {
    let transfert = state.engine.transfert(requester.id, id).await?;

    Ok(Json(view(transfert)))
}

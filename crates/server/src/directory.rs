use api_types::directory::{BalanceQuery, BalanceView, Search};
use axum::{
    Extension, Json,
    extract::{Query, State},
};
use engine::User;

use crate::{ServerError, server::ServerState};

/// Usernames matching a fragment typed by a sale operator.
pub async fn search(
    Extension(_user): Extension<User>,
    State(state): State<ServerState>,
    Query(query): Query<Search>,
) -> Result<Json<Vec<String>>, ServerError> {
    let usernames = state.engine.search_by_prefix(&query.keywords).await?;

    Ok(Json(usernames))
}

pub async fn balance(
    Extension(requester): Extension<User>,
    State(state): State<ServerState>,
    Query(query): Query<BalanceQuery>,
) -> Result<Json<BalanceView>, ServerError> {
    let balance = state
        .engine
        .balance_for(&query.username, requester.id)
        .await?;

    Ok(Json(BalanceView {
        username: query.username,
        balance_minor: balance.cents(),
    }))
}

use axum::{
    Router,
    extract::{Request, State},
    middleware::{self, Next},
    response::Response,
    routing::{delete, get, patch, post, put},
};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Basic},
};

use std::{net::SocketAddr, sync::Arc};

use crate::{
    ServerError, directory, events, groups, movements, notifications, sales, shops, transferts,
    users,
};
use engine::Engine;

#[derive(Clone)]
pub struct ServerState {
    pub engine: Arc<Engine>,
}

/// Resolves the Basic credentials to an active user and hands it to the
/// handler as an `Extension<engine::User>`.
async fn auth(
    auth_header: Option<TypedHeader<Authorization<Basic>>>,
    State(state): State<ServerState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ServerError> {
    let Some(TypedHeader(auth_header)) = auth_header else {
        return Err(ServerError::Unauthorized);
    };
    if auth_header.username().is_empty() || auth_header.password().is_empty() {
        return Err(ServerError::Unauthorized);
    }

    let user = state
        .engine
        .authenticate(auth_header.username(), auth_header.password())
        .await?;

    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}

pub fn router(state: ServerState) -> Router {
    Router::new()
        .route(
            "/users/{id}",
            get(users::get).put(users::update).delete(users::deactivate),
        )
        .route("/users/{id}/activate", post(users::activate))
        .route("/users/me", patch(users::self_update))
        .route("/users/{id}/balance", get(users::balance))
        .route("/users/{id}/ledger", get(users::ledger))
        .route("/directory/search", get(directory::search))
        .route("/directory/balance", get(directory::balance))
        .route("/sales", post(sales::sale_new))
        .route("/sales/{id}", get(sales::get))
        .route("/transferts", post(transferts::transfert_new))
        .route("/transferts/{id}", get(transferts::get))
        .route("/movements", post(movements::movement_new))
        .route("/movements/{id}", get(movements::get))
        .route(
            "/groups/{acting}/manage/{target}",
            get(groups::state).put(groups::update),
        )
        .route("/shops", get(shops::list).post(shops::shop_new))
        .route(
            "/shops/{id}/products",
            get(shops::products).post(shops::product_new),
        )
        .route(
            "/products/{id}",
            patch(shops::product_update).delete(shops::product_remove),
        )
        .route(
            "/shops/{id}/modules/{kind}",
            get(shops::module).put(shops::configure_module),
        )
        .route("/events", post(events::event_new))
        .route("/events/{id}", get(events::get))
        .route("/events/{id}/participants", post(events::participant_upsert))
        .route(
            "/events/{id}/participants/{user}",
            delete(events::participant_remove),
        )
        .route("/events/{id}/price", put(events::set_price))
        .route("/events/{id}/finish", post(events::finish))
        .route(
            "/notifications/templates/validate",
            post(notifications::validate),
        )
        .route_layer(middleware::from_fn_with_state(state.clone(), auth))
        // `/users` lists publicly but creating a user needs credentials.
        .route(
            "/users",
            get(users::list).merge(
                post(users::create)
                    .route_layer(middleware::from_fn_with_state(state.clone(), auth)),
            ),
        )
        .route("/register", post(users::register))
        .with_state(state)
}

pub async fn run(engine: Engine, addr: SocketAddr) {
    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(err) => {
            tracing::error!("failed to bind server listener on {addr}: {err}");
            return;
        }
    };
    if let Err(err) = run_with_listener(engine, listener).await {
        tracing::error!("server failed: {err}");
    }
}

pub async fn run_with_listener(
    engine: Engine,
    listener: tokio::net::TcpListener,
) -> Result<(), std::io::Error> {
    let addr = listener.local_addr()?;
    tracing::info!("Server listening on {}", addr);

    let state = ServerState {
        engine: Arc::new(engine),
    };

    axum::serve(listener, router(state)).await
}

pub fn spawn_with_listener(
    engine: Engine,
    listener: tokio::net::TcpListener,
) -> Result<SocketAddr, std::io::Error> {
    let addr = listener.local_addr()?;

    tokio::spawn(async move {
        if let Err(err) = run_with_listener(engine, listener).await {
            tracing::error!("server failed: {err}");
        }
    });

    Ok(addr)
}

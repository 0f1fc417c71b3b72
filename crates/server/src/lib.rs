use api_types::ErrorBody;
use axum::{Json, http::StatusCode, response::IntoResponse};
use engine::EngineError;

pub use server::{ServerState, router, run, run_with_listener, spawn_with_listener};

mod directory;
mod events;
mod groups;
mod movements;
mod notifications;
mod sales;
mod server;
mod shops;
mod transferts;
mod users;

pub enum ServerError {
    Engine(EngineError),
    Generic(String),
    Unauthorized,
}

fn status_for_engine_error(err: &EngineError) -> StatusCode {
    match err {
        EngineError::PermissionDenied(_) => StatusCode::FORBIDDEN,
        EngineError::InvalidCredentials => StatusCode::UNAUTHORIZED,
        EngineError::UserNotFound(_)
        | EngineError::GroupNotFound(_)
        | EngineError::KeyNotFound(_) => StatusCode::NOT_FOUND,
        EngineError::ExistingKey(_) | EngineError::StaleGroupState(_) => StatusCode::CONFLICT,
        EngineError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        EngineError::Database(_) if err.is_retryable() => StatusCode::SERVICE_UNAVAILABLE,
        EngineError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        EngineError::InsufficientCredit(_)
        | EngineError::InsufficientFunds(_)
        | EngineError::PurchaseLimitExceeded(_)
        | EngineError::EmptyOrder(_)
        | EngineError::NoClientSelected
        | EngineError::InvalidQuantity(_)
        | EngineError::InvalidProduct(_)
        | EngineError::ModuleDisabled(_)
        | EngineError::SharedEventsPending(_)
        | EngineError::InvalidAmount(_)
        | EngineError::InvalidInput(_)
        | EngineError::InvalidTemplate(_) => StatusCode::UNPROCESSABLE_ENTITY,
    }
}

fn message_for_engine_error(err: EngineError) -> String {
    let retryable = err.is_retryable();
    match err {
        EngineError::Database(db_err) if retryable => {
            tracing::warn!("transient database error: {db_err}");
            "service unavailable, retry later".to_string()
        }
        EngineError::Database(db_err) => {
            tracing::error!("database error: {db_err}");
            "internal server error".to_string()
        }
        EngineError::Unavailable(reason) => {
            tracing::warn!("engine unavailable: {reason}");
            "service unavailable, retry later".to_string()
        }
        other => other.to_string(),
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> axum::response::Response {
        let (status, error) = match self {
            ServerError::Engine(err) => (status_for_engine_error(&err), message_for_engine_error(err)),
            ServerError::Generic(err) => (StatusCode::BAD_REQUEST, err),
            ServerError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "authentication required".to_string(),
            ),
        };

        (status, Json(ErrorBody { error })).into_response()
    }
}

impl From<EngineError> for ServerError {
    fn from(value: EngineError) -> Self {
        Self::Engine(value)
    }
}

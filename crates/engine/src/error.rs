//! The module contains the errors the engine can throw.
//!
//! Business-rule violations each get their own variant so callers can
//! render the exact rule that was broken:
//!
//! - [`InsufficientCredit`] a sale or transfer costs more than the balance.
//! - [`PurchaseLimitExceeded`] a sale exceeds the module's order limit.
//! - [`EmptyOrder`] a sale whose total is not positive.
//! - [`PermissionDenied`] the acting user lacks a capability.
//!
//! Infrastructure faults ([`Unavailable`], and [`Database`] errors caused
//! by a busy or unreachable store) are the "retry later" class, see
//! [`EngineError::is_retryable`].
//!
//!  [`InsufficientCredit`]: EngineError::InsufficientCredit
//!  [`PurchaseLimitExceeded`]: EngineError::PurchaseLimitExceeded
//!  [`EmptyOrder`]: EngineError::EmptyOrder
//!  [`PermissionDenied`]: EngineError::PermissionDenied
//!  [`Unavailable`]: EngineError::Unavailable
//!  [`Database`]: EngineError::Database
use sea_orm::{DbErr, RuntimeErr};
use thiserror::Error;

/// Engine custom errors.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Insufficient credit: {0}")]
    InsufficientCredit(String),
    #[error("Insufficient funds: {0}")]
    InsufficientFunds(String),
    #[error("Purchase limit exceeded: {0}")]
    PurchaseLimitExceeded(String),
    #[error("Empty order: {0}")]
    EmptyOrder(String),
    #[error("No client selected")]
    NoClientSelected,
    #[error("Permission denied: {0}")]
    PermissionDenied(String),
    #[error("User not found: {0}")]
    UserNotFound(String),
    #[error("Group not found: {0}")]
    GroupNotFound(String),
    #[error("Invalid quantity: {0}")]
    InvalidQuantity(String),
    #[error("Stale group state: {0}")]
    StaleGroupState(String),
    #[error("Invalid product: {0}")]
    InvalidProduct(String),
    #[error("Module disabled: {0}")]
    ModuleDisabled(String),
    #[error("Shared events still managed by the user: {}", .0.join(", "))]
    SharedEventsPending(Vec<String>),
    #[error("\"{0}\" key not found!")]
    KeyNotFound(String),
    #[error("\"{0}\" already present!")]
    ExistingKey(String),
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Invalid template: {0}")]
    InvalidTemplate(String),
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("Unavailable, retry later: {0}")]
    Unavailable(String),
    #[error(transparent)]
    Database(#[from] DbErr),
}

impl EngineError {
    /// `true` for faults the caller may retry (nothing was committed).
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Unavailable(_) => true,
            Self::Database(err) => is_transient(err),
            _ => false,
        }
    }
}

/// Pool exhaustion, lost connections and sqlite lock contention.
fn is_transient(err: &DbErr) -> bool {
    match err {
        DbErr::ConnectionAcquire(_) | DbErr::Conn(_) => true,
        DbErr::Exec(RuntimeErr::SqlxError(sqlx_err)) | DbErr::Query(RuntimeErr::SqlxError(sqlx_err)) => {
            is_busy(&sqlx_err.to_string())
        }
        DbErr::Exec(RuntimeErr::Internal(message)) | DbErr::Query(RuntimeErr::Internal(message)) => {
            is_busy(message)
        }
        _ => false,
    }
}

fn is_busy(message: &str) -> bool {
    message.contains("database is locked") || message.contains("database is busy")
}

impl PartialEq for EngineError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::InsufficientCredit(a), Self::InsufficientCredit(b)) => a == b,
            (Self::InsufficientFunds(a), Self::InsufficientFunds(b)) => a == b,
            (Self::PurchaseLimitExceeded(a), Self::PurchaseLimitExceeded(b)) => a == b,
            (Self::EmptyOrder(a), Self::EmptyOrder(b)) => a == b,
            (Self::NoClientSelected, Self::NoClientSelected) => true,
            (Self::PermissionDenied(a), Self::PermissionDenied(b)) => a == b,
            (Self::UserNotFound(a), Self::UserNotFound(b)) => a == b,
            (Self::GroupNotFound(a), Self::GroupNotFound(b)) => a == b,
            (Self::InvalidQuantity(a), Self::InvalidQuantity(b)) => a == b,
            (Self::StaleGroupState(a), Self::StaleGroupState(b)) => a == b,
            (Self::InvalidProduct(a), Self::InvalidProduct(b)) => a == b,
            (Self::ModuleDisabled(a), Self::ModuleDisabled(b)) => a == b,
            (Self::SharedEventsPending(a), Self::SharedEventsPending(b)) => a == b,
            (Self::KeyNotFound(a), Self::KeyNotFound(b)) => a == b,
            (Self::ExistingKey(a), Self::ExistingKey(b)) => a == b,
            (Self::InvalidAmount(a), Self::InvalidAmount(b)) => a == b,
            (Self::InvalidInput(a), Self::InvalidInput(b)) => a == b,
            (Self::InvalidTemplate(a), Self::InvalidTemplate(b)) => a == b,
            (Self::InvalidCredentials, Self::InvalidCredentials) => true,
            (Self::Unavailable(a), Self::Unavailable(b)) => a == b,
            (Self::Database(a), Self::Database(b)) => a.to_string() == b.to_string(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use sea_orm::ConnAcquireErr;

    use super::*;

    #[test]
    fn only_transient_store_faults_are_retryable() {
        assert!(EngineError::Unavailable("lock".to_string()).is_retryable());
        assert!(EngineError::Database(DbErr::ConnectionAcquire(ConnAcquireErr::Timeout)).is_retryable());
        assert!(
            EngineError::Database(DbErr::Exec(RuntimeErr::Internal(
                "database is locked".to_string()
            )))
            .is_retryable()
        );
        assert!(!EngineError::Database(DbErr::Custom("broken row".to_string())).is_retryable());
        assert!(!EngineError::InsufficientCredit("x".to_string()).is_retryable());
    }
}

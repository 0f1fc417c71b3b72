use std::time::Duration;

use sea_orm::DatabaseConnection;
use tokio::sync::broadcast;

use crate::{EngineError, LedgerEvent, Registry, ResultEngine, locks::LockTable};

mod access;
mod directory;
mod events;
mod groups;
mod ledger;
mod movements;
mod sales;
mod shops;
mod transfers;
mod users;

pub use access::Access;
pub use groups::{GroupState, GroupUpdateSummary};

const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(5);
const EVENT_CAPACITY: usize = 256;

/// Run a block inside a DB transaction, committing on success and rolling back on error.
macro_rules! with_tx {
    ($self:expr, |$tx:ident| $body:expr) => {{
        let $tx = $self.database.begin().await?;
        let result = $body;
        match result {
            Ok(value) => {
                $tx.commit().await?;
                Ok(value)
            }
            Err(err) => Err(err),
        }
    }};
}

pub(crate) use with_tx;

#[derive(Debug)]
pub struct Engine {
    database: DatabaseConnection,
    registry: Registry,
    locks: LockTable,
    events: broadcast::Sender<LedgerEvent>,
    self_registration: bool,
}

impl Engine {
    /// Return a builder for `Engine`. Help to build the struct.
    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }

    /// Ids of the reserved groups.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Receives every [`LedgerEvent`] committed after the call.
    pub fn subscribe(&self) -> broadcast::Receiver<LedgerEvent> {
        self.events.subscribe()
    }

    fn publish(&self, event: LedgerEvent) {
        if self.events.send(event).is_err() {
            tracing::debug!("no ledger event subscriber");
        }
    }
}

fn normalize_required_text(value: &str, label: &str) -> ResultEngine<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(EngineError::InvalidInput(format!("{label} must not be empty")));
    }
    Ok(trimmed.to_string())
}

fn normalize_optional_text(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
}

fn overflow() -> EngineError {
    EngineError::InvalidAmount("amount overflow".to_string())
}

/// The builder for `Engine`
pub struct EngineBuilder {
    database: DatabaseConnection,
    lock_timeout: Duration,
    self_registration: bool,
}

impl Default for EngineBuilder {
    fn default() -> Self {
        Self {
            database: DatabaseConnection::default(),
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
            self_registration: false,
        }
    }
}

impl EngineBuilder {
    /// Pass the required database
    pub fn database(mut self, db: DatabaseConnection) -> EngineBuilder {
        self.database = db;
        self
    }

    /// How long an operation waits for a busy user, group or event.
    pub fn lock_timeout(mut self, timeout: Duration) -> EngineBuilder {
        self.lock_timeout = timeout;
        self
    }

    /// Allow `register_user`.
    pub fn self_registration(mut self, enabled: bool) -> EngineBuilder {
        self.self_registration = enabled;
        self
    }

    /// Construct `Engine`, resolving the reserved groups.
    pub async fn build(self) -> ResultEngine<Engine> {
        let registry = Registry::load(&self.database).await?;
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Ok(Engine {
            database: self.database,
            registry,
            locks: LockTable::new(self.lock_timeout),
            events,
            self_registration: self.self_registration,
        })
    }
}

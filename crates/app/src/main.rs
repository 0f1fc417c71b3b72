use std::{net::SocketAddr, time::Duration};

use engine::{Engine, LedgerEvent};
use migration::{Migrator, MigratorTrait};
use settings::Database;
use tokio::sync::broadcast::error::RecvError;

mod settings;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let settings = settings::Settings::new()?;

    tracing_subscriber::fmt()
        .with_env_filter(format!(
            "borgia={level},server={level},engine={level}",
            level = settings.app.level
        ))
        .init();

    let Some(server) = settings.server else {
        tracing::warn!("no server settings found, nothing to run");
        return Ok(());
    };
    tracing::info!("Found server settings...");

    let db = parse_database(&server.database).await?;
    let engine = Engine::builder()
        .database(db)
        .lock_timeout(Duration::from_millis(settings.ledger.lock_timeout_ms))
        .self_registration(settings.ledger.self_registration)
        .build()
        .await?;

    let mut tasks = tokio::task::JoinSet::new();
    let events = engine.subscribe();
    tasks.spawn(log_ledger_events(events));

    let bind = server.bind.unwrap_or_else(|| "127.0.0.1".to_string());
    let addr: SocketAddr = format!("{}:{}", bind, server.port).parse()?;
    tasks.spawn(server::run(engine, addr));

    while tasks.join_next().await.is_some() {
        tasks.shutdown().await;
    }

    Ok(())
}

/// Logs every committed ledger mutation with the users it concerns.
async fn log_ledger_events(mut events: tokio::sync::broadcast::Receiver<LedgerEvent>) {
    loop {
        match events.recv().await {
            Ok(event) => tracing::info!(
                correlation_id = %event.correlation_id(),
                recipients = ?event.recipients(),
                "{event:?}"
            ),
            Err(RecvError::Lagged(skipped)) => {
                tracing::warn!("ledger event consumer lagged, {skipped} events skipped");
            }
            Err(RecvError::Closed) => return,
        }
    }
}

async fn parse_database(
    config: &Database,
) -> Result<sea_orm::DatabaseConnection, Box<dyn std::error::Error + Send + Sync>> {
    let url = match config {
        Database::Memory => String::from("sqlite::memory:"),
        Database::Sqlite(path) => format!("sqlite:{}?mode=rwc", path),
    };

    let database = sea_orm::Database::connect(url).await?;
    Migrator::up(&database, None).await?;
    Ok(database)
}

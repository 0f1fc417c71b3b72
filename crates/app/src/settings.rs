//! Settings of the application, read from `settings.toml` and overridden
//! by `BORGIA__<SECTION>__<KEY>` environment variables.
//!
//! See `settings.toml` at the repository root for an example.
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct App {
    pub level: String,
}

impl Default for App {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Database {
    Memory,
    Sqlite(String),
}

#[derive(Debug, Deserialize)]
pub struct Server {
    pub bind: Option<String>,
    pub port: u16,
    pub database: Database,
}

#[derive(Debug, Deserialize)]
pub struct Ledger {
    /// How long an operation waits for a busy account.
    pub lock_timeout_ms: u64,
    pub self_registration: bool,
}

impl Default for Ledger {
    fn default() -> Self {
        Self {
            lock_timeout_ms: 5_000,
            self_registration: false,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub app: App,
    pub server: Option<Server>,
    #[serde(default)]
    pub ledger: Ledger,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        Self::from_file("settings")
    }

    fn from_file(name: &str) -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::with_name(name).required(false))
            .add_source(
                Environment::with_prefix("BORGIA")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        settings.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_gives_defaults() {
        let settings = Settings::from_file("does-not-exist").unwrap();
        assert_eq!(settings.app.level, "info");
        assert!(settings.server.is_none());
        assert_eq!(settings.ledger.lock_timeout_ms, 5_000);
        assert!(!settings.ledger.self_registration);
    }
}

//! # ab-config
//!
//! Layered settings: built-in defaults, then an optional `anonboard.toml`, then
//! `ANONBOARD__SECTION__KEY` environment variables (a `.env` file is loaded
//! first if present).

use ab_core::{ReplyStorage, ServiceConfig};
use config::{Config, ConfigBuilder, Environment, File, FileFormat};
use config::builder::DefaultState;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;
use tracing_subscriber::EnvFilter;

pub const ENV_PREFIX: &str = "ANONBOARD";
pub const CONFIG_FILE: &str = "anonboard";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub server: ServerSettings,
    pub database: DatabaseSettings,
    pub board: BoardSettings,
    pub log: LogSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    Memory,
    Sqlite,
}

#[derive(Debug, Deserialize)]
pub struct DatabaseSettings {
    pub backend: Backend,
    /// Connection string, e.g. `sqlite:anonboard.db`. Ignored by `memory`.
    pub url: SecretString,
}

impl DatabaseSettings {
    pub fn url(&self) -> &str {
        self.url.expose_secret()
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct BoardSettings {
    pub thread_limit: usize,
    pub reply_limit: usize,
    pub reply_storage: ReplyStorage,
}

impl From<BoardSettings> for ServiceConfig {
    fn from(board: BoardSettings) -> Self {
        ServiceConfig {
            reply_storage: board.reply_storage,
            thread_limit: board.thread_limit,
            reply_limit: board.reply_limit,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogSettings {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    pub filter: String,
    pub json: bool,
}

impl Settings {
    /// Loads `.env`, `anonboard.toml` (optional) and the environment.
    pub fn load() -> Result<Self, ConfigError> {
        if let Ok(path) = dotenvy::dotenv() {
            debug!(path = %path.display(), "loaded .env");
        }
        let builder = defaults()?
            .add_source(File::with_name(CONFIG_FILE).required(false))
            .add_source(Environment::with_prefix(ENV_PREFIX).separator("__").try_parsing(true));
        Self::build(builder)
    }

    /// Defaults overlaid with a TOML document.
    pub fn from_toml(toml: &str) -> Result<Self, ConfigError> {
        Self::build(defaults()?.add_source(File::from_str(toml, FileFormat::Toml)))
    }

    fn build(builder: ConfigBuilder<DefaultState>) -> Result<Self, ConfigError> {
        let settings: Settings = builder.build()?.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.board.thread_limit == 0 || self.board.reply_limit == 0 {
            return Err(ConfigError::Invalid("board limits must be at least 1".into()));
        }
        if self.database.backend == Backend::Sqlite && self.database.url().trim().is_empty() {
            return Err(ConfigError::Invalid("database.url is required for the sqlite backend".into()));
        }
        Ok(())
    }
}

/// Installs the global tracing subscriber. `RUST_LOG` wins over `log.filter`.
/// Records emitted through the `log` facade (e.g. actix's request logger) are
/// captured as well.
pub fn init_tracing(log: &LogSettings) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log.filter));
    if log.json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

fn defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    Ok(Config::builder()
        .set_default("server.host", "127.0.0.1")?
        .set_default("server.port", 8080_i64)?
        .set_default("database.backend", "memory")?
        .set_default("database.url", "sqlite:anonboard.db")?
        .set_default("board.thread_limit", ab_core::moderation::DEFAULT_THREAD_LIMIT as i64)?
        .set_default("board.reply_limit", ab_core::moderation::DEFAULT_REPLY_LIMIT as i64)?
        .set_default("board.reply_storage", "embedded")?
        .set_default("log.filter", "info")?
        .set_default("log.json", false)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_service_defaults() {
        let settings = Settings::from_toml("").unwrap();
        assert_eq!(settings.server.port, 8080);
        assert_eq!(settings.database.backend, Backend::Memory);
        assert_eq!(ServiceConfig::from(settings.board), ServiceConfig::default());
        assert!(!settings.log.json);
    }

    #[test]
    fn toml_overrides_defaults() {
        let settings = Settings::from_toml(
            r#"
            [database]
            backend = "sqlite"
            url = "sqlite::memory:"

            [board]
            reply_storage = "referenced"
            reply_limit = 5
            "#,
        )
        .unwrap();
        assert_eq!(settings.database.backend, Backend::Sqlite);
        assert_eq!(settings.database.url(), "sqlite::memory:");
        assert_eq!(settings.board.reply_storage, ReplyStorage::Referenced);
        assert_eq!(settings.board.reply_limit, 5);
        assert_eq!(settings.board.thread_limit, 10);
    }

    #[test]
    fn zero_limits_are_rejected() {
        let err = Settings::from_toml("[board]\nthread_limit = 0").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn database_url_is_redacted_in_debug() {
        let settings = Settings::from_toml("[database]\nurl = \"sqlite:secret-path.db\"").unwrap();
        assert!(!format!("{:?}", settings.database).contains("secret-path"));
    }
}

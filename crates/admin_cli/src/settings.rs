//! Settings for `fund_admin`.
//!
//! Read from `config/fund.toml` (optional, or the file passed with `--config`)
//! and overridden by `FUND__*` environment variables, e.g.
//! `FUND__DATABASE__URL=sqlite:./other.db?mode=rwc`.

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

pub const DEFAULT_CONFIG: &str = "config/fund";
pub const DEFAULT_DATABASE_URL: &str = "sqlite:./fund.db?mode=rwc";

#[derive(Debug, Deserialize)]
pub struct App {
    /// Log level for the binary and the engine.
    pub level: String,
}

#[derive(Debug, Deserialize)]
pub struct Database {
    pub url: String,
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub app: App,
    pub database: Database,
}

impl Settings {
    /// Load settings. An explicit `path` must exist, the default file may be
    /// missing.
    pub fn new(path: Option<&str>) -> Result<Self, ConfigError> {
        let file = match path {
            Some(path) => File::with_name(path),
            None => File::with_name(DEFAULT_CONFIG).required(false),
        };

        Config::builder()
            .set_default("app.level", "info")?
            .set_default("database.url", DEFAULT_DATABASE_URL)?
            .add_source(file)
            .add_source(
                Environment::with_prefix("FUND")
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()
    }
}

//! Process configuration.
//!
//! Layers, lowest first: built-in defaults, an optional `karatbook.toml` in
//! the working directory, then `KARATBOOK__*` environment variables (a `.env`
//! file is read into the environment first). Nested keys are not used, so
//! `KARATBOOK__DATABASE_URL` maps to `database_url`.

use anyhow::{Context, bail};
use config::{Config, Environment, File};
use serde::Deserialize;

pub const ENV_PREFIX: &str = "KARATBOOK";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    Memory,
    Postgres,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    Pretty,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
    #[serde(default = "default_store")]
    pub store: StoreKind,
    #[serde(default)]
    pub database_url: Option<String>,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// `EnvFilter` directives, e.g. `info,karatbook_infra=debug`.
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
    #[serde(default = "default_log_format")]
    pub log_format: LogFormat,
}

fn default_bind_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_store() -> StoreKind {
    StoreKind::Memory
}

fn default_max_connections() -> u32 {
    10
}

fn default_log_filter() -> String {
    "info".to_string()
}

fn default_log_format() -> LogFormat {
    LogFormat::Json
}

impl Settings {
    /// Read `.env`, `karatbook.toml` and the environment.
    pub fn load() -> anyhow::Result<Self> {
        // a missing .env is normal outside development
        let _ = dotenvy::dotenv();
        Self::from_sources(
            Some("karatbook"),
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__"),
        )
    }

    /// `file` names an optional config file, extension inferred.
    pub fn from_sources(file: Option<&str>, env: Environment) -> anyhow::Result<Self> {
        let mut builder = Config::builder();
        if let Some(name) = file {
            builder = builder.add_source(File::with_name(name).required(false));
        }
        let settings: Settings = builder
            .add_source(env)
            .build()
            .context("failed to read configuration")?
            .try_deserialize()
            .context("invalid configuration")?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> anyhow::Result<()> {
        if self.store == StoreKind::Postgres && self.database_url.is_none() {
            bail!("database_url is required when store = \"postgres\"");
        }
        if self.max_connections == 0 {
            bail!("max_connections must be at least 1");
        }
        Ok(())
    }

    pub fn json_logs(&self) -> bool {
        self.log_format == LogFormat::Json
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(vars: &[(&str, &str)]) -> Environment {
        let map: config::Map<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("__")
            .separator("__")
            .source(Some(map))
    }

    #[test]
    fn defaults_to_in_memory_store_with_json_logs() {
        let settings = Settings::from_sources(None, env(&[])).unwrap();
        assert_eq!(settings.store, StoreKind::Memory);
        assert_eq!(settings.bind_addr, "0.0.0.0:8080");
        assert!(settings.json_logs());
        assert_eq!(settings.max_connections, 10);
    }

    #[test]
    fn environment_overrides_defaults() {
        let settings = Settings::from_sources(
            None,
            env(&[
                ("KARATBOOK__STORE", "postgres"),
                ("KARATBOOK__DATABASE_URL", "postgres://localhost/karatbook"),
                ("KARATBOOK__MAX_CONNECTIONS", "4"),
                ("KARATBOOK__LOG_FORMAT", "pretty"),
            ]),
        )
        .unwrap();
        assert_eq!(settings.store, StoreKind::Postgres);
        assert_eq!(
            settings.database_url.as_deref(),
            Some("postgres://localhost/karatbook")
        );
        assert_eq!(settings.max_connections, 4);
        assert!(!settings.json_logs());
    }

    #[test]
    fn postgres_without_url_is_rejected() {
        let err = Settings::from_sources(None, env(&[("KARATBOOK__STORE", "postgres")]))
            .unwrap_err();
        assert!(err.to_string().contains("database_url"));
    }
}

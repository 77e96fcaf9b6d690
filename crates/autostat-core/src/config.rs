//! Configuration management utilities
//!
//! Each deployment environment (`local`, `dev`, ...) is described by a JSON file
//! named `<environment>.env.json` inside the configuration directory. The file
//! holds the database coordinates; `AUTOSTAT_DATABASE_URL` overrides them.

use serde::{Deserialize, Deserializer, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{ServiceError, ServiceResult};

/// Environment variable that replaces the file-based database coordinates
pub const DATABASE_URL_ENV: &str = "AUTOSTAT_DATABASE_URL";

/// Template shipped in the repository's `config/` directory
pub const EXAMPLE_CONFIG_FILE: &str = "local.env.json.example";

/// Database configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connect_timeout_secs: u64,
}

impl DatabaseConfig {
    /// Pool sizing for the named environment. `local` gets a small developer
    /// pool; every other environment runs with a single connection.
    pub fn for_environment(url: impl Into<String>, environment: &str) -> Self {
        let url = url.into();
        if environment == "local" {
            Self {
                url,
                max_connections: 10,
                min_connections: 1,
                connect_timeout_secs: 5,
            }
        } else {
            Self {
                url,
                max_connections: 1,
                min_connections: 1,
                connect_timeout_secs: 10,
            }
        }
    }
}

/// Contents of `<environment>.env.json`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct EnvironmentConfig {
    pub db_host: String,
    #[serde(default = "default_port", deserialize_with = "port_from_string_or_number")]
    pub db_port: u16,
    pub db_name: String,
    pub db_user: String,
    pub db_password: String,
    #[serde(default)]
    pub db_ssl: bool,
    #[serde(default)]
    pub db_max_connections: Option<u32>,
}

fn default_port() -> u16 {
    5432
}

#[derive(Deserialize)]
#[serde(untagged)]
enum PortValue {
    Number(u16),
    Text(String),
}

fn port_from_string_or_number<'de, D>(deserializer: D) -> Result<u16, D::Error>
where
    D: Deserializer<'de>,
{
    match PortValue::deserialize(deserializer)? {
        PortValue::Number(port) => Ok(port),
        PortValue::Text(text) if text.trim().is_empty() => Ok(default_port()),
        PortValue::Text(text) => text
            .trim()
            .parse()
            .map_err(|_| serde::de::Error::custom(format!("invalid DB_PORT '{}'", text))),
    }
}

impl EnvironmentConfig {
    /// Path of the configuration file for `environment` inside `config_dir`
    pub fn path_for(config_dir: &Path, environment: &str) -> PathBuf {
        config_dir.join(format!("{}.env.json", environment))
    }

    /// Load and parse `<config_dir>/<environment>.env.json`
    pub fn load(config_dir: &Path, environment: &str) -> ServiceResult<Self> {
        validate_environment_name(environment)?;

        let path = Self::path_for(config_dir, environment);
        let raw = std::fs::read_to_string(&path).map_err(|e| {
            ServiceError::configuration(format!(
                "failed to read config for '{}' environment at {}: {} \
                 (copy {} to {}.env.json and update the values)",
                environment,
                path.display(),
                e,
                EXAMPLE_CONFIG_FILE,
                environment
            ))
        })?;

        serde_json::from_str(&raw).map_err(|e| {
            ServiceError::configuration(format!("invalid config file {}: {}", path.display(), e))
        })
    }

    /// PostgreSQL connection URL built from the file's coordinates
    pub fn database_url(&self) -> String {
        let mut url = format!(
            "postgres://{}:{}@{}:{}/{}",
            urlencoding::encode(&self.db_user),
            urlencoding::encode(&self.db_password),
            self.db_host,
            self.db_port,
            self.db_name
        );
        if self.db_ssl {
            url.push_str("?sslmode=require");
        }
        url
    }

    pub fn database_config(&self, environment: &str) -> DatabaseConfig {
        let mut config = DatabaseConfig::for_environment(self.database_url(), environment);
        if let Some(max) = self.db_max_connections {
            config.max_connections = max.max(1);
            config.min_connections = config.min_connections.min(config.max_connections);
        }
        config
    }
}

/// Environment names become file names, so only a conservative character set
/// is accepted.
pub fn validate_environment_name(environment: &str) -> ServiceResult<()> {
    if environment.is_empty() {
        return Err(ServiceError::configuration("environment name is empty"));
    }
    if !environment
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ServiceError::configuration(format!(
            "invalid environment name '{}'",
            environment
        )));
    }
    Ok(())
}

/// Resolve the database configuration for `environment`.
///
/// `AUTOSTAT_DATABASE_URL` wins when set; otherwise the environment file is read.
pub fn resolve_database_config(
    config_dir: &Path,
    environment: &str,
) -> ServiceResult<DatabaseConfig> {
    validate_environment_name(environment)?;

    if let Ok(url) = std::env::var(DATABASE_URL_ENV) {
        if !url.trim().is_empty() {
            debug!("Using {} for '{}' environment", DATABASE_URL_ENV, environment);
            return Ok(DatabaseConfig::for_environment(url, environment));
        }
    }

    let config = EnvironmentConfig::load(config_dir, environment)?;
    Ok(config.database_config(environment))
}

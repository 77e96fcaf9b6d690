use async_trait::async_trait;
use autostat_core::resolve_database_config;
use autostat_migrations::{ConnectionProvider, MigrationError};
use sea_orm::DatabaseConnection;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

use crate::connection::establish_connection;

/// Resolves an environment name to a fresh connection pool.
///
/// Coordinates come from `<config_dir>/<environment>.env.json` or
/// `AUTOSTAT_DATABASE_URL`. The pool lives only for the duration of one runner
/// call and is closed on release.
#[derive(Debug, Clone)]
pub struct EnvironmentConnectionProvider {
    config_dir: PathBuf,
}

impl EnvironmentConnectionProvider {
    pub fn new(config_dir: impl Into<PathBuf>) -> Self {
        Self {
            config_dir: config_dir.into(),
        }
    }

    pub fn config_dir(&self) -> &std::path::Path {
        &self.config_dir
    }
}

#[async_trait]
impl ConnectionProvider for EnvironmentConnectionProvider {
    async fn acquire(
        &self,
        environment: &str,
    ) -> Result<Arc<DatabaseConnection>, MigrationError> {
        let config = resolve_database_config(&self.config_dir, environment)?;

        let db = establish_connection(&config)
            .await
            .map_err(|e| MigrationError::Connectivity {
                environment: environment.to_string(),
                reason: e.to_string(),
            })?;

        info!("Connected to {} database", environment);
        Ok(Arc::new(db))
    }

    async fn release(&self, connection: Arc<DatabaseConnection>) {
        match Arc::try_unwrap(connection) {
            Ok(db) => {
                if let Err(e) = db.close().await {
                    warn!("Failed to close database pool: {}", e);
                }
            }
            Err(_) => warn!(
                "Database pool still shared at release, it closes with its last handle"
            ),
        }
    }
}

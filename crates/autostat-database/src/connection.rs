//! Database connection management

use autostat_core::{DatabaseConfig, ServiceError, ServiceResult};
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use std::time::Duration;
use tracing::debug;

pub type DbConnection = DatabaseConnection;

/// Open a pool sized by `config`. Schema migrations are not run here; they are
/// an explicit operator action (see `autostat_migrations::MigrationRunner`).
pub async fn establish_connection(config: &DatabaseConfig) -> ServiceResult<DbConnection> {
    let mut opt = ConnectOptions::new(config.url.clone());
    opt.max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
        .acquire_timeout(Duration::from_secs(config.connect_timeout_secs))
        .sqlx_logging(false);

    debug!(
        "Connecting to database (max_connections={}, connect_timeout={}s)",
        config.max_connections, config.connect_timeout_secs
    );

    Database::connect(opt)
        .await
        .map_err(|e| ServiceError::Database(e.to_string()))
}

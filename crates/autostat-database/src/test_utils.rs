//! Test utilities for database integration tests
//!
//! Each `TestDatabase` is a private in-memory SQLite database, so tests never
//! share state and need no external server.

use crate::DbConnection;
use autostat_migrations::{Direction, MigrationRunner, StaticConnectionProvider};
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseBackend, Statement};
use std::sync::Arc;

pub struct TestDatabase {
    pub db: Arc<DbConnection>,
}

impl TestDatabase {
    /// Create an empty in-memory database
    pub async fn new() -> anyhow::Result<Self> {
        // A single pooled connection keeps the in-memory database alive and
        // shared between every query of the test.
        let mut opt = ConnectOptions::new("sqlite::memory:");
        opt.max_connections(1)
            .min_connections(1)
            .sqlx_logging(false);

        let db = Database::connect(opt)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to open in-memory database: {}", e))?;

        let test_db = TestDatabase { db: Arc::new(db) };
        test_db
            .test_connection()
            .await
            .map_err(|e| anyhow::anyhow!("Initial connection test failed: {}", e))?;
        Ok(test_db)
    }

    /// Create a database with every migration unit applied
    pub async fn with_migrations() -> anyhow::Result<Self> {
        let test_db = Self::new().await?;

        MigrationRunner::new(test_db.provider())
            .run(Direction::Up, "test")
            .await
            .map_err(|e| anyhow::anyhow!("Failed to run migrations: {}", e))?;

        Ok(test_db)
    }

    /// Provider handing out this database's connection
    pub fn provider(&self) -> StaticConnectionProvider {
        StaticConnectionProvider::new(self.db.clone())
    }

    pub fn connection(&self) -> Arc<DbConnection> {
        self.db.clone()
    }

    async fn test_connection(&self) -> Result<(), sea_orm::DbErr> {
        self.db
            .execute(Statement::from_string(
                DatabaseBackend::Sqlite,
                "SELECT 1".to_owned(),
            ))
            .await?;
        Ok(())
    }
}

//! Connection acquisition seam for the runner

use async_trait::async_trait;
use sea_orm::DatabaseConnection;
use std::sync::Arc;

use crate::MigrationError;

/// Supplies one database connection per runner invocation.
///
/// `acquire` is called once at the start of a run and `release` once at the
/// end, whatever the outcome.
#[async_trait]
pub trait ConnectionProvider: Send + Sync {
    async fn acquire(&self, environment: &str)
        -> Result<Arc<DatabaseConnection>, MigrationError>;

    async fn release(&self, connection: Arc<DatabaseConnection>) {
        drop(connection);
    }
}

#[async_trait]
impl<P> ConnectionProvider for Arc<P>
where
    P: ConnectionProvider + ?Sized,
{
    async fn acquire(
        &self,
        environment: &str,
    ) -> Result<Arc<DatabaseConnection>, MigrationError> {
        (**self).acquire(environment).await
    }

    async fn release(&self, connection: Arc<DatabaseConnection>) {
        (**self).release(connection).await
    }
}

/// Hands out an already-open connection regardless of environment name.
/// The connection outlives each run; `release` leaves it open.
#[derive(Clone)]
pub struct StaticConnectionProvider {
    connection: Arc<DatabaseConnection>,
}

impl StaticConnectionProvider {
    pub fn new(connection: Arc<DatabaseConnection>) -> Self {
        Self { connection }
    }

    pub fn connection(&self) -> &Arc<DatabaseConnection> {
        &self.connection
    }
}

#[async_trait]
impl ConnectionProvider for StaticConnectionProvider {
    async fn acquire(
        &self,
        _environment: &str,
    ) -> Result<Arc<DatabaseConnection>, MigrationError> {
        Ok(Arc::clone(&self.connection))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::{ConnectOptions, Database};

    #[tokio::test]
    async fn test_static_provider_shares_one_connection() {
        let mut opt = ConnectOptions::new("sqlite::memory:");
        opt.max_connections(1).sqlx_logging(false);
        let db = Arc::new(Database::connect(opt).await.unwrap());
        let provider = Arc::new(StaticConnectionProvider::new(db.clone()));

        let first = provider.acquire("local").await.unwrap();
        let second = provider.acquire("prod").await.unwrap();
        assert!(Arc::ptr_eq(&first, &db));
        assert!(Arc::ptr_eq(&second, provider.connection()));

        provider.release(first).await;
        provider.release(second).await;
        assert_eq!(Arc::strong_count(&db), 2);
    }
}

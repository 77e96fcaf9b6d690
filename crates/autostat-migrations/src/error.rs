use autostat_core::ServiceError;
use sea_orm::DbErr;
use thiserror::Error;

use crate::runner::Direction;

/// Failures surfaced by [`crate::MigrationRunner`].
///
/// Everything raised after the transaction is opened has already been rolled
/// back by the time the caller sees it.
#[derive(Error, Debug)]
pub enum MigrationError {
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Cannot reach the '{environment}' database: {reason}")]
    Connectivity { environment: String, reason: String },

    #[error("Migration {unit} failed while migrating {direction}: {source}")]
    UnitExecution {
        unit: String,
        direction: Direction,
        #[source]
        source: DbErr,
    },

    #[error("Migration ledger error: {0}")]
    Ledger(#[source] DbErr),

    #[error("Transaction error: {0}")]
    Transaction(#[source] DbErr),

    #[error("Failed to read rollback confirmation: {0}")]
    Confirmation(#[from] std::io::Error),
}

impl MigrationError {
    pub fn configuration(message: impl Into<String>) -> Self {
        MigrationError::Configuration {
            message: message.into(),
        }
    }

    /// Name of the unit whose statement failed, if any
    pub fn failed_unit(&self) -> Option<&str> {
        match self {
            MigrationError::UnitExecution { unit, .. } => Some(unit),
            _ => None,
        }
    }
}

impl From<ServiceError> for MigrationError {
    fn from(error: ServiceError) -> Self {
        match error {
            ServiceError::Configuration { message } => MigrationError::Configuration { message },
            other => MigrationError::Configuration {
                message: other.to_string(),
            },
        }
    }
}

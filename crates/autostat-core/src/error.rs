//! Common error types used across all Autostat services

use thiserror::Error;

/// Common service error types
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Configuration error: {message}")]
    Configuration { message: String },
}

impl ServiceError {
    pub fn configuration(message: impl Into<String>) -> Self {
        ServiceError::Configuration {
            message: message.into(),
        }
    }
}

/// Result type alias for service operations
pub type ServiceResult<T> = Result<T, ServiceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = ServiceError::configuration("DB_HOST is missing");
        assert_eq!(err.to_string(), "Configuration error: DB_HOST is missing");

        let err = ServiceError::Database("connection refused".to_string());
        assert_eq!(err.to_string(), "Database error: connection refused");
    }
}

use autostat_core::UtcDateTime;
use sea_orm::{DbErr, SqlErr};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::cascade::EntityKind;

#[derive(Error, Debug)]
pub enum RecordError {
    #[error("{entity} {id} not found")]
    NotFound { entity: EntityKind, id: i32 },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Soft delete cascade {relation} failed: {source}")]
    CascadeViolation {
        relation: &'static str,
        #[source]
        source: DbErr,
    },

    #[error("Database error: {reason}")]
    Database { reason: String },
}

impl From<DbErr> for RecordError {
    fn from(error: DbErr) -> Self {
        match error.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(detail)) => RecordError::Conflict(detail),
            _ => RecordError::Database {
                reason: error.to_string(),
            },
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateAccountRequest {
    pub email: String,
    /// Already hashed by the authentication layer
    pub password_hash: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateVehicleRequest {
    pub make: String,
    pub model: String,
    pub year: i32,
    pub vin: Option<String>,
    pub name: Option<String>,
    pub initial_mileage: Option<i32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateVehicleRequest {
    pub make: Option<String>,
    pub model: Option<String>,
    pub year: Option<i32>,
    pub vin: Option<String>,
    pub name: Option<String>,
    pub initial_mileage: Option<i32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateFillupRequest {
    pub filled_at: UtcDateTime,
    pub gallons: f64,
    pub total_cost: f64,
    pub odometer_reading: i32,
    pub station_address: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateFillupRequest {
    pub filled_at: Option<UtcDateTime>,
    pub gallons: Option<f64>,
    pub total_cost: Option<f64>,
    pub odometer_reading: Option<i32>,
    pub station_address: Option<String>,
    pub notes: Option<String>,
}

/// Aggregates over a vehicle's live fill-ups
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FillupStatistics {
    pub vehicle_id: i32,
    pub fillup_count: usize,
    pub total_gallons: f64,
    pub total_cost: f64,
    pub average_price_per_gallon: Option<f64>,
    /// Distance between the lowest and highest odometer readings divided by
    /// the fuel bought after the first fill-up. `None` with fewer than two fill-ups.
    pub miles_per_gallon: Option<f64>,
}

use std::sync::Arc;

use autostat_database::DbConnection;
use autostat_entities::{fillup_records, vehicles};
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set};
use tracing::{debug, info};

use super::cascade::{DeleteOutcome, EntityKind, SoftDeleteCascade};
use super::types::{CreateFillupRequest, FillupStatistics, RecordError, UpdateFillupRequest};

#[derive(Clone)]
pub struct FillupService {
    db: Arc<DbConnection>,
    cascade: Arc<SoftDeleteCascade>,
}

impl FillupService {
    pub fn new(db: Arc<DbConnection>) -> Self {
        Self::with_cascade(db, Arc::new(SoftDeleteCascade::default()))
    }

    pub fn with_cascade(db: Arc<DbConnection>, cascade: Arc<SoftDeleteCascade>) -> Self {
        FillupService { db, cascade }
    }

    async fn live_vehicle(&self, vehicle_id: i32) -> Result<vehicles::Model, RecordError> {
        vehicles::Entity::find_by_id(vehicle_id)
            .filter(vehicles::Column::DeletedAt.is_null())
            .one(self.db.as_ref())
            .await?
            .ok_or(RecordError::NotFound {
                entity: EntityKind::Vehicle,
                id: vehicle_id,
            })
    }

    pub async fn create(
        &self,
        vehicle_id: i32,
        request: CreateFillupRequest,
    ) -> Result<fillup_records::Model, RecordError> {
        validate_amounts(request.gallons, request.total_cost)?;
        validate_odometer(request.odometer_reading)?;
        self.live_vehicle(vehicle_id).await?;

        let record = fillup_records::ActiveModel {
            vehicle_id: Set(vehicle_id),
            filled_at: Set(request.filled_at),
            gallons: Set(request.gallons),
            total_cost: Set(request.total_cost),
            odometer_reading: Set(request.odometer_reading),
            station_address: Set(request.station_address),
            notes: Set(request.notes),
            ..Default::default()
        }
        .insert(self.db.as_ref())
        .await?;

        info!("Recorded fill-up {} for vehicle {}", record.id, vehicle_id);
        Ok(record)
    }

    pub async fn get(&self, id: i32) -> Result<fillup_records::Model, RecordError> {
        fillup_records::Entity::find_by_id(id)
            .filter(fillup_records::Column::DeletedAt.is_null())
            .one(self.db.as_ref())
            .await?
            .ok_or(RecordError::NotFound {
                entity: EntityKind::FillupRecord,
                id,
            })
    }

    /// Live fill-ups of a vehicle, most recent first
    pub async fn list_for_vehicle(
        &self,
        vehicle_id: i32,
    ) -> Result<Vec<fillup_records::Model>, RecordError> {
        let records = fillup_records::Entity::find()
            .filter(fillup_records::Column::VehicleId.eq(vehicle_id))
            .filter(fillup_records::Column::DeletedAt.is_null())
            .order_by_desc(fillup_records::Column::FilledAt)
            .order_by_desc(fillup_records::Column::Id)
            .all(self.db.as_ref())
            .await?;
        Ok(records)
    }

    pub async fn update(
        &self,
        id: i32,
        request: UpdateFillupRequest,
    ) -> Result<fillup_records::Model, RecordError> {
        let current = self.get(id).await?;
        validate_amounts(
            request.gallons.unwrap_or(current.gallons),
            request.total_cost.unwrap_or(current.total_cost),
        )?;
        if let Some(odometer) = request.odometer_reading {
            validate_odometer(odometer)?;
        }

        let mut record: fillup_records::ActiveModel = current.into();
        if let Some(filled_at) = request.filled_at {
            record.filled_at = Set(filled_at);
        }
        if let Some(gallons) = request.gallons {
            record.gallons = Set(gallons);
        }
        if let Some(total_cost) = request.total_cost {
            record.total_cost = Set(total_cost);
        }
        if let Some(odometer) = request.odometer_reading {
            record.odometer_reading = Set(odometer);
        }
        if request.station_address.is_some() {
            record.station_address = Set(request.station_address);
        }
        if request.notes.is_some() {
            record.notes = Set(request.notes);
        }

        Ok(record.update(self.db.as_ref()).await?)
    }

    /// Fill-ups own no children, so this marks a single row
    pub async fn delete(&self, id: i32) -> Result<DeleteOutcome, RecordError> {
        self.cascade
            .mark_deleted(self.db.as_ref(), EntityKind::FillupRecord, id)
            .await
    }

    pub async fn statistics(&self, vehicle_id: i32) -> Result<FillupStatistics, RecordError> {
        self.live_vehicle(vehicle_id).await?;

        let records = fillup_records::Entity::find()
            .filter(fillup_records::Column::VehicleId.eq(vehicle_id))
            .filter(fillup_records::Column::DeletedAt.is_null())
            .order_by_asc(fillup_records::Column::OdometerReading)
            .all(self.db.as_ref())
            .await?;

        let total_gallons: f64 = records.iter().map(|r| r.gallons).sum();
        let total_cost: f64 = records.iter().map(|r| r.total_cost).sum();
        let average_price_per_gallon = (total_gallons > 0.0).then(|| total_cost / total_gallons);

        // The first fill-up only tops up the tank; its fuel was burned before tracking began.
        let miles_per_gallon = match (records.first(), records.last()) {
            (Some(first), Some(last)) if records.len() > 1 => {
                let distance = f64::from(last.odometer_reading - first.odometer_reading);
                let fuel: f64 = records.iter().skip(1).map(|r| r.gallons).sum();
                (fuel > 0.0).then(|| distance / fuel)
            }
            _ => None,
        };

        debug!(
            "Computed statistics over {} fill-ups of vehicle {}",
            records.len(),
            vehicle_id
        );
        Ok(FillupStatistics {
            vehicle_id,
            fillup_count: records.len(),
            total_gallons,
            total_cost,
            average_price_per_gallon,
            miles_per_gallon,
        })
    }
}

fn validate_amounts(gallons: f64, total_cost: f64) -> Result<(), RecordError> {
    if !gallons.is_finite() || gallons <= 0.0 {
        return Err(RecordError::Validation(
            "Gallons must be greater than zero".to_string(),
        ));
    }
    if !total_cost.is_finite() || total_cost < 0.0 {
        return Err(RecordError::Validation(
            "Total cost cannot be negative".to_string(),
        ));
    }
    Ok(())
}

fn validate_odometer(odometer: i32) -> Result<(), RecordError> {
    if odometer < 0 {
        return Err(RecordError::Validation(
            "Odometer reading cannot be negative".to_string(),
        ));
    }
    Ok(())
}

use std::sync::Arc;

use autostat_database::DbConnection;
use autostat_entities::{accounts, vehicles};
use chrono::{Datelike, Utc};
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set};
use tracing::info;

use super::cascade::{DeleteOutcome, EntityKind, SoftDeleteCascade};
use super::types::{CreateVehicleRequest, RecordError, UpdateVehicleRequest};

const FIRST_MODEL_YEAR: i32 = 1886;

#[derive(Clone)]
pub struct VehicleService {
    db: Arc<DbConnection>,
    cascade: Arc<SoftDeleteCascade>,
}

impl VehicleService {
    pub fn new(db: Arc<DbConnection>) -> Self {
        Self::with_cascade(db, Arc::new(SoftDeleteCascade::default()))
    }

    pub fn with_cascade(db: Arc<DbConnection>, cascade: Arc<SoftDeleteCascade>) -> Self {
        VehicleService { db, cascade }
    }

    /// Register a vehicle under a live account
    pub async fn create(
        &self,
        account_id: i32,
        request: CreateVehicleRequest,
    ) -> Result<vehicles::Model, RecordError> {
        validate_text("make", &request.make)?;
        validate_text("model", &request.model)?;
        validate_year(request.year)?;
        if let Some(mileage) = request.initial_mileage {
            validate_mileage(mileage)?;
        }

        accounts::Entity::find_by_id(account_id)
            .filter(accounts::Column::DeletedAt.is_null())
            .one(self.db.as_ref())
            .await?
            .ok_or(RecordError::NotFound {
                entity: EntityKind::Account,
                id: account_id,
            })?;

        let mut vehicle = vehicles::ActiveModel {
            account_id: Set(account_id),
            make: Set(request.make.trim().to_string()),
            model: Set(request.model.trim().to_string()),
            year: Set(request.year),
            vin: Set(request.vin),
            name: Set(request.name),
            ..Default::default()
        };
        if let Some(mileage) = request.initial_mileage {
            vehicle.initial_mileage = Set(mileage);
        }

        let vehicle = vehicle.insert(self.db.as_ref()).await?;
        info!("Created vehicle {} for account {}", vehicle.id, account_id);
        Ok(vehicle)
    }

    pub async fn get(&self, id: i32) -> Result<vehicles::Model, RecordError> {
        vehicles::Entity::find_by_id(id)
            .filter(vehicles::Column::DeletedAt.is_null())
            .one(self.db.as_ref())
            .await?
            .ok_or(RecordError::NotFound {
                entity: EntityKind::Vehicle,
                id,
            })
    }

    pub async fn list_for_account(
        &self,
        account_id: i32,
    ) -> Result<Vec<vehicles::Model>, RecordError> {
        let vehicles = vehicles::Entity::find()
            .filter(vehicles::Column::AccountId.eq(account_id))
            .filter(vehicles::Column::DeletedAt.is_null())
            .order_by_asc(vehicles::Column::Id)
            .all(self.db.as_ref())
            .await?;
        Ok(vehicles)
    }

    pub async fn update(
        &self,
        id: i32,
        request: UpdateVehicleRequest,
    ) -> Result<vehicles::Model, RecordError> {
        let mut vehicle: vehicles::ActiveModel = self.get(id).await?.into();

        if let Some(make) = request.make {
            validate_text("make", &make)?;
            vehicle.make = Set(make.trim().to_string());
        }
        if let Some(model) = request.model {
            validate_text("model", &model)?;
            vehicle.model = Set(model.trim().to_string());
        }
        if let Some(year) = request.year {
            validate_year(year)?;
            vehicle.year = Set(year);
        }
        if let Some(mileage) = request.initial_mileage {
            validate_mileage(mileage)?;
            vehicle.initial_mileage = Set(mileage);
        }
        if request.vin.is_some() {
            vehicle.vin = Set(request.vin);
        }
        if request.name.is_some() {
            vehicle.name = Set(request.name);
        }

        Ok(vehicle.update(self.db.as_ref()).await?)
    }

    /// Soft delete the vehicle and its fill-up records
    pub async fn delete(&self, id: i32) -> Result<DeleteOutcome, RecordError> {
        self.cascade
            .mark_deleted(self.db.as_ref(), EntityKind::Vehicle, id)
            .await
    }
}

fn validate_text(field: &str, value: &str) -> Result<(), RecordError> {
    if value.trim().is_empty() {
        return Err(RecordError::Validation(format!("Vehicle {} is required", field)));
    }
    Ok(())
}

fn validate_year(year: i32) -> Result<(), RecordError> {
    let latest = Utc::now().year() + 1;
    if !(FIRST_MODEL_YEAR..=latest).contains(&year) {
        return Err(RecordError::Validation(format!(
            "Vehicle year must be between {} and {}",
            FIRST_MODEL_YEAR, latest
        )));
    }
    Ok(())
}

fn validate_mileage(mileage: i32) -> Result<(), RecordError> {
    if mileage < 0 {
        return Err(RecordError::Validation(
            "Initial mileage cannot be negative".to_string(),
        ));
    }
    Ok(())
}

use std::sync::Arc;

use async_trait::async_trait;
use autostat_core::DBDateTime;
use autostat_database::sea_orm::{ActiveValue::Set, DatabaseTransaction, DbErr, EntityTrait};
use autostat_database::test_utils::TestDatabase;
use autostat_entities::{accounts, fillup_records, vehicles};
use autostat_records::{
    AccountService, CascadeRelation, CreateAccountRequest, CreateFillupRequest,
    CreateVehicleRequest, EntityKind, FillupService, RecordError, SoftDeleteCascade,
    UpdateFillupRequest, UpdateVehicleRequest, VehicleService,
};
use chrono::{Duration, TimeZone, Utc};

struct Services {
    test_db: TestDatabase,
    accounts: AccountService,
    vehicles: VehicleService,
    fillups: FillupService,
}

async fn setup() -> anyhow::Result<Services> {
    let test_db = TestDatabase::with_migrations().await?;
    let db = test_db.connection();
    Ok(Services {
        accounts: AccountService::new(db.clone()),
        vehicles: VehicleService::new(db.clone()),
        fillups: FillupService::new(db),
        test_db,
    })
}

fn account_request(email: &str) -> CreateAccountRequest {
    CreateAccountRequest {
        email: email.to_string(),
        password_hash: "$argon2id$v=19$hash".to_string(),
    }
}

fn vehicle_request(make: &str, model: &str) -> CreateVehicleRequest {
    CreateVehicleRequest {
        make: make.to_string(),
        model: model.to_string(),
        year: 2019,
        vin: None,
        name: None,
        initial_mileage: None,
    }
}

fn fillup_request(odometer: i32, gallons: f64, total_cost: f64) -> CreateFillupRequest {
    CreateFillupRequest {
        filled_at: Utc.with_ymd_and_hms(2025, 3, 1, 8, 0, 0).unwrap()
            + Duration::days(i64::from(odometer / 100)),
        gallons,
        total_cost,
        odometer_reading: odometer,
        station_address: None,
        notes: None,
    }
}

/// Account with two vehicles, each holding two fill-ups
async fn seed(services: &Services, email: &str) -> anyhow::Result<(i32, Vec<i32>, Vec<i32>)> {
    let account = services.accounts.create(account_request(email)).await?;
    let mut vehicle_ids = Vec::new();
    let mut fillup_ids = Vec::new();
    for (make, model) in [("Honda", "Civic"), ("Ford", "F-150")] {
        let vehicle = services
            .vehicles
            .create(account.id, vehicle_request(make, model))
            .await?;
        for odometer in [1000, 1300] {
            let fillup = services
                .fillups
                .create(vehicle.id, fillup_request(odometer, 10.0, 35.0))
                .await?;
            fillup_ids.push(fillup.id);
        }
        vehicle_ids.push(vehicle.id);
    }
    Ok((account.id, vehicle_ids, fillup_ids))
}

#[tokio::test]
async fn test_account_delete_cascades_with_parent_timestamp() -> anyhow::Result<()> {
    let services = setup().await?;
    let db = services.test_db.connection();
    let (account_id, vehicle_ids, fillup_ids) = seed(&services, "owner@example.com").await?;

    let outcome = services.accounts.delete(account_id).await?;
    assert!(outcome.transitioned);
    let deleted_at = outcome.deleted_at.expect("deleted_at set on transition");

    let account = accounts::Entity::find_by_id(account_id)
        .one(db.as_ref())
        .await?
        .expect("account row kept");
    assert_eq!(account.deleted_at, Some(deleted_at));

    for id in &vehicle_ids {
        let vehicle = vehicles::Entity::find_by_id(*id)
            .one(db.as_ref())
            .await?
            .expect("vehicle row kept");
        assert_eq!(vehicle.deleted_at, Some(deleted_at));
    }
    for id in &fillup_ids {
        let fillup = fillup_records::Entity::find_by_id(*id)
            .one(db.as_ref())
            .await?
            .expect("fill-up row kept");
        assert_eq!(fillup.deleted_at, Some(deleted_at));
    }

    let counts: Vec<(EntityKind, usize)> = outcome
        .cascaded
        .iter()
        .map(|effect| (effect.child, effect.count))
        .collect();
    assert_eq!(
        counts,
        vec![(EntityKind::Vehicle, 2), (EntityKind::FillupRecord, 4)]
    );
    Ok(())
}

#[tokio::test]
async fn test_second_delete_is_a_noop() -> anyhow::Result<()> {
    let services = setup().await?;
    let db = services.test_db.connection();
    let (account_id, vehicle_ids, _) = seed(&services, "twice@example.com").await?;

    let first = services.accounts.delete(account_id).await?;
    let second = services.accounts.delete(account_id).await?;

    assert!(!second.transitioned);
    assert!(second.deleted_at.is_none());
    assert!(second.cascaded.is_empty());

    let account = accounts::Entity::find_by_id(account_id)
        .one(db.as_ref())
        .await?
        .expect("account row kept");
    assert_eq!(account.deleted_at, first.deleted_at);
    let vehicle = vehicles::Entity::find_by_id(vehicle_ids[0])
        .one(db.as_ref())
        .await?
        .expect("vehicle row kept");
    assert_eq!(vehicle.deleted_at, first.deleted_at);
    Ok(())
}

#[tokio::test]
async fn test_already_deleted_children_keep_their_timestamp() -> anyhow::Result<()> {
    let services = setup().await?;
    let db = services.test_db.connection();
    let (account_id, vehicle_ids, _) = seed(&services, "earlier@example.com").await?;

    let vehicle_outcome = services.vehicles.delete(vehicle_ids[0]).await?;
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    let account_outcome = services.accounts.delete(account_id).await?;

    let first = vehicles::Entity::find_by_id(vehicle_ids[0])
        .one(db.as_ref())
        .await?
        .expect("vehicle row kept");
    let second = vehicles::Entity::find_by_id(vehicle_ids[1])
        .one(db.as_ref())
        .await?
        .expect("vehicle row kept");
    assert_eq!(first.deleted_at, vehicle_outcome.deleted_at);
    assert_eq!(second.deleted_at, account_outcome.deleted_at);
    assert_ne!(first.deleted_at, second.deleted_at);
    Ok(())
}

#[tokio::test]
async fn test_delete_leaves_other_accounts_untouched() -> anyhow::Result<()> {
    let services = setup().await?;
    let (doomed, _, _) = seed(&services, "doomed@example.com").await?;
    let (kept, kept_vehicles, _) = seed(&services, "kept@example.com").await?;

    services.accounts.delete(doomed).await?;

    assert_eq!(services.accounts.get(kept).await?.id, kept);
    assert_eq!(services.vehicles.list_for_account(kept).await?.len(), 2);
    for id in kept_vehicles {
        assert_eq!(services.fillups.list_for_vehicle(id).await?.len(), 2);
    }
    Ok(())
}

#[tokio::test]
async fn test_vehicle_delete_stops_at_its_subtree() -> anyhow::Result<()> {
    let services = setup().await?;
    let (account_id, vehicle_ids, _) = seed(&services, "garage@example.com").await?;

    let outcome = services.vehicles.delete(vehicle_ids[0]).await?;
    assert!(outcome.transitioned);
    assert_eq!(outcome.cascaded.len(), 1);
    assert_eq!(outcome.cascaded[0].relation, "vehicle_fillups");
    assert_eq!(outcome.cascaded[0].count, 2);

    assert!(services.accounts.get(account_id).await.is_ok());
    let live: Vec<i32> = services
        .vehicles
        .list_for_account(account_id)
        .await?
        .into_iter()
        .map(|v| v.id)
        .collect();
    assert_eq!(live, vec![vehicle_ids[1]]);
    assert!(services
        .fillups
        .list_for_vehicle(vehicle_ids[0])
        .await?
        .is_empty());
    assert_eq!(
        services.fillups.list_for_vehicle(vehicle_ids[1]).await?.len(),
        2
    );
    Ok(())
}

#[tokio::test]
async fn test_deleted_entities_are_hidden_from_reads() -> anyhow::Result<()> {
    let services = setup().await?;
    let (account_id, vehicle_ids, fillup_ids) = seed(&services, "hidden@example.com").await?;

    services.accounts.delete(account_id).await?;

    assert!(matches!(
        services.accounts.get(account_id).await,
        Err(RecordError::NotFound {
            entity: EntityKind::Account,
            ..
        })
    ));
    assert!(services
        .accounts
        .find_by_email("hidden@example.com")
        .await?
        .is_none());
    assert!(services.vehicles.list_for_account(account_id).await?.is_empty());
    assert!(matches!(
        services.vehicles.get(vehicle_ids[0]).await,
        Err(RecordError::NotFound { .. })
    ));
    assert!(matches!(
        services.fillups.get(fillup_ids[0]).await,
        Err(RecordError::NotFound { .. })
    ));
    assert!(matches!(
        services
            .vehicles
            .create(account_id, vehicle_request("Mazda", "3"))
            .await,
        Err(RecordError::NotFound {
            entity: EntityKind::Account,
            ..
        })
    ));
    Ok(())
}

#[tokio::test]
async fn test_delete_missing_entity_is_not_found() -> anyhow::Result<()> {
    let services = setup().await?;

    let result = services.accounts.delete(4242).await;
    assert!(matches!(
        result,
        Err(RecordError::NotFound {
            entity: EntityKind::Account,
            id: 4242
        })
    ));
    Ok(())
}

#[tokio::test]
async fn test_delete_with_wide_fan_out() -> anyhow::Result<()> {
    const FILLUPS: i32 = 260_000;

    let services = setup().await?;
    let db = services.test_db.connection();
    let account = services
        .accounts
        .create(account_request("fleet@example.com"))
        .await?;
    let vehicle = services
        .vehicles
        .create(account.id, vehicle_request("Isuzu", "N-Series"))
        .await?;

    let filled_at = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
    for start in (0..FILLUPS).step_by(2000) {
        let end = (start + 2000).min(FILLUPS);
        let batch = (start..end).map(|odometer| fillup_records::ActiveModel {
            vehicle_id: Set(vehicle.id),
            filled_at: Set(filled_at),
            gallons: Set(1.0),
            total_cost: Set(3.5),
            odometer_reading: Set(odometer),
            created_at: Set(filled_at),
            ..Default::default()
        });
        fillup_records::Entity::insert_many(batch)
            .exec(db.as_ref())
            .await?;
    }

    let outcome = services.accounts.delete(account.id).await?;
    let counts: Vec<(EntityKind, usize)> = outcome
        .cascaded
        .iter()
        .map(|effect| (effect.child, effect.count))
        .collect();
    assert_eq!(
        counts,
        vec![
            (EntityKind::Vehicle, 1),
            (EntityKind::FillupRecord, FILLUPS as usize)
        ]
    );
    assert!(services
        .fillups
        .list_for_vehicle(vehicle.id)
        .await?
        .is_empty());
    Ok(())
}

struct BrokenRelation;

#[async_trait]
impl CascadeRelation for BrokenRelation {
    fn name(&self) -> &'static str {
        "broken"
    }

    fn parent(&self) -> EntityKind {
        EntityKind::Account
    }

    fn child(&self) -> EntityKind {
        EntityKind::Vehicle
    }

    async fn propagate(
        &self,
        _txn: &DatabaseTransaction,
        _parent_ids: &[i32],
        _deleted_at: DBDateTime,
    ) -> Result<Vec<i32>, DbErr> {
        Err(DbErr::Custom("child table unavailable".to_string()))
    }
}

#[tokio::test]
async fn test_failing_relation_rolls_back_whole_delete() -> anyhow::Result<()> {
    let services = setup().await?;
    let db = services.test_db.connection();
    let (account_id, vehicle_ids, fillup_ids) = seed(&services, "atomic@example.com").await?;

    let cascade = Arc::new(SoftDeleteCascade::default().with_relation(BrokenRelation));
    let account_service = AccountService::with_cascade(db.clone(), cascade);

    let result = account_service.delete(account_id).await;
    assert!(matches!(
        result,
        Err(RecordError::CascadeViolation {
            relation: "broken",
            ..
        })
    ));

    let account = accounts::Entity::find_by_id(account_id)
        .one(db.as_ref())
        .await?
        .expect("account row kept");
    assert!(account.deleted_at.is_none());
    for id in vehicle_ids {
        let vehicle = vehicles::Entity::find_by_id(id)
            .one(db.as_ref())
            .await?
            .expect("vehicle row kept");
        assert!(vehicle.deleted_at.is_none());
    }
    for id in fillup_ids {
        let fillup = fillup_records::Entity::find_by_id(id)
            .one(db.as_ref())
            .await?
            .expect("fill-up row kept");
        assert!(fillup.deleted_at.is_none());
    }
    Ok(())
}

#[tokio::test]
async fn test_default_cascade_relations() {
    let cascade = SoftDeleteCascade::default();
    assert_eq!(
        cascade.relation_names(),
        vec!["account_vehicles", "vehicle_fillups"]
    );
}

#[tokio::test]
async fn test_account_email_is_unique() -> anyhow::Result<()> {
    let services = setup().await?;
    services
        .accounts
        .create(account_request("Dup@Example.com"))
        .await?;

    let duplicate = services
        .accounts
        .create(account_request("dup@example.com"))
        .await;
    assert!(matches!(duplicate, Err(RecordError::Conflict(_))));

    let invalid = services.accounts.create(account_request("nobody")).await;
    assert!(matches!(invalid, Err(RecordError::Validation(_))));
    Ok(())
}

#[tokio::test]
async fn test_vehicle_create_and_update() -> anyhow::Result<()> {
    let services = setup().await?;
    let account = services
        .accounts
        .create(account_request("driver@example.com"))
        .await?;

    let vehicle = services
        .vehicles
        .create(account.id, vehicle_request("Toyota", "Corolla"))
        .await?;
    assert_eq!(vehicle.initial_mileage, 0);
    assert!(vehicle.updated_at.is_none());

    let updated = services
        .vehicles
        .update(
            vehicle.id,
            UpdateVehicleRequest {
                name: Some("Daily".to_string()),
                initial_mileage: Some(12000),
                ..Default::default()
            },
        )
        .await?;
    assert_eq!(updated.name.as_deref(), Some("Daily"));
    assert_eq!(updated.initial_mileage, 12000);
    assert_eq!(updated.make, "Toyota");
    assert!(updated.updated_at.is_some());

    let bad_year = services
        .vehicles
        .create(
            account.id,
            CreateVehicleRequest {
                year: 1700,
                ..vehicle_request("Benz", "Motorwagen")
            },
        )
        .await;
    assert!(matches!(bad_year, Err(RecordError::Validation(_))));
    Ok(())
}

#[tokio::test]
async fn test_fillup_listing_update_and_statistics() -> anyhow::Result<()> {
    let services = setup().await?;
    let account = services
        .accounts
        .create(account_request("stats@example.com"))
        .await?;
    let vehicle = services
        .vehicles
        .create(account.id, vehicle_request("Subaru", "Outback"))
        .await?;

    let first = services
        .fillups
        .create(vehicle.id, fillup_request(10000, 12.0, 42.0))
        .await?;
    services
        .fillups
        .create(vehicle.id, fillup_request(10300, 10.0, 36.0))
        .await?;
    let last = services
        .fillups
        .create(vehicle.id, fillup_request(10600, 10.0, 38.0))
        .await?;

    let listed: Vec<i32> = services
        .fillups
        .list_for_vehicle(vehicle.id)
        .await?
        .into_iter()
        .map(|f| f.id)
        .collect();
    assert_eq!(listed.first(), Some(&last.id));
    assert_eq!(listed.last(), Some(&first.id));

    let stats = services.fillups.statistics(vehicle.id).await?;
    assert_eq!(stats.fillup_count, 3);
    assert!((stats.total_gallons - 32.0).abs() < 1e-9);
    assert!((stats.total_cost - 116.0).abs() < 1e-9);
    assert!((stats.miles_per_gallon.expect("two or more fill-ups") - 30.0).abs() < 1e-9);

    let updated = services
        .fillups
        .update(
            last.id,
            UpdateFillupRequest {
                notes: Some("Highway trip".to_string()),
                ..Default::default()
            },
        )
        .await?;
    assert_eq!(updated.notes.as_deref(), Some("Highway trip"));

    let rejected = services
        .fillups
        .update(
            last.id,
            UpdateFillupRequest {
                gallons: Some(0.0),
                ..Default::default()
            },
        )
        .await;
    assert!(matches!(rejected, Err(RecordError::Validation(_))));

    services.fillups.delete(last.id).await?;
    let stats = services.fillups.statistics(vehicle.id).await?;
    assert_eq!(stats.fillup_count, 2);
    assert!((stats.miles_per_gallon.expect("two or more fill-ups") - 30.0).abs() < 1e-9);
    Ok(())
}

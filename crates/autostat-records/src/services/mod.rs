mod accounts;
mod cascade;
mod fillups;
mod types;
mod vehicles;

pub use accounts::AccountService;
pub use cascade::{
    AccountVehicles, CascadeEffect, CascadeRelation, DeleteOutcome, EntityKind,
    SoftDeleteCascade, VehicleFillups,
};
pub use fillups::FillupService;
pub use types::*;
pub use vehicles::VehicleService;

//! Schema migrations for the Autostat database
//!
//! Migration units are plain `sea_orm_migration::MigrationTrait` implementations.
//! They are not driven by sea-orm's own migrator: [`MigrationRunner`] applies or
//! reverts them inside a single transaction and keeps its own ledger table.

mod confirmation;
mod error;
pub mod job;
pub mod ledger;
mod migration;
mod provider;
mod runner;

pub use confirmation::{
    confirmation_phrase, InteractiveConfirmation, NonInteractive, RollbackConfirmation,
};
pub use error::MigrationError;
pub use migration::Migrator;
pub use provider::{ConnectionProvider, StaticConnectionProvider};
pub use runner::{Direction, MigrationRunner, MigrationSummary, RunStatus, UnitStatus};
pub use sea_orm_migration::{MigrationName, MigrationTrait, SchemaManager};

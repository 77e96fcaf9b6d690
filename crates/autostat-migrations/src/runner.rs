//! Transactional application and rollback of migration units

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use autostat_core::DBDateTime;
use sea_orm::{DatabaseConnection, DatabaseTransaction, TransactionTrait};
use sea_orm_migration::prelude::*;
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::confirmation::{NonInteractive, RollbackConfirmation};
use crate::ledger;
use crate::migration::Migrator;
use crate::provider::ConnectionProvider;
use crate::MigrationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Up => write!(f, "up"),
            Direction::Down => write!(f, "down"),
        }
    }
}

impl FromStr for Direction {
    type Err = MigrationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "up" => Ok(Direction::Up),
            "down" => Ok(Direction::Down),
            other => Err(MigrationError::configuration(format!(
                "unknown migration direction '{}' (expected 'up' or 'down')",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    /// The transaction committed; `applied` lists what changed
    Committed,
    /// The operator declined the rollback; nothing was touched
    Cancelled,
}

/// What a single `run` did
#[derive(Debug, Clone, Serialize)]
pub struct MigrationSummary {
    pub direction: Direction,
    pub environment: String,
    pub status: RunStatus,
    /// Units applied (up) or reverted (down), in execution order
    pub applied: Vec<String>,
    /// Units left alone because the ledger already (up) or never (down) had them
    pub skipped: Vec<String>,
    /// Ledger names with no matching unit
    pub orphaned: Vec<String>,
    pub ledger_dropped: bool,
}

impl MigrationSummary {
    fn new(direction: Direction, environment: &str) -> Self {
        Self {
            direction,
            environment: environment.to_string(),
            status: RunStatus::Committed,
            applied: Vec::new(),
            skipped: Vec::new(),
            orphaned: Vec::new(),
            ledger_dropped: false,
        }
    }

    fn cancelled(direction: Direction, environment: &str) -> Self {
        Self {
            status: RunStatus::Cancelled,
            ..Self::new(direction, environment)
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.status == RunStatus::Cancelled
    }
}

/// Ledger state of one known unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnitStatus {
    pub name: String,
    pub applied_at: Option<DBDateTime>,
}

impl UnitStatus {
    pub fn is_applied(&self) -> bool {
        self.applied_at.is_some()
    }
}

/// Applies or reverts a fixed, ordered list of units against one environment.
///
/// Each `run` acquires one connection from the provider, does all of its work
/// in one transaction and releases the connection afterwards. Either every
/// pending unit and its ledger entry commits, or nothing does.
pub struct MigrationRunner<P> {
    provider: P,
    units: Vec<Box<dyn MigrationTrait>>,
    confirmation: Box<dyn RollbackConfirmation>,
}

impl<P: ConnectionProvider> MigrationRunner<P> {
    /// Runner over the canonical unit list
    pub fn new(provider: P) -> Self {
        Self::with_units(provider, Migrator::units())
    }

    /// Runner over an arbitrary unit list, executed in the given order
    pub fn with_units(provider: P, units: Vec<Box<dyn MigrationTrait>>) -> Self {
        Self {
            provider,
            units,
            confirmation: Box::new(NonInteractive),
        }
    }

    /// Replace the rollback gate. The default gate never prompts.
    pub fn with_confirmation<C>(mut self, confirmation: C) -> Self
    where
        C: RollbackConfirmation + 'static,
    {
        self.confirmation = Box::new(confirmation);
        self
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn unit_names(&self) -> Vec<&str> {
        self.units.iter().map(|unit| unit.name()).collect()
    }

    pub async fn run(
        &self,
        direction: Direction,
        environment: &str,
    ) -> Result<MigrationSummary, MigrationError> {
        info!(
            "Running migrations {} in {} environment...",
            direction, environment
        );
        self.validate_units()?;

        if direction == Direction::Down && !self.confirmation.confirm(environment)? {
            info!("Down-migration cancelled for {} environment", environment);
            return Ok(MigrationSummary::cancelled(direction, environment));
        }

        let db = self.provider.acquire(environment).await?;
        let result = self.run_on(db.as_ref(), direction, environment).await;
        self.provider.release(db).await;

        match &result {
            Ok(summary) => info!(
                "Migrations {} in {} environment: {} executed, {} skipped",
                match direction {
                    Direction::Up => "completed",
                    Direction::Down => "rolled back",
                },
                environment,
                summary.applied.len(),
                summary.skipped.len()
            ),
            Err(e) => error!(
                "Migration {} failed in {} environment, no partial change was committed: {}",
                direction, environment, e
            ),
        }

        result
    }

    /// Ledger view of every known unit, without changing anything
    pub async fn status(&self, environment: &str) -> Result<Vec<UnitStatus>, MigrationError> {
        let db = self.provider.acquire(environment).await?;
        let entries = {
            let manager = SchemaManager::new(db.as_ref());
            ledger::entries(&manager).await
        };
        self.provider.release(db).await;
        let entries = entries.map_err(MigrationError::Ledger)?;

        Ok(self
            .units
            .iter()
            .map(|unit| UnitStatus {
                name: unit.name().to_string(),
                applied_at: entries
                    .iter()
                    .find(|entry| entry.name == unit.name())
                    .map(|entry| entry.applied_at),
            })
            .collect())
    }

    fn validate_units(&self) -> Result<(), MigrationError> {
        let mut seen = HashSet::new();
        for name in self.unit_names() {
            if !seen.insert(name) {
                return Err(MigrationError::configuration(format!(
                    "duplicate migration unit name '{}'",
                    name
                )));
            }
        }

        let names = self.unit_names();
        if names.windows(2).any(|pair| pair[0] >= pair[1]) {
            warn!("Migration unit names do not sort in declaration order: {:?}", names);
        }

        Ok(())
    }

    async fn run_on(
        &self,
        db: &DatabaseConnection,
        direction: Direction,
        environment: &str,
    ) -> Result<MigrationSummary, MigrationError> {
        let txn = db.begin().await.map_err(|e| MigrationError::Connectivity {
            environment: environment.to_string(),
            reason: e.to_string(),
        })?;

        let mut summary = MigrationSummary::new(direction, environment);
        match self.execute(&txn, direction, &mut summary).await {
            Ok(()) => {
                txn.commit().await.map_err(MigrationError::Transaction)?;
                Ok(summary)
            }
            Err(e) => {
                if let Err(rollback_err) = txn.rollback().await {
                    error!("Failed to roll back migration transaction: {}", rollback_err);
                }
                Err(e)
            }
        }
    }

    async fn execute(
        &self,
        txn: &DatabaseTransaction,
        direction: Direction,
        summary: &mut MigrationSummary,
    ) -> Result<(), MigrationError> {
        let manager = SchemaManager::new(txn);

        // Ensured in both directions, before any unit runs
        ledger::ensure_table(&manager)
            .await
            .map_err(MigrationError::Ledger)?;
        let recorded = ledger::applied_names(&manager)
            .await
            .map_err(MigrationError::Ledger)?;

        let known: HashSet<&str> = self.units.iter().map(|unit| unit.name()).collect();
        for name in recorded.iter().filter(|name| !known.contains(name.as_str())) {
            warn!(
                "Ledger records migration {} which is not in the known unit list",
                name
            );
            summary.orphaned.push(name.clone());
        }
        let recorded: HashSet<&str> = recorded.iter().map(String::as_str).collect();

        match direction {
            Direction::Up => {
                for unit in &self.units {
                    let name = unit.name();
                    if recorded.contains(name) {
                        info!("Skipping already executed migration: {}", name);
                        summary.skipped.push(name.to_string());
                        continue;
                    }

                    info!("Running migration: {}", name);
                    unit.up(&manager)
                        .await
                        .map_err(|source| MigrationError::UnitExecution {
                            unit: name.to_string(),
                            direction,
                            source,
                        })?;
                    ledger::record(&manager, name)
                        .await
                        .map_err(MigrationError::Ledger)?;
                    info!("Completed migration: {}", name);
                    summary.applied.push(name.to_string());
                }
            }
            Direction::Down => {
                for unit in self.units.iter().rev() {
                    let name = unit.name();
                    if !recorded.contains(name) {
                        debug!("Migration {} was never applied, nothing to roll back", name);
                        summary.skipped.push(name.to_string());
                        continue;
                    }

                    info!("Rolling back migration: {}", name);
                    unit.down(&manager)
                        .await
                        .map_err(|source| MigrationError::UnitExecution {
                            unit: name.to_string(),
                            direction,
                            source,
                        })?;
                    ledger::remove(&manager, name)
                        .await
                        .map_err(MigrationError::Ledger)?;
                    info!("Completed rollback: {}", name);
                    summary.applied.push(name.to_string());
                }

                info!("Dropping migrations table");
                ledger::drop_table(&manager)
                    .await
                    .map_err(MigrationError::Ledger)?;
                summary.ledger_dropped = true;
            }
        }

        Ok(())
    }
}

//! Cascading soft delete along the account -> vehicle -> fill-up chain
//!
//! Each ownership edge is one [`CascadeRelation`]. Marking an entity deleted
//! runs every relation whose parent is that entity kind, then every relation
//! whose parent is one of the children that just transitioned, and so on. A new
//! child table only needs a new relation.

use std::collections::VecDeque;
use std::fmt;

use async_trait::async_trait;
use autostat_core::DBDateTime;
use autostat_entities::{accounts, fillup_records, vehicles};
use chrono::{SubsecRound, Utc};
use sea_orm::{
    sea_query::Expr, ColumnTrait, DatabaseConnection, DatabaseTransaction, DbErr, EntityTrait,
    QueryFilter, QuerySelect, TransactionTrait,
};
use serde::Serialize;
use tracing::{debug, error, info};

use super::types::RecordError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Account,
    Vehicle,
    FillupRecord,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityKind::Account => write!(f, "Account"),
            EntityKind::Vehicle => write!(f, "Vehicle"),
            EntityKind::FillupRecord => write!(f, "Fill-up record"),
        }
    }
}

/// One parent -> child ownership edge
#[async_trait]
pub trait CascadeRelation: Send + Sync {
    fn name(&self) -> &'static str;
    fn parent(&self) -> EntityKind;
    fn child(&self) -> EntityKind;

    /// Copy `deleted_at` onto every live child of `parent_ids` and return the
    /// ids of the children that transitioned.
    async fn propagate(
        &self,
        txn: &DatabaseTransaction,
        parent_ids: &[i32],
        deleted_at: DBDateTime,
    ) -> Result<Vec<i32>, DbErr>;
}

/// Accounts own vehicles through `vehicles.account_id`
pub struct AccountVehicles;

#[async_trait]
impl CascadeRelation for AccountVehicles {
    fn name(&self) -> &'static str {
        "account_vehicles"
    }

    fn parent(&self) -> EntityKind {
        EntityKind::Account
    }

    fn child(&self) -> EntityKind {
        EntityKind::Vehicle
    }

    async fn propagate(
        &self,
        txn: &DatabaseTransaction,
        parent_ids: &[i32],
        deleted_at: DBDateTime,
    ) -> Result<Vec<i32>, DbErr> {
        mark_live_children::<vehicles::Entity>(
            txn,
            vehicles::Column::Id,
            vehicles::Column::AccountId,
            vehicles::Column::DeletedAt,
            parent_ids,
            deleted_at,
        )
        .await
    }
}

/// Vehicles own fill-up records through `fillup_records.vehicle_id`
pub struct VehicleFillups;

#[async_trait]
impl CascadeRelation for VehicleFillups {
    fn name(&self) -> &'static str {
        "vehicle_fillups"
    }

    fn parent(&self) -> EntityKind {
        EntityKind::Vehicle
    }

    fn child(&self) -> EntityKind {
        EntityKind::FillupRecord
    }

    async fn propagate(
        &self,
        txn: &DatabaseTransaction,
        parent_ids: &[i32],
        deleted_at: DBDateTime,
    ) -> Result<Vec<i32>, DbErr> {
        mark_live_children::<fillup_records::Entity>(
            txn,
            fillup_records::Column::Id,
            fillup_records::Column::VehicleId,
            fillup_records::Column::DeletedAt,
            parent_ids,
            deleted_at,
        )
        .await
    }
}

/// Parent ids bound per statement, well under every backend's bind limit
const PARENT_CHUNK_SIZE: usize = 1000;

async fn mark_live_children<E>(
    txn: &DatabaseTransaction,
    id: E::Column,
    parent_fk: E::Column,
    deleted_at_col: E::Column,
    parent_ids: &[i32],
    deleted_at: DBDateTime,
) -> Result<Vec<i32>, DbErr>
where
    E: EntityTrait,
{
    let mut marked = Vec::new();

    for chunk in parent_ids.chunks(PARENT_CHUNK_SIZE) {
        let child_ids: Vec<i32> = E::find()
            .select_only()
            .column(id)
            .filter(parent_fk.is_in(chunk.iter().copied()))
            .filter(deleted_at_col.is_null())
            .into_tuple()
            .all(txn)
            .await?;

        if child_ids.is_empty() {
            continue;
        }

        E::update_many()
            .col_expr(deleted_at_col, Expr::value(deleted_at))
            .filter(parent_fk.is_in(chunk.iter().copied()))
            .filter(deleted_at_col.is_null())
            .exec(txn)
            .await?;

        marked.extend(child_ids);
    }

    Ok(marked)
}

/// Guarded `NULL -> deleted_at` transition of a single row.
/// Returns whether the row transitioned; a missing row is an error.
async fn mark_row<E>(
    txn: &DatabaseTransaction,
    kind: EntityKind,
    id_col: E::Column,
    deleted_at_col: E::Column,
    id: i32,
    deleted_at: DBDateTime,
) -> Result<bool, RecordError>
where
    E: EntityTrait,
{
    let result = E::update_many()
        .col_expr(deleted_at_col, Expr::value(deleted_at))
        .filter(id_col.eq(id))
        .filter(deleted_at_col.is_null())
        .exec(txn)
        .await?;

    if result.rows_affected > 0 {
        return Ok(true);
    }

    let existing: Option<i32> = E::find()
        .select_only()
        .column(id_col)
        .filter(id_col.eq(id))
        .into_tuple()
        .one(txn)
        .await?;
    match existing {
        Some(_) => Ok(false),
        None => Err(RecordError::NotFound { entity: kind, id }),
    }
}

/// Children marked by one relation during a delete
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CascadeEffect {
    pub relation: &'static str,
    pub child: EntityKind,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeleteOutcome {
    pub entity: EntityKind,
    pub id: i32,
    /// False when the entity was already deleted; nothing was touched then
    pub transitioned: bool,
    pub deleted_at: Option<DBDateTime>,
    pub cascaded: Vec<CascadeEffect>,
}

pub struct SoftDeleteCascade {
    relations: Vec<Box<dyn CascadeRelation>>,
}

impl Default for SoftDeleteCascade {
    fn default() -> Self {
        Self::new(vec![Box::new(AccountVehicles), Box::new(VehicleFillups)])
    }
}

impl SoftDeleteCascade {
    pub fn new(relations: Vec<Box<dyn CascadeRelation>>) -> Self {
        Self { relations }
    }

    pub fn with_relation<R>(mut self, relation: R) -> Self
    where
        R: CascadeRelation + 'static,
    {
        self.relations.push(Box::new(relation));
        self
    }

    pub fn relation_names(&self) -> Vec<&'static str> {
        self.relations.iter().map(|r| r.name()).collect()
    }

    /// Soft delete one entity and its live descendants atomically.
    ///
    /// Every cascaded row receives exactly the parent's timestamp.
    pub async fn mark_deleted(
        &self,
        db: &DatabaseConnection,
        kind: EntityKind,
        id: i32,
    ) -> Result<DeleteOutcome, RecordError> {
        // Stored precision on PostgreSQL is microseconds
        let deleted_at = Utc::now().trunc_subsecs(6);

        let txn = db.begin().await?;
        match self.mark_deleted_in(&txn, kind, id, deleted_at).await {
            Ok(outcome) => {
                txn.commit().await?;
                if outcome.transitioned {
                    info!(
                        "Soft deleted {} {} ({} cascaded)",
                        kind,
                        id,
                        outcome.cascaded.iter().map(|c| c.count).sum::<usize>()
                    );
                }
                Ok(outcome)
            }
            Err(e) => {
                if let Err(rollback_err) = txn.rollback().await {
                    error!("Failed to roll back soft delete: {}", rollback_err);
                }
                Err(e)
            }
        }
    }

    async fn mark_deleted_in(
        &self,
        txn: &DatabaseTransaction,
        kind: EntityKind,
        id: i32,
        deleted_at: DBDateTime,
    ) -> Result<DeleteOutcome, RecordError> {
        let transitioned = match kind {
            EntityKind::Account => {
                mark_row::<accounts::Entity>(
                    txn,
                    kind,
                    accounts::Column::Id,
                    accounts::Column::DeletedAt,
                    id,
                    deleted_at,
                )
                .await?
            }
            EntityKind::Vehicle => {
                mark_row::<vehicles::Entity>(
                    txn,
                    kind,
                    vehicles::Column::Id,
                    vehicles::Column::DeletedAt,
                    id,
                    deleted_at,
                )
                .await?
            }
            EntityKind::FillupRecord => {
                mark_row::<fillup_records::Entity>(
                    txn,
                    kind,
                    fillup_records::Column::Id,
                    fillup_records::Column::DeletedAt,
                    id,
                    deleted_at,
                )
                .await?
            }
        };

        let mut outcome = DeleteOutcome {
            entity: kind,
            id,
            transitioned,
            deleted_at: transitioned.then_some(deleted_at),
            cascaded: Vec::new(),
        };
        if !transitioned {
            debug!("{} {} is already deleted", kind, id);
            return Ok(outcome);
        }

        let mut frontier = VecDeque::from([(kind, vec![id])]);
        while let Some((parent, parent_ids)) = frontier.pop_front() {
            for relation in self.relations.iter().filter(|r| r.parent() == parent) {
                let child_ids = relation
                    .propagate(txn, &parent_ids, deleted_at)
                    .await
                    .map_err(|source| RecordError::CascadeViolation {
                        relation: relation.name(),
                        source,
                    })?;

                if child_ids.is_empty() {
                    continue;
                }
                debug!(
                    "Cascade {} marked {} {} row(s)",
                    relation.name(),
                    child_ids.len(),
                    relation.child()
                );
                outcome.cascaded.push(CascadeEffect {
                    relation: relation.name(),
                    child: relation.child(),
                    count: child_ids.len(),
                });
                frontier.push_back((relation.child(), child_ids));
            }
        }

        Ok(outcome)
    }
}

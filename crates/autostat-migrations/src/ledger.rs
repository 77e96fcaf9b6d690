//! Persistent record of applied migration units
//!
//! One row per applied unit, keyed by the unit's name. Every function takes the
//! schema manager of the caller's transaction so ledger writes commit or roll
//! back together with the schema changes they describe.

use chrono::Utc;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set};
use sea_orm_migration::prelude::*;

/// Name of the ledger table
pub const LEDGER_TABLE: &str = "migrations";

pub mod entry {
    use autostat_core::DBDateTime;
    use sea_orm::entity::prelude::*;

    #[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
    #[sea_orm(table_name = "migrations")]
    pub struct Model {
        #[sea_orm(primary_key)]
        pub id: i32,
        #[sea_orm(unique)]
        pub name: String,
        pub applied_at: DBDateTime,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {}

    impl ActiveModelBehavior for ActiveModel {}
}

/// Create the ledger table if it is absent
pub async fn ensure_table(manager: &SchemaManager<'_>) -> Result<(), DbErr> {
    manager
        .create_table(
            Table::create()
                .table(Alias::new(LEDGER_TABLE))
                .if_not_exists()
                .col(
                    ColumnDef::new(Alias::new("id"))
                        .integer()
                        .not_null()
                        .auto_increment()
                        .primary_key(),
                )
                .col(
                    ColumnDef::new(Alias::new("name"))
                        .string()
                        .not_null()
                        .unique_key(),
                )
                .col(
                    ColumnDef::new(Alias::new("applied_at"))
                        .timestamp_with_time_zone()
                        .not_null()
                        .default(Expr::current_timestamp()),
                )
                .to_owned(),
        )
        .await
}

/// Ledger rows in application order. A missing table means nothing has been
/// applied yet and yields an empty list.
pub async fn entries(manager: &SchemaManager<'_>) -> Result<Vec<entry::Model>, DbErr> {
    if !manager.has_table(LEDGER_TABLE).await? {
        return Ok(Vec::new());
    }

    entry::Entity::find()
        .order_by_asc(entry::Column::Id)
        .all(manager.get_connection())
        .await
}

/// Names of applied units in application order
pub async fn applied_names(manager: &SchemaManager<'_>) -> Result<Vec<String>, DbErr> {
    Ok(entries(manager)
        .await?
        .into_iter()
        .map(|entry| entry.name)
        .collect())
}

pub async fn record(manager: &SchemaManager<'_>, name: &str) -> Result<(), DbErr> {
    let entry = entry::ActiveModel {
        name: Set(name.to_owned()),
        applied_at: Set(Utc::now()),
        ..Default::default()
    };

    entry::Entity::insert(entry)
        .exec_without_returning(manager.get_connection())
        .await?;
    Ok(())
}

pub async fn remove(manager: &SchemaManager<'_>, name: &str) -> Result<(), DbErr> {
    entry::Entity::delete_many()
        .filter(entry::Column::Name.eq(name))
        .exec(manager.get_connection())
        .await?;
    Ok(())
}

/// Drop the ledger table itself; only used at the end of a full rollback
pub async fn drop_table(manager: &SchemaManager<'_>) -> Result<(), DbErr> {
    manager
        .drop_table(
            Table::drop()
                .table(Alias::new(LEDGER_TABLE))
                .if_exists()
                .to_owned(),
        )
        .await
}

use sea_orm_migration::prelude::*;

/// Indexes backing the `deleted_at IS NULL` listings and the soft-delete
/// cascade lookups (children by parent id, still live).
#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_index(
                Index::create()
                    .name("idx_vehicles_account_id_deleted_at")
                    .table(Alias::new("vehicles"))
                    .col(Alias::new("account_id"))
                    .col(Alias::new("deleted_at"))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_fillup_records_vehicle_id_deleted_at")
                    .table(Alias::new("fillup_records"))
                    .col(Alias::new("vehicle_id"))
                    .col(Alias::new("deleted_at"))
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(
                Index::drop()
                    .name("idx_fillup_records_vehicle_id_deleted_at")
                    .table(Alias::new("fillup_records"))
                    .to_owned(),
            )
            .await?;

        manager
            .drop_index(
                Index::drop()
                    .name("idx_vehicles_account_id_deleted_at")
                    .table(Alias::new("vehicles"))
                    .to_owned(),
            )
            .await?;

        Ok(())
    }
}

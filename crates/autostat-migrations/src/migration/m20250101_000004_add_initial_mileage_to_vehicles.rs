use sea_orm::DatabaseBackend;
use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .alter_table(
                Table::alter()
                    .table(Alias::new("vehicles"))
                    .add_column(
                        ColumnDef::new(Alias::new("initial_mileage"))
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .to_owned(),
            )
            .await?;

        if manager.get_database_backend() == DatabaseBackend::Postgres {
            manager
                .get_connection()
                .execute_unprepared(
                    "COMMENT ON COLUMN vehicles.initial_mileage IS 'Initial odometer reading when the vehicle was added to the system'",
                )
                .await?;
        }

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Dropping the column also drops its default and comment
        manager
            .alter_table(
                Table::alter()
                    .table(Alias::new("vehicles"))
                    .drop_column(Alias::new("initial_mileage"))
                    .to_owned(),
            )
            .await
    }
}

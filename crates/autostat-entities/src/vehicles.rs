use async_trait::async_trait;
use autostat_core::DBDateTime;
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue::Set, ConnectionTrait, DbErr};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "vehicles")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub account_id: i32,
    pub vin: Option<String>,
    /// Optional custom name given to the vehicle by its owner
    pub name: Option<String>,
    pub make: String,
    pub model: String,
    pub year: i32,
    /// Odometer reading when the vehicle was added
    pub initial_mileage: i32,
    pub created_at: DBDateTime,
    pub updated_at: Option<DBDateTime>,
    pub deleted_at: Option<DBDateTime>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::accounts::Entity",
        from = "Column::AccountId",
        to = "super::accounts::Column::Id"
    )]
    Account,
    #[sea_orm(has_many = "super::fillup_records::Entity")]
    FillupRecords,
}

impl Related<super::accounts::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Account.def()
    }
}

impl Related<super::fillup_records::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::FillupRecords.def()
    }
}

#[async_trait]
impl ActiveModelBehavior for ActiveModel {
    async fn before_save<C>(mut self, _db: &C, insert: bool) -> Result<Self, DbErr>
    where
        C: ConnectionTrait,
    {
        let now = chrono::Utc::now();

        if insert {
            if self.created_at.is_not_set() {
                self.created_at = Set(now);
            }
            if self.initial_mileage.is_not_set() {
                self.initial_mileage = Set(0);
            }
        } else {
            self.updated_at = Set(Some(now));
        }

        Ok(self)
    }
}

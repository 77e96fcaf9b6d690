use std::sync::Arc;

use autostat_database::DbConnection;
use autostat_entities::accounts;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set};
use tracing::info;

use super::cascade::{DeleteOutcome, EntityKind, SoftDeleteCascade};
use super::types::{CreateAccountRequest, RecordError};

#[derive(Clone)]
pub struct AccountService {
    db: Arc<DbConnection>,
    cascade: Arc<SoftDeleteCascade>,
}

impl AccountService {
    pub fn new(db: Arc<DbConnection>) -> Self {
        Self::with_cascade(db, Arc::new(SoftDeleteCascade::default()))
    }

    pub fn with_cascade(db: Arc<DbConnection>, cascade: Arc<SoftDeleteCascade>) -> Self {
        AccountService { db, cascade }
    }

    pub async fn create(
        &self,
        request: CreateAccountRequest,
    ) -> Result<accounts::Model, RecordError> {
        let email = request.email.trim().to_lowercase();
        if email.is_empty() || !email.contains('@') {
            return Err(RecordError::Validation(format!(
                "'{}' is not a valid email address",
                request.email
            )));
        }
        if request.password_hash.is_empty() {
            return Err(RecordError::Validation(
                "Password hash must not be empty".to_string(),
            ));
        }

        let account = accounts::ActiveModel {
            email: Set(email),
            password_hash: Set(request.password_hash),
            ..Default::default()
        }
        .insert(self.db.as_ref())
        .await?;

        info!("Created account {}", account.id);
        Ok(account)
    }

    /// Fetch a live account
    pub async fn get(&self, id: i32) -> Result<accounts::Model, RecordError> {
        accounts::Entity::find_by_id(id)
            .filter(accounts::Column::DeletedAt.is_null())
            .one(self.db.as_ref())
            .await?
            .ok_or(RecordError::NotFound {
                entity: EntityKind::Account,
                id,
            })
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<accounts::Model>, RecordError> {
        let account = accounts::Entity::find()
            .filter(accounts::Column::Email.eq(email.trim().to_lowercase()))
            .filter(accounts::Column::DeletedAt.is_null())
            .one(self.db.as_ref())
            .await?;
        Ok(account)
    }

    /// Soft delete the account together with its vehicles and their fill-ups
    pub async fn delete(&self, id: i32) -> Result<DeleteOutcome, RecordError> {
        self.cascade
            .mark_deleted(self.db.as_ref(), EntityKind::Account, id)
            .await
    }
}

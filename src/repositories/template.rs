//! # Document Template Repository

use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};

use crate::error::RepositoryError;
use crate::models::document_template::{Column, Entity as DocumentTemplate, Model};

pub struct TemplateRepository<'a> {
    db: &'a DatabaseConnection,
}

impl<'a> TemplateRepository<'a> {
    pub fn new(db: &'a DatabaseConnection) -> Self {
        Self { db }
    }

    /// Active template shared under `public_token`.
    pub async fn find_active_by_token(
        &self,
        public_token: &str,
    ) -> Result<Option<Model>, RepositoryError> {
        DocumentTemplate::find()
            .filter(Column::PublicToken.eq(public_token))
            .filter(Column::IsActive.eq(true))
            .one(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }
}

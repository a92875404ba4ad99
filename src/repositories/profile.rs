//! # Profile Repository

use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, QuerySelect};
use uuid::Uuid;

use crate::error::RepositoryError;
use crate::models::profile::{Column, Entity as Profile};

pub struct ProfileRepository<'a> {
    db: &'a DatabaseConnection,
}

impl<'a> ProfileRepository<'a> {
    pub fn new(db: &'a DatabaseConnection) -> Self {
        Self { db }
    }

    /// IDs of every active profile, oldest first.
    pub async fn active_ids(&self) -> Result<Vec<Uuid>, RepositoryError> {
        Profile::find()
            .select_only()
            .column(Column::Id)
            .filter(Column::IsActive.eq(true))
            .order_by_asc(Column::CreatedAt)
            .into_tuple::<Uuid>()
            .all(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }
}

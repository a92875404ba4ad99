//! Document template entity model
//!
//! Word templates kept in object storage and shared through a public token.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "document_templates")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub name: String,

    /// Object key of the `.docx` inside the configured bucket
    pub storage_path: String,

    /// Array of [`CustomField`] definitions
    #[sea_orm(column_type = "JsonBinary")]
    pub custom_fields: JsonValue,

    /// Token used by the public fill link
    #[sea_orm(unique)]
    pub public_token: String,

    pub is_active: bool,

    /// Owner of the template; signature requests opened from it belong to them
    pub created_by: Uuid,

    pub created_at: DateTimeWithTimeZone,
}

/// Definition of one value a visitor supplies when filling the template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CustomField {
    /// Placeholder name as written between `[[` and `]]`
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default)]
    pub required: bool,
}

impl Model {
    /// Parsed custom field definitions. Entries that do not match the
    /// expected shape are ignored.
    pub fn fields(&self) -> Vec<CustomField> {
        match &self.custom_fields {
            JsonValue::Array(items) => items
                .iter()
                .filter_map(|item| serde_json::from_value(item.clone()).ok())
                .collect(),
            _ => Vec::new(),
        }
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

//! Signature request entity model

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;
use serde_json::Value as JsonValue;
use uuid::Uuid;

pub const STATUS_PENDING: &str = "pending";

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "signature_requests")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub document_name: String,

    /// Object key of the rendered document
    pub document_path: String,

    pub template_id: Option<Uuid>,

    /// Object keys of uploaded attachments
    #[sea_orm(column_type = "JsonBinary", nullable)]
    pub attachments: Option<JsonValue>,

    pub created_by: Uuid,

    /// One of: pending, signed, cancelled
    pub status: String,

    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::signature_signer::Entity")]
    Signers,
}

impl Related<super::signature_signer::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Signers.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

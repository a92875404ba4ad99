//! Intimation analysis entity model
//!
//! AI classification attached to an intimation. Only `urgency = "high"`
//! analyses produce notifications.

use super::intimation::Entity as Intimation;
use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;
use uuid::Uuid;

pub const URGENCY_HIGH: &str = "high";

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "intimation_analyses")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub intimation_id: Uuid,

    /// One of: high, medium, low
    pub urgency: String,

    #[sea_orm(column_type = "Text", nullable)]
    pub summary: Option<String>,

    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "Intimation",
        from = "Column::IntimationId",
        to = "super::intimation::Column::Id"
    )]
    Intimation,
}

impl Related<Intimation> for Entity {
    fn to() -> RelationDef {
        Relation::Intimation.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

//! Calendar event entity model
//!
//! Appointments (hearings, meetings, client calls) on the office calendar.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;
use uuid::Uuid;

/// Reminder lead time used when an event does not configure one (24 hours).
pub const DEFAULT_NOTIFY_MINUTES_BEFORE: i32 = 1440;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "calendar_events")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub title: String,

    pub process_id: Option<Uuid>,

    pub start_time: DateTimeWithTimeZone,

    /// One of: pending, done, cancelled
    pub status: String,

    pub notify_minutes_before: Option<i32>,

    pub created_at: DateTimeWithTimeZone,
}

impl Model {
    /// Effective reminder lead time in minutes.
    pub fn lead_minutes(&self) -> i64 {
        i64::from(
            self.notify_minutes_before
                .unwrap_or(DEFAULT_NOTIFY_MINUTES_BEFORE),
        )
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

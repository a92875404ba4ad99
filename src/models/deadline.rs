//! Deadline entity model
//!
//! Procedural deadlines tracked per process. The scheduler reads them to emit
//! daily reminders while a deadline sits inside its notice window.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::{Date, DateTimeWithTimeZone};
use uuid::Uuid;

/// Notice window used when a deadline does not configure one.
pub const DEFAULT_NOTIFY_DAYS_BEFORE: i32 = 2;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "deadlines")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub title: String,

    pub process_id: Option<Uuid>,

    /// Calendar day the deadline falls due
    pub due_date: Date,

    /// One of: pending, done, cancelled
    pub status: String,

    /// How many days ahead of `due_date` reminders start
    pub notify_days_before: Option<i32>,

    pub created_at: DateTimeWithTimeZone,
}

impl Model {
    /// Effective notice window in days.
    pub fn notice_days(&self) -> i64 {
        i64::from(
            self.notify_days_before
                .unwrap_or(DEFAULT_NOTIFY_DAYS_BEFORE),
        )
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

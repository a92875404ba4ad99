//! Requirement entity model
//!
//! Administrative requirements (benefit claims and similar filings) that age
//! while an agency analyses them.

use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::{Date, DateTimeWithTimeZone};
use uuid::Uuid;

pub const STATUS_UNDER_ANALYSIS: &str = "under_analysis";

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "requirements")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub title: String,

    pub client_name: Option<String>,

    /// One of: under_analysis, approved, rejected
    pub status: String,

    pub analysis_started_at: Option<DateTimeWithTimeZone>,

    pub entry_date: Option<Date>,

    pub created_at: DateTimeWithTimeZone,
}

impl Model {
    /// Day the analysis clock started: analysis start, else entry date, else
    /// the row's creation.
    pub fn aging_since(&self) -> NaiveDate {
        self.analysis_started_at
            .map(|started| started.with_timezone(&Utc).date_naive())
            .or(self.entry_date)
            .unwrap_or_else(|| {
                let created: DateTime<Utc> = self.created_at.with_timezone(&Utc);
                created.date_naive()
            })
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

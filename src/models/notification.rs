//! Notification entity model
//!
//! Alerts delivered to one office user. Rows are written by the notification
//! scheduler and only ever inserted from this service.

use std::fmt;

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "notifications")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Recipient profile
    pub user_id: Uuid,

    pub title: String,

    pub message: String,

    /// Notification type tag, see [`NotificationKind`]
    #[sea_orm(column_name = "type")]
    pub kind: String,

    pub deadline_id: Option<Uuid>,

    pub appointment_id: Option<Uuid>,

    pub intimation_id: Option<Uuid>,

    pub process_id: Option<Uuid>,

    pub requirement_id: Option<Uuid>,

    pub signer_id: Option<Uuid>,

    #[sea_orm(column_type = "JsonBinary", nullable)]
    pub metadata: Option<JsonValue>,

    /// Permanent dedup key; unique per `(user_id, type)` when present
    pub dedup_key: Option<String>,

    pub read: bool,

    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

/// Closed vocabulary stored in the `type` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    DeadlineReminder,
    AppointmentReminder,
    NewIntimation,
    RequirementAlert,
    PendingSignature,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::DeadlineReminder => "deadline_reminder",
            NotificationKind::AppointmentReminder => "appointment_reminder",
            NotificationKind::NewIntimation => "new_intimation",
            NotificationKind::RequirementAlert => "requirement_alert",
            NotificationKind::PendingSignature => "pending_signature",
        }
    }
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The source row a notification points at, naming its reference column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubjectRef {
    Deadline(Uuid),
    Appointment(Uuid),
    Intimation(Uuid),
    Requirement(Uuid),
    Signer(Uuid),
}

impl SubjectRef {
    pub fn id(&self) -> Uuid {
        match *self {
            SubjectRef::Deadline(id)
            | SubjectRef::Appointment(id)
            | SubjectRef::Intimation(id)
            | SubjectRef::Requirement(id)
            | SubjectRef::Signer(id) => id,
        }
    }

    /// Column holding this reference on the notifications table.
    pub fn column(&self) -> Column {
        match self {
            SubjectRef::Deadline(_) => Column::DeadlineId,
            SubjectRef::Appointment(_) => Column::AppointmentId,
            SubjectRef::Intimation(_) => Column::IntimationId,
            SubjectRef::Requirement(_) => Column::RequirementId,
            SubjectRef::Signer(_) => Column::SignerId,
        }
    }
}

//! # Notification Repository
//!
//! Insert-only access to the notifications table with dedup checks.

use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    Set,
};
use serde_json::Value as JsonValue;
use uuid::Uuid;

use crate::db::to_db_time;
use crate::error::RepositoryError;
use crate::models::notification::{
    ActiveModel as NotificationActiveModel, Column, Entity as Notification, Model,
    NotificationKind, SubjectRef,
};
use crate::notifications::dedup::{self, DedupPolicy};

/// A notification row ready to insert for one recipient.
#[derive(Debug, Clone)]
pub struct NotificationDraft {
    pub user_id: Uuid,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub subject: SubjectRef,
    pub process_id: Option<Uuid>,
    pub metadata: JsonValue,
    pub dedup: DedupPolicy,
}

/// Result of a deduplicated insert.
#[derive(Debug, Clone, PartialEq)]
pub enum InsertOutcome {
    Inserted(Box<Model>),
    Duplicate,
}

/// Repository for notification rows
pub struct NotificationRepository<'a> {
    db: &'a DatabaseConnection,
}

impl<'a> NotificationRepository<'a> {
    pub fn new(db: &'a DatabaseConnection) -> Self {
        Self { db }
    }

    /// Whether `user_id` already holds a `kind` notification with this permanent key.
    pub async fn exists_with_key(
        &self,
        user_id: Uuid,
        kind: NotificationKind,
        dedup_key: &str,
    ) -> Result<bool, RepositoryError> {
        let count = Notification::find()
            .filter(Column::UserId.eq(user_id))
            .filter(Column::Kind.eq(kind.as_str()))
            .filter(Column::DedupKey.eq(dedup_key))
            .count(self.db)
            .await
            .map_err(RepositoryError::database_error)?;

        Ok(count > 0)
    }

    /// Whether `user_id` received a `kind` notification about `subject` at or
    /// after `since`.
    pub async fn exists_since(
        &self,
        user_id: Uuid,
        kind: NotificationKind,
        subject: SubjectRef,
        since: DateTime<Utc>,
    ) -> Result<bool, RepositoryError> {
        let count = Notification::find()
            .filter(Column::UserId.eq(user_id))
            .filter(Column::Kind.eq(kind.as_str()))
            .filter(subject.column().eq(subject.id()))
            .filter(Column::CreatedAt.gte(to_db_time(since)))
            .count(self.db)
            .await
            .map_err(RepositoryError::database_error)?;

        Ok(count > 0)
    }

    /// Inserts `draft` unless its dedup policy says an equivalent row exists.
    ///
    /// A unique-index violation on the permanent key (another run inserting
    /// the same row concurrently) is reported as a duplicate.
    pub async fn insert_deduplicated(
        &self,
        draft: NotificationDraft,
        now: DateTime<Utc>,
    ) -> Result<InsertOutcome, RepositoryError> {
        let duplicate = match &draft.dedup {
            DedupPolicy::Permanent(key) => {
                self.exists_with_key(draft.user_id, draft.kind, key).await?
            }
            DedupPolicy::Rolling(subject) => {
                self.exists_since(draft.user_id, draft.kind, *subject, dedup::window_start(now))
                    .await?
            }
        };

        if duplicate {
            return Ok(InsertOutcome::Duplicate);
        }

        match self.insert(draft, now).await {
            Ok(model) => Ok(InsertOutcome::Inserted(Box::new(model))),
            Err(err) if err.is_unique_violation() => Ok(InsertOutcome::Duplicate),
            Err(err) => Err(err),
        }
    }

    /// Inserts `draft` without any dedup check.
    pub async fn insert(
        &self,
        draft: NotificationDraft,
        now: DateTime<Utc>,
    ) -> Result<Model, RepositoryError> {
        let mut active = NotificationActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(draft.user_id),
            title: Set(draft.title),
            message: Set(draft.message),
            kind: Set(draft.kind.as_str().to_string()),
            deadline_id: Set(None),
            appointment_id: Set(None),
            intimation_id: Set(None),
            process_id: Set(draft.process_id),
            requirement_id: Set(None),
            signer_id: Set(None),
            metadata: Set(Some(draft.metadata)),
            dedup_key: Set(draft.dedup.key().map(str::to_string)),
            read: Set(false),
            created_at: Set(to_db_time(now)),
        };

        match draft.subject {
            SubjectRef::Deadline(id) => active.deadline_id = Set(Some(id)),
            SubjectRef::Appointment(id) => active.appointment_id = Set(Some(id)),
            SubjectRef::Intimation(id) => active.intimation_id = Set(Some(id)),
            SubjectRef::Requirement(id) => active.requirement_id = Set(Some(id)),
            SubjectRef::Signer(id) => active.signer_id = Set(Some(id)),
        }

        active
            .insert(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }
}

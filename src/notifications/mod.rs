//! # Notification Scheduler
//!
//! Evaluates the alerting rules (deadline reminders, appointment reminders,
//! urgent intimations, requirement aging, pending signatures) and writes
//! deduplicated notification rows.
//!
//! [`rules`] turns source rows into [`Alert`]s without touching the database,
//! [`dedup`] builds keys and the rolling window, and [`scheduler`] loads
//! candidates, fans alerts out to recipients and inserts what is not a
//! duplicate.

use serde::Serialize;
use serde_json::{Map, Value as JsonValue};
use thiserror::Error;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::RepositoryError;
use crate::models::notification::{NotificationKind, SubjectRef};

pub mod dedup;
pub mod rules;
pub mod scheduler;

pub use dedup::DedupPolicy;
pub use scheduler::NotificationScheduler;

/// Who receives an alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recipients {
    /// Every active profile.
    AllActive,
    /// A single profile.
    User(Uuid),
}

/// One logical alert, before fan-out to recipients.
#[derive(Debug, Clone, PartialEq)]
pub struct Alert {
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub subject: SubjectRef,
    pub process_id: Option<Uuid>,
    pub recipients: Recipients,
    pub dedup: DedupPolicy,
    pub metadata: Map<String, JsonValue>,
}

impl Alert {
    /// Metadata as persisted; permanent keys are mirrored under `dedup_key`.
    pub fn metadata_json(&self) -> JsonValue {
        let mut metadata = self.metadata.clone();
        if let Some(key) = self.dedup.key() {
            metadata.insert("dedup_key".to_string(), JsonValue::String(key.to_string()));
        }
        JsonValue::Object(metadata)
    }
}

/// Outcome of one rule within a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct RuleReport {
    /// Notification type the rule emits
    pub rule: NotificationKind,
    /// Alerts produced before fan-out
    pub candidates: usize,
    pub inserted: usize,
    pub skipped_duplicates: usize,
    pub failed_inserts: usize,
    /// Set when the rule aborted before finishing
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RuleReport {
    pub fn new(rule: NotificationKind) -> Self {
        Self {
            rule,
            candidates: 0,
            inserted: 0,
            skipped_duplicates: 0,
            failed_inserts: 0,
            error: None,
        }
    }

    pub fn failed(rule: NotificationKind, error: impl ToString) -> Self {
        Self {
            error: Some(error.to_string()),
            ..Self::new(rule)
        }
    }
}

/// Per-rule outcomes of one scheduler run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct RunReport {
    pub rules: Vec<RuleReport>,
}

impl RunReport {
    pub fn rule(&self, kind: NotificationKind) -> Option<&RuleReport> {
        self.rules.iter().find(|report| report.rule == kind)
    }

    pub fn total_inserted(&self) -> usize {
        self.rules.iter().map(|report| report.inserted).sum()
    }

    pub fn failed_rules(&self) -> impl Iterator<Item = &RuleReport> {
        self.rules.iter().filter(|report| report.error.is_some())
    }
}

#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("{context}: {source}")]
    Database {
        context: &'static str,
        #[source]
        source: sea_orm::DbErr,
    },
    #[error("{context}: {source}")]
    Repository {
        context: &'static str,
        #[source]
        source: RepositoryError,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn permanent_key_is_mirrored_into_metadata() {
        let mut metadata = Map::new();
        metadata.insert("days_until_due".to_string(), json!(2));
        let alert = Alert {
            kind: NotificationKind::DeadlineReminder,
            title: "Prazo vence em 2 dias".to_string(),
            message: String::new(),
            subject: SubjectRef::Deadline(Uuid::nil()),
            process_id: None,
            recipients: Recipients::AllActive,
            dedup: DedupPolicy::Permanent("deadline_reminder_x_2".to_string()),
            metadata,
        };

        assert_eq!(
            alert.metadata_json(),
            json!({ "days_until_due": 2, "dedup_key": "deadline_reminder_x_2" })
        );
    }

    #[test]
    fn report_serializes_rule_as_type_tag() {
        let report = RunReport {
            rules: vec![
                RuleReport::new(NotificationKind::NewIntimation),
                RuleReport::failed(NotificationKind::DeadlineReminder, "boom"),
            ],
        };

        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["rules"][0]["rule"], "new_intimation");
        assert!(value["rules"][0].get("error").is_none());
        assert_eq!(value["rules"][1]["error"], "boom");
        assert_eq!(report.failed_rules().count(), 1);
    }
}

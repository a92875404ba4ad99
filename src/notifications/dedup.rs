//! Dedup keys and the rolling window.
//!
//! A notification is deduplicated one of two ways. A permanent key is stored
//! with the row and matched forever per `(recipient, type, key)`. Without a key
//! the row is matched on `(recipient, type, reference column)` and only rows
//! created inside the rolling window count.

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use crate::models::notification::{NotificationKind, SubjectRef};

/// Width of the implicit dedup window.
pub const ROLLING_WINDOW_HOURS: i64 = 24;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DedupPolicy {
    /// Never re-sent for this key.
    Permanent(String),
    /// Re-sent once the previous row for the same subject leaves the window.
    Rolling(SubjectRef),
}

impl DedupPolicy {
    pub fn key(&self) -> Option<&str> {
        match self {
            DedupPolicy::Permanent(key) => Some(key),
            DedupPolicy::Rolling(_) => None,
        }
    }
}

/// Oldest `created_at` still inside the rolling window at `now`.
pub fn window_start(now: DateTime<Utc>) -> DateTime<Utc> {
    now - Duration::hours(ROLLING_WINDOW_HOURS)
}

pub fn deadline_key(deadline_id: Uuid, days_until_due: i64) -> String {
    format!(
        "{}_{}_{}",
        NotificationKind::DeadlineReminder,
        deadline_id,
        days_until_due
    )
}

/// Scoped to the configured lead time, so changing it re-arms the reminder.
pub fn appointment_key(event_id: Uuid, notify_minutes_before: i64) -> String {
    format!(
        "{}_{}_{}",
        NotificationKind::AppointmentReminder,
        event_id,
        notify_minutes_before
    )
}

pub fn requirement_key(requirement_id: Uuid, milestone_days: i64) -> String {
    format!(
        "{}_{}_{}",
        NotificationKind::RequirementAlert,
        requirement_id,
        milestone_days
    )
}

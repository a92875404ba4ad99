//! Alert rules.
//!
//! Each function inspects one source row at a fixed instant and returns the
//! alert it warrants, if any. Loading candidates and persisting notifications
//! happen in the scheduler.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde_json::{Map, Value as JsonValue, json};

use super::dedup::{self, DedupPolicy};
use super::{Alert, Recipients};
use crate::models::notification::{NotificationKind, SubjectRef};
use crate::models::{
    calendar_event, deadline, intimation, intimation_analysis, requirement, signature_request,
    signature_signer,
};

/// Day counts at which a requirement still under analysis is flagged.
pub const REQUIREMENT_MILESTONES: [i64; 3] = [60, 90, 120];

/// Signers become overdue once their request is older than this.
pub const SIGNATURE_GRACE_HOURS: i64 = 24;

const SUMMARY_MAX_CHARS: usize = 200;

/// Reminder for a deadline inside its notice window.
///
/// Fires when `0 <= days_until_due <= notify_days_before`, once per day count.
pub fn deadline_alert(deadline: &deadline::Model, today: NaiveDate) -> Option<Alert> {
    let days_until_due = (deadline.due_date - today).num_days();
    if days_until_due < 0 || days_until_due > deadline.notice_days() {
        return None;
    }

    let title = match days_until_due {
        0 => "Prazo vence hoje".to_string(),
        1 => "Prazo vence amanhã".to_string(),
        n => format!("Prazo vence em {n} dias"),
    };

    let message = format!(
        "O prazo \"{}\" vence em {}.",
        deadline.title,
        deadline.due_date.format("%d/%m/%Y")
    );

    Some(Alert {
        kind: NotificationKind::DeadlineReminder,
        title,
        message,
        subject: SubjectRef::Deadline(deadline.id),
        process_id: deadline.process_id,
        recipients: Recipients::AllActive,
        dedup: DedupPolicy::Permanent(dedup::deadline_key(deadline.id, days_until_due)),
        metadata: object(json!({
            "due_date": deadline.due_date.to_string(),
            "days_until_due": days_until_due,
        })),
    })
}

/// Reminder for an appointment starting within its configured lead time.
pub fn appointment_alert(event: &calendar_event::Model, now: DateTime<Utc>) -> Option<Alert> {
    let start = event.start_time.with_timezone(&Utc);
    let minutes_until_start = (start - now).num_seconds().div_euclid(60);
    let lead_minutes = event.lead_minutes();

    if minutes_until_start < 0 || minutes_until_start > lead_minutes {
        return None;
    }

    let message = format!(
        "\"{}\" começa {}.",
        event.title,
        describe_lead_time(minutes_until_start)
    );

    Some(Alert {
        kind: NotificationKind::AppointmentReminder,
        title: "Compromisso próximo".to_string(),
        message,
        subject: SubjectRef::Appointment(event.id),
        process_id: event.process_id,
        recipients: Recipients::AllActive,
        dedup: DedupPolicy::Permanent(dedup::appointment_key(event.id, lead_minutes)),
        metadata: object(json!({
            "start_time": start.to_rfc3339(),
            "minutes_until_start": minutes_until_start,
            "notify_minutes_before": lead_minutes,
        })),
    })
}

/// Broadcast for a court notice the analysis classified as high urgency.
pub fn intimation_alert(
    analysis: &intimation_analysis::Model,
    intimation: &intimation::Model,
) -> Alert {
    let summary = analysis
        .summary
        .as_deref()
        .map(str::trim)
        .filter(|summary| !summary.is_empty())
        .unwrap_or(intimation.content.trim());

    let message = format!(
        "Processo {}: {}",
        intimation.process_number,
        truncate_chars(summary, SUMMARY_MAX_CHARS)
    );

    Alert {
        kind: NotificationKind::NewIntimation,
        title: "Nova intimação urgente".to_string(),
        message,
        subject: SubjectRef::Intimation(intimation.id),
        process_id: intimation.process_id,
        recipients: Recipients::AllActive,
        dedup: DedupPolicy::Rolling(SubjectRef::Intimation(intimation.id)),
        metadata: object(json!({
            "analysis_id": analysis.id,
            "urgency": analysis.urgency,
            "court": intimation.court,
            "process_number": intimation.process_number,
        })),
    }
}

/// Highest milestone reached after `elapsed_days`, if any.
pub fn highest_milestone(elapsed_days: i64) -> Option<i64> {
    REQUIREMENT_MILESTONES
        .iter()
        .rev()
        .copied()
        .find(|milestone| elapsed_days >= *milestone)
}

/// Aging alert for a requirement still under analysis.
///
/// Only the highest milestone reached is emitted; each milestone is sent once.
pub fn requirement_alert(requirement: &requirement::Model, today: NaiveDate) -> Option<Alert> {
    if requirement.status != requirement::STATUS_UNDER_ANALYSIS {
        return None;
    }

    let elapsed_days = (today - requirement.aging_since()).num_days();
    let milestone = highest_milestone(elapsed_days)?;

    let client = requirement
        .client_name
        .as_deref()
        .map(|name| format!(" de {name}"))
        .unwrap_or_default();

    Some(Alert {
        kind: NotificationKind::RequirementAlert,
        title: format!("Requerimento em análise há mais de {milestone} dias"),
        message: format!(
            "O requerimento \"{}\"{} está em análise há {} dias.",
            requirement.title, client, elapsed_days
        ),
        subject: SubjectRef::Requirement(requirement.id),
        process_id: None,
        recipients: Recipients::AllActive,
        dedup: DedupPolicy::Permanent(dedup::requirement_key(requirement.id, milestone)),
        metadata: object(json!({
            "milestone": milestone,
            "days_in_analysis": elapsed_days,
        })),
    })
}

/// Nudge to the request's creator about a signer still pending after the grace
/// period.
pub fn pending_signature_alert(
    signer: &signature_signer::Model,
    request: &signature_request::Model,
    now: DateTime<Utc>,
) -> Option<Alert> {
    if !signer.is_pending() || request.status != signature_request::STATUS_PENDING {
        return None;
    }

    let requested_at = request.created_at.with_timezone(&Utc);
    let pending_for = now - requested_at;
    if pending_for <= Duration::hours(SIGNATURE_GRACE_HOURS) {
        return None;
    }

    Some(Alert {
        kind: NotificationKind::PendingSignature,
        title: "Assinatura pendente".to_string(),
        message: format!(
            "{} ainda não assinou \"{}\".",
            signer.name, request.document_name
        ),
        subject: SubjectRef::Signer(signer.id),
        process_id: None,
        recipients: Recipients::User(request.created_by),
        dedup: DedupPolicy::Rolling(SubjectRef::Signer(signer.id)),
        metadata: object(json!({
            "signature_request_id": request.id,
            "signer_email": signer.email,
            "hours_pending": pending_for.num_hours(),
        })),
    })
}

fn describe_lead_time(minutes: i64) -> String {
    match minutes {
        0 => "agora".to_string(),
        1..=59 => format!("em {minutes} min"),
        _ if minutes % 60 == 0 => format!("em {}h", minutes / 60),
        _ => format!("em {}h{:02}", minutes / 60, minutes % 60),
    }
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let truncated: String = text.chars().take(max_chars).collect();
    format!("{}...", truncated.trim_end())
}

fn object(value: JsonValue) -> Map<String, JsonValue> {
    match value {
        JsonValue::Object(map) => map,
        _ => Map::new(),
    }
}

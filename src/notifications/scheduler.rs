//! # Notification Scheduler Service
//!
//! One run evaluates every rule concurrently against a single `now`, fans the
//! resulting alerts out to their recipients and inserts what the dedup policy
//! allows. Rules fail independently: a rule that cannot load its candidates is
//! reported as failed while the others carry on, and a failed insert is logged
//! and skipped. Nothing is retried within a run; the next run re-reads state.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Days, Duration, Utc};
use metrics::{counter, gauge, histogram};
use sea_orm::{ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, QueryOrder};
use tokio::time::{Instant, sleep};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use super::{Alert, Recipients, RuleReport, RunReport, SchedulerError, rules};
use crate::cache::TtlCache;
use crate::config::SchedulerConfig;
use crate::db::to_db_time;
use crate::models::notification::NotificationKind;
use crate::models::{
    CalendarEvent, Deadline, Intimation, IntimationAnalysis, Requirement, STATUS_PENDING,
    SignatureRequest, SignatureSigner, calendar_event, deadline, intimation_analysis, requirement,
    signature_request, signature_signer,
};
use crate::repositories::{
    InsertOutcome, NotificationDraft, NotificationRepository, ProfileRepository,
};

/// How far ahead appointments are loaded.
const APPOINTMENT_LOOKAHEAD_HOURS: i64 = 24;

/// How far back urgent analyses are loaded.
const INTIMATION_LOOKBACK_HOURS: i64 = 24;

/// Background notification scheduler service.
pub struct NotificationScheduler {
    db: Arc<DatabaseConnection>,
    settings: SchedulerConfig,
    recipients: TtlCache<Arc<Vec<Uuid>>>,
}

impl NotificationScheduler {
    pub fn new(db: Arc<DatabaseConnection>, settings: SchedulerConfig) -> Self {
        let recipients = TtlCache::new(StdDuration::from_secs(
            settings.recipient_cache_ttl_seconds,
        ));

        Self {
            db,
            settings,
            recipients,
        }
    }

    /// Evaluates every rule at the current time.
    pub async fn run_once(&self) -> RunReport {
        self.run_at(Utc::now()).await
    }

    /// Evaluates every rule at `now`.
    #[instrument(skip_all, fields(now = %now))]
    pub async fn run_at(&self, now: DateTime<Utc>) -> RunReport {
        let started = Instant::now();

        let (deadlines, appointments, intimations, requirements, signatures) = tokio::join!(
            guarded(
                NotificationKind::DeadlineReminder,
                self.deadline_reminders(now)
            ),
            guarded(
                NotificationKind::AppointmentReminder,
                self.appointment_reminders(now)
            ),
            guarded(NotificationKind::NewIntimation, self.urgent_intimations(now)),
            guarded(NotificationKind::RequirementAlert, self.requirement_alerts(now)),
            guarded(NotificationKind::PendingSignature, self.pending_signatures(now)),
        );

        let report = RunReport {
            rules: vec![deadlines, appointments, intimations, requirements, signatures],
        };

        histogram!("notification_scheduler_run_duration_ms")
            .record(started.elapsed().as_secs_f64() * 1_000.0);
        counter!("notification_scheduler_runs_total").increment(1);
        gauge!("notification_scheduler_last_run_inserted").set(report.total_inserted() as f64);

        info!(
            inserted = report.total_inserted(),
            failed_rules = report.failed_rules().count(),
            "Notification scheduler run completed"
        );

        report
    }

    /// Runs the scheduler every tick until `shutdown` fires.
    #[instrument(skip_all)]
    pub async fn run(self: Arc<Self>, shutdown: CancellationToken) {
        let tick_interval = StdDuration::from_secs(self.settings.tick_interval_seconds);
        info!(
            tick_interval_seconds = self.settings.tick_interval_seconds,
            "Starting notification scheduler loop"
        );

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("Notification scheduler shutdown requested");
                    break;
                }
                _ = sleep(tick_interval) => {
                    self.run_once().await;
                }
            }
        }

        info!("Notification scheduler stopped");
    }

    async fn deadline_reminders(&self, now: DateTime<Utc>) -> Result<RuleReport, SchedulerError> {
        let today = now.date_naive();
        let horizon_days = u64::try_from(self.settings.deadline_horizon_days).unwrap_or(0);
        let horizon = today.checked_add_days(Days::new(horizon_days)).unwrap_or(today);

        let candidates = Deadline::find()
            .filter(deadline::Column::Status.eq(STATUS_PENDING))
            .filter(deadline::Column::DueDate.gte(today))
            .filter(deadline::Column::DueDate.lte(horizon))
            .order_by_asc(deadline::Column::DueDate)
            .all(self.db.as_ref())
            .await
            .map_err(|err| map_db_err("failed to load deadlines", err))?;

        let alerts = candidates
            .iter()
            .filter_map(|deadline| rules::deadline_alert(deadline, today))
            .collect();

        self.deliver(NotificationKind::DeadlineReminder, alerts, now)
            .await
    }

    async fn appointment_reminders(
        &self,
        now: DateTime<Utc>,
    ) -> Result<RuleReport, SchedulerError> {
        let until = now + Duration::hours(APPOINTMENT_LOOKAHEAD_HOURS);

        let candidates = CalendarEvent::find()
            .filter(calendar_event::Column::Status.eq(STATUS_PENDING))
            .filter(calendar_event::Column::StartTime.gte(to_db_time(now)))
            .filter(calendar_event::Column::StartTime.lte(to_db_time(until)))
            .order_by_asc(calendar_event::Column::StartTime)
            .all(self.db.as_ref())
            .await
            .map_err(|err| map_db_err("failed to load calendar events", err))?;

        let alerts = candidates
            .iter()
            .filter_map(|event| rules::appointment_alert(event, now))
            .collect();

        self.deliver(NotificationKind::AppointmentReminder, alerts, now)
            .await
    }

    async fn urgent_intimations(&self, now: DateTime<Utc>) -> Result<RuleReport, SchedulerError> {
        let since = now - Duration::hours(INTIMATION_LOOKBACK_HOURS);

        let rows = IntimationAnalysis::find()
            .find_also_related(Intimation)
            .filter(intimation_analysis::Column::Urgency.eq(intimation_analysis::URGENCY_HIGH))
            .filter(intimation_analysis::Column::CreatedAt.gte(to_db_time(since)))
            .order_by_desc(intimation_analysis::Column::CreatedAt)
            .all(self.db.as_ref())
            .await
            .map_err(|err| map_db_err("failed to load intimation analyses", err))?;

        let mut seen = std::collections::HashSet::new();
        let mut alerts = Vec::new();
        for (analysis, intimation) in rows {
            let Some(intimation) = intimation else {
                warn!(analysis_id = %analysis.id, "Analysis without intimation; skipping");
                continue;
            };
            // Several analyses of one intimation produce a single alert
            if seen.insert(intimation.id) {
                alerts.push(rules::intimation_alert(&analysis, &intimation));
            }
        }

        self.deliver(NotificationKind::NewIntimation, alerts, now)
            .await
    }

    async fn requirement_alerts(&self, now: DateTime<Utc>) -> Result<RuleReport, SchedulerError> {
        let today = now.date_naive();

        let candidates = Requirement::find()
            .filter(requirement::Column::Status.eq(requirement::STATUS_UNDER_ANALYSIS))
            .all(self.db.as_ref())
            .await
            .map_err(|err| map_db_err("failed to load requirements", err))?;

        let alerts = candidates
            .iter()
            .filter_map(|requirement| rules::requirement_alert(requirement, today))
            .collect();

        self.deliver(NotificationKind::RequirementAlert, alerts, now)
            .await
    }

    async fn pending_signatures(&self, now: DateTime<Utc>) -> Result<RuleReport, SchedulerError> {
        let cutoff = now - Duration::hours(rules::SIGNATURE_GRACE_HOURS);

        let rows = SignatureSigner::find()
            .find_also_related(SignatureRequest)
            .filter(signature_signer::Column::Status.eq(signature_signer::STATUS_PENDING))
            .filter(signature_request::Column::Status.eq(signature_request::STATUS_PENDING))
            .filter(signature_request::Column::CreatedAt.lt(to_db_time(cutoff)))
            .all(self.db.as_ref())
            .await
            .map_err(|err| map_db_err("failed to load pending signers", err))?;

        let alerts = rows
            .iter()
            .filter_map(|(signer, request)| {
                request
                    .as_ref()
                    .and_then(|request| rules::pending_signature_alert(signer, request, now))
            })
            .collect();

        self.deliver(NotificationKind::PendingSignature, alerts, now)
            .await
    }

    /// Fans `alerts` out to their recipients and inserts the non-duplicates.
    async fn deliver(
        &self,
        kind: NotificationKind,
        alerts: Vec<Alert>,
        now: DateTime<Utc>,
    ) -> Result<RuleReport, SchedulerError> {
        let mut report = RuleReport::new(kind);
        report.candidates = alerts.len();

        if alerts.is_empty() {
            return Ok(report);
        }

        let broadcast = if alerts
            .iter()
            .any(|alert| alert.recipients == Recipients::AllActive)
        {
            self.active_recipients().await?
        } else {
            Arc::new(Vec::new())
        };

        let repo = NotificationRepository::new(self.db.as_ref());

        for alert in &alerts {
            let single;
            let recipients: &[Uuid] = match alert.recipients {
                Recipients::AllActive => broadcast.as_slice(),
                Recipients::User(user_id) => {
                    single = [user_id];
                    &single
                }
            };

            for &user_id in recipients {
                let draft = NotificationDraft {
                    user_id,
                    kind,
                    title: alert.title.clone(),
                    message: alert.message.clone(),
                    subject: alert.subject,
                    process_id: alert.process_id,
                    metadata: alert.metadata_json(),
                    dedup: alert.dedup.clone(),
                };

                match repo.insert_deduplicated(draft, now).await {
                    Ok(InsertOutcome::Inserted(_)) => report.inserted += 1,
                    Ok(InsertOutcome::Duplicate) => report.skipped_duplicates += 1,
                    Err(err) => {
                        report.failed_inserts += 1;
                        error!(
                            error = %err,
                            rule = %kind,
                            user_id = %user_id,
                            subject_id = %alert.subject.id(),
                            "Failed to insert notification"
                        );
                    }
                }
            }
        }

        let labels = vec![("rule", kind.as_str())];
        counter!("notification_scheduler_inserted_total", &labels)
            .increment(report.inserted as u64);
        counter!("notification_scheduler_duplicates_total", &labels)
            .increment(report.skipped_duplicates as u64);
        counter!("notification_scheduler_insert_failures_total", &labels)
            .increment(report.failed_inserts as u64);

        debug!(
            rule = %kind,
            candidates = report.candidates,
            inserted = report.inserted,
            skipped_duplicates = report.skipped_duplicates,
            failed_inserts = report.failed_inserts,
            "Rule completed"
        );

        Ok(report)
    }

    async fn active_recipients(&self) -> Result<Arc<Vec<Uuid>>, SchedulerError> {
        self.recipients
            .get_or_refresh(|| async {
                ProfileRepository::new(self.db.as_ref())
                    .active_ids()
                    .await
                    .map(Arc::new)
                    .map_err(|err| SchedulerError::Repository {
                        context: "failed to load active profiles",
                        source: err,
                    })
            })
            .await
    }
}

/// Turns a rule failure into a failed report instead of aborting the run.
async fn guarded<F>(kind: NotificationKind, rule: F) -> RuleReport
where
    F: Future<Output = Result<RuleReport, SchedulerError>>,
{
    match rule.await {
        Ok(report) => report,
        Err(err) => {
            error!(error = %err, rule = %kind, "Notification rule failed");
            counter!("notification_scheduler_rule_failures_total", "rule" => kind.as_str())
                .increment(1);
            RuleReport::failed(kind, err)
        }
    }
}

fn map_db_err(context: &'static str, err: DbErr) -> SchedulerError {
    error!(error = ?err, context, "Database operation failed");
    SchedulerError::Database {
        context,
        source: err,
    }
}

//! Test utilities for database testing.
//!
//! In-memory SQLite with migrations applied, plus fixture builders for the
//! rows the functions read.

#![allow(dead_code)]

use anyhow::Result;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use lexcrm::db::to_db_time;
use lexcrm::models::{
    calendar_event, deadline, document_template, intimation, intimation_analysis, notification,
    profile, requirement, signature_request, signature_signer,
};
use migration::{Migrator, MigratorTrait};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, Database, DatabaseConnection, EntityTrait,
    QueryFilter, QueryOrder, Set, Statement,
};
use serde_json::Value as JsonValue;
use std::sync::Arc;
use uuid::Uuid;

/// Sets up an in-memory SQLite database with all migrations applied.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = Database::connect("sqlite::memory:").await?;

    Migrator::up(&db, None).await?;

    // Fixtures below reference users and processes that live in other systems.
    db.execute(Statement::from_string(
        db.get_database_backend(),
        "PRAGMA foreign_keys = OFF".to_string(),
    ))
    .await?;

    Ok(db)
}

pub async fn setup_test_db_arc() -> Result<Arc<DatabaseConnection>> {
    Ok(Arc::new(setup_test_db().await?))
}

/// Monday 2025-03-10 12:00 UTC.
pub fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 10, 12, 0, 0).unwrap()
}

pub async fn create_profile(db: &DatabaseConnection, is_active: bool) -> Uuid {
    let id = Uuid::new_v4();
    profile::ActiveModel {
        id: Set(id),
        full_name: Set(format!("Advogado {}", &id.simple().to_string()[..6])),
        email: Set(Some(format!("{}@escritorio.test", id.simple()))),
        is_active: Set(is_active),
        created_at: Set(to_db_time(fixed_now())),
    }
    .insert(db)
    .await
    .unwrap();
    id
}

pub async fn create_deadline(
    db: &DatabaseConnection,
    due_date: NaiveDate,
    notify_days_before: Option<i32>,
) -> Uuid {
    let id = Uuid::new_v4();
    deadline::ActiveModel {
        id: Set(id),
        title: Set("Contestação".to_string()),
        process_id: Set(Some(Uuid::new_v4())),
        due_date: Set(due_date),
        status: Set("pending".to_string()),
        notify_days_before: Set(notify_days_before),
        created_at: Set(to_db_time(fixed_now())),
    }
    .insert(db)
    .await
    .unwrap();
    id
}

pub async fn create_event(
    db: &DatabaseConnection,
    start_time: DateTime<Utc>,
    notify_minutes_before: Option<i32>,
) -> Uuid {
    let id = Uuid::new_v4();
    calendar_event::ActiveModel {
        id: Set(id),
        title: Set("Audiência de conciliação".to_string()),
        process_id: Set(None),
        start_time: Set(to_db_time(start_time)),
        status: Set("pending".to_string()),
        notify_minutes_before: Set(notify_minutes_before),
        created_at: Set(to_db_time(fixed_now())),
    }
    .insert(db)
    .await
    .unwrap();
    id
}

pub async fn set_event_threshold(db: &DatabaseConnection, event_id: Uuid, minutes: i32) {
    let event = calendar_event::Entity::find_by_id(event_id)
        .one(db)
        .await
        .unwrap()
        .unwrap();
    let mut active: calendar_event::ActiveModel = event.into();
    active.notify_minutes_before = Set(Some(minutes));
    active.update(db).await.unwrap();
}

/// Inserts an intimation with one analysis; returns the intimation id.
pub async fn create_analyzed_intimation(
    db: &DatabaseConnection,
    urgency: &str,
    analyzed_at: DateTime<Utc>,
) -> Uuid {
    let intimation_id = Uuid::new_v4();
    intimation::ActiveModel {
        id: Set(intimation_id),
        process_number: Set("0001234-56.2025.8.26.0100".to_string()),
        court: Set(Some("TJSP".to_string())),
        content: Set("Fica a parte intimada para apresentar manifestação.".to_string()),
        process_id: Set(None),
        created_at: Set(to_db_time(analyzed_at)),
    }
    .insert(db)
    .await
    .unwrap();

    intimation_analysis::ActiveModel {
        id: Set(Uuid::new_v4()),
        intimation_id: Set(intimation_id),
        urgency: Set(urgency.to_string()),
        summary: Set(Some("Prazo de 5 dias para manifestação".to_string())),
        created_at: Set(to_db_time(analyzed_at)),
    }
    .insert(db)
    .await
    .unwrap();

    intimation_id
}

pub async fn create_requirement(
    db: &DatabaseConnection,
    analysis_started_at: Option<DateTime<Utc>>,
    entry_date: Option<NaiveDate>,
) -> Uuid {
    let id = Uuid::new_v4();
    requirement::ActiveModel {
        id: Set(id),
        title: Set("Aposentadoria por idade".to_string()),
        client_name: Set(Some("José Pereira".to_string())),
        status: Set(requirement::STATUS_UNDER_ANALYSIS.to_string()),
        analysis_started_at: Set(analysis_started_at.map(to_db_time)),
        entry_date: Set(entry_date),
        created_at: Set(to_db_time(fixed_now())),
    }
    .insert(db)
    .await
    .unwrap();
    id
}

pub struct SignatureFixture {
    pub request_id: Uuid,
    pub signer_id: Uuid,
    pub token: String,
}

pub async fn create_signature_request(
    db: &DatabaseConnection,
    created_by: Uuid,
    created_at: DateTime<Utc>,
    signer_email: &str,
) -> SignatureFixture {
    let request_id = Uuid::new_v4();
    signature_request::ActiveModel {
        id: Set(request_id),
        document_name: Set("Procuração - Maria".to_string()),
        document_path: Set(format!("signatures/{request_id}/procuracao.docx")),
        template_id: Set(None),
        attachments: Set(None),
        created_by: Set(created_by),
        status: Set(signature_request::STATUS_PENDING.to_string()),
        created_at: Set(to_db_time(created_at)),
    }
    .insert(db)
    .await
    .unwrap();

    let signer_id = Uuid::new_v4();
    let token = Uuid::new_v4().simple().to_string();
    signature_signer::ActiveModel {
        id: Set(signer_id),
        request_id: Set(request_id),
        name: Set("Maria Souza".to_string()),
        email: Set(signer_email.to_string()),
        cpf: Set(None),
        token: Set(token.clone()),
        status: Set(signature_signer::STATUS_PENDING.to_string()),
        otp_hash: Set(None),
        otp_salt: Set(None),
        otp_expires_at: Set(None),
        otp_sent_at: Set(None),
        otp_attempts: Set(0),
        verified_at: Set(None),
        signed_at: Set(None),
        created_at: Set(to_db_time(created_at)),
    }
    .insert(db)
    .await
    .unwrap();

    SignatureFixture {
        request_id,
        signer_id,
        token,
    }
}

pub async fn find_signer(db: &DatabaseConnection, signer_id: Uuid) -> signature_signer::Model {
    signature_signer::Entity::find_by_id(signer_id)
        .one(db)
        .await
        .unwrap()
        .unwrap()
}

/// Inserts an active template; returns its public token.
pub async fn create_template(
    db: &DatabaseConnection,
    created_by: Uuid,
    storage_path: &str,
    custom_fields: JsonValue,
) -> String {
    let token = Uuid::new_v4().simple().to_string();
    document_template::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set("Procuração Ad Judicia".to_string()),
        storage_path: Set(storage_path.to_string()),
        custom_fields: Set(custom_fields),
        public_token: Set(token.clone()),
        is_active: Set(true),
        created_by: Set(created_by),
        created_at: Set(to_db_time(fixed_now())),
    }
    .insert(db)
    .await
    .unwrap();
    token
}

pub async fn notifications_of_kind(
    db: &DatabaseConnection,
    kind: &str,
) -> Vec<notification::Model> {
    notification::Entity::find()
        .filter(notification::Column::Kind.eq(kind))
        .order_by_asc(notification::Column::CreatedAt)
        .all(db)
        .await
        .unwrap()
}

/// Inserts a notification row directly, bypassing the scheduler.
pub async fn insert_notification(
    db: &DatabaseConnection,
    user_id: Uuid,
    kind: &str,
    intimation_id: Option<Uuid>,
    created_at: DateTime<Utc>,
) {
    notification::ActiveModel {
        id: Set(Uuid::new_v4()),
        user_id: Set(user_id),
        title: Set("Nova intimação urgente".to_string()),
        message: Set(String::new()),
        kind: Set(kind.to_string()),
        deadline_id: Set(None),
        appointment_id: Set(None),
        intimation_id: Set(intimation_id),
        process_id: Set(None),
        requirement_id: Set(None),
        signer_id: Set(None),
        metadata: Set(None),
        dedup_key: Set(None),
        read: Set(false),
        created_at: Set(to_db_time(created_at)),
    }
    .insert(db)
    .await
    .unwrap();
}

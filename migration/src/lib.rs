//! Database migrations for the CRM functions service.
//!
//! This module contains all database migrations using SeaORM Migration.

pub use sea_orm_migration::prelude::*;

mod m2025_01_06_000001_create_profiles;
mod m2025_01_06_000002_create_deadlines;
mod m2025_01_06_000003_create_calendar_events;
mod m2025_01_06_000004_create_intimations;
mod m2025_01_06_000005_create_requirements;
mod m2025_01_06_000006_create_document_templates;
mod m2025_01_06_000007_create_signatures;
mod m2025_01_06_000008_create_notifications;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m2025_01_06_000001_create_profiles::Migration),
            Box::new(m2025_01_06_000002_create_deadlines::Migration),
            Box::new(m2025_01_06_000003_create_calendar_events::Migration),
            Box::new(m2025_01_06_000004_create_intimations::Migration),
            Box::new(m2025_01_06_000005_create_requirements::Migration),
            Box::new(m2025_01_06_000006_create_document_templates::Migration),
            Box::new(m2025_01_06_000007_create_signatures::Migration),
            Box::new(m2025_01_06_000008_create_notifications::Migration),
        ]
    }
}

//! Migration to create the notifications table.
//!
//! Notifications are written by the scheduler and read by the CRM front end.
//! The unique index over `(user_id, type, dedup_key)` backs permanent dedup
//! keys; rows without a key keep `dedup_key` NULL and are not constrained.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Notifications::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Notifications::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Notifications::UserId).uuid().not_null())
                    .col(ColumnDef::new(Notifications::Title).text().not_null())
                    .col(ColumnDef::new(Notifications::Message).text().not_null())
                    .col(ColumnDef::new(Notifications::Type).text().not_null())
                    .col(ColumnDef::new(Notifications::DeadlineId).uuid().null())
                    .col(ColumnDef::new(Notifications::AppointmentId).uuid().null())
                    .col(ColumnDef::new(Notifications::IntimationId).uuid().null())
                    .col(ColumnDef::new(Notifications::ProcessId).uuid().null())
                    .col(ColumnDef::new(Notifications::RequirementId).uuid().null())
                    .col(ColumnDef::new(Notifications::SignerId).uuid().null())
                    .col(ColumnDef::new(Notifications::Metadata).json_binary().null())
                    .col(ColumnDef::new(Notifications::DedupKey).text().null())
                    .col(
                        ColumnDef::new(Notifications::Read)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Notifications::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_notifications_user_type_dedup_key")
                    .table(Notifications::Table)
                    .col(Notifications::UserId)
                    .col(Notifications::Type)
                    .col(Notifications::DedupKey)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Rolling-window lookups filter by recipient, type and recency
        manager
            .create_index(
                Index::create()
                    .name("idx_notifications_user_type_created")
                    .table(Notifications::Table)
                    .col(Notifications::UserId)
                    .col(Notifications::Type)
                    .col(Notifications::CreatedAt)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(
                Index::drop()
                    .name("idx_notifications_user_type_dedup_key")
                    .to_owned(),
            )
            .await?;

        manager
            .drop_index(
                Index::drop()
                    .name("idx_notifications_user_type_created")
                    .to_owned(),
            )
            .await?;

        manager
            .drop_table(Table::drop().table(Notifications::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Notifications {
    Table,
    Id,
    UserId,
    Title,
    Message,
    Type,
    DeadlineId,
    AppointmentId,
    IntimationId,
    ProcessId,
    RequirementId,
    SignerId,
    Metadata,
    DedupKey,
    Read,
    CreatedAt,
}

//! Migration to create the deadlines table.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Deadlines::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Deadlines::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Deadlines::Title).text().not_null())
                    .col(ColumnDef::new(Deadlines::ProcessId).uuid().null())
                    .col(ColumnDef::new(Deadlines::DueDate).date().not_null())
                    .col(
                        ColumnDef::new(Deadlines::Status)
                            .text()
                            .not_null()
                            .default("pending"),
                    )
                    .col(ColumnDef::new(Deadlines::NotifyDaysBefore).integer().null())
                    .col(
                        ColumnDef::new(Deadlines::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        // Reminder scans filter by status and a due-date window
        manager
            .create_index(
                Index::create()
                    .name("idx_deadlines_status_due_date")
                    .table(Deadlines::Table)
                    .col(Deadlines::Status)
                    .col(Deadlines::DueDate)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(Index::drop().name("idx_deadlines_status_due_date").to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Deadlines::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Deadlines {
    Table,
    Id,
    Title,
    ProcessId,
    DueDate,
    Status,
    NotifyDaysBefore,
    CreatedAt,
}

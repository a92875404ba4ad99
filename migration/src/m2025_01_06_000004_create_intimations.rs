//! Migration to create the intimations and intimation_analyses tables.
//!
//! Intimations are court notices captured for a process; each may receive one
//! or more AI analyses that classify its urgency.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Intimations::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Intimations::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Intimations::ProcessNumber).text().not_null())
                    .col(ColumnDef::new(Intimations::Court).text().null())
                    .col(ColumnDef::new(Intimations::Content).text().not_null())
                    .col(ColumnDef::new(Intimations::ProcessId).uuid().null())
                    .col(
                        ColumnDef::new(Intimations::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(IntimationAnalyses::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(IntimationAnalyses::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(IntimationAnalyses::IntimationId)
                            .uuid()
                            .not_null(),
                    )
                    .col(ColumnDef::new(IntimationAnalyses::Urgency).text().not_null())
                    .col(ColumnDef::new(IntimationAnalyses::Summary).text().null())
                    .col(
                        ColumnDef::new(IntimationAnalyses::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_intimation_analyses_intimation_id")
                            .from(IntimationAnalyses::Table, IntimationAnalyses::IntimationId)
                            .to(Intimations::Table, Intimations::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_intimation_analyses_urgency_created")
                    .table(IntimationAnalyses::Table)
                    .col(IntimationAnalyses::Urgency)
                    .col(IntimationAnalyses::CreatedAt)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(
                Index::drop()
                    .name("idx_intimation_analyses_urgency_created")
                    .to_owned(),
            )
            .await?;

        manager
            .drop_table(Table::drop().table(IntimationAnalyses::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Intimations::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Intimations {
    Table,
    Id,
    ProcessNumber,
    Court,
    Content,
    ProcessId,
    CreatedAt,
}

#[derive(DeriveIden)]
enum IntimationAnalyses {
    Table,
    Id,
    IntimationId,
    Urgency,
    Summary,
    CreatedAt,
}

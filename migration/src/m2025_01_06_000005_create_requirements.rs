//! Migration to create the requirements table.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Requirements::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Requirements::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Requirements::Title).text().not_null())
                    .col(ColumnDef::new(Requirements::ClientName).text().null())
                    .col(
                        ColumnDef::new(Requirements::Status)
                            .text()
                            .not_null()
                            .default("under_analysis"),
                    )
                    .col(
                        ColumnDef::new(Requirements::AnalysisStartedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(ColumnDef::new(Requirements::EntryDate).date().null())
                    .col(
                        ColumnDef::new(Requirements::CreatedAt)
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
                    .name("idx_requirements_status")
                    .table(Requirements::Table)
                    .col(Requirements::Status)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(Index::drop().name("idx_requirements_status").to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Requirements::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Requirements {
    Table,
    Id,
    Title,
    ClientName,
    Status,
    AnalysisStartedAt,
    EntryDate,
    CreatedAt,
}

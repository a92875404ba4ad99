//! Migration to create the document_templates table.
//!
//! Templates are Word documents kept in object storage and shared through a
//! public token; `custom_fields` describes the values a visitor must fill in.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(DocumentTemplates::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(DocumentTemplates::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(DocumentTemplates::Name).text().not_null())
                    .col(
                        ColumnDef::new(DocumentTemplates::StoragePath)
                            .text()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(DocumentTemplates::CustomFields)
                            .json_binary()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(DocumentTemplates::PublicToken)
                            .text()
                            .not_null()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(DocumentTemplates::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(ColumnDef::new(DocumentTemplates::CreatedBy).uuid().not_null())
                    .col(
                        ColumnDef::new(DocumentTemplates::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(DocumentTemplates::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum DocumentTemplates {
    Table,
    Id,
    Name,
    StoragePath,
    CustomFields,
    PublicToken,
    IsActive,
    CreatedBy,
    CreatedAt,
}

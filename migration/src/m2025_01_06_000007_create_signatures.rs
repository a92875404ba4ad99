//! Migration to create the signature_requests and signature_signers tables.
//!
//! A signature request is a rendered document awaiting signatures; each signer
//! row carries its own public token and one-time-code state.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(SignatureRequests::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(SignatureRequests::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(SignatureRequests::DocumentName)
                            .text()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SignatureRequests::DocumentPath)
                            .text()
                            .not_null(),
                    )
                    .col(ColumnDef::new(SignatureRequests::TemplateId).uuid().null())
                    .col(
                        ColumnDef::new(SignatureRequests::Attachments)
                            .json_binary()
                            .null(),
                    )
                    .col(ColumnDef::new(SignatureRequests::CreatedBy).uuid().not_null())
                    .col(
                        ColumnDef::new(SignatureRequests::Status)
                            .text()
                            .not_null()
                            .default("pending"),
                    )
                    .col(
                        ColumnDef::new(SignatureRequests::CreatedAt)
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
                    .table(SignatureSigners::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(SignatureSigners::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(SignatureSigners::RequestId).uuid().not_null())
                    .col(ColumnDef::new(SignatureSigners::Name).text().not_null())
                    .col(ColumnDef::new(SignatureSigners::Email).text().not_null())
                    .col(ColumnDef::new(SignatureSigners::Cpf).text().null())
                    .col(
                        ColumnDef::new(SignatureSigners::Token)
                            .text()
                            .not_null()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(SignatureSigners::Status)
                            .text()
                            .not_null()
                            .default("pending"),
                    )
                    .col(ColumnDef::new(SignatureSigners::OtpHash).text().null())
                    .col(ColumnDef::new(SignatureSigners::OtpSalt).text().null())
                    .col(
                        ColumnDef::new(SignatureSigners::OtpExpiresAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(SignatureSigners::OtpSentAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(SignatureSigners::OtpAttempts)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(SignatureSigners::VerifiedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(SignatureSigners::SignedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(SignatureSigners::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_signature_signers_request_id")
                            .from(SignatureSigners::Table, SignatureSigners::RequestId)
                            .to(SignatureRequests::Table, SignatureRequests::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_signature_signers_status")
                    .table(SignatureSigners::Table)
                    .col(SignatureSigners::Status)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(Index::drop().name("idx_signature_signers_status").to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(SignatureSigners::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(SignatureRequests::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum SignatureRequests {
    Table,
    Id,
    DocumentName,
    DocumentPath,
    TemplateId,
    Attachments,
    CreatedBy,
    Status,
    CreatedAt,
}

#[derive(DeriveIden)]
enum SignatureSigners {
    Table,
    Id,
    RequestId,
    Name,
    Email,
    Cpf,
    Token,
    Status,
    OtpHash,
    OtpSalt,
    OtpExpiresAt,
    OtpSentAt,
    OtpAttempts,
    VerifiedAt,
    SignedAt,
    CreatedAt,
}

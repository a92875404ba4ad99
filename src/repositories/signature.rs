//! # Signature Repository
//!
//! Signature requests, their signers, and the signer one-time-code state.

use chrono::{DateTime, Duration, FixedOffset, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, QueryFilter, Set,
    TransactionTrait, sea_query::Expr,
};
use serde_json::Value as JsonValue;
use uuid::Uuid;

use crate::db::to_db_time;
use crate::error::RepositoryError;
use crate::models::signature_request::{
    self, ActiveModel as RequestActiveModel, Entity as SignatureRequest, Model as RequestModel,
};
use crate::models::signature_signer::{
    self, ActiveModel as SignerActiveModel, Column as SignerColumn, Entity as SignatureSigner,
    Model as SignerModel,
};

/// Fields of a new signature request.
#[derive(Debug, Clone)]
pub struct NewSignatureRequest {
    pub id: Uuid,
    pub document_name: String,
    pub document_path: String,
    pub template_id: Option<Uuid>,
    pub attachments: Vec<String>,
    pub created_by: Uuid,
}

/// Fields of a new signer.
#[derive(Debug, Clone)]
pub struct NewSigner {
    pub name: String,
    pub email: String,
    pub cpf: Option<String>,
    pub token: String,
}

/// One-time code state written when a code is sent.
#[derive(Debug, Clone)]
pub struct IssuedOtp {
    pub hash: String,
    pub salt: String,
    pub sent_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

pub struct SignatureRepository<'a> {
    db: &'a DatabaseConnection,
}

impl<'a> SignatureRepository<'a> {
    pub fn new(db: &'a DatabaseConnection) -> Self {
        Self { db }
    }

    /// Inserts a request and its single signer in one transaction.
    pub async fn create_with_signer(
        &self,
        request: NewSignatureRequest,
        signer: NewSigner,
        now: DateTime<Utc>,
    ) -> Result<(RequestModel, SignerModel), RepositoryError> {
        let txn = self
            .db
            .begin()
            .await
            .map_err(RepositoryError::database_error)?;

        let attachments = if request.attachments.is_empty() {
            None
        } else {
            Some(JsonValue::from(request.attachments))
        };

        let request = RequestActiveModel {
            id: Set(request.id),
            document_name: Set(request.document_name),
            document_path: Set(request.document_path),
            template_id: Set(request.template_id),
            attachments: Set(attachments),
            created_by: Set(request.created_by),
            status: Set(signature_request::STATUS_PENDING.to_string()),
            created_at: Set(to_db_time(now)),
        }
        .insert(&txn)
        .await
        .map_err(RepositoryError::database_error)?;

        let signer = SignerActiveModel {
            id: Set(Uuid::new_v4()),
            request_id: Set(request.id),
            name: Set(signer.name),
            email: Set(signer.email),
            cpf: Set(signer.cpf),
            token: Set(signer.token),
            status: Set(signature_signer::STATUS_PENDING.to_string()),
            otp_hash: Set(None),
            otp_salt: Set(None),
            otp_expires_at: Set(None),
            otp_sent_at: Set(None),
            otp_attempts: Set(0),
            verified_at: Set(None),
            signed_at: Set(None),
            created_at: Set(to_db_time(now)),
        }
        .insert(&txn)
        .await
        .map_err(RepositoryError::database_error)?;

        txn.commit()
            .await
            .map_err(RepositoryError::database_error)?;

        Ok((request, signer))
    }

    pub async fn find_request(&self, id: Uuid) -> Result<Option<RequestModel>, RepositoryError> {
        SignatureRequest::find_by_id(id)
            .one(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    pub async fn find_signer_by_token(
        &self,
        token: &str,
    ) -> Result<Option<SignerModel>, RepositoryError> {
        SignatureSigner::find()
            .filter(SignerColumn::Token.eq(token))
            .one(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    /// Stores a new code unless one was sent within `cooldown`.
    ///
    /// The cooldown check and the write are one conditional update, so of two
    /// concurrent sends only one claims the slot. Returns `false` when the
    /// cooldown is still running.
    pub async fn claim_otp_send(
        &self,
        signer_id: Uuid,
        otp: IssuedOtp,
        cooldown: Duration,
    ) -> Result<bool, RepositoryError> {
        let cooldown_start = to_db_time(otp.sent_at - cooldown);

        let result = SignatureSigner::update_many()
            .col_expr(SignerColumn::OtpHash, Expr::value(Some(otp.hash)))
            .col_expr(SignerColumn::OtpSalt, Expr::value(Some(otp.salt)))
            .col_expr(
                SignerColumn::OtpSentAt,
                Expr::value(Some(to_db_time(otp.sent_at))),
            )
            .col_expr(
                SignerColumn::OtpExpiresAt,
                Expr::value(Some(to_db_time(otp.expires_at))),
            )
            .col_expr(SignerColumn::OtpAttempts, Expr::value(0))
            .filter(SignerColumn::Id.eq(signer_id))
            .filter(
                Condition::any()
                    .add(SignerColumn::OtpSentAt.is_null())
                    .add(SignerColumn::OtpSentAt.lte(cooldown_start)),
            )
            .exec(self.db)
            .await
            .map_err(RepositoryError::database_error)?;

        Ok(result.rows_affected > 0)
    }

    /// Drops the code identified by `hash`, lifting the resend cooldown.
    ///
    /// A code issued after `hash` is left in place.
    pub async fn clear_otp(&self, signer_id: Uuid, hash: &str) -> Result<(), RepositoryError> {
        SignatureSigner::update_many()
            .col_expr(SignerColumn::OtpHash, Expr::value(Option::<String>::None))
            .col_expr(SignerColumn::OtpSalt, Expr::value(Option::<String>::None))
            .col_expr(
                SignerColumn::OtpSentAt,
                Expr::value(Option::<DateTime<FixedOffset>>::None),
            )
            .col_expr(
                SignerColumn::OtpExpiresAt,
                Expr::value(Option::<DateTime<FixedOffset>>::None),
            )
            .filter(SignerColumn::Id.eq(signer_id))
            .filter(SignerColumn::OtpHash.eq(hash))
            .exec(self.db)
            .await
            .map_err(RepositoryError::database_error)?;

        Ok(())
    }

    /// Spends one verification attempt, if fewer than `max_attempts` are used.
    ///
    /// Increments in the database rather than from a loaded row, so
    /// concurrent attempts cannot overwrite each other's count.
    pub async fn consume_attempt(
        &self,
        signer_id: Uuid,
        max_attempts: i32,
    ) -> Result<bool, RepositoryError> {
        let result = SignatureSigner::update_many()
            .col_expr(
                SignerColumn::OtpAttempts,
                Expr::col(SignerColumn::OtpAttempts).add(1),
            )
            .filter(SignerColumn::Id.eq(signer_id))
            .filter(SignerColumn::OtpAttempts.lt(max_attempts))
            .exec(self.db)
            .await
            .map_err(RepositoryError::database_error)?;

        Ok(result.rows_affected > 0)
    }

    /// Marks the signer verified and clears the code so it cannot be reused.
    ///
    /// Returns `false` when the code identified by `hash` was already used or
    /// replaced.
    pub async fn mark_verified(
        &self,
        signer_id: Uuid,
        hash: &str,
        now: DateTime<Utc>,
    ) -> Result<bool, RepositoryError> {
        let result = SignatureSigner::update_many()
            .col_expr(
                SignerColumn::VerifiedAt,
                Expr::value(Some(to_db_time(now))),
            )
            .col_expr(SignerColumn::OtpHash, Expr::value(Option::<String>::None))
            .col_expr(SignerColumn::OtpSalt, Expr::value(Option::<String>::None))
            .col_expr(
                SignerColumn::OtpExpiresAt,
                Expr::value(Option::<DateTime<FixedOffset>>::None),
            )
            .filter(SignerColumn::Id.eq(signer_id))
            .filter(SignerColumn::OtpHash.eq(hash))
            .exec(self.db)
            .await
            .map_err(RepositoryError::database_error)?;

        Ok(result.rows_affected > 0)
    }
}

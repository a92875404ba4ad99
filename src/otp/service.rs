//! Signer OTP: the `send` and `verify` actions.

use chrono::{DateTime, Duration, Utc};
use sea_orm::DatabaseConnection;
use serde::Serialize;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;

use crate::config::OtpConfig;
use crate::error::FunctionError;
use crate::mail::{Mailer, templates};
use crate::models::signature_signer::Model as SignerModel;
use crate::repositories::{IssuedOtp, SignatureRepository};

/// Result of a successful `send`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct OtpSent {
    /// When the emailed code stops being accepted
    pub expires_at: DateTime<Utc>,
}

/// Result of a successful `verify`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct OtpVerified {
    pub verified_at: DateTime<Utc>,
}

/// Longest code lifetime or cooldown honored, in days.
const MAX_POLICY_DAYS: i64 = 3650;

fn bounded_seconds(seconds: u64) -> Duration {
    i64::try_from(seconds)
        .ok()
        .and_then(Duration::try_seconds)
        .map_or(Duration::days(MAX_POLICY_DAYS), |value| {
            value.min(Duration::days(MAX_POLICY_DAYS))
        })
}

pub struct SignerOtpService<'a> {
    db: &'a DatabaseConnection,
    mailer: &'a dyn Mailer,
    policy: &'a OtpConfig,
}

impl<'a> SignerOtpService<'a> {
    pub fn new(db: &'a DatabaseConnection, mailer: &'a dyn Mailer, policy: &'a OtpConfig) -> Self {
        Self { db, mailer, policy }
    }

    async fn pending_signer(&self, token: &str) -> Result<SignerModel, FunctionError> {
        if token.trim().is_empty() {
            return Err(FunctionError::Validation("token is required".to_string()));
        }

        let signer = SignatureRepository::new(self.db)
            .find_signer_by_token(token.trim())
            .await?
            .ok_or_else(|| FunctionError::NotFound("signer not found".to_string()))?;

        if !signer.is_pending() {
            return Err(FunctionError::Forbidden(
                "this signature is no longer pending".to_string(),
            ));
        }

        Ok(signer)
    }

    /// Seconds left before another code may be sent, if any.
    fn cooldown_remaining(&self, signer: &SignerModel, now: DateTime<Utc>) -> Option<u64> {
        let sent_at = signer.otp_sent_at?.with_timezone(&Utc);
        let cooldown = i64::try_from(self.policy.cooldown_seconds).unwrap_or(i64::MAX);
        let elapsed = (now - sent_at).num_seconds();

        (elapsed < cooldown).then(|| u64::try_from(cooldown - elapsed.max(0)).unwrap_or(0).max(1))
    }

    #[instrument(skip_all)]
    pub async fn send(
        &self,
        token: &str,
        email: &str,
        now: DateTime<Utc>,
    ) -> Result<OtpSent, FunctionError> {
        let signer = self.pending_signer(token).await?;

        if !signer.email.trim().eq_ignore_ascii_case(email.trim()) {
            return Err(FunctionError::Forbidden(
                "email does not match the signer".to_string(),
            ));
        }

        if let Some(retry_after_seconds) = self.cooldown_remaining(&signer, now) {
            return Err(FunctionError::Cooldown {
                retry_after_seconds,
            });
        }

        let repository = SignatureRepository::new(self.db);
        let document_name = repository
            .find_request(signer.request_id)
            .await?
            .map(|request| request.document_name)
            .unwrap_or_else(|| "documento".to_string());

        let code = super::generate_code();
        let salt = super::generate_salt();
        let hash = super::hash_code(&salt, &code)
            .map_err(|e| FunctionError::Internal(format!("failed to hash code: {e}")))?;
        let expires_at = now + bounded_seconds(self.policy.ttl_seconds);
        let cooldown = bounded_seconds(self.policy.cooldown_seconds);

        let claimed = repository
            .claim_otp_send(
                signer.id,
                IssuedOtp {
                    hash: hash.clone(),
                    salt,
                    sent_at: now,
                    expires_at,
                },
                cooldown,
            )
            .await?;

        if !claimed {
            // Another send won the slot after the check above.
            let retry_after_seconds = repository
                .find_signer_by_token(&signer.token)
                .await?
                .and_then(|current| self.cooldown_remaining(&current, now))
                .unwrap_or(self.policy.cooldown_seconds.max(1));
            return Err(FunctionError::Cooldown {
                retry_after_seconds,
            });
        }

        let message = templates::signer_otp_email(
            &signer.name,
            &signer.email,
            &document_name,
            &code,
            self.policy.ttl_seconds.div_ceil(60),
        );

        if let Err(err) = self.mailer.send(message).await {
            warn!(signer_id = %signer.id, error = %err, "Code email failed; discarding code");
            repository.clear_otp(signer.id, &hash).await?;
            return Err(err.into());
        }

        info!(signer_id = %signer.id, "Sent verification code");
        Ok(OtpSent { expires_at })
    }

    #[instrument(skip_all)]
    pub async fn verify(
        &self,
        token: &str,
        code: &str,
        now: DateTime<Utc>,
    ) -> Result<OtpVerified, FunctionError> {
        let code = code.trim();
        if !super::is_well_formed(code) {
            return Err(FunctionError::Validation(
                "code must have 6 digits".to_string(),
            ));
        }

        let signer = self.pending_signer(token).await?;

        let (Some(hash), Some(salt)) = (signer.otp_hash.clone(), signer.otp_salt.clone()) else {
            return Err(FunctionError::Validation(
                "no active code; request a new one".to_string(),
            ));
        };

        let expired = signer
            .otp_expires_at
            .is_none_or(|expires_at| expires_at.with_timezone(&Utc) <= now);
        if expired {
            return Err(FunctionError::Validation(
                "code expired; request a new one".to_string(),
            ));
        }

        let max_attempts = i32::try_from(self.policy.max_attempts).unwrap_or(i32::MAX);
        let repository = SignatureRepository::new(self.db);

        // The attempt is spent before the comparison so parallel guesses
        // cannot exceed the limit.
        if !repository.consume_attempt(signer.id, max_attempts).await? {
            return Err(FunctionError::Forbidden(
                "too many attempts; request a new code".to_string(),
            ));
        }

        if !super::verify_code(&salt, code, &hash) {
            let used = repository
                .find_signer_by_token(&signer.token)
                .await?
                .map_or(max_attempts, |current| current.otp_attempts);
            let remaining = (max_attempts - used).max(0);
            info!(signer_id = %signer.id, remaining, "Rejected verification code");
            return Err(FunctionError::Validation(format!(
                "invalid code; {remaining} attempts left"
            )));
        }

        if !repository.mark_verified(signer.id, &hash, now).await? {
            return Err(FunctionError::Validation(
                "no active code; request a new one".to_string(),
            ));
        }
        info!(signer_id = %signer.id, "Signer verified");

        Ok(OtpVerified { verified_at: now })
    }
}

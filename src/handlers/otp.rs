//! # Signer OTP Function

use axum::{
    extract::{State, rejection::JsonRejection},
    response::Json,
};
use chrono::Utc;

use super::types::{OtpSendResponse, OtpVerifyResponse, SignerOtpRequest, SignerOtpResponse};
use crate::error::FunctionError;
use crate::otp::SignerOtpService;
use crate::server::AppState;

/// Sends or checks a signer's one-time code
///
/// A `send` inside the resend cooldown fails with `retry_after_seconds` set.
#[utoipa::path(
    post,
    path = "/functions/signer-otp",
    request_body = SignerOtpRequest,
    responses(
        (status = 200, description = "Action result; failures use the `FunctionErrorBody` envelope", body = SignerOtpResponse)
    ),
    tag = "functions"
)]
pub async fn signer_otp(
    State(state): State<AppState>,
    payload: Result<Json<SignerOtpRequest>, JsonRejection>,
) -> Result<Json<SignerOtpResponse>, FunctionError> {
    let Json(request) = payload?;
    let service = SignerOtpService::new(&state.db, state.mailer.as_ref(), &state.config.otp);

    let response = match request {
        SignerOtpRequest::Send { token, email } => {
            let sent = service.send(&token, &email, Utc::now()).await?;
            SignerOtpResponse::Send(OtpSendResponse {
                success: true,
                expires_at: sent.expires_at,
            })
        }
        SignerOtpRequest::Verify { token, code } => {
            let verified = service.verify(&token, &code, Utc::now()).await?;
            SignerOtpResponse::Verify(OtpVerifyResponse {
                success: true,
                verified_at: verified.verified_at,
            })
        }
    };

    Ok(Json(response))
}

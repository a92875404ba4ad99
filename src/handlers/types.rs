//! Request and response bodies of the function endpoints.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::documents::service::{SubmitInput, TemplateView};
use crate::notifications::RunReport;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    #[schema(example = "ok")]
    pub status: String,
}

impl HealthResponse {
    pub fn ok() -> Self {
        Self {
            status: "ok".to_string(),
        }
    }

    pub fn unavailable() -> Self {
        Self {
            status: "unavailable".to_string(),
        }
    }
}

/// Successful scheduler run
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SchedulerRunResponse {
    /// Always `true`
    pub success: bool,
    pub report: RunReport,
}

/// Scheduler run that failed outside of any single rule
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SchedulerFailureResponse {
    /// Always `false`
    pub success: bool,
    pub error: String,
}

/// Body of `POST /functions/template-fill`
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum TemplateFillRequest {
    /// Fetch a template by its public token
    Get { token: String },
    /// Render the template and open a signature request
    Submit(SubmitInput),
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TemplateGetResponse {
    pub success: bool,
    pub template: TemplateView,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TemplateSubmitResponse {
    pub success: bool,
    pub signature_request_id: Uuid,
    pub signer_token: String,
}

/// Successful answer of `POST /functions/template-fill`
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(untagged)]
pub enum TemplateFillResponse {
    Get(TemplateGetResponse),
    Submit(TemplateSubmitResponse),
}

/// Body of `POST /functions/signer-otp`
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum SignerOtpRequest {
    /// Email a new code to the signer
    Send { token: String, email: String },
    /// Check a code the signer typed
    Verify { token: String, code: String },
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct OtpSendResponse {
    pub success: bool,
    pub expires_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct OtpVerifyResponse {
    pub success: bool,
    pub verified_at: chrono::DateTime<chrono::Utc>,
}

/// Successful answer of `POST /functions/signer-otp`
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(untagged)]
pub enum SignerOtpResponse {
    Send(OtpSendResponse),
    Verify(OtpVerifyResponse),
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn template_request_is_tagged_by_action() {
        let get: TemplateFillRequest =
            serde_json::from_value(json!({ "action": "get", "token": "abc" })).unwrap();
        assert!(matches!(get, TemplateFillRequest::Get { token } if token == "abc"));

        let submit: TemplateFillRequest = serde_json::from_value(json!({
            "action": "submit",
            "token": "abc",
            "values": { "NOME": "Ana" },
            "signer": { "name": "Ana", "email": "ana@example.com" }
        }))
        .unwrap();
        let TemplateFillRequest::Submit(input) = submit else {
            panic!("expected submit");
        };
        assert_eq!(input.values["NOME"], "Ana");
        assert!(input.attachments.is_empty());
        assert!(input.signer.cpf.is_none());
    }

    #[test]
    fn unknown_action_is_rejected() {
        let result: Result<SignerOtpRequest, _> =
            serde_json::from_value(json!({ "action": "resend", "token": "x" }));
        assert!(result.is_err());
    }
}

//! # Template Fill Function

use std::time::Duration;

use axum::{
    extract::{State, rejection::JsonRejection},
    response::Json,
};
use chrono::Utc;

use super::types::{
    TemplateFillRequest, TemplateFillResponse, TemplateGetResponse, TemplateSubmitResponse,
};
use crate::documents::TemplateFillService;
use crate::error::FunctionError;
use crate::server::AppState;

/// Fetches or fills a public document template
#[utoipa::path(
    post,
    path = "/functions/template-fill",
    request_body = TemplateFillRequest,
    responses(
        (status = 200, description = "Action result; failures use the `FunctionErrorBody` envelope", body = TemplateFillResponse)
    ),
    tag = "functions"
)]
pub async fn template_fill(
    State(state): State<AppState>,
    payload: Result<Json<TemplateFillRequest>, JsonRejection>,
) -> Result<Json<TemplateFillResponse>, FunctionError> {
    let Json(request) = payload?;
    let service = TemplateFillService::new(
        &state.db,
        state.store.as_ref(),
        Duration::from_secs(state.config.storage.signed_url_ttl_seconds),
    );

    let response = match request {
        TemplateFillRequest::Get { token } => TemplateFillResponse::Get(TemplateGetResponse {
            success: true,
            template: service.get(&token).await?,
        }),
        TemplateFillRequest::Submit(input) => {
            let outcome = service.submit(input, Utc::now()).await?;
            TemplateFillResponse::Submit(TemplateSubmitResponse {
                success: true,
                signature_request_id: outcome.signature_request_id,
                signer_token: outcome.signer_token,
            })
        }
    };

    Ok(Json(response))
}

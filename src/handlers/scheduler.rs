//! # Notification Scheduler Trigger

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};

use super::types::{SchedulerFailureResponse, SchedulerRunResponse};
use crate::auth::OperatorAuth;
use crate::server::AppState;

/// Runs every notification rule once
///
/// Rule failures are reported per rule inside `report`; only a failure of the
/// run itself answers 500.
#[utoipa::path(
    post,
    path = "/functions/notification-scheduler",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Run finished", body = SchedulerRunResponse),
        (status = 401, description = "Missing or invalid operator token", body = crate::error::ApiError),
        (status = 500, description = "Run aborted", body = SchedulerFailureResponse)
    ),
    tag = "functions"
)]
pub async fn run_scheduler(State(state): State<AppState>, _auth: OperatorAuth) -> Response {
    let scheduler = Arc::clone(&state.scheduler);

    match tokio::spawn(async move { scheduler.run_once().await }).await {
        Ok(report) => (
            StatusCode::OK,
            Json(SchedulerRunResponse {
                success: true,
                report,
            }),
        )
            .into_response(),
        Err(err) => {
            tracing::error!(error = %err, "Scheduler run aborted");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(SchedulerFailureResponse {
                    success: false,
                    error: format!("scheduler run aborted: {err}"),
                }),
            )
                .into_response()
        }
    }
}

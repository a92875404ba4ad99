//! # Error Handling
//!
//! Two response shapes live here. Operator and protocol failures use
//! [`ApiError`], a problem+json body with trace ID propagation. The public
//! function endpoints use [`FunctionError`], which flattens every failure into
//! the `{ "success": false, "error": "..." }` envelope returned with HTTP 200 so
//! browser callers can always parse the body.

use axum::{
    extract::rejection::JsonRejection,
    http::{HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;
use utoipa::ToSchema;

use crate::documents::DocumentError;
use crate::mail::MailError;
use crate::storage::StorageError;
use crate::telemetry;

/// Unified API error response structure
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ApiError {
    /// HTTP status code for the response
    #[serde(skip_serializing, skip_deserializing)]
    pub status: StatusCode,
    /// Error code for programmatic handling
    pub code: Box<str>,
    /// Human-readable error message
    pub message: Box<str>,
    /// Correlation trace ID for debugging (optional)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace_id: Option<Box<str>>,
}

impl ApiError {
    pub fn new<S: Into<String>>(status: StatusCode, code: S, message: S) -> Self {
        Self {
            status,
            code: code.into().into_boxed_str(),
            message: message.into().into_boxed_str(),
            trace_id: Self::current_trace_id(),
        }
    }

    /// Trace ID of the current request, or a short correlation ID when the
    /// error is raised outside a traced request.
    fn current_trace_id() -> Option<Box<str>> {
        telemetry::current_trace_id()
            .map(|trace_id| trace_id.into_boxed_str())
            .or_else(|| {
                Some(format!("corr-{}", &uuid::Uuid::new_v4().to_string()[..8]).into_boxed_str())
            })
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut headers = HeaderMap::new();
        headers.insert(
            "content-type",
            HeaderValue::from_static("application/problem+json"),
        );

        (self.status, headers, axum::Json(self)).into_response()
    }
}

/// Returns true when the database rejected a write because of a unique index.
///
/// Postgres reports SQLSTATE 23505; SQLite reports extended codes 1555
/// (primary key) and 2067 (unique index).
pub fn is_unique_violation(error: &sea_orm::DbErr) -> bool {
    use sea_orm::RuntimeErr;

    const PG_UNIQUE: &str = "23505";
    const SQLITE_DUPLICATE_CODES: &[&str] = &["1555", "2067"];

    let runtime_err = match error {
        sea_orm::DbErr::Query(RuntimeErr::SqlxError(sqlx_err))
        | sea_orm::DbErr::Exec(RuntimeErr::SqlxError(sqlx_err)) => sqlx_err,
        _ => return false,
    };

    let Some(db_error) = runtime_err.as_database_error() else {
        return false;
    };

    if db_error.is_unique_violation() {
        return true;
    }

    db_error.code().is_some_and(|code| {
        let code = code.as_ref();
        code == PG_UNIQUE || SQLITE_DUPLICATE_CODES.contains(&code)
    })
}

/// Create an unauthorized error (401)
pub fn unauthorized(message: Option<&str>) -> ApiError {
    let msg = message.unwrap_or("Authentication required");
    ApiError::new(StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg)
}

/// Create an unauthorized error (401) with explicit trace_id
pub fn unauthorized_with_trace_id(message: Option<&str>, trace_id: String) -> ApiError {
    let mut error = unauthorized(message);
    error.trace_id = Some(trace_id.into_boxed_str());
    error
}

/// Errors surfaced by repositories.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sea_orm::DbErr),
}

impl RepositoryError {
    pub fn database_error(error: sea_orm::DbErr) -> Self {
        Self::Database(error)
    }

    pub fn is_unique_violation(&self) -> bool {
        matches!(self, Self::Database(err) if is_unique_violation(err))
    }
}

/// Failures of the public function endpoints (template fill, signer OTP).
///
/// Every variant is rendered as a flat message inside the
/// `{ success: false, error }` envelope.
#[derive(Debug, Error)]
pub enum FunctionError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("please wait {retry_after_seconds} seconds before requesting a new code")]
    Cooldown { retry_after_seconds: u64 },
    #[error("storage error: {0}")]
    Storage(String),
    #[error("email delivery failed: {0}")]
    Mail(String),
    #[error("document rendering failed: {0}")]
    Document(String),
    #[error("database error")]
    Database(#[source] sea_orm::DbErr),
    #[error("internal error: {0}")]
    Internal(String),
}

/// JSON envelope for failed function calls.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct FunctionErrorBody {
    /// Always `false`
    pub success: bool,
    /// Human-readable failure reason
    pub error: String,
    /// Seconds until a new OTP may be requested (cooldown failures only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after_seconds: Option<u64>,
}

impl FunctionError {
    pub fn body(&self) -> FunctionErrorBody {
        let retry_after_seconds = match self {
            Self::Cooldown {
                retry_after_seconds,
            } => Some(*retry_after_seconds),
            _ => None,
        };

        FunctionErrorBody {
            success: false,
            error: self.to_string(),
            retry_after_seconds,
        }
    }
}

impl IntoResponse for FunctionError {
    fn into_response(self) -> Response {
        match &self {
            Self::Database(err) => tracing::error!(error = ?err, "Function failed on database access"),
            Self::Storage(_) | Self::Mail(_) | Self::Document(_) | Self::Internal(_) => {
                tracing::error!(error = %self, "Function failed")
            }
            _ => tracing::info!(error = %self, "Function rejected request"),
        }

        (StatusCode::OK, axum::Json(json!(self.body()))).into_response()
    }
}

impl From<sea_orm::DbErr> for FunctionError {
    fn from(error: sea_orm::DbErr) -> Self {
        Self::Database(error)
    }
}

impl From<RepositoryError> for FunctionError {
    fn from(error: RepositoryError) -> Self {
        match error {
            RepositoryError::Database(err) => Self::Database(err),
        }
    }
}

impl From<JsonRejection> for FunctionError {
    fn from(rejection: JsonRejection) -> Self {
        Self::Validation(rejection.body_text())
    }
}

impl From<StorageError> for FunctionError {
    fn from(error: StorageError) -> Self {
        match error {
            StorageError::NotFound(path) => Self::NotFound(format!("file not found: {path}")),
            other => Self::Storage(other.to_string()),
        }
    }
}

impl From<MailError> for FunctionError {
    fn from(error: MailError) -> Self {
        Self::Mail(error.to_string())
    }
}

impl From<DocumentError> for FunctionError {
    fn from(error: DocumentError) -> Self {
        Self::Document(error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    #[test]
    fn test_api_error_basic() {
        let error = ApiError::new(
            StatusCode::BAD_REQUEST,
            "VALIDATION_FAILED",
            "Test error message",
        );

        assert_eq!(error.code, Box::from("VALIDATION_FAILED"));
        assert_eq!(error.message, Box::from("Test error message"));
    }

    #[test]
    fn test_content_type_header() {
        let response = unauthorized(None).into_response();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            response.headers().get("content-type").unwrap(),
            "application/problem+json"
        );
    }

    #[test]
    fn test_trace_id_generation() {
        let error = unauthorized(Some("nope"));

        let trace_id = error.trace_id.unwrap();
        assert!(trace_id.starts_with("corr-"));
        assert_eq!(trace_id.len(), 13);
    }

    #[test]
    fn test_non_sqlx_errors_are_not_unique_violations() {
        assert!(!is_unique_violation(&sea_orm::DbErr::Custom(
            "duplicate".to_string()
        )));
        assert!(!RepositoryError::database_error(sea_orm::DbErr::Custom("x".to_string()))
            .is_unique_violation());
    }

    #[test]
    fn test_cooldown_body_carries_retry_after() {
        let body = FunctionError::Cooldown {
            retry_after_seconds: 42,
        }
        .body();

        assert!(!body.success);
        assert_eq!(body.retry_after_seconds, Some(42));
        assert!(body.error.contains("42"));
    }

    #[tokio::test]
    async fn test_function_error_renders_envelope_with_200() {
        let response = FunctionError::NotFound("Template not found".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(
            value,
            json!({ "success": false, "error": "Template not found" })
        );
    }

    #[test]
    fn test_repository_error_maps_to_function_error() {
        let err: FunctionError =
            RepositoryError::database_error(sea_orm::DbErr::Custom("closed".to_string())).into();
        assert!(matches!(err, FunctionError::Database(_)));
    }
}

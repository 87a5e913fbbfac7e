//! JSON error responses for the HTTP layer

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use blogify_applications::{AccessError, ApplicationError};
use blogify_core::BlogifyError;
use serde_json::json;
use tracing::{debug, error};

/// Error returned by handlers and middleware
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Access(#[from] AccessError),

    #[error(transparent)]
    Core(#[from] BlogifyError),

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("{0}")]
    BadRequest(String),
}

impl From<ApplicationError> for ApiError {
    fn from(err: ApplicationError) -> Self {
        match err {
            ApplicationError::Access(e) => ApiError::Access(e),
            ApplicationError::Core(e) => ApiError::Core(e),
        }
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Access(e) => {
                StatusCode::from_u16(e.http_status()).unwrap_or(StatusCode::FORBIDDEN)
            }
            ApiError::Core(e) => match e {
                BlogifyError::Validation { .. } => StatusCode::BAD_REQUEST,
                BlogifyError::NotFound { .. } => StatusCode::NOT_FOUND,
                BlogifyError::Conflict { .. } => StatusCode::CONFLICT,
                BlogifyError::Authentication { .. } => StatusCode::UNAUTHORIZED,
                BlogifyError::Timeout { .. } => StatusCode::SERVICE_UNAVAILABLE,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::Access(e) => e.code(),
            ApiError::Core(e) => match e {
                BlogifyError::Validation { .. } => "validation_error",
                BlogifyError::NotFound { .. } => "not_found",
                BlogifyError::Conflict { .. } => "conflict",
                BlogifyError::Authentication { .. } => "authentication_failed",
                BlogifyError::Timeout { .. } => "timeout",
                _ => "internal_error",
            },
            ApiError::InvalidCredentials => "invalid_credentials",
            ApiError::BadRequest(_) => "bad_request",
        }
    }

    fn message(&self) -> String {
        match self {
            ApiError::Core(BlogifyError::Validation { message, .. })
            | ApiError::Core(BlogifyError::Conflict { message, .. }) => message.clone(),
            ApiError::Core(BlogifyError::NotFound { resource, .. }) => {
                format!("{} not found", capitalize(resource))
            }
            ApiError::Core(e) if self.status().is_server_error() => {
                e.log();
                "Internal server error".to_string()
            }
            other => other.to_string(),
        }
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code = self.code();
        let message = self.message();

        if status.is_server_error() {
            error!(error = code, "Request failed: {}", message);
        } else {
            debug!(error = code, status = status.as_u16(), "Request refused");
        }

        let body = Json(json!({
            "success": false,
            "error": code,
            "message": message,
        }));

        (status, body).into_response()
    }
}

/// Result type for handlers
pub type ApiResult<T> = Result<T, ApiError>;

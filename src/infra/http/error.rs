use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::application::cache::CacheServiceError;
use crate::application::error::ErrorReport;
use crate::application::repos::RepoError;
use crate::domain::cache::{FieldViolation, ValidationErrors};

const SOURCE: &str = "infra::http::error";

pub mod codes {
    pub const BAD_REQUEST: &str = "bad_request";
    pub const VALIDATION_FAILED: &str = "validation_failed";
    pub const DB_TIMEOUT: &str = "db_timeout";
    pub const REPO: &str = "repo_error";
}

#[derive(Debug, Serialize)]
pub struct ApiErrorBody {
    pub error: ApiErrorMessage,
}

#[derive(Debug, Serialize)]
pub struct ApiErrorMessage {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub details: Vec<FieldViolation>,
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    code: &'static str,
    message: &'static str,
    hint: Option<String>,
    details: Vec<FieldViolation>,
    diagnostic: Option<String>,
}

impl ApiError {
    pub fn new(
        status: StatusCode,
        code: &'static str,
        message: &'static str,
        hint: Option<String>,
    ) -> Self {
        Self {
            status,
            code,
            message,
            hint,
            details: Vec::new(),
            diagnostic: None,
        }
    }

    pub fn bad_request(message: &'static str, hint: Option<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, codes::BAD_REQUEST, message, hint)
    }

    pub fn validation(errors: ValidationErrors) -> Self {
        let diagnostic = errors.to_string();
        Self {
            details: errors.into_violations(),
            diagnostic: Some(diagnostic),
            ..Self::new(
                StatusCode::BAD_REQUEST,
                codes::VALIDATION_FAILED,
                "Request validation failed",
                None,
            )
        }
    }

    pub fn repo(err: RepoError) -> Self {
        let base = match err {
            RepoError::Timeout => Self::new(
                StatusCode::SERVICE_UNAVAILABLE,
                codes::DB_TIMEOUT,
                "Database timeout",
                None,
            ),
            _ => Self::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                codes::REPO,
                "Internal server error",
                None,
            ),
        };
        Self {
            diagnostic: Some(err.to_string()),
            ..base
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl From<CacheServiceError> for ApiError {
    fn from(err: CacheServiceError) -> Self {
        match err {
            CacheServiceError::Validation(errors) => Self::validation(errors),
            CacheServiceError::Repo(err) => Self::repo(err),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let detail = self
            .diagnostic
            .clone()
            .or_else(|| self.hint.clone())
            .unwrap_or_else(|| self.message.to_string());
        let body = ApiErrorBody {
            error: ApiErrorMessage {
                code: self.code.to_string(),
                message: self.message.to_string(),
                hint: self.hint,
                details: self.details,
            },
        };
        let mut response = (self.status, Json(body)).into_response();
        ErrorReport::from_message(SOURCE, self.status, format!("{}: {detail}", self.code))
            .attach(&mut response);
        response
    }
}

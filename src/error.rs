use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::storage::StoreError;
use crate::variables::FieldError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Please focus an input field first")]
    NoTargetFound,

    #[error("Could not insert the prompt. Try clicking the input field first")]
    InsertionFailed,

    #[error("Some fields need attention")]
    ValidationFailed(Vec<FieldError>),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Browser error: {0}")]
    BrowserError(String),

    #[error("Storage error: {0}")]
    StoreError(String),

    #[error("Invalid request: {0}")]
    ValidationError(String),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Stable machine-readable kind for message replies
    pub fn code(&self) -> &'static str {
        match self {
            AppError::NoTargetFound => "no_target_found",
            AppError::InsertionFailed => "insertion_failed",
            AppError::ValidationFailed(_) => "validation_failed",
            AppError::NotFound(_) => "not_found",
            AppError::BrowserError(_) => "browser_error",
            AppError::StoreError(_) => "store_error",
            AppError::ValidationError(_) => "invalid_request",
            AppError::Internal(_) => "internal",
        }
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => AppError::NotFound(id),
            other => AppError::StoreError(other.to_string()),
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    detail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    errors: Option<Vec<FieldError>>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match &self {
            AppError::NoTargetFound => (StatusCode::CONFLICT, "No Target"),
            AppError::InsertionFailed => (StatusCode::UNPROCESSABLE_ENTITY, "Insertion Failed"),
            AppError::ValidationFailed(_) => (StatusCode::UNPROCESSABLE_ENTITY, "Validation Failed"),
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "Not Found"),
            AppError::ValidationError(_) => (StatusCode::BAD_REQUEST, "Bad Request"),
            AppError::BrowserError(_) => (StatusCode::SERVICE_UNAVAILABLE, "Browser Error"),
            AppError::StoreError(_) => (StatusCode::INTERNAL_SERVER_ERROR, "Storage Error"),
            AppError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "Internal Error"),
        };

        let errors = match &self {
            AppError::ValidationFailed(errors) => Some(errors.clone()),
            _ => None,
        };

        let body = Json(ErrorResponse {
            error: error_message.to_string(),
            detail: self.to_string(),
            errors,
        });

        (status, body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

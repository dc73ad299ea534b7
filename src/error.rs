use axum::{
    response::{IntoResponse, Response},
    http::StatusCode,
};
use serde::Serialize;

use crate::api::response;

/// Errors raised by the summarization backend and by configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("LLM processing error: {0}")]
    LlmError(String),

    #[error("Request processing timed out")]
    Timeout,

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::LlmError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Timeout => StatusCode::REQUEST_TIMEOUT,
            AppError::ConfigError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let detail = match self {
            AppError::BadRequest(msg) | AppError::LlmError(msg) | AppError::ConfigError(msg) => msg,
            AppError::Timeout => "Request processing timed out".to_string(),
        };

        response::error(status, detail).into_response()
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        AppError::LlmError(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

/// Rejection of a submit before anything is sent.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Please enter a legal document to summarize.")]
    EmptyDocument,
}

/// Why a summarization round trip did not produce a summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RequestFailure {
    /// Connection refused, reset, timed out, or the body could not be read.
    #[error("transport error: {message}")]
    Transport { message: String },

    /// The backend answered with a non-success status.
    #[error("backend returned {status}{}", detail_suffix(.detail))]
    Backend { status: u16, detail: Option<String> },

    /// A success status whose body is not the expected JSON.
    #[error("malformed response: {message}")]
    Decode { message: String },

    #[error("request cancelled")]
    Cancelled,
}

fn detail_suffix(detail: &Option<String>) -> String {
    detail.as_deref().map(|d| format!(": {d}")).unwrap_or_default()
}

impl From<reqwest::Error> for RequestFailure {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            RequestFailure::Decode { message: err.to_string() }
        } else {
            RequestFailure::Transport { message: err.to_string() }
        }
    }
}

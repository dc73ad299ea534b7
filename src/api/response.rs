use axum::Json;
use axum::http::StatusCode;
use serde_json::Value;

use crate::api::models::{ErrorBody, SummarizeResponse};

pub fn success(summary: String) -> (StatusCode, Json<SummarizeResponse>) {
    (
        StatusCode::OK,
        Json(SummarizeResponse {
            summary: Some(summary),
        }),
    )
}

pub fn error(status: StatusCode, detail: String) -> (StatusCode, Json<ErrorBody>) {
    (
        status,
        Json(ErrorBody {
            detail: Value::String(detail),
        }),
    )
}

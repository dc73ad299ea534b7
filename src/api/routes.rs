use axum::{
    routing::{get, post},
    Router,
    extract::{DefaultBodyLimit, FromRequest, Json, Multipart, Request, State},
    http::header::CONTENT_TYPE,
    response::{IntoResponse, Response},
};
use tower_http::cors::{CorsLayer, Any};
use tracing::{info, warn};

use crate::error::{Result, AppError};
use crate::api::models::{HealthResponse, SummarizeRequest};
use crate::api::response;
use crate::extract::extract_upload;
use crate::llm::call_openrouter;
use crate::AppState;

pub fn create_router(app_state: AppState) -> Router {
    let body_limit = app_state.config.max_upload_bytes;

    Router::new()
        .route("/api/summarize", post(summarize_handler))
        .route("/api/health", get(health_handler))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(app_state)
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

/// Accepts either a JSON `{"text"}` body or a multipart form with a `text`
/// field and/or a `file` upload.
async fn summarize_handler(State(state): State<AppState>, request: Request) -> Response {
    let start_time = std::time::Instant::now();

    let result = tokio::time::timeout(state.config.handler_timeout, async {
        let document = read_document(&state, request).await?;
        process_summarize_request(&state, document.as_deref()).await
    })
    .await
    .unwrap_or(Err(AppError::Timeout));

    let elapsed = start_time.elapsed();
    match result {
        Ok(summary) => {
            info!(?elapsed, summary_chars = summary.chars().count(), "summary produced");
            response::success(summary).into_response()
        }
        Err(err) => {
            warn!(?elapsed, error = %err, "summarization request failed");
            err.into_response()
        }
    }
}

async fn read_document(state: &AppState, request: Request) -> Result<Option<String>> {
    let is_multipart = request
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with("multipart/form-data"));

    if is_multipart {
        let form = Multipart::from_request(request, state)
            .await
            .map_err(|rejection| AppError::BadRequest(rejection.body_text()))?;
        read_form(form).await
    } else {
        let Json(req) = Json::<SummarizeRequest>::from_request(request, state)
            .await
            .map_err(|rejection| AppError::BadRequest(rejection.body_text()))?;
        Ok(req.text)
    }
}

/// An uploaded file takes precedence over the `text` field.
async fn read_form(mut form: Multipart) -> Result<Option<String>> {
    let bad_form = |err: axum::extract::multipart::MultipartError| {
        AppError::BadRequest(format!("Invalid form data: {}", err.body_text()))
    };

    let mut text = None;
    let mut upload = None;
    while let Some(field) = form.next_field().await.map_err(bad_form)? {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("file") => {
                let filename = field.file_name().unwrap_or_default().to_string();
                let bytes = field.bytes().await.map_err(bad_form)?;
                if !filename.is_empty() || !bytes.is_empty() {
                    upload = Some((filename, bytes));
                }
            }
            Some("text") => text = Some(field.text().await.map_err(bad_form)?),
            _ => {}
        }
    }

    match upload {
        Some((filename, bytes)) => {
            info!(%filename, size = bytes.len(), "received upload");
            Ok(Some(extract_upload(&filename, bytes.to_vec()).await?))
        }
        None => Ok(text),
    }
}

async fn process_summarize_request(state: &AppState, text: Option<&str>) -> Result<String> {
    let document = validate_document(text, state.config.max_input_chars)?;
    info!(chars = document.chars().count(), "summarizing document");

    call_openrouter(&state.config, document).await
}

/// Checks presence, content and size of the submitted document.
pub fn validate_document(text: Option<&str>, max_chars: usize) -> Result<&str> {
    let text = match text {
        Some(text) if !text.is_empty() => text,
        _ => {
            return Err(AppError::BadRequest(
                "Either text or file must be provided".to_string(),
            ));
        }
    };

    if text.trim().is_empty() {
        return Err(AppError::BadRequest("No readable content found".to_string()));
    }

    if text.chars().count() > max_chars {
        return Err(AppError::BadRequest(format!(
            "Document too large. Max allowed: {} characters",
            max_chars
        )));
    }

    Ok(text)
}

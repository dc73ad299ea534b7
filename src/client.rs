//! HTTP client for the summarization backend.
//!
//! One call, one `POST`: a JSON `{"text": ..}` body, or a multipart `file`
//! part for uploads. The client never retries; it only applies a timeout
//! when one is configured.

use std::time::Duration;

use reqwest::multipart::{Form, Part};
use reqwest::{Client, ClientBuilder, Response};

use crate::api::models::{ErrorBody, SummarizeRequest, SummarizeResponse};
use crate::config::Config;
use crate::error::{AppError, RequestFailure, Result};

#[derive(Clone, Debug)]
pub struct SummaryClient {
    http: Client,
    endpoint: String,
}

impl SummaryClient {
    pub fn new(endpoint: impl Into<String>, timeout: Option<Duration>) -> Result<Self> {
        let mut builder = ClientBuilder::new();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder
            .build()
            .map_err(|e| AppError::ConfigError(format!("Failed to build HTTP client: {}", e)))?;

        Ok(SummaryClient {
            http,
            endpoint: endpoint.into(),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(config.endpoint.clone(), config.request_timeout)
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Posts `text` and returns the backend's `summary` field.
    ///
    /// `Ok(None)` means the backend answered successfully but sent no usable
    /// summary (field absent, `null`, or empty).
    pub async fn summarize(&self, text: &str) -> SummaryResult {
        let body = SummarizeRequest {
            text: Some(text.to_string()),
        };

        let res = self.http.post(&self.endpoint).json(&body).send().await?;
        read_summary(res).await
    }

    /// Uploads a document as the `file` part of a multipart form.
    pub async fn summarize_file(&self, filename: &str, contents: Vec<u8>) -> SummaryResult {
        let part = Part::bytes(contents).file_name(filename.to_string());
        let form = Form::new().part("file", part);

        let res = self.http.post(&self.endpoint).multipart(form).send().await?;
        read_summary(res).await
    }
}

pub type SummaryResult = std::result::Result<Option<String>, RequestFailure>;

async fn read_summary(res: Response) -> SummaryResult {
    let status = res.status();
    let bytes = res.bytes().await?;

    if !status.is_success() {
        let detail = serde_json::from_slice::<ErrorBody>(&bytes)
            .ok()
            .and_then(|body| body.detail_text());
        return Err(RequestFailure::Backend {
            status: status.as_u16(),
            detail,
        });
    }

    let parsed: SummarizeResponse =
        serde_json::from_slice(&bytes).map_err(|e| RequestFailure::Decode {
            message: e.to_string(),
        })?;

    Ok(parsed.summary.filter(|summary| !summary.is_empty()))
}

use std::time::Duration;

use once_cell::sync::Lazy;
use reqwest::{Client, ClientBuilder};
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::config::Config;
use crate::error::{AppError, Result};

// Shared across requests to reuse connections
static CLIENT: Lazy<Client> = Lazy::new(|| {
    ClientBuilder::new()
        .connect_timeout(Duration::from_secs(5))
        .pool_max_idle_per_host(10)
        .build()
        .unwrap_or_else(|_| Client::new())
});

const PROMPT_PREAMBLE: &str = concat!(
    "The following is a legal document. Summarize it in plain language for a non-lawyer. ",
    "Cover the parties involved, their main obligations and rights, key dates and amounts, ",
    "and any termination or liability clauses. ",
    "Do not add information that is not in the document:\n\n",
);

#[derive(Serialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<Message>,
}

pub fn build_prompt(document: &str) -> String {
    let mut result = String::with_capacity(document.len() + PROMPT_PREAMBLE.len());
    result.push_str(PROMPT_PREAMBLE);
    result.push_str(document);
    result
}

/// Sends `document` to the configured chat-completions endpoint and returns the reply.
pub async fn call_openrouter(config: &Config, document: &str) -> Result<String> {
    let api_key = config.require_api_key()?;
    let body = ChatRequest {
        model: config.model.clone(),
        messages: vec![Message {
            role: "user".into(),
            content: build_prompt(document),
        }],
    };

    let url = format!("{}/chat/completions", config.openrouter_base_url.trim_end_matches('/'));
    debug!(%url, model = %config.model, "calling upstream model");

    let res = CLIENT
        .post(&url)
        .bearer_auth(api_key)
        .header("X-Title", "legal-summarizer")
        .json(&body)
        .send()
        .await?;

    let status = res.status();
    if !status.is_success() {
        return Err(AppError::LlmError(format!("upstream returned {}", status)));
    }

    let json: Value = res.json().await?;
    extract_reply(&json)
}

fn extract_reply(json: &Value) -> Result<String> {
    let reply = json["choices"][0]["message"]["content"]
        .as_str()
        .map(str::trim)
        .filter(|reply| !reply.is_empty())
        .ok_or_else(|| AppError::LlmError("Invalid response format from LLM".to_string()))?;

    Ok(reply.to_string())
}

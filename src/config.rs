use std::env;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;
use crate::error::{AppError, Result};

pub const DEFAULT_ENDPOINT: &str = "http://localhost:8000/api/summarize";
pub const DEFAULT_OPENROUTER_BASE_URL: &str = "https://openrouter.ai/api/v1";
pub const DEFAULT_MODEL: &str = "deepseek/deepseek-chat-v3-0324";
pub const DEFAULT_MAX_INPUT_CHARS: usize = 16_000;
pub const DEFAULT_HANDLER_TIMEOUT: Duration = Duration::from_secs(90);
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

#[derive(Clone, Debug)]
pub struct Config {
    /// Where the client posts documents.
    pub endpoint: String,
    /// Client-side timeout; `None` leaves the transport unbounded.
    pub request_timeout: Option<Duration>,

    pub server_addr: SocketAddr,
    pub openrouter_api_key: Option<String>,
    pub openrouter_base_url: String,
    pub model: String,
    pub max_input_chars: usize,
    /// Request body limit, which bounds file uploads.
    pub max_upload_bytes: usize,
    pub handler_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            request_timeout: None,
            server_addr: SocketAddr::from(([127, 0, 0, 1], 8000)),
            openrouter_api_key: None,
            openrouter_base_url: DEFAULT_OPENROUTER_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            max_input_chars: DEFAULT_MAX_INPUT_CHARS,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            handler_timeout: DEFAULT_HANDLER_TIMEOUT,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        // Load environment variables from .env file if it exists
        dotenv::dotenv().ok();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds a config from an arbitrary variable source, falling back to defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Config::default();

        let endpoint = lookup("SUMMARIZER_ENDPOINT").unwrap_or(defaults.endpoint);
        let request_timeout = lookup("SUMMARIZER_TIMEOUT_SECS")
            .map(|secs| parse_secs("SUMMARIZER_TIMEOUT_SECS", &secs))
            .transpose()?;

        let host = lookup("HOST").unwrap_or_else(|| "127.0.0.1".to_string());
        let port = lookup("PORT").unwrap_or_else(|| "8000".to_string());
        let port = port
            .parse::<u16>()
            .map_err(|e| AppError::ConfigError(format!("Invalid port: {}", e)))?;
        let ip = IpAddr::from_str(&host)
            .map_err(|e| AppError::ConfigError(format!("Invalid host address: {}", e)))?;

        let max_input_chars = match lookup("MAX_INPUT_CHARS") {
            Some(raw) => parse_count("MAX_INPUT_CHARS", &raw)?,
            None => defaults.max_input_chars,
        };
        let max_upload_bytes = match lookup("MAX_UPLOAD_BYTES") {
            Some(raw) => parse_count("MAX_UPLOAD_BYTES", &raw)?,
            None => defaults.max_upload_bytes,
        };
        let handler_timeout = match lookup("HANDLER_TIMEOUT_SECS") {
            Some(raw) => parse_secs("HANDLER_TIMEOUT_SECS", &raw)?,
            None => defaults.handler_timeout,
        };

        Ok(Config {
            endpoint,
            request_timeout,
            server_addr: SocketAddr::new(ip, port),
            openrouter_api_key: lookup("OPENROUTER_API_KEY").filter(|key| !key.is_empty()),
            openrouter_base_url: lookup("OPENROUTER_BASE_URL")
                .unwrap_or(defaults.openrouter_base_url),
            model: lookup("SUMMARIZER_MODEL").unwrap_or(defaults.model),
            max_input_chars,
            max_upload_bytes,
            handler_timeout,
        })
    }

    /// The backend cannot run without an upstream key.
    pub fn require_api_key(&self) -> Result<&str> {
        self.openrouter_api_key
            .as_deref()
            .ok_or_else(|| AppError::ConfigError("OPENROUTER_API_KEY is not set".to_string()))
    }
}

fn parse_count(name: &str, raw: &str) -> Result<usize> {
    raw.parse::<usize>()
        .map_err(|e| AppError::ConfigError(format!("Invalid {}: {}", name, e)))
}

fn parse_secs(name: &str, raw: &str) -> Result<Duration> {
    raw.parse::<u64>()
        .map(Duration::from_secs)
        .map_err(|e| AppError::ConfigError(format!("Invalid {}: {}", name, e)))
}

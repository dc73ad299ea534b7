pub mod api;
pub mod client;
pub mod config;
pub mod controller;
pub mod error;
pub mod extract;
pub mod llm;

use std::sync::Arc;
use config::Config;

pub use client::SummaryClient;
pub use controller::{RequestState, Snapshot, SummaryOutcome, SummaryRequestController};
pub use error::{AppError, RequestFailure, ValidationError};

/// Application state that will be shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
}

//! Request/response controller for one summarization cycle.
//!
//! [`SummaryRequestController`] owns the document text, the request state and
//! the last outcome. A rendering layer reads them through [`Snapshot`]s
//! (polled or watched) and drives the controller through
//! [`SummaryRequestController::set_text`], [`SummaryRequestController::submit`]
//! and [`SummaryRequestController::cancel`].

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::client::SummaryClient;
use crate::error::{RequestFailure, ValidationError};

/// Shown when the backend answers without a summary.
pub const NO_SUMMARY_MESSAGE: &str = "No summary returned.";
/// Shown for every failed request, whatever the cause.
pub const ERROR_MESSAGE: &str = "❌ Error summarizing the document.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestState {
    #[default]
    Idle,
    InFlight,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SummaryOutcome {
    Ok { text: String },
    Error { reason: RequestFailure },
}

impl SummaryOutcome {
    /// Folds a raw client result into an outcome.
    pub fn from_result(result: Result<Option<String>, RequestFailure>) -> Self {
        match result {
            Ok(summary) => SummaryOutcome::from_response(summary),
            Err(failure) => SummaryOutcome::failed(failure),
        }
    }

    fn from_response(summary: Option<String>) -> Self {
        SummaryOutcome::Ok {
            text: summary.unwrap_or_else(|| NO_SUMMARY_MESSAGE.to_string()),
        }
    }

    fn failed(reason: RequestFailure) -> Self {
        SummaryOutcome::Error { reason }
    }

    /// What the user sees. Failure details are never included.
    pub fn display_text(&self) -> &str {
        match self {
            SummaryOutcome::Ok { text } => text,
            SummaryOutcome::Error { .. } => ERROR_MESSAGE,
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, SummaryOutcome::Ok { .. })
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, SummaryOutcome::Error { reason: RequestFailure::Cancelled })
    }
}

/// Read-only view of the controller's state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Snapshot {
    pub text: String,
    pub state: RequestState,
    pub result: Option<SummaryOutcome>,
}

impl Snapshot {
    pub fn is_loading(&self) -> bool {
        self.state == RequestState::InFlight
    }

    /// Label for the submit trigger, which is disabled while loading.
    pub fn button_label(&self) -> &'static str {
        match self.state {
            RequestState::Idle => "Summarize Document",
            RequestState::InFlight => "Summarizing...",
        }
    }

    pub fn result_text(&self) -> Option<&str> {
        self.result.as_ref().map(SummaryOutcome::display_text)
    }
}

struct ActiveRequest {
    id: u64,
    token: CancellationToken,
}

struct Shared {
    client: SummaryClient,
    snapshot: watch::Sender<Snapshot>,
    active: Mutex<Option<ActiveRequest>>,
    next_id: AtomicU64,
}

impl Shared {
    fn lock_active(&self) -> MutexGuard<'_, Option<ActiveRequest>> {
        self.active.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns to `Idle` with `result`, unless request `id` was already
    /// superseded or cancelled.
    fn settle(&self, id: u64, result: Option<SummaryOutcome>) -> bool {
        let mut active = self.lock_active();
        if active.as_ref().map(|req| req.id) != Some(id) {
            return false;
        }
        *active = None;
        self.snapshot.send_modify(|snapshot| {
            snapshot.state = RequestState::Idle;
            snapshot.result = result;
        });
        true
    }
}

/// Handle to a controller; clones share the same state.
#[derive(Clone)]
pub struct SummaryRequestController {
    shared: Arc<Shared>,
}

impl SummaryRequestController {
    /// Empty text, no result, `Idle`.
    pub fn new(client: SummaryClient) -> Self {
        let (snapshot, _) = watch::channel(Snapshot::default());
        SummaryRequestController {
            shared: Arc::new(Shared {
                client,
                snapshot,
                active: Mutex::new(None),
                next_id: AtomicU64::new(1),
            }),
        }
    }

    pub fn snapshot(&self) -> Snapshot {
        self.shared.snapshot.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.shared.snapshot.subscribe()
    }

    /// Replaces the document text. Allowed while a request is in flight.
    pub fn set_text(&self, text: impl Into<String>) {
        let text = text.into();
        self.shared.snapshot.send_modify(|snapshot| snapshot.text = text);
    }

    pub async fn submit_text(
        &self,
        text: impl Into<String>,
    ) -> Result<SummaryOutcome, ValidationError> {
        self.set_text(text);
        self.submit().await
    }

    /// Sends the current document to the backend and records the outcome.
    ///
    /// Blank documents are rejected without touching any state. A submit
    /// made while another is in flight cancels the earlier one. Dropping the
    /// returned future aborts the request and returns the controller to
    /// `Idle`.
    pub async fn submit(&self) -> Result<SummaryOutcome, ValidationError> {
        let text = self.shared.snapshot.borrow().text.clone();
        if text.trim().is_empty() {
            debug!("rejected blank document");
            return Err(ValidationError::EmptyDocument);
        }

        let request = self.begin();
        info!(
            request = request.id,
            chars = text.chars().count(),
            endpoint = self.shared.client.endpoint(),
            "submitting document"
        );

        let token = request.token.clone();
        let outcome = tokio::select! {
            biased;
            _ = token.cancelled() => SummaryOutcome::failed(RequestFailure::Cancelled),
            res = self.shared.client.summarize(&text) => SummaryOutcome::from_result(res),
        };

        let id = request.id;
        let outcome = request.finish(outcome);
        match &outcome {
            SummaryOutcome::Ok { .. } => info!(request = id, "summary received"),
            SummaryOutcome::Error { reason: RequestFailure::Cancelled } => {
                debug!(request = id, "request ended by cancellation")
            }
            SummaryOutcome::Error { reason } => {
                warn!(request = id, failure = %reason, "summarization failed")
            }
        }

        Ok(outcome)
    }

    /// Aborts the in-flight request, if any. The aborted submit resolves
    /// with a cancelled outcome and the result slot stays empty, even when
    /// the response had already arrived.
    pub fn cancel(&self) -> bool {
        let mut active = self.shared.lock_active();
        match active.take() {
            Some(req) => {
                req.token.cancel();
                self.shared
                    .snapshot
                    .send_modify(|snapshot| snapshot.state = RequestState::Idle);
                info!(request = req.id, "request cancelled");
                true
            }
            None => false,
        }
    }

    fn begin(&self) -> PendingRequest<'_> {
        let id = self.shared.next_id.fetch_add(1, Ordering::Relaxed);
        let token = CancellationToken::new();

        let mut active = self.shared.lock_active();
        if let Some(prev) = active.replace(ActiveRequest { id, token: token.clone() }) {
            debug!(superseded = prev.id, request = id, "cancelling superseded request");
            prev.token.cancel();
        }
        self.shared.snapshot.send_modify(|snapshot| {
            snapshot.state = RequestState::InFlight;
            snapshot.result = None;
        });
        drop(active);

        PendingRequest {
            shared: &self.shared,
            id,
            token,
            finished: false,
        }
    }
}

/// Resets the controller if a submit future is dropped mid-flight.
struct PendingRequest<'a> {
    shared: &'a Shared,
    id: u64,
    token: CancellationToken,
    finished: bool,
}

impl PendingRequest<'_> {
    /// Records `outcome` and hands it back, or reports `Cancelled` if the
    /// request lost its slot before it could be recorded.
    fn finish(mut self, outcome: SummaryOutcome) -> SummaryOutcome {
        self.finished = true;
        let result = (!outcome.is_cancelled()).then(|| outcome.clone());
        if self.shared.settle(self.id, result) {
            outcome
        } else {
            debug!(request = self.id, "discarding result of cancelled request");
            SummaryOutcome::failed(RequestFailure::Cancelled)
        }
    }
}

impl Drop for PendingRequest<'_> {
    fn drop(&mut self) {
        if !self.finished {
            self.token.cancel();
            self.shared.settle(self.id, None);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn controller() -> SummaryRequestController {
        // never contacted by these tests
        let client = SummaryClient::new("http://127.0.0.1:9/api/summarize", None).unwrap();
        SummaryRequestController::new(client)
    }

    #[test]
    fn mounts_empty_and_idle() {
        let snapshot = controller().snapshot();
        assert_eq!(snapshot, Snapshot::default());
        assert_eq!(snapshot.button_label(), "Summarize Document");
        assert!(snapshot.result_text().is_none());
    }

    #[tokio::test]
    async fn blank_documents_are_rejected_without_state_change() {
        let controller = controller();
        for text in ["", "   ", "\n\t  \r\n"] {
            controller.set_text(text);
            let before = controller.snapshot();
            assert_eq!(controller.submit().await, Err(ValidationError::EmptyDocument));
            assert_eq!(controller.snapshot(), before);
        }
    }

    #[test]
    fn cancel_without_request_is_a_no_op() {
        let controller = controller();
        assert!(!controller.cancel());
        assert_eq!(controller.snapshot().state, RequestState::Idle);
    }

    #[test]
    fn failures_display_the_generic_message() {
        let outcome = SummaryOutcome::failed(RequestFailure::Backend {
            status: 500,
            detail: Some("CUDA out of memory".into()),
        });
        assert_eq!(outcome.display_text(), ERROR_MESSAGE);
        assert!(!outcome.is_ok());
    }

    #[test]
    fn missing_summary_uses_placeholder() {
        assert_eq!(SummaryOutcome::from_response(None).display_text(), NO_SUMMARY_MESSAGE);
        assert_eq!(SummaryOutcome::from_response(Some("X".into())).display_text(), "X");
    }

    #[test]
    fn outcome_is_a_tagged_union() {
        let ok = serde_json::to_value(SummaryOutcome::from_response(Some("X".into()))).unwrap();
        assert_eq!(ok, serde_json::json!({ "kind": "ok", "text": "X" }));

        let err = serde_json::to_value(SummaryOutcome::failed(RequestFailure::Decode {
            message: "expected value".into(),
        }))
        .unwrap();
        assert_eq!(
            err,
            serde_json::json!({
                "kind": "error",
                "reason": { "type": "decode", "message": "expected value" },
            })
        );
    }

    #[test]
    fn response_racing_a_cancel_reports_cancelled() {
        let controller = controller();
        controller.set_text("lease");

        let request = controller.begin();
        assert!(controller.cancel());
        let outcome = request.finish(SummaryOutcome::from_response(Some("late".into())));

        assert!(outcome.is_cancelled());
        let snapshot = controller.snapshot();
        assert_eq!(snapshot.state, RequestState::Idle);
        assert!(snapshot.result.is_none());
    }

    #[test]
    fn superseded_response_is_not_recorded() {
        let controller = controller();
        let first = controller.begin();
        let second = controller.begin();

        let stale = first.finish(SummaryOutcome::from_response(Some("old".into())));
        assert!(stale.is_cancelled());
        assert_eq!(controller.snapshot().state, RequestState::InFlight);

        let fresh = second.finish(SummaryOutcome::from_response(Some("new".into())));
        assert_eq!(fresh.display_text(), "new");
        assert_eq!(controller.snapshot().result_text(), Some("new"));
    }

    #[test]
    fn loading_label() {
        let snapshot = Snapshot {
            state: RequestState::InFlight,
            ..Snapshot::default()
        };
        assert!(snapshot.is_loading());
        assert_eq!(snapshot.button_label(), "Summarizing...");
    }
}

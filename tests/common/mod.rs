#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    routing::post,
    Router,
};
use tokio::net::TcpListener;

pub async fn spawn_router(router: Router) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    addr
}

/// An address nothing is listening on.
pub async fn closed_endpoint() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}/api/summarize")
}

#[derive(Clone, Default)]
pub struct Recorded {
    hits: Arc<AtomicUsize>,
    bodies: Arc<Mutex<Vec<String>>>,
    content_types: Arc<Mutex<Vec<Option<String>>>>,
}

impl Recorded {
    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    pub fn bodies(&self) -> Vec<serde_json::Value> {
        self.bodies
            .lock()
            .unwrap()
            .iter()
            .map(|raw| serde_json::from_str(raw).unwrap())
            .collect()
    }

    pub fn content_types(&self) -> Vec<Option<String>> {
        self.content_types.lock().unwrap().clone()
    }

    fn record(&self, headers: &HeaderMap, body: String) {
        self.hits.fetch_add(1, Ordering::SeqCst);
        self.bodies.lock().unwrap().push(body);
        self.content_types.lock().unwrap().push(
            headers
                .get(header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string),
        );
    }
}

#[derive(Clone)]
struct CannedState {
    recorded: Recorded,
    status: StatusCode,
    body: &'static str,
}

/// A summarization backend that answers every POST with `status` and `body`.
pub struct StubBackend {
    pub endpoint: String,
    pub recorded: Recorded,
}

pub async fn spawn_stub_backend(status: StatusCode, body: &'static str) -> StubBackend {
    let recorded = Recorded::default();
    let state = CannedState {
        recorded: recorded.clone(),
        status,
        body,
    };

    let router = Router::new()
        .route("/api/summarize", post(canned_handler))
        .with_state(state);
    let addr = spawn_router(router).await;

    StubBackend {
        endpoint: format!("http://{addr}/api/summarize"),
        recorded,
    }
}

async fn canned_handler(
    State(state): State<CannedState>,
    headers: HeaderMap,
    body: String,
) -> (StatusCode, [(header::HeaderName, &'static str); 1], &'static str) {
    state.recorded.record(&headers, body);
    (state.status, [(header::CONTENT_TYPE, "application/json")], state.body)
}

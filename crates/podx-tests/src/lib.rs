//! In-process stand-in for the Reducto API used by the integration tests.
//!
//! Transfers whose body starts with [`FAIL_MARKER`] are rejected with a 500 and
//! transfers starting with [`SLOW_MARKER`] are held for [`SLOW_DELAY`] before
//! being accepted, so tests can steer individual documents by file content.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::{Path as UrlPath, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{post, put};
use axum::{Json, Router};
use serde_json::{json, Value};
use tokio::task::JoinHandle;
use url::Url;
use uuid::Uuid;

use podx_core::ClientConfig;

pub const API_KEY: &str = "test-key";
pub const FAIL_MARKER: &[u8] = b"FAIL";
pub const SLOW_MARKER: &[u8] = b"SLOW";
pub const SLOW_DELAY: Duration = Duration::from_millis(400);

#[derive(Debug, Clone)]
pub enum ExtractReply {
    /// Every extract call answers with this body.
    Fixed(Value),
    /// Extract answers 200 with a body that is not JSON.
    Malformed,
    /// Extract answers with this status and a plain-text body.
    Status(u16),
}

#[derive(Default)]
struct Counters {
    uploads: AtomicUsize,
    transfers: AtomicUsize,
    extracts: AtomicUsize,
    rejected_auth: AtomicUsize,
}

struct Inner {
    base_url: Url,
    reply: ExtractReply,
    counters: Counters,
    stored: Mutex<HashMap<String, Vec<u8>>>,
    extract_bodies: Mutex<Vec<Value>>,
    transfer_auth_headers: AtomicUsize,
}

#[derive(Clone)]
struct MockState(Arc<Inner>);

pub struct MockReducto {
    state: MockState,
    server: JoinHandle<()>,
}

impl MockReducto {
    pub async fn start(reply: ExtractReply) -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind mock listener");
        let addr = listener.local_addr().expect("mock listener has no address");
        let base_url = Url::parse(&format!("http://{addr}/")).expect("invalid mock base url");

        let state = MockState(Arc::new(Inner {
            base_url,
            reply,
            counters: Counters::default(),
            stored: Mutex::new(HashMap::new()),
            extract_bodies: Mutex::new(Vec::new()),
            transfer_auth_headers: AtomicUsize::new(0),
        }));

        let app = Router::new()
            .route("/upload", post(upload))
            .route("/blob/{id}", put(transfer))
            .route("/extract", post(extract))
            .with_state(state.clone());

        let server = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                tracing::error!(error = %e, "mock server stopped");
            }
        });

        Self { state, server }
    }

    pub fn base_url(&self) -> Url {
        self.state.0.base_url.clone()
    }

    pub fn config(&self) -> ClientConfig {
        ClientConfig::new(API_KEY, self.base_url())
    }

    pub fn uploads(&self) -> usize {
        self.state.0.counters.uploads.load(Ordering::SeqCst)
    }

    pub fn transfers(&self) -> usize {
        self.state.0.counters.transfers.load(Ordering::SeqCst)
    }

    pub fn extracts(&self) -> usize {
        self.state.0.counters.extracts.load(Ordering::SeqCst)
    }

    pub fn rejected_auth(&self) -> usize {
        self.state.0.counters.rejected_auth.load(Ordering::SeqCst)
    }

    /// Number of transfers that arrived with an `Authorization` header.
    pub fn transfers_with_auth(&self) -> usize {
        self.state.0.transfer_auth_headers.load(Ordering::SeqCst)
    }

    /// Bodies received by the extract endpoint, in arrival order.
    pub fn extract_bodies(&self) -> Vec<Value> {
        self.state.0.extract_bodies.lock().unwrap().clone()
    }

    /// Bytes stored under `file_id` by a transfer.
    pub fn stored(&self, file_id: &str) -> Option<Vec<u8>> {
        self.state.0.stored.lock().unwrap().get(file_id).cloned()
    }
}

impl Drop for MockReducto {
    fn drop(&mut self) {
        self.server.abort();
    }
}

fn authorized(state: &MockState, headers: &HeaderMap) -> bool {
    let expected = format!("Bearer {API_KEY}");
    let ok = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == expected);
    if !ok {
        state.0.counters.rejected_auth.fetch_add(1, Ordering::SeqCst);
    }
    ok
}

fn file_id_for(n: usize) -> String {
    format!("reducto://doc-{n}")
}

async fn upload(State(state): State<MockState>, headers: HeaderMap) -> Response {
    if !authorized(&state, &headers) {
        return (StatusCode::UNAUTHORIZED, "missing bearer token").into_response();
    }
    let n = state.0.counters.uploads.fetch_add(1, Ordering::SeqCst) + 1;
    let presigned_url = state
        .0
        .base_url
        .join(&format!("blob/{n}"))
        .expect("invalid blob url");

    Json(json!({
        "presigned_url": presigned_url.as_str(),
        "file_id": file_id_for(n),
    }))
    .into_response()
}

async fn transfer(
    State(state): State<MockState>,
    UrlPath(id): UrlPath<usize>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    state.0.counters.transfers.fetch_add(1, Ordering::SeqCst);
    if headers.contains_key(header::AUTHORIZATION) {
        state.0.transfer_auth_headers.fetch_add(1, Ordering::SeqCst);
    }

    if body.starts_with(FAIL_MARKER) {
        return (StatusCode::INTERNAL_SERVER_ERROR, "storage unavailable").into_response();
    }
    if body.starts_with(SLOW_MARKER) {
        tokio::time::sleep(SLOW_DELAY).await;
    }

    state
        .0
        .stored
        .lock()
        .unwrap()
        .insert(file_id_for(id), body.to_vec());
    StatusCode::OK.into_response()
}

async fn extract(
    State(state): State<MockState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if !authorized(&state, &headers) {
        return (StatusCode::UNAUTHORIZED, "missing bearer token").into_response();
    }
    state.0.counters.extracts.fetch_add(1, Ordering::SeqCst);

    let known = body
        .get("document_url")
        .and_then(Value::as_str)
        .is_some_and(|id| state.0.stored.lock().unwrap().contains_key(id));
    state.0.extract_bodies.lock().unwrap().push(body);
    if !known {
        return (StatusCode::NOT_FOUND, "unknown document").into_response();
    }

    match &state.0.reply {
        ExtractReply::Fixed(value) => Json(value.clone()).into_response(),
        ExtractReply::Malformed => (StatusCode::OK, "<html>not json</html>").into_response(),
        ExtractReply::Status(code) => (
            StatusCode::from_u16(*code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            "extraction failed",
        )
            .into_response(),
    }
}

/// Temporary directory removed on drop.
pub struct ScratchDir {
    path: PathBuf,
}

impl ScratchDir {
    pub fn new() -> Self {
        let path = std::env::temp_dir().join(format!("podx-{}", Uuid::new_v4()));
        std::fs::create_dir_all(&path).expect("failed to create scratch dir");
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Writes `contents` to `name` inside the directory and returns its path.
    pub fn file(&self, name: &str, contents: &[u8]) -> PathBuf {
        let path = self.path.join(name);
        std::fs::write(&path, contents).expect("failed to write scratch file");
        path
    }
}

impl Default for ScratchDir {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for ScratchDir {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.path);
    }
}

#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    extract::{Query, State},
    http::{HeaderMap, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use bones_bot::handler::{Bot, ChatClient};
use bones_bot::hydrus::{HydrusClient, HydrusError, MediaIndex};
use bones_bot::models::{ContentLocator, FileId, FileMetadata, ReplyPayload};
use bones_bot::resolver::MediaResolver;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub const ACCESS_KEY: &str = "test-access-key";
pub const BOT_USER: &str = "@bones:example.org";
pub const ROOM: &str = "!room:example.org";

pub fn metadata(hash: &str) -> FileMetadata {
    FileMetadata {
        hash: hash.to_string(),
        width: Some(10),
        height: Some(20),
        mime: "image/png".into(),
        ext: ".png".into(),
        size: 500,
    }
}

pub fn locator() -> ContentLocator {
    ContentLocator::new("example.org", "p-")
}

/// A request seen by the mock Hydrus server.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub path: String,
    pub raw_query: String,
    pub query: HashMap<String, String>,
    pub access_key: Option<String>,
}

/// In-process stand-in for the Hydrus client API.
#[derive(Default)]
pub struct MockHydrus {
    pub file_ids: Vec<FileId>,
    pub metadata: HashMap<FileId, FileMetadata>,
    /// Status returned by every endpoint instead of a normal response.
    pub fail_with: Option<u16>,
    /// Raw body returned by the metadata endpoint instead of JSON.
    pub raw_metadata_body: Option<String>,
    pub requests: Mutex<Vec<RecordedRequest>>,
}

impl MockHydrus {
    pub fn with_files(files: &[(FileId, &str)]) -> Self {
        Self {
            file_ids: files.iter().map(|(id, _)| *id).collect(),
            metadata: files.iter().map(|(id, hash)| (*id, metadata(hash))).collect(),
            ..Default::default()
        }
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    fn record(&self, uri: &Uri, headers: &HeaderMap, query: HashMap<String, String>) {
        self.requests.lock().unwrap().push(RecordedRequest {
            path: uri.path().to_string(),
            raw_query: uri.query().unwrap_or_default().to_string(),
            query,
            access_key: headers
                .get("Hydrus-Client-API-Access-Key")
                .and_then(|v| v.to_str().ok())
                .map(String::from),
        });
    }

    fn check(&self, headers: &HeaderMap) -> Option<Response> {
        if let Some(code) = self.fail_with {
            let status = StatusCode::from_u16(code).unwrap();
            return Some((status, "mock failure").into_response());
        }
        let key = headers
            .get("Hydrus-Client-API-Access-Key")
            .and_then(|v| v.to_str().ok());
        if key != Some(ACCESS_KEY) {
            return Some((StatusCode::FORBIDDEN, "bad access key").into_response());
        }
        None
    }
}

async fn search_files(
    State(mock): State<Arc<MockHydrus>>,
    uri: Uri,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    mock.record(&uri, &headers, query);
    if let Some(res) = mock.check(&headers) {
        return res;
    }
    Json(serde_json::json!({ "file_ids": mock.file_ids, "version": 1 })).into_response()
}

async fn file_metadata(
    State(mock): State<Arc<MockHydrus>>,
    uri: Uri,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    let ids: Vec<FileId> = query
        .get("file_ids")
        .and_then(|raw| serde_json::from_str(raw).ok())
        .unwrap_or_default();
    mock.record(&uri, &headers, query);
    if let Some(res) = mock.check(&headers) {
        return res;
    }
    if let Some(body) = &mock.raw_metadata_body {
        return body.clone().into_response();
    }
    let metadata: Vec<&FileMetadata> = ids.iter().filter_map(|id| mock.metadata.get(id)).collect();
    Json(serde_json::json!({ "metadata": metadata })).into_response()
}

/// Start the mock on a random TCP port and return its base URL.
pub async fn spawn_hydrus(mock: MockHydrus) -> (String, Arc<MockHydrus>) {
    let mock = Arc::new(mock);
    let app = Router::new()
        .route("/get_files/search_files", get(search_files))
        .route("/get_files/file_metadata", get(file_metadata))
        .with_state(mock.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let base = format!("http://127.0.0.1:{}", addr.port());

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (base, mock)
}

pub async fn hydrus_client(mock: MockHydrus) -> (HydrusClient, Arc<MockHydrus>) {
    let (base, mock) = spawn_hydrus(mock).await;
    (HydrusClient::new(&base, ACCESS_KEY), mock)
}

/// Media index kept in memory, for tests that make many lookups.
#[derive(Default)]
pub struct FakeIndex {
    pub file_ids: Vec<FileId>,
    pub metadata: HashMap<FileId, FileMetadata>,
    pub search_calls: AtomicUsize,
    pub metadata_calls: AtomicUsize,
}

impl FakeIndex {
    pub fn with_files(files: &[(FileId, &str)]) -> Self {
        Self {
            file_ids: files.iter().map(|(id, _)| *id).collect(),
            metadata: files.iter().map(|(id, hash)| (*id, metadata(hash))).collect(),
            ..Default::default()
        }
    }

    pub fn searches(&self) -> usize {
        self.search_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MediaIndex for FakeIndex {
    async fn search_files(&self, _tags: &[String]) -> Result<Vec<FileId>, HydrusError> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.file_ids.clone())
    }

    async fn file_metadata(&self, file_id: FileId) -> Result<Option<FileMetadata>, HydrusError> {
        self.metadata_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.metadata.get(&file_id).cloned())
    }
}

/// Chat client that keeps every message it is asked to send.
pub struct RecordingChat {
    pub user_id: String,
    pub fail: bool,
    pub sent: Mutex<Vec<(String, ReplyPayload)>>,
}

impl RecordingChat {
    pub fn new() -> Self {
        Self {
            user_id: BOT_USER.into(),
            fail: false,
            sent: Mutex::new(Vec::new()),
        }
    }

    pub fn sent(&self) -> Vec<(String, ReplyPayload)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatClient for RecordingChat {
    fn user_id(&self) -> &str {
        &self.user_id
    }

    async fn send_message(&self, room_id: &str, content: &ReplyPayload) -> anyhow::Result<()> {
        if self.fail {
            anyhow::bail!("room is gone");
        }
        self.sent
            .lock()
            .unwrap()
            .push((room_id.to_string(), content.clone()));
        Ok(())
    }
}

pub fn seeded_resolver<M: MediaIndex>(index: M) -> MediaResolver<M, StdRng> {
    MediaResolver::with_rng(index, locator(), StdRng::seed_from_u64(7))
}

pub fn test_bot<M: MediaIndex>(index: M) -> Bot<M, RecordingChat, StdRng> {
    Bot::new(seeded_resolver(index), RecordingChat::new())
}

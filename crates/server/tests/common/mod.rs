//! Common test utilities for API testing with mocks.
//!
//! The fixture builds the full router in-process, with the mock transcoder
//! in place of ffmpeg and every library directory inside a temp dir.

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{HeaderMap, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use reelhouse_core::{
    CatalogStore, Config, LibraryConfig, SqliteCatalogStore, Transcoder,
    testing::MockTranscoder,
};
use reelhouse_server::state::AppState;

/// Re-export fixtures for test convenience
pub use reelhouse_core::testing::fixtures;

/// Test fixture for API testing with a mock transcoder.
///
/// # Example
///
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_catalog() {
///     let fixture = TestFixture::new().await;
///     fixtures::write_episode(&fixture.output_dir, "Show", "ep1").unwrap();
///
///     let response = fixture.get("/api/v1/catalog/Show").await;
///     assert_eq!(response.status, 200);
/// }
/// ```
pub struct TestFixture {
    /// The Axum router for testing
    pub router: Router,
    /// Mock transcoder - control segmenting and repair outcomes
    pub transcoder: Arc<MockTranscoder>,
    /// Temporary directory holding every library directory
    pub temp_dir: TempDir,
    /// Raw upload area
    pub raw_dir: PathBuf,
    /// Default output root
    pub output_dir: PathBuf,
    /// Destination of repaired output
    pub repair_dir: PathBuf,
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

/// Response from a streaming endpoint, one JSON value per `data:` frame.
#[derive(Debug)]
pub struct SseResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub events: Vec<Value>,
}

impl SseResponse {
    /// Event types in arrival order.
    pub fn types(&self) -> Vec<String> {
        self.events
            .iter()
            .filter_map(|e| e["type"].as_str().map(str::to_string))
            .collect()
    }

    /// The final `complete` event.
    pub fn summary(&self) -> &Value {
        self.events
            .iter()
            .rev()
            .find(|e| e["type"] == "complete")
            .expect("stream carried no complete event")
    }
}

impl TestFixture {
    /// Fixture backed by an in-memory catalog store.
    pub async fn new() -> Self {
        Self::with_config(TestConfig::default()).await
    }

    /// Create a test fixture with custom configuration.
    pub async fn with_config(test_config: TestConfig) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let raw_dir = temp_dir.path().join("videos");
        let output_dir = temp_dir.path().join("hls");
        let repair_dir = temp_dir.path().join("fixed");
        for dir in [&raw_dir, &output_dir, &repair_dir] {
            std::fs::create_dir_all(dir).expect("Failed to create library dir");
        }

        let mut config = Config::default();
        config.server.port = 0; // Not used for in-process testing
        config.library = LibraryConfig {
            raw_dir: raw_dir.clone(),
            output_dir: output_dir.clone(),
            repair_output_dir: repair_dir.clone(),
            ..Default::default()
        };
        config.transcoder.preserve_originals = test_config.preserve_originals;

        let store: Option<Arc<dyn CatalogStore>> = if test_config.filesystem_mode {
            None
        } else {
            Some(Arc::new(
                SqliteCatalogStore::in_memory().expect("Failed to create catalog store"),
            ))
        };

        let transcoder = Arc::new(MockTranscoder::new());
        let state = Arc::new(AppState::new(
            config,
            Arc::clone(&transcoder) as Arc<dyn Transcoder>,
            store,
        ));

        let router = reelhouse_server::api::create_router(state);

        Self {
            router,
            transcoder,
            temp_dir,
            raw_dir,
            output_dir,
            repair_dir,
        }
    }

    /// Send a GET request to the test server.
    pub async fn get(&self, path: &str) -> TestResponse {
        self.request("GET", path, None).await
    }

    /// Send a POST request with JSON body.
    pub async fn post(&self, path: &str, body: Value) -> TestResponse {
        self.request("POST", path, Some(body)).await
    }

    /// Send a POST request without a body.
    pub async fn post_empty(&self, path: &str) -> TestResponse {
        self.request("POST", path, None).await
    }

    /// Send a DELETE request.
    pub async fn delete(&self, path: &str) -> TestResponse {
        self.request("DELETE", path, None).await
    }

    /// Send a request to a streaming endpoint and read it to the end.
    pub async fn stream(&self, method: &str, path: &str, body: Option<Value>) -> SseResponse {
        let (status, headers, bytes) = self.send(method, path, body).await;
        let text = String::from_utf8(bytes).expect("SSE body is not UTF-8");
        let events = text
            .lines()
            .filter_map(|line| line.strip_prefix("data:"))
            .map(|data| serde_json::from_str(data.trim()).expect("SSE data is not JSON"))
            .collect();

        SseResponse {
            status,
            headers,
            events,
        }
    }

    /// Send a request to the test server.
    async fn request(&self, method: &str, path: &str, body: Option<Value>) -> TestResponse {
        let (status, headers, bytes) = self.send(method, path, body).await;
        let body: Value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };

        TestResponse {
            status,
            headers,
            body,
        }
    }

    async fn send(
        &self,
        method: &str,
        path: &str,
        body: Option<Value>,
    ) -> (StatusCode, HeaderMap, Vec<u8>) {
        let mut request_builder = Request::builder().method(method).uri(path);

        let body = if let Some(json_body) = body {
            request_builder = request_builder.header("Content-Type", "application/json");
            Body::from(serde_json::to_vec(&json_body).unwrap())
        } else {
            Body::empty()
        };

        let request = request_builder.body(body).unwrap();

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let headers = response.headers().clone();
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();

        (status, headers, body_bytes.to_vec())
    }
}

/// Configuration for test fixture.
#[derive(Debug, Clone, Default)]
pub struct TestConfig {
    /// Run the catalog without a store
    pub filesystem_mode: bool,
    /// Keep raw `.mp4` sources after segmenting
    pub preserve_originals: bool,
}

impl TestConfig {
    pub fn filesystem() -> Self {
        Self {
            filesystem_mode: true,
            ..Default::default()
        }
    }
}

/// Helper to assert a response has expected status.
#[macro_export]
macro_rules! assert_status {
    ($response:expr, $status:expr) => {
        assert_eq!(
            $response.status, $status,
            "Expected status {:?}, got {:?}. Body: {}",
            $status,
            $response.status,
            serde_json::to_string_pretty(&$response.body).unwrap_or_default()
        );
    };
}

/// Helper to assert a JSON path equals expected value.
#[macro_export]
macro_rules! assert_json_path {
    ($json:expr, $path:expr, $expected:expr) => {
        let actual = &$json[$path];
        assert_eq!(
            actual, &$expected,
            "Path '{}' expected {:?}, got {:?}",
            $path, $expected, actual
        );
    };
}

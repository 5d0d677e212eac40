//! Shared test helpers for integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use http::{Request, StatusCode};
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;
use uuid::Uuid;

use catalog_api::{AppState, build_app};
use catalog_core::config::{QueueConfig, ServerConfig};
use catalog_database::DatabasePool;
use catalog_entity::job::ExecutionContext;
use catalog_queue::{Enqueuer, JobManager, MemoryJobStore, MemorySubjectCatalog};

/// Test application over in-memory backends
pub struct TestApp {
    /// The Axum router for making test requests
    pub router: Router,
    /// Job manager behind the router
    pub manager: Arc<JobManager>,
    /// Job store, for direct inspection
    pub store: MemoryJobStore,
    /// Subject catalog, for direct inspection
    pub catalog: MemorySubjectCatalog,
    /// Scratch volume holding source media and proxies
    pub dir: TempDir,
}

impl TestApp {
    /// Create a new test application
    pub async fn new() -> Self {
        Self::build(None).await
    }

    /// Create a test application whose `/status` checks `database`
    pub async fn with_database(database: DatabasePool) -> Self {
        Self::build(Some(database)).await
    }

    async fn build(database: Option<DatabasePool>) -> Self {
        let store = MemoryJobStore::new();
        let catalog = MemorySubjectCatalog::new();
        let manager = Arc::new(JobManager::new(
            Arc::new(store.clone()),
            Arc::new(catalog.clone()),
        ));
        let enqueuer = Arc::new(
            Enqueuer::new(
                Arc::clone(&manager),
                Arc::new(catalog.clone()),
                &QueueConfig::default(),
            )
            .expect("Failed to build enqueuer"),
        );

        let mut state = AppState::new(Arc::clone(&manager), enqueuer);
        if let Some(database) = database {
            state = state.with_database(database);
        }
        let router = build_app(state, &ServerConfig::default());

        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        std::fs::create_dir_all(dir.path().join("media")).expect("Failed to create media dir");

        Self {
            router,
            manager,
            store,
            catalog,
            dir,
        }
    }

    /// Storage context for subjects on the scratch volume
    pub fn context(&self) -> ExecutionContext {
        ExecutionContext {
            source_root: self.dir.path().join("media").to_string_lossy().into_owned(),
            output_root: self.dir.path().join("proxies").to_string_lossy().into_owned(),
        }
    }

    /// Register a subject whose source file exists on the scratch volume
    pub async fn add_subject(&self, payload_ref: &str) -> Uuid {
        std::fs::write(self.dir.path().join("media").join(payload_ref), b"media")
            .expect("Failed to write source file");
        let subject_id = Uuid::new_v4();
        self.catalog
            .insert(subject_id, payload_ref, Some(self.context()))
            .await;
        subject_id
    }

    /// Enqueue a job for `subject_id` through the API and return its ID
    pub async fn enqueue(&self, subject_id: Uuid, body: Value) -> Uuid {
        let response = self
            .request("POST", &format!("/subjects/{subject_id}/enqueue"), Some(body))
            .await;
        assert_eq!(response.status, StatusCode::CREATED, "{:?}", response.body);
        response.body["data"]["id"]
            .as_str()
            .and_then(|id| id.parse().ok())
            .expect("Enqueue response carries a job id")
    }

    /// Make an HTTP request against the router
    pub async fn request(&self, method: &str, path: &str, body: Option<Value>) -> TestResponse {
        let body_str = body
            .map(|b| serde_json::to_string(&b).expect("Failed to serialize body"))
            .unwrap_or_default();

        let req = Request::builder()
            .method(method)
            .uri(path)
            .header("Content-Type", "application/json")
            .body(Body::from(body_str))
            .expect("Failed to build request");

        let response = self
            .router
            .clone()
            .oneshot(req)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let body_bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024)
            .await
            .expect("Failed to read body");

        let body: Value = serde_json::from_slice(&body_bytes).unwrap_or(Value::Null);

        TestResponse { status, body }
    }
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    /// HTTP status code
    pub status: StatusCode,
    /// Parsed JSON body
    pub body: Value,
}

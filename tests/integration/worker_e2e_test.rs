//! End-to-end tests: a worker talks to the manager over real HTTP.

mod helpers;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tokio::net::TcpListener;
use tokio::sync::watch;

use catalog_core::config::WorkerConfig;
use catalog_core::error::ErrorKind;
use catalog_entity::job::{JobResult, JobStatus, MediaMetadata, ProxyArtifacts};
use catalog_entity::subject::SubjectStatus;
use catalog_worker::tools::{MediaProbe, ProxyTranscoder, ToolError};
use catalog_worker::{HttpManagerClient, JobExecutor, ManagerApi, WorkerRunner};

#[derive(Debug)]
struct StubProbe;

#[async_trait]
impl MediaProbe for StubProbe {
    async fn probe(&self, _input: &Path) -> Result<MediaMetadata, ToolError> {
        Ok(MediaMetadata {
            container: Some("mov".to_string()),
            duration_seconds: Some(8.0),
            ..MediaMetadata::default()
        })
    }
}

#[derive(Debug)]
struct StubTranscoder;

#[async_trait]
impl ProxyTranscoder for StubTranscoder {
    async fn transcode(
        &self,
        _input: &Path,
        output_dir: &Path,
    ) -> Result<ProxyArtifacts, ToolError> {
        tokio::fs::create_dir_all(output_dir).await?;
        let proxy = output_dir.join("proxy.mp4");
        tokio::fs::write(&proxy, b"proxy").await?;
        Ok(ProxyArtifacts {
            proxy_path: proxy.to_string_lossy().into_owned(),
            thumbnail_path: None,
        })
    }
}

/// Serve the test app on an ephemeral port and return its base URL.
async fn spawn_manager(app: &helpers::TestApp) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let router = app.router.clone();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

fn client(base_url: &str) -> HttpManagerClient {
    HttpManagerClient::new(base_url, Duration::from_secs(5)).unwrap()
}

#[tokio::test]
async fn test_remote_worker_completes_job() {
    let app = helpers::TestApp::new().await;
    let base_url = spawn_manager(&app).await;
    let subject_id = app.add_subject("clip.mov").await;
    let job_id = app.enqueue(subject_id, json!({ "payload_ref": "clip.mov" })).await;

    let config = WorkerConfig {
        concurrency: 1,
        poll_interval_seconds: 1,
        heartbeat_interval_seconds: 1,
        shutdown_grace_seconds: 5,
        ..WorkerConfig::default()
    };
    let runner = WorkerRunner::new(
        Arc::new(client(&base_url)),
        Arc::new(JobExecutor::new(Arc::new(StubProbe), Arc::new(StubTranscoder))),
        config,
        "remote-1".to_string(),
    );
    let (tx, rx) = watch::channel(false);
    let handle = tokio::spawn(async move { runner.run(rx).await });

    let mut ready = false;
    for _ in 0..200 {
        if app.catalog.status(subject_id).await == Some(SubjectStatus::Ready) {
            ready = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
    tx.send(true).unwrap();
    handle.await.unwrap();

    assert!(ready, "subject never became ready");
    let job = app.manager.find(job_id).await.unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(job.attempts, 1);

    let record = app.catalog.get(subject_id).await.unwrap();
    let result = record.result.unwrap();
    let proxy = result.proxy().unwrap();
    assert!(proxy.proxy_path.contains(&subject_id.to_string()));
    assert!(Path::new(&proxy.proxy_path).exists());
    assert_eq!(result.metadata().unwrap().duration_seconds, Some(8.0));
}

#[tokio::test]
async fn test_http_client_maps_manager_outcomes() {
    let app = helpers::TestApp::new().await;
    let base_url = spawn_manager(&app).await;
    let client = client(&base_url);

    assert!(client.claim("w1").await.unwrap().is_none());

    let subject_id = app.add_subject("clip.mov").await;
    let job_id = app
        .enqueue(subject_id, json!({ "payload_ref": "clip.mov", "job_kind": "metadata" }))
        .await;

    let claim = client.claim("w1").await.unwrap().unwrap();
    assert_eq!(claim.job.id, job_id);

    // Rejections are answers, not errors.
    assert!(!client.heartbeat(job_id, "w2").await.unwrap());
    assert!(client.heartbeat(job_id, "w1").await.unwrap());
    assert!(client.report_progress(job_id, "w1", Some("probing")).await.unwrap());

    let wrong_kind = JobResult::Proxy {
        proxy: ProxyArtifacts {
            proxy_path: "/tmp/p.mp4".to_string(),
            thumbnail_path: None,
        },
    };
    let err = client.complete(job_id, "w1", &wrong_kind).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Validation);

    assert!(client.fail(job_id, "w1", "probe crashed").await.unwrap());
    assert!(!client.fail(job_id, "w1", "again").await.unwrap());

    let job = app.manager.find(job_id).await.unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Pending);
    assert_eq!(job.error_message.as_deref(), Some("probe crashed"));
}

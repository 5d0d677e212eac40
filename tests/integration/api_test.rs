//! Integration tests for the Manager API over in-memory backends.

mod helpers;

use std::time::Duration;

use http::StatusCode;
use serde_json::json;
use sqlx::postgres::PgPoolOptions;
use uuid::Uuid;

use catalog_database::DatabasePool;
use catalog_entity::job::JobStatus;
use catalog_entity::subject::SubjectStatus;

fn full_result(proxy_path: &str) -> serde_json::Value {
    json!({
        "kind": "full",
        "metadata": { "container": "mov", "duration_seconds": 12.5, "width": 1920, "height": 1080 },
        "proxy": { "proxy_path": proxy_path, "thumbnail_path": null },
    })
}

async fn claim(app: &helpers::TestApp, worker_id: &str) -> helpers::TestResponse {
    app.request("POST", "/jobs/claim", Some(json!({ "worker_id": worker_id })))
        .await
}

#[tokio::test]
async fn test_claim_with_empty_queue_returns_null() {
    let app = helpers::TestApp::new().await;

    let response = claim(&app, "w1").await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["success"], json!(true));
    assert!(response.body["data"].is_null());
}

#[tokio::test]
async fn test_full_lifecycle_marks_subject_ready() {
    let app = helpers::TestApp::new().await;
    let subject_id = app.add_subject("clip.mov").await;
    let job_id = app.enqueue(subject_id, json!({ "payload_ref": "clip.mov" })).await;
    assert_eq!(app.catalog.status(subject_id).await, Some(SubjectStatus::Queued));

    let response = claim(&app, "w1").await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["data"]["job"]["id"], json!(job_id.to_string()));
    assert_eq!(response.body["data"]["job"]["attempts"], json!(1));
    assert!(
        response.body["data"]["context"]["source_root"]
            .as_str()
            .unwrap()
            .ends_with("media")
    );

    let response = app
        .request(
            "PUT",
            &format!("/jobs/{job_id}/progress"),
            Some(json!({ "worker_id": "w1", "stage": "probing" })),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["data"]["status"], json!("processing"));
    assert_eq!(app.catalog.status(subject_id).await, Some(SubjectStatus::Generating));

    let response = app
        .request(
            "PUT",
            &format!("/jobs/{job_id}/heartbeat"),
            Some(json!({ "worker_id": "w1" })),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);

    let response = app
        .request(
            "PUT",
            &format!("/jobs/{job_id}/complete"),
            Some(json!({ "worker_id": "w1", "result": full_result("/proxies/clip.mp4") })),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["data"]["status"], json!("completed"));

    let record = app.catalog.get(subject_id).await.unwrap();
    assert_eq!(record.status, SubjectStatus::Ready);
    assert_eq!(
        record.result.unwrap().proxy().unwrap().proxy_path,
        "/proxies/clip.mp4"
    );

    let response = app.request("GET", &format!("/jobs/{job_id}"), None).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["data"]["status"], json!("completed"));
    assert!(response.body["data"]["worker_id"].is_null());
    assert_eq!(response.body["data"]["result"]["kind"], json!("full"));
}

#[tokio::test]
async fn test_calls_from_non_owner_are_rejected() {
    let app = helpers::TestApp::new().await;
    let subject_id = app.add_subject("clip.mov").await;
    let job_id = app.enqueue(subject_id, json!({ "payload_ref": "clip.mov" })).await;
    claim(&app, "w1").await;

    for (path, body) in [
        ("heartbeat", json!({ "worker_id": "w2" })),
        ("progress", json!({ "worker_id": "w2", "stage": "probing" })),
        ("fail", json!({ "worker_id": "w2", "error": "nope" })),
        ("complete", json!({ "worker_id": "w2", "result": full_result("/p.mp4") })),
    ] {
        let response = app
            .request("PUT", &format!("/jobs/{job_id}/{path}"), Some(body))
            .await;
        assert_eq!(response.status, StatusCode::CONFLICT, "{path}");
        assert_eq!(response.body["error"], json!("CONFLICT"));
    }

    let job = app.manager.find(job_id).await.unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Claimed);
    assert_eq!(job.worker_id.as_deref(), Some("w1"));
    assert_eq!(job.attempts, 1);
}

#[tokio::test]
async fn test_result_kind_mismatch_is_rejected_with_400() {
    let app = helpers::TestApp::new().await;
    let subject_id = app.add_subject("clip.mov").await;
    let job_id = app
        .enqueue(subject_id, json!({ "payload_ref": "clip.mov", "job_kind": "proxy" }))
        .await;
    claim(&app, "w1").await;

    let response = app
        .request(
            "PUT",
            &format!("/jobs/{job_id}/complete"),
            Some(json!({ "worker_id": "w1", "result": { "kind": "metadata", "metadata": {} } })),
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["error"], json!("VALIDATION_ERROR"));

    let job = app.manager.find(job_id).await.unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Claimed);
}

#[tokio::test]
async fn test_malformed_result_is_rejected_with_400() {
    let app = helpers::TestApp::new().await;
    let subject_id = app.add_subject("clip.mov").await;
    let job_id = app.enqueue(subject_id, json!({ "payload_ref": "clip.mov" })).await;
    claim(&app, "w1").await;

    let response = app
        .request(
            "PUT",
            &format!("/jobs/{job_id}/complete"),
            Some(json!({ "worker_id": "w1", "result": { "kind": "thumbnail" } })),
        )
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_fail_requeues_until_attempts_exhausted() {
    let app = helpers::TestApp::new().await;
    let subject_id = app.add_subject("clip.mov").await;
    let job_id = app
        .enqueue(subject_id, json!({ "payload_ref": "clip.mov", "max_attempts": 2 }))
        .await;

    claim(&app, "w1").await;
    let response = app
        .request(
            "PUT",
            &format!("/jobs/{job_id}/fail"),
            Some(json!({ "worker_id": "w1", "error": "ffmpeg exited with 1" })),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["data"]["requeued"], json!(true));
    assert_eq!(response.body["data"]["status"], json!("pending"));
    assert_eq!(app.catalog.status(subject_id).await, Some(SubjectStatus::Queued));

    claim(&app, "w2").await;
    let response = app
        .request(
            "PUT",
            &format!("/jobs/{job_id}/fail"),
            Some(json!({ "worker_id": "w2", "error": "ffmpeg exited with 1" })),
        )
        .await;
    assert_eq!(response.body["data"]["requeued"], json!(false));
    assert_eq!(response.body["data"]["status"], json!("failed"));
    assert_eq!(response.body["data"]["attempts"], json!(2));

    let record = app.catalog.get(subject_id).await.unwrap();
    assert_eq!(record.status, SubjectStatus::Failed);
    assert_eq!(record.error.as_deref(), Some("ffmpeg exited with 1"));

    // Terminal jobs absorb further reports.
    let response = app
        .request(
            "PUT",
            &format!("/jobs/{job_id}/fail"),
            Some(json!({ "worker_id": "w2", "error": "again" })),
        )
        .await;
    assert_eq!(response.status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_enqueue_is_idempotent_per_subject() {
    let app = helpers::TestApp::new().await;
    let subject_id = app.add_subject("clip.mov").await;
    app.enqueue(subject_id, json!({ "payload_ref": "clip.mov" })).await;

    let response = app
        .request(
            "POST",
            &format!("/subjects/{subject_id}/enqueue"),
            Some(json!({ "payload_ref": "clip.mov" })),
        )
        .await;

    assert_eq!(response.status, StatusCode::CONFLICT);
    assert_eq!(app.store.snapshot().await.len(), 1);
}

#[tokio::test]
async fn test_request_validation() {
    let app = helpers::TestApp::new().await;
    let subject_id = Uuid::new_v4();

    let cases = [
        ("POST", "/jobs/claim".to_string(), json!({ "worker_id": "" })),
        (
            "POST",
            format!("/subjects/{subject_id}/enqueue"),
            json!({ "payload_ref": "" }),
        ),
        (
            "POST",
            format!("/subjects/{subject_id}/enqueue"),
            json!({ "payload_ref": "a.mov", "max_attempts": 21 }),
        ),
        (
            "PUT",
            format!("/jobs/{}/fail", Uuid::new_v4()),
            json!({ "worker_id": "w1", "error": "" }),
        ),
    ];

    for (method, path, body) in cases {
        let response = app.request(method, &path, Some(body)).await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST, "{method} {path}");
        assert_eq!(response.body["error"], json!("VALIDATION_ERROR"));
    }
    assert!(app.store.snapshot().await.is_empty());
}

#[tokio::test]
async fn test_unresolvable_subject_fails_job_on_claim() {
    let app = helpers::TestApp::new().await;
    let subject_id = Uuid::new_v4();
    app.catalog.insert(subject_id, "lost.mov", None).await;
    let job_id = app.enqueue(subject_id, json!({ "payload_ref": "lost.mov" })).await;

    let response = claim(&app, "w1").await;
    assert_eq!(response.status, StatusCode::OK);
    assert!(response.body["data"].is_null());

    let job = app.manager.find(job_id).await.unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Failed);
    assert_eq!(app.catalog.status(subject_id).await, Some(SubjectStatus::Failed));
}

#[tokio::test]
async fn test_status_reports_queue_depth() {
    let app = helpers::TestApp::new().await;
    for name in ["a.mov", "b.mov"] {
        let subject_id = app.add_subject(name).await;
        app.enqueue(subject_id, json!({ "payload_ref": name })).await;
    }
    claim(&app, "w1").await;

    let response = app.request("GET", "/status", None).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["data"]["status"], json!("ok"));
    assert_eq!(response.body["data"]["database"], json!("not_configured"));
    assert_eq!(response.body["data"]["queue"]["pending"], json!(1));
    assert_eq!(response.body["data"]["queue"]["claimed"], json!(1));
}

#[tokio::test]
async fn test_status_is_503_when_database_unreachable() {
    let pool = PgPoolOptions::new()
        .acquire_timeout(Duration::from_millis(500))
        .connect_lazy("postgres://catalog@127.0.0.1:1/catalog")
        .unwrap();
    let app = helpers::TestApp::with_database(DatabasePool::from_pool(pool)).await;

    let response = app.request("GET", "/status", None).await;

    assert_eq!(response.status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(response.body["error"], json!("SERVICE_UNAVAILABLE"));
}

#[tokio::test]
async fn test_unknown_job_is_404() {
    let app = helpers::TestApp::new().await;

    let response = app
        .request("GET", &format!("/jobs/{}", Uuid::new_v4()), None)
        .await;

    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(response.body["error"], json!("NOT_FOUND"));
}

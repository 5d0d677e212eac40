//! HTTP client for remote workers.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::debug;
use uuid::Uuid;

use catalog_core::error::{AppError, ErrorKind};
use catalog_core::result::AppResult;
use catalog_entity::job::{JobResult, WorkerClaim};

use super::ManagerApi;

/// Success envelope returned by the manager.
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: T,
}

/// Error body returned by the manager.
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: String,
    #[serde(default)]
    message: String,
}

/// Talks to the Manager API over HTTP with `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpManagerClient {
    client: Client,
    base_url: String,
}

impl HttpManagerClient {
    /// Create a client for the manager at `base_url`.
    pub fn new(base_url: &str, request_timeout: Duration) -> AppResult<Self> {
        let client = Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| {
                AppError::with_source(ErrorKind::Internal, "Failed to build HTTP client", e)
            })?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> AppResult<Response> {
        request.send().await.map_err(|e| {
            AppError::with_source(
                ErrorKind::ExternalService,
                format!("Manager request failed: {e}"),
                e,
            )
        })
    }

    /// Send a guarded call; 409 is a rejection, not an error.
    async fn guarded(&self, path: &str, body: serde_json::Value) -> AppResult<bool> {
        let response = self.send(self.client.put(self.url(path)).json(&body)).await?;
        if response.status() == StatusCode::CONFLICT {
            debug!(path = %path, "Manager rejected call");
            return Ok(false);
        }
        if response.status().is_success() {
            return Ok(true);
        }
        Err(error_from(response).await)
    }
}

/// Map a non-success response to an [`AppError`].
async fn error_from(response: Response) -> AppError {
    let status = response.status();
    let body = response.json::<ErrorBody>().await.unwrap_or_default();
    let message = format!(
        "Manager returned {status}: {} {}",
        body.error, body.message
    );
    match status {
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
            AppError::validation(message)
        }
        StatusCode::NOT_FOUND => AppError::not_found(message),
        _ => AppError::external_service(message),
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> AppResult<T> {
    if !response.status().is_success() {
        return Err(error_from(response).await);
    }
    response
        .json::<Envelope<T>>()
        .await
        .map(|envelope| envelope.data)
        .map_err(|e| {
            AppError::with_source(
                ErrorKind::ExternalService,
                format!("Unreadable manager response: {e}"),
                e,
            )
        })
}

#[async_trait]
impl ManagerApi for HttpManagerClient {
    async fn claim(&self, worker_id: &str) -> AppResult<Option<WorkerClaim>> {
        let response = self
            .send(
                self.client
                    .post(self.url("/jobs/claim"))
                    .json(&json!({ "worker_id": worker_id })),
            )
            .await?;
        decode::<Option<WorkerClaim>>(response).await
    }

    async fn report_progress(
        &self,
        job_id: Uuid,
        worker_id: &str,
        stage: Option<&str>,
    ) -> AppResult<bool> {
        self.guarded(
            &format!("/jobs/{job_id}/progress"),
            json!({ "worker_id": worker_id, "stage": stage }),
        )
        .await
    }

    async fn heartbeat(&self, job_id: Uuid, worker_id: &str) -> AppResult<bool> {
        self.guarded(
            &format!("/jobs/{job_id}/heartbeat"),
            json!({ "worker_id": worker_id }),
        )
        .await
    }

    async fn complete(
        &self,
        job_id: Uuid,
        worker_id: &str,
        result: &JobResult,
    ) -> AppResult<bool> {
        self.guarded(
            &format!("/jobs/{job_id}/complete"),
            json!({ "worker_id": worker_id, "result": result }),
        )
        .await
    }

    async fn fail(&self, job_id: Uuid, worker_id: &str, reason: &str) -> AppResult<bool> {
        self.guarded(
            &format!("/jobs/{job_id}/fail"),
            json!({ "worker_id": worker_id, "error": reason }),
        )
        .await
    }
}

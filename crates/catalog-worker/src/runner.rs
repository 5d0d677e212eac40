//! Worker runner: the loop that claims jobs and executes them.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{OwnedSemaphorePermit, Semaphore, watch};
use tokio::task::JoinSet;
use tokio::time;
use tokio_util::sync::CancellationToken;
use tracing;
use uuid::Uuid;

use catalog_core::config::WorkerConfig;
use catalog_core::error::ErrorKind;
use catalog_core::result::AppResult;
use catalog_entity::job::{JobResult, WorkerClaim};

use crate::client::ManagerApi;
use crate::executor::{JobExecutionError, JobExecutor};
use crate::heartbeat::{JobProgress, heartbeat_loop};

/// Initial delay between report retries; doubled after each attempt.
const REPORT_BACKOFF: Duration = Duration::from_millis(500);

/// Main worker runner that claims jobs up to the concurrency limit.
#[derive(Debug)]
pub struct WorkerRunner {
    api: Arc<dyn ManagerApi>,
    executor: Arc<JobExecutor>,
    config: WorkerConfig,
    worker_id: String,
}

/// How a job's execution ended.
enum Outcome {
    Finished(Result<JobResult, JobExecutionError>),
    OwnershipLost,
    Abandoned,
}

impl WorkerRunner {
    /// Create a new worker runner.
    pub fn new(
        api: Arc<dyn ManagerApi>,
        executor: Arc<JobExecutor>,
        config: WorkerConfig,
        worker_id: String,
    ) -> Self {
        Self {
            api,
            executor,
            config,
            worker_id,
        }
    }

    /// Run until the cancel signal is received, then drain in-flight jobs
    /// for up to the shutdown grace period and abandon the rest.
    pub async fn run(&self, mut cancel: watch::Receiver<bool>) {
        tracing::info!(
            "Worker '{}' started with concurrency={}, poll_interval={}s, heartbeat_interval={}s",
            self.worker_id,
            self.config.concurrency,
            self.config.poll_interval_seconds,
            self.config.heartbeat_interval_seconds
        );

        let semaphore = Arc::new(Semaphore::new(self.config.concurrency.max(1)));
        let poll_interval = Duration::from_secs(self.config.poll_interval_seconds);
        let abort = CancellationToken::new();
        let mut tasks = JoinSet::new();

        loop {
            while let Some(joined) = tasks.try_join_next() {
                log_join(joined);
            }

            let permit = tokio::select! {
                biased;
                _ = shutdown_requested(&mut cancel) => break,
                permit = Arc::clone(&semaphore).acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => break,
                },
            };

            match self.api.claim(&self.worker_id).await {
                Ok(Some(claim)) => {
                    tasks.spawn(self.job_task().run(claim, abort.child_token(), permit));
                    continue;
                }
                Ok(None) => tracing::trace!("No pending jobs"),
                Err(e) => tracing::warn!("Worker '{}' failed to claim: {}", self.worker_id, e),
            }
            drop(permit);

            tokio::select! {
                biased;
                _ = shutdown_requested(&mut cancel) => break,
                _ = time::sleep(poll_interval) => {}
            }
        }

        tracing::info!(
            "Worker '{}' stopped claiming; waiting for {} in-flight job(s)",
            self.worker_id,
            tasks.len()
        );

        let grace = Duration::from_secs(self.config.shutdown_grace_seconds);
        if time::timeout(grace, drain(&mut tasks)).await.is_err() {
            tracing::warn!(
                "Worker '{}' grace period elapsed; abandoning {} job(s)",
                self.worker_id,
                tasks.len()
            );
            abort.cancel();
            drain(&mut tasks).await;
        }

        tracing::info!("Worker '{}' shut down complete", self.worker_id);
    }

    fn job_task(&self) -> JobTask {
        JobTask {
            api: Arc::clone(&self.api),
            executor: Arc::clone(&self.executor),
            worker_id: self.worker_id.clone(),
            heartbeat_interval: Duration::from_secs(self.config.heartbeat_interval_seconds),
            report_retries: self.config.report_retries,
        }
    }
}

/// Everything a spawned job needs.
struct JobTask {
    api: Arc<dyn ManagerApi>,
    executor: Arc<JobExecutor>,
    worker_id: String,
    heartbeat_interval: Duration,
    report_retries: u32,
}

impl JobTask {
    async fn run(self, claim: WorkerClaim, abort: CancellationToken, permit: OwnedSemaphorePermit) {
        let _permit = permit;
        let job_id = claim.job.id;
        let lost = CancellationToken::new();

        let heartbeat = tokio::spawn(heartbeat_loop(
            Arc::clone(&self.api),
            job_id,
            self.worker_id.clone(),
            self.heartbeat_interval,
            lost.clone(),
        ));
        let progress = JobProgress::new(
            Arc::clone(&self.api),
            job_id,
            self.worker_id.clone(),
            lost.clone(),
        );

        // Dropping the execution future kills any running tool.
        let outcome = tokio::select! {
            biased;
            _ = lost.cancelled() => Outcome::OwnershipLost,
            _ = abort.cancelled() => Outcome::Abandoned,
            result = self.executor.execute(&claim, &progress) => Outcome::Finished(result),
        };

        lost.cancel();
        let _ = heartbeat.await;

        match outcome {
            Outcome::Finished(Ok(result)) => self.report_completion(job_id, &result).await,
            Outcome::Finished(Err(e)) => {
                tracing::warn!("Job {} failed: {}", job_id, e);
                self.report_failure(job_id, &e.to_string()).await;
            }
            Outcome::OwnershipLost => {
                tracing::warn!("Job {} cancelled: ownership lost", job_id);
            }
            Outcome::Abandoned => {
                tracing::warn!("Job {} abandoned at shutdown", job_id);
            }
        }
    }

    async fn report_completion(&self, job_id: Uuid, result: &JobResult) {
        let outcome = self
            .with_retries(job_id, "completion", || {
                self.api.complete(job_id, &self.worker_id, result)
            })
            .await;

        match outcome {
            Ok(true) => tracing::info!("Job {} completed successfully", job_id),
            Ok(false) => tracing::warn!("Completion of job {} rejected; job is no longer ours", job_id),
            Err(e) if e.kind == ErrorKind::Validation => {
                let reason = format!("result rejected by manager: {}", e.message);
                self.report_failure(job_id, &reason).await;
            }
            Err(e) => tracing::error!(
                "Giving up on completion report for job {}: {}; the reaper will reclaim it",
                job_id,
                e
            ),
        }
    }

    async fn report_failure(&self, job_id: Uuid, reason: &str) {
        let outcome = self
            .with_retries(job_id, "failure", || {
                self.api.fail(job_id, &self.worker_id, reason)
            })
            .await;

        match outcome {
            Ok(true) => tracing::info!("Job {} failure recorded", job_id),
            Ok(false) => tracing::warn!("Failure of job {} rejected; job is no longer ours", job_id),
            Err(e) => tracing::error!(
                "Giving up on failure report for job {}: {}; the reaper will reclaim it",
                job_id,
                e
            ),
        }
    }

    /// Retry `call` on communication failures with exponential backoff.
    async fn with_retries<F, Fut>(&self, job_id: Uuid, what: &str, mut call: F) -> AppResult<bool>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = AppResult<bool>>,
    {
        let mut delay = REPORT_BACKOFF;
        let mut attempt = 0;
        loop {
            match call().await {
                Err(e) if e.is_transient() && attempt < self.report_retries => {
                    attempt += 1;
                    tracing::warn!(
                        "Reporting {} of job {} failed (attempt {}/{}): {}",
                        what,
                        job_id,
                        attempt,
                        self.report_retries,
                        e
                    );
                    time::sleep(delay).await;
                    delay *= 2;
                }
                other => return other,
            }
        }
    }
}

async fn shutdown_requested(cancel: &mut watch::Receiver<bool>) {
    // A dropped sender also stops the worker.
    let _ = cancel.wait_for(|stop| *stop).await;
}

async fn drain(tasks: &mut JoinSet<()>) {
    while let Some(joined) = tasks.join_next().await {
        log_join(joined);
    }
}

fn log_join(joined: Result<(), tokio::task::JoinError>) {
    if let Err(e) = joined {
        tracing::error!("Job task panicked: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    use async_trait::async_trait;
    use chrono::TimeDelta;

    use catalog_core::error::AppError;
    use catalog_entity::job::{
        CreateJob, ExecutionContext, JobKind, JobStatus, MediaMetadata, ProxyArtifacts,
    };
    use catalog_queue::{JobManager, JobStore, MemoryJobStore, MemorySubjectCatalog};

    use super::*;
    use crate::client::LocalManagerClient;
    use crate::executor::tests::{FakeProbe, FakeTranscoder};
    use crate::tools::{MediaProbe, ProxyTranscoder, ToolError};

    /// Counts terminal reports passing through to the local client.
    #[derive(Debug)]
    struct CountingApi {
        inner: LocalManagerClient,
        completes: AtomicUsize,
        fails: AtomicUsize,
        /// Completions answered with a database error before delegating.
        complete_outages: AtomicUsize,
    }

    #[async_trait]
    impl ManagerApi for CountingApi {
        async fn claim(&self, worker_id: &str) -> AppResult<Option<WorkerClaim>> {
            self.inner.claim(worker_id).await
        }

        async fn report_progress(
            &self,
            job_id: Uuid,
            worker_id: &str,
            stage: Option<&str>,
        ) -> AppResult<bool> {
            self.inner.report_progress(job_id, worker_id, stage).await
        }

        async fn heartbeat(&self, job_id: Uuid, worker_id: &str) -> AppResult<bool> {
            self.inner.heartbeat(job_id, worker_id).await
        }

        async fn complete(
            &self,
            job_id: Uuid,
            worker_id: &str,
            result: &JobResult,
        ) -> AppResult<bool> {
            self.completes.fetch_add(1, Ordering::SeqCst);
            let outage = self
                .complete_outages
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok();
            if outage {
                return Err(AppError::database("connection reset"));
            }
            self.inner.complete(job_id, worker_id, result).await
        }

        async fn fail(&self, job_id: Uuid, worker_id: &str, reason: &str) -> AppResult<bool> {
            self.fails.fetch_add(1, Ordering::SeqCst);
            self.inner.fail(job_id, worker_id, reason).await
        }
    }

    /// Probe that never finishes and records when it is dropped.
    #[derive(Debug, Default)]
    struct HangingProbe {
        started: Arc<AtomicBool>,
        dropped: Arc<AtomicBool>,
    }

    struct DropFlag(Arc<AtomicBool>);

    impl Drop for DropFlag {
        fn drop(&mut self) {
            self.0.store(true, Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl MediaProbe for HangingProbe {
        async fn probe(&self, _input: &Path) -> Result<MediaMetadata, ToolError> {
            let _flag = DropFlag(Arc::clone(&self.dropped));
            self.started.store(true, Ordering::SeqCst);
            std::future::pending::<()>().await;
            Ok(MediaMetadata::default())
        }
    }

    struct Harness {
        store: MemoryJobStore,
        manager: Arc<JobManager>,
        api: Arc<CountingApi>,
        _dir: tempfile::TempDir,
        subject_id: Uuid,
    }

    async fn harness() -> Harness {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("media")).unwrap();
        std::fs::write(dir.path().join("media/a.mov"), b"x").unwrap();

        let store = MemoryJobStore::new();
        let catalog = MemorySubjectCatalog::new();
        let subject_id = Uuid::new_v4();
        catalog
            .insert(
                subject_id,
                "a.mov",
                Some(ExecutionContext {
                    source_root: dir.path().join("media").to_string_lossy().into_owned(),
                    output_root: dir.path().join("proxies").to_string_lossy().into_owned(),
                }),
            )
            .await;
        let manager = Arc::new(JobManager::new(
            Arc::new(store.clone()),
            Arc::new(catalog),
        ));
        manager
            .enqueue(CreateJob {
                subject_id,
                payload_ref: "a.mov".to_string(),
                job_kind: JobKind::Full,
                max_attempts: 3,
            })
            .await
            .unwrap();
        let api = Arc::new(CountingApi {
            inner: LocalManagerClient::new(Arc::clone(&manager)),
            completes: AtomicUsize::new(0),
            fails: AtomicUsize::new(0),
            complete_outages: AtomicUsize::new(0),
        });
        Harness {
            store,
            manager,
            api,
            _dir: dir,
            subject_id,
        }
    }

    fn config(shutdown_grace_seconds: u64) -> WorkerConfig {
        WorkerConfig {
            concurrency: 2,
            poll_interval_seconds: 1,
            heartbeat_interval_seconds: 1,
            shutdown_grace_seconds,
            ..WorkerConfig::default()
        }
    }

    async fn wait_until<F, Fut>(mut check: F)
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = bool>,
    {
        for _ in 0..200 {
            if check().await {
                return;
            }
            time::sleep(Duration::from_millis(25)).await;
        }
        panic!("condition not reached in time");
    }

    #[tokio::test]
    async fn test_runs_job_to_completion() {
        let h = harness().await;
        let executor = JobExecutor::new(Arc::new(FakeProbe), Arc::new(FakeTranscoder));
        let runner = WorkerRunner::new(h.api.clone(), Arc::new(executor), config(5), "w1".into());
        let (tx, rx) = watch::channel(false);
        let handle = tokio::spawn(async move { runner.run(rx).await });

        let store = h.store.clone();
        wait_until(|| {
            let store = store.clone();
            async move { store.queue_depth().await.unwrap().completed == 1 }
        })
        .await;

        tx.send(true).unwrap();
        handle.await.unwrap();

        let job = &h.store.snapshot().await[0];
        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(job.subject_id, h.subject_id);
        assert_eq!(h.api.completes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_completion_is_retried_after_database_error() {
        let h = harness().await;
        h.api.complete_outages.store(1, Ordering::SeqCst);
        let executor = JobExecutor::new(Arc::new(FakeProbe), Arc::new(FakeTranscoder));
        let runner = WorkerRunner::new(h.api.clone(), Arc::new(executor), config(5), "w1".into());
        let (tx, rx) = watch::channel(false);
        let handle = tokio::spawn(async move { runner.run(rx).await });

        let store = h.store.clone();
        wait_until(|| {
            let store = store.clone();
            async move { store.queue_depth().await.unwrap().completed == 1 }
        })
        .await;

        tx.send(true).unwrap();
        handle.await.unwrap();

        assert_eq!(h.api.completes.load(Ordering::SeqCst), 2);
        assert_eq!(h.api.fails.load(Ordering::SeqCst), 0);
        assert_eq!(h.store.snapshot().await[0].attempts, 1);
    }

    #[tokio::test]
    async fn test_rejected_heartbeat_aborts_tool_without_reporting() {
        let h = harness().await;
        let probe = HangingProbe::default();
        let started = Arc::clone(&probe.started);
        let dropped = Arc::clone(&probe.dropped);
        let executor = JobExecutor::new(Arc::new(probe), Arc::new(FakeTranscoder));
        let runner = WorkerRunner::new(h.api.clone(), Arc::new(executor), config(5), "w1".into());
        let (tx, rx) = watch::channel(false);
        let handle = tokio::spawn(async move { runner.run(rx).await });

        wait_until(|| {
            let started = Arc::clone(&started);
            async move { started.load(Ordering::SeqCst) }
        })
        .await;
        tx.send(true).unwrap();

        // Reap the job out from under the worker.
        h.store.advance_clock(TimeDelta::seconds(600)).await;
        assert_eq!(h.manager.expire_stale(Duration::from_secs(300)).await.unwrap(), 1);

        wait_until(|| {
            let dropped = Arc::clone(&dropped);
            async move { dropped.load(Ordering::SeqCst) }
        })
        .await;
        handle.await.unwrap();

        assert_eq!(h.api.completes.load(Ordering::SeqCst), 0);
        assert_eq!(h.api.fails.load(Ordering::SeqCst), 0);
        let job = &h.store.snapshot().await[0];
        assert_eq!(job.status, JobStatus::Pending);
        assert_eq!(job.attempts, 1);
    }

    #[tokio::test]
    async fn test_shutdown_grace_abandons_in_flight_job() {
        let h = harness().await;
        let probe = HangingProbe::default();
        let started = Arc::clone(&probe.started);
        let dropped = Arc::clone(&probe.dropped);
        let executor = JobExecutor::new(Arc::new(probe), Arc::new(FakeTranscoder));
        let runner = WorkerRunner::new(h.api.clone(), Arc::new(executor), config(0), "w1".into());
        let (tx, rx) = watch::channel(false);
        let handle = tokio::spawn(async move { runner.run(rx).await });

        wait_until(|| {
            let started = Arc::clone(&started);
            async move { started.load(Ordering::SeqCst) }
        })
        .await;
        tx.send(true).unwrap();
        handle.await.unwrap();

        assert!(dropped.load(Ordering::SeqCst));
        assert_eq!(h.api.completes.load(Ordering::SeqCst) + h.api.fails.load(Ordering::SeqCst), 0);
        let job = &h.store.snapshot().await[0];
        assert_eq!(job.status, JobStatus::Processing);
        assert_eq!(job.worker_id.as_deref(), Some("w1"));
    }

    #[tokio::test]
    async fn test_execution_error_is_reported_as_failure() {
        #[derive(Debug)]
        struct BrokenTranscoder;

        #[async_trait]
        impl ProxyTranscoder for BrokenTranscoder {
            async fn transcode(
                &self,
                _input: &Path,
                _output_dir: &Path,
            ) -> Result<ProxyArtifacts, ToolError> {
                Err(ToolError::ProcessFailed {
                    tool: "ffmpeg".to_string(),
                    code: 1,
                    stderr: "Invalid data found when processing input".to_string(),
                })
            }
        }

        let h = harness().await;
        let executor = JobExecutor::new(Arc::new(FakeProbe), Arc::new(BrokenTranscoder));
        let runner = WorkerRunner::new(h.api.clone(), Arc::new(executor), config(5), "w1".into());
        let (tx, rx) = watch::channel(false);
        let handle = tokio::spawn(async move { runner.run(rx).await });

        // Each failure is retried until the attempt ceiling.
        let store = h.store.clone();
        wait_until(|| {
            let store = store.clone();
            async move { store.queue_depth().await.unwrap().failed == 1 }
        })
        .await;
        tx.send(true).unwrap();
        handle.await.unwrap();

        let job = h.manager.find(h.store.snapshot().await[0].id).await.unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!(job.attempts, 3);
        assert!(job.error_message.unwrap().contains("Invalid data found"));
        assert_eq!(h.api.fails.load(Ordering::SeqCst), 3);
    }
}

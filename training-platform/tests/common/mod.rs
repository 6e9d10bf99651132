#![allow(dead_code)]

use async_trait::async_trait;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use tokio::task::JoinHandle;
use tokio::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

use veriscan_common::types::{EvaluationMetrics, Hyperparameters};
use veriscan_training::config::TrainingConfig;
use veriscan_training::models::{CreateTrainingJobRequest, JobType, TrainingJob, TrainingStatus};
use veriscan_training::services::{
    CancellationRegistry, ModelRegistryService, ProgressNotifier, TrainingJobControl,
    TrainingJobService, TrainingWorker,
};
use veriscan_training::storage::FileStorage;
use veriscan_training::trainer::{ProgressCallback, Trainer, TrainingOutcome, TrainingRun};

pub async fn memory_pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("in-memory database");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("migrations");

    pool
}

pub fn test_training_config() -> TrainingConfig {
    TrainingConfig {
        max_concurrent_jobs: 8,
        ..TrainingConfig::default()
    }
}

pub struct TestContext {
    pub pool: SqlitePool,
    pub jobs: Arc<TrainingJobService>,
    pub registry: Arc<ModelRegistryService>,
    pub cancellations: Arc<CancellationRegistry>,
    pub file_storage: Arc<FileStorage>,
    pub data_dir: TempDir,
    pub models_dir: TempDir,
}

pub async fn test_context() -> TestContext {
    test_context_with(test_training_config()).await
}

pub async fn test_context_with(config: TrainingConfig) -> TestContext {
    let pool = memory_pool().await;

    let data_dir = TempDir::new().expect("data dir");
    std::fs::write(data_dir.path().join("sample-0001.png"), b"not a real image")
        .expect("seed sample");

    let models_dir = TempDir::new().expect("models dir");
    let file_storage = Arc::new(FileStorage::new(models_dir.path().to_path_buf()));
    let cancellations = Arc::new(CancellationRegistry::new());

    let jobs = Arc::new(TrainingJobService::new(
        pool.clone(),
        config,
        file_storage.clone(),
        cancellations.clone(),
    ));
    let registry = Arc::new(ModelRegistryService::new(pool.clone()));

    TestContext {
        pool,
        jobs,
        registry,
        cancellations,
        file_storage,
        data_dir,
        models_dir,
    }
}

pub fn small_hyperparameters() -> Hyperparameters {
    Hyperparameters {
        learning_rate: 0.01,
        epochs: 1,
        batch_size: 4,
        validation_split: Some(0.1),
    }
}

pub fn sample_request(ctx: &TestContext) -> CreateTrainingJobRequest {
    CreateTrainingJobRequest {
        job_type: JobType::Full,
        base_model_version_id: None,
        parent_job_id: None,
        training_root_dir: ctx.data_dir.path().to_string_lossy().into_owned(),
        output_model_dir: None,
        hyperparameters: Some(small_hyperparameters()),
        augmentation: None,
        class_balancing: None,
    }
}

pub fn fixed_metrics() -> EvaluationMetrics {
    EvaluationMetrics {
        accuracy: 0.96,
        precision: 0.95,
        recall: 0.94,
        f1_score: 0.945,
        evaluated_samples: 800,
    }
}

pub async fn wait_for_status(
    jobs: &Arc<TrainingJobService>,
    job_id: &str,
    expected: TrainingStatus,
    timeout: Duration,
) -> TrainingJob {
    let deadline = Instant::now() + timeout;

    loop {
        if let Some(job) = jobs.get_status(job_id).await.expect("status query") {
            if job.status == expected {
                return job;
            }
            assert!(
                !job.status.is_terminal(),
                "job {} ended in {:?} ({:?}) while waiting for {:?}",
                job_id,
                job.status,
                job.error_message,
                expected
            );
        }

        assert!(
            Instant::now() < deadline,
            "timed out waiting for job {} to reach {:?}",
            job_id,
            expected
        );
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}

pub struct WorkerHarness {
    pub ctx: TestContext,
    pub notifier: Arc<ProgressNotifier>,
    pub shutdown: CancellationToken,
    pub worker_handle: JoinHandle<()>,
}

pub async fn spawn_worker(trainer: Arc<dyn Trainer>, poll_interval: Duration) -> WorkerHarness {
    let ctx = test_context().await;
    spawn_worker_on(ctx, trainer, poll_interval).await
}

pub async fn spawn_worker_on(
    ctx: TestContext,
    trainer: Arc<dyn Trainer>,
    poll_interval: Duration,
) -> WorkerHarness {
    let notifier = Arc::new(ProgressNotifier::new(
        ctx.jobs.clone() as Arc<dyn TrainingJobControl>,
        64,
    ));
    let shutdown = CancellationToken::new();

    let worker = TrainingWorker::new(
        ctx.jobs.clone() as Arc<dyn TrainingJobControl>,
        ctx.registry.clone(),
        notifier.clone(),
        trainer,
        ctx.file_storage.clone(),
        ctx.cancellations.clone(),
        poll_interval,
        shutdown.child_token(),
    );

    let worker_handle = tokio::spawn(async move {
        worker.start().await;
    });

    WorkerHarness {
        ctx,
        notifier,
        shutdown,
        worker_handle,
    }
}

/// Trainer double that reports full progress, then returns a fixed model and
/// metrics. Start/end events and the runs it received are recorded for
/// ordering assertions.
pub struct StubTrainer {
    pub model_path: PathBuf,
    pub metrics: EvaluationMetrics,
    pub delay: Duration,
    pub events: Arc<Mutex<Vec<(String, &'static str)>>>,
    pub runs: Arc<Mutex<Vec<TrainingRun>>>,
}

impl StubTrainer {
    pub fn new(delay: Duration) -> Self {
        Self {
            model_path: PathBuf::from("/tmp/veriscan-test/model.onnx"),
            metrics: fixed_metrics(),
            delay,
            events: Arc::new(Mutex::new(Vec::new())),
            runs: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

#[async_trait]
impl Trainer for StubTrainer {
    async fn train(
        &self,
        run: &TrainingRun,
        on_progress: ProgressCallback,
        _cancel: CancellationToken,
    ) -> anyhow::Result<TrainingOutcome> {
        self.events
            .lock()
            .unwrap()
            .push((run.job_id.clone(), "start"));
        self.runs.lock().unwrap().push(run.clone());

        tokio::time::sleep(self.delay).await;
        on_progress(1.0, Some("epoch 1/1".to_string()));

        self.events.lock().unwrap().push((run.job_id.clone(), "end"));

        Ok(TrainingOutcome {
            model_path: self.model_path.clone(),
            metrics: self.metrics.clone(),
        })
    }
}

/// Trainer double that fails every run.
pub struct FailingTrainer;

#[async_trait]
impl Trainer for FailingTrainer {
    async fn train(
        &self,
        _run: &TrainingRun,
        _on_progress: ProgressCallback,
        _cancel: CancellationToken,
    ) -> anyhow::Result<TrainingOutcome> {
        Err(anyhow::anyhow!("synthetic trainer failure"))
    }
}

/// Trainer double that trains forever until cancelled.
pub struct BlockingTrainer;

#[async_trait]
impl Trainer for BlockingTrainer {
    async fn train(
        &self,
        run: &TrainingRun,
        on_progress: ProgressCallback,
        cancel: CancellationToken,
    ) -> anyhow::Result<TrainingOutcome> {
        on_progress(0.1, Some(format!("warming up {}", run.job_id)));
        cancel.cancelled().await;

        Err(anyhow::anyhow!("training cancelled"))
    }
}

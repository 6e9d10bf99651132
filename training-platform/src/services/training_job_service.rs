use async_trait::async_trait;
use chrono::Utc;
use sqlx::sqlite::SqlitePool;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tracing::{error, info, warn};
use validator::Validate;

use veriscan_common::types::{EvaluationMetrics, Hyperparameters};
use veriscan_common::utils::{directory_has_entries, generate_unique_id};

use crate::config::TrainingConfig;
use crate::error::{PlatformError, Result};
use crate::models::{
    CreateTrainingJobRequest, JobType, TrainingJob, TrainingJobStats, TrainingJobSummary,
    TrainingStatus,
};
use crate::services::cancellation::CancellationRegistry;
use crate::storage::FileStorage;

/// Work item handed from the in-memory queue to the worker.
#[derive(Debug, Clone)]
pub struct QueuedJob {
    pub job_id: String,
    pub job_type: JobType,
    pub base_model_version_id: Option<String>,
    pub training_root_dir: String,
    pub output_model_dir: String,
    pub hyperparameters: Hyperparameters,
    pub augmentation: Option<serde_json::Value>,
    pub class_balancing: Option<serde_json::Value>,
}

/// The queue-consumer capability the worker is built against. Transition
/// calls log anomalies instead of returning errors so a reporting hiccup can
/// never abort a training run.
#[async_trait]
pub trait TrainingJobControl: Send + Sync {
    async fn try_dequeue_job(&self) -> Option<QueuedJob>;
    async fn job_status(&self, job_id: &str) -> Option<TrainingStatus>;
    async fn update_job_to_running(&self, job_id: &str);
    async fn update_job_progress(&self, job_id: &str, progress: f32);
    async fn update_job_to_completed(&self, job_id: &str, metrics: &EvaluationMetrics);
    async fn update_job_to_failed(&self, job_id: &str, reason: &str);
}

/// Accepts new training jobs and owns the in-memory queue. Exactly one
/// worker drains the queue through [`TrainingJobControl`].
pub struct TrainingJobService {
    db_pool: SqlitePool,
    config: TrainingConfig,
    file_storage: Arc<FileStorage>,
    cancellations: Arc<CancellationRegistry>,
    queue_tx: mpsc::UnboundedSender<QueuedJob>,
    queue_rx: Mutex<mpsc::UnboundedReceiver<QueuedJob>>,
}

impl TrainingJobService {
    pub fn new(
        db_pool: SqlitePool,
        config: TrainingConfig,
        file_storage: Arc<FileStorage>,
        cancellations: Arc<CancellationRegistry>,
    ) -> Self {
        let (queue_tx, queue_rx) = mpsc::unbounded_channel();

        Self {
            db_pool,
            config,
            file_storage,
            cancellations,
            queue_tx,
            queue_rx: Mutex::new(queue_rx),
        }
    }

    /// Validates the request, persists a queued job row and enqueues it for
    /// the worker. Returns the new job id.
    pub async fn start_training(&self, request: CreateTrainingJobRequest) -> Result<String> {
        request.validate()?;

        let hyperparameters = request
            .hyperparameters
            .clone()
            .unwrap_or_else(|| self.config.default_hyperparameters.clone());

        if hyperparameters.learning_rate <= 0.0 {
            return Err(PlatformError::Validation(
                "learning_rate must be greater than zero".to_string(),
            ));
        }

        match request.job_type {
            JobType::Incremental | JobType::TransferLearning => {
                if request.base_model_version_id.is_none() {
                    return Err(PlatformError::Validation(format!(
                        "{:?} training requires base_model_version_id",
                        request.job_type
                    )));
                }
            }
            JobType::Full => {
                if request.base_model_version_id.is_some() {
                    return Err(PlatformError::Validation(
                        "full training does not take base_model_version_id".to_string(),
                    ));
                }
            }
        }

        let training_root = Path::new(&request.training_root_dir);
        if !training_root.is_dir() {
            return Err(PlatformError::DirectoryNotFound(
                request.training_root_dir.clone(),
            ));
        }
        if !directory_has_entries(training_root)? {
            return Err(PlatformError::Validation(format!(
                "training root directory {} is empty",
                request.training_root_dir
            )));
        }

        let active = self.count_active_jobs().await?;
        if active >= i64::from(self.config.max_concurrent_jobs) {
            return Err(PlatformError::StateConflict(format!(
                "training queue is full: {} of {} jobs active",
                active, self.config.max_concurrent_jobs
            )));
        }

        let job_id = generate_unique_id();
        let output_model_dir = request.output_model_dir.clone().unwrap_or_else(|| {
            self.file_storage
                .job_output_dir(&job_id)
                .to_string_lossy()
                .into_owned()
        });

        let now = Utc::now();
        sqlx::query(
            r#"
            INSERT INTO training_jobs (
                id, job_type, base_model_version_id, parent_job_id,
                training_root_dir, output_model_dir,
                learning_rate, epochs, batch_size, validation_split,
                augmentation, class_balancing,
                status, progress, started_at, created_at, updated_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 0, ?, ?, ?)
            "#,
        )
        .bind(&job_id)
        .bind(request.job_type)
        .bind(&request.base_model_version_id)
        .bind(&request.parent_job_id)
        .bind(&request.training_root_dir)
        .bind(&output_model_dir)
        .bind(hyperparameters.learning_rate)
        .bind(i64::from(hyperparameters.epochs))
        .bind(i64::from(hyperparameters.batch_size))
        .bind(hyperparameters.validation_split.map(f64::from))
        .bind(&request.augmentation)
        .bind(&request.class_balancing)
        .bind(TrainingStatus::Queued)
        .bind(now)
        .bind(now)
        .bind(now)
        .execute(&self.db_pool)
        .await?;

        let queued = QueuedJob {
            job_id: job_id.clone(),
            job_type: request.job_type,
            base_model_version_id: request.base_model_version_id,
            training_root_dir: request.training_root_dir,
            output_model_dir,
            hyperparameters,
            augmentation: request.augmentation,
            class_balancing: request.class_balancing,
        };

        if self.queue_tx.send(queued).is_err() {
            // The worker end of the queue is gone; the persisted row stays
            // queued until an operator restarts the service.
            error!("job {} persisted but could not be enqueued", job_id);
        }

        info!("job {} queued ({:?})", job_id, request.job_type);

        Ok(job_id)
    }

    pub async fn get_status(&self, job_id: &str) -> Result<Option<TrainingJob>> {
        self.fetch_job(job_id).await
    }

    pub async fn get_all_jobs(&self) -> Result<Vec<TrainingJob>> {
        let jobs = sqlx::query_as::<_, TrainingJob>(
            r#"
            SELECT * FROM training_jobs
            ORDER BY created_at DESC
            "#,
        )
        .fetch_all(&self.db_pool)
        .await?;

        Ok(jobs)
    }

    pub async fn get_job_stats(&self) -> Result<TrainingJobStats> {
        let stats = sqlx::query_as::<_, TrainingJobStats>(
            r#"
            SELECT
                COUNT(*) as total,
                COUNT(*) FILTER (WHERE status = 'queued') as queued,
                COUNT(*) FILTER (WHERE status = 'running') as running,
                COUNT(*) FILTER (WHERE status = 'completed') as completed,
                COUNT(*) FILTER (WHERE status = 'failed') as failed,
                COUNT(*) FILTER (WHERE status = 'cancelled') as cancelled
            FROM training_jobs
            "#,
        )
        .fetch_one(&self.db_pool)
        .await?;

        Ok(stats)
    }

    pub async fn get_job_summaries(&self, limit: Option<i64>) -> Result<Vec<TrainingJobSummary>> {
        let summaries = sqlx::query_as::<_, TrainingJobSummary>(
            r#"
            SELECT id, job_type, status, progress, started_at, completed_at
            FROM training_jobs
            ORDER BY created_at DESC
            LIMIT ?
            "#,
        )
        .bind(limit.unwrap_or(50))
        .fetch_all(&self.db_pool)
        .await?;

        Ok(summaries)
    }

    /// Cancels a job. Queued jobs move straight to cancelled; the currently
    /// running job gets its cancellation token fired and the worker records
    /// the outcome. Returns whether anything was cancelled.
    pub async fn cancel_training(&self, job_id: &str) -> Result<bool> {
        let job = self
            .fetch_job(job_id)
            .await?
            .ok_or_else(|| PlatformError::NotFound(format!("training job {}", job_id)))?;

        match job.status {
            TrainingStatus::Queued => {
                let now = Utc::now();
                let cancelled = sqlx::query(
                    r#"
                    UPDATE training_jobs
                    SET status = 'cancelled', error_message = ?, progress = 0,
                        completed_at = ?, updated_at = ?
                    WHERE id = ? AND status = 'queued'
                    "#,
                )
                .bind("cancelled before start")
                .bind(now)
                .bind(now)
                .bind(job_id)
                .execute(&self.db_pool)
                .await?
                .rows_affected();

                if cancelled > 0 {
                    info!("queued job {} cancelled", job_id);
                }
                Ok(cancelled > 0)
            }
            TrainingStatus::Running => Ok(self.cancellations.cancel(job_id)),
            status => {
                warn!(
                    "cannot cancel job {}: already in terminal state {:?}",
                    job_id, status
                );
                Ok(false)
            }
        }
    }

    async fn fetch_job(&self, job_id: &str) -> Result<Option<TrainingJob>> {
        let job = sqlx::query_as::<_, TrainingJob>(
            r#"
            SELECT * FROM training_jobs WHERE id = ?
            "#,
        )
        .bind(job_id)
        .fetch_optional(&self.db_pool)
        .await?;

        Ok(job)
    }

    async fn count_active_jobs(&self) -> Result<i64> {
        let (count,): (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*) FROM training_jobs WHERE status IN ('queued', 'running')
            "#,
        )
        .fetch_one(&self.db_pool)
        .await?;

        Ok(count)
    }

    async fn mark_running(&self, job_id: &str) -> Result<()> {
        let updated = sqlx::query(
            r#"
            UPDATE training_jobs
            SET status = 'running', updated_at = ?
            WHERE id = ? AND status = 'queued'
            "#,
        )
        .bind(Utc::now())
        .bind(job_id)
        .execute(&self.db_pool)
        .await?
        .rows_affected();

        if updated == 0 {
            warn!("job {} was not queued when marked running", job_id);
        }

        Ok(())
    }

    async fn record_progress(&self, job_id: &str, progress: f32) -> Result<()> {
        let progress = progress.clamp(0.0, 1.0);

        let job = match self.fetch_job(job_id).await? {
            Some(job) => job,
            None => {
                warn!("progress report for unknown job {}", job_id);
                return Ok(());
            }
        };

        if job.status != TrainingStatus::Running {
            warn!(
                "progress report for job {} in state {:?}",
                job_id, job.status
            );
        }
        if progress < job.progress {
            warn!(
                "progress for job {} went backwards: {} -> {}",
                job_id, job.progress, progress
            );
        }

        sqlx::query(
            r#"
            UPDATE training_jobs SET progress = ?, updated_at = ? WHERE id = ?
            "#,
        )
        .bind(progress)
        .bind(Utc::now())
        .bind(job_id)
        .execute(&self.db_pool)
        .await?;

        Ok(())
    }

    async fn mark_completed(&self, job_id: &str, metrics: &EvaluationMetrics) -> Result<()> {
        let metrics_json = serde_json::to_value(metrics)?;
        let now = Utc::now();

        let updated = sqlx::query(
            r#"
            UPDATE training_jobs
            SET status = 'completed', progress = 1.0, evaluation_metrics = ?,
                error_message = NULL, completed_at = ?, updated_at = ?
            WHERE id = ? AND status IN ('queued', 'running')
            "#,
        )
        .bind(metrics_json)
        .bind(now)
        .bind(now)
        .bind(job_id)
        .execute(&self.db_pool)
        .await?
        .rows_affected();

        if updated == 0 {
            warn!(
                "completion report for job {} ignored: job already terminal",
                job_id
            );
        } else {
            info!("job {} completed", job_id);
        }

        Ok(())
    }

    async fn mark_failed(&self, job_id: &str, reason: &str) -> Result<()> {
        let now = Utc::now();

        let updated = sqlx::query(
            r#"
            UPDATE training_jobs
            SET status = 'failed', error_message = ?, completed_at = ?, updated_at = ?
            WHERE id = ? AND status IN ('queued', 'running')
            "#,
        )
        .bind(reason)
        .bind(now)
        .bind(now)
        .bind(job_id)
        .execute(&self.db_pool)
        .await?
        .rows_affected();

        if updated == 0 {
            warn!(
                "failure report for job {} ignored: job already terminal",
                job_id
            );
        } else {
            info!("job {} failed: {}", job_id, reason);
        }

        Ok(())
    }
}

#[async_trait]
impl TrainingJobControl for TrainingJobService {
    async fn try_dequeue_job(&self) -> Option<QueuedJob> {
        self.queue_rx.lock().await.try_recv().ok()
    }

    async fn job_status(&self, job_id: &str) -> Option<TrainingStatus> {
        match self.fetch_job(job_id).await {
            Ok(job) => job.map(|job| job.status),
            Err(e) => {
                error!("could not read status of job {}: {}", job_id, e);
                None
            }
        }
    }

    async fn update_job_to_running(&self, job_id: &str) {
        if let Err(e) = self.mark_running(job_id).await {
            error!("could not mark job {} running: {}", job_id, e);
        }
    }

    async fn update_job_progress(&self, job_id: &str, progress: f32) {
        if let Err(e) = self.record_progress(job_id, progress).await {
            error!("could not record progress for job {}: {}", job_id, e);
        }
    }

    async fn update_job_to_completed(&self, job_id: &str, metrics: &EvaluationMetrics) {
        if let Err(e) = self.mark_completed(job_id, metrics).await {
            error!("could not mark job {} completed: {}", job_id, e);
        }
    }

    async fn update_job_to_failed(&self, job_id: &str, reason: &str) {
        if let Err(e) = self.mark_failed(job_id, reason).await {
            error!("could not mark job {} failed: {}", job_id, e);
        }
    }
}

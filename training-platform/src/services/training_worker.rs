use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::time::{self, Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use veriscan_common::utils::format_duration;

use crate::error::{PlatformError, Result};
use crate::models::{CreateModelVersionRequest, TrainingStatus};
use crate::services::cancellation::CancellationRegistry;
use crate::services::model_registry_service::ModelRegistryService;
use crate::services::progress_notifier::ProgressNotifier;
use crate::services::training_job_service::{QueuedJob, TrainingJobControl};
use crate::storage::FileStorage;
use crate::trainer::{ProgressCallback, Trainer, TrainingOutcome, TrainingRun};

/// Single consumer of the job queue. Drives one job at a time through
/// running into a terminal state; a failing job never stops the loop, only
/// cancelling the worker's own lifetime does.
pub struct TrainingWorker {
    jobs: Arc<dyn TrainingJobControl>,
    registry: Arc<ModelRegistryService>,
    notifier: Arc<ProgressNotifier>,
    trainer: Arc<dyn Trainer>,
    file_storage: Arc<FileStorage>,
    cancellations: Arc<CancellationRegistry>,
    poll_interval: Duration,
    shutdown: CancellationToken,
}

impl TrainingWorker {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        jobs: Arc<dyn TrainingJobControl>,
        registry: Arc<ModelRegistryService>,
        notifier: Arc<ProgressNotifier>,
        trainer: Arc<dyn Trainer>,
        file_storage: Arc<FileStorage>,
        cancellations: Arc<CancellationRegistry>,
        poll_interval: Duration,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            jobs,
            registry,
            notifier,
            trainer,
            file_storage,
            cancellations,
            poll_interval,
            shutdown,
        }
    }

    pub async fn start(&self) {
        info!(
            "starting training worker with poll interval {:?}",
            self.poll_interval
        );

        loop {
            if self.shutdown.is_cancelled() {
                break;
            }

            match self.jobs.try_dequeue_job().await {
                Some(job) => self.run_job(job).await,
                None => {
                    tokio::select! {
                        _ = self.shutdown.cancelled() => break,
                        _ = time::sleep(self.poll_interval) => {}
                    }
                }
            }
        }

        info!("training worker stopped");
    }

    async fn run_job(&self, job: QueuedJob) {
        let job_id = job.job_id.clone();

        // Jobs cancelled while queued are skipped, not executed.
        match self.jobs.job_status(&job_id).await {
            Some(TrainingStatus::Queued) => {}
            Some(status) => {
                warn!("skipping job {}: status is {:?} at pickup", job_id, status);
                return;
            }
            None => {
                warn!("skipping job {}: no longer present in the store", job_id);
                return;
            }
        }

        let run = match self.prepare_run(&job).await {
            Ok(run) => run,
            Err(e) => {
                error!("job {} could not be prepared: {}", job_id, e);
                self.jobs.update_job_to_failed(&job_id, &e.to_string()).await;
                return;
            }
        };

        // Registered before the status flips so a cancel request arriving
        // right after the job reads as running can always reach the token.
        let cancel = self.shutdown.child_token();
        self.cancellations.register(&job_id, cancel.clone());

        self.jobs.update_job_to_running(&job_id).await;
        info!("job {} started ({:?})", job_id, job.job_type);
        let started = Instant::now();

        let (on_progress, pump) = self.progress_pipeline(&job_id);
        let result = self.trainer.train(&run, on_progress, cancel.clone()).await;

        self.cancellations.deregister(&job_id);

        // The trainer has dropped its callback handle by now, so the pump
        // drains the remaining reports and exits.
        if pump.await.is_err() {
            error!("progress pipeline for job {} panicked", job_id);
        }

        match result {
            Ok(outcome) => {
                info!(
                    "job {} trained in {}",
                    job_id,
                    format_duration(started.elapsed())
                );
                self.finish_job(&job, outcome).await;
            }
            Err(_) if cancel.is_cancelled() => {
                warn!("job {} cancelled during training", job_id);
                self.jobs.update_job_to_failed(&job_id, "cancelled").await;
            }
            Err(e) => {
                error!("job {} failed: {:#}", job_id, e);
                self.jobs.update_job_to_failed(&job_id, &e.to_string()).await;
            }
        }
    }

    async fn prepare_run(&self, job: &QueuedJob) -> Result<TrainingRun> {
        let base_model_path = match &job.base_model_version_id {
            Some(version_id) => match self.registry.get_model_version(version_id).await {
                Ok(version) => Some(PathBuf::from(version.model_path)),
                Err(e) => {
                    return Err(PlatformError::TrainingExecution(format!(
                        "base model version {} unavailable: {}",
                        version_id, e
                    )));
                }
            },
            None => None,
        };

        let output_model_dir = PathBuf::from(&job.output_model_dir);
        if let Err(e) = self.file_storage.ensure_dir(&output_model_dir).await {
            return Err(PlatformError::TrainingExecution(format!(
                "could not create output directory {}: {}",
                output_model_dir.display(),
                e
            )));
        }

        Ok(TrainingRun {
            job_id: job.job_id.clone(),
            training_root_dir: PathBuf::from(&job.training_root_dir),
            output_model_dir,
            hyperparameters: job.hyperparameters.clone(),
            base_model_path,
            augmentation: job.augmentation.clone(),
            class_balancing: job.class_balancing.clone(),
        })
    }

    /// Builds the per-job progress callback. Reports are queued without
    /// blocking the trainer and applied in emission order by a detached task
    /// with its own error boundary.
    fn progress_pipeline(
        &self,
        job_id: &str,
    ) -> (ProgressCallback, tokio::task::JoinHandle<()>) {
        let (tx, mut rx) = mpsc::unbounded_channel::<(f32, Option<String>)>();

        let notifier = self.notifier.clone();
        let id = job_id.to_string();
        let pump = tokio::spawn(async move {
            while let Some((progress, message)) = rx.recv().await {
                notifier.notify(id.clone(), progress, message).await;
            }
        });

        let on_progress: ProgressCallback = Arc::new(move |progress, message| {
            let _ = tx.send((progress, message));
        });

        (on_progress, pump)
    }

    async fn finish_job(&self, job: &QueuedJob, outcome: TrainingOutcome) {
        self.jobs
            .update_job_to_completed(&job.job_id, &outcome.metrics)
            .await;
        info!(
            "job {} completed, model written to {}",
            job.job_id,
            outcome.model_path.display()
        );

        let request = CreateModelVersionRequest {
            version_name: format!("job-{}", &job.job_id[..8.min(job.job_id.len())]),
            model_path: outcome.model_path.to_string_lossy().into_owned(),
            training_job_id: Some(job.job_id.clone()),
            parent_version_id: job.base_model_version_id.clone(),
            deployment_slot: None,
            evaluation_metrics: serde_json::to_value(&outcome.metrics).ok(),
            notes: None,
        };

        match self.registry.add_model_version(request).await {
            Ok(version) => info!(
                "registered model version {} for job {}",
                version.id, job.job_id
            ),
            Err(e) => error!(
                "could not register model version for job {}: {}",
                job.job_id, e
            ),
        }
    }
}

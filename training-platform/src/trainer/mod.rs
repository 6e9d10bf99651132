mod process;

pub use process::*;

use async_trait::async_trait;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use veriscan_common::types::{EvaluationMetrics, Hyperparameters};

/// Invoked by the trainer after each epoch or checkpoint. Implementations
/// must not block; reporting runs detached from the training call path.
pub type ProgressCallback = Arc<dyn Fn(f32, Option<String>) + Send + Sync>;

/// Everything a trainer needs to execute one job.
#[derive(Debug, Clone, Serialize)]
pub struct TrainingRun {
    pub job_id: String,
    pub training_root_dir: PathBuf,
    pub output_model_dir: PathBuf,
    pub hyperparameters: Hyperparameters,
    /// Resolved artifact path of the base version for incremental and
    /// transfer-learning runs.
    pub base_model_path: Option<PathBuf>,
    pub augmentation: Option<serde_json::Value>,
    pub class_balancing: Option<serde_json::Value>,
}

#[derive(Debug, Clone)]
pub struct TrainingOutcome {
    pub model_path: PathBuf,
    pub metrics: EvaluationMetrics,
}

/// The external training capability. The platform only drives it; the
/// classifier itself lives behind this seam and is swappable.
#[async_trait]
pub trait Trainer: Send + Sync {
    async fn train(
        &self,
        run: &TrainingRun,
        on_progress: ProgressCallback,
        cancel: CancellationToken,
    ) -> anyhow::Result<TrainingOutcome>;
}

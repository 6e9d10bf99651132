use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use veriscan_common::types::{EvaluationMetrics, Hyperparameters};

/// One training attempt. Rows are never deleted; terminal jobs remain as an
/// audit trail.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TrainingJob {
    pub id: String,
    pub job_type: JobType,
    pub base_model_version_id: Option<String>,
    pub parent_job_id: Option<String>,
    pub training_root_dir: String,
    pub output_model_dir: String,
    pub learning_rate: f64,
    pub epochs: i64,
    pub batch_size: i64,
    pub validation_split: Option<f64>,
    pub augmentation: Option<serde_json::Value>,
    pub class_balancing: Option<serde_json::Value>,
    pub status: TrainingStatus,
    pub progress: f32,
    pub error_message: Option<String>,
    pub evaluation_metrics: Option<serde_json::Value>,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TrainingJob {
    pub fn metrics(&self) -> Option<EvaluationMetrics> {
        self.evaluation_metrics
            .as_ref()
            .and_then(|value| serde_json::from_value(value.clone()).ok())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TrainingStatus {
    Queued,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl TrainingStatus {
    /// Terminal statuses permit no further transition.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TrainingStatus::Completed | TrainingStatus::Failed | TrainingStatus::Cancelled
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum JobType {
    Full,
    Incremental,
    TransferLearning,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateTrainingJobRequest {
    pub job_type: JobType,

    /// Required for incremental and transfer-learning jobs, absent otherwise.
    pub base_model_version_id: Option<String>,

    pub parent_job_id: Option<String>,

    #[validate(length(min = 1))]
    pub training_root_dir: String,

    pub output_model_dir: Option<String>,

    /// Defaults from configuration when omitted.
    #[validate]
    pub hyperparameters: Option<Hyperparameters>,

    pub augmentation: Option<serde_json::Value>,

    pub class_balancing: Option<serde_json::Value>,
}

#[derive(Debug, Serialize, FromRow)]
pub struct TrainingJobStats {
    pub total: i64,
    pub queued: i64,
    pub running: i64,
    pub completed: i64,
    pub failed: i64,
    pub cancelled: i64,
}

#[derive(Debug, Serialize, FromRow)]
pub struct TrainingJobSummary {
    pub id: String,
    pub job_type: JobType,
    pub status: TrainingStatus,
    pub progress: f32,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

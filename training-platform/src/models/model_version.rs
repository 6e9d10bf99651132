use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// One trained or imported model artifact. Versions are never deleted so
/// rollback targets and lineage stay available.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ModelVersion {
    pub id: String,
    pub version_name: String,
    pub model_path: String,
    /// Absent for manually imported models.
    pub training_job_id: Option<String>,
    pub parent_version_id: Option<String>,
    pub deployment_slot: String,
    pub is_active: bool,
    pub traffic_percentage: Option<f64>,
    pub evaluation_metrics: Option<serde_json::Value>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateModelVersionRequest {
    #[validate(length(min = 1, max = 100))]
    pub version_name: String,

    #[validate(length(min = 1))]
    pub model_path: String,

    pub training_job_id: Option<String>,

    pub parent_version_id: Option<String>,

    pub deployment_slot: Option<String>,

    pub evaluation_metrics: Option<serde_json::Value>,

    pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UpdateModelVersionRequest {
    #[validate(length(min = 1, max = 100))]
    pub version_name: Option<String>,

    #[validate(range(min = 0.0, max = 100.0))]
    pub traffic_percentage: Option<f64>,

    pub evaluation_metrics: Option<serde_json::Value>,

    pub notes: Option<String>,
}

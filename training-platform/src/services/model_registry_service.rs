use chrono::Utc;
use sqlx::sqlite::SqlitePool;
use tracing::info;
use validator::Validate;

use veriscan_common::utils::generate_unique_id;

use crate::error::{PlatformError, Result};
use crate::models::{CreateModelVersionRequest, ModelVersion, UpdateModelVersionRequest};

/// Slot new versions land in until they are promoted somewhere else.
pub const DEFAULT_DEPLOYMENT_SLOT: &str = "Staging";

/// Registry of trained and imported model versions. Slot activation is the
/// one operation needing cross-row atomicity and runs inside a single
/// database transaction.
#[derive(Clone)]
pub struct ModelRegistryService {
    db_pool: SqlitePool,
}

impl ModelRegistryService {
    pub fn new(db_pool: SqlitePool) -> Self {
        Self { db_pool }
    }

    pub async fn add_model_version(
        &self,
        request: CreateModelVersionRequest,
    ) -> Result<ModelVersion> {
        request.validate()?;

        let id = generate_unique_id();
        let deployment_slot = request
            .deployment_slot
            .unwrap_or_else(|| DEFAULT_DEPLOYMENT_SLOT.to_string());
        let now = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO model_versions (
                id, version_name, model_path, training_job_id, parent_version_id,
                deployment_slot, is_active, traffic_percentage, evaluation_metrics,
                notes, created_at, updated_at
            )
            VALUES (?, ?, ?, ?, ?, ?, 0, NULL, ?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(&request.version_name)
        .bind(&request.model_path)
        .bind(&request.training_job_id)
        .bind(&request.parent_version_id)
        .bind(&deployment_slot)
        .bind(&request.evaluation_metrics)
        .bind(&request.notes)
        .bind(now)
        .bind(now)
        .execute(&self.db_pool)
        .await?;

        info!(
            "registered model version {} ({}) in slot {}",
            id, request.version_name, deployment_slot
        );

        self.get_model_version(&id).await
    }

    pub async fn get_model_version(&self, id: &str) -> Result<ModelVersion> {
        sqlx::query_as::<_, ModelVersion>(
            r#"
            SELECT * FROM model_versions WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db_pool)
        .await?
        .ok_or_else(|| PlatformError::NotFound(format!("model version {}", id)))
    }

    pub async fn get_model_versions(&self, ids: &[String]) -> Result<Vec<ModelVersion>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let placeholders = vec!["?"; ids.len()].join(", ");
        let sql = format!(
            "SELECT * FROM model_versions WHERE id IN ({}) ORDER BY created_at DESC",
            placeholders
        );

        let mut query = sqlx::query_as::<_, ModelVersion>(&sql);
        for id in ids {
            query = query.bind(id);
        }

        Ok(query.fetch_all(&self.db_pool).await?)
    }

    pub async fn get_all_model_versions(&self) -> Result<Vec<ModelVersion>> {
        let versions = sqlx::query_as::<_, ModelVersion>(
            r#"
            SELECT * FROM model_versions
            ORDER BY created_at DESC
            "#,
        )
        .fetch_all(&self.db_pool)
        .await?;

        Ok(versions)
    }

    pub async fn get_by_deployment_slot(&self, slot: &str) -> Result<Vec<ModelVersion>> {
        let versions = sqlx::query_as::<_, ModelVersion>(
            r#"
            SELECT * FROM model_versions
            WHERE deployment_slot = ?
            ORDER BY created_at DESC
            "#,
        )
        .bind(slot)
        .fetch_all(&self.db_pool)
        .await?;

        Ok(versions)
    }

    pub async fn get_active_version(&self, slot: &str) -> Result<Option<ModelVersion>> {
        let version = sqlx::query_as::<_, ModelVersion>(
            r#"
            SELECT * FROM model_versions
            WHERE deployment_slot = ? AND is_active = 1
            ORDER BY created_at DESC
            "#,
        )
        .bind(slot)
        .fetch_optional(&self.db_pool)
        .await?;

        Ok(version)
    }

    pub async fn get_active_versions(&self) -> Result<Vec<ModelVersion>> {
        let versions = sqlx::query_as::<_, ModelVersion>(
            r#"
            SELECT * FROM model_versions
            WHERE is_active = 1
            ORDER BY created_at DESC
            "#,
        )
        .fetch_all(&self.db_pool)
        .await?;

        Ok(versions)
    }

    pub async fn update_model_version(
        &self,
        id: &str,
        request: UpdateModelVersionRequest,
    ) -> Result<ModelVersion> {
        request.validate()?;

        let updated = sqlx::query(
            r#"
            UPDATE model_versions
            SET version_name = COALESCE(?, version_name),
                traffic_percentage = COALESCE(?, traffic_percentage),
                evaluation_metrics = COALESCE(?, evaluation_metrics),
                notes = COALESCE(?, notes),
                updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&request.version_name)
        .bind(request.traffic_percentage)
        .bind(&request.evaluation_metrics)
        .bind(&request.notes)
        .bind(Utc::now())
        .bind(id)
        .execute(&self.db_pool)
        .await?
        .rows_affected();

        if updated == 0 {
            return Err(PlatformError::NotFound(format!("model version {}", id)));
        }

        self.get_model_version(id).await
    }

    /// Promotes `version_id` to be the single active version of
    /// `deployment_slot`, migrating it into the slot if it lives elsewhere.
    /// Runs as one transaction; readers never observe two active versions in
    /// a slot.
    pub async fn set_active_version(
        &self,
        version_id: &str,
        deployment_slot: &str,
    ) -> Result<ModelVersion> {
        let now = Utc::now();
        let mut tx = self.db_pool.begin().await?;

        let target = sqlx::query_as::<_, ModelVersion>(
            r#"
            SELECT * FROM model_versions WHERE id = ?
            "#,
        )
        .bind(version_id)
        .fetch_optional(&mut tx)
        .await?;

        if target.is_none() {
            return Err(PlatformError::NotFound(format!(
                "model version {}",
                version_id
            )));
        }

        sqlx::query(
            r#"
            UPDATE model_versions
            SET is_active = 0, updated_at = ?
            WHERE deployment_slot = ? AND is_active = 1
            "#,
        )
        .bind(now)
        .bind(deployment_slot)
        .execute(&mut tx)
        .await?;

        sqlx::query(
            r#"
            UPDATE model_versions
            SET is_active = 1, deployment_slot = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(deployment_slot)
        .bind(now)
        .bind(version_id)
        .execute(&mut tx)
        .await?;

        tx.commit().await?;

        info!(
            "model version {} is now active in slot {}",
            version_id, deployment_slot
        );

        self.get_model_version(version_id).await
    }
}

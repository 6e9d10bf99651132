use chrono::Utc;
use sqlx::sqlite::SqlitePool;
use tracing::{info, warn};

use crate::error::Result;
use crate::models::TrainingJob;

/// Failure reason recorded on jobs orphaned by a process crash.
pub const RESTART_INTERRUPTION_REASON: &str = "interrupted by service restart";

/// Reconciles jobs a previous process left running. Must run once at boot,
/// before the worker starts consuming; no other path leaves a running row
/// behind without a live worker.
pub struct RecoveryService {
    db_pool: SqlitePool,
}

impl RecoveryService {
    pub fn new(db_pool: SqlitePool) -> Self {
        Self { db_pool }
    }

    /// Marks every running row failed. Orphans are not re-enqueued; the
    /// operator resubmits if the training is still wanted.
    pub async fn reconcile_orphaned_jobs(&self) -> Result<usize> {
        let orphans = sqlx::query_as::<_, TrainingJob>(
            r#"
            SELECT * FROM training_jobs WHERE status = 'running'
            "#,
        )
        .fetch_all(&self.db_pool)
        .await?;

        for job in &orphans {
            let now = Utc::now();
            sqlx::query(
                r#"
                UPDATE training_jobs
                SET status = 'failed', error_message = ?, completed_at = ?, updated_at = ?
                WHERE id = ? AND status = 'running'
                "#,
            )
            .bind(RESTART_INTERRUPTION_REASON)
            .bind(now)
            .bind(now)
            .bind(&job.id)
            .execute(&self.db_pool)
            .await?;

            warn!("job {} was running at shutdown, marked failed", job.id);
        }

        if !orphans.is_empty() {
            info!("reconciled {} orphaned training job(s)", orphans.len());
        }

        Ok(orphans.len())
    }
}

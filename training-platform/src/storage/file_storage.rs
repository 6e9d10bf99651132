use anyhow::Result;
use std::path::{Path, PathBuf};
use tokio::fs;

/// Filesystem layout for trained model artifacts. Each job gets its own
/// directory under the configured models root.
pub struct FileStorage {
    models_dir: PathBuf,
}

impl FileStorage {
    pub fn new(models_dir: PathBuf) -> Self {
        Self { models_dir }
    }

    pub fn job_output_dir(&self, job_id: &str) -> PathBuf {
        self.models_dir.join(job_id)
    }

    pub async fn ensure_dir(&self, path: &Path) -> Result<()> {
        fs::create_dir_all(path).await?;

        Ok(())
    }
}

use chrono::Utc;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::debug;

use veriscan_common::types::ProgressUpdate;

use crate::services::training_job_service::TrainingJobControl;

/// Fans progress reports out to the job store and to any live subscribers.
/// Failures stop here; a lost notification never reaches the training call
/// stack.
pub struct ProgressNotifier {
    jobs: Arc<dyn TrainingJobControl>,
    subscribers: broadcast::Sender<ProgressUpdate>,
}

impl ProgressNotifier {
    pub fn new(jobs: Arc<dyn TrainingJobControl>, capacity: usize) -> Self {
        let (subscribers, _) = broadcast::channel(capacity);

        Self { jobs, subscribers }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ProgressUpdate> {
        self.subscribers.subscribe()
    }

    pub async fn notify(&self, job_id: String, progress: f32, message: Option<String>) {
        self.jobs.update_job_progress(&job_id, progress).await;

        let update = ProgressUpdate {
            job_id,
            progress,
            message,
            timestamp: Utc::now(),
        };

        if self.subscribers.send(update).is_err() {
            debug!("dropped progress update: no live subscribers");
        }
    }
}

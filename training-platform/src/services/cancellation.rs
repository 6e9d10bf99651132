use std::collections::HashMap;
use std::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::warn;

/// Tracks the cancellation handle of the job currently executing, keyed by
/// job id. The worker registers a token before invoking the trainer; the
/// cancel path fires it from another task.
#[derive(Default)]
pub struct CancellationRegistry {
    active: Mutex<HashMap<String, CancellationToken>>,
}

impl CancellationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, job_id: &str, token: CancellationToken) {
        let mut active = self.active.lock().unwrap();
        if active.insert(job_id.to_string(), token).is_some() {
            warn!("replaced an existing cancellation handle for job {}", job_id);
        }
    }

    pub fn deregister(&self, job_id: &str) {
        self.active.lock().unwrap().remove(job_id);
    }

    /// Fires the token for `job_id` if it is currently executing. Returns
    /// whether a handle was found.
    pub fn cancel(&self, job_id: &str) -> bool {
        match self.active.lock().unwrap().get(job_id) {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }
}

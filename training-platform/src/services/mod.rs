mod cancellation;
mod model_registry_service;
mod progress_notifier;
mod recovery_service;
mod training_job_service;
mod training_worker;

pub use cancellation::*;
pub use model_registry_service::*;
pub use progress_notifier::*;
pub use recovery_service::*;
pub use training_job_service::*;
pub use training_worker::*;

mod model_version;
mod training_job;

pub use model_version::*;
pub use training_job::*;

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod services;
pub mod storage;
pub mod trainer;

use std::sync::Arc;

use config::PlatformConfig;
use services::{ModelRegistryService, TrainingJobService};

pub struct AppState {
    pub jobs: Arc<TrainingJobService>,
    pub registry: Arc<ModelRegistryService>,
    pub config: PlatformConfig,
}

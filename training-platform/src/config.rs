use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use veriscan_common::types::Hyperparameters;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PlatformConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub storage: StorageConfig,
    pub training: TrainingConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub cors_origins: Vec<String>,
    pub api_prefix: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub connect_timeout_sec: u64,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct StorageConfig {
    pub data_dir: PathBuf,
    pub models_dir: PathBuf,
    pub temp_dir: PathBuf,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TrainingConfig {
    /// Jobs counted as queued or running; new requests beyond this are refused.
    pub max_concurrent_jobs: u32,
    /// Worker backoff between polls of an empty queue.
    pub worker_poll_interval_sec: u64,
    pub trainer_command: PathBuf,
    pub trainer_args: Vec<String>,
    pub progress_channel_capacity: usize,
    pub default_hyperparameters: Hyperparameters,
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8080,
                cors_origins: vec!["http://localhost:3000".to_string()],
                api_prefix: "/api/v1".to_string(),
            },
            database: DatabaseConfig {
                url: "sqlite:/var/lib/veriscan/veriscan.db".to_string(),
                max_connections: 5,
                connect_timeout_sec: 30,
            },
            storage: StorageConfig {
                data_dir: PathBuf::from("/var/lib/veriscan/data"),
                models_dir: PathBuf::from("/var/lib/veriscan/models"),
                temp_dir: PathBuf::from("/tmp/veriscan"),
            },
            training: TrainingConfig::default(),
        }
    }
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            max_concurrent_jobs: 3,
            worker_poll_interval_sec: 5,
            trainer_command: PathBuf::from("/opt/veriscan/bin/train-barcode-classifier"),
            trainer_args: Vec::new(),
            progress_channel_capacity: 256,
            default_hyperparameters: Hyperparameters {
                learning_rate: 0.001,
                epochs: 50,
                batch_size: 16,
                validation_split: Some(0.2),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_deployable() {
        let config = PlatformConfig::default();
        assert!(config.database.url.starts_with("sqlite:"));
        assert!(config.training.max_concurrent_jobs >= 1);
        assert_eq!(config.training.worker_poll_interval_sec, 5);
        assert!(config.training.default_hyperparameters.learning_rate > 0.0);
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Training hyperparameters, carried on the submit request and stored on the
/// job row.
///
/// `learning_rate` must additionally be strictly positive; the range check
/// here only bounds it and the open lower bound is checked when a job is
/// submitted.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct Hyperparameters {
    #[validate(range(min = 0.0, max = 1.0))]
    pub learning_rate: f64,

    #[validate(range(min = 1))]
    pub epochs: u32,

    #[validate(range(min = 1))]
    pub batch_size: u32,

    #[validate(range(min = 0.0, max = 1.0))]
    pub validation_split: Option<f32>,
}

/// Evaluation results produced by a completed training run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationMetrics {
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1_score: f64,
    pub evaluated_samples: u32,
}

/// A single progress report for a training job, pushed to live subscribers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressUpdate {
    pub job_id: String,
    pub progress: f32,
    pub message: Option<String>,
    pub timestamp: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hyperparameters() -> Hyperparameters {
        Hyperparameters {
            learning_rate: 0.001,
            epochs: 50,
            batch_size: 16,
            validation_split: Some(0.2),
        }
    }

    #[test]
    fn accepts_typical_hyperparameters() {
        assert!(hyperparameters().validate().is_ok());
    }

    #[test]
    fn rejects_zero_epochs() {
        let mut hp = hyperparameters();
        hp.epochs = 0;
        assert!(hp.validate().is_err());
    }

    #[test]
    fn rejects_zero_batch_size() {
        let mut hp = hyperparameters();
        hp.batch_size = 0;
        assert!(hp.validate().is_err());
    }

    #[test]
    fn rejects_learning_rate_above_one() {
        let mut hp = hyperparameters();
        hp.learning_rate = 1.5;
        assert!(hp.validate().is_err());
    }

    #[test]
    fn rejects_validation_split_above_one() {
        let mut hp = hyperparameters();
        hp.validation_split = Some(1.1);
        assert!(hp.validate().is_err());
    }

    #[test]
    fn missing_validation_split_is_allowed() {
        let mut hp = hyperparameters();
        hp.validation_split = None;
        assert!(hp.validate().is_ok());
    }

    #[test]
    fn metrics_round_trip_as_json() {
        let metrics = EvaluationMetrics {
            accuracy: 0.97,
            precision: 0.95,
            recall: 0.93,
            f1_score: 0.94,
            evaluated_samples: 1200,
        };
        let value = serde_json::to_value(&metrics).unwrap();
        let decoded: EvaluationMetrics = serde_json::from_value(value).unwrap();
        assert_eq!(metrics, decoded);
    }
}

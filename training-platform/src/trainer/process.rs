use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use veriscan_common::types::EvaluationMetrics;

use super::{ProgressCallback, Trainer, TrainingOutcome, TrainingRun};

/// Events the training executable emits on stdout, one JSON object per line.
#[derive(Debug, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
enum TrainerEvent {
    Progress {
        progress: f32,
        message: Option<String>,
    },
    Completed {
        model_path: PathBuf,
        metrics: EvaluationMetrics,
    },
    Failed {
        error: String,
    },
}

/// Runs the configured training executable as a child process. The run spec
/// is serialized to the child's stdin; progress and the final result come
/// back as JSON lines on its stdout.
pub struct ProcessTrainer {
    program: PathBuf,
    args: Vec<String>,
}

impl ProcessTrainer {
    pub fn new(program: PathBuf, args: Vec<String>) -> Self {
        Self { program, args }
    }
}

#[async_trait]
impl Trainer for ProcessTrainer {
    async fn train(
        &self,
        run: &TrainingRun,
        on_progress: ProgressCallback,
        cancel: CancellationToken,
    ) -> Result<TrainingOutcome> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("failed to launch trainer {}", self.program.display()))?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| anyhow!("trainer stdin unavailable"))?;
        let spec = serde_json::to_vec(run)?;
        stdin.write_all(&spec).await?;
        stdin.shutdown().await?;
        drop(stdin);

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| anyhow!("trainer stdout unavailable"))?;
        let mut lines = BufReader::new(stdout).lines();

        let mut outcome = None;
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    warn!("training run {} cancelled, stopping trainer process", run.job_id);
                    child.kill().await.ok();
                    return Err(anyhow!("training cancelled"));
                }
                line = lines.next_line() => {
                    match line? {
                        Some(line) => {
                            if line.trim().is_empty() {
                                continue;
                            }
                            match serde_json::from_str::<TrainerEvent>(&line) {
                                Ok(TrainerEvent::Progress { progress, message }) => {
                                    on_progress(progress, message);
                                }
                                Ok(TrainerEvent::Completed { model_path, metrics }) => {
                                    outcome = Some(TrainingOutcome { model_path, metrics });
                                }
                                Ok(TrainerEvent::Failed { error }) => {
                                    child.wait().await.ok();
                                    return Err(anyhow!(error));
                                }
                                Err(e) => {
                                    debug!("ignoring unparseable trainer output {:?}: {}", line, e);
                                }
                            }
                        }
                        None => break,
                    }
                }
            }
        }

        let status = child.wait().await?;
        if !status.success() {
            return Err(anyhow!("trainer process exited with {}", status));
        }

        outcome.ok_or_else(|| anyhow!("trainer process exited without reporting a trained model"))
    }
}

mod common;

use common::*;

use std::sync::Arc;
use tokio::time::Duration;

use veriscan_training::models::TrainingStatus;
use veriscan_training::services::{
    RecoveryService, TrainingJobControl, RESTART_INTERRUPTION_REASON,
};

#[tokio::test]
async fn orphaned_running_jobs_are_marked_failed() {
    let ctx = test_context().await;

    let job_id = ctx
        .jobs
        .start_training(sample_request(&ctx))
        .await
        .expect("start job");
    ctx.jobs.update_job_to_running(&job_id).await;

    let reconciled = RecoveryService::new(ctx.pool.clone())
        .reconcile_orphaned_jobs()
        .await
        .expect("recovery");
    assert_eq!(reconciled, 1);

    let job = ctx.jobs.get_status(&job_id).await.unwrap().unwrap();
    assert_eq!(job.status, TrainingStatus::Failed);
    assert_eq!(
        job.error_message.as_deref(),
        Some(RESTART_INTERRUPTION_REASON)
    );
    assert!(job.completed_at.is_some());
}

#[tokio::test]
async fn queued_and_terminal_jobs_are_left_alone() {
    let ctx = test_context().await;

    let queued = ctx
        .jobs
        .start_training(sample_request(&ctx))
        .await
        .expect("start job");
    let completed = ctx
        .jobs
        .start_training(sample_request(&ctx))
        .await
        .expect("start job");
    ctx.jobs.update_job_to_running(&completed).await;
    ctx.jobs
        .update_job_to_completed(&completed, &fixed_metrics())
        .await;

    let reconciled = RecoveryService::new(ctx.pool.clone())
        .reconcile_orphaned_jobs()
        .await
        .expect("recovery");
    assert_eq!(reconciled, 0);

    let job = ctx.jobs.get_status(&queued).await.unwrap().unwrap();
    assert_eq!(job.status, TrainingStatus::Queued);

    let job = ctx.jobs.get_status(&completed).await.unwrap().unwrap();
    assert_eq!(job.status, TrainingStatus::Completed);
}

#[tokio::test]
async fn reconciled_jobs_are_never_executed_by_the_worker() {
    let ctx = test_context().await;

    let job_id = ctx
        .jobs
        .start_training(sample_request(&ctx))
        .await
        .expect("start job");
    ctx.jobs.update_job_to_running(&job_id).await;

    RecoveryService::new(ctx.pool.clone())
        .reconcile_orphaned_jobs()
        .await
        .expect("recovery");

    let trainer = Arc::new(StubTrainer::new(Duration::from_millis(5)));
    let events = trainer.events.clone();
    let harness = spawn_worker_on(ctx, trainer, Duration::from_millis(10)).await;

    // The stale queue entry is picked up and discarded, never trained.
    tokio::time::sleep(Duration::from_millis(200)).await;

    assert!(events.lock().unwrap().is_empty());

    let job = harness.ctx.jobs.get_status(&job_id).await.unwrap().unwrap();
    assert_eq!(job.status, TrainingStatus::Failed);
    assert_eq!(
        job.error_message.as_deref(),
        Some(RESTART_INTERRUPTION_REASON)
    );

    harness.shutdown.cancel();
    harness.worker_handle.await.expect("worker exits");
}

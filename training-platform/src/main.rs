use actix_cors::Cors;
use actix_web::{web, App, HttpServer};
use anyhow::Result;
use std::sync::Arc;
use tokio::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::info;

use veriscan_training::{
    api,
    config::PlatformConfig,
    services::{
        CancellationRegistry, ModelRegistryService, ProgressNotifier, RecoveryService,
        TrainingJobControl, TrainingJobService, TrainingWorker,
    },
    storage::{create_db_pool, FileStorage},
    trainer::ProcessTrainer,
    AppState,
};

#[actix_web::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt::init();

    // Load configuration
    let config = PlatformConfig::default();

    // Initialize database
    let db_pool = create_db_pool(&config.database.url, config.database.max_connections).await?;

    // Jobs orphaned by the previous shutdown are reconciled before the
    // worker starts consuming.
    RecoveryService::new(db_pool.clone())
        .reconcile_orphaned_jobs()
        .await?;

    let file_storage = Arc::new(FileStorage::new(config.storage.models_dir.clone()));
    let shutdown = CancellationToken::new();
    let cancellations = Arc::new(CancellationRegistry::new());

    let jobs = Arc::new(TrainingJobService::new(
        db_pool.clone(),
        config.training.clone(),
        file_storage.clone(),
        cancellations.clone(),
    ));
    let registry = Arc::new(ModelRegistryService::new(db_pool));
    let notifier = Arc::new(ProgressNotifier::new(
        jobs.clone() as Arc<dyn TrainingJobControl>,
        config.training.progress_channel_capacity,
    ));
    let trainer = Arc::new(ProcessTrainer::new(
        config.training.trainer_command.clone(),
        config.training.trainer_args.clone(),
    ));

    // Start the training worker
    let worker = TrainingWorker::new(
        jobs.clone() as Arc<dyn TrainingJobControl>,
        registry.clone(),
        notifier,
        trainer,
        file_storage,
        cancellations,
        Duration::from_secs(config.training.worker_poll_interval_sec),
        shutdown.child_token(),
    );

    tokio::spawn(async move {
        worker.start().await;
    });

    let host = config.server.host.clone();
    let port = config.server.port;

    // Create app state
    let app_state = web::Data::new(AppState {
        jobs,
        registry,
        config,
    });

    // Start HTTP server
    let state_for_server = app_state.clone();
    let server = HttpServer::new(move || {
        let mut cors = Cors::default()
            .allowed_methods(vec!["GET", "POST", "PUT", "DELETE"])
            .allowed_headers(vec!["Content-Type", "Authorization"])
            .max_age(3600);
        for origin in &state_for_server.config.server.cors_origins {
            cors = cors.allowed_origin(origin);
        }

        App::new()
            .app_data(state_for_server.clone())
            .wrap(cors)
            .configure(api::configure)
    })
    .bind((host.clone(), port))?
    .run();

    info!("training platform server started on {}:{}", host, port);

    server.await?;

    // Stops the worker and cooperatively interrupts a running trainer call.
    shutdown.cancel();

    Ok(())
}

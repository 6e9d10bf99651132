use actix_web::{get, post, web, HttpResponse};
use serde_json::json;
use std::collections::HashMap;

use crate::{api::to_http_error, models::CreateTrainingJobRequest, AppState};

#[post("/training/jobs")]
async fn start_training(
    state: web::Data<AppState>,
    request: web::Json<CreateTrainingJobRequest>,
) -> Result<HttpResponse, actix_web::Error> {
    let job_id = state
        .jobs
        .start_training(request.into_inner())
        .await
        .map_err(to_http_error)?;

    Ok(HttpResponse::Created().json(json!({ "job_id": job_id })))
}

#[get("/training/jobs")]
async fn get_training_jobs(
    state: web::Data<AppState>,
) -> Result<HttpResponse, actix_web::Error> {
    let jobs = state.jobs.get_all_jobs().await.map_err(to_http_error)?;

    Ok(HttpResponse::Ok().json(jobs))
}

#[get("/training/jobs/{id}")]
async fn get_training_job(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, actix_web::Error> {
    let job_id = path.into_inner();

    let job = state
        .jobs
        .get_status(&job_id)
        .await
        .map_err(to_http_error)?
        .ok_or_else(|| {
            actix_web::error::ErrorNotFound(format!("training job {} not found", job_id))
        })?;

    Ok(HttpResponse::Ok().json(job))
}

#[post("/training/jobs/{id}/cancel")]
async fn cancel_training_job(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, actix_web::Error> {
    let job_id = path.into_inner();

    let cancelled = state
        .jobs
        .cancel_training(&job_id)
        .await
        .map_err(to_http_error)?;

    Ok(HttpResponse::Ok().json(json!({ "cancelled": cancelled })))
}

#[get("/training/stats")]
async fn get_training_stats(
    state: web::Data<AppState>,
) -> Result<HttpResponse, actix_web::Error> {
    let stats = state.jobs.get_job_stats().await.map_err(to_http_error)?;

    Ok(HttpResponse::Ok().json(stats))
}

#[get("/training/summaries")]
async fn get_training_summaries(
    state: web::Data<AppState>,
    query: web::Query<HashMap<String, i64>>,
) -> Result<HttpResponse, actix_web::Error> {
    let limit = query.get("limit").cloned();

    let summaries = state
        .jobs
        .get_job_summaries(limit)
        .await
        .map_err(to_http_error)?;

    Ok(HttpResponse::Ok().json(summaries))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(start_training)
        .service(get_training_jobs)
        .service(get_training_stats)
        .service(get_training_summaries)
        .service(get_training_job)
        .service(cancel_training_job);
}

use actix_web::{get, post, put, web, HttpResponse};
use serde::Deserialize;

use crate::{
    api::to_http_error,
    models::{CreateModelVersionRequest, UpdateModelVersionRequest},
    AppState,
};

#[derive(Debug, Deserialize)]
struct ActivateModelRequest {
    deployment_slot: String,
}

#[get("/models/active")]
async fn get_active_models(
    state: web::Data<AppState>,
) -> Result<HttpResponse, actix_web::Error> {
    let versions = state
        .registry
        .get_active_versions()
        .await
        .map_err(to_http_error)?;

    Ok(HttpResponse::Ok().json(versions))
}

#[get("/models/slot/{slot}/active")]
async fn get_active_model_for_slot(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, actix_web::Error> {
    let slot = path.into_inner();

    let version = state
        .registry
        .get_active_version(&slot)
        .await
        .map_err(to_http_error)?
        .ok_or_else(|| {
            actix_web::error::ErrorNotFound(format!("no active model version in slot {}", slot))
        })?;

    Ok(HttpResponse::Ok().json(version))
}

#[get("/models/slot/{slot}")]
async fn get_models_by_slot(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, actix_web::Error> {
    let slot = path.into_inner();

    let versions = state
        .registry
        .get_by_deployment_slot(&slot)
        .await
        .map_err(to_http_error)?;

    Ok(HttpResponse::Ok().json(versions))
}

#[get("/models")]
async fn get_models(state: web::Data<AppState>) -> Result<HttpResponse, actix_web::Error> {
    let versions = state
        .registry
        .get_all_model_versions()
        .await
        .map_err(to_http_error)?;

    Ok(HttpResponse::Ok().json(versions))
}

#[post("/models")]
async fn import_model(
    state: web::Data<AppState>,
    request: web::Json<CreateModelVersionRequest>,
) -> Result<HttpResponse, actix_web::Error> {
    let version = state
        .registry
        .add_model_version(request.into_inner())
        .await
        .map_err(to_http_error)?;

    Ok(HttpResponse::Created().json(version))
}

#[get("/models/{id}")]
async fn get_model(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, actix_web::Error> {
    let version = state
        .registry
        .get_model_version(&path.into_inner())
        .await
        .map_err(to_http_error)?;

    Ok(HttpResponse::Ok().json(version))
}

#[put("/models/{id}")]
async fn update_model(
    state: web::Data<AppState>,
    path: web::Path<String>,
    request: web::Json<UpdateModelVersionRequest>,
) -> Result<HttpResponse, actix_web::Error> {
    let version = state
        .registry
        .update_model_version(&path.into_inner(), request.into_inner())
        .await
        .map_err(to_http_error)?;

    Ok(HttpResponse::Ok().json(version))
}

#[post("/models/{id}/activate")]
async fn activate_model(
    state: web::Data<AppState>,
    path: web::Path<String>,
    request: web::Json<ActivateModelRequest>,
) -> Result<HttpResponse, actix_web::Error> {
    let version = state
        .registry
        .set_active_version(&path.into_inner(), &request.deployment_slot)
        .await
        .map_err(to_http_error)?;

    Ok(HttpResponse::Ok().json(version))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    // Literal segments register before the {id} routes they would otherwise
    // shadow.
    cfg.service(get_active_models)
        .service(get_active_model_for_slot)
        .service(get_models_by_slot)
        .service(get_models)
        .service(import_model)
        .service(get_model)
        .service(update_model)
        .service(activate_model);
}

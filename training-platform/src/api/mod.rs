mod models;
mod training;

use actix_web::web;

use crate::error::PlatformError;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            .configure(training::configure)
            .configure(models::configure),
    );
}

pub(crate) fn to_http_error(err: PlatformError) -> actix_web::Error {
    match &err {
        PlatformError::Validation(_) | PlatformError::DirectoryNotFound(_) => {
            actix_web::error::ErrorBadRequest(err)
        }
        PlatformError::NotFound(_) => actix_web::error::ErrorNotFound(err),
        PlatformError::StateConflict(_) => actix_web::error::ErrorConflict(err),
        _ => actix_web::error::ErrorInternalServerError(err),
    }
}

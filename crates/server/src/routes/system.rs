use actix_web::{get, web, HttpResponse};
use std::sync::Arc;

use crate::state::AppState;

/// Model diagnostics
#[get("/model")]
pub async fn model_info(state: web::Data<Arc<AppState>>) -> HttpResponse {
    HttpResponse::Ok().json(state.pipeline.generator().model_info())
}

/// Latency report
#[get("/metrics")]
pub async fn metrics(state: web::Data<Arc<AppState>>) -> HttpResponse {
    HttpResponse::Ok().json(state.tracker.report())
}

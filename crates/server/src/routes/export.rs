use actix_web::{post, web, HttpResponse};
use std::sync::Arc;

use crate::state::AppState;
use crate::types::{ApiResult, ExportRequest};

/// Export stored thoughts to a local JSON file (all of them without ids)
#[post("/export")]
pub async fn export(
    req: Option<web::Json<ExportRequest>>,
    state: web::Data<Arc<AppState>>,
) -> ApiResult<HttpResponse> {
    let req = req.map(web::Json::into_inner).unwrap_or_default();

    let thoughts = state.store.read().await.snapshot(req.thought_ids.as_deref());
    let outcome = state.exporter.export(&thoughts)?;

    Ok(HttpResponse::Ok().json(outcome))
}

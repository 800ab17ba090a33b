use actix_web::{delete, get, web, HttpResponse};
use sentiment_space_common::SentimentSpaceError;
use std::sync::Arc;

use crate::state::AppState;
use crate::types::{ApiResult, SimilarQuery, SuccessResponse};

/// Summary of the pipeline's in-memory history
#[get("/context")]
pub async fn context(state: web::Data<Arc<AppState>>) -> HttpResponse {
    HttpResponse::Ok().json(state.pipeline.context_summary().await)
}

/// Past thoughts sharing words with `q`
#[get("/similar")]
pub async fn similar(
    query: web::Query<SimilarQuery>,
    state: web::Data<Arc<AppState>>,
) -> ApiResult<HttpResponse> {
    if query.q.trim().is_empty() {
        return Err(SentimentSpaceError::invalid_input("Query cannot be empty").into());
    }

    let entries = state.pipeline.similar_thoughts(&query.q, query.limit).await;
    Ok(HttpResponse::Ok().json(entries))
}

/// Forget the in-memory history; stored thoughts are kept
#[delete("/memory")]
pub async fn clear_memory(state: web::Data<Arc<AppState>>) -> HttpResponse {
    state.pipeline.clear_memory().await;
    HttpResponse::Ok().json(SuccessResponse {
        success: true,
        message: Some("Memory cleared".to_string()),
    })
}

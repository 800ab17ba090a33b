use actix_web::{post, web, HttpResponse};
use sentiment_space_common::SentimentSpaceError;
use std::sync::Arc;
use tracing::info;

use crate::state::AppState;
use crate::types::{AnalyzeRequest, ApiResult};

/// Analyze a thought, remember it and store the result
#[post("/analyze")]
pub async fn analyze(
    req: web::Json<AnalyzeRequest>,
    state: web::Data<Arc<AppState>>,
) -> ApiResult<HttpResponse> {
    if req.raw_text.trim().is_empty() {
        return Err(SentimentSpaceError::invalid_input("raw_text cannot be empty").into());
    }

    let analysis = state.pipeline.analyze_with(&req.raw_text, true).await;
    if analysis.is_degraded() {
        info!("Analysis used defaults: {:?}", analysis.fallbacks);
    }

    let record = state
        .store
        .write()
        .await
        .insert(&req.raw_text, &analysis.result)?;

    Ok(HttpResponse::Ok().json(record))
}

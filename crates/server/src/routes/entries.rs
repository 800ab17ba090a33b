use actix_web::{delete, get, patch, web, HttpResponse};
use sentiment_space_common::SentimentSpaceError;
use std::sync::Arc;

use crate::state::AppState;
use crate::types::{ApiResult, EntriesQuery, EntriesResponse, SuccessResponse, ThoughtUpdate};

/// Stored thoughts, newest first
#[get("/entries")]
pub async fn list_entries(
    query: web::Query<EntriesQuery>,
    state: web::Data<Arc<AppState>>,
) -> HttpResponse {
    let store = state.store.read().await;

    let entries = match query.sentiment {
        Some(sentiment) => store
            .by_sentiment(sentiment)
            .into_iter()
            .skip(query.offset)
            .take(query.limit)
            .collect(),
        None => store.list(query.limit, query.offset),
    };

    HttpResponse::Ok().json(EntriesResponse {
        total: store.len(),
        entries,
    })
}

#[get("/entries/{id}")]
pub async fn get_entry(
    path: web::Path<u64>,
    state: web::Data<Arc<AppState>>,
) -> ApiResult<HttpResponse> {
    let id = path.into_inner();
    let store = state.store.read().await;
    let record = store
        .get(id)
        .ok_or_else(|| SentimentSpaceError::not_found(format!("thought {}", id)))?;

    Ok(HttpResponse::Ok().json(record))
}

#[patch("/entries/{id}")]
pub async fn update_entry(
    path: web::Path<u64>,
    update: web::Json<ThoughtUpdate>,
    state: web::Data<Arc<AppState>>,
) -> ApiResult<HttpResponse> {
    let id = path.into_inner();
    let mut store = state.store.write().await;
    if !store.update(id, update.into_inner())? {
        return Err(SentimentSpaceError::not_found(format!("thought {}", id)).into());
    }

    Ok(HttpResponse::Ok().json(store.get(id)))
}

#[delete("/entries/{id}")]
pub async fn delete_entry(
    path: web::Path<u64>,
    state: web::Data<Arc<AppState>>,
) -> ApiResult<HttpResponse> {
    let id = path.into_inner();
    if !state.store.write().await.delete(id)? {
        return Err(SentimentSpaceError::not_found(format!("thought {}", id)).into());
    }

    Ok(HttpResponse::Ok().json(SuccessResponse {
        success: true,
        message: Some(format!("Thought {} deleted", id)),
    }))
}

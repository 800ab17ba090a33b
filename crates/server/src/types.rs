use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use chrono::{DateTime, Utc};
use sentiment_space_common::SentimentSpaceError;
use sentiment_space_llm::Sentiment;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Stored thought
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThoughtRecord {
    /// Unique identifier
    pub id: u64,

    /// Text as submitted
    pub raw_text: String,

    /// Generated summary
    pub summary: Option<String>,

    /// Sentiment label
    pub sentiment: Option<Sentiment>,

    /// Confidence in the label (0-1)
    pub confidence: Option<f64>,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

/// Partial update; `None` keeps the stored value
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ThoughtUpdate {
    pub summary: Option<String>,
    pub sentiment: Option<Sentiment>,
    pub confidence: Option<f64>,
}

/// Store statistics
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StoreStats {
    pub total: usize,
    pub sentiment_distribution: BTreeMap<Sentiment, usize>,
}

/// Analyze request
#[derive(Debug, Deserialize)]
pub struct AnalyzeRequest {
    /// Thought to analyze
    pub raw_text: String,
}

/// Entries listing query
#[derive(Debug, Deserialize)]
pub struct EntriesQuery {
    #[serde(default = "default_limit")]
    pub limit: usize,

    #[serde(default)]
    pub offset: usize,

    /// Only entries with this sentiment
    pub sentiment: Option<Sentiment>,
}

fn default_limit() -> usize {
    100
}

/// Entries listing response
#[derive(Debug, Serialize, Deserialize)]
pub struct EntriesResponse {
    /// Total stored thoughts (before pagination or filtering)
    pub total: usize,
    pub entries: Vec<ThoughtRecord>,
}

/// Similar thoughts query
#[derive(Debug, Deserialize)]
pub struct SimilarQuery {
    pub q: String,

    #[serde(default = "default_similar_limit")]
    pub limit: usize,
}

fn default_similar_limit() -> usize {
    sentiment_space_llm::DEFAULT_SIMILAR_LIMIT
}

/// Export request; no ids exports everything
#[derive(Debug, Default, Deserialize)]
pub struct ExportRequest {
    #[serde(default)]
    pub thought_ids: Option<Vec<u64>>,
}

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub model_available: bool,
}

/// Generic success response
#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
    pub message: Option<String>,
}

/// Error body returned by every failing route
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// HTTP wrapper around [`SentimentSpaceError`]
#[derive(Debug)]
pub struct ApiError(pub SentimentSpaceError);

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl From<SentimentSpaceError> for ApiError {
    fn from(err: SentimentSpaceError) -> Self {
        Self(err)
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        StatusCode::from_u16(self.0.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(ErrorResponse {
            error: self.0.to_string(),
        })
    }
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;

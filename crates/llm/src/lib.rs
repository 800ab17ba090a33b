//! Sentiment Space LLM Integration
//!
//! Local llama.cpp inference and the thought analysis pipeline

mod history;
mod llamacpp;
mod normalize;
mod pipeline;
pub mod prompts;
mod provider;
mod services;
mod types;

pub use history::{word_set, History};
pub use llamacpp::{resolve_weights, LlamaCppProvider};
pub use normalize::{
    is_trivially_short, normalize_confidence, normalize_sentiment, normalize_summary, Fallback,
    Normalized, DEFAULT_CONFIDENCE,
};
pub use pipeline::{
    Analysis, AnalysisPipeline, PipelineOptions, ThoughtAnalyzer, DEFAULT_SIMILAR_LIMIT,
};
pub use provider::{Generation, LoadStatus, MockReason, TextGenerator, MOCK_RESPONSE};
pub use services::{
    SentimentAnalyzer, SentimentReport, Summarizer, SummaryReport, DEFAULT_SUMMARY_MAX_LENGTH,
};
pub use types::{
    AnalysisResult, Classification, ContextSummary, GenerateOptions, HistoryEntry, ModelInfo,
    Sentiment,
};

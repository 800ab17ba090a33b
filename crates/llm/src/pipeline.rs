//! Three-step analysis over a single text-generation model
//!
//! summarize → classify → estimate confidence (conditioned on the label).
//! None of the steps can fail; each one degrades to a documented default.

use async_trait::async_trait;
use chrono::Utc;
use sentiment_space_common::metrics::ops;
use sentiment_space_common::{AppConfig, LatencyTracker};
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::history::History;
use crate::normalize::{
    is_trivially_short, normalize_confidence, normalize_sentiment, normalize_summary, Fallback,
    Normalized,
};
use crate::prompts::{classify_prompt, confidence_prompt, summarize_prompt, truncate_chars};
use crate::provider::TextGenerator;
use crate::types::{
    AnalysisResult, Classification, ContextSummary, GenerateOptions, HistoryEntry, Sentiment,
};

/// (max_new_tokens, temperature) per step
const SUMMARY_STEP: (usize, f32) = (100, 0.3);
const CLASSIFY_STEP: (usize, f32) = (10, 0.1);
const CONFIDENCE_STEP: (usize, f32) = (5, 0.1);

/// Characters of input shown in log lines
const LOG_PREVIEW_CHARS: usize = 50;

/// Default number of similar thoughts returned
pub const DEFAULT_SIMILAR_LIMIT: usize = 3;

/// Pipeline tuning
#[derive(Debug, Clone, Copy)]
pub struct PipelineOptions {
    /// History entries kept (0 = unbounded)
    pub history_capacity: usize,

    /// Upper bound on any step's token budget
    pub max_new_tokens: usize,

    /// Nucleus sampling parameter for every step
    pub top_p: f32,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            history_capacity: 1000,
            max_new_tokens: 256,
            top_p: 0.95,
        }
    }
}

impl PipelineOptions {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            history_capacity: config.history_capacity,
            max_new_tokens: config.llm.max_new_tokens,
            top_p: config.llm.top_p,
        }
    }
}

/// Result plus the defaults that were substituted while producing it
#[derive(Debug, Clone)]
pub struct Analysis {
    pub result: AnalysisResult,
    pub fallbacks: Vec<Fallback>,
}

impl Analysis {
    pub fn is_degraded(&self) -> bool {
        !self.fallbacks.is_empty()
    }
}

/// Narrow contract for services that only need summaries and labels
#[async_trait]
pub trait ThoughtAnalyzer: Send + Sync {
    /// One or two sentence summary
    async fn summarize(&self, text: &str) -> String;

    /// Sentiment label and how confident it is
    async fn classify(&self, text: &str) -> Classification;
}

/// Orchestrates the analysis steps and keeps a bounded history
pub struct AnalysisPipeline {
    generator: Arc<dyn TextGenerator>,
    history: RwLock<History>,
    tracker: Option<Arc<LatencyTracker>>,
    options: PipelineOptions,
}

impl AnalysisPipeline {
    /// Create pipeline over a shared generator
    pub fn new(generator: Arc<dyn TextGenerator>, options: PipelineOptions) -> Self {
        info!(
            "Initialized analysis pipeline (history capacity: {}, model available: {})",
            options.history_capacity,
            generator.is_available()
        );

        Self {
            generator,
            history: RwLock::new(History::new(options.history_capacity)),
            tracker: None,
            options,
        }
    }

    /// Record step latencies into `tracker`
    pub fn with_tracker(mut self, tracker: Arc<LatencyTracker>) -> Self {
        self.tracker = Some(tracker);
        self
    }

    /// The generator this pipeline runs on
    pub fn generator(&self) -> &Arc<dyn TextGenerator> {
        &self.generator
    }

    /// Analyze and remember the result
    pub async fn analyze(&self, text: &str) -> AnalysisResult {
        self.analyze_with(text, true).await.result
    }

    /// Analyze; `track_memory` controls whether the result enters history
    pub async fn analyze_with(&self, text: &str, track_memory: bool) -> Analysis {
        info!("Analyzing text: {}...", truncate_chars(text, LOG_PREVIEW_CHARS));
        let started = Instant::now();

        let summary = self.timed(ops::SUMMARIZATION, self.summarize(text)).await;
        let sentiment = self
            .timed(ops::SENTIMENT_ANALYSIS, self.classify_sentiment(text))
            .await;
        let confidence = self
            .timed(
                ops::CONFIDENCE_ESTIMATION,
                self.estimate_confidence(text, sentiment.value),
            )
            .await;

        if let Some(tracker) = &self.tracker {
            tracker.record(ops::ANALYSIS, started.elapsed());
        }

        let fallbacks: Vec<Fallback> = [summary.fallback, sentiment.fallback, confidence.fallback]
            .into_iter()
            .flatten()
            .collect();
        if !fallbacks.is_empty() {
            debug!("Analysis degraded: {:?}", fallbacks);
        }

        let result = AnalysisResult {
            summary: summary.value,
            sentiment: sentiment.value,
            confidence: confidence.value,
            timestamp: Utc::now(),
        };

        if track_memory {
            let mut history = self.history.write().await;
            if let Some(evicted) = history.push(HistoryEntry {
                text: text.to_string(),
                result: result.clone(),
            }) {
                debug!("Evicted oldest history entry from {}", evicted.result.timestamp);
            }
            info!("Stored in memory. Total entries: {}", history.len());
        }

        Analysis { result, fallbacks }
    }

    /// Summary step; short inputs skip generation
    pub async fn summarize(&self, text: &str) -> Normalized<String> {
        if is_trivially_short(text) {
            return Normalized::accepted(text.to_string());
        }

        let generation = self
            .generator
            .generate(&summarize_prompt(text), &self.step_options(SUMMARY_STEP))
            .await;
        normalize_summary(text, generation.text())
    }

    /// Classification step
    pub async fn classify_sentiment(&self, text: &str) -> Normalized<Sentiment> {
        let generation = self
            .generator
            .generate(&classify_prompt(text), &self.step_options(CLASSIFY_STEP))
            .await;
        normalize_sentiment(generation.text())
    }

    /// Confidence step for an already-chosen label
    pub async fn estimate_confidence(&self, text: &str, sentiment: Sentiment) -> Normalized<f64> {
        let generation = self
            .generator
            .generate(
                &confidence_prompt(text, sentiment),
                &self.step_options(CONFIDENCE_STEP),
            )
            .await;
        normalize_confidence(generation.text())
    }

    /// Entry count, sentiment distribution and last timestamp of history
    pub async fn context_summary(&self) -> ContextSummary {
        self.history.read().await.summary()
    }

    /// Drop all history entries
    pub async fn clear_memory(&self) {
        self.history.write().await.clear();
        info!("Cleared pipeline memory");
    }

    /// Past thoughts sharing the most words with `query`
    pub async fn similar_thoughts(&self, query: &str, limit: usize) -> Vec<HistoryEntry> {
        self.history.read().await.similar(query, limit)
    }

    /// Snapshot of history, oldest first
    pub async fn history(&self) -> Vec<HistoryEntry> {
        self.history.read().await.iter().cloned().collect()
    }

    fn step_options(&self, (max_new_tokens, temperature): (usize, f32)) -> GenerateOptions {
        GenerateOptions {
            max_new_tokens: max_new_tokens.min(self.options.max_new_tokens),
            temperature,
            top_p: self.options.top_p,
        }
    }

    async fn timed<F, T>(&self, operation: &str, fut: F) -> T
    where
        F: Future<Output = T>,
    {
        match &self.tracker {
            Some(tracker) => tracker.measure(operation, fut).await,
            None => fut.await,
        }
    }
}

#[async_trait]
impl ThoughtAnalyzer for AnalysisPipeline {
    async fn summarize(&self, text: &str) -> String {
        AnalysisPipeline::summarize(self, text).await.into_value()
    }

    async fn classify(&self, text: &str) -> Classification {
        let sentiment = self.classify_sentiment(text).await.value;
        let confidence = self.estimate_confidence(text, sentiment).await.value;
        Classification {
            sentiment,
            confidence,
        }
    }
}

use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

use crate::pipeline::ThoughtAnalyzer;
use crate::types::Sentiment;

/// Non-blank characters required before a summary is attempted
pub const MIN_SUMMARIZABLE_CHARS: usize = 20;

/// Default cap on summary length (characters)
pub const DEFAULT_SUMMARY_MAX_LENGTH: usize = 150;

/// Summary with size metadata
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryReport {
    pub summary: String,
    pub is_original: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_length: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary_length: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compression_ratio: Option<f64>,
}

/// Sentiment label with a human-readable explanation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SentimentReport {
    pub sentiment: Sentiment,
    pub confidence: f64,
    pub explanation: String,
}

/// Summaries of longer thoughts
pub struct Summarizer {
    analyzer: Arc<dyn ThoughtAnalyzer>,
}

impl Summarizer {
    pub fn new(analyzer: Arc<dyn ThoughtAnalyzer>) -> Self {
        Self { analyzer }
    }

    /// Summarize `text`, truncating the summary to `max_length` characters
    pub async fn summarize(&self, text: &str, max_length: usize) -> SummaryReport {
        if text.trim().chars().count() < MIN_SUMMARIZABLE_CHARS {
            debug!("Text too short to summarize ({} chars)", text.chars().count());
            return SummaryReport {
                summary: text.to_string(),
                is_original: true,
                reason: Some("Text too short to summarize".to_string()),
                original_length: None,
                summary_length: None,
                compression_ratio: None,
            };
        }

        let summary = self.analyzer.summarize(text).await;
        let original_length = text.chars().count();
        let summary_length = summary.chars().count();

        SummaryReport {
            is_original: summary == text,
            summary: summary.chars().take(max_length).collect(),
            reason: None,
            original_length: Some(original_length),
            summary_length: Some(summary_length),
            compression_ratio: Some(summary_length as f64 / original_length as f64),
        }
    }
}

/// Sentiment classification with explanations
pub struct SentimentAnalyzer {
    analyzer: Arc<dyn ThoughtAnalyzer>,
}

impl SentimentAnalyzer {
    pub fn new(analyzer: Arc<dyn ThoughtAnalyzer>) -> Self {
        Self { analyzer }
    }

    pub async fn analyze(&self, text: &str) -> SentimentReport {
        if text.trim().is_empty() {
            return SentimentReport {
                sentiment: Sentiment::Neutral,
                confidence: 0.0,
                explanation: "Text is empty".to_string(),
            };
        }

        let classification = self.analyzer.classify(text).await;
        SentimentReport {
            sentiment: classification.sentiment,
            confidence: classification.confidence,
            explanation: explain(classification.sentiment).to_string(),
        }
    }
}

fn explain(sentiment: Sentiment) -> &'static str {
    match sentiment {
        Sentiment::Positive => "Contains positive language and optimistic tone",
        Sentiment::Negative => "Contains negative language or critical tone",
        Sentiment::Neutral => "Neutral or balanced sentiment",
    }
}

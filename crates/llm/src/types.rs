use chrono::{DateTime, Utc};
use sentiment_space_common::{Device, LlmSettings, Quantization};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

/// Canonical sentiment labels
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    Neutral,
    Negative,
}

impl Sentiment {
    pub const ALL: [Sentiment; 3] = [Sentiment::Positive, Sentiment::Neutral, Sentiment::Negative];

    /// Lower-case label as prompted and stored
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Positive => "positive",
            Self::Neutral => "neutral",
            Self::Negative => "negative",
        }
    }

    /// Exact match against a canonical label
    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.as_str() == label)
    }
}

impl fmt::Display for Sentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sampling parameters for a single generation
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GenerateOptions {
    /// Maximum tokens to generate
    pub max_new_tokens: usize,

    /// Temperature (0.0 = greedy)
    pub temperature: f32,

    /// Top-p sampling
    pub top_p: f32,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self {
            max_new_tokens: 256,
            temperature: 0.7,
            top_p: 0.95,
        }
    }
}

impl From<&LlmSettings> for GenerateOptions {
    fn from(settings: &LlmSettings) -> Self {
        Self {
            max_new_tokens: settings.max_new_tokens,
            temperature: settings.temperature,
            top_p: settings.top_p,
        }
    }
}

/// Result of analysing one thought
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    /// One or two sentence summary
    pub summary: String,

    /// Sentiment label
    pub sentiment: Sentiment,

    /// Confidence in the sentiment, always within [0, 1]
    pub confidence: f64,

    /// Capture time
    pub timestamp: DateTime<Utc>,
}

/// A past analysis kept in pipeline memory
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Original text
    pub text: String,

    #[serde(flatten)]
    pub result: AnalysisResult,
}

/// Aggregate view over pipeline memory
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ContextSummary {
    pub total_entries: usize,
    pub sentiments: BTreeMap<Sentiment, usize>,
    pub last_analyzed: Option<DateTime<Utc>>,
}

/// Sentiment label together with its confidence
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Classification {
    pub sentiment: Sentiment,
    pub confidence: f64,
}

/// Diagnostic snapshot of the model provider
#[derive(Debug, Clone, Serialize)]
pub struct ModelInfo {
    /// Model identifier
    pub name: String,

    /// Whether real inference is available
    pub available: bool,

    /// Configured quantization
    pub quantization: Quantization,

    /// Configured device
    pub device: Device,

    /// Resolved GGUF weights file, once loaded
    pub weights: Option<PathBuf>,

    /// Why loading failed, if it did
    pub load_error: Option<String>,
}

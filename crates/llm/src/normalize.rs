//! Coercion of raw model output into typed, validated values
//!
//! Every normalizer has a safe default and reports when it had to use it.

use serde::Serialize;
use tracing::warn;

use crate::prompts::truncate_chars;
use crate::types::Sentiment;

/// Inputs shorter than this (in characters) are their own summary
pub const MIN_SUMMARY_INPUT_CHARS: usize = 10;

/// Characters of input used when the model gives an empty summary
pub const SUMMARY_FALLBACK_CHARS: usize = 100;

/// Confidence used when the model output is not a number
pub const DEFAULT_CONFIDENCE: f64 = 0.5;

/// Why a normalizer substituted its default
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "raw", rename_all = "snake_case")]
pub enum Fallback {
    /// Summary was empty after keeping the first line
    EmptySummary,
    /// Sentiment was not exactly one of the canonical labels
    UnknownLabel(String),
    /// Confidence did not parse as a number
    UnparsableNumber(String),
}

/// A normalized value and whether it came from the default path
#[derive(Debug, Clone, PartialEq)]
pub struct Normalized<T> {
    pub value: T,
    pub fallback: Option<Fallback>,
}

impl<T> Normalized<T> {
    pub(crate) fn accepted(value: T) -> Self {
        Self { value, fallback: None }
    }

    fn defaulted(value: T, fallback: Fallback) -> Self {
        Self {
            value,
            fallback: Some(fallback),
        }
    }

    pub fn is_fallback(&self) -> bool {
        self.fallback.is_some()
    }

    pub fn into_value(self) -> T {
        self.value
    }
}

/// Whether `text` is too short to be worth summarizing
pub fn is_trivially_short(text: &str) -> bool {
    text.chars().count() < MIN_SUMMARY_INPUT_CHARS
}

/// First line of the generated text, or a prefix of the original
pub fn normalize_summary(original: &str, generated: &str) -> Normalized<String> {
    let first_line = generated.lines().next().unwrap_or("").trim();

    if first_line.is_empty() {
        warn!("Empty summary from model, using original text prefix");
        return Normalized::defaulted(
            truncate_chars(original, SUMMARY_FALLBACK_CHARS).to_string(),
            Fallback::EmptySummary,
        );
    }

    Normalized::accepted(first_line.to_string())
}

/// Exact canonical label after trim + lower-case, otherwise neutral
pub fn normalize_sentiment(generated: &str) -> Normalized<Sentiment> {
    let label = generated.trim().to_lowercase();

    match Sentiment::from_label(&label) {
        Some(sentiment) => Normalized::accepted(sentiment),
        None => {
            warn!("Invalid sentiment response: {:?}", generated);
            Normalized::defaulted(Sentiment::Neutral, Fallback::UnknownLabel(generated.to_string()))
        }
    }
}

/// Parsed number clamped into [0, 1], otherwise 0.5
pub fn normalize_confidence(generated: &str) -> Normalized<f64> {
    match generated.trim().parse::<f64>() {
        Ok(value) if !value.is_nan() => Normalized::accepted(value.clamp(0.0, 1.0)),
        _ => {
            warn!("Failed to parse confidence: {:?}", generated);
            Normalized::defaulted(
                DEFAULT_CONFIDENCE,
                Fallback::UnparsableNumber(generated.to_string()),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::MOCK_RESPONSE;

    #[test]
    fn test_short_text_threshold() {
        assert!(is_trivially_short("ok"));
        assert!(is_trivially_short("123456789"));
        assert!(!is_trivially_short("1234567890"));
        // counted in characters, not bytes
        assert!(is_trivially_short("ééééé"));
    }

    #[test]
    fn test_summary_keeps_first_line() {
        let summary = normalize_summary(
            "original thought text",
            "  The writer is excited about the trip.  \nSecond line\nThird",
        );
        assert_eq!(summary.value, "The writer is excited about the trip.");
        assert!(!summary.is_fallback());
    }

    #[test]
    fn test_empty_summary_falls_back_to_prefix() {
        let original = "x".repeat(300);
        let summary = normalize_summary(&original, "   \n more text after a blank line");
        assert_eq!(summary.value, "x".repeat(SUMMARY_FALLBACK_CHARS));
        assert_eq!(summary.fallback, Some(Fallback::EmptySummary));

        let summary = normalize_summary("short original", "");
        assert_eq!(summary.value, "short original");
    }

    #[test]
    fn test_sentiment_whitelist() {
        assert_eq!(normalize_sentiment("positive").value, Sentiment::Positive);
        assert_eq!(normalize_sentiment("  NEGATIVE\n").value, Sentiment::Negative);
        assert_eq!(normalize_sentiment("Neutral").value, Sentiment::Neutral);
        assert!(!normalize_sentiment("Neutral").is_fallback());
    }

    #[test]
    fn test_sentiment_near_misses_become_neutral() {
        for raw in ["Positive.", "very negative", "joyful", "", MOCK_RESPONSE] {
            let result = normalize_sentiment(raw);
            assert_eq!(result.value, Sentiment::Neutral, "raw: {:?}", raw);
            assert_eq!(result.fallback, Some(Fallback::UnknownLabel(raw.to_string())));
        }
    }

    #[test]
    fn test_sentiment_normalization_is_idempotent() {
        for sentiment in Sentiment::ALL {
            let once = normalize_sentiment(sentiment.as_str()).value;
            let twice = normalize_sentiment(once.as_str()).value;
            assert_eq!(once, sentiment);
            assert_eq!(twice, sentiment);
        }
    }

    #[test]
    fn test_confidence_clamp() {
        assert_eq!(normalize_confidence("1.7").value, 1.0);
        assert_eq!(normalize_confidence("-0.3").value, 0.0);
        assert_eq!(normalize_confidence(" 0.82 ").value, 0.82);
        assert_eq!(normalize_confidence("inf").value, 1.0);
        assert!(!normalize_confidence("1.7").is_fallback());
    }

    #[test]
    fn test_confidence_parse_failure() {
        for raw in ["abc", "", "0.8 (fairly sure)", "NaN", MOCK_RESPONSE] {
            let result = normalize_confidence(raw);
            assert_eq!(result.value, DEFAULT_CONFIDENCE, "raw: {:?}", raw);
            assert!(result.is_fallback());
        }
    }
}

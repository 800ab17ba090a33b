//! Prompt templates for the three analysis steps

use crate::types::Sentiment;

/// Characters of input text placed into any prompt
pub const PROMPT_TEXT_CHARS: usize = 512;

/// Prompt for a one or two sentence summary
pub fn summarize_prompt(text: &str) -> String {
    format!(
        "Please provide a concise summary (1-2 sentences) of the following thought:\n\nThought: {}\n\nSummary:",
        truncate_chars(text, PROMPT_TEXT_CHARS)
    )
}

/// Prompt asking for exactly one sentiment label
pub fn classify_prompt(text: &str) -> String {
    format!(
        "Analyze the sentiment of the following text.\nRespond with ONLY one word: positive, neutral, or negative.\n\nText: {}\n\nSentiment:",
        truncate_chars(text, PROMPT_TEXT_CHARS)
    )
}

/// Prompt asking how confident the given label is
pub fn confidence_prompt(text: &str, sentiment: Sentiment) -> String {
    format!(
        "The sentiment of the following text was classified as {}.\nOn a scale of 0-1, how confident are you in that sentiment? Respond with only a number.\n\nText: {}\n\nConfidence (0-1):",
        sentiment,
        truncate_chars(text, PROMPT_TEXT_CHARS)
    )
}

/// First `max_chars` characters of `text`, on a char boundary
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("hello", 10), "hello");
        assert_eq!(truncate_chars("hello", 3), "hel");
        assert_eq!(truncate_chars("", 3), "");
        // multi-byte characters are never split
        assert_eq!(truncate_chars("héllo wörld", 7), "héllo w");
        assert_eq!(truncate_chars("기분이 좋다", 3), "기분이");
    }

    #[test]
    fn test_prompts_embed_truncated_text() {
        let long = "a".repeat(2000);
        let prompt = summarize_prompt(&long);
        assert!(prompt.contains(&"a".repeat(PROMPT_TEXT_CHARS)));
        assert!(!prompt.contains(&"a".repeat(PROMPT_TEXT_CHARS + 1)));
        assert!(prompt.ends_with("Summary:"));
    }

    #[test]
    fn test_classify_prompt_lists_labels() {
        let prompt = classify_prompt("Rainy again.");
        assert!(prompt.contains("positive, neutral, or negative"));
        assert!(prompt.contains("Text: Rainy again."));
    }

    #[test]
    fn test_confidence_prompt_is_sentiment_conditioned() {
        let prompt = confidence_prompt("Rainy again.", Sentiment::Negative);
        assert!(prompt.contains("classified as negative"));
        assert!(prompt.ends_with("Confidence (0-1):"));
    }
}

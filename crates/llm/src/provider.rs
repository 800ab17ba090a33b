use async_trait::async_trait;
use serde::Serialize;

use crate::types::{GenerateOptions, ModelInfo};

/// Text returned whenever real inference is not possible
pub const MOCK_RESPONSE: &str =
    "Mock response: The model is not available. Install dependencies to enable full inference.";

/// Why a generation fell back to the mock response
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum MockReason {
    /// Model never loaded or failed to load
    Unavailable,
    /// Model was loaded but inference failed
    GenerationFailed(String),
}

/// Outcome of a generation request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Generation {
    /// Text sampled from the model
    Model(String),
    /// Placeholder text
    Mock(MockReason),
}

impl Generation {
    pub fn unavailable() -> Self {
        Self::Mock(MockReason::Unavailable)
    }

    pub fn failed(detail: impl Into<String>) -> Self {
        Self::Mock(MockReason::GenerationFailed(detail.into()))
    }

    /// Generated text, or the mock response
    pub fn text(&self) -> &str {
        match self {
            Self::Model(text) => text,
            Self::Mock(_) => MOCK_RESPONSE,
        }
    }

    pub fn is_mock(&self) -> bool {
        matches!(self, Self::Mock(_))
    }
}

/// Outcome of a model load attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum LoadStatus {
    Available,
    Unavailable(String),
}

impl LoadStatus {
    pub fn is_available(&self) -> bool {
        matches!(self, Self::Available)
    }
}

/// Opaque text-completion capability
///
/// Implementations never fail: problems surface as [`Generation::Mock`].
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Whether real inference is available
    fn is_available(&self) -> bool;

    /// Generate a completion for `prompt`
    async fn generate(&self, prompt: &str, options: &GenerateOptions) -> Generation;

    /// Diagnostic snapshot
    fn model_info(&self) -> ModelInfo;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_text() {
        assert_eq!(Generation::unavailable().text(), MOCK_RESPONSE);
        assert_eq!(Generation::failed("decode error").text(), MOCK_RESPONSE);
        assert!(Generation::failed("decode error").is_mock());
        assert_eq!(Generation::Model("positive".into()).text(), "positive");
        assert!(!Generation::Model("positive".into()).is_mock());
    }

    #[test]
    fn test_load_status_serialization() {
        let json = serde_json::to_value(LoadStatus::Unavailable("no weights".into())).unwrap();
        assert_eq!(json["status"], "unavailable");
        assert_eq!(json["reason"], "no weights");
    }
}

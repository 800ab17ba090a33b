pub mod config;
pub mod error;
pub mod logger;
pub mod metrics;

// Re-export commonly used types
pub use config::{AppConfig, Device, LlmSettings, Quantization};
pub use error::SentimentSpaceError;
pub use metrics::{LatencyReport, LatencyTracker, Measurement};
pub type Result<T> = std::result::Result<T, SentimentSpaceError>;

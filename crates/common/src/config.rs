use crate::error::SentimentSpaceError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Weight quantization of the local model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Quantization {
    /// 4-bit weights (Q4_* GGUF files)
    Int4,
    /// 8-bit weights (Q8_* GGUF files)
    Int8,
    /// Unquantized F16/F32 weights
    Full,
}

impl Quantization {
    /// Filename tags that identify a GGUF file of this quantization
    pub fn gguf_tags(&self) -> &'static [&'static str] {
        match self {
            Self::Int4 => &["q4"],
            Self::Int8 => &["q8"],
            Self::Full => &["f32", "f16", "bf16"],
        }
    }
}

impl FromStr for Quantization {
    type Err = SentimentSpaceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "int4" | "q4" | "4bit" | "4-bit" => Ok(Self::Int4),
            "int8" | "q8" | "8bit" | "8-bit" => Ok(Self::Int8),
            "float32" | "f32" | "float16" | "f16" | "full" => Ok(Self::Full),
            other => Err(SentimentSpaceError::config(format!(
                "Unknown quantization '{}' (expected int4, int8 or float32)",
                other
            ))),
        }
    }
}

impl fmt::Display for Quantization {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int4 => write!(f, "int4"),
            Self::Int8 => write!(f, "int8"),
            Self::Full => write!(f, "float32"),
        }
    }
}

/// Compute device the model is offloaded to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Device {
    /// CPU execution
    Cpu,
    /// NVIDIA GPU via CUDA
    Cuda,
    /// Apple GPU via Metal
    Metal,
}

impl FromStr for Device {
    type Err = SentimentSpaceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "cpu" => Ok(Self::Cpu),
            "cuda" | "gpu" => Ok(Self::Cuda),
            "metal" | "mps" => Ok(Self::Metal),
            other => Err(SentimentSpaceError::config(format!(
                "Unknown device '{}' (expected cpu, cuda or metal)",
                other
            ))),
        }
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cpu => write!(f, "cpu"),
            Self::Cuda => write!(f, "cuda"),
            Self::Metal => write!(f, "metal"),
        }
    }
}

/// Local model settings, read once when the provider is constructed
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmSettings {
    /// Model identifier reported in diagnostics
    pub model_name: String,

    /// GGUF weights file, or a directory containing one
    pub model_path: PathBuf,

    /// Weight quantization
    pub quantization: Quantization,

    /// Target device
    pub device: Device,

    /// Upper bound on new tokens for any single generation
    pub max_new_tokens: usize,

    /// Default sampling temperature
    pub temperature: f32,

    /// Nucleus sampling parameter
    pub top_p: f32,

    /// Prompt tokens kept before truncation
    pub context_tokens: usize,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            model_name: "llama-3-8b-instruct".to_string(),
            model_path: PathBuf::from("./models"),
            quantization: Quantization::Int4,
            device: Device::Cpu,
            max_new_tokens: 256,
            temperature: 0.7,
            top_p: 0.95,
            context_tokens: 512,
        }
    }
}

/// Sentiment Space application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Data directory
    pub data_dir: PathBuf,

    /// Thought store file
    pub store_path: PathBuf,

    /// Log directory
    pub log_dir: PathBuf,

    /// Log level
    pub log_level: String,

    /// Server bind address
    pub server_host: String,

    /// Server port
    pub server_port: u16,

    /// Local model settings
    pub llm: LlmSettings,

    /// Pipeline history entries kept in memory (0 = unbounded)
    pub history_capacity: usize,

    /// Log every latency measurement
    pub log_latency: bool,

    /// Allow exporting stored thoughts
    pub export_enabled: bool,

    /// Export target directory
    pub export_dir: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            store_path: PathBuf::from("./data/thoughts.json"),
            log_dir: PathBuf::from("./data/log"),
            log_level: "info".to_string(),
            server_host: "127.0.0.1".to_string(),
            server_port: 8000,
            llm: LlmSettings::default(),
            history_capacity: 1000,
            log_latency: true,
            export_enabled: false,
            export_dir: PathBuf::from("./data/exports"),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables and .env file
    pub fn from_env() -> Result<Self, SentimentSpaceError> {
        // Load .env file (ignore if not exists)
        let _ = dotenv::dotenv();

        let config = Self::from_vars(|key| std::env::var(key).ok())?;
        config.validate()?;

        // Ensure required directories exist
        config.ensure_directories()?;

        Ok(config)
    }

    /// Build configuration from an arbitrary variable lookup
    pub fn from_vars<F>(var: F) -> Result<Self, SentimentSpaceError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let data_dir = var("DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.data_dir);

        let quantization = match var("LLM_QUANTIZATION") {
            Some(raw) => raw.parse()?,
            None => defaults.llm.quantization,
        };
        let device = match var("LLM_DEVICE") {
            Some(raw) => raw.parse()?,
            None => defaults.llm.device,
        };

        let llm = LlmSettings {
            model_name: var("LLM_MODEL_NAME").unwrap_or(defaults.llm.model_name),
            model_path: var("LLM_MODEL_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.llm.model_path),
            quantization,
            device,
            max_new_tokens: parse_or(&var, "LLM_MAX_NEW_TOKENS", defaults.llm.max_new_tokens),
            temperature: parse_or(&var, "LLM_TEMPERATURE", defaults.llm.temperature),
            top_p: parse_or(&var, "LLM_TOP_P", defaults.llm.top_p),
            context_tokens: parse_or(&var, "LLM_CONTEXT_TOKENS", defaults.llm.context_tokens),
        };

        Ok(Self {
            store_path: var("STORE_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| data_dir.join("thoughts.json")),
            log_dir: var("LOG_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| data_dir.join("log")),
            log_level: var("LOG_LEVEL").unwrap_or(defaults.log_level),
            server_host: var("SERVER_HOST").unwrap_or(defaults.server_host),
            server_port: parse_or(&var, "SERVER_PORT", defaults.server_port),
            llm,
            history_capacity: parse_or(&var, "HISTORY_CAPACITY", defaults.history_capacity),
            log_latency: flag_or(&var, "LOG_LATENCY", defaults.log_latency),
            export_enabled: flag_or(&var, "EXPORT_ENABLED", defaults.export_enabled),
            export_dir: var("EXPORT_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| data_dir.join("exports")),
            data_dir,
        })
    }

    /// Ensure required directories exist, create if not
    pub fn ensure_directories(&self) -> Result<(), SentimentSpaceError> {
        let mut dirs = vec![&self.data_dir, &self.log_dir];
        if self.export_enabled {
            dirs.push(&self.export_dir);
        }

        for dir in dirs {
            if !dir.exists() {
                std::fs::create_dir_all(dir).map_err(|e| {
                    SentimentSpaceError::config(format!(
                        "Failed to create directory {}: {}",
                        dir.display(),
                        e
                    ))
                })?;
            }
        }

        Ok(())
    }

    /// Get server bind address (host:port)
    pub fn server_bind_address(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), SentimentSpaceError> {
        if self.llm.model_name.trim().is_empty() {
            return Err(SentimentSpaceError::config("LLM model name cannot be empty"));
        }

        if self.server_port == 0 {
            return Err(SentimentSpaceError::config("Server port cannot be 0"));
        }

        if !self.llm.temperature.is_finite() || self.llm.temperature < 0.0 {
            return Err(SentimentSpaceError::config(
                "LLM temperature must be a non-negative number",
            ));
        }

        if !(self.llm.top_p > 0.0 && self.llm.top_p <= 1.0) {
            return Err(SentimentSpaceError::config("LLM top_p must be in (0, 1]"));
        }

        if self.llm.max_new_tokens == 0 || self.llm.context_tokens == 0 {
            return Err(SentimentSpaceError::config(
                "LLM token budgets must be greater than 0",
            ));
        }

        Ok(())
    }
}

fn parse_or<F, T>(var: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    var(key)
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}

fn flag_or<F>(var: &F, key: &str, default: bool) -> bool
where
    F: Fn(&str) -> Option<String>,
{
    var(key)
        .map(|s| matches!(s.trim().to_lowercase().as_str(), "true" | "1" | "yes"))
        .unwrap_or(default)
}

use async_trait::async_trait;
use llama_cpp_2::context::params::LlamaContextParams;
use llama_cpp_2::llama_backend::LlamaBackend;
use llama_cpp_2::llama_batch::LlamaBatch;
use llama_cpp_2::model::params::LlamaModelParams;
use llama_cpp_2::model::LlamaModel;
use llama_cpp_2::sampling::LlamaSampler;
use llama_cpp_2::LogOptions;
use sentiment_space_common::{Device, LlmSettings, Quantization, Result, SentimentSpaceError};
use std::num::NonZeroU32;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, OnceLock, PoisonError};
use tokio::sync::OnceCell;
use tracing::{debug, error, info, warn};

use crate::provider::{Generation, LoadStatus, TextGenerator};
use crate::types::{GenerateOptions, ModelInfo};

/// Layers offloaded when a GPU device is selected (more than any supported model has)
const GPU_LAYERS: u32 = 1000;

/// Extra context slots beyond prompt + completion
const CONTEXT_SLACK: usize = 8;

/// llama.cpp may only be initialized once per process
static RUNTIME: OnceLock<std::result::Result<LlamaBackend, String>> = OnceLock::new();

fn runtime() -> Result<&'static LlamaBackend> {
    RUNTIME
        .get_or_init(|| {
            // native loader output goes through tracing like everything else
            llama_cpp_2::send_logs_to_tracing(LogOptions::default());
            LlamaBackend::init().map_err(|e| e.to_string())
        })
        .as_ref()
        .map_err(|e| SentimentSpaceError::llm(format!("llama.cpp backend unavailable: {}", e)))
}

/// Whether this binary was built with support for `device`
fn device_supported(device: Device) -> bool {
    match device {
        Device::Cpu => true,
        Device::Cuda => cfg!(feature = "cuda"),
        Device::Metal => cfg!(feature = "metal") || cfg!(target_os = "macos"),
    }
}

fn gpu_layers(device: Device) -> u32 {
    match device {
        Device::Cpu => 0,
        Device::Cuda | Device::Metal => GPU_LAYERS,
    }
}

/// Find the GGUF weights for `quantization` at `path`
///
/// `path` may name the file directly or a directory holding several
/// quantizations of the same model (e.g. `llama-3-8b.Q4_K_M.gguf`,
/// `llama-3-8b.Q8_0.gguf`).
pub fn resolve_weights(path: &Path, quantization: Quantization) -> Result<PathBuf> {
    if path.is_file() {
        let name = file_name_lower(path);
        if !quantization.gguf_tags().iter().any(|tag| name.contains(tag)) {
            warn!(
                "Weights file {} does not look like a {} quantization",
                path.display(),
                quantization
            );
        }
        return Ok(path.to_path_buf());
    }

    if !path.is_dir() {
        return Err(SentimentSpaceError::llm(format!(
            "Model weights not found: {}",
            path.display()
        )));
    }

    let mut candidates: Vec<PathBuf> = std::fs::read_dir(path)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.is_file())
        .filter(|p| {
            let name = file_name_lower(p);
            name.ends_with(".gguf") && quantization.gguf_tags().iter().any(|tag| name.contains(tag))
        })
        .collect();
    candidates.sort();

    candidates.into_iter().next().ok_or_else(|| {
        SentimentSpaceError::llm(format!(
            "No {} GGUF weights in {}",
            quantization,
            path.display()
        ))
    })
}

/// Keep at most `context_tokens` prompt tokens, dropping from the end
fn fit_prompt<T>(tokens: &mut Vec<T>, context_tokens: usize) -> Result<()> {
    if tokens.len() > context_tokens {
        debug!("Truncating prompt from {} to {} tokens", tokens.len(), context_tokens);
        tokens.truncate(context_tokens);
    }
    if tokens.is_empty() {
        return Err(SentimentSpaceError::llm("Prompt produced no tokens"));
    }
    Ok(())
}

/// Context window for a prompt of `prompt_tokens` plus the completion
fn context_size(prompt_tokens: usize, max_new_tokens: usize) -> u32 {
    let wanted = prompt_tokens
        .saturating_add(max_new_tokens)
        .saturating_add(CONTEXT_SLACK);
    u32::try_from(wanted).unwrap_or(u32::MAX)
}

fn file_name_lower(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_lowercase())
        .unwrap_or_default()
}

/// Model weights plus the lock serializing inference on them
struct LoadedModel {
    model: LlamaModel,
    weights: PathBuf,
    gate: Mutex<()>,
}

impl LoadedModel {
    fn load(settings: &LlmSettings) -> Result<Self> {
        if !device_supported(settings.device) {
            return Err(SentimentSpaceError::llm(format!(
                "Device {} requested but this build has no {} support",
                settings.device, settings.device
            )));
        }

        let weights = resolve_weights(&settings.model_path, settings.quantization)?;
        let runtime = runtime()?;

        info!(
            "Loading {} from {} ({} on {})",
            settings.model_name,
            weights.display(),
            settings.quantization,
            settings.device
        );

        let params = LlamaModelParams::default().with_n_gpu_layers(gpu_layers(settings.device));
        let model = LlamaModel::load_from_file(runtime, &weights, &params)
            .map_err(|e| SentimentSpaceError::llm(format!("Failed to load model: {}", e)))?;

        Ok(Self {
            model,
            weights,
            gate: Mutex::new(()),
        })
    }

    /// Sample a completion; blocks for the whole generation
    fn complete(&self, prompt: &str, options: &GenerateOptions, context_tokens: usize) -> Result<String> {
        let _guard = self.gate.lock().unwrap_or_else(PoisonError::into_inner);
        let runtime = runtime()?;

        let vocab = self.model.vocab();

        // BOS is added when the model asks for it; prompt text is never parsed as control tokens
        let mut tokens = vocab.tokenize(prompt.as_bytes(), true, false);
        fit_prompt(&mut tokens, context_tokens)?;

        let n_ctx = context_size(tokens.len(), options.max_new_tokens);
        let ctx_params = LlamaContextParams::default()
            .with_n_ctx(NonZeroU32::new(n_ctx))
            .with_n_batch(n_ctx);
        let mut ctx = self
            .model
            .new_context(runtime, ctx_params)
            .map_err(|e| SentimentSpaceError::llm(format!("Failed to create context: {}", e)))?;

        let mut batch = LlamaBatch::new(tokens.len(), 1);
        let last = tokens.len() as i32 - 1;
        for (pos, token) in (0_i32..).zip(tokens.iter().copied()) {
            batch
                .add(token, pos, &[0], pos == last)
                .map_err(|e| SentimentSpaceError::llm(format!("Failed to fill batch: {}", e)))?;
        }
        ctx.decode(&mut batch)
            .map_err(|e| SentimentSpaceError::llm(format!("Prompt decode failed: {}", e)))?;

        let mut sampler = if options.temperature <= 0.0 {
            LlamaSampler::greedy()
        } else {
            LlamaSampler::chain_simple([
                LlamaSampler::temp(options.temperature),
                LlamaSampler::top_p(options.top_p, 1),
                LlamaSampler::dist(chrono::Utc::now().timestamp_subsec_nanos()),
            ])
        };

        let mut n_cur = batch.n_tokens();
        let mut output = Vec::new();
        for _ in 0..options.max_new_tokens {
            let token = sampler.sample(&ctx, batch.n_tokens() - 1);
            sampler.accept(token);

            if vocab.is_eog(token) {
                break;
            }

            vocab.token_to_piece_into(token, &mut output, false, None);

            batch.clear();
            batch
                .add(token, n_cur, &[0], true)
                .map_err(|e| SentimentSpaceError::llm(format!("Failed to fill batch: {}", e)))?;
            n_cur += 1;
            ctx.decode(&mut batch)
                .map_err(|e| SentimentSpaceError::llm(format!("Decode failed: {}", e)))?;
        }

        Ok(String::from_utf8_lossy(&output).trim().to_string())
    }
}

/// llama.cpp based model provider
///
/// Loading is attempted at most once; a failed load leaves the provider in
/// mock mode for its whole lifetime.
pub struct LlamaCppProvider {
    settings: LlmSettings,
    state: OnceCell<std::result::Result<Arc<LoadedModel>, String>>,
}

impl LlamaCppProvider {
    /// Create a provider; nothing is loaded until [`load`](Self::load)
    pub fn new(settings: LlmSettings) -> Self {
        info!(
            "Initializing llama.cpp provider - Model: {}, Quantization: {}, Device: {}",
            settings.model_name, settings.quantization, settings.device
        );

        Self {
            settings,
            state: OnceCell::new(),
        }
    }

    /// Attempt to load the model, never failing
    ///
    /// Concurrent and repeated calls share the outcome of the first attempt.
    pub async fn load(&self) -> LoadStatus {
        let outcome = self
            .state
            .get_or_init(|| async {
                let settings = self.settings.clone();
                match tokio::task::spawn_blocking(move || LoadedModel::load(&settings)).await {
                    Ok(Ok(model)) => {
                        info!("Model loaded successfully: {}", model.weights.display());
                        Ok(Arc::new(model))
                    }
                    Ok(Err(e)) => {
                        warn!("Failed to load model: {}", e);
                        warn!("Running in mock mode");
                        Err(e.to_string())
                    }
                    Err(e) => {
                        error!("Model loading task failed: {}", e);
                        Err(format!("Model loading task failed: {}", e))
                    }
                }
            })
            .await;

        match outcome {
            Ok(_) => LoadStatus::Available,
            Err(reason) => LoadStatus::Unavailable(reason.clone()),
        }
    }

    fn loaded(&self) -> Option<&Arc<LoadedModel>> {
        self.state.get().and_then(|outcome| outcome.as_ref().ok())
    }
}

#[async_trait]
impl TextGenerator for LlamaCppProvider {
    fn is_available(&self) -> bool {
        self.loaded().is_some()
    }

    async fn generate(&self, prompt: &str, options: &GenerateOptions) -> Generation {
        let Some(model) = self.loaded() else {
            warn!("Model not available, returning mock response");
            return Generation::unavailable();
        };

        let model = Arc::clone(model);
        let prompt = prompt.to_string();
        let options = *options;
        let context_tokens = self.settings.context_tokens;

        debug!(
            "Generating - Prompt length: {}, max_new_tokens: {}, temperature: {}",
            prompt.len(),
            options.max_new_tokens,
            options.temperature
        );

        match tokio::task::spawn_blocking(move || model.complete(&prompt, &options, context_tokens)).await {
            Ok(Ok(text)) => Generation::Model(text),
            Ok(Err(e)) => {
                error!("Generation error: {}", e);
                Generation::failed(e.to_string())
            }
            Err(e) => {
                error!("Generation task failed: {}", e);
                Generation::failed(e.to_string())
            }
        }
    }

    fn model_info(&self) -> ModelInfo {
        let (weights, load_error) = match self.state.get() {
            Some(Ok(model)) => (Some(model.weights.clone()), None),
            Some(Err(reason)) => (None, Some(reason.clone())),
            None => (None, None),
        };

        ModelInfo {
            name: self.settings.model_name.clone(),
            available: weights.is_some(),
            quantization: self.settings.quantization,
            device: self.settings.device,
            weights,
            load_error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::MockReason;

    fn settings_at(path: &Path) -> LlmSettings {
        LlmSettings {
            model_path: path.to_path_buf(),
            ..LlmSettings::default()
        }
    }

    #[tokio::test]
    async fn test_missing_weights_leave_provider_in_mock_mode() {
        let provider = LlamaCppProvider::new(settings_at(Path::new("nonexistent_model_dir")));
        assert!(!provider.is_available());

        let status = provider.load().await;
        assert!(!status.is_available());
        assert!(!provider.is_available());

        let generation = provider
            .generate("Summarize: hello", &GenerateOptions::default())
            .await;
        assert_eq!(generation, Generation::Mock(MockReason::Unavailable));

        let info = provider.model_info();
        assert!(!info.available);
        assert!(info.load_error.unwrap().contains("not found"));
    }

    #[tokio::test]
    async fn test_load_is_attempted_once() {
        let provider = LlamaCppProvider::new(settings_at(Path::new("nonexistent_model_dir")));
        let first = provider.load().await;
        let second = provider.load().await;
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_generate_before_load_is_mock() {
        let provider = LlamaCppProvider::new(LlmSettings::default());
        let generation = provider.generate("anything", &GenerateOptions::default()).await;
        assert!(generation.is_mock());
        assert!(provider.model_info().load_error.is_none());
    }

    #[cfg(not(feature = "cuda"))]
    #[tokio::test]
    async fn test_unsupported_device_is_unavailable() {
        let provider = LlamaCppProvider::new(LlmSettings {
            device: Device::Cuda,
            ..LlmSettings::default()
        });
        match provider.load().await {
            LoadStatus::Unavailable(reason) => assert!(reason.contains("cuda")),
            LoadStatus::Available => panic!("cuda should not load without the feature"),
        }
    }

    #[test]
    fn test_resolve_weights_by_quantization() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["llama.Q8_0.gguf", "llama.Q4_K_M.gguf", "llama.F16.gguf", "README.md"] {
            std::fs::write(dir.path().join(name), b"").unwrap();
        }

        let q4 = resolve_weights(dir.path(), Quantization::Int4).unwrap();
        assert_eq!(q4.file_name().unwrap(), "llama.Q4_K_M.gguf");

        let q8 = resolve_weights(dir.path(), Quantization::Int8).unwrap();
        assert_eq!(q8.file_name().unwrap(), "llama.Q8_0.gguf");

        let full = resolve_weights(dir.path(), Quantization::Full).unwrap();
        assert_eq!(full.file_name().unwrap(), "llama.F16.gguf");
    }

    #[test]
    fn test_resolve_weights_missing_quantization() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("llama.Q8_0.gguf"), b"").unwrap();
        assert!(resolve_weights(dir.path(), Quantization::Int4).is_err());
    }

    #[test]
    fn test_fit_prompt_truncates_to_context() {
        let mut tokens: Vec<u32> = (0..10).collect();
        fit_prompt(&mut tokens, 4).unwrap();
        assert_eq!(tokens, vec![0, 1, 2, 3]);

        let mut short: Vec<u32> = vec![7, 8];
        fit_prompt(&mut short, 4).unwrap();
        assert_eq!(short, vec![7, 8]);
    }

    #[test]
    fn test_fit_prompt_rejects_empty() {
        let mut empty: Vec<u32> = Vec::new();
        assert!(fit_prompt(&mut empty, 512).is_err());

        let mut zero_budget: Vec<u32> = vec![1, 2, 3];
        assert!(fit_prompt(&mut zero_budget, 0).is_err());
    }

    #[test]
    fn test_context_size_covers_prompt_and_completion() {
        assert_eq!(context_size(100, 150), 100 + 150 + CONTEXT_SLACK as u32);
        assert_eq!(context_size(usize::MAX / 2, usize::MAX / 2), u32::MAX);
    }

    #[test]
    fn test_resolve_weights_accepts_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("custom.gguf");
        std::fs::write(&file, b"").unwrap();
        assert_eq!(resolve_weights(&file, Quantization::Int4).unwrap(), file);
    }
}

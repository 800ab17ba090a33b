use anyhow::Result;
use clap::{Parser, Subcommand};
use sentiment_space_common::{logger, AppConfig, LatencyTracker};
use sentiment_space_llm::{
    AnalysisPipeline, GenerateOptions, LlamaCppProvider, PipelineOptions, TextGenerator,
};
use std::path::PathBuf;
use std::sync::Arc;

/// Find project root by looking for .git directory
fn find_project_root() -> Option<PathBuf> {
    let mut current_dir = std::env::current_dir().ok()?;

    loop {
        if current_dir.join(".git").exists() {
            return Some(current_dir);
        }

        if !current_dir.pop() {
            break;
        }
    }

    None
}

/// Load .env file from project root
fn load_dotenv_from_project_root() {
    if let Some(root) = find_project_root() {
        let env_path = root.join(".env");
        if env_path.exists() {
            dotenv::from_path(&env_path).ok();
        }
    } else {
        // Fallback to default dotenv behavior
        dotenv::dotenv().ok();
    }
}

#[derive(Parser)]
#[command(name = "sentiment-space")]
#[command(about = "Sentiment Space - private thought analysis on a local LLM", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server
    Serve {
        /// Host to bind to (overrides SERVER_HOST)
        #[arg(long)]
        host: Option<String>,

        /// Port to bind to (overrides SERVER_PORT)
        #[arg(long)]
        port: Option<u16>,

        /// Data directory (thought store, logs, exports)
        #[arg(long)]
        data_dir: Option<String>,
    },

    /// Analyze one thought and print the result as JSON
    Analyze {
        /// Thought text
        text: String,
    },

    /// Run a raw completion with the configured sampling settings
    Generate {
        /// Prompt text
        prompt: String,
    },

    /// Print model diagnostics as JSON
    ModelInfo,
}

/// Environment variables set from `serve` flags; absent flags leave the environment alone
fn serve_overrides(
    host: Option<String>,
    port: Option<u16>,
    data_dir: Option<String>,
) -> Vec<(&'static str, String)> {
    let mut overrides = Vec::new();
    if let Some(host) = host {
        overrides.push(("SERVER_HOST", host));
    }
    if let Some(port) = port {
        overrides.push(("SERVER_PORT", port.to_string()));
    }
    if let Some(dir) = data_dir {
        overrides.push(("DATA_DIR", dir));
    }
    overrides
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load environment variables from .env at project root
    // AppConfig::from_env() also loads .env; loading here first lets CLI
    // overrides below win
    load_dotenv_from_project_root();

    match cli.command {
        Some(Commands::Serve {
            host,
            port,
            data_dir,
        }) => {
            // Override with CLI arguments
            for (key, value) in serve_overrides(host, port, data_dir) {
                std::env::set_var(key, value);
            }

            serve(AppConfig::from_env()?).await?;
        }
        Some(Commands::Analyze { text }) => {
            let config = AppConfig::from_env()?;
            logger::setup_console_logging(&config.log_level)?;

            let provider = load_provider(&config).await;
            let tracker = Arc::new(LatencyTracker::new(config.log_latency));
            let pipeline = AnalysisPipeline::new(provider, PipelineOptions::from_config(&config))
                .with_tracker(tracker.clone());

            let analysis = pipeline.analyze_with(&text, false).await;
            println!("{}", serde_json::to_string_pretty(&analysis.result)?);
            tracker.log_report();
        }
        Some(Commands::Generate { prompt }) => {
            let config = AppConfig::from_env()?;
            logger::setup_console_logging(&config.log_level)?;

            let provider = load_provider(&config).await;
            let generation = provider
                .generate(&prompt, &GenerateOptions::from(&config.llm))
                .await;
            println!("{}", generation.text());
        }
        Some(Commands::ModelInfo) => {
            let config = AppConfig::from_env()?;
            logger::setup_console_logging(&config.log_level)?;

            let provider = load_provider(&config).await;
            println!("{}", serde_json::to_string_pretty(&provider.model_info())?);
        }
        None => {
            // Default: start server with default config
            serve(AppConfig::from_env()?).await?;
        }
    }

    Ok(())
}

async fn serve(config: AppConfig) -> Result<()> {
    logger::setup_logging(&config.log_dir, &config.log_level)?;

    tracing::info!("Sentiment Space starting...");
    tracing::info!("Configuration loaded:");
    tracing::info!("  Bind: {}", config.server_bind_address());
    tracing::info!("  Store: {}", config.store_path.display());
    tracing::info!(
        "  Model: {} ({}, {})",
        config.llm.model_name,
        config.llm.quantization,
        config.llm.device
    );

    println!("Server listening on http://{}", config.server_bind_address());

    sentiment_space_server::start_server(config).await?;
    Ok(())
}

async fn load_provider(config: &AppConfig) -> Arc<LlamaCppProvider> {
    let provider = Arc::new(LlamaCppProvider::new(config.llm.clone()));
    provider.load().await;
    provider
}

#[cfg(test)]
mod tests {
    use super::*;

    fn serve_args(args: &[&str]) -> Vec<(&'static str, String)> {
        let cli = Cli::try_parse_from(args).unwrap();
        match cli.command {
            Some(Commands::Serve {
                host,
                port,
                data_dir,
            }) => serve_overrides(host, port, data_dir),
            _ => panic!("expected serve subcommand"),
        }
    }

    #[test]
    fn test_serve_without_flags_keeps_environment() {
        assert!(serve_args(&["sentiment-space", "serve"]).is_empty());
    }

    #[test]
    fn test_serve_port_flag_overrides_only_port() {
        let overrides = serve_args(&["sentiment-space", "serve", "--port", "9000"]);
        assert_eq!(overrides, vec![("SERVER_PORT", "9000".to_string())]);
    }

    #[test]
    fn test_serve_all_flags() {
        let overrides = serve_args(&[
            "sentiment-space",
            "serve",
            "--host",
            "0.0.0.0",
            "--port",
            "8080",
            "--data-dir",
            "/tmp/ss",
        ]);
        assert_eq!(
            overrides,
            vec![
                ("SERVER_HOST", "0.0.0.0".to_string()),
                ("SERVER_PORT", "8080".to_string()),
                ("DATA_DIR", "/tmp/ss".to_string()),
            ]
        );
    }

    #[test]
    fn test_serve_rejects_invalid_port() {
        assert!(Cli::try_parse_from(["sentiment-space", "serve", "--port", "http"]).is_err());
    }
}

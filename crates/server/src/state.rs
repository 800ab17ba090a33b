use sentiment_space_common::{AppConfig, LatencyTracker, Result};
use sentiment_space_llm::{AnalysisPipeline, PipelineOptions, TextGenerator};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::export::Exporter;
use crate::store::ThoughtStore;

/// Shared application state
pub struct AppState {
    /// Application configuration
    pub config: AppConfig,

    /// Analysis pipeline (owns the in-memory history)
    pub pipeline: Arc<AnalysisPipeline>,

    /// Persistent thought store
    pub store: Arc<RwLock<ThoughtStore>>,

    /// Step latencies
    pub tracker: Arc<LatencyTracker>,

    /// Local export target
    pub exporter: Exporter,
}

impl AppState {
    /// Create new application state around an already-loaded generator
    pub fn new(config: AppConfig, generator: Arc<dyn TextGenerator>) -> Result<Self> {
        let store = ThoughtStore::load(&config.store_path)?;
        let tracker = Arc::new(LatencyTracker::new(config.log_latency));
        let pipeline = AnalysisPipeline::new(generator, PipelineOptions::from_config(&config))
            .with_tracker(tracker.clone());
        let exporter = Exporter::new(config.export_enabled, config.export_dir.clone());

        Ok(Self {
            config,
            pipeline: Arc::new(pipeline),
            store: Arc::new(RwLock::new(store)),
            tracker,
            exporter,
        })
    }
}

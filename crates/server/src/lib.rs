//! Sentiment Space HTTP Server
//!
//! Actix-web REST API over the analysis pipeline and the thought store

pub mod export;
pub mod routes;
pub mod state;
pub mod store;
pub mod types;

use actix_cors::Cors;
use actix_web::{web, App, HttpServer};
use sentiment_space_common::{AppConfig, Result};
use sentiment_space_llm::LlamaCppProvider;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_actix_web::TracingLogger;

pub use state::AppState;
pub use store::ThoughtStore;

/// Load the model, build shared state and serve until shutdown
pub async fn start_server(config: AppConfig) -> Result<()> {
    let provider = Arc::new(LlamaCppProvider::new(config.llm.clone()));
    let status = provider.load().await;
    if !status.is_available() {
        warn!("Serving with mock model responses: {:?}", status);
    }

    let bind_address = config.server_bind_address();
    let state = Arc::new(AppState::new(config, provider)?);
    let tracker = state.tracker.clone();

    info!("Starting HTTP server on {}", bind_address);

    HttpServer::new(move || {
        App::new()
            .wrap(Cors::permissive())
            .wrap(TracingLogger::default())
            .app_data(web::Data::new(state.clone()))
            .configure(routes::configure)
    })
    .bind(&bind_address)?
    .run()
    .await?;

    info!("HTTP server stopped");
    tracker.log_report();
    Ok(())
}

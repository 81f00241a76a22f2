// HTTP layer for the trading client
pub mod error;
pub mod routes;

use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::analysis::SpikeAnalyzer;
use crate::cache::AnalysisCache;
use crate::llm::OpenAIClient;
use crate::recommendation::RecommendationEngine;
use crate::settings::AppConfig;

pub use error::ApiError;

#[derive(Clone)]
pub struct AppState {
    pub analyzer: SpikeAnalyzer,
}

impl AppState {
    pub fn new(analyzer: SpikeAnalyzer) -> Self {
        Self { analyzer }
    }

    /// Wire detector, engine and an empty cache from configuration
    pub fn from_config(config: &AppConfig) -> crate::Result<Self> {
        let client = OpenAIClient::new(config.llm_settings())?;
        let analyzer = SpikeAnalyzer::new(
            config.spike_detector(),
            RecommendationEngine::new(client),
            AnalysisCache::new(),
        );
        Ok(Self::new(analyzer))
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .merge(routes::api_routes())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Bind and serve until Ctrl+C
pub async fn serve(config: &AppConfig) -> crate::Result<()> {
    let state = AppState::from_config(config)?;
    let app = router(state);

    let addr = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Starting AI backend server on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Received Ctrl+C, shutting down...");
}

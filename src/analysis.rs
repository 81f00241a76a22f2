use crate::cache::{AnalysisCache, CacheError};
use crate::models::{AnalysisRequest, Recommendation};
use crate::recommendation::RecommendationEngine;
use crate::spike::SpikeDetector;
use tracing::Instrument;
use uuid::Uuid;

/// Result of one analysis pass
#[derive(Debug, Clone)]
pub struct AnalysisOutcome {
    pub recommendation: Recommendation,
    pub spikes_analyzed: usize,
}

/// Detect → recommend → cache, for one symbol at a time
///
/// Cheap to clone; clones share the cache and the HTTP connection pool.
#[derive(Clone)]
pub struct SpikeAnalyzer {
    detector: SpikeDetector,
    engine: RecommendationEngine,
    cache: AnalysisCache,
}

impl SpikeAnalyzer {
    pub fn new(detector: SpikeDetector, engine: RecommendationEngine, cache: AnalysisCache) -> Self {
        Self {
            detector,
            engine,
            cache,
        }
    }

    pub fn cache(&self) -> &AnalysisCache {
        &self.cache
    }

    pub fn engine(&self) -> &RecommendationEngine {
        &self.engine
    }

    /// Run the full pipeline and store the result under the request's symbol
    ///
    /// Only a poisoned cache lock can make this fail; LLM problems degrade to
    /// default parameters.
    pub async fn analyze(&self, request: &AnalysisRequest) -> Result<AnalysisOutcome, CacheError> {
        let span = tracing::info_span!(
            "analysis",
            id = %Uuid::new_v4(),
            symbol = %request.symbol
        );

        async {
            tracing::info!(
                "Received analysis request for {} with {} price points",
                request.symbol,
                request.price_data.len()
            );

            let spikes = self.detector.detect(&request.price_data);
            tracing::info!("Detected {} spikes", spikes.len());

            let recommendation = self
                .engine
                .recommend(&spikes, &request.market_snapshot())
                .await;

            self.cache
                .put(&request.symbol, recommendation.clone(), spikes.len())?;

            tracing::info!("Analysis completed for {}", request.symbol);

            Ok::<_, CacheError>(AnalysisOutcome {
                recommendation,
                spikes_analyzed: spikes.len(),
            })
        }
        .instrument(span)
        .await
    }
}

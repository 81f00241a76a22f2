// Core modules
pub mod analysis;
pub mod cache;
pub mod llm;
pub mod models;
pub mod recommendation;
pub mod server;
pub mod settings;
pub mod spike;
pub mod synthetic;

// Re-export commonly used types
pub use analysis::{AnalysisOutcome, SpikeAnalyzer};
pub use cache::AnalysisCache;
pub use models::*;
pub use recommendation::RecommendationEngine;
pub use spike::SpikeDetector;

// Error handling
pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;

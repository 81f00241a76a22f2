// Per-symbol analysis result cache
pub mod analysis_cache;

pub use analysis_cache::{AnalysisCache, CacheError};

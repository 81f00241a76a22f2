// LLM-backed trading parameter recommendations
pub mod engine;
pub mod parse;
pub mod prompt;

pub use engine::RecommendationEngine;
pub use parse::{extract_json_block, parse_recommendation};
pub use prompt::{build_prompt, SpikeStatistics};

// LLM service client
pub mod openai;

pub use openai::{LlmError, LlmSettings, OpenAIClient};

/// Process configuration
///
/// Values come from built-in defaults overlaid by environment variables.
/// `load_env_files` pulls `config.env` and `.env` into the environment first
/// so the setup flow of the trading client (which writes `config.env`) keeps
/// working.

use crate::llm::openai::{DEFAULT_BASE_URL, DEFAULT_MODEL, PLACEHOLDER_API_KEY};
use crate::llm::LlmSettings;
use crate::spike::SpikeDetector;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct AppConfig {
    pub openai_api_key: String,
    pub openai_model: String,
    pub openai_base_url: String,
    pub server_host: String,
    pub server_port: u16,
    pub llm_timeout_secs: u64,
    pub llm_temperature: f32,
    pub llm_max_tokens: u32,
    pub min_spike_size: f64,
    pub recovery_window: usize,
    pub retracement_window: usize,
}

impl AppConfig {
    /// Load from the process environment
    pub fn from_env() -> crate::Result<Self> {
        Self::from_source(::config::Environment::default().try_parsing(true))
    }

    /// Load from defaults overlaid by an arbitrary source
    pub fn from_source<S>(source: S) -> crate::Result<Self>
    where
        S: ::config::Source + Send + Sync + 'static,
    {
        let settings = ::config::Config::builder()
            .set_default("openai_api_key", PLACEHOLDER_API_KEY)?
            .set_default("openai_model", DEFAULT_MODEL)?
            .set_default("openai_base_url", DEFAULT_BASE_URL)?
            .set_default("server_host", "0.0.0.0")?
            .set_default("server_port", 5001)?
            .set_default("llm_timeout_secs", 30)?
            .set_default("llm_temperature", 0.3)?
            .set_default("llm_max_tokens", 1000)?
            .set_default("min_spike_size", 50.0)?
            .set_default("recovery_window", 100)?
            .set_default("retracement_window", 50)?
            .add_source(source)
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    pub fn llm_settings(&self) -> LlmSettings {
        LlmSettings {
            api_key: self.openai_api_key.clone(),
            model: self.openai_model.clone(),
            base_url: self.openai_base_url.clone(),
            timeout_secs: self.llm_timeout_secs,
            temperature: self.llm_temperature,
            max_tokens: self.llm_max_tokens,
        }
    }

    pub fn spike_detector(&self) -> SpikeDetector {
        SpikeDetector::new(
            self.min_spike_size,
            self.recovery_window,
            self.retracement_window,
        )
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }

    pub fn openai_configured(&self) -> bool {
        self.llm_settings().is_configured()
    }
}

/// Load `config.env` then `.env` into the process environment, if present
///
/// Variables already set in the environment win over file values.
pub fn load_env_files() {
    for file in ["config.env", ".env"] {
        match dotenvy::from_filename(file) {
            Ok(path) => tracing::info!("Loaded environment from {}", path.display()),
            Err(e) if e.not_found() => {}
            Err(e) => tracing::warn!("Failed to read {}: {}", file, e),
        }
    }
}

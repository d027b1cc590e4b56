use anyhow::Result;
use config::{Config as ConfigLoader, Environment, File};
use llm_eval_core::DEFAULT_MODEL;
use llm_eval_inference::{InferenceConfig, DEFAULT_BASE_URL};
use serde::Deserialize;

#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub log_level: String,
    pub log_format: LogFormat,
    /// In-memory store when unset.
    pub database_url: Option<String>,
    pub default_model: String,
    pub queue_capacity: usize,
    pub groq_api_key: Option<String>,
    pub groq_base_url: String,
}

impl AppConfig {
    /// `config/default`, then `config/local`, then `LLM_EVAL_*` variables
    /// (`__` separates nested keys).
    pub fn load() -> Result<Self> {
        let config = ConfigLoader::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            .add_source(
                Environment::with_prefix("LLM_EVAL")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        Ok(config.try_deserialize()?)
    }

    /// Falls back to `GROQ_API_KEY` when no key is configured.
    pub fn inference_config(&self) -> InferenceConfig {
        let base = match &self.groq_api_key {
            Some(key) => InferenceConfig::new(key.clone()),
            None => InferenceConfig::from_env(),
        };
        base.with_base_url(self.groq_base_url.clone())
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            database_url: None,
            default_model: DEFAULT_MODEL.to_string(),
            queue_capacity: 16,
            groq_api_key: None,
            groq_base_url: DEFAULT_BASE_URL.to_string(),
        }
    }
}

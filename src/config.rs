use config::{Config as RawConfig, Environment, File};
use serde::Deserialize;

use crate::error::ConfigError;

/// Placeholder values the generator emits so scripts stay copy-pasteable.
/// The executor substitutes the real values immediately before compilation.
pub const LIGHTON_KEY_PLACEHOLDER: &str = "your_api_key_here";
pub const ANTHROPIC_KEY_PLACEHOLDER: &str = "your_anthropic_api_key_here";
pub const LIGHTON_BASE_URL_PLACEHOLDER: &str = "https://api.lighton.ai";

/// Which store backend to use. Selected explicitly by configuration, never
/// by probing library availability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// Process-local maps. Local development and tests only; records do not
    /// survive a restart.
    Memory,
    /// Redis with a 24-hour TTL per record. The only backend that is
    /// correct on stateless/serverless hosts.
    Redis,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// API key for the LightOn Paradigm document service.
    #[serde(default)]
    pub lighton_api_key: String,

    /// API key for the Anthropic service (consumed by the excluded
    /// generator; injected into scripts that carry its placeholder).
    #[serde(default)]
    pub anthropic_api_key: String,

    #[serde(default = "default_lighton_base_url")]
    pub lighton_base_url: String,

    /// Wall-clock execution budget in seconds.
    #[serde(default = "default_max_execution_time")]
    pub max_execution_time: u64,

    #[serde(default = "default_storage_backend")]
    pub storage_backend: StorageBackend,

    /// Required when `storage_backend = "redis"`.
    #[serde(default)]
    pub redis_url: Option<String>,
}

fn default_lighton_base_url() -> String {
    "https://paradigm.lighton.ai".to_string()
}

fn default_max_execution_time() -> u64 {
    1800
}

fn default_storage_backend() -> StorageBackend {
    StorageBackend::Memory
}

impl Default for Config {
    fn default() -> Self {
        Self {
            lighton_api_key: String::new(),
            anthropic_api_key: String::new(),
            lighton_base_url: default_lighton_base_url(),
            max_execution_time: default_max_execution_time(),
            storage_backend: default_storage_backend(),
            redis_url: None,
        }
    }
}

impl Config {
    /// Load configuration from `flowhost.toml` (optional, path overridable
    /// via `FLOWHOST_CONFIG_PATH`) and `FLOWHOST_*` environment variables.
    /// A `.env` file is honored before the environment is read.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let config_path = std::env::var("FLOWHOST_CONFIG_PATH")
            .unwrap_or_else(|_| "flowhost.toml".to_string());

        let raw = RawConfig::builder()
            .add_source(File::with_name(&config_path).required(false))
            .add_source(Environment::with_prefix("FLOWHOST"))
            .build()?;

        let mut cfg: Config = raw.try_deserialize()?;

        // The reference deployment configures secrets through bare env vars;
        // honor those when the prefixed form is absent.
        if cfg.lighton_api_key.is_empty() {
            if let Ok(key) = std::env::var("LIGHTON_API_KEY") {
                cfg.lighton_api_key = key;
            }
        }
        if cfg.anthropic_api_key.is_empty() {
            if let Ok(key) = std::env::var("ANTHROPIC_API_KEY") {
                cfg.anthropic_api_key = key;
            }
        }

        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_execution_time == 0 {
            return Err(ConfigError::Invalid(
                "max_execution_time must be greater than 0".to_string(),
            ));
        }
        if self.storage_backend == StorageBackend::Redis && self.redis_url.is_none() {
            return Err(ConfigError::Invalid(
                "redis_url is required when storage_backend is \"redis\"".to_string(),
            ));
        }
        Ok(())
    }

    /// Secret values that must never appear in execution output or errors.
    pub fn secrets(&self) -> Vec<&str> {
        [self.lighton_api_key.as_str(), self.anthropic_api_key.as_str()]
            .into_iter()
            .filter(|s| !s.is_empty())
            .collect()
    }
}

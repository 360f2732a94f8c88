use std::collections::HashMap;
use std::env;
use std::path::Path;
use std::time::Duration;

use crate::error::LlmError;

const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8000/v1";
const DEFAULT_MODEL: &str = "Qwen3-0.6B-Q8_0";
const DEFAULT_TEMPERATURE: f64 = 0.1;
const DEFAULT_MAX_OUTPUT_TOKENS: u32 = 512;
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, PartialEq)]
pub struct LlmSettings {
    pub base_url: String,
    pub api_key: Option<String>,
    pub model: String,
    pub temperature: f64,
    pub max_output_tokens: u32,
    pub request_timeout: Duration,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            max_output_tokens: DEFAULT_MAX_OUTPUT_TOKENS,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

impl LlmSettings {
    /// Reads `FILESEARCH_LLM_*` variables, falling back to `OPENAI_*` for the
    /// endpoint, key, and model.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Like [`from_env`](Self::from_env), with entries of a dotenv file used
    /// for variables the process environment does not set.
    pub fn from_env_with_dotenv(path: &Path) -> Result<Self, LlmError> {
        let mut file_vars = HashMap::new();
        let entries = dotenvy::from_path_iter(path)
            .map_err(|error| LlmError::InvalidInput(format!("{}: {error}", path.display())))?;
        for entry in entries {
            let (key, value) = entry
                .map_err(|error| LlmError::InvalidInput(format!("{}: {error}", path.display())))?;
            file_vars.insert(key, value);
        }
        Ok(Self::from_lookup(|key| {
            env::var(key).ok().or_else(|| file_vars.get(key).cloned())
        }))
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let var = |primary: &str, fallback: Option<&str>| {
            lookup(primary)
                .or_else(|| fallback.and_then(&lookup))
                .filter(|value| !value.trim().is_empty())
        };

        let base_url = var("FILESEARCH_LLM_BASE_URL", Some("OPENAI_BASE_URL"))
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let api_key = var("FILESEARCH_LLM_API_KEY", Some("OPENAI_API_KEY"));
        let model = var("FILESEARCH_LLM_MODEL", Some("OPENAI_MODEL"))
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());
        let temperature = var("FILESEARCH_LLM_TEMPERATURE", None)
            .and_then(|value| value.parse::<f64>().ok())
            .unwrap_or(DEFAULT_TEMPERATURE);
        let max_output_tokens = var("FILESEARCH_LLM_MAX_OUTPUT_TOKENS", None)
            .and_then(|value| value.parse::<u32>().ok())
            .unwrap_or(DEFAULT_MAX_OUTPUT_TOKENS);
        let request_timeout = var("FILESEARCH_LLM_TIMEOUT_MS", None)
            .and_then(|value| value.parse::<u64>().ok())
            .map(Duration::from_millis)
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT);

        Self {
            base_url,
            api_key,
            model,
            temperature,
            max_output_tokens,
            request_timeout,
        }
    }
}

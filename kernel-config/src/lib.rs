use std::env;
use std::time::Duration;

use thiserror::Error;

pub const DEFAULT_BASE_URL: &str = "http://localhost:1053";
pub const DEFAULT_MODEL: &str = "sarvamai/sarvam-m";
pub const DEFAULT_ENV_KEY: &str = "SARVAM_API_KEY";
/// Placeholder key accepted by local OpenAI-compatible servers.
pub const DEFAULT_API_KEY: &str = "EMPTY";
pub const DEFAULT_BOS_TOKEN: &str = "<s>";
pub const DEFAULT_EOS_TOKEN: &str = "</s>";
pub const DEFAULT_TEMPERATURE: f64 = 0.001;
pub const DEFAULT_MAX_TOKENS: u32 = 4096;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 600;

pub const BASE_URL_VAR: &str = "SARVAM_BASE_URL";
pub const MODEL_VAR: &str = "SARVAM_MODEL";
pub const ENV_KEY_VAR: &str = "SARVAM_API_KEY_ENV";
pub const BOS_TOKEN_VAR: &str = "SARVAM_BOS_TOKEN";
pub const EOS_TOKEN_VAR: &str = "SARVAM_EOS_TOKEN";
pub const ENABLE_THINKING_VAR: &str = "SARVAM_ENABLE_THINKING";
pub const TEMPERATURE_VAR: &str = "SARVAM_TEMPERATURE";
pub const MAX_TOKENS_VAR: &str = "SARVAM_MAX_TOKENS";
pub const REQUEST_TIMEOUT_VAR: &str = "SARVAM_REQUEST_TIMEOUT_SECS";

#[derive(Debug, Clone, PartialEq)]
pub struct LocalModelConfig {
    pub base_url: String,
    pub model: String,
    pub env_key: String,
    pub api_key: String,
    pub bos_token: String,
    pub eos_token: String,
    pub thinking_enabled: bool,
    pub temperature: f64,
    pub max_tokens: u32,
    pub request_timeout: Duration,
}

impl Default for LocalModelConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            env_key: DEFAULT_ENV_KEY.to_string(),
            api_key: DEFAULT_API_KEY.to_string(),
            bos_token: DEFAULT_BOS_TOKEN.to_string(),
            eos_token: DEFAULT_EOS_TOKEN.to_string(),
            thinking_enabled: true,
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct LocalModelOverrides {
    pub base_url: Option<String>,
    pub model: Option<String>,
    pub env_key: Option<String>,
    pub thinking_enabled: Option<bool>,
    pub max_tokens: Option<u32>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("environment variable '{key}' has invalid value '{value}': expected {expected}")]
    InvalidValue {
        key: String,
        value: String,
        expected: &'static str,
    },
}

pub fn load_local_model_config() -> Result<LocalModelConfig, ConfigError> {
    load_local_model_config_with(LocalModelOverrides::default())
}

pub fn load_local_model_config_with(
    overrides: LocalModelOverrides,
) -> Result<LocalModelConfig, ConfigError> {
    load_from_lookup(overrides, |key| env::var(key).ok())
}

/// Builds the config from an arbitrary variable source. Overrides beat the
/// source, which beats the defaults.
pub fn load_from_lookup<F>(
    overrides: LocalModelOverrides,
    lookup: F,
) -> Result<LocalModelConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let var = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

    let env_key = overrides
        .env_key
        .or_else(|| var(ENV_KEY_VAR))
        .unwrap_or_else(|| DEFAULT_ENV_KEY.to_string());
    let api_key = var(&env_key).unwrap_or_else(|| DEFAULT_API_KEY.to_string());

    let thinking_enabled = match overrides.thinking_enabled {
        Some(value) => value,
        None => parse_var(&var, ENABLE_THINKING_VAR, "a boolean", parse_bool)?.unwrap_or(true),
    };
    let max_tokens = match overrides.max_tokens {
        Some(value) => value,
        None => parse_var(&var, MAX_TOKENS_VAR, "a positive integer", |raw| {
            raw.parse::<u32>().ok().filter(|value| *value > 0)
        })?
        .unwrap_or(DEFAULT_MAX_TOKENS),
    };
    let temperature = parse_var(&var, TEMPERATURE_VAR, "a non-negative number", |raw| {
        raw.parse::<f64>().ok().filter(|value| *value >= 0.0)
    })?
    .unwrap_or(DEFAULT_TEMPERATURE);
    let timeout_secs = parse_var(&var, REQUEST_TIMEOUT_VAR, "a number of seconds", |raw| {
        raw.parse::<u64>().ok()
    })?
    .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS);

    Ok(LocalModelConfig {
        base_url: overrides
            .base_url
            .or_else(|| var(BASE_URL_VAR))
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
        model: overrides
            .model
            .or_else(|| var(MODEL_VAR))
            .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
        env_key,
        api_key,
        // Special tokens may legitimately be empty, so only absence falls back.
        bos_token: lookup(BOS_TOKEN_VAR).unwrap_or_else(|| DEFAULT_BOS_TOKEN.to_string()),
        eos_token: lookup(EOS_TOKEN_VAR).unwrap_or_else(|| DEFAULT_EOS_TOKEN.to_string()),
        thinking_enabled,
        temperature,
        max_tokens,
        request_timeout: Duration::from_secs(timeout_secs),
    })
}

fn parse_var<T>(
    var: &impl Fn(&str) -> Option<String>,
    key: &str,
    expected: &'static str,
    parse: impl Fn(&str) -> Option<T>,
) -> Result<Option<T>, ConfigError> {
    let Some(raw) = var(key) else {
        return Ok(None);
    };
    parse(raw.trim())
        .map(Some)
        .ok_or_else(|| ConfigError::InvalidValue {
            key: key.to_string(),
            value: raw,
            expected,
        })
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

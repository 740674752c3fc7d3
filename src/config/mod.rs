//! Configuration for Alfred.
//!
//! Everything comes from env vars (with `.env` loaded via dotenvy early in
//! startup). Invalid values are rejected here, at load time; nothing
//! re-validates at request time.

use std::time::Duration;

use secrecy::SecretString;

use crate::agent::Thresholds;
use crate::error::ConfigError;

pub const DEFAULT_API_URL: &str = "https://api.openai.com/v1/chat/completions";
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_LLM_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_PENDING_TTL_SECS: u64 = 300;
pub const DEFAULT_BOT_NAME: &str = "Alfred";

/// Main configuration for the bot.
#[derive(Debug, Clone)]
pub struct Config {
    pub llm: LlmConfig,
    pub agent: AgentConfig,
}

/// Language-model backend settings.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub api_key: SecretString,
    pub api_url: String,
    pub model: String,
    pub timeout: Duration,
}

/// Intent-resolution settings.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub thresholds: Thresholds,
    pub pending_ttl: Duration,
    pub bot_name: String,
}

impl Config {
    /// Load configuration from the environment.
    ///
    /// Threshold misconfiguration (out of 0-100, or low above high) is fatal
    /// here so it can never surface mid-request.
    pub fn from_env() -> Result<Self, ConfigError> {
        let api_key = require_env("OPENAI_API_KEY")?;
        let api_url = optional_env("OPENAI_API_URL").unwrap_or_else(|| DEFAULT_API_URL.to_string());
        let model = optional_env("OPENAI_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string());
        let timeout_secs = parse_env("LLM_TIMEOUT_SECS", DEFAULT_LLM_TIMEOUT_SECS)?;
        if timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                key: "LLM_TIMEOUT_SECS".to_string(),
                message: "must be > 0".to_string(),
            });
        }

        let high: u8 = parse_env("COMMAND_CONFIDENCE_HIGH_THRESHOLD", Thresholds::DEFAULT_HIGH)?;
        let low: u8 = parse_env("COMMAND_CONFIDENCE_LOW_THRESHOLD", Thresholds::DEFAULT_LOW)?;
        let thresholds = Thresholds::new(high, low)?;

        let ttl_secs = parse_env("PENDING_ACTION_TTL_SECS", DEFAULT_PENDING_TTL_SECS)?;
        if ttl_secs == 0 {
            return Err(ConfigError::InvalidValue {
                key: "PENDING_ACTION_TTL_SECS".to_string(),
                message: "must be > 0".to_string(),
            });
        }

        let bot_name =
            optional_env("BOT_NAME").unwrap_or_else(|| DEFAULT_BOT_NAME.to_string());

        Ok(Self {
            llm: LlmConfig {
                api_key: SecretString::from(api_key),
                api_url,
                model,
                timeout: Duration::from_secs(timeout_secs),
            },
            agent: AgentConfig {
                thresholds,
                pending_ttl: Duration::from_secs(ttl_secs),
                bot_name,
            },
        })
    }
}

/// Read a required env var; empty counts as missing.
fn require_env(key: &str) -> Result<String, ConfigError> {
    optional_env(key).ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
}

/// Read an optional env var; empty counts as unset.
fn optional_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Read and parse an optional env var, falling back to `default`.
fn parse_env<T>(key: &str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match optional_env(key) {
        Some(raw) => raw.parse().map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("{e}"),
        }),
        None => Ok(default),
    }
}

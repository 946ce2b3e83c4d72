//! Process configuration from environment variables
//!
//! Unset variables take their defaults; invalid ones are logged and fall
//! back to the default instead of aborting startup.

use crate::llm::LlmConfig;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_PORT: u16 = 3001;
pub const DEFAULT_TEMPERATURE: f32 = 0.1;
/// Upper bound on sampling temperature for belief updates
pub const MAX_TEMPERATURE: f32 = 0.2;
pub const DEFAULT_MAX_TOKENS: u32 = 2048;
pub const DEFAULT_INFERENCE_TIMEOUT: Duration = Duration::from_secs(120);

/// Settings for the belief-update engine
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineConfig {
    /// Always in `(0, MAX_TEMPERATURE]`
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }
}

/// Everything the server binary needs at startup
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    /// Caller-level bound on one diagnostic step
    pub inference_timeout: Duration,
    pub engine: EngineConfig,
    pub llm: LlmConfig,
}

impl ServerConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let temperature = parse_var(&lookup, "DXO_TEMPERATURE", DEFAULT_TEMPERATURE);
        let temperature = if temperature > 0.0 && temperature <= MAX_TEMPERATURE {
            temperature
        } else {
            tracing::warn!(
                value = temperature,
                max = MAX_TEMPERATURE,
                "DXO_TEMPERATURE out of range, using default"
            );
            DEFAULT_TEMPERATURE
        };

        let max_tokens = match parse_var(&lookup, "DXO_MAX_TOKENS", DEFAULT_MAX_TOKENS) {
            0 => {
                tracing::warn!("DXO_MAX_TOKENS must be positive, using default");
                DEFAULT_MAX_TOKENS
            }
            n => n,
        };

        let timeout_secs = parse_var(
            &lookup,
            "DXO_INFERENCE_TIMEOUT_SECS",
            DEFAULT_INFERENCE_TIMEOUT.as_secs(),
        );
        let inference_timeout = if timeout_secs == 0 {
            tracing::warn!("DXO_INFERENCE_TIMEOUT_SECS must be positive, using default");
            DEFAULT_INFERENCE_TIMEOUT
        } else {
            Duration::from_secs(timeout_secs)
        };

        Self {
            port: parse_var(&lookup, "DXO_PORT", DEFAULT_PORT),
            inference_timeout,
            engine: EngineConfig {
                temperature,
                max_tokens,
            },
            llm: LlmConfig::from_lookup(&lookup),
        }
    }
}

fn parse_var<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T
where
    T: FromStr + Copy,
{
    match lookup(key) {
        None => default,
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!(key, value = %raw, "Invalid configuration value, using default");
            default
        }),
    }
}

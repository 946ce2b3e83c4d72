//! Centralized model definitions for all LLM providers

use super::anthropic::AnthropicModel;
use super::openai::OpenAIModel;
use super::{AnthropicService, LlmService, OpenAIService};
use std::sync::Arc;

/// LLM provider enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Provider {
    Anthropic,
    OpenAI,
}

impl Provider {
    /// Get the display name for this provider
    pub fn display_name(self) -> &'static str {
        match self {
            Provider::Anthropic => "Anthropic",
            Provider::OpenAI => "OpenAI",
        }
    }

    /// Get the environment variable name for this provider's API key
    pub fn api_key_env_var(self) -> &'static str {
        match self {
            Provider::Anthropic => "ANTHROPIC_API_KEY",
            Provider::OpenAI => "OPENAI_API_KEY",
        }
    }
}

/// Model definition with metadata
#[derive(Debug, Clone)]
pub struct ModelDef {
    /// User-facing model ID (e.g., "claude-4.5-sonnet")
    pub id: &'static str,
    /// Provider for this model
    pub provider: Provider,
    /// Human-readable description
    pub description: &'static str,
    /// Factory function to create the service
    pub factory: fn(&str, Option<&str>) -> Arc<dyn LlmService>,
}

/// Get all available model definitions
pub fn all_models() -> &'static [ModelDef] {
    &[
        ModelDef {
            id: "claude-4.5-sonnet",
            provider: Provider::Anthropic,
            description: "Claude Sonnet 4.5 (balanced, default)",
            factory: |api_key, gateway| {
                Arc::new(AnthropicService::new(
                    api_key.to_string(),
                    AnthropicModel::Claude45Sonnet,
                    gateway,
                ))
            },
        },
        ModelDef {
            id: "claude-4.5-opus",
            provider: Provider::Anthropic,
            description: "Claude Opus 4.5 (most capable, slower)",
            factory: |api_key, gateway| {
                Arc::new(AnthropicService::new(
                    api_key.to_string(),
                    AnthropicModel::Claude45Opus,
                    gateway,
                ))
            },
        },
        ModelDef {
            id: "claude-4.5-haiku",
            provider: Provider::Anthropic,
            description: "Claude Haiku 4.5 (fast, cheap)",
            factory: |api_key, gateway| {
                Arc::new(AnthropicService::new(
                    api_key.to_string(),
                    AnthropicModel::Claude45Haiku,
                    gateway,
                ))
            },
        },
        ModelDef {
            id: "gpt-4o",
            provider: Provider::OpenAI,
            description: "GPT-4o",
            factory: |api_key, gateway| {
                Arc::new(OpenAIService::new(
                    api_key.to_string(),
                    OpenAIModel::GPT4o,
                    gateway,
                ))
            },
        },
        ModelDef {
            id: "gpt-4o-mini",
            provider: Provider::OpenAI,
            description: "GPT-4o mini (fast, cheap)",
            factory: |api_key, gateway| {
                Arc::new(OpenAIService::new(
                    api_key.to_string(),
                    OpenAIModel::GPT4oMini,
                    gateway,
                ))
            },
        },
        ModelDef {
            id: "gpt-4.1",
            provider: Provider::OpenAI,
            description: "GPT-4.1",
            factory: |api_key, gateway| {
                Arc::new(OpenAIService::new(
                    api_key.to_string(),
                    OpenAIModel::GPT41,
                    gateway,
                ))
            },
        },
    ]
}

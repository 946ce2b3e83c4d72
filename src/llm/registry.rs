//! Model registry for managing available LLM providers

use super::{all_models, LlmService, LoggingService, ModelDef, Provider, UnavailableService};
use std::collections::HashMap;
use std::sync::Arc;

const PREFERRED_DEFAULT: &str = "claude-4.5-sonnet";

/// Configuration for LLM providers
#[derive(Debug, Clone, Default)]
pub struct LlmConfig {
    pub anthropic_api_key: Option<String>,
    pub openai_api_key: Option<String>,
    /// Gateway base URL; the gateway holds the provider credentials
    pub gateway: Option<String>,
    /// Default model ID
    pub default_model: Option<String>,
}

impl LlmConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable source; blank values count as unset
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        Self {
            anthropic_api_key: get(Provider::Anthropic.api_key_env_var()),
            openai_api_key: get(Provider::OpenAI.api_key_env_var()),
            gateway: get("LLM_GATEWAY"),
            default_model: get("DEFAULT_MODEL"),
        }
    }
}

/// Registry of available LLM models
pub struct ModelRegistry {
    services: HashMap<String, Arc<dyn LlmService>>,
    default_model: String,
}

impl ModelRegistry {
    pub fn new(config: &LlmConfig) -> Self {
        let mut services: HashMap<String, Arc<dyn LlmService>> = HashMap::new();

        for model_def in all_models() {
            if let Some(service) = Self::try_create_model(model_def, config) {
                services.insert(model_def.id.to_string(), service);
            }
        }

        // Explicit choice, then the preferred default, then the first available in definition order
        let default_model = config
            .default_model
            .clone()
            .or_else(|| {
                services
                    .contains_key(PREFERRED_DEFAULT)
                    .then(|| PREFERRED_DEFAULT.to_string())
            })
            .or_else(|| {
                all_models()
                    .iter()
                    .find(|m| services.contains_key(m.id))
                    .map(|m| m.id.to_string())
            })
            .unwrap_or_else(|| PREFERRED_DEFAULT.to_string());

        Self {
            services,
            default_model,
        }
    }

    /// Try to create a model service, validating prerequisites
    fn try_create_model(model_def: &ModelDef, config: &LlmConfig) -> Option<Arc<dyn LlmService>> {
        // In gateway mode, use "implicit" as the API key
        let api_key = if config.gateway.is_some() {
            "implicit".to_string()
        } else {
            match model_def.provider {
                Provider::Anthropic => config.anthropic_api_key.as_ref()?,
                Provider::OpenAI => config.openai_api_key.as_ref()?,
            }
            .clone()
        };

        let service = (model_def.factory)(&api_key, config.gateway.as_deref());
        Some(Arc::new(LoggingService::new(service)))
    }

    /// Get a model by ID
    pub fn get(&self, model_id: &str) -> Option<Arc<dyn LlmService>> {
        self.services.get(model_id).cloned()
    }

    /// The default model, or a service that fails every call when nothing is configured
    pub fn default_service(&self) -> Arc<dyn LlmService> {
        self.get(&self.default_model).unwrap_or_else(|| {
            Arc::new(LoggingService::new(Arc::new(UnavailableService::new(
                self.default_model.clone(),
                format!(
                    "Model '{}' is not available. Set ANTHROPIC_API_KEY, OPENAI_API_KEY or LLM_GATEWAY.",
                    self.default_model
                ),
            ))))
        })
    }

    /// Whether the default model resolved to a configured service
    pub fn has_default_model(&self) -> bool {
        self.services.contains_key(&self.default_model)
    }

    /// Get the default model ID
    pub fn default_model_id(&self) -> &str {
        &self.default_model
    }

    /// List all available model IDs
    pub fn available_models(&self) -> Vec<String> {
        let mut models: Vec<_> = self.services.keys().cloned().collect();
        models.sort();
        models
    }

    /// Get detailed information about available models
    pub fn available_model_info(&self) -> Vec<crate::api::ModelInfo> {
        all_models()
            .iter()
            .filter(|model_def| self.services.contains_key(model_def.id))
            .map(|model_def| crate::api::ModelInfo {
                id: model_def.id.to_string(),
                provider: model_def.provider.display_name().to_string(),
                description: model_def.description.to_string(),
            })
            .collect()
    }

    /// Check if any models are available
    pub fn has_models(&self) -> bool {
        !self.services.is_empty()
    }
}

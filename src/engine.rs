//! Belief-update engine
//!
//! One call to [`BeliefEngine::run_diagnostic_step`] is one round of the
//! diagnostic interview: normalize the caller's history, make exactly one
//! structured-output inference request, and return the validated turn.
//!
//! The engine holds no conversation state. The history is owned by the
//! caller, who appends each returned turn before the next call, so
//! independent sessions can run concurrently on a shared engine. There is
//! no retry here; a failed provider call surfaces immediately.

use crate::config::EngineConfig;
use crate::diagnosis::{self, DiagnosticTurnResponse, PayloadError};
use crate::llm::{LlmError, LlmErrorKind, LlmRequest, LlmService, SystemContent};
use crate::system_prompt::build_system_prompt;
use crate::transcript::{normalize_history, ConversationTurn};
use std::sync::Arc;
use thiserror::Error;

const LOG_PAYLOAD_CHARS: usize = 500;

/// Failure of one diagnostic step
#[derive(Debug, Error)]
#[error("{message}")]
pub struct InferenceFailure {
    pub kind: FailureKind,
    pub message: String,
    /// Raw provider payload for schema violations
    pub raw_payload: Option<String>,
    /// Upstream classification when the provider call itself failed
    pub provider_error: Option<LlmErrorKind>,
}

/// Classification of an [`InferenceFailure`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// The provider could not be reached or refused the call
    ProviderUnavailable,
    /// The provider answered with something that is not a valid turn
    SchemaViolation,
}

impl FailureKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ProviderUnavailable => "provider_unavailable",
            Self::SchemaViolation => "schema_violation",
        }
    }
}

impl InferenceFailure {
    fn schema_violation(err: &PayloadError, raw_payload: String) -> Self {
        Self {
            kind: FailureKind::SchemaViolation,
            message: err.to_string(),
            raw_payload: Some(raw_payload),
            provider_error: None,
        }
    }
}

impl From<LlmError> for InferenceFailure {
    fn from(err: LlmError) -> Self {
        // An undecodable provider body is a bad payload, not an outage
        let kind = match err.kind {
            LlmErrorKind::MalformedResponse => FailureKind::SchemaViolation,
            _ => FailureKind::ProviderUnavailable,
        };
        let raw_payload = (kind == FailureKind::SchemaViolation).then(|| err.message.clone());
        Self {
            kind,
            message: err.message,
            raw_payload,
            provider_error: Some(err.kind),
        }
    }
}

/// Stateless orchestrator for belief-update steps.
///
/// The provider handle is created once at startup and shared across calls.
pub struct BeliefEngine {
    llm: Arc<dyn LlmService>,
    config: EngineConfig,
    system_prompt: String,
}

impl BeliefEngine {
    pub fn new(llm: Arc<dyn LlmService>, config: EngineConfig) -> Self {
        Self {
            llm,
            config,
            system_prompt: build_system_prompt(),
        }
    }

    pub fn model_id(&self) -> &str {
        self.llm.model_id()
    }

    /// The inference request issued for a given history
    pub fn build_request(&self, history: &[ConversationTurn]) -> LlmRequest {
        LlmRequest {
            system: vec![SystemContent::cached(self.system_prompt.clone())],
            messages: normalize_history(history),
            max_tokens: Some(self.config.max_tokens),
            temperature: Some(self.config.temperature),
            output: Some(diagnosis::structured_output()),
        }
    }

    /// Run one belief-update step over the caller's full history
    pub async fn run_diagnostic_step(
        &self,
        history: &[ConversationTurn],
    ) -> Result<DiagnosticTurnResponse, InferenceFailure> {
        let request = self.build_request(history);

        tracing::debug!(
            model = %self.model_id(),
            history_len = history.len(),
            messages = request.messages.len(),
            "Running diagnostic step"
        );

        let response = self.llm.complete(&request).await?;

        let raw = response.structured_payload();
        let turn = DiagnosticTurnResponse::from_payload(&raw).map_err(|e| {
            tracing::warn!(
                model = %self.model_id(),
                error = %e,
                payload = %truncate_for_log(&raw),
                "Provider payload rejected"
            );
            InferenceFailure::schema_violation(&e, raw.clone())
        })?;

        tracing::info!(
            model = %self.model_id(),
            status = turn.status().as_str(),
            history_len = history.len(),
            "Diagnostic step completed"
        );

        Ok(turn)
    }
}

fn truncate_for_log(raw: &str) -> String {
    if raw.chars().count() > LOG_PAYLOAD_CHARS {
        let head: String = raw.chars().take(LOG_PAYLOAD_CHARS).collect();
        format!("{head}...")
    } else {
        raw.to_string()
    }
}

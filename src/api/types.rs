//! API request and response types

use crate::transcript::ConversationTurn;
use serde::{Deserialize, Serialize};

/// Body of `POST /diagnose`
#[derive(Debug, Deserialize)]
pub struct DiagnoseRequest {
    /// Full session history; `None` when the key is missing or null
    #[serde(default)]
    pub history: Option<Vec<ConversationTurn>>,
}

/// Model information with metadata
#[derive(Debug, Serialize)]
pub struct ModelInfo {
    pub id: String,
    pub provider: String,
    pub description: String,
}

/// Response for model list
#[derive(Debug, Serialize)]
pub struct ModelsResponse {
    pub models: Vec<ModelInfo>,
    pub default: String,
}

/// Response for the version endpoint
#[derive(Debug, Serialize)]
pub struct VersionResponse {
    pub version: &'static str,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
            kind: None,
            detail: None,
        }
    }

    pub fn engine_failure(kind: &'static str, detail: impl Into<String>) -> Self {
        Self {
            error: "Diagnostic Engine Failure".to_string(),
            kind: Some(kind),
            detail: Some(detail.into()),
        }
    }
}

//! HTTP request handlers

use super::types::{DiagnoseRequest, ErrorResponse, ModelsResponse, VersionResponse};
use super::AppState;
use crate::diagnosis::DiagnosticTurnResponse;
use crate::engine::{FailureKind, InferenceFailure};
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use std::time::Duration;
use tokio::time::timeout;

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // One belief-update step
        .route("/diagnose", post(diagnose))
        // Model info
        .route("/api/models", get(list_models))
        // Version
        .route("/version", get(get_version))
        .with_state(state)
}

// ============================================================
// Diagnosis
// ============================================================

async fn diagnose(
    State(state): State<AppState>,
    payload: Result<Json<DiagnoseRequest>, JsonRejection>,
) -> Result<Json<DiagnosticTurnResponse>, AppError> {
    let Json(request) = payload.map_err(|rejection| {
        tracing::debug!(error = %rejection.body_text(), "Rejected request body");
        AppError::missing_history()
    })?;

    let history = request.history.ok_or_else(AppError::missing_history)?;

    tracing::info!(
        messages = history.len(),
        "Received diagnostic request"
    );

    let turn = timeout(
        state.inference_timeout,
        state.engine.run_diagnostic_step(&history),
    )
    .await
    .map_err(|_| AppError::Timeout(state.inference_timeout))??;

    Ok(Json(turn))
}

// ============================================================
// Model Info
// ============================================================

async fn list_models(State(state): State<AppState>) -> Json<ModelsResponse> {
    Json(ModelsResponse {
        models: state.llm_registry.available_model_info(),
        default: state.llm_registry.default_model_id().to_string(),
    })
}

async fn get_version() -> Json<VersionResponse> {
    Json(VersionResponse {
        version: env!("CARGO_PKG_VERSION"),
    })
}

// ============================================================
// Error Handling
// ============================================================

#[derive(Debug)]
enum AppError {
    BadRequest(String),
    Engine(InferenceFailure),
    Timeout(Duration),
}

impl AppError {
    fn missing_history() -> Self {
        AppError::BadRequest("Missing 'history' in request body.".to_string())
    }
}

impl From<InferenceFailure> for AppError {
    fn from(failure: InferenceFailure) -> Self {
        AppError::Engine(failure)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, ErrorResponse::new(msg)),
            AppError::Engine(failure) => {
                // Provider faults are already logged at error by the LLM layer
                let status = match failure.kind {
                    FailureKind::ProviderUnavailable => StatusCode::BAD_GATEWAY,
                    FailureKind::SchemaViolation => {
                        tracing::error!(error = %failure.message, "Diagnostic engine failure");
                        StatusCode::INTERNAL_SERVER_ERROR
                    }
                };
                (
                    status,
                    ErrorResponse::engine_failure(failure.kind.as_str(), failure.message),
                )
            }
            AppError::Timeout(limit) => {
                tracing::error!(timeout_secs = limit.as_secs(), "Diagnostic step timed out");
                (
                    StatusCode::GATEWAY_TIMEOUT,
                    ErrorResponse::engine_failure(
                        "timeout",
                        format!("No reply from the inference provider within {}s", limit.as_secs()),
                    ),
                )
            }
        };

        (status, Json(body)).into_response()
    }
}

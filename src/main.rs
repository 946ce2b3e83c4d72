//! MiniDxO - differential-diagnosis dialogue backend
//!
//! Serves one belief-update step per request: the caller posts the full
//! conversation history and receives the next structured diagnostic turn.

use mini_dxo::api::{create_router, AppState};
use mini_dxo::config::ServerConfig;
use mini_dxo::engine::BeliefEngine;
use mini_dxo::llm::ModelRegistry;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Provider credentials usually live in .env
    let dotenv_path = dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mini_dxo=info,tower_http=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false),
        )
        .init();

    if let Some(path) = dotenv_path {
        tracing::info!(path = %path.display(), "Loaded environment file");
    }

    let config = ServerConfig::from_env();

    // Initialize LLM registry
    let llm_registry = Arc::new(ModelRegistry::new(&config.llm));

    if llm_registry.has_models() {
        tracing::info!(
            models = ?llm_registry.available_models(),
            default = %llm_registry.default_model_id(),
            "LLM registry initialized"
        );
        if !llm_registry.has_default_model() {
            tracing::warn!(
                model = %llm_registry.default_model_id(),
                "Default model is unknown or has no credential configured; diagnostic requests will fail"
            );
        }
    } else {
        tracing::warn!(
            "No LLM API keys configured. Set ANTHROPIC_API_KEY, OPENAI_API_KEY or LLM_GATEWAY; diagnostic requests will fail."
        );
    }

    let engine = Arc::new(BeliefEngine::new(
        llm_registry.default_service(),
        config.engine,
    ));
    tracing::info!(
        model = %engine.model_id(),
        temperature = config.engine.temperature,
        max_tokens = config.engine.max_tokens,
        timeout_secs = config.inference_timeout.as_secs(),
        "Belief engine ready"
    );

    let state = AppState::new(engine, llm_registry, config.inference_timeout);

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = create_router(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("MiniDxO backend listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

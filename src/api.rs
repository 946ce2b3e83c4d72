//! HTTP API for the diagnostic engine
//!
//! Thin transport around [`BeliefEngine`]: body parsing, input rejection,
//! the caller-level timeout and error-to-status mapping.

mod handlers;
mod types;

pub use handlers::create_router;
#[allow(unused_imports)] // Public API re-exports
pub use types::*;

use crate::engine::BeliefEngine;
use crate::llm::ModelRegistry;
use std::sync::Arc;
use std::time::Duration;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<BeliefEngine>,
    pub llm_registry: Arc<ModelRegistry>,
    pub inference_timeout: Duration,
}

impl AppState {
    pub fn new(
        engine: Arc<BeliefEngine>,
        llm_registry: Arc<ModelRegistry>,
        inference_timeout: Duration,
    ) -> Self {
        Self {
            engine,
            llm_registry,
            inference_timeout,
        }
    }
}

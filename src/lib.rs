//! MiniDxO belief engine
//!
//! Turn-based differential-diagnosis dialogue over a structured-output LLM
//! call. [`engine::BeliefEngine`] runs one belief-update step over a
//! caller-owned [`transcript::ConversationTurn`] history and returns a
//! validated [`diagnosis::DiagnosticTurnResponse`]. The [`api`] module wraps
//! it in an HTTP endpoint.

pub mod api;
pub mod config;
pub mod diagnosis;
pub mod engine;
pub mod llm;
pub mod system_prompt;
pub mod transcript;

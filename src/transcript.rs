//! Conversation transcript and its translation into provider messages
//!
//! The application speaks in three roles (`user`, `ai`, `system`); providers
//! accept two. A `system` turn only primes the first round-trip on the client
//! side and never reaches the provider.

use crate::llm::LlmMessage;
use serde::{Deserialize, Serialize};

/// Opening message sent when the history has nothing to forward
pub const INTERVIEW_KICKOFF: &str = "Begin the diagnostic interview. Ask for the primary symptoms.";

/// Role of a turn in the application's transcript
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    User,
    Ai,
    System,
}

/// One turn of a diagnostic session, as owned by the caller.
///
/// Unknown fields (citation, reasoning and diagnosis attached by the UI)
/// are ignored on input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: TurnRole,
    pub text: String,
}

impl ConversationTurn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: TurnRole::User,
            text: text.into(),
        }
    }

    pub fn ai(text: impl Into<String>) -> Self {
        Self {
            role: TurnRole::Ai,
            text: text.into(),
        }
    }

    pub fn system(text: impl Into<String>) -> Self {
        Self {
            role: TurnRole::System,
            text: text.into(),
        }
    }
}

/// Map a transcript onto provider messages.
///
/// `ai` becomes `assistant`, `user` stays `user` and `system` turns are
/// dropped. The result is never empty: with nothing to forward a single
/// kickoff user message is synthesized. Text passes through untouched,
/// empty strings included.
pub fn normalize_history(history: &[ConversationTurn]) -> Vec<LlmMessage> {
    let mut messages: Vec<LlmMessage> = history
        .iter()
        .filter_map(|turn| match turn.role {
            TurnRole::User => Some(LlmMessage::user(turn.text.clone())),
            TurnRole::Ai => Some(LlmMessage::assistant(turn.text.clone())),
            TurnRole::System => None,
        })
        .collect();

    if messages.is_empty() {
        messages.push(LlmMessage::user(INTERVIEW_KICKOFF));
    }

    messages
}

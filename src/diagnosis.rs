//! Diagnostic turn contract
//!
//! Defines the structured output the provider must produce for every
//! belief-update step, the JSON schema advertised to the provider, and the
//! validation that turns a raw payload into a [`DiagnosticTurnResponse`].
//!
//! A validated response cannot represent an inconsistent turn: the
//! status-dependent parts live in [`TurnOutcome`], so a continuing turn
//! always has a question and a concluded turn always has a diagnosis.

#[cfg(test)]
mod proptests;

use crate::llm::StructuredOutput;
use crate::transcript::ConversationTurn;
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;

/// Name of the structured-output contract as seen by the provider
pub const OUTPUT_NAME: &str = "record_diagnostic_turn";

pub const MIN_CONFIDENCE: f64 = 0.0;
pub const MAX_CONFIDENCE: f64 = 100.0;

/// Whether the interview goes on or has reached a conclusion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DiagnosticStatus {
    Continuing,
    DiagnosisReady,
}

impl DiagnosticStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Continuing => "CONTINUING",
            Self::DiagnosisReady => "DIAGNOSIS_READY",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s {
            "CONTINUING" => Some(Self::Continuing),
            "DIAGNOSIS_READY" => Some(Self::DiagnosisReady),
            _ => None,
        }
    }
}

/// A named condition with a confidence in `[0, 100]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnosis {
    pub name: String,
    pub confidence: f64,
}

/// Raw payload shape, exactly as the provider emits it.
///
/// Status stays a string here so an unknown value is reported as a contract
/// violation rather than a decode error.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagnosticTurnWire {
    pub status: String,
    pub reasoning_update: String,
    #[serde(default)]
    pub next_question: Option<String>,
    #[serde(default)]
    pub citation_text: Option<String>,
    #[serde(default)]
    pub citation_source: Option<String>,
    #[serde(default)]
    pub diagnosis: Option<Diagnosis>,
}

/// Status-dependent part of a validated turn
#[derive(Debug, Clone, PartialEq)]
pub enum TurnOutcome {
    Continuing { next_question: String },
    DiagnosisReady { diagnosis: Diagnosis },
}

/// One validated belief-update step.
///
/// Built only through validation and immutable afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "DiagnosticTurnWire", try_from = "DiagnosticTurnWire")]
pub struct DiagnosticTurnResponse {
    reasoning_update: String,
    citation_text: Option<String>,
    citation_source: Option<String>,
    outcome: TurnOutcome,
}

impl DiagnosticTurnResponse {
    /// Parse and validate a raw structured payload.
    ///
    /// The payload must be a single JSON object of the wire shape that also
    /// satisfies every turn invariant. Nothing is repaired.
    pub fn from_payload(raw: &str) -> Result<Self, PayloadError> {
        let wire: DiagnosticTurnWire = serde_json::from_str(raw)?;
        Ok(Self::try_from(wire)?)
    }

    pub fn status(&self) -> DiagnosticStatus {
        match self.outcome {
            TurnOutcome::Continuing { .. } => DiagnosticStatus::Continuing,
            TurnOutcome::DiagnosisReady { .. } => DiagnosticStatus::DiagnosisReady,
        }
    }

    pub fn outcome(&self) -> &TurnOutcome {
        &self.outcome
    }

    pub fn reasoning_update(&self) -> &str {
        &self.reasoning_update
    }

    pub fn next_question(&self) -> Option<&str> {
        match &self.outcome {
            TurnOutcome::Continuing { next_question } => Some(next_question),
            TurnOutcome::DiagnosisReady { .. } => None,
        }
    }

    pub fn diagnosis(&self) -> Option<&Diagnosis> {
        match &self.outcome {
            TurnOutcome::Continuing { .. } => None,
            TurnOutcome::DiagnosisReady { diagnosis } => Some(diagnosis),
        }
    }

    pub fn citation_text(&self) -> Option<&str> {
        self.citation_text.as_deref()
    }

    pub fn citation_source(&self) -> Option<&str> {
        self.citation_source.as_deref()
    }

    /// True once the dialogue has reached a diagnosis
    pub fn is_terminal(&self) -> bool {
        self.status() == DiagnosticStatus::DiagnosisReady
    }

    /// The `ai` turn a caller appends to its history for the next round-trip
    pub fn to_history_turn(&self) -> ConversationTurn {
        match &self.outcome {
            TurnOutcome::Continuing { next_question } => ConversationTurn::ai(next_question.clone()),
            TurnOutcome::DiagnosisReady { diagnosis } => {
                ConversationTurn::ai(format!("**DIAGNOSIS:** {}", diagnosis.name))
            }
        }
    }
}

impl TryFrom<DiagnosticTurnWire> for DiagnosticTurnResponse {
    type Error = ContractViolation;

    fn try_from(wire: DiagnosticTurnWire) -> Result<Self, Self::Error> {
        let status = DiagnosticStatus::parse(&wire.status)
            .ok_or_else(|| ContractViolation::UnknownStatus(wire.status.clone()))?;

        let outcome = match status {
            DiagnosticStatus::Continuing => {
                if wire.diagnosis.is_some() {
                    return Err(ContractViolation::UnexpectedDiagnosis);
                }
                match wire.next_question {
                    Some(q) if !q.trim().is_empty() => TurnOutcome::Continuing { next_question: q },
                    _ => return Err(ContractViolation::MissingNextQuestion),
                }
            }
            DiagnosticStatus::DiagnosisReady => {
                if wire.next_question.is_some() {
                    return Err(ContractViolation::UnexpectedNextQuestion);
                }
                let diagnosis = wire.diagnosis.ok_or(ContractViolation::MissingDiagnosis)?;
                if diagnosis.name.trim().is_empty() {
                    return Err(ContractViolation::EmptyDiagnosisName);
                }
                // NaN fails the range check too
                if !(MIN_CONFIDENCE..=MAX_CONFIDENCE).contains(&diagnosis.confidence) {
                    return Err(ContractViolation::ConfidenceOutOfRange(diagnosis.confidence));
                }
                TurnOutcome::DiagnosisReady { diagnosis }
            }
        };

        // Any non-empty text needs a source; only the source side is trimmed
        let has_text = wire.citation_text.as_deref().is_some_and(|t| !t.is_empty());
        let has_source = wire
            .citation_source
            .as_deref()
            .is_some_and(|s| !s.trim().is_empty());
        if has_text && !has_source {
            return Err(ContractViolation::MissingCitationSource);
        }

        Ok(Self {
            reasoning_update: wire.reasoning_update,
            citation_text: wire.citation_text,
            citation_source: wire.citation_source,
            outcome,
        })
    }
}

impl From<DiagnosticTurnResponse> for DiagnosticTurnWire {
    fn from(turn: DiagnosticTurnResponse) -> Self {
        let status = turn.status().as_str().to_string();
        let (next_question, diagnosis) = match turn.outcome {
            TurnOutcome::Continuing { next_question } => (Some(next_question), None),
            TurnOutcome::DiagnosisReady { diagnosis } => (None, Some(diagnosis)),
        };
        Self {
            status,
            reasoning_update: turn.reasoning_update,
            next_question,
            citation_text: turn.citation_text,
            citation_source: turn.citation_source,
            diagnosis,
        }
    }
}

/// A payload that decoded but breaks a turn invariant
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ContractViolation {
    #[error("unknown status '{0}', expected CONTINUING or DIAGNOSIS_READY")]
    UnknownStatus(String),
    #[error("CONTINUING turn has no next question")]
    MissingNextQuestion,
    #[error("CONTINUING turn carries a diagnosis")]
    UnexpectedDiagnosis,
    #[error("DIAGNOSIS_READY turn has no diagnosis")]
    MissingDiagnosis,
    #[error("DIAGNOSIS_READY turn still asks a next question")]
    UnexpectedNextQuestion,
    #[error("diagnosis name is empty")]
    EmptyDiagnosisName,
    #[error("diagnosis confidence {0} is outside [0, 100]")]
    ConfidenceOutOfRange(f64),
    #[error("citation text given without a citation source")]
    MissingCitationSource,
}

/// Why a raw payload could not become a [`DiagnosticTurnResponse`]
#[derive(Debug, Error)]
pub enum PayloadError {
    #[error("payload is not a diagnostic turn object: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("payload violates the turn contract: {0}")]
    Contract(#[from] ContractViolation),
}

/// JSON schema of the wire shape, written to be accepted by strict
/// structured-output modes (every key required, nullable where optional).
pub fn output_schema() -> serde_json::Value {
    json!({
        "type": "object",
        "properties": {
            "status": {
                "type": "string",
                "enum": ["CONTINUING", "DIAGNOSIS_READY"],
                "description": "CONTINUING while more questions are needed, DIAGNOSIS_READY once a probable diagnosis can be given."
            },
            "reasoningUpdate": {
                "type": "string",
                "description": "How the last user input changed the differential (what was ruled in or out)."
            },
            "nextQuestion": {
                "type": ["string", "null"],
                "description": "The next targeted question for the user. Null when status is DIAGNOSIS_READY."
            },
            "citationText": {
                "type": ["string", "null"],
                "description": "A short, credible snippet of medical information supporting the reasoning or question."
            },
            "citationSource": {
                "type": ["string", "null"],
                "description": "The source of the citation (e.g. Mayo Clinic, NIH). Required whenever citationText is given."
            },
            "diagnosis": {
                "anyOf": [
                    {
                        "type": "object",
                        "properties": {
                            "name": { "type": "string" },
                            "confidence": {
                                "type": "number",
                                "description": "Confidence score between 0 and 100."
                            }
                        },
                        "required": ["name", "confidence"],
                        "additionalProperties": false
                    },
                    { "type": "null" }
                ],
                "description": "The probable diagnosis. Null while status is CONTINUING."
            }
        },
        "required": [
            "status",
            "reasoningUpdate",
            "nextQuestion",
            "citationText",
            "citationSource",
            "diagnosis"
        ],
        "additionalProperties": false
    })
}

/// Structured-output constraint attached to every belief-update request
pub fn structured_output() -> StructuredOutput {
    StructuredOutput {
        name: OUTPUT_NAME.to_string(),
        description: "Record one step of the diagnostic interview.".to_string(),
        schema: output_schema(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transcript::TurnRole;

    fn continuing_payload() -> serde_json::Value {
        json!({
            "status": "CONTINUING",
            "reasoningUpdate": "Fever and cough point to a respiratory infection.",
            "nextQuestion": "How long have symptoms persisted?",
            "citationText": "Fever often indicates an infection.",
            "citationSource": "CDC",
            "diagnosis": null
        })
    }

    fn ready_payload() -> serde_json::Value {
        json!({
            "status": "DIAGNOSIS_READY",
            "reasoningUpdate": "Symptom duration and onset fit influenza.",
            "nextQuestion": null,
            "citationText": "Influenza causes sudden fever and body aches.",
            "citationSource": "Mayo Clinic",
            "diagnosis": {"name": "Influenza", "confidence": 82}
        })
    }

    fn parse(value: &serde_json::Value) -> Result<DiagnosticTurnResponse, PayloadError> {
        DiagnosticTurnResponse::from_payload(&value.to_string())
    }

    fn violation(value: &serde_json::Value) -> ContractViolation {
        match parse(value) {
            Err(PayloadError::Contract(v)) => v,
            other => panic!("expected contract violation, got {other:?}"),
        }
    }

    #[test]
    fn test_continuing_turn() {
        let turn = parse(&continuing_payload()).unwrap();
        assert_eq!(turn.status(), DiagnosticStatus::Continuing);
        assert_eq!(turn.next_question(), Some("How long have symptoms persisted?"));
        assert!(turn.diagnosis().is_none());
        assert_eq!(turn.citation_source(), Some("CDC"));
        assert!(!turn.is_terminal());
    }

    #[test]
    fn test_diagnosis_ready_turn() {
        let turn = parse(&ready_payload()).unwrap();
        assert!(turn.is_terminal());
        assert!(turn.next_question().is_none());
        let diagnosis = turn.diagnosis().unwrap();
        assert_eq!(diagnosis.name, "Influenza");
        assert!((diagnosis.confidence - 82.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_optional_keys_may_be_omitted() {
        let turn = DiagnosticTurnResponse::from_payload(
            r#"{"status": "CONTINUING", "reasoningUpdate": "", "nextQuestion": "Any rash?"}"#,
        )
        .unwrap();
        assert!(turn.citation_text().is_none());
        assert_eq!(turn.reasoning_update(), "");
    }

    #[test]
    fn test_unknown_status() {
        let mut payload = continuing_payload();
        payload["status"] = json!("THINKING");
        assert_eq!(
            violation(&payload),
            ContractViolation::UnknownStatus("THINKING".to_string())
        );
    }

    #[test]
    fn test_continuing_requires_question() {
        let mut payload = continuing_payload();
        payload["nextQuestion"] = json!(null);
        assert_eq!(violation(&payload), ContractViolation::MissingNextQuestion);

        payload["nextQuestion"] = json!("   ");
        assert_eq!(violation(&payload), ContractViolation::MissingNextQuestion);
    }

    #[test]
    fn test_continuing_rejects_diagnosis() {
        let mut payload = continuing_payload();
        payload["diagnosis"] = json!({"name": "Flu", "confidence": 40});
        assert_eq!(violation(&payload), ContractViolation::UnexpectedDiagnosis);
    }

    #[test]
    fn test_ready_rejects_next_question() {
        let mut payload = ready_payload();
        payload["nextQuestion"] = json!("Anything else?");
        assert_eq!(violation(&payload), ContractViolation::UnexpectedNextQuestion);
    }

    #[test]
    fn test_ready_requires_diagnosis() {
        let mut payload = ready_payload();
        payload["diagnosis"] = json!(null);
        assert_eq!(violation(&payload), ContractViolation::MissingDiagnosis);
    }

    #[test]
    fn test_confidence_bounds() {
        let mut payload = ready_payload();
        payload["diagnosis"]["confidence"] = json!(100.5);
        assert!(matches!(
            violation(&payload),
            ContractViolation::ConfidenceOutOfRange(_)
        ));

        payload["diagnosis"]["confidence"] = json!(-1);
        assert!(matches!(
            violation(&payload),
            ContractViolation::ConfidenceOutOfRange(_)
        ));

        payload["diagnosis"]["confidence"] = json!(0);
        assert!(parse(&payload).is_ok());
        payload["diagnosis"]["confidence"] = json!(100);
        assert!(parse(&payload).is_ok());
    }

    #[test]
    fn test_empty_diagnosis_name() {
        let mut payload = ready_payload();
        payload["diagnosis"]["name"] = json!("");
        assert_eq!(violation(&payload), ContractViolation::EmptyDiagnosisName);
    }

    #[test]
    fn test_citation_requires_source() {
        let mut payload = continuing_payload();
        payload["citationSource"] = json!(null);
        assert_eq!(violation(&payload), ContractViolation::MissingCitationSource);

        payload["citationSource"] = json!("");
        assert_eq!(violation(&payload), ContractViolation::MissingCitationSource);

        payload["citationText"] = json!("   ");
        payload["citationSource"] = json!(null);
        assert_eq!(violation(&payload), ContractViolation::MissingCitationSource);

        payload["citationSource"] = json!("  ");
        assert_eq!(violation(&payload), ContractViolation::MissingCitationSource);

        // A source without text is fine
        payload["citationText"] = json!(null);
        payload["citationSource"] = json!("NIH");
        assert!(parse(&payload).is_ok());
    }

    #[test]
    fn test_malformed_payloads() {
        for raw in [
            "",
            "not json",
            r#"{"status": "CONTINUING", "reasoningUpd"#,
            "[]",
            r#"{"status": "CONTINUING"}"#,
            r#"{"status": "DIAGNOSIS_READY", "reasoningUpdate": "x", "diagnosis": {"name": "Flu", "confidence": "high"}}"#,
            "```json\n{}\n```",
        ] {
            assert!(
                matches!(
                    DiagnosticTurnResponse::from_payload(raw),
                    Err(PayloadError::Malformed(_))
                ),
                "expected malformed for {raw:?}"
            );
        }
    }

    #[test]
    fn test_serializes_to_wire_shape() {
        let turn = parse(&ready_payload()).unwrap();
        let value = serde_json::to_value(&turn).unwrap();
        assert_eq!(value["status"], "DIAGNOSIS_READY");
        assert_eq!(value["nextQuestion"], json!(null));
        assert_eq!(value["diagnosis"]["name"], "Influenza");
        assert_eq!(value["citationSource"], "Mayo Clinic");
        assert_eq!(value.as_object().unwrap().len(), 6);
    }

    #[test]
    fn test_deserialize_validates() {
        let mut payload = continuing_payload();
        payload["nextQuestion"] = json!(null);
        assert!(serde_json::from_value::<DiagnosticTurnResponse>(payload).is_err());
    }

    #[test]
    fn test_history_turn() {
        let question = parse(&continuing_payload()).unwrap().to_history_turn();
        assert_eq!(question.role, TurnRole::Ai);
        assert_eq!(question.text, "How long have symptoms persisted?");

        let conclusion = parse(&ready_payload()).unwrap().to_history_turn();
        assert_eq!(conclusion.text, "**DIAGNOSIS:** Influenza");
    }

    #[test]
    fn test_schema_requires_every_key() {
        let schema = output_schema();
        let required: Vec<_> = schema["required"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(|v| v.as_str())
            .collect();
        let properties = schema["properties"].as_object().unwrap();
        assert_eq!(required.len(), properties.len());
        for key in properties.keys() {
            assert!(required.contains(&key.as_str()), "{key} not required");
        }
        assert_eq!(structured_output().name, OUTPUT_NAME);
    }
}

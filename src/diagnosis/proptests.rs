//! Property-based tests for turn validation
//!
//! Raw payloads are generated with every field independently varied, so
//! both consistent and inconsistent turns are produced. Whatever validation
//! accepts must satisfy the turn invariants, and whatever satisfies them
//! must be accepted.

use super::*;
use proptest::prelude::*;

fn arb_status() -> impl Strategy<Value = String> {
    prop_oneof![
        4 => Just("CONTINUING".to_string()),
        4 => Just("DIAGNOSIS_READY".to_string()),
        1 => "[A-Za-z_]{0,16}",
    ]
}

/// Optional text, biased towards the blank edge cases
fn arb_opt_text() -> impl Strategy<Value = Option<String>> {
    prop_oneof![
        Just(None),
        Just(Some(String::new())),
        Just(Some("   ".to_string())),
        "[a-zA-Z0-9 ?.,]{1,60}".prop_map(Some),
    ]
}

fn arb_diagnosis() -> impl Strategy<Value = Option<Diagnosis>> {
    let name = prop_oneof![Just(String::new()), "[A-Za-z ]{1,30}"];
    let confidence = prop_oneof![
        4 => 0.0f64..=100.0,
        1 => -1000.0f64..0.0,
        1 => 100.000_001f64..1000.0,
        1 => Just(f64::NAN),
    ];
    proptest::option::of((name, confidence).prop_map(|(name, confidence)| Diagnosis {
        name,
        confidence,
    }))
}

fn arb_wire() -> impl Strategy<Value = DiagnosticTurnWire> {
    (
        arb_status(),
        "[a-zA-Z0-9 .,]{0,80}",
        arb_opt_text(),
        arb_opt_text(),
        arb_opt_text(),
        arb_diagnosis(),
    )
        .prop_map(
            |(status, reasoning_update, next_question, citation_text, citation_source, diagnosis)| {
                DiagnosticTurnWire {
                    status,
                    reasoning_update,
                    next_question,
                    citation_text,
                    citation_source,
                    diagnosis,
                }
            },
        )
}

fn non_blank(s: Option<&String>) -> bool {
    s.is_some_and(|s| !s.trim().is_empty())
}

/// The four turn invariants, checked directly on the raw shape
fn satisfies_invariants(wire: &DiagnosticTurnWire) -> bool {
    let has_text = wire.citation_text.as_ref().is_some_and(|t| !t.is_empty());
    let citation_ok = !has_text || non_blank(wire.citation_source.as_ref());
    let status_ok = match wire.status.as_str() {
        "CONTINUING" => non_blank(wire.next_question.as_ref()) && wire.diagnosis.is_none(),
        "DIAGNOSIS_READY" => {
            wire.next_question.is_none()
                && wire.diagnosis.as_ref().is_some_and(|d| {
                    !d.name.trim().is_empty() && (0.0..=100.0).contains(&d.confidence)
                })
        }
        _ => false,
    };
    citation_ok && status_ok
}

proptest! {
    #[test]
    fn prop_accepted_iff_invariants_hold(wire in arb_wire()) {
        let expected = satisfies_invariants(&wire);
        let result = DiagnosticTurnResponse::try_from(wire);
        prop_assert_eq!(result.is_ok(), expected);
    }

    #[test]
    fn prop_accepted_turns_serialize_consistently(wire in arb_wire()) {
        if let Ok(turn) = DiagnosticTurnResponse::try_from(wire) {
            let value = serde_json::to_value(&turn).unwrap();
            match value["status"].as_str().unwrap() {
                "CONTINUING" => {
                    let question = value["nextQuestion"].as_str().unwrap();
                    prop_assert!(!question.trim().is_empty());
                    prop_assert!(value["diagnosis"].is_null());
                }
                "DIAGNOSIS_READY" => {
                    let confidence = value["diagnosis"]["confidence"].as_f64().unwrap();
                    prop_assert!((0.0..=100.0).contains(&confidence));
                    prop_assert!(value["nextQuestion"].is_null());
                }
                other => prop_assert!(false, "unexpected status {}", other),
            }
            if value["citationText"].as_str().is_some_and(|t| !t.is_empty()) {
                prop_assert!(value["citationSource"].as_str().is_some_and(|s| !s.trim().is_empty()));
            }
        }
    }

    #[test]
    fn prop_arbitrary_text_never_panics(raw in ".{0,200}") {
        let _ = DiagnosticTurnResponse::from_payload(&raw);
    }
}

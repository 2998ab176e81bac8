//! Integration tests for inbound event decoding and outbound payload shapes.

use serde_json::json;
use shipcheck_core::envconfig::EnvironmentConfig;
use shipcheck_core::error::ProtocolError;
use shipcheck_core::protocol::{
    self, InboundEvent, PhaseName, StartAnalysis, SubmitResponses, UpdateKind,
};
use shipcheck_core::questions;

fn update_kind(payload: serde_json::Value) -> UpdateKind {
    match InboundEvent::decode("analysis_update", payload).unwrap() {
        InboundEvent::Update(update) => update.kind,
        other => panic!("expected an update, got {other:?}"),
    }
}

#[test]
fn connected_carries_the_session_id() {
    let event = InboundEvent::decode("connected", json!({ "session_id": "abc123" })).unwrap();
    assert_eq!(event, InboundEvent::Connected { session_id: "abc123".into() });
}

#[test]
fn statuses_decode_to_their_variants() {
    assert_eq!(update_kind(json!({ "status": "started", "message": "go" })), UpdateKind::Started);
    assert_eq!(update_kind(json!({ "status": "processing" })), UpdateKind::Processing);
    assert_eq!(
        update_kind(json!({
            "status": "phase_complete",
            "data": { "phase": "initial", "result": "MISSING INFO NEEDED: db url" }
        })),
        UpdateKind::PhaseComplete {
            phase: PhaseName::Initial,
            result: "MISSING INFO NEEDED: db url".into()
        }
    );
    assert_eq!(
        update_kind(json!({ "status": "questions_ready", "data": { "questions": "1. Q?" } })),
        UpdateKind::QuestionsReady { questions: "1. Q?".into() }
    );
    assert_eq!(
        update_kind(json!({
            "status": "completed",
            "data": { "final_assessment": "**ANSWER: YES**" }
        })),
        UpdateKind::Completed { final_assessment: "**ANSWER: YES**".into() }
    );
    assert_eq!(update_kind(json!({ "status": "error", "message": "boom" })), UpdateKind::Error);
}

#[test]
fn unknown_status_is_explicitly_unrecognized() {
    assert_eq!(
        update_kind(json!({ "status": "paused" })),
        UpdateKind::Unrecognized("paused".into())
    );
}

#[test]
fn update_message_and_timestamp_are_kept() {
    let event = InboundEvent::decode(
        "analysis_update",
        json!({
            "status": "processing",
            "message": "Checking",
            "timestamp": "2024-05-01T12:30:45.123456"
        }),
    )
    .unwrap();
    let InboundEvent::Update(update) = event else {
        panic!("expected an update");
    };
    assert_eq!(update.message, "Checking");
    let parsed = update.parsed_timestamp().expect("naive isoformat parses");
    assert_eq!(parsed.format("%H:%M:%S").to_string(), "12:30:45");
}

#[test]
fn timestamps_accept_offsets_and_reject_garbage() {
    assert!(protocol::parse_timestamp("2024-05-01T12:30:45Z").is_some());
    assert!(protocol::parse_timestamp("2024-05-01T12:30:45+02:00").is_some());
    assert!(protocol::parse_timestamp("2024-05-01T12:30:45").is_some());
    assert!(protocol::parse_timestamp("yesterday").is_none());
}

#[test]
fn status_payload_without_data_is_an_error() {
    let missing = InboundEvent::decode("analysis_update", json!({ "status": "questions_ready" }));
    assert!(matches!(missing, Err(ProtocolError::MissingData { .. })));

    let null =
        InboundEvent::decode("analysis_update", json!({ "status": "completed", "data": null }));
    assert!(matches!(null, Err(ProtocolError::MissingData { .. })));
}

#[test]
fn malformed_payloads_are_protocol_errors() {
    let bad_phase = InboundEvent::decode(
        "analysis_update",
        json!({ "status": "phase_complete", "data": { "phase": "bogus", "result": "" } }),
    );
    assert!(matches!(bad_phase, Err(ProtocolError::Payload { .. })));

    let no_session = InboundEvent::decode("connected", json!({}));
    assert!(matches!(no_session, Err(ProtocolError::Payload { .. })));
}

#[test]
fn channel_error_and_unknown_events() {
    assert_eq!(
        InboundEvent::decode("error", json!({ "message": "API key not configured" })).unwrap(),
        InboundEvent::ChannelError { message: "API key not configured".into() }
    );
    assert_eq!(
        InboundEvent::decode("session_status", json!({ "status": "none" })).unwrap(),
        InboundEvent::Unknown { name: "session_status".into() }
    );
}

#[test]
fn marker_detection_is_case_insensitive() {
    assert!(protocol::needs_more_info("Result...\nMISSING INFO NEEDED: database url"));
    assert!(protocol::needs_more_info("missing info needed: port"));
    assert!(!protocol::needs_more_info("Everything looks fine."));
}

#[test]
fn start_payload_omits_absent_credential() {
    let mut config = EnvironmentConfig::new();
    config.insert("PORT", "8080");
    let public = StartAnalysis {
        repository_url: "https://github.com/acme/api".into(),
        environment_config: config.clone(),
        credential: None,
    };
    assert_eq!(
        serde_json::to_value(&public).unwrap(),
        json!({
            "repository_url": "https://github.com/acme/api",
            "environment_config": { "PORT": "8080" }
        })
    );

    let private = StartAnalysis { credential: Some("ghp_x".into()), ..public };
    assert_eq!(serde_json::to_value(&private).unwrap()["credential"], json!("ghp_x"));
}

#[test]
fn submit_payload_lists_question_answer_pairs() {
    let items = questions::parse("1. DB?\n2. Port?");
    let answers = ["postgres", "8080"];
    let submission = questions::collect_answers(&items, |i| answers.get(i).copied()).unwrap();

    assert_eq!(
        serde_json::to_value(SubmitResponses::from(&submission)).unwrap(),
        json!({
            "responses": [
                { "question": "DB?", "answer": "postgres" },
                { "question": "Port?", "answer": "8080" }
            ]
        })
    );
}

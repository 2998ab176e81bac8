//! Session state machine scenarios.
//!
//! The controller is driven with a recording transport and a counting ticker so
//! every outbound emit and every timer start/stop is observable.

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::{Duration, Instant};

use serde_json::{json, Value};
use shipcheck_core::controller::{
    format_elapsed, AnalysisSessionController, NoticeKind, Phase, PhaseStatus, StartRequest,
    NOTICE_TTL,
};
use shipcheck_core::envconfig::EnvironmentConfig;
use shipcheck_core::error::{SubmitError, TransportError, ValidationError};
use shipcheck_core::protocol::PhaseName;
use shipcheck_core::timer::Ticker;
use shipcheck_core::transport::{ChannelEvent, Transport};
use shipcheck_core::types::SessionOutcome;
use shipcheck_core::verdict::Verdict;

const REPO: &str = "https://github.com/acme/api";

#[derive(Clone, Default)]
struct RecordingTransport {
    sent: Rc<RefCell<Vec<(String, Value)>>>,
    broken: Rc<Cell<bool>>,
}

impl RecordingTransport {
    fn events(&self) -> Vec<String> {
        self.sent.borrow().iter().map(|(name, _)| name.clone()).collect()
    }

    fn payload(&self, index: usize) -> Value {
        self.sent.borrow()[index].1.clone()
    }
}

impl Transport for RecordingTransport {
    fn emit(&self, event: &str, payload: Value) -> Result<(), TransportError> {
        if self.broken.get() {
            return Err(TransportError::Closed);
        }
        self.sent.borrow_mut().push((event.to_owned(), payload));
        Ok(())
    }
}

/// Counts active timers without the replace-on-start guarantee, so a missing
/// `stop` before `start` shows up as two active timers.
#[derive(Clone, Default)]
struct CountingTicker {
    active: Rc<Cell<u32>>,
    max_active: Rc<Cell<u32>>,
    starts: Rc<Cell<u32>>,
}

impl Ticker for CountingTicker {
    fn start(&mut self) {
        self.active.set(self.active.get() + 1);
        self.max_active.set(self.max_active.get().max(self.active.get()));
        self.starts.set(self.starts.get() + 1);
    }

    fn stop(&mut self) {
        self.active.set(0);
    }

    fn is_running(&self) -> bool {
        self.active.get() > 0
    }
}

type Controller = AnalysisSessionController<RecordingTransport, CountingTicker>;

fn controller() -> (Controller, RecordingTransport, CountingTicker) {
    let transport = RecordingTransport::default();
    let ticker = CountingTicker::default();
    let controller = AnalysisSessionController::new(transport.clone(), ticker.clone());
    (controller, transport, ticker)
}

fn connected(id: &str) -> ChannelEvent {
    ChannelEvent::Inbound { name: "connected".into(), payload: json!({ "session_id": id }) }
}

fn update(status: &str, data: Value) -> ChannelEvent {
    ChannelEvent::Inbound {
        name: "analysis_update".into(),
        payload: json!({
            "status": status,
            "message": format!("{status} message"),
            "timestamp": "2024-05-01T12:00:00.000000",
            "data": data,
        }),
    }
}

fn phase_complete(phase: &str, result: &str) -> ChannelEvent {
    update("phase_complete", json!({ "phase": phase, "result": result }))
}

fn start_request() -> StartRequest {
    let mut config = EnvironmentConfig::new();
    config.insert("PORT", "8080");
    config.insert("SECRET_KEY", "hunter2");
    StartRequest::public(REPO, config)
}

/// Connected controller with a started session.
fn started() -> (Controller, RecordingTransport, CountingTicker) {
    let (mut c, transport, ticker) = controller();
    c.on_channel_event(ChannelEvent::Connected);
    c.on_channel_event(connected("sid-1"));
    c.start(start_request()).unwrap();
    c.on_channel_event(update("started", Value::Null));
    (c, transport, ticker)
}

#[test]
fn start_sends_request_and_runs_timer() {
    let (c, transport, ticker) = started();

    assert_eq!(c.phase(), Phase::Initial);
    assert_eq!(transport.events(), vec!["start_analysis"]);
    assert_eq!(
        transport.payload(0),
        json!({
            "repository_url": REPO,
            "environment_config": { "PORT": "8080", "SECRET_KEY": "hunter2" }
        })
    );
    assert!(ticker.is_running());
    assert_eq!(c.session().progress.get(PhaseName::Initial), PhaseStatus::Running);
    assert!(!c.can_start());
}

#[test]
fn marker_in_initial_result_leads_to_questions() {
    let (mut c, _, _) = started();
    c.on_channel_event(phase_complete("initial", "Needs work.\nMISSING INFO NEEDED: database url"));

    assert_eq!(c.phase(), Phase::Questions);
    let progress = c.session().progress;
    assert_eq!(progress.get(PhaseName::Initial), PhaseStatus::Complete);
    assert_eq!(progress.get(PhaseName::Questions), PhaseStatus::Running);
    assert_eq!(progress.get(PhaseName::Final), PhaseStatus::Pending);
}

#[test]
fn no_marker_goes_straight_to_final() {
    let (mut c, _, ticker) = started();
    c.on_channel_event(update("processing", Value::Null));
    c.on_channel_event(phase_complete("initial", "looks fine"));

    assert_eq!(c.phase(), Phase::Final);
    assert_eq!(c.session().progress.get(PhaseName::Questions), PhaseStatus::Pending);
    assert_eq!(c.session().progress.get(PhaseName::Final), PhaseStatus::Running);

    c.on_channel_event(phase_complete("final", "done"));
    c.on_channel_event(update(
        "completed",
        json!({ "final_assessment": "Ready.\n**ANSWER: YES**" }),
    ));

    assert!(c.session().is_terminal());
    assert_eq!(c.outcome().map(|a| a.verdict), Some(Verdict::Yes));
    assert_eq!(
        c.session().progress.get(PhaseName::Questions),
        PhaseStatus::Pending,
        "phase 2 never ran"
    );
    assert_eq!(c.session().progress.get(PhaseName::Final), PhaseStatus::Complete);
    assert!(!ticker.is_running());
    assert!(c.can_start());

    let finished = c.take_finished();
    assert_eq!(finished.len(), 1);
    assert_eq!(finished[0].outcome, SessionOutcome::Completed);
    assert_eq!(finished[0].verdict, Some(Verdict::Yes));
    assert_eq!(finished[0].config_keys, 2);
    assert!(c.take_finished().is_empty());
}

#[test]
fn full_question_round() {
    let (mut c, transport, _) = started();
    c.on_channel_event(phase_complete("initial", "missing info needed: db and port"));
    c.on_channel_event(phase_complete("questions", "1. DB?\n2. Port?"));
    c.on_channel_event(update(
        "questions_ready",
        json!({ "questions": "1. Which database?\n2. Which port?" }),
    ));

    let round = c.round().expect("round materialized");
    assert_eq!(round.items.len(), 2);
    assert_eq!(round.items[1].text, "Which port?");
    assert_eq!(c.session().progress.get(PhaseName::Questions), PhaseStatus::Complete);

    let blank = ["", "  "];
    assert_eq!(
        c.submit_answers(|i| blank.get(i).copied()),
        Err(SubmitError::Validation(ValidationError::NoAnswers))
    );
    assert_eq!(c.notice().map(|n| n.kind), Some(NoticeKind::Validation));
    assert_eq!(transport.events(), vec!["start_analysis"], "nothing sent on rejection");
    assert_eq!(c.phase(), Phase::Questions);

    let answers = ["postgres", ""];
    assert_eq!(c.submit_answers(|i| answers.get(i).copied()), Ok(1));
    assert_eq!(c.phase(), Phase::Final);
    assert!(c.round().is_none());
    assert_eq!(c.session().progress.get(PhaseName::Final), PhaseStatus::Running);
    assert_eq!(transport.events(), vec!["start_analysis", "submit_responses"]);
    assert_eq!(
        transport.payload(1),
        json!({ "responses": [{ "question": "Which database?", "answer": "postgres" }] })
    );

    c.on_channel_event(update("completed", json!({ "final_assessment": "**ANSWER: no**" })));
    assert_eq!(c.outcome().map(|a| a.verdict), Some(Verdict::No));
}

#[test]
fn submitting_outside_a_round_is_rejected() {
    let (mut c, transport, _) = started();
    let answers = ["x"];
    assert_eq!(
        c.submit_answers(|i| answers.get(i).copied()),
        Err(SubmitError::Validation(ValidationError::NotAwaitingAnswers))
    );
    assert_eq!(transport.events().len(), 1);
}

#[test]
fn reset_during_questions_discards_the_round() {
    let (mut c, transport, ticker) = started();
    c.on_channel_event(phase_complete("initial", "missing info needed: lots"));
    c.on_channel_event(update("questions_ready", json!({ "questions": "1. Old question?" })));
    assert!(c.round().is_some());

    c.reset();
    assert_eq!(c.phase(), Phase::Idle);
    assert!(c.round().is_none());
    assert!(c.session().log.is_empty());
    assert!(c.session().config.is_none());
    assert_eq!(c.session().session_id.as_deref(), Some("sid-1"), "session id survives reset");
    assert!(!ticker.is_running());

    // Late traffic of the abandoned session.
    c.on_channel_event(update("questions_ready", json!({ "questions": "1. Old question?" })));
    assert!(c.round().is_none());
    assert_eq!(c.phase(), Phase::Idle);

    c.start(start_request()).unwrap();
    assert_eq!(transport.events(), vec!["start_analysis", "start_analysis"]);

    // Still stale: the new session has not reported `started` yet.
    c.on_channel_event(update("questions_ready", json!({ "questions": "1. Old question?" })));
    assert!(c.round().is_none());
    assert_eq!(c.phase(), Phase::Initial);

    c.on_channel_event(update("started", Value::Null));
    c.on_channel_event(phase_complete("initial", "MISSING INFO NEEDED: port"));
    c.on_channel_event(update("questions_ready", json!({ "questions": "1. New question?" })));

    let texts: Vec<&str> = c
        .round()
        .unwrap()
        .items
        .iter()
        .map(|q| q.text.as_str())
        .collect();
    assert_eq!(texts, vec!["New question?"]);
}

#[test]
fn start_before_session_id_is_queued_then_flushed() {
    let (mut c, transport, ticker) = controller();
    c.on_channel_event(ChannelEvent::Connected);
    c.start(start_request()).unwrap();

    assert!(c.session().is_start_queued());
    assert!(transport.events().is_empty());
    assert_eq!(c.phase(), Phase::Initial);
    assert!(ticker.is_running());

    c.on_channel_event(connected("sid-9"));
    assert!(!c.session().is_start_queued());
    assert_eq!(transport.events(), vec!["start_analysis"]);
    assert_eq!(c.session().session_id.as_deref(), Some("sid-9"));
}

#[test]
fn error_update_returns_to_idle_and_allows_restart() {
    let (mut c, transport, ticker) = started();
    c.on_channel_event(update("error", Value::Null));

    assert_eq!(c.phase(), Phase::Idle);
    assert_eq!(c.session().progress.get(PhaseName::Initial), PhaseStatus::Failed);
    assert!(!ticker.is_running());
    let notice = c.notice().expect("error surfaced");
    assert_eq!(notice.kind, NoticeKind::Protocol);
    assert_eq!(notice.message, "error message");

    let finished = c.take_finished();
    assert_eq!(finished.len(), 1);
    assert_eq!(finished[0].outcome, SessionOutcome::Failed);
    assert_eq!(finished[0].verdict, None);

    c.start(start_request()).unwrap();
    assert_eq!(c.phase(), Phase::Initial);
    assert_eq!(transport.events().len(), 2);
    assert_eq!(c.session().progress.get(PhaseName::Initial), PhaseStatus::Pending);
}

#[test]
fn channel_error_ends_an_active_session() {
    let (mut c, _, ticker) = started();
    c.on_channel_event(phase_complete("initial", "fine"));
    c.on_channel_event(ChannelEvent::Inbound {
        name: "error".into(),
        payload: json!({ "message": "No active analysis session found" }),
    });

    assert_eq!(c.phase(), Phase::Idle);
    assert_eq!(c.session().progress.get(PhaseName::Final), PhaseStatus::Failed);
    assert_eq!(c.notice().unwrap().message, "No active analysis session found");
    assert!(!ticker.is_running());
}

#[test]
fn channel_error_while_idle_only_raises_a_notice() {
    let (mut c, _, _) = controller();
    c.on_channel_event(ChannelEvent::Inbound {
        name: "error".into(),
        payload: json!({ "message": "API key not configured" }),
    });
    assert_eq!(c.phase(), Phase::Idle);
    assert_eq!(c.notice().map(|n| n.kind), Some(NoticeKind::Protocol));
    assert!(c.take_finished().is_empty());
}

#[test]
fn disconnect_during_session_fails_it() {
    let (mut c, _, ticker) = started();
    c.on_channel_event(ChannelEvent::Disconnected { reason: "reset by peer".into() });

    assert_eq!(c.phase(), Phase::Idle);
    assert!(c.session().session_id.is_none());
    assert!(c.notice().unwrap().message.contains("Connection lost"));
    assert!(!ticker.is_running());
}

#[test]
fn busy_session_rejects_a_second_start() {
    let (mut c, transport, _) = started();
    assert_eq!(c.start(start_request()), Err(ValidationError::SessionBusy));
    assert_eq!(transport.events().len(), 1);
    assert_eq!(c.phase(), Phase::Initial);
}

#[test]
fn invalid_requests_never_touch_the_channel() {
    let (mut c, transport, ticker) = controller();
    c.on_channel_event(connected("sid-1"));

    let empty = StartRequest::public("   ", EnvironmentConfig::new());
    assert_eq!(c.start(empty), Err(ValidationError::EmptyRepositoryUrl));

    let gitlab = StartRequest::public("https://gitlab.com/acme/api", EnvironmentConfig::new());
    assert!(matches!(c.start(gitlab), Err(ValidationError::InvalidRepositoryUrl(_))));

    let no_token = StartRequest::private(REPO, " ", EnvironmentConfig::new());
    assert_eq!(c.start(no_token), Err(ValidationError::MissingCredential));

    assert!(transport.events().is_empty());
    assert_eq!(ticker.starts.get(), 0);
    assert_eq!(c.phase(), Phase::Idle);
    assert_eq!(c.notice().map(|n| n.kind), Some(NoticeKind::Validation));
}

#[test]
fn credential_is_sent_only_for_private_repositories() {
    let (mut c, transport, _) = controller();
    c.on_channel_event(connected("sid-1"));
    c.start(StartRequest::private(REPO, "ghp_abc", EnvironmentConfig::new())).unwrap();
    assert_eq!(transport.payload(0)["credential"], json!("ghp_abc"));

    c.reset();
    let mut public = StartRequest::public(REPO, EnvironmentConfig::new());
    public.credential = Some("ghp_ignored".into());
    c.start(public).unwrap();
    assert!(transport.payload(1).get("credential").is_none());
}

#[test]
fn starting_from_a_terminal_session_resets_it() {
    let (mut c, _, _) = started();
    c.on_channel_event(phase_complete("initial", "fine"));
    c.on_channel_event(update("completed", json!({ "final_assessment": "no marker here" })));
    assert_eq!(c.outcome().map(|a| a.verdict), Some(Verdict::Unknown));
    let generation = c.session().generation;

    c.start(start_request()).unwrap();
    assert!(c.outcome().is_none());
    assert!(c.session().log.is_empty());
    assert!(c.session().generation > generation);
    assert_eq!(c.phase(), Phase::Initial);
}

#[test]
fn updates_after_completion_are_ignored() {
    let (mut c, _, _) = started();
    c.on_channel_event(update("completed", json!({ "final_assessment": "**ANSWER: YES**" })));
    let log_len = c.session().log.len();

    c.on_channel_event(update("error", Value::Null));
    assert!(c.session().is_terminal());
    assert_eq!(c.session().log.len(), log_len);
    assert!(c.notice().is_none());
}

#[test]
fn unknown_status_is_logged_without_transition() {
    let (mut c, _, _) = started();
    c.on_channel_event(update("paused", Value::Null));

    assert_eq!(c.phase(), Phase::Initial);
    let last = c.session().log.last().unwrap();
    assert_eq!(last.status, "paused");
    assert_eq!(last.time_label(), "12:00:00");
}

#[test]
fn final_phase_without_questions_skips_the_round() {
    let (mut c, _, _) = started();
    c.on_channel_event(phase_complete("initial", "missing info needed: x"));
    c.on_channel_event(phase_complete("questions", "NO QUESTIONS NEEDED"));
    c.on_channel_event(phase_complete("final", "**ANSWER: YES**"));

    assert_eq!(c.phase(), Phase::Final);
    assert!(c.round().is_none());
    assert_eq!(c.session().progress.get(PhaseName::Final), PhaseStatus::Complete);
}

#[test]
fn second_session_id_is_ignored() {
    let (mut c, _, _) = controller();
    c.on_channel_event(connected("first"));
    c.on_channel_event(connected("second"));
    assert_eq!(c.session().session_id.as_deref(), Some("first"));
}

#[test]
fn send_failure_fails_the_session() {
    let (mut c, transport, ticker) = controller();
    c.on_channel_event(connected("sid-1"));
    transport.broken.set(true);
    c.start(start_request()).unwrap();

    assert_eq!(c.phase(), Phase::Idle);
    assert_eq!(c.notice().map(|n| n.kind), Some(NoticeKind::Protocol));
    assert!(!ticker.is_running());
}

#[test]
fn undelivered_answers_end_the_session() {
    let (mut c, transport, ticker) = started();
    c.on_channel_event(phase_complete("initial", "missing info needed: port"));
    c.on_channel_event(update("questions_ready", json!({ "questions": "1. Which port?" })));
    assert!(c.round().is_some());

    transport.broken.set(true);
    let answers = ["8080"];
    let result = c.submit_answers(|i| answers.get(i).copied());

    assert!(matches!(result, Err(SubmitError::Undelivered(_))));
    assert_eq!(c.phase(), Phase::Idle);
    assert_eq!(c.notice().map(|n| n.kind), Some(NoticeKind::Protocol));
    assert!(!ticker.is_running());
    assert_eq!(c.take_finished()[0].outcome, SessionOutcome::Failed);
}

#[test]
fn blank_question_text_opens_no_round() {
    let (mut c, transport, _) = started();
    c.on_channel_event(phase_complete("initial", "missing info needed: port"));
    c.on_channel_event(update("questions_ready", json!({ "questions": "  \n " })));

    assert_eq!(c.phase(), Phase::Questions);
    assert!(c.round().is_none());

    // The service moving on without questions still reaches the final phase.
    c.on_channel_event(phase_complete("final", ""));
    assert_eq!(c.phase(), Phase::Final);
    assert_eq!(transport.events(), vec!["start_analysis"]);
}

#[test]
fn never_more_than_one_timer() {
    let (mut c, _, ticker) = started();
    c.reset();
    c.start(start_request()).unwrap();
    c.on_channel_event(update("started", Value::Null));
    c.on_channel_event(update("completed", json!({ "final_assessment": "**ANSWER: YES**" })));
    c.start(start_request()).unwrap();
    c.on_channel_event(update("error", Value::Null));
    c.start(start_request()).unwrap();

    assert_eq!(ticker.starts.get(), 4);
    assert_eq!(ticker.max_active.get(), 1);
}

#[test]
fn notices_expire_after_ttl() {
    let (mut c, _, _) = controller();
    c.notify(NoticeKind::Info, "hello");
    let raised = c.notice().unwrap().raised_at;

    assert!(!c.expire_notice(raised + NOTICE_TTL - Duration::from_millis(1)));
    assert!(c.notice().is_some());
    assert!(c.expire_notice(raised + NOTICE_TTL));
    assert!(c.notice().is_none());
}

#[test]
fn elapsed_time_freezes_on_completion() {
    let (mut c, _, _) = started();
    c.on_channel_event(update("completed", json!({ "final_assessment": "**ANSWER: YES**" })));

    let now = Instant::now();
    let frozen = c.session().elapsed_at(now).unwrap();
    assert_eq!(c.session().elapsed_at(now + Duration::from_secs(60)), Some(frozen));

    assert_eq!(format_elapsed(Duration::from_secs(125)), "2:05");
    assert_eq!(format_elapsed(Duration::from_secs(9)), "0:09");
}

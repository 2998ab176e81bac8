//! Analysis session orchestration.
//!
//! [`AnalysisSessionController`] owns the single [`Session`] of one channel
//! connection and is the only code that mutates it. User actions (`start`,
//! `submit_answers`, `reset`) and channel traffic (`on_channel_event`) are all
//! funnelled through it from one event loop, so no locking is involved.
//!
//! # Phases
//!
//! ```text
//! Idle ──start──▶ Initial ──phase_complete(initial)──▶ Questions ──submit──▶ Final
//!                    │            marker present                               ▲
//!                    └────────────── marker absent ────────────────────────────┘
//! ```
//!
//! `completed` makes `Final` terminal. An `error` from any non-terminal phase
//! returns to `Idle`. `reset` returns to `Idle` unconditionally.
//!
//! # Stale events
//!
//! The service does not tag updates with a session, so after a reset or a new
//! start the controller cannot tell an old session's update from a new one by
//! content. Every reset and start bumps [`Session::generation`]; while `Idle`
//! every update is dropped, and after a start only `started`/`processing` are
//! accepted until the new session's `started` arrives.

use std::time::{Duration, Instant};

use chrono::{DateTime, FixedOffset, Utc};
use serde_json::Value;

use crate::envconfig::EnvironmentConfig;
use crate::error::{SubmitError, ValidationError};
use crate::protocol::{
    self, AnalysisUpdate, InboundEvent, PhaseName, StartAnalysis, SubmitResponses, UpdateKind,
    EVENT_START_ANALYSIS, EVENT_SUBMIT_RESPONSES,
};
use crate::questions::{self, QuestionItem};
use crate::timer::Ticker;
use crate::transport::{ChannelEvent, Transport};
use crate::types::{FinishedSession, SessionOutcome};
use crate::verdict::Assessment;

/// How long a notice stays visible.
pub const NOTICE_TTL: Duration = Duration::from_secs(5);

/// Every accepted repository URL starts with this.
pub const GITHUB_URL_PREFIX: &str = "https://github.com/";

/// Controller phase.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Phase {
    #[default]
    Idle,
    Initial,
    Questions,
    /// Pending until `completed` sets [`Session::outcome`], terminal afterwards.
    Final,
}

impl Phase {
    pub fn label(self) -> &'static str {
        match self {
            Phase::Idle => "idle",
            Phase::Initial => "initial",
            Phase::Questions => "questions",
            Phase::Final => "final",
        }
    }
}

/// Status of one protocol phase in the progress view.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PhaseStatus {
    #[default]
    Pending,
    Running,
    Complete,
    Failed,
}

/// Status of the three protocol phases.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PhaseProgress {
    statuses: [PhaseStatus; 3],
}

impl PhaseProgress {
    pub fn get(&self, phase: PhaseName) -> PhaseStatus {
        self.statuses[phase.ordinal()]
    }

    fn set(&mut self, phase: PhaseName, status: PhaseStatus) {
        self.statuses[phase.ordinal()] = status;
    }

    /// The running phase, if any.
    pub fn running(&self) -> Option<PhaseName> {
        PhaseName::ALL
            .into_iter()
            .find(|&p| self.get(p) == PhaseStatus::Running)
    }

    /// `(phase, status)` in protocol order.
    pub fn iter(&self) -> impl Iterator<Item = (PhaseName, PhaseStatus)> + '_ {
        PhaseName::ALL.into_iter().map(|p| (p, self.get(p)))
    }
}

/// Everything needed to start one analysis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartRequest {
    pub repository_url: String,
    pub private: bool,
    /// Only sent when `private` is set.
    pub credential: Option<String>,
    pub config: EnvironmentConfig,
}

impl StartRequest {
    pub fn public(repository_url: impl Into<String>, config: EnvironmentConfig) -> Self {
        Self { repository_url: repository_url.into(), private: false, credential: None, config }
    }

    pub fn private(
        repository_url: impl Into<String>,
        credential: impl Into<String>,
        config: EnvironmentConfig,
    ) -> Self {
        Self {
            repository_url: repository_url.into(),
            private: true,
            credential: Some(credential.into()),
            config,
        }
    }

    /// Checks the repository reference and, for private repositories, the
    /// credential.
    ///
    /// # Errors
    ///
    /// [`ValidationError::EmptyRepositoryUrl`], [`ValidationError::InvalidRepositoryUrl`]
    /// or [`ValidationError::MissingCredential`].
    pub fn validate(&self) -> Result<(), ValidationError> {
        let url = self.repository_url.trim();
        if url.is_empty() {
            return Err(ValidationError::EmptyRepositoryUrl);
        }
        if !url.starts_with(GITHUB_URL_PREFIX) {
            return Err(ValidationError::InvalidRepositoryUrl(url.to_owned()));
        }
        let has_credential = self
            .credential
            .as_deref()
            .is_some_and(|c| !c.trim().is_empty());
        if self.private && !has_credential {
            return Err(ValidationError::MissingCredential);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Validation,
    Credential,
    Protocol,
    Info,
}

/// The single transient user-facing message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub message: String,
    pub raised_at: Instant,
}

/// One line of the live log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub status: String,
    pub message: String,
    /// Raw timestamp from the service.
    pub timestamp: String,
    pub at: Option<DateTime<FixedOffset>>,
}

impl LogEntry {
    fn from_update(update: &AnalysisUpdate) -> Self {
        Self {
            status: update.kind.status().to_owned(),
            message: update.message.clone(),
            timestamp: update.timestamp.clone(),
            at: update.parsed_timestamp(),
        }
    }

    /// `HH:MM:SS` when the timestamp parsed, the raw text otherwise.
    pub fn time_label(&self) -> String {
        match self.at {
            Some(at) => at.format("%H:%M:%S").to_string(),
            None => self.timestamp.clone(),
        }
    }
}

/// One materialized set of follow-up questions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionRound {
    pub raw: String,
    pub items: Vec<QuestionItem>,
}

/// State of the current analysis session. Read-only outside the controller.
#[derive(Debug, Default)]
pub struct Session {
    /// Assigned by `connected`; survives resets, cleared on disconnect.
    pub session_id: Option<String>,
    pub phase: Phase,
    pub generation: u64,
    pub repository_url: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub config: Option<EnvironmentConfig>,
    pub progress: PhaseProgress,
    /// Result text of the initial phase.
    pub initial_result: Option<String>,
    pub round: Option<QuestionRound>,
    pub outcome: Option<Assessment>,
    pub log: Vec<LogEntry>,
    clock: Option<Instant>,
    frozen: Option<Duration>,
    awaiting_started: bool,
    pending_start: Option<StartAnalysis>,
}

impl Session {
    /// `Final` with an outcome.
    pub fn is_terminal(&self) -> bool {
        self.phase == Phase::Final && self.outcome.is_some()
    }

    /// Started and not yet completed or failed.
    pub fn is_active(&self) -> bool {
        self.phase != Phase::Idle && self.outcome.is_none()
    }

    /// True while a start waits for a session id.
    pub fn is_start_queued(&self) -> bool {
        self.pending_start.is_some()
    }

    /// Time since start, frozen once the session completes or fails.
    pub fn elapsed_at(&self, now: Instant) -> Option<Duration> {
        self.frozen
            .or_else(|| self.clock.map(|c| now.saturating_duration_since(c)))
    }

    pub fn elapsed(&self) -> Option<Duration> {
        self.elapsed_at(Instant::now())
    }
}

/// Formats a duration as `m:ss`.
pub fn format_elapsed(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    format!("{}:{:02}", secs / 60, secs % 60)
}

/// Drives one [`Session`] over a [`Transport`], with a [`Ticker`] for elapsed
/// time.
pub struct AnalysisSessionController<T, K> {
    transport: T,
    ticker: K,
    session: Session,
    notice: Option<Notice>,
    finished: Vec<FinishedSession>,
}

impl<T: Transport, K: Ticker> AnalysisSessionController<T, K> {
    pub fn new(transport: T, ticker: K) -> Self {
        Self {
            transport,
            ticker,
            session: Session::default(),
            notice: None,
            finished: Vec::new(),
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn phase(&self) -> Phase {
        self.session.phase
    }

    pub fn outcome(&self) -> Option<&Assessment> {
        self.session.outcome.as_ref()
    }

    pub fn round(&self) -> Option<&QuestionRound> {
        self.session.round.as_ref()
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn ticker(&self) -> &K {
        &self.ticker
    }

    /// Start controls are enabled whenever no session is in flight.
    pub fn can_start(&self) -> bool {
        !self.session.is_active()
    }

    /// Replaces the current notice.
    pub fn notify(&mut self, kind: NoticeKind, message: impl Into<String>) {
        let message = message.into();
        tracing::debug!(?kind, %message, "notice");
        self.notice = Some(Notice { kind, message, raised_at: Instant::now() });
    }

    /// Clears the notice once it is older than [`NOTICE_TTL`]. Returns `true`
    /// if a notice was cleared.
    pub fn expire_notice(&mut self, now: Instant) -> bool {
        let expired = self
            .notice
            .as_ref()
            .is_some_and(|n| now.saturating_duration_since(n.raised_at) >= NOTICE_TTL);
        if expired {
            self.notice = None;
        }
        expired
    }

    /// Sessions that reached an outcome since the last call.
    pub fn take_finished(&mut self) -> Vec<FinishedSession> {
        std::mem::take(&mut self.finished)
    }

    /// Starts a new analysis.
    ///
    /// Allowed from `Idle` or a terminal `Final`; the previous session's state is
    /// discarded first. The request is sent immediately when a session id is
    /// known, otherwise queued until `connected` arrives. The elapsed-time
    /// ticker starts in both cases.
    ///
    /// # Errors
    ///
    /// [`ValidationError::SessionBusy`] while a session is in flight, or the
    /// request's own validation error. Either way a validation notice is raised
    /// and nothing is sent.
    pub fn start(&mut self, request: StartRequest) -> Result<(), ValidationError> {
        if self.session.is_active() {
            return Err(self.reject(ValidationError::SessionBusy));
        }
        if let Err(err) = request.validate() {
            return Err(self.reject(err));
        }

        self.clear_session();
        let StartRequest { repository_url, private, credential, config } = request;
        let repository_url = repository_url.trim().to_owned();
        let payload = StartAnalysis {
            repository_url: repository_url.clone(),
            environment_config: config.clone(),
            credential: credential
                .filter(|_| private)
                .map(|c| c.trim().to_owned()),
        };

        tracing::info!(
            generation = self.session.generation,
            repository = %repository_url,
            keys = config.len(),
            private,
            "analysis started"
        );
        let session = &mut self.session;
        session.phase = Phase::Initial;
        session.repository_url = Some(repository_url);
        session.config = Some(config);
        session.started_at = Some(Utc::now());
        session.clock = Some(Instant::now());
        session.awaiting_started = true;
        self.ticker.start();

        if self.session.session_id.is_some() {
            self.send_start(payload);
        } else {
            tracing::info!("no session id yet; start queued until connected");
            self.session.pending_start = Some(payload);
        }
        Ok(())
    }

    /// Submits the current round's answers, looked up by question index.
    ///
    /// On success the session moves to `Final` with the final phase running and
    /// the round is discarded. Returns the number of answers sent.
    ///
    /// # Errors
    ///
    /// [`ValidationError::NotAwaitingAnswers`] outside a materialized round,
    /// [`ValidationError::NoAnswers`] when every answer is blank; nothing is
    /// sent and the round stays. [`SubmitError::Undelivered`] when the emit
    /// fails, after the session has been ended with a protocol notice.
    pub fn submit_answers<'a, F>(&mut self, answer_for: F) -> Result<usize, SubmitError>
    where
        F: Fn(usize) -> Option<&'a str>,
    {
        let collected = match (&self.session.phase, &self.session.round) {
            (Phase::Questions, Some(round)) => questions::collect_answers(&round.items, answer_for),
            _ => Err(ValidationError::NotAwaitingAnswers),
        };
        let submission = match collected {
            Ok(submission) => submission,
            Err(err) => return Err(self.reject(err).into()),
        };

        let count = submission.len();
        self.session.round = None;
        self.session.phase = Phase::Final;
        self.session.progress.set(PhaseName::Final, PhaseStatus::Running);
        tracing::info!(generation = self.session.generation, answers = count, "answers submitted");

        let sent = serde_json::to_value(SubmitResponses::from(&submission))
            .map_err(|e| e.to_string())
            .and_then(|v| self.emit(EVENT_SUBMIT_RESPONSES, v));
        if let Err(reason) = sent {
            let err = SubmitError::Undelivered(reason);
            self.fail_session(err.to_string());
            return Err(err);
        }
        Ok(count)
    }

    /// Returns to `Idle` from any state. Keeps the session id.
    pub fn reset(&mut self) {
        tracing::info!(
            generation = self.session.generation,
            phase = self.session.phase.label(),
            "session reset"
        );
        self.clear_session();
    }

    /// Applies one channel event.
    pub fn on_channel_event(&mut self, event: ChannelEvent) {
        match event {
            ChannelEvent::Connected => tracing::debug!("channel joined; awaiting session id"),
            ChannelEvent::Disconnected { reason } => {
                tracing::warn!(%reason, "channel disconnected");
                self.session.session_id = None;
                if self.session.is_active() {
                    self.fail_session(format!("Connection lost: {reason}"));
                }
            }
            ChannelEvent::Inbound { name, payload } => match InboundEvent::decode(&name, payload) {
                Ok(event) => self.on_inbound(event),
                Err(err) => {
                    tracing::warn!(event = %name, %err, "malformed inbound payload");
                    if self.session.is_active() {
                        self.notify(NoticeKind::Protocol, err.to_string());
                    }
                }
            },
        }
    }

    fn on_inbound(&mut self, event: InboundEvent) {
        match event {
            InboundEvent::Connected { session_id } => {
                if let Some(current) = self
                    .session
                    .session_id
                    .as_deref()
                    .filter(|current| *current != session_id)
                {
                    tracing::warn!(%current, new = %session_id, "ignoring second session id");
                    return;
                }
                tracing::info!(%session_id, "session id assigned");
                self.session.session_id = Some(session_id);
                if let Some(payload) = self.session.pending_start.take() {
                    tracing::info!(generation = self.session.generation, "flushing queued start");
                    self.send_start(payload);
                }
            }
            InboundEvent::Update(update) => self.on_update(update),
            InboundEvent::ChannelError { message } => {
                if self.session.is_active() {
                    self.fail_session(message);
                } else {
                    tracing::warn!(%message, "channel error while idle");
                    self.notify(NoticeKind::Protocol, message);
                }
            }
            InboundEvent::Unknown { name } => {
                tracing::debug!(event = %name, "ignoring unknown event");
            }
        }
    }

    fn on_update(&mut self, update: AnalysisUpdate) {
        let phase = self.session.phase;
        let generation = self.session.generation;
        let status = update.kind.status().to_owned();

        if !self.session.is_active() {
            tracing::debug!(generation, %status, phase = phase.label(), "dropping stale update");
            return;
        }
        if self.session.awaiting_started
            && !matches!(update.kind, UpdateKind::Started | UpdateKind::Processing)
        {
            tracing::debug!(generation, %status, "dropping update from a previous session");
            return;
        }

        self.session.log.push(LogEntry::from_update(&update));

        match update.kind {
            UpdateKind::Started => {
                self.session.awaiting_started = false;
                if phase == Phase::Initial {
                    self.session.progress.set(PhaseName::Initial, PhaseStatus::Running);
                }
            }
            UpdateKind::Processing => {}
            UpdateKind::PhaseComplete { phase: PhaseName::Initial, result }
                if phase == Phase::Initial =>
            {
                self.complete_initial(result);
            }
            UpdateKind::PhaseComplete { phase: PhaseName::Questions, .. }
                if phase == Phase::Questions =>
            {
                self.session.progress.set(PhaseName::Questions, PhaseStatus::Complete);
            }
            UpdateKind::PhaseComplete { phase: PhaseName::Final, .. } if phase == Phase::Final => {
                self.session.progress.set(PhaseName::Final, PhaseStatus::Complete);
            }
            UpdateKind::PhaseComplete { phase: PhaseName::Final, .. }
                if phase == Phase::Questions && self.session.round.is_none() =>
            {
                tracing::info!(generation, "no questions needed; moving to final");
                self.session.progress.set(PhaseName::Questions, PhaseStatus::Complete);
                self.session.progress.set(PhaseName::Final, PhaseStatus::Complete);
                self.session.phase = Phase::Final;
            }
            UpdateKind::QuestionsReady { questions } if phase == Phase::Questions => {
                let items = questions::parse(&questions);
                if items.is_empty() {
                    // A round without items could never be submitted; keep
                    // waiting as if no questions were needed.
                    tracing::warn!(generation, "questions_ready without questions; ignored");
                    return;
                }
                tracing::info!(generation, count = items.len(), "questions ready");
                self.session.progress.set(PhaseName::Questions, PhaseStatus::Complete);
                self.session.round = Some(QuestionRound { raw: questions, items });
            }
            UpdateKind::Completed { final_assessment } => self.complete(final_assessment),
            UpdateKind::Error => {
                let message = if update.message.trim().is_empty() {
                    "Analysis failed".to_owned()
                } else {
                    update.message
                };
                self.fail_session(message);
            }
            UpdateKind::Unrecognized(status) => {
                tracing::debug!(generation, %status, "unrecognized status");
            }
            other => {
                tracing::debug!(
                    generation,
                    phase = phase.label(),
                    status = other.status(),
                    "unexpected update for current phase"
                );
            }
        }
    }

    fn complete_initial(&mut self, result: String) {
        let progress = &mut self.session.progress;
        progress.set(PhaseName::Initial, PhaseStatus::Complete);
        if protocol::needs_more_info(&result) {
            progress.set(PhaseName::Questions, PhaseStatus::Running);
            self.session.phase = Phase::Questions;
        } else {
            progress.set(PhaseName::Final, PhaseStatus::Running);
            self.session.phase = Phase::Final;
        }
        tracing::info!(
            generation = self.session.generation,
            next = self.session.phase.label(),
            "initial phase complete"
        );
        self.session.initial_result = Some(result);
    }

    fn complete(&mut self, final_assessment: String) {
        let assessment = Assessment::from_final_text(final_assessment);
        tracing::info!(
            generation = self.session.generation,
            verdict = %assessment.verdict,
            "analysis completed"
        );
        if let Some(running) = self.session.progress.running() {
            self.session.progress.set(running, PhaseStatus::Complete);
        }
        self.session.progress.set(PhaseName::Final, PhaseStatus::Complete);
        self.session.phase = Phase::Final;
        self.session.round = None;
        self.session.outcome = Some(assessment);
        self.stop_clock();
        self.record_finished(SessionOutcome::Completed);
    }

    /// Ends the active session: running phase `Failed`, timer stopped, back to
    /// `Idle`, protocol notice raised.
    fn fail_session(&mut self, message: String) {
        tracing::warn!(
            generation = self.session.generation,
            phase = self.session.phase.label(),
            %message,
            "analysis failed"
        );
        let progress = &mut self.session.progress;
        let failed = progress.running().or_else(|| {
            PhaseName::ALL
                .into_iter()
                .find(|&p| progress.get(p) == PhaseStatus::Pending)
        });
        if let Some(phase) = failed {
            progress.set(phase, PhaseStatus::Failed);
        }
        self.stop_clock();
        self.record_finished(SessionOutcome::Failed);
        self.session.phase = Phase::Idle;
        self.session.round = None;
        self.session.pending_start = None;
        self.session.awaiting_started = false;
        self.notify(NoticeKind::Protocol, message);
    }

    fn send_start(&mut self, payload: StartAnalysis) {
        let sent = serde_json::to_value(&payload)
            .map_err(|e| e.to_string())
            .and_then(|v| self.emit(EVENT_START_ANALYSIS, v));
        if let Err(reason) = sent {
            self.fail_session(format!("Could not send the analysis request: {reason}"));
        }
    }

    fn emit(&self, event: &str, payload: Value) -> Result<(), String> {
        self.transport.emit(event, payload).map_err(|e| e.to_string())
    }

    fn reject(&mut self, err: ValidationError) -> ValidationError {
        tracing::debug!(%err, "rejected");
        self.notify(NoticeKind::Validation, err.to_string());
        err
    }

    fn stop_clock(&mut self) {
        self.session.frozen = self.session.elapsed();
        self.ticker.stop();
    }

    /// Discards all session state except the session id; bumps the generation.
    fn clear_session(&mut self) {
        self.ticker.stop();
        let session_id = self.session.session_id.take();
        let generation = self.session.generation + 1;
        self.session = Session { session_id, generation, ..Session::default() };
    }

    fn record_finished(&mut self, outcome: SessionOutcome) {
        let (Some(repository_url), Some(started_at)) =
            (self.session.repository_url.clone(), self.session.started_at)
        else {
            return;
        };
        self.finished.push(FinishedSession {
            repository_url,
            outcome,
            verdict: self.session.outcome.as_ref().map(|a| a.verdict),
            started_at,
            finished_at: Utc::now(),
            config_keys: self.session.config.as_ref().map_or(0, EnvironmentConfig::len),
        });
    }
}

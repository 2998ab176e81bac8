//! Typed model of the analysis session protocol.
//!
//! Inbound events arrive as `(name, JSON payload)` pairs from the channel and are
//! decoded once, here, into closed enums. Everything downstream matches on
//! variants; an unknown status becomes an explicit `Unrecognized` value instead
//! of a silent no-op.

use chrono::{DateTime, FixedOffset, NaiveDateTime};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::envconfig::EnvironmentConfig;
use crate::error::ProtocolError;
use crate::questions::{AnswerSubmission, Response};

pub const EVENT_START_ANALYSIS: &str = "start_analysis";
pub const EVENT_SUBMIT_RESPONSES: &str = "submit_responses";
pub const EVENT_CONNECTED: &str = "connected";
pub const EVENT_ANALYSIS_UPDATE: &str = "analysis_update";
pub const EVENT_ERROR: &str = "error";

/// Marker in the initial phase result meaning the service wants more input.
pub const MISSING_INFO_MARKER: &str = "missing info needed:";

// ---------------------------------------------------------------------------
// Outbound
// ---------------------------------------------------------------------------

/// `start_analysis` payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StartAnalysis {
    pub repository_url: String,
    pub environment_config: EnvironmentConfig,
    /// Present only for privately hosted repositories.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credential: Option<String>,
}

/// `submit_responses` payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubmitResponses<'a> {
    pub responses: &'a [Response],
}

impl<'a> From<&'a AnswerSubmission> for SubmitResponses<'a> {
    fn from(submission: &'a AnswerSubmission) -> Self {
        Self { responses: submission.responses() }
    }
}

// ---------------------------------------------------------------------------
// Inbound
// ---------------------------------------------------------------------------

/// The three protocol phases named by `phase_complete`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhaseName {
    Initial,
    Questions,
    Final,
}

impl PhaseName {
    pub const ALL: [PhaseName; 3] = [PhaseName::Initial, PhaseName::Questions, PhaseName::Final];

    /// Position in the progress view.
    pub fn ordinal(self) -> usize {
        match self {
            PhaseName::Initial => 0,
            PhaseName::Questions => 1,
            PhaseName::Final => 2,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            PhaseName::Initial => "Checking Deployability",
            PhaseName::Questions => "Checking for Missing Info",
            PhaseName::Final => "Final Assessment",
        }
    }
}

/// Status-specific content of an `analysis_update`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateKind {
    Started,
    Processing,
    PhaseComplete { phase: PhaseName, result: String },
    QuestionsReady { questions: String },
    Completed { final_assessment: String },
    Error,
    /// A status this client does not know. Logged, otherwise ignored.
    Unrecognized(String),
}

impl UpdateKind {
    /// Wire name of the status, for the live log.
    pub fn status(&self) -> &str {
        match self {
            UpdateKind::Started => "started",
            UpdateKind::Processing => "processing",
            UpdateKind::PhaseComplete { .. } => "phase_complete",
            UpdateKind::QuestionsReady { .. } => "questions_ready",
            UpdateKind::Completed { .. } => "completed",
            UpdateKind::Error => "error",
            UpdateKind::Unrecognized(status) => status,
        }
    }
}

/// One decoded `analysis_update`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisUpdate {
    pub kind: UpdateKind,
    pub message: String,
    /// Raw ISO-8601 timestamp as sent by the service.
    pub timestamp: String,
}

impl AnalysisUpdate {
    /// Parses `timestamp` as RFC 3339, falling back to a naive
    /// `YYYY-MM-DDTHH:MM:SS[.f]` (interpreted as UTC).
    pub fn parsed_timestamp(&self) -> Option<DateTime<FixedOffset>> {
        parse_timestamp(&self.timestamp)
    }
}

/// Every inbound event the controller reacts to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundEvent {
    Connected { session_id: String },
    Update(AnalysisUpdate),
    /// Channel-level `error`, distinct from an update whose status is `error`.
    ChannelError { message: String },
    /// An event name outside this protocol.
    Unknown { name: String },
}

#[derive(Deserialize)]
struct ConnectedPayload {
    session_id: String,
}

#[derive(Deserialize)]
struct ErrorPayload {
    #[serde(default)]
    message: String,
}

#[derive(Deserialize)]
struct RawUpdate {
    status: String,
    #[serde(default)]
    message: String,
    #[serde(default)]
    timestamp: String,
    #[serde(default)]
    data: Option<Value>,
}

#[derive(Deserialize)]
struct PhaseCompleteData {
    phase: PhaseName,
    #[serde(default)]
    result: String,
}

#[derive(Deserialize)]
struct QuestionsReadyData {
    questions: String,
}

#[derive(Deserialize)]
struct CompletedData {
    final_assessment: String,
}

impl InboundEvent {
    /// Decodes a named channel event.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError`] when a known event carries a payload that does not
    /// match its schema.
    pub fn decode(name: &str, payload: Value) -> Result<Self, ProtocolError> {
        let wrap = |source: serde_json::Error| ProtocolError::Payload {
            event: name.to_owned(),
            source,
        };
        match name {
            EVENT_CONNECTED => {
                let p: ConnectedPayload = serde_json::from_value(payload).map_err(wrap)?;
                Ok(InboundEvent::Connected { session_id: p.session_id })
            }
            EVENT_ERROR => {
                let p: ErrorPayload = serde_json::from_value(payload).map_err(wrap)?;
                Ok(InboundEvent::ChannelError { message: p.message })
            }
            EVENT_ANALYSIS_UPDATE => {
                let raw: RawUpdate = serde_json::from_value(payload).map_err(wrap)?;
                decode_update(raw).map(InboundEvent::Update)
            }
            other => Ok(InboundEvent::Unknown { name: other.to_owned() }),
        }
    }
}

fn decode_update(raw: RawUpdate) -> Result<AnalysisUpdate, ProtocolError> {
    let status = raw.status;
    let data = raw.data.filter(|v| !v.is_null());
    let take = |data: Option<Value>| -> Result<Value, ProtocolError> {
        data.ok_or_else(|| ProtocolError::MissingData { status: status.clone() })
    };
    let wrap = |source: serde_json::Error| ProtocolError::Payload {
        event: format!("analysis_update/{status}"),
        source,
    };

    let kind = match status.as_str() {
        "started" => UpdateKind::Started,
        "processing" => UpdateKind::Processing,
        "error" => UpdateKind::Error,
        "phase_complete" => {
            let d: PhaseCompleteData = serde_json::from_value(take(data)?).map_err(wrap)?;
            UpdateKind::PhaseComplete { phase: d.phase, result: d.result }
        }
        "questions_ready" => {
            let d: QuestionsReadyData = serde_json::from_value(take(data)?).map_err(wrap)?;
            UpdateKind::QuestionsReady { questions: d.questions }
        }
        "completed" => {
            let d: CompletedData = serde_json::from_value(take(data)?).map_err(wrap)?;
            UpdateKind::Completed { final_assessment: d.final_assessment }
        }
        _ => UpdateKind::Unrecognized(status.clone()),
    };

    Ok(AnalysisUpdate { kind, message: raw.message, timestamp: raw.timestamp })
}

/// Parses an ISO-8601 timestamp with or without an offset.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<FixedOffset>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt);
    }
    raw.parse::<NaiveDateTime>()
        .ok()
        .map(|naive| naive.and_utc().fixed_offset())
}

/// True when the initial phase result asks for missing information.
pub fn needs_more_info(result: &str) -> bool {
    result.to_lowercase().contains(MISSING_INFO_MARKER)
}

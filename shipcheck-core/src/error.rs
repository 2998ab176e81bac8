//! Error types for shipcheck-core.
//!
//! Each failure domain gets its own enum so callers can map it onto the right
//! notice kind: validation problems never reach the channel, credential problems
//! roll the repository browser back, protocol problems end the current session.

use thiserror::Error;

/// Client-side input validation failures. Never sent over the channel.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Please enter a GitHub repository URL")]
    EmptyRepositoryUrl,

    #[error("Please enter a valid GitHub URL (should start with https://github.com/): {0}")]
    InvalidRepositoryUrl(String),

    #[error("A credential is required to analyze a private repository")]
    MissingCredential,

    #[error("Please enter your GitHub Personal Access Token")]
    EmptyToken,

    #[error("Please enter a valid GitHub Personal Access Token")]
    MalformedToken,

    #[error("Please select a repository first")]
    NoRepositorySelected,

    #[error("Please answer at least one question before submitting.")]
    NoAnswers,

    #[error("An analysis is already running; reset it before starting another")]
    SessionBusy,

    #[error("The analysis is not waiting for answers")]
    NotAwaitingAnswers,
}

/// Malformed inbound protocol payloads.
#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("Malformed `{event}` payload: {source}")]
    Payload {
        event: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("`{status}` update is missing its data payload")]
    MissingData { status: String },
}

/// Malformed Engine.IO / Socket.IO text frames.
#[derive(Error, Debug)]
pub enum CodecError {
    #[error("Empty frame")]
    Empty,

    #[error("Unknown {layer} packet type '{kind}'")]
    UnknownPacketType { layer: &'static str, kind: char },

    #[error("Event packet does not carry an event name")]
    MissingEventName,

    #[error("Invalid packet JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Why answers did not reach the analysis service.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SubmitError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The emit failed; the session has already been ended.
    #[error("Could not send the answers: {0}")]
    Undelivered(String),
}

/// Channel-level failures.
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Invalid server endpoint: {0}")]
    InvalidEndpoint(String),

    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("Channel is closed")]
    Closed,
}

/// Failures talking to the GitHub REST API.
#[derive(Error, Debug)]
pub enum GitHubError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Invalid token or insufficient permissions")]
    Unauthorized,

    #[error("GitHub returned HTTP {0}")]
    Status(u16),

    #[error("GitHub request failed: {0}")]
    Http(#[from] reqwest::Error),
}

/// Failures reading the analysis service status endpoint.
#[derive(Error, Debug)]
pub enum StatusError {
    #[error("Invalid server endpoint: {0}")]
    InvalidEndpoint(String),

    #[error("Status request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Status endpoint returned HTTP {0}")]
    Status(u16),
}

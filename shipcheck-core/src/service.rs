//! Analysis service readiness, read once at startup from `/api/health`.

use serde::Deserialize;
use url::Url;

use crate::error::StatusError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceStatus {
    pub credential_configured: bool,
    pub ready: bool,
}

#[derive(Deserialize)]
struct Health {
    #[serde(default)]
    api_key_configured: bool,
    #[serde(default)]
    agent_ready: bool,
}

/// Readiness indicator shown in the status bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    Unknown,
    Ready,
    Initializing,
    CredentialMissing,
    CheckFailed,
}

impl Readiness {
    pub fn from_result(result: &Result<ServiceStatus, StatusError>) -> Self {
        match result {
            Ok(ServiceStatus { ready: true, .. }) => Readiness::Ready,
            Ok(ServiceStatus { credential_configured: true, .. }) => Readiness::Initializing,
            Ok(_) => Readiness::CredentialMissing,
            Err(_) => Readiness::CheckFailed,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Readiness::Unknown => "checking service",
            Readiness::Ready => "service ready",
            Readiness::Initializing => "API key found, agent initializing",
            Readiness::CredentialMissing => "API key not configured",
            Readiness::CheckFailed => "status check failed",
        }
    }
}

/// Reads `{server}/api/health`.
///
/// # Errors
///
/// [`StatusError`] for an unusable server address, transport failures and
/// non-success responses.
pub async fn fetch_status(server: &str) -> Result<ServiceStatus, StatusError> {
    let url = Url::parse(server)
        .and_then(|base| base.join("/api/health"))
        .map_err(|e| StatusError::InvalidEndpoint(format!("{server}: {e}")))?;

    let response = reqwest::get(url).await?;
    let status = response.status();
    if !status.is_success() {
        return Err(StatusError::Status(status.as_u16()));
    }
    let health: Health = response.json().await?;
    tracing::info!(
        api_key_configured = health.api_key_configured,
        agent_ready = health.agent_ready,
        "service status"
    );
    Ok(ServiceStatus {
        credential_configured: health.api_key_configured,
        ready: health.agent_ready,
    })
}

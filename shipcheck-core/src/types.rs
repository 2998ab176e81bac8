use chrono::{DateTime, Utc};

use crate::verdict::Verdict;

/// How a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionOutcome {
    Completed,
    Failed,
}

impl SessionOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            SessionOutcome::Completed => "completed",
            SessionOutcome::Failed => "failed",
        }
    }

    pub fn from_str_lossy(s: &str) -> Self {
        if s == "completed" {
            SessionOutcome::Completed
        } else {
            SessionOutcome::Failed
        }
    }
}

/// A session that reached a terminal outcome, ready for the history store.
///
/// Holds only the number of configuration keys: neither values nor credentials
/// ever leave the controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinishedSession {
    pub repository_url: String,
    pub outcome: SessionOutcome,
    /// `None` when the session failed.
    pub verdict: Option<Verdict>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub config_keys: usize,
}

/// One row of the `assessments` table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssessmentRecord {
    pub id: String,           // UUID v4 text
    pub repository_url: String,
    pub outcome: SessionOutcome,
    pub verdict: Option<Verdict>,
    pub started_at: i64,      // Unix timestamp seconds
    pub finished_at: i64,     // Unix timestamp seconds
    pub config_keys: i64,
}

impl AssessmentRecord {
    /// Wall-clock duration of the session in seconds.
    pub fn duration_secs(&self) -> i64 {
        (self.finished_at - self.started_at).max(0)
    }
}

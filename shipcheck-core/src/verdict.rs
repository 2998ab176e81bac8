//! Verdict extraction from the final assessment text.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

static ANSWER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\*\*ANSWER:\s*(YES|NO)\*\*").expect("verdict pattern")
});

/// Deployability verdict.
///
/// `Unknown` is a distinct outcome: an assessment without the marker is never
/// read as NO.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Yes,
    No,
    Unknown,
}

impl Verdict {
    /// Searches `content` for `**ANSWER: YES**` / `**ANSWER: NO**` (any case).
    pub fn extract(content: &str) -> Self {
        let Some(caps) = ANSWER.captures(content) else {
            return Verdict::Unknown;
        };
        if caps[1].eq_ignore_ascii_case("yes") {
            Verdict::Yes
        } else {
            Verdict::No
        }
    }

    /// Stable lowercase name used for persistence.
    pub fn as_str(self) -> &'static str {
        match self {
            Verdict::Yes => "yes",
            Verdict::No => "no",
            Verdict::Unknown => "unknown",
        }
    }

    pub fn from_str_lossy(s: &str) -> Self {
        match s {
            "yes" => Verdict::Yes,
            "no" => Verdict::No,
            _ => Verdict::Unknown,
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::Yes => write!(f, "YES"),
            Verdict::No => write!(f, "NO"),
            Verdict::Unknown => write!(f, "?"),
        }
    }
}

/// Terminal result of a completed session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assessment {
    pub verdict: Verdict,
    pub final_assessment: String,
}

impl Assessment {
    pub fn from_final_text(final_assessment: String) -> Self {
        Self { verdict: Verdict::extract(&final_assessment), final_assessment }
    }
}

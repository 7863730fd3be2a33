//! Finding domain model: one issue reported by the vulnerability scanner.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Severity of a finding.
///
/// Report ordering is by urgency: all `Vulnerability` findings come first,
/// then `Warning`, `Error`, `Info`, and anything unrecognized last.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Vulnerability,
    Warning,
    Error,
    Info,
    /// Severity the scanner emitted but this server does not recognize.
    #[serde(other)]
    Unknown,
}

impl Severity {
    /// Sort key for report rendering. Lower sorts first.
    pub fn priority(&self) -> u8 {
        match self {
            Self::Vulnerability => 1,
            Self::Warning => 2,
            Self::Error => 3,
            Self::Info => 4,
            Self::Unknown => 5,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Vulnerability => "VULNERABILITY",
            Self::Warning => "WARNING",
            Self::Error => "ERROR",
            Self::Info => "INFO",
            Self::Unknown => "UNKNOWN",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single issue discovered during scanning.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Finding {
    /// Issue category (e.g. "manifest", "crypto", "webview").
    pub category: String,
    /// Severity level.
    pub severity: Severity,
    /// Short issue name.
    pub name: String,
    /// Human-readable description.
    pub description: String,
    /// Source file the issue was found in, if known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,
    /// Line number within the file, if known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line_number: Option<u32>,
}

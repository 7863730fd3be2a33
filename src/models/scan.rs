//! Scan domain models and DTOs.

use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::finding::Finding;

/// Detected kind of a submitted artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "kebab-case")]
pub enum InputKind {
    /// Android application package (`.apk`).
    Apk,
    /// Plain Java source file (`.java`).
    JavaSource,
    /// Java archive (`.jar`).
    Archive,
}

impl InputKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Apk => "apk",
            Self::JavaSource => "java-source",
            Self::Archive => "archive",
        }
    }

    /// Whether the artifact is already source code and needs no decompilation.
    pub fn is_source(&self) -> bool {
        matches!(self, Self::JavaSource)
    }
}

impl std::fmt::Display for InputKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Scan pipeline status.
///
/// Progress through `pending -> decompiling -> scanning -> reporting ->
/// completed`, with `failed` reachable from any non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ScanStatus {
    /// Record created, pipeline not started yet.
    Pending,
    /// Decompiler is running.
    Decompiling,
    /// Vulnerability scanner is running.
    Scanning,
    /// Reports are being written.
    Reporting,
    /// Pipeline finished, result available.
    Completed,
    /// Pipeline aborted; the message carries the error.
    Failed,
}

impl ScanStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Decompiling => "decompiling",
            Self::Scanning => "scanning",
            Self::Reporting => "reporting",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "decompiling" => Some(Self::Decompiling),
            "scanning" => Some(Self::Scanning),
            "reporting" => Some(Self::Reporting),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }

    /// Terminal states accept no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

impl std::fmt::Display for ScanStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Supported report output formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    /// Machine-readable JSON report.
    Json,
    /// Human-readable HTML report.
    Html,
}

impl ReportFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Html => "html",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "json" => Some(Self::Json),
            "html" => Some(Self::Html),
            _ => None,
        }
    }

    /// File extension for generated report files.
    pub fn extension(&self) -> &'static str {
        self.as_str()
    }

    /// HTTP content type for report downloads.
    pub fn content_type(&self) -> &'static str {
        match self {
            Self::Json => "application/json",
            Self::Html => "text/html",
        }
    }
}

impl std::fmt::Display for ReportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Final result of a completed scan.
///
/// Present on a record only once the pipeline reaches `completed`; immutable
/// from then on.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ScanResultPayload {
    /// Total number of findings.
    pub total_vulnerabilities: usize,
    /// Finding counts grouped by severity.
    pub vulnerabilities_by_severity: BTreeMap<String, usize>,
    /// Finding counts grouped by category.
    pub vulnerabilities_by_category: BTreeMap<String, usize>,
    /// Individual findings, in scanner order.
    pub vulnerabilities: Vec<Finding>,
    /// Generated report file per format.
    #[schema(value_type = Object)]
    pub report_paths: BTreeMap<ReportFormat, PathBuf>,
    /// Decompiled source tree, when the input was decompiled.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<String>)]
    pub decompiled_path: Option<PathBuf>,
}

impl ScanResultPayload {
    /// Build a result payload from raw findings, counting by severity and
    /// category.
    pub fn from_findings(
        findings: Vec<Finding>,
        report_paths: BTreeMap<ReportFormat, PathBuf>,
        decompiled_path: Option<PathBuf>,
    ) -> Self {
        let mut by_severity: BTreeMap<String, usize> = BTreeMap::new();
        let mut by_category: BTreeMap<String, usize> = BTreeMap::new();
        for finding in &findings {
            *by_severity
                .entry(finding.severity.as_str().to_string())
                .or_default() += 1;
            *by_category.entry(finding.category.clone()).or_default() += 1;
        }

        Self {
            total_vulnerabilities: findings.len(),
            vulnerabilities_by_severity: by_severity,
            vulnerabilities_by_category: by_category,
            vulnerabilities: findings,
            report_paths,
            decompiled_path,
        }
    }
}

/// Aggregate record for one submitted scan.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ScanRecord {
    /// Scan UUID, immutable for the record's lifetime.
    pub id: Uuid,
    /// Original upload filename.
    pub filename: String,
    /// Detected artifact kind.
    pub input_kind: InputKind,
    /// Current pipeline status.
    pub status: ScanStatus,
    /// Progress percentage, 0-100, never decreasing while non-terminal.
    pub progress: u8,
    /// Human-readable status message.
    pub message: String,
    /// Submission timestamp.
    pub submitted_at: DateTime<Utc>,
    /// Persisted upload location.
    #[schema(value_type = String)]
    pub upload_path: PathBuf,
    /// Result, present once the scan completed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<ScanResultPayload>,
}

impl ScanRecord {
    pub fn new(id: Uuid, input_kind: InputKind, filename: String, upload_path: PathBuf) -> Self {
        Self {
            id,
            filename,
            input_kind,
            status: ScanStatus::Pending,
            progress: 0,
            message: "Scan initialized".to_string(),
            submitted_at: Utc::now(),
            upload_path,
            result: None,
        }
    }

    /// Advance status, progress, and message in one step.
    ///
    /// Progress never decreases while the scan is live; a transition to
    /// `failed` resets it to 0. Transitions from a terminal state are ignored.
    pub fn advance(&mut self, status: ScanStatus, progress: u8, message: impl Into<String>) {
        if self.status.is_terminal() {
            return;
        }
        self.status = status;
        self.progress = if status == ScanStatus::Failed {
            0
        } else {
            self.progress.max(progress.min(100))
        };
        self.message = message.into();
    }

    /// Mark the scan failed with the given error message.
    pub fn fail(&mut self, message: impl Into<String>) {
        self.advance(ScanStatus::Failed, 0, message);
    }

    /// Attach the final result. A result already present is never replaced.
    pub fn complete(&mut self, result: ScanResultPayload) {
        if self.result.is_some() || self.status.is_terminal() {
            return;
        }
        let total = result.total_vulnerabilities;
        self.result = Some(result);
        self.advance(
            ScanStatus::Completed,
            100,
            format!("Scan completed. Found {} vulnerabilities", total),
        );
    }

    /// Lightweight summary for list responses.
    pub fn summary(&self) -> ScanSummary {
        ScanSummary {
            scan_id: self.id,
            filename: self.filename.clone(),
            status: self.status,
            progress: self.progress,
            timestamp: self.submitted_at,
        }
    }
}

// ============================================================================
// API DTOs
// ============================================================================

/// Response after submitting an artifact.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SubmitScanResponse {
    /// Generated scan UUID.
    pub scan_id: Uuid,
    /// Detected artifact kind.
    pub input_kind: InputKind,
    /// Original filename.
    pub filename: String,
}

/// Current scan status for polling.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ScanStatusResponse {
    pub scan_id: Uuid,
    pub status: ScanStatus,
    pub progress: u8,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

/// Full scan result response.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ScanResultResponse {
    pub scan_id: Uuid,
    pub filename: String,
    pub status: ScanStatus,
    #[serde(flatten)]
    pub result: ScanResultPayload,
}

/// Lightweight scan summary for list responses. Never carries the result
/// payload.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ScanSummary {
    pub scan_id: Uuid,
    pub filename: String,
    pub status: ScanStatus,
    pub progress: u8,
    pub timestamp: DateTime<Utc>,
}

/// Scan list response.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ScanListResponse {
    pub scans: Vec<ScanSummary>,
    pub total: usize,
}

/// Response after deleting a scan.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DeleteScanResponse {
    pub scan_id: Uuid,
    pub message: String,
}

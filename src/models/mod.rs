//! Domain models and API DTOs.

pub mod finding;
pub mod scan;

pub use finding::{Finding, Severity};
pub use scan::{
    DeleteScanResponse, InputKind, ReportFormat, ScanListResponse, ScanRecord, ScanResultPayload,
    ScanResultResponse, ScanStatus, ScanStatusResponse, ScanSummary, SubmitScanResponse,
};

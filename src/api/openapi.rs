//! OpenAPI documentation configuration.

use utoipa::OpenApi;

use crate::{api, error, models};

/// OpenAPI documentation.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "APK Scan Server",
        version = "0.1.0",
        description = "API server for submitting Android artifacts (APK, Java source, JAR) to an asynchronous decompile-and-scan pipeline"
    ),
    servers(
        (url = "/", description = "Local server")
    ),
    paths(
        // Health endpoints
        api::health::health,
        // Scan endpoints
        api::scans::submit_scan,
        api::scans::list_scans,
        api::scans::scan_status,
        api::scans::scan_result,
        api::scans::download_report,
        api::scans::delete_scan,
    ),
    components(
        schemas(
            // Common
            error::ErrorResponse,
            // Health
            api::health::HealthResponse,
            // Scans
            models::InputKind,
            models::ScanStatus,
            models::ReportFormat,
            models::Severity,
            models::Finding,
            models::ScanResultPayload,
            models::SubmitScanResponse,
            models::ScanStatusResponse,
            models::ScanResultResponse,
            models::ScanSummary,
            models::ScanListResponse,
            models::DeleteScanResponse,
        )
    ),
    tags(
        (name = "Health", description = "Health check endpoints"),
        (name = "Scans", description = "Artifact submission, scan progress, results, and reports")
    )
)]
pub struct ApiDoc;

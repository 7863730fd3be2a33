//! Scan API handlers.

use actix_multipart::Multipart;
use actix_web::{HttpResponse, web};
use futures_util::StreamExt;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::models::{
    DeleteScanResponse, ReportFormat, ScanListResponse, ScanResultResponse, ScanStatusResponse,
    SubmitScanResponse,
};
use crate::services::artifacts::{self, ArtifactStore};
use crate::services::{PipelineRunner, ScanStore};

/// Submit an artifact for scanning.
///
/// Accepts a single multipart file field, validates the extension before
/// anything touches disk, and schedules the background pipeline. The response
/// returns immediately with the identifier to poll.
#[utoipa::path(
    post,
    path = "/api/v1/scans",
    tag = "Scans",
    request_body(content_type = "multipart/form-data"),
    responses(
        (status = 202, description = "Scan accepted", body = SubmitScanResponse),
        (status = 400, description = "Invalid or unsupported upload", body = crate::error::ErrorResponse),
    )
)]
pub async fn submit_scan(
    config: web::Data<Config>,
    store: web::Data<dyn ScanStore>,
    artifact_store: web::Data<ArtifactStore>,
    runner: web::Data<PipelineRunner>,
    mut payload: Multipart,
) -> AppResult<HttpResponse> {
    let mut accepted: Option<(String, Vec<u8>)> = None;

    while let Some(item) = payload.next().await {
        let mut field = item.map_err(|e| AppError::InvalidInput(format!("Multipart error: {}", e)))?;

        let content_disposition = field
            .content_disposition()
            .ok_or_else(|| AppError::InvalidInput("Missing content disposition".to_string()))?;

        let Some(filename) = content_disposition.get_filename().map(str::to_string) else {
            // Non-file form fields are ignored.
            while let Some(chunk) = field.next().await {
                let _ = chunk;
            }
            continue;
        };

        // Reject unsupported extensions before reading any content.
        artifacts::detect_kind(&filename)?;

        let mut data = Vec::new();
        while let Some(chunk) = field.next().await {
            let bytes = chunk.map_err(|e| AppError::InvalidInput(format!("Read error: {}", e)))?;
            if data.len() + bytes.len() > config.max_upload_size {
                return Err(AppError::InvalidInput(format!(
                    "File exceeds maximum upload size of {} bytes",
                    config.max_upload_size
                )));
            }
            data.extend_from_slice(&bytes);
        }

        accepted = Some((filename, data));
        break;
    }

    let Some((filename, data)) = accepted else {
        return Err(AppError::InvalidInput("No file provided".to_string()));
    };
    if data.is_empty() {
        return Err(AppError::InvalidInput("Uploaded file is empty".to_string()));
    }

    let input_kind = artifacts::detect_kind(&filename)?;
    let scan_id = Uuid::new_v4();
    let upload_path = artifact_store.persist(scan_id, &filename, &data).await?;
    let record = store
        .create(scan_id, input_kind, &filename, upload_path)
        .await?;

    runner.into_inner().schedule(record.id);
    info!(
        "Accepted scan {} for {} ({} bytes)",
        record.id,
        record.filename,
        data.len()
    );

    Ok(HttpResponse::Accepted().json(SubmitScanResponse {
        scan_id: record.id,
        input_kind: record.input_kind,
        filename: record.filename,
    }))
}

/// Get the current status of a scan.
#[utoipa::path(
    get,
    path = "/api/v1/scans/{scan_id}/status",
    tag = "Scans",
    params(
        ("scan_id" = Uuid, Path, description = "Scan UUID")
    ),
    responses(
        (status = 200, description = "Current scan status", body = ScanStatusResponse),
        (status = 404, description = "Scan not found", body = crate::error::ErrorResponse),
    )
)]
pub async fn scan_status(
    store: web::Data<dyn ScanStore>,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    let record = store.get(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(ScanStatusResponse {
        scan_id: record.id,
        status: record.status,
        progress: record.progress,
        message: record.message,
        timestamp: record.submitted_at,
    }))
}

/// Get the full result of a completed scan.
#[utoipa::path(
    get,
    path = "/api/v1/scans/{scan_id}/result",
    tag = "Scans",
    params(
        ("scan_id" = Uuid, Path, description = "Scan UUID")
    ),
    responses(
        (status = 200, description = "Scan result", body = ScanResultResponse),
        (status = 404, description = "Scan not found or result not ready", body = crate::error::ErrorResponse),
    )
)]
pub async fn scan_result(
    store: web::Data<dyn ScanStore>,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    let record = store.get(path.into_inner()).await?;
    let result = record.result.ok_or(AppError::ResultPending)?;
    Ok(HttpResponse::Ok().json(ScanResultResponse {
        scan_id: record.id,
        filename: record.filename,
        status: record.status,
        result,
    }))
}

/// List all scans, newest first.
#[utoipa::path(
    get,
    path = "/api/v1/scans",
    tag = "Scans",
    responses(
        (status = 200, description = "All known scans", body = ScanListResponse),
    )
)]
pub async fn list_scans(store: web::Data<dyn ScanStore>) -> AppResult<HttpResponse> {
    let scans = store.list().await;
    let total = scans.len();
    Ok(HttpResponse::Ok().json(ScanListResponse { scans, total }))
}

/// Download a generated report.
#[utoipa::path(
    get,
    path = "/api/v1/scans/{scan_id}/reports/{format}",
    tag = "Scans",
    params(
        ("scan_id" = Uuid, Path, description = "Scan UUID"),
        ("format" = String, Path, description = "Report format: json or html")
    ),
    responses(
        (status = 200, description = "Report file"),
        (status = 404, description = "Scan, format, or report file not found", body = crate::error::ErrorResponse),
    )
)]
pub async fn download_report(
    store: web::Data<dyn ScanStore>,
    path: web::Path<(Uuid, String)>,
) -> AppResult<HttpResponse> {
    let (scan_id, format_raw) = path.into_inner();
    let format = ReportFormat::parse(&format_raw)
        .ok_or_else(|| AppError::FormatUnavailable(format_raw.clone()))?;

    let record = store.get(scan_id).await?;
    let result = record.result.ok_or(AppError::ResultPending)?;
    let report_path = result
        .report_paths
        .get(&format)
        .ok_or_else(|| AppError::FormatUnavailable(format_raw))?;

    let content = tokio::fs::read(report_path).await.map_err(|_| {
        warn!(
            "Report file {} for scan {} is missing on disk",
            report_path.display(),
            scan_id
        );
        AppError::FileMissing(format!("Report file for scan {}", scan_id))
    })?;

    let download_name = format!("scan_report_{}.{}", scan_id, format.extension());
    Ok(HttpResponse::Ok()
        .content_type(format.content_type())
        .append_header((
            "Content-Disposition",
            format!("attachment; filename=\"{}\"", download_name),
        ))
        .body(content))
}

/// Delete a scan and everything stored for it.
///
/// Running scans cannot be deleted; wait for a terminal state first.
#[utoipa::path(
    delete,
    path = "/api/v1/scans/{scan_id}",
    tag = "Scans",
    params(
        ("scan_id" = Uuid, Path, description = "Scan UUID")
    ),
    responses(
        (status = 200, description = "Scan deleted", body = DeleteScanResponse),
        (status = 404, description = "Scan not found", body = crate::error::ErrorResponse),
        (status = 409, description = "Scan still running", body = crate::error::ErrorResponse),
    )
)]
pub async fn delete_scan(
    store: web::Data<dyn ScanStore>,
    artifact_store: web::Data<ArtifactStore>,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    let scan_id = path.into_inner();
    let record = store.get(scan_id).await?;
    if !record.status.is_terminal() {
        return Err(AppError::Conflict(format!(
            "Scan {} is still {}; wait for it to finish",
            scan_id, record.status
        )));
    }

    artifact_store.purge(scan_id).await?;
    store.delete(scan_id).await?;
    info!("Deleted scan {} and its artifacts", scan_id);

    Ok(HttpResponse::Ok().json(DeleteScanResponse {
        scan_id,
        message: "Scan deleted".to_string(),
    }))
}

/// Configure scan routes.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/scans")
            .route("", web::post().to(submit_scan))
            .route("", web::get().to(list_scans))
            .route("/{scan_id}/status", web::get().to(scan_status))
            .route("/{scan_id}", web::delete().to(delete_scan))
            .route("/{scan_id}/result", web::get().to(scan_result))
            .route("/{scan_id}/reports/{format}", web::get().to(download_report)),
    );
}

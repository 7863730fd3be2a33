//! Artifact store: per-scan upload and output directories.
//!
//! Filesystem areas are partitioned by scan identifier, so concurrent
//! pipelines never contend on each other's files. Layout per scan:
//!
//! `{upload_root}/{scan_id}/{filename}` - the original artifact
//! `{output_root}/{scan_id}/build/` - decompiled output
//! `{output_root}/{scan_id}/reports/` - generated report files

use std::path::{Path, PathBuf};

use tracing::info;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::InputKind;

/// Detect the artifact kind from a filename extension.
///
/// Pure function; unsupported extensions fail before any storage or pipeline
/// work happens.
pub fn detect_kind(filename: &str) -> AppResult<InputKind> {
    let ext = Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    match ext.as_str() {
        "apk" => Ok(InputKind::Apk),
        "java" => Ok(InputKind::JavaSource),
        "jar" => Ok(InputKind::Archive),
        _ => Err(AppError::UnsupportedInput(format!(".{}", ext))),
    }
}

/// Validate an upload filename before it touches the filesystem.
fn validate_filename(filename: &str) -> AppResult<()> {
    if filename.is_empty() {
        return Err(AppError::InvalidInput("Empty filename".to_string()));
    }
    if filename.contains("..") || filename.contains('/') || filename.contains('\\') {
        return Err(AppError::InvalidInput(
            "Path traversal not allowed".to_string(),
        ));
    }
    Ok(())
}

/// Owns the upload and output directory trees.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    upload_root: PathBuf,
    output_root: PathBuf,
}

impl ArtifactStore {
    pub fn new(upload_root: PathBuf, output_root: PathBuf) -> Self {
        Self {
            upload_root,
            output_root,
        }
    }

    /// Create both root directories if absent.
    pub async fn ensure_roots(&self) -> AppResult<()> {
        tokio::fs::create_dir_all(&self.upload_root).await?;
        tokio::fs::create_dir_all(&self.output_root).await?;
        Ok(())
    }

    fn upload_dir(&self, scan_id: Uuid) -> PathBuf {
        self.upload_root.join(scan_id.to_string())
    }

    fn output_dir(&self, scan_id: Uuid) -> PathBuf {
        self.output_root.join(scan_id.to_string())
    }

    /// Write an uploaded artifact into the scan's upload directory.
    pub async fn persist(&self, scan_id: Uuid, filename: &str, data: &[u8]) -> AppResult<PathBuf> {
        validate_filename(filename)?;

        let scan_dir = self.upload_dir(scan_id);
        tokio::fs::create_dir_all(&scan_dir).await?;

        let file_path = scan_dir.join(filename);
        tokio::fs::write(&file_path, data).await?;

        info!("Saved uploaded file to: {}", file_path.display());
        Ok(file_path)
    }

    /// Create and return a subdirectory of the scan's output directory.
    pub async fn make_output_dir(&self, scan_id: Uuid, subpath: &str) -> AppResult<PathBuf> {
        let dir = self.output_dir(scan_id).join(subpath);
        tokio::fs::create_dir_all(&dir).await?;
        Ok(dir)
    }

    /// Build directory for decompiled output.
    pub async fn build_dir(&self, scan_id: Uuid) -> AppResult<PathBuf> {
        self.make_output_dir(scan_id, "build").await
    }

    /// Directory for generated report files.
    pub async fn reports_dir(&self, scan_id: Uuid) -> AppResult<PathBuf> {
        self.make_output_dir(scan_id, "reports").await
    }

    /// Recursively remove the scan's upload and output directories.
    ///
    /// Idempotent: directories that are already absent are not an error.
    pub async fn purge(&self, scan_id: Uuid) -> AppResult<()> {
        for dir in [self.upload_dir(scan_id), self.output_dir(scan_id)] {
            match tokio::fs::remove_dir_all(&dir).await {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => {
                    return Err(AppError::Storage(format!(
                        "Failed to remove {}: {}",
                        dir.display(),
                        e
                    )));
                }
            }
        }
        info!("Purged artifact directories for scan {}", scan_id);
        Ok(())
    }
}

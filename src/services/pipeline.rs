//! Background scan pipeline: decompile, scan, report.
//!
//! Each submitted scan runs as a detached tokio task. A semaphore bounds how
//! many scans execute concurrently; tasks beyond the limit stay queued at
//! `pending` until a permit frees up. Stage failures mark the record `failed`
//! and never propagate past the task boundary.

use std::collections::BTreeMap;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tracing::{error, info};
use uuid::Uuid;

use crate::error::AppResult;
use crate::models::{ReportFormat, ScanResultPayload, ScanStatus};
use crate::services::artifacts::ArtifactStore;
use crate::services::engine::{Decompiler, VulnScanner};
use crate::services::report::ReportGenerator;
use crate::services::store::ScanStore;

pub struct PipelineRunner {
    store: Arc<dyn ScanStore>,
    artifacts: Arc<ArtifactStore>,
    decompiler: Arc<dyn Decompiler>,
    scanner: Arc<dyn VulnScanner>,
    permits: Arc<Semaphore>,
}

impl PipelineRunner {
    pub fn new(
        store: Arc<dyn ScanStore>,
        artifacts: Arc<ArtifactStore>,
        decompiler: Arc<dyn Decompiler>,
        scanner: Arc<dyn VulnScanner>,
        max_concurrent: usize,
    ) -> Self {
        Self {
            store,
            artifacts,
            decompiler,
            scanner,
            permits: Arc::new(Semaphore::new(max_concurrent)),
        }
    }

    /// Detach a background task that runs the full pipeline for `scan_id`.
    ///
    /// Returns immediately; progress is observable only through the store.
    pub fn schedule(self: &Arc<Self>, scan_id: Uuid) {
        let runner = Arc::clone(self);
        tokio::spawn(async move {
            // The semaphore is never closed, so acquisition only fails if the
            // runner itself is being torn down; nothing to do then.
            let Ok(_permit) = runner.permits.clone().acquire_owned().await else {
                return;
            };

            info!("Starting scan {}", scan_id);
            if let Err(e) = runner.execute(scan_id).await {
                error!("Scan {} failed: {}", scan_id, e);
                let message = format!("Scan failed: {}", e);
                let _ = runner
                    .store
                    .update(scan_id, Box::new(move |scan| scan.fail(message)))
                    .await;
            }
        });
    }

    async fn execute(&self, scan_id: Uuid) -> AppResult<()> {
        let record = self.store.get(scan_id).await?;
        let upload_path = record.upload_path.clone();
        let input_kind = record.input_kind;

        self.transition(scan_id, ScanStatus::Decompiling, 10, "Starting decompilation...")
            .await?;

        let build_dir = self.artifacts.build_dir(scan_id).await?;
        let outcome = self
            .decompiler
            .decompile(&upload_path, input_kind, &build_dir)
            .await?;

        self.transition(scan_id, ScanStatus::Decompiling, 30, "Decompilation completed")
            .await?;
        self.transition(scan_id, ScanStatus::Scanning, 40, "Starting vulnerability scan...")
            .await?;

        let scan_path = outcome.scan_path()?;
        let findings = self
            .scanner
            .scan(outcome.manifest_path.as_deref(), scan_path)
            .await?;

        self.transition(
            scan_id,
            ScanStatus::Scanning,
            70,
            format!("Found {} issues", findings.len()),
        )
        .await?;
        self.transition(scan_id, ScanStatus::Reporting, 80, "Generating reports...")
            .await?;

        let reports_dir = self.artifacts.reports_dir(scan_id).await?;
        let generator = ReportGenerator::new(&reports_dir);
        let mut report_paths = BTreeMap::new();
        for format in [ReportFormat::Json, ReportFormat::Html] {
            let path = generator.generate(&findings, format).await?;
            report_paths.insert(format, path);
        }

        let result =
            ScanResultPayload::from_findings(findings, report_paths, outcome.decompiled_path);
        self.store
            .update(scan_id, Box::new(move |scan| scan.complete(result)))
            .await?;

        info!("Scan {} completed", scan_id);
        Ok(())
    }

    async fn transition(
        &self,
        scan_id: Uuid,
        status: ScanStatus,
        progress: u8,
        message: impl Into<String>,
    ) -> AppResult<()> {
        let message = message.into();
        self.store
            .update(
                scan_id,
                Box::new(move |scan| scan.advance(status, progress, message)),
            )
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::models::{Finding, InputKind, Severity};
    use crate::services::engine::DecompileOutcome;
    use crate::services::store::MemoryScanStore;
    use async_trait::async_trait;
    use std::path::Path;
    use std::time::Duration;
    use tempfile::TempDir;

    struct FakeDecompiler {
        fail: bool,
    }

    #[async_trait]
    impl Decompiler for FakeDecompiler {
        async fn decompile(
            &self,
            input: &Path,
            input_kind: InputKind,
            build_dir: &Path,
        ) -> crate::error::AppResult<DecompileOutcome> {
            if self.fail {
                return Err(AppError::Pipeline("decompiler exploded".to_string()));
            }
            if input_kind.is_source() {
                return Ok(DecompileOutcome {
                    source_code: true,
                    source_path: input.to_path_buf(),
                    decompiled_path: None,
                    manifest_path: None,
                });
            }
            tokio::fs::create_dir_all(build_dir).await?;
            Ok(DecompileOutcome {
                source_code: false,
                source_path: input.to_path_buf(),
                decompiled_path: Some(build_dir.to_path_buf()),
                manifest_path: None,
            })
        }
    }

    struct FakeScanner {
        findings: Vec<Finding>,
    }

    #[async_trait]
    impl VulnScanner for FakeScanner {
        async fn scan(
            &self,
            _manifest: Option<&Path>,
            _source: &Path,
        ) -> crate::error::AppResult<Vec<Finding>> {
            Ok(self.findings.clone())
        }
    }

    fn sample_finding() -> Finding {
        Finding {
            category: "crypto".to_string(),
            severity: Severity::Vulnerability,
            name: "ECB cipher mode".to_string(),
            description: "desc".to_string(),
            file_path: Some("A.java".to_string()),
            line_number: Some(3),
        }
    }

    async fn runner_with(
        tmp: &TempDir,
        decompiler_fails: bool,
        findings: Vec<Finding>,
    ) -> (Arc<PipelineRunner>, Arc<MemoryScanStore>) {
        let store = Arc::new(MemoryScanStore::new());
        let artifacts = Arc::new(ArtifactStore::new(
            tmp.path().join("uploads"),
            tmp.path().join("output"),
        ));
        artifacts.ensure_roots().await.unwrap();
        let runner = Arc::new(PipelineRunner::new(
            store.clone(),
            artifacts,
            Arc::new(FakeDecompiler {
                fail: decompiler_fails,
            }),
            Arc::new(FakeScanner { findings }),
            2,
        ));
        (runner, store)
    }

    async fn wait_terminal(store: &MemoryScanStore, id: Uuid) -> crate::models::ScanRecord {
        for _ in 0..200 {
            let record = store.get(id).await.unwrap();
            if record.status.is_terminal() {
                return record;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("scan never reached a terminal state");
    }

    #[tokio::test]
    async fn test_successful_scan_reaches_completed_with_reports() {
        let tmp = TempDir::new().unwrap();
        let (runner, store) = runner_with(&tmp, false, vec![sample_finding()]).await;
        let upload = tmp.path().join("app.apk");
        tokio::fs::write(&upload, b"apk bytes").await.unwrap();
        let record = store
            .create(Uuid::new_v4(), InputKind::Apk, "app.apk", upload)
            .await
            .unwrap();

        runner.schedule(record.id);
        let done = wait_terminal(&store, record.id).await;

        assert_eq!(done.status, ScanStatus::Completed);
        assert_eq!(done.progress, 100);
        let result = done.result.unwrap();
        assert_eq!(result.total_vulnerabilities, 1);
        assert_eq!(result.report_paths.len(), 2);
        for path in result.report_paths.values() {
            assert!(path.exists());
        }
    }

    #[tokio::test]
    async fn test_decompiler_failure_marks_scan_failed() {
        let tmp = TempDir::new().unwrap();
        let (runner, store) = runner_with(&tmp, true, vec![]).await;
        let upload = tmp.path().join("app.apk");
        tokio::fs::write(&upload, b"apk bytes").await.unwrap();
        let record = store
            .create(Uuid::new_v4(), InputKind::Apk, "app.apk", upload)
            .await
            .unwrap();

        runner.schedule(record.id);
        let done = wait_terminal(&store, record.id).await;

        assert_eq!(done.status, ScanStatus::Failed);
        assert_eq!(done.progress, 0);
        assert!(done.message.contains("Scan failed"));
        assert!(done.result.is_none());
    }

    #[tokio::test]
    async fn test_failure_does_not_affect_other_scans() {
        let tmp = TempDir::new().unwrap();
        let store = Arc::new(MemoryScanStore::new());
        let artifacts = Arc::new(ArtifactStore::new(
            tmp.path().join("uploads"),
            tmp.path().join("output"),
        ));
        artifacts.ensure_roots().await.unwrap();

        let good_runner = Arc::new(PipelineRunner::new(
            store.clone(),
            artifacts.clone(),
            Arc::new(FakeDecompiler { fail: false }),
            Arc::new(FakeScanner { findings: vec![] }),
            2,
        ));
        let bad_runner = Arc::new(PipelineRunner::new(
            store.clone(),
            artifacts,
            Arc::new(FakeDecompiler { fail: true }),
            Arc::new(FakeScanner { findings: vec![] }),
            2,
        ));

        let good_upload = tmp.path().join("good.apk");
        let bad_upload = tmp.path().join("bad.apk");
        tokio::fs::write(&good_upload, b"a").await.unwrap();
        tokio::fs::write(&bad_upload, b"b").await.unwrap();
        let good = store
            .create(Uuid::new_v4(), InputKind::Apk, "good.apk", good_upload)
            .await
            .unwrap();
        let bad = store
            .create(Uuid::new_v4(), InputKind::Apk, "bad.apk", bad_upload)
            .await
            .unwrap();

        bad_runner.schedule(bad.id);
        good_runner.schedule(good.id);

        let good_done = wait_terminal(&store, good.id).await;
        let bad_done = wait_terminal(&store, bad.id).await;

        assert_eq!(good_done.status, ScanStatus::Completed);
        assert_eq!(bad_done.status, ScanStatus::Failed);
    }

    #[tokio::test]
    async fn test_source_input_skips_decompiled_path() {
        let tmp = TempDir::new().unwrap();
        let (runner, store) = runner_with(&tmp, false, vec![]).await;
        let upload = tmp.path().join("Main.java");
        tokio::fs::write(&upload, b"class Main {}").await.unwrap();
        let record = store
            .create(Uuid::new_v4(), InputKind::JavaSource, "Main.java", upload)
            .await
            .unwrap();

        runner.schedule(record.id);
        let done = wait_terminal(&store, record.id).await;

        assert_eq!(done.status, ScanStatus::Completed);
        let result = done.result.unwrap();
        assert!(result.decompiled_path.is_none());
        assert_eq!(result.total_vulnerabilities, 0);
    }

    #[tokio::test]
    async fn test_concurrent_scans_both_complete() {
        let tmp = TempDir::new().unwrap();
        let (runner, store) = runner_with(&tmp, false, vec![sample_finding()]).await;

        let mut ids = Vec::new();
        for i in 0..4 {
            let upload = tmp.path().join(format!("app{}.apk", i));
            tokio::fs::write(&upload, b"bytes").await.unwrap();
            let record = store
                .create(Uuid::new_v4(), InputKind::Apk, &format!("app{}.apk", i), upload)
                .await
                .unwrap();
            runner.schedule(record.id);
            ids.push(record.id);
        }

        for id in ids {
            let done = wait_terminal(&store, id).await;
            assert_eq!(done.status, ScanStatus::Completed);
        }
    }
}

//! Scan store: the single source of truth for scan records.
//!
//! The store is defined as a trait so the in-memory backing used here (and in
//! tests) can be swapped for a durable one without touching the pipeline
//! runner or the API handlers.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{InputKind, ScanRecord, ScanSummary};

/// Single-shot mutation applied to a record under its lock.
pub type Mutator = Box<dyn FnOnce(&mut ScanRecord) + Send>;

/// Contract for scan record storage.
///
/// Updates to the same scan serialize; updates to different scans must not
/// block each other. Lookups on unknown identifiers return `NotFound`.
#[async_trait]
pub trait ScanStore: Send + Sync {
    /// Create a record in `pending` state under the caller's identifier.
    ///
    /// The identifier is assigned before creation so the uploaded artifact
    /// can land in its per-scan directory first.
    async fn create(
        &self,
        scan_id: Uuid,
        input_kind: InputKind,
        filename: &str,
        upload_path: PathBuf,
    ) -> AppResult<ScanRecord>;

    /// Snapshot of the record for the given identifier.
    async fn get(&self, scan_id: Uuid) -> AppResult<ScanRecord>;

    /// Apply a mutation to the record atomically.
    async fn update(&self, scan_id: Uuid, mutate: Mutator) -> AppResult<()>;

    /// Lightweight summaries of all records, newest first.
    async fn list(&self) -> Vec<ScanSummary>;

    /// Remove the record, returning its final snapshot.
    async fn delete(&self, scan_id: Uuid) -> AppResult<ScanRecord>;
}

/// In-memory scan store.
///
/// The outer map is read-locked for record access, so concurrent pipelines
/// touching different scans proceed in parallel; each record carries its own
/// lock to serialize same-scan updates.
#[derive(Default)]
pub struct MemoryScanStore {
    scans: RwLock<HashMap<Uuid, Arc<RwLock<ScanRecord>>>>,
}

impl MemoryScanStore {
    pub fn new() -> Self {
        Self::default()
    }

    async fn entry(&self, scan_id: Uuid) -> AppResult<Arc<RwLock<ScanRecord>>> {
        let scans = self.scans.read().await;
        scans
            .get(&scan_id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Scan {}", scan_id)))
    }
}

#[async_trait]
impl ScanStore for MemoryScanStore {
    async fn create(
        &self,
        scan_id: Uuid,
        input_kind: InputKind,
        filename: &str,
        upload_path: PathBuf,
    ) -> AppResult<ScanRecord> {
        let record = ScanRecord::new(scan_id, input_kind, filename.to_string(), upload_path);
        let snapshot = record.clone();

        let mut scans = self.scans.write().await;
        scans.insert(record.id, Arc::new(RwLock::new(record)));

        Ok(snapshot)
    }

    async fn get(&self, scan_id: Uuid) -> AppResult<ScanRecord> {
        let entry = self.entry(scan_id).await?;
        let record = entry.read().await;
        Ok(record.clone())
    }

    async fn update(&self, scan_id: Uuid, mutate: Mutator) -> AppResult<()> {
        let entry = self.entry(scan_id).await?;
        let mut record = entry.write().await;
        mutate(&mut record);
        Ok(())
    }

    async fn list(&self) -> Vec<ScanSummary> {
        let entries: Vec<Arc<RwLock<ScanRecord>>> =
            self.scans.read().await.values().cloned().collect();

        let mut summaries = Vec::with_capacity(entries.len());
        for entry in entries {
            summaries.push(entry.read().await.summary());
        }
        summaries.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        summaries
    }

    async fn delete(&self, scan_id: Uuid) -> AppResult<ScanRecord> {
        let entry = {
            let mut scans = self.scans.write().await;
            scans
                .remove(&scan_id)
                .ok_or_else(|| AppError::NotFound(format!("Scan {}", scan_id)))?
        };
        let record = entry.read().await;
        Ok(record.clone())
    }
}

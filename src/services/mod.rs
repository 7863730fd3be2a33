//! Business logic services.

pub mod artifacts;
pub mod engine;
pub mod pipeline;
pub mod report;
pub mod store;

pub use artifacts::ArtifactStore;
pub use engine::{CommandDecompiler, Decompiler, KeywordScanner, VulnScanner};
pub use pipeline::PipelineRunner;
pub use report::ReportGenerator;
pub use store::{MemoryScanStore, ScanStore};

//! Analysis collaborators: decompiler and vulnerability scanner.
//!
//! Both engines sit behind traits so the pipeline runner can be exercised
//! with mocks and the real tools can be replaced without touching the
//! orchestration code. Collaborator failures surface as `Result` values at
//! the stage boundary, never as panics.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info};

use crate::error::{AppError, AppResult};
use crate::models::{Finding, InputKind, Severity};

/// Outcome reported by a decompiler run.
#[derive(Debug, Clone)]
pub struct DecompileOutcome {
    /// True when the input was already source code and no decompilation ran.
    pub source_code: bool,
    /// Path the scanner should read when `source_code` is true.
    pub source_path: PathBuf,
    /// Root of the decompiled tree, when decompilation produced one.
    pub decompiled_path: Option<PathBuf>,
    /// Extracted manifest, when the input carried one.
    pub manifest_path: Option<PathBuf>,
}

impl DecompileOutcome {
    /// Path the scanner must read.
    ///
    /// Pre-existing source is scanned directly; otherwise the decompiled tree
    /// is used. Scanning the wrong path yields zero findings silently, so
    /// this selection must stay exact.
    pub fn scan_path(&self) -> AppResult<&Path> {
        if self.source_code {
            Ok(&self.source_path)
        } else {
            self.decompiled_path
                .as_deref()
                .ok_or_else(|| AppError::Pipeline("Decompiler produced no output".to_string()))
        }
    }
}

/// Decompilation collaborator.
#[async_trait]
pub trait Decompiler: Send + Sync {
    /// Decompile `input` into `build_dir`.
    async fn decompile(
        &self,
        input: &Path,
        input_kind: InputKind,
        build_dir: &Path,
    ) -> AppResult<DecompileOutcome>;
}

/// Vulnerability scanning collaborator.
#[async_trait]
pub trait VulnScanner: Send + Sync {
    /// Scan the source tree (or single source file) at `source`.
    async fn scan(&self, manifest: Option<&Path>, source: &Path) -> AppResult<Vec<Finding>>;
}

// ============================================================================
// Built-in decompiler: external command for binaries, passthrough for source
// ============================================================================

/// Decompiler that shells out to an external tool (jadx by default) for APK
/// and JAR inputs, and passes plain Java source through untouched.
pub struct CommandDecompiler {
    command: String,
}

impl CommandDecompiler {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }
}

#[async_trait]
impl Decompiler for CommandDecompiler {
    async fn decompile(
        &self,
        input: &Path,
        input_kind: InputKind,
        build_dir: &Path,
    ) -> AppResult<DecompileOutcome> {
        if input_kind.is_source() {
            debug!("Input {} is source code, skipping decompilation", input.display());
            return Ok(DecompileOutcome {
                source_code: true,
                source_path: input.to_path_buf(),
                decompiled_path: None,
                manifest_path: None,
            });
        }

        info!(
            "Decompiling {} to {} via '{}'",
            input.display(),
            build_dir.display(),
            self.command
        );

        let output = Command::new(&self.command)
            .arg("-d")
            .arg(build_dir)
            .arg(input)
            .output()
            .await
            .map_err(|e| {
                AppError::Pipeline(format!("Failed to launch decompiler '{}': {}", self.command, e))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(AppError::Pipeline(format!(
                "Decompiler exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        let manifest = build_dir.join("resources").join("AndroidManifest.xml");
        Ok(DecompileOutcome {
            source_code: false,
            source_path: input.to_path_buf(),
            decompiled_path: Some(build_dir.to_path_buf()),
            manifest_path: manifest.exists().then_some(manifest),
        })
    }
}

// ============================================================================
// Built-in scanner: keyword rules over the source tree
// ============================================================================

/// One keyword detection rule.
struct Rule {
    pattern: &'static str,
    category: &'static str,
    severity: Severity,
    name: &'static str,
    description: &'static str,
}

const RULES: &[Rule] = &[
    Rule {
        pattern: "ECB",
        category: "crypto",
        severity: Severity::Vulnerability,
        name: "ECB cipher mode",
        description: "ECB mode leaks plaintext structure; use an authenticated mode such as GCM.",
    },
    Rule {
        pattern: "DES",
        category: "crypto",
        severity: Severity::Warning,
        name: "Weak cipher (DES)",
        description: "DES has an effective key size of 56 bits and is considered broken.",
    },
    Rule {
        pattern: "setJavaScriptEnabled(true)",
        category: "webview",
        severity: Severity::Warning,
        name: "JavaScript enabled in WebView",
        description: "Enabling JavaScript in a WebView exposes the app to cross-site scripting.",
    },
    Rule {
        pattern: "addJavascriptInterface",
        category: "webview",
        severity: Severity::Vulnerability,
        name: "JavaScript bridge exposed",
        description: "addJavascriptInterface can expose native methods to untrusted pages.",
    },
    Rule {
        pattern: "MODE_WORLD_READABLE",
        category: "storage",
        severity: Severity::Vulnerability,
        name: "World-readable storage",
        description: "World-readable files are accessible to every installed application.",
    },
    Rule {
        pattern: "android:exported=\"true\"",
        category: "manifest",
        severity: Severity::Warning,
        name: "Exported component",
        description: "Exported components are reachable by other applications.",
    },
    Rule {
        pattern: "android:debuggable=\"true\"",
        category: "manifest",
        severity: Severity::Vulnerability,
        name: "Debuggable build",
        description: "Debuggable applications allow runtime inspection on production devices.",
    },
    Rule {
        pattern: "TrustAllCerts",
        category: "network",
        severity: Severity::Vulnerability,
        name: "Certificate validation disabled",
        description: "Trust-all certificate managers defeat TLS entirely.",
    },
    Rule {
        pattern: "Log.d(",
        category: "logging",
        severity: Severity::Info,
        name: "Debug logging",
        description: "Debug log statements can leak sensitive values in production builds.",
    },
];

/// Source file extensions the keyword scanner inspects.
const SCANNED_EXTENSIONS: &[&str] = &["java", "kt", "xml"];

/// Rule-based scanner that walks the source tree and matches line keywords.
#[derive(Default)]
pub struct KeywordScanner;

impl KeywordScanner {
    pub fn new() -> Self {
        Self
    }

    fn scan_file(path: &Path, findings: &mut Vec<Finding>) -> AppResult<()> {
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            // Binary or non-UTF8 leftovers in the tree are skipped.
            Err(_) => return Ok(()),
        };

        for (idx, line) in content.lines().enumerate() {
            for rule in RULES {
                if line.contains(rule.pattern) {
                    findings.push(Finding {
                        category: rule.category.to_string(),
                        severity: rule.severity,
                        name: rule.name.to_string(),
                        description: rule.description.to_string(),
                        file_path: Some(path.display().to_string()),
                        line_number: Some(idx as u32 + 1),
                    });
                }
            }
        }
        Ok(())
    }

    fn walk(root: &Path, findings: &mut Vec<Finding>) -> AppResult<()> {
        let mut stack = vec![root.to_path_buf()];
        while let Some(dir) = stack.pop() {
            for entry in std::fs::read_dir(&dir)? {
                let path = entry?.path();
                if path.is_dir() {
                    stack.push(path);
                } else if path
                    .extension()
                    .and_then(|e| e.to_str())
                    .is_some_and(|e| SCANNED_EXTENSIONS.contains(&e.to_lowercase().as_str()))
                {
                    Self::scan_file(&path, findings)?;
                }
            }
        }
        Ok(())
    }
}

#[async_trait]
impl VulnScanner for KeywordScanner {
    async fn scan(&self, manifest: Option<&Path>, source: &Path) -> AppResult<Vec<Finding>> {
        let source = source.to_path_buf();
        let walk_root = source.clone();
        let manifest = manifest.map(Path::to_path_buf);

        // The walk is blocking filesystem work; keep it off the async workers.
        let findings = tokio::task::spawn_blocking(move || -> AppResult<Vec<Finding>> {
            let mut findings = Vec::new();
            if walk_root.is_dir() {
                Self::walk(&walk_root, &mut findings)?;
            } else {
                Self::scan_file(&walk_root, &mut findings)?;
            }
            if let Some(manifest) = manifest {
                if manifest.exists() {
                    Self::scan_file(&manifest, &mut findings)?;
                }
            }
            Ok(findings)
        })
        .await
        .map_err(|e| AppError::Pipeline(format!("Scanner task panicked: {}", e)))??;

        info!("Scan of {} produced {} findings", source.display(), findings.len());
        Ok(findings)
    }
}

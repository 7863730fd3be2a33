//! Report generation for completed scans.
//!
//! Findings are rendered sorted by severity (most severe first) without
//! mutating the caller's slice. File names carry a millisecond timestamp so
//! repeated runs never collide within the same scan directory.

use std::path::PathBuf;

use chrono::Utc;
use tracing::info;

use crate::error::AppResult;
use crate::models::{Finding, ReportFormat};

pub struct ReportGenerator {
    output_dir: PathBuf,
}

impl ReportGenerator {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    /// Render `findings` in the given format and return the written path.
    pub async fn generate(
        &self,
        findings: &[Finding],
        format: ReportFormat,
    ) -> AppResult<PathBuf> {
        let mut ordered: Vec<&Finding> = findings.iter().collect();
        // Stable sort keeps discovery order within a severity class.
        ordered.sort_by_key(|f| f.severity.priority());

        let rendered = match format {
            ReportFormat::Json => render_json(&ordered)?,
            ReportFormat::Html => render_html(&ordered),
        };

        let file_name = format!(
            "report_{}.{}",
            Utc::now().format("%Y%m%d_%H%M%S%3f"),
            format.extension()
        );
        let path = self.output_dir.join(file_name);

        tokio::fs::create_dir_all(&self.output_dir).await?;
        tokio::fs::write(&path, rendered).await?;
        info!("Generated {} report at {}", format.extension(), path.display());
        Ok(path)
    }
}

fn render_json(findings: &[&Finding]) -> AppResult<String> {
    Ok(serde_json::to_string_pretty(findings)?)
}

fn render_html(findings: &[&Finding]) -> String {
    let mut rows = String::new();
    for finding in findings {
        let location = match (&finding.file_path, finding.line_number) {
            (Some(file), Some(line)) => format!("{}:{}", file, line),
            (Some(file), None) => file.clone(),
            _ => String::from("-"),
        };
        rows.push_str(&format!(
            "    <tr class=\"{}\"><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>\n",
            finding.severity.as_str().to_lowercase(),
            escape(finding.severity.as_str()),
            escape(&finding.category),
            escape(&finding.name),
            escape(&finding.description),
            escape(&location),
        ));
    }

    format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>Scan Report</title>\n\
         <style>\n\
         body {{ font-family: sans-serif; margin: 2em; }}\n\
         table {{ border-collapse: collapse; width: 100%; }}\n\
         th, td {{ border: 1px solid #ccc; padding: 6px 10px; text-align: left; }}\n\
         tr.vulnerability td:first-child {{ color: #c0392b; font-weight: bold; }}\n\
         tr.warning td:first-child {{ color: #d35400; }}\n\
         </style>\n</head>\n<body>\n\
         <h1>Scan Report</h1>\n\
         <p>Generated {} &mdash; {} findings</p>\n\
         <table>\n    <tr><th>Severity</th><th>Category</th><th>Name</th><th>Description</th><th>Location</th></tr>\n{}</table>\n\
         </body>\n</html>\n",
        Utc::now().format("%Y-%m-%d %H:%M:%S UTC"),
        findings.len(),
        rows
    )
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Severity;
    use tempfile::TempDir;

    fn finding(severity: Severity, name: &str) -> Finding {
        Finding {
            category: "test".to_string(),
            severity,
            name: name.to_string(),
            description: "desc".to_string(),
            file_path: Some("A.java".to_string()),
            line_number: Some(1),
        }
    }

    #[tokio::test]
    async fn test_json_report_sorted_by_severity() {
        let tmp = TempDir::new().unwrap();
        let generator = ReportGenerator::new(tmp.path());
        let findings = vec![
            finding(Severity::Info, "info"),
            finding(Severity::Vulnerability, "vuln"),
            finding(Severity::Warning, "warn"),
        ];

        let path = generator
            .generate(&findings, ReportFormat::Json)
            .await
            .unwrap();
        let content = tokio::fs::read_to_string(&path).await.unwrap();
        let parsed: Vec<Finding> = serde_json::from_str(&content).unwrap();

        assert_eq!(parsed[0].severity, Severity::Vulnerability);
        assert_eq!(parsed[1].severity, Severity::Warning);
        assert_eq!(parsed[2].severity, Severity::Info);
    }

    #[tokio::test]
    async fn test_input_slice_not_mutated() {
        let tmp = TempDir::new().unwrap();
        let generator = ReportGenerator::new(tmp.path());
        let findings = vec![
            finding(Severity::Info, "first"),
            finding(Severity::Vulnerability, "second"),
        ];

        generator
            .generate(&findings, ReportFormat::Json)
            .await
            .unwrap();

        assert_eq!(findings[0].severity, Severity::Info);
        assert_eq!(findings[1].severity, Severity::Vulnerability);
    }

    #[tokio::test]
    async fn test_stable_order_within_severity() {
        let tmp = TempDir::new().unwrap();
        let generator = ReportGenerator::new(tmp.path());
        let findings = vec![
            finding(Severity::Warning, "first-warn"),
            finding(Severity::Warning, "second-warn"),
        ];

        let path = generator
            .generate(&findings, ReportFormat::Json)
            .await
            .unwrap();
        let parsed: Vec<Finding> =
            serde_json::from_str(&tokio::fs::read_to_string(&path).await.unwrap()).unwrap();

        assert_eq!(parsed[0].name, "first-warn");
        assert_eq!(parsed[1].name, "second-warn");
    }

    #[tokio::test]
    async fn test_unknown_severity_sorts_last() {
        let tmp = TempDir::new().unwrap();
        let generator = ReportGenerator::new(tmp.path());
        let findings = vec![
            finding(Severity::Unknown, "mystery"),
            finding(Severity::Info, "info"),
        ];

        let path = generator
            .generate(&findings, ReportFormat::Json)
            .await
            .unwrap();
        let parsed: Vec<Finding> =
            serde_json::from_str(&tokio::fs::read_to_string(&path).await.unwrap()).unwrap();

        assert_eq!(parsed[0].name, "info");
        assert_eq!(parsed[1].name, "mystery");
    }

    #[tokio::test]
    async fn test_html_report_escapes_content() {
        let tmp = TempDir::new().unwrap();
        let generator = ReportGenerator::new(tmp.path());
        let mut f = finding(Severity::Warning, "<script>alert(1)</script>");
        f.description = "a & b".to_string();

        let path = generator
            .generate(&[f], ReportFormat::Html)
            .await
            .unwrap();
        let content = tokio::fs::read_to_string(&path).await.unwrap();

        assert!(content.contains("&lt;script&gt;"));
        assert!(content.contains("a &amp; b"));
        assert!(!content.contains("<script>alert"));
    }

    #[tokio::test]
    async fn test_report_file_name_carries_extension() {
        let tmp = TempDir::new().unwrap();
        let generator = ReportGenerator::new(tmp.path());

        let json = generator.generate(&[], ReportFormat::Json).await.unwrap();
        let html = generator.generate(&[], ReportFormat::Html).await.unwrap();

        assert_eq!(json.extension().unwrap(), "json");
        assert_eq!(html.extension().unwrap(), "html");
    }
}

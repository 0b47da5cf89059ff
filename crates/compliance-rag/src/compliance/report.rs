//! JSON compliance report

use serde::Serialize;
use std::path::Path;

use crate::error::Result;
use crate::types::{ChecklistResult, ComplianceReport, Finding};

/// Value of `annotated_document_path` when nothing was annotated
pub const NO_ANNOTATION: &str = "N/A";

/// Local time in ISO-8601 without an offset, microsecond precision
fn timestamp() -> String {
    chrono::Local::now()
        .format("%Y-%m-%dT%H:%M:%S%.6f")
        .to_string()
}

/// Serialize with 4-space indentation, keeping non-ASCII characters as-is
fn to_pretty_json<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
    value.serialize(&mut serializer)?;
    Ok(buf)
}

/// Assemble the report and write it to `output`
pub fn generate_report(
    entity_type: &str,
    checklist: &ChecklistResult,
    findings: &[Finding],
    annotated_document_path: &str,
    output: &Path,
) -> Result<ComplianceReport> {
    let report = ComplianceReport {
        report_generated_on: timestamp(),
        entity_type: entity_type.to_string(),
        checklist_verification: checklist.clone(),
        red_flag_findings: findings.to_vec(),
        annotated_document_path: annotated_document_path.to_string(),
    };

    write_report(&report, output)?;
    Ok(report)
}

/// Write an already assembled report
pub fn write_report(report: &ComplianceReport, output: &Path) -> Result<()> {
    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(output, to_pretty_json(report)?)?;
    tracing::info!("Compliance report saved to {}", output.display());
    Ok(())
}

/// Read a report back from disk
pub fn load_report(path: &Path) -> Result<ComplianceReport> {
    let raw = std::fs::read(path)?;
    Ok(serde_json::from_slice(&raw)?)
}

//! Checklist results and the final compliance report

use serde::{Deserialize, Serialize};

use super::finding::Finding;

/// Present/missing split of an entity type's required documents
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChecklistResult {
    pub present: Vec<String>,
    pub missing: Vec<String>,
}

impl ChecklistResult {
    /// Total number of required documents considered
    pub fn total(&self) -> usize {
        self.present.len() + self.missing.len()
    }
}

/// Combined report written once per run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComplianceReport {
    /// ISO-8601 local timestamp
    pub report_generated_on: String,
    /// Detected entity type(s), comma-joined
    pub entity_type: String,
    pub checklist_verification: ChecklistResult,
    pub red_flag_findings: Vec<Finding>,
    /// Annotated DOCX path(s), comma-joined, or "N/A"
    pub annotated_document_path: String,
}

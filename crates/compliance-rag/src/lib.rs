//! compliance-rag: ADGM corporate filing compliance checker
//!
//! Reference documents are converted to text, chunked and embedded into a local
//! vector index. Uploaded filings (PDF / DOCX) are classified by entity type,
//! checked against a required-document checklist, reviewed clause by clause by
//! an LLM grounded on retrieved references, and annotated in place when they are
//! Word documents. Results are combined into a single JSON report.

pub mod compliance;
pub mod config;
pub mod error;
pub mod generation;
pub mod ingestion;
pub mod pipeline;
pub mod providers;
pub mod retrieval;
pub mod types;

#[cfg(test)]
pub(crate) mod test_support;

pub use config::ComplianceConfig;
pub use error::{Error, Result};
pub use pipeline::{CompliancePipeline, FileOutcome, FileResult, RunSummary, SkipReason};
pub use types::{
    document::{FileType, ParsedDocument, ReferenceChunk},
    entity::EntityType,
    finding::{Assessment, Finding, Severity},
    report::{ChecklistResult, ComplianceReport},
};

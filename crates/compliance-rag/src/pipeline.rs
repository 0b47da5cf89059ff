//! Per-file compliance pipeline and run aggregation
//!
//! Parse -> Classify -> Verify -> Detect -> Annotate, one file at a time.
//! Each file ends in a [`FileOutcome`]; skipped files contribute nothing to the
//! combined report.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::compliance::{
    generate_report, AnnotationSummary, Annotator, Checklist, ChecklistVerifier, Classification,
    Classifier, RedFlagDetector, NO_ANNOTATION,
};
use crate::config::ComplianceConfig;
use crate::error::{Error, Result};
use crate::ingestion::FileParser;
use crate::providers::{EmbeddingProvider, LlmProvider};
use crate::retrieval::Retriever;
use crate::types::{ChecklistResult, ComplianceReport, EntityType, FileType, Finding};

/// Why a file contributed nothing to the report
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// Not a PDF or DOCX
    Unsupported(String),
    /// The file could not be read or decoded
    ParseFailed(String),
    /// Extraction produced no text
    EmptyText,
    /// Neither keyword rules nor the reference index matched
    Unclassified,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unsupported(msg) => write!(f, "unsupported file: {}", msg),
            Self::ParseFailed(msg) => write!(f, "could not parse: {}", msg),
            Self::EmptyText => f.write_str("no text could be extracted"),
            Self::Unclassified => f.write_str("entity type could not be determined"),
        }
    }
}

/// Everything produced for one processed file
#[derive(Debug, Clone)]
pub struct FileResult {
    pub path: PathBuf,
    pub classification: Classification,
    pub checklist: ChecklistResult,
    pub findings: Vec<Finding>,
    /// Present for DOCX inputs that were annotated successfully
    pub annotation: Option<AnnotationSummary>,
}

/// Tagged result of running the pipeline on one file
#[derive(Debug, Clone)]
pub enum FileOutcome {
    Processed(Box<FileResult>),
    Skipped { path: PathBuf, reason: SkipReason },
}

impl FileOutcome {
    pub fn path(&self) -> &Path {
        match self {
            Self::Processed(result) => &result.path,
            Self::Skipped { path, .. } => path,
        }
    }

    pub fn is_processed(&self) -> bool {
        matches!(self, Self::Processed(_))
    }
}

/// Output of a full run
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub report: ComplianceReport,
    pub outcomes: Vec<FileOutcome>,
}

/// Fields of the combined report, before it is timestamped and written
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Aggregate {
    pub entity_type: String,
    pub checklist: ChecklistResult,
    pub findings: Vec<Finding>,
    pub annotated_document_path: String,
}

/// Combine processed files: sorted, de-duplicated checklist names; entity
/// types de-duplicated in first-seen order; findings in file order.
pub fn aggregate(outcomes: &[FileOutcome]) -> Aggregate {
    let mut entity_types: Vec<&EntityType> = Vec::new();
    let mut checklist = ChecklistResult::default();
    let mut findings = Vec::new();
    let mut annotated = Vec::new();

    for outcome in outcomes {
        let FileOutcome::Processed(result) = outcome else {
            continue;
        };
        let entity = &result.classification.entity_type;
        if !entity_types.contains(&entity) {
            entity_types.push(entity);
        }
        checklist.present.extend(result.checklist.present.iter().cloned());
        checklist.missing.extend(result.checklist.missing.iter().cloned());
        findings.extend(result.findings.iter().cloned());
        if let Some(summary) = &result.annotation {
            annotated.push(summary.output_path.display().to_string());
        }
    }

    checklist.present.sort();
    checklist.present.dedup();
    checklist.missing.sort();
    checklist.missing.dedup();

    Aggregate {
        entity_type: entity_types
            .iter()
            .map(|e| e.as_str())
            .collect::<Vec<_>>()
            .join(", "),
        checklist,
        findings,
        annotated_document_path: if annotated.is_empty() {
            NO_ANNOTATION.to_string()
        } else {
            annotated.join(", ")
        },
    }
}

/// The compliance checker
pub struct CompliancePipeline {
    classifier: Classifier,
    verifier: ChecklistVerifier,
    detector: RedFlagDetector,
    annotator: Annotator,
}

impl CompliancePipeline {
    /// Wire the stages from configuration
    ///
    /// Fails with `IndexUnavailable` when the reference index has not been built.
    pub fn new(
        config: &ComplianceConfig,
        embedder: Arc<dyn EmbeddingProvider>,
        llm: Arc<dyn LlmProvider>,
    ) -> Result<Self> {
        let retriever = Retriever::open(&config.paths.index_dir, embedder, config.retrieval.top_k)?;
        let checklist = Checklist::load_or_empty(&config.paths.checklist_file);

        Ok(Self::from_parts(
            Classifier::new(&config.classifier, Some(retriever.clone())),
            ChecklistVerifier::new(checklist, &config.paths.processed_texts_dir),
            RedFlagDetector::new(retriever, llm, config.annotation.preview_chars),
            Annotator::new(config.annotation.similarity_threshold),
        ))
    }

    /// Assemble from already constructed stages
    pub fn from_parts(
        classifier: Classifier,
        verifier: ChecklistVerifier,
        detector: RedFlagDetector,
        annotator: Annotator,
    ) -> Self {
        Self {
            classifier,
            verifier,
            detector,
            annotator,
        }
    }

    fn skipped(path: &Path, reason: SkipReason) -> FileOutcome {
        tracing::warn!("Skipping {}: {}", path.display(), reason);
        FileOutcome::Skipped {
            path: path.to_path_buf(),
            reason,
        }
    }

    /// Run every stage on one file
    pub async fn process_file(&self, path: &Path) -> FileOutcome {
        let file_type = FileType::from_path(path);
        if !file_type.is_supported() {
            return Self::skipped(path, SkipReason::Unsupported(file_type.display_name().to_string()));
        }

        let parsed = match FileParser::parse_path(path) {
            Ok(parsed) => parsed,
            Err(Error::EmptyDocument(_)) => return Self::skipped(path, SkipReason::EmptyText),
            Err(Error::UnsupportedFileType(msg)) => return Self::skipped(path, SkipReason::Unsupported(msg)),
            Err(e) => return Self::skipped(path, SkipReason::ParseFailed(e.to_string())),
        };

        let Some(classification) = self.classifier.classify_path(path, &parsed.content).await else {
            return Self::skipped(path, SkipReason::Unclassified);
        };
        let entity = classification.entity_type.as_str();
        tracing::info!("Entity type for {}: {}", path.display(), entity);

        let checklist = self.verifier.verify(entity);
        let findings = self.detector.detect(&parsed.content, entity).await;

        let annotation = if file_type.supports_annotation() {
            let output = Annotator::annotated_path(path);
            match self.annotator.annotate(path, &findings, &output) {
                Ok(summary) => Some(summary),
                Err(e) => {
                    tracing::error!("Annotation failed for {}: {}", path.display(), e);
                    None
                }
            }
        } else {
            None
        };

        FileOutcome::Processed(Box::new(FileResult {
            path: path.to_path_buf(),
            classification,
            checklist,
            findings,
            annotation,
        }))
    }

    /// Process files strictly in order, then write the combined report
    pub async fn run(&self, paths: &[PathBuf], report_path: &Path) -> Result<RunSummary> {
        let mut outcomes = Vec::with_capacity(paths.len());
        for path in paths {
            outcomes.push(self.process_file(path).await);
        }

        let combined = aggregate(&outcomes);
        let processed = outcomes.iter().filter(|o| o.is_processed()).count();
        tracing::info!(
            "Compliance check complete: {} processed, {} skipped",
            processed,
            outcomes.len() - processed
        );

        let report = generate_report(
            &combined.entity_type,
            &combined.checklist,
            &combined.findings,
            &combined.annotated_document_path,
            report_path,
        )?;

        Ok(RunSummary { report, outcomes })
    }
}

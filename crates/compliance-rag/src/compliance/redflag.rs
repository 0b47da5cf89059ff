//! Clause-level red-flag detection
//!
//! The document is split into `\n\n`-delimited sections. For each section the
//! closest reference chunks are retrieved, a review prompt is built and the
//! model is called once. Sections are processed strictly in order; a failed
//! model call becomes a placeholder finding and the next section continues.

use std::path::Path;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::generation::{parse_assessment, PromptBuilder};
use crate::ingestion::FileParser;
use crate::providers::LlmProvider;
use crate::retrieval::Retriever;
use crate::types::Finding;

use super::classifier::Classifier;

/// Entity label used in prompts when a document could not be classified
pub const UNCLASSIFIED_LABEL: &str = "Unknown";

/// Non-empty, trimmed `\n\n`-delimited sections
pub fn split_sections(text: &str) -> Vec<&str> {
    text.split("\n\n")
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}

/// First `max_chars` characters followed by `...`
pub fn preview(section: &str, max_chars: usize) -> String {
    let mut out: String = section.chars().take(max_chars).collect();
    out.push_str("...");
    out
}

/// Retrieval-augmented per-section reviewer
pub struct RedFlagDetector {
    retriever: Retriever,
    llm: Arc<dyn LlmProvider>,
    preview_chars: usize,
}

impl RedFlagDetector {
    pub fn new(retriever: Retriever, llm: Arc<dyn LlmProvider>, preview_chars: usize) -> Self {
        Self {
            retriever,
            llm,
            preview_chars,
        }
    }

    /// Review one section; never fails
    pub async fn analyze_section(&self, section: &str, entity_type: &str) -> Finding {
        let references = match self.retriever.retrieve(section).await {
            Ok(chunks) => PromptBuilder::build_references(&chunks),
            Err(e) => {
                tracing::warn!("Reference retrieval failed, continuing without context: {}", e);
                String::new()
            }
        };

        let prompt = PromptBuilder::build_compliance_prompt(entity_type, section, &references);
        let section_preview = preview(section, self.preview_chars);

        match self.llm.complete(&prompt).await {
            Ok(response) => {
                let assessment = parse_assessment(&response);
                if assessment.is_none() {
                    tracing::debug!("Model response for '{}' is not structured JSON", section_preview);
                }
                Finding::analyzed(section_preview, response, assessment)
            }
            Err(e) => {
                tracing::error!("Model call failed for section '{}': {}", section_preview, e);
                Finding::failed(section_preview, e)
            }
        }
    }

    /// One finding per non-empty section, in document order
    pub async fn detect(&self, text: &str, entity_type: &str) -> Vec<Finding> {
        let sections = split_sections(text);
        tracing::info!(
            "Checking {} sections with {} ({})",
            sections.len(),
            self.llm.name(),
            self.llm.model()
        );

        let mut findings = Vec::with_capacity(sections.len());
        for section in sections {
            findings.push(self.analyze_section(section, entity_type).await);
        }
        findings
    }

    /// Parse, classify and review a document on disk
    ///
    /// An empty document yields no findings; parse errors are returned.
    pub async fn detect_file(&self, path: &Path, classifier: &Classifier) -> Result<Vec<Finding>> {
        let parsed = match FileParser::parse_path(path) {
            Ok(parsed) => parsed,
            Err(Error::EmptyDocument(_)) => {
                tracing::warn!("No text extracted from document.");
                return Ok(Vec::new());
            }
            Err(e) => return Err(e),
        };

        let classification = classifier.classify_path(path, &parsed.content).await;
        tracing::info!("Classification: {:?}", classification);
        let label = classification
            .as_ref()
            .map(|c| c.entity_type.as_str())
            .unwrap_or(UNCLASSIFIED_LABEL);

        Ok(self.detect(&parsed.content, label).await)
    }
}

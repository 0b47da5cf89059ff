//! Prompt templates for clause-level compliance review

use crate::types::ReferenceChunk;

/// Prompt builder for compliance judgments
pub struct PromptBuilder;

impl PromptBuilder {
    /// Join retrieved chunk texts into the reference context block
    pub fn build_references(chunks: &[ReferenceChunk]) -> String {
        chunks
            .iter()
            .map(|c| c.text.as_str())
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    /// Build the per-section review prompt
    ///
    /// An empty `references` block is allowed; the model is still asked for a judgment.
    pub fn build_compliance_prompt(entity_type: &str, section: &str, references: &str) -> String {
        format!(
            r#"You are an ADGM corporate compliance checker.
Entity Type: {entity_type}
Document Clause:
"""{section}"""

ADGM Regulations & Guidance (retrieved context):
"""{references}"""

Task:
- Check if this clause fully complies with ADGM rules.
- Flag any compliance risks, missing info, or deviations.
- Mention the relevant ADGM reference title if possible.
- Rate severity as Low/Medium/High.
Respond in JSON with fields: section_summary, issue, reference, severity.
"#,
            entity_type = entity_type,
            section = section,
            references = references
        )
    }
}

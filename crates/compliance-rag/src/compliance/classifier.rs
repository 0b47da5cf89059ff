//! Entity type classification
//!
//! Keyword rules are tried first, in declaration order; the first rule whose
//! phrases all occur in `"{filename} {text}"` (lower-cased) wins. Otherwise the
//! closest reference chunk's category is used.

use serde::Serialize;
use std::path::Path;

use crate::config::{ClassifierConfig, EntityRule};
use crate::retrieval::Retriever;
use crate::types::EntityType;

/// How a classification was reached
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ClassificationMethod {
    Keyword,
    Embedding,
}

/// Classifier output
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Classification {
    pub entity_type: EntityType,
    pub method: ClassificationMethod,
    /// `checklists_docs` / `templates` for keyword matches, `unknown` otherwise
    pub document_category: String,
}

/// Keyword-then-embedding classifier
pub struct Classifier {
    rules: Vec<EntityRule>,
    retriever: Option<Retriever>,
}

impl Classifier {
    /// Create a classifier; without a retriever there is no embedding fallback
    pub fn new(config: &ClassifierConfig, retriever: Option<Retriever>) -> Self {
        let rules = config
            .rules
            .iter()
            .map(|rule| EntityRule {
                entity: rule.entity.clone(),
                keywords: rule.keywords.iter().map(|k| k.to_lowercase()).collect(),
            })
            .collect();
        Self { rules, retriever }
    }

    /// First rule whose keywords all appear in the filename or text
    pub fn classify_by_keywords(&self, text: &str, filename: &str) -> Option<EntityType> {
        let combined = format!("{} {}", filename.to_lowercase(), text.to_lowercase());
        self.rules
            .iter()
            .find(|rule| rule.keywords.iter().all(|k| combined.contains(k.as_str())))
            .map(|rule| rule.entity.clone())
    }

    /// Category of the nearest reference chunk; backend failures count as no match
    pub async fn classify_by_embeddings(&self, text: &str) -> Option<EntityType> {
        let retriever = self.retriever.as_ref()?;
        match retriever.search(text, 1).await {
            Ok(results) => results
                .into_iter()
                .next()
                .map(|r| r.chunk.category)
                .filter(|category| !category.is_empty())
                .map(EntityType::from),
            Err(e) => {
                tracing::error!("Embedding-based classification failed: {}", e);
                None
            }
        }
    }

    /// Classify a document given its extracted text and file stem
    pub async fn classify(&self, text: &str, filename: &str) -> Option<Classification> {
        tracing::info!("Classifying document: {}", filename);

        if let Some(entity_type) = self.classify_by_keywords(text, filename) {
            tracing::info!("Matched entity via keywords: {}", entity_type);
            let document_category = if filename.to_lowercase().contains("checklist") {
                "checklists_docs"
            } else {
                "templates"
            };
            return Some(Classification {
                entity_type,
                method: ClassificationMethod::Keyword,
                document_category: document_category.to_string(),
            });
        }

        if let Some(entity_type) = self.classify_by_embeddings(text).await {
            tracing::info!("Matched entity via embeddings: {}", entity_type);
            return Some(Classification {
                entity_type,
                method: ClassificationMethod::Embedding,
                document_category: "unknown".to_string(),
            });
        }

        tracing::warn!("No classification match found for {}", filename);
        None
    }

    /// Classify using the file stem of `path`
    pub async fn classify_path(&self, path: &Path, text: &str) -> Option<Classification> {
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();
        self.classify(text, &stem).await
    }
}

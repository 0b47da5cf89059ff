//! Configuration for the compliance checker

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::types::EntityType;

/// Main compliance checker configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ComplianceConfig {
    /// Filesystem locations
    pub paths: PathsConfig,
    /// Embedding configuration
    pub embeddings: EmbeddingConfig,
    /// Chunking configuration
    pub chunking: ChunkingConfig,
    /// Retrieval configuration
    pub retrieval: RetrievalConfig,
    /// Gemini/Ollama configuration
    pub llm: LlmConfig,
    /// Annotation configuration
    pub annotation: AnnotationConfig,
    /// Keyword rules for entity classification
    pub classifier: ClassifierConfig,
}

impl ComplianceConfig {
    /// Load configuration from a TOML file, falling back to defaults for missing fields
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read config {}: {}", path.display(), e))
        })?;
        let config: Self = toml::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `path` if given, otherwise use defaults
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => {
                let config = Self::default();
                config.validate()?;
                Ok(config)
            }
        }
    }

    /// Reject settings that cannot produce a working pipeline
    pub fn validate(&self) -> Result<()> {
        if self.chunking.chunk_size == 0 {
            return Err(Error::Config("chunk_size must be greater than zero".into()));
        }
        if self.chunking.chunk_overlap >= self.chunking.chunk_size {
            return Err(Error::Config(format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                self.chunking.chunk_overlap, self.chunking.chunk_size
            )));
        }
        if self.retrieval.top_k == 0 {
            return Err(Error::Config("retrieval top_k must be at least 1".into()));
        }
        if !(0.0..=1.0).contains(&self.annotation.similarity_threshold) {
            return Err(Error::Config(format!(
                "similarity_threshold must be within [0, 1], got {}",
                self.annotation.similarity_threshold
            )));
        }
        if self.llm.provider == LlmBackend::Ollama && self.llm.model.starts_with("gemini") {
            return Err(Error::Config(format!(
                "llm.model '{}' is a Gemini model; set an Ollama model for provider = \"ollama\"",
                self.llm.model
            )));
        }
        if self.classifier.rules.iter().any(|r| r.keywords.is_empty()) {
            return Err(Error::Config("every classifier rule needs at least one keyword".into()));
        }
        Ok(())
    }
}

/// Filesystem locations used by the loader, corpus builder and verifier
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Raw reference documents, one subfolder per category
    pub raw_docs_dir: PathBuf,
    /// Extracted reference texts named `{category}_{stem}.txt`
    pub processed_texts_dir: PathBuf,
    /// Persisted vector index directory
    pub index_dir: PathBuf,
    /// Checklist JSON (entity type -> required document names)
    pub checklist_file: PathBuf,
    /// Combined JSON report
    pub report_file: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            raw_docs_dir: PathBuf::from("data/adgm_reference_docs"),
            processed_texts_dir: PathBuf::from("data/processed_texts"),
            index_dir: PathBuf::from("data/embeddings"),
            checklist_file: PathBuf::from("configs/checklist.json"),
            report_file: PathBuf::from("final_compliance_report.json"),
        }
    }
}

/// Embedding configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Ollama base URL
    pub base_url: String,
    /// Embedding model identifier
    pub model: String,
    /// Embedding dimensions (384 for MiniLM)
    pub dimensions: usize,
    /// Batch size for corpus indexing
    pub batch_size: usize,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".to_string(),
            model: "all-minilm".to_string(),
            dimensions: 384,
            batch_size: 32,
            timeout_secs: 60,
        }
    }
}

/// Text chunking configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Maximum chunk size in characters
    pub chunk_size: usize,
    /// Overlap between consecutive chunks in characters
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 800,
            chunk_overlap: 100,
        }
    }
}

/// Retrieval configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Number of reference chunks retrieved per section
    pub top_k: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self { top_k: 5 }
    }
}

/// Which backend answers compliance prompts
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LlmBackend {
    /// Google Gemini (Generative Language API)
    #[default]
    Gemini,
    /// Local Ollama server
    Ollama,
}

impl LlmBackend {
    /// Endpoint used when `llm.base_url` is not set
    pub fn default_base_url(&self) -> &'static str {
        match self {
            Self::Gemini => "https://generativelanguage.googleapis.com",
            Self::Ollama => "http://localhost:11434",
        }
    }
}

/// LLM configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Backend provider
    pub provider: LlmBackend,
    /// Generation model identifier
    pub model: String,
    /// System instruction sent with every prompt
    pub system_prompt: String,
    /// Base URL override; unset means the backend's default endpoint
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// Environment variable holding the Gemini API key
    pub api_key_env: String,
    /// Temperature for generation
    pub temperature: f32,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Number of retries for failed requests (0 = single attempt)
    pub max_retries: u32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: LlmBackend::Gemini,
            model: "gemini-1.5-flash".to_string(),
            system_prompt: "You are an ADGM corporate compliance expert.".to_string(),
            base_url: None,
            api_key_env: "GEMINI_API_KEY".to_string(),
            temperature: 0.2,
            timeout_secs: 120,
            max_retries: 0,
        }
    }
}

impl LlmConfig {
    /// Configured base URL, or the provider's default
    pub fn base_url(&self) -> &str {
        self.base_url
            .as_deref()
            .unwrap_or_else(|| self.provider.default_base_url())
    }
}

/// Annotation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnnotationConfig {
    /// A finding is attached only when the best paragraph scores above this
    pub similarity_threshold: f64,
    /// Characters of section text kept as the finding preview
    pub preview_chars: usize,
}

impl Default for AnnotationConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: 0.3,
            preview_chars: 80,
        }
    }
}

/// Keyword rule: every keyword must occur for the entity to match
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EntityRule {
    /// Entity type assigned on match
    pub entity: EntityType,
    /// Lower-case phrases that must all be present
    pub keywords: Vec<String>,
}

impl EntityRule {
    fn new(entity: EntityType, keywords: &[&str]) -> Self {
        Self {
            entity,
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
        }
    }
}

/// Classifier configuration; rules are tried in declaration order
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    pub rules: Vec<EntityRule>,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            rules: vec![
                EntityRule::new(
                    EntityType::PrivateCompanyLimitedBySharesNonFinancial,
                    &["private company limited by shares", "non-financial"],
                ),
                EntityRule::new(
                    EntityType::PrivateCompanyLimitedByGuaranteeNonFinancial,
                    &["private company limited by guarantee", "non-financial"],
                ),
                EntityRule::new(
                    EntityType::PrivateCompanyLimitedBySharesFinancial,
                    &["private company limited by shares", "financial services"],
                ),
                EntityRule::new(
                    EntityType::SpvContinuance,
                    &["continuance spv", "special purpose vehicle"],
                ),
                EntityRule::new(
                    EntityType::BranchFinancialNonFinancial,
                    &["branch", "financial services", "non-financial services"],
                ),
                EntityRule::new(
                    EntityType::LlpFinancialNonFinancial,
                    &["limited liability partnership", "llp"],
                ),
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_reference_settings() {
        let config = ComplianceConfig::default();
        assert_eq!(config.chunking.chunk_size, 800);
        assert_eq!(config.chunking.chunk_overlap, 100);
        assert_eq!(config.retrieval.top_k, 5);
        assert_eq!(config.annotation.similarity_threshold, 0.3);
        assert_eq!(config.llm.model, "gemini-1.5-flash");
        assert_eq!(config.classifier.rules.len(), 6);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: ComplianceConfig = toml::from_str(
            r#"
            [retrieval]
            top_k = 3

            [llm]
            provider = "ollama"
            model = "llama3.2:3b"
            base_url = "http://localhost:11434"
            "#,
        )
        .unwrap();

        assert_eq!(config.retrieval.top_k, 3);
        assert_eq!(config.llm.provider, LlmBackend::Ollama);
        assert_eq!(config.llm.base_url(), "http://localhost:11434");
        assert_eq!(config.chunking.chunk_size, 800);
        assert_eq!(config.classifier.rules.len(), 6);
    }

    #[test]
    fn test_custom_rules_from_toml() {
        let config: ComplianceConfig = toml::from_str(
            r#"
            [[classifier.rules]]
            entity = "SPV_Continuance"
            keywords = ["spv"]
            "#,
        )
        .unwrap();

        assert_eq!(config.classifier.rules.len(), 1);
        assert_eq!(config.classifier.rules[0].entity, EntityType::SpvContinuance);
    }

    #[test]
    fn test_llm_base_url_follows_provider() {
        let config: ComplianceConfig = toml::from_str(
            r#"
            [llm]
            provider = "ollama"
            model = "llama3.2:3b"
            "#,
        )
        .unwrap();
        assert_eq!(config.llm.base_url(), "http://localhost:11434");
        assert!(config.validate().is_ok());

        assert_eq!(
            LlmConfig::default().base_url(),
            "https://generativelanguage.googleapis.com"
        );

        let mut remote = LlmConfig::default();
        remote.provider = LlmBackend::Ollama;
        remote.base_url = Some("http://gpu-box:11434".to_string());
        assert_eq!(remote.base_url(), "http://gpu-box:11434");
    }

    #[test]
    fn test_validate_rejects_gemini_model_on_ollama() {
        let mut config = ComplianceConfig::default();
        config.llm.provider = LlmBackend::Ollama;
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_shipped_sample_config_parses() {
        let config: ComplianceConfig =
            toml::from_str(include_str!("../../../configs/compliance.toml")).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.paths.checklist_file, PathBuf::from("configs/checklist.json"));
        assert_eq!(config.llm.max_retries, 0);
    }

    #[test]
    fn test_validate_rejects_bad_overlap() {
        let mut config = ComplianceConfig::default();
        config.chunking.chunk_overlap = 800;
        assert!(matches!(config.validate(), Err(Error::Config(_))));

        let mut config = ComplianceConfig::default();
        config.retrieval.top_k = 0;
        assert!(config.validate().is_err());

        let mut config = ComplianceConfig::default();
        config.annotation.similarity_threshold = 1.5;
        assert!(config.validate().is_err());
    }
}

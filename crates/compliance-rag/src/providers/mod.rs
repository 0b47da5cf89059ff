//! Provider abstractions for embeddings, LLM and vector storage
//!
//! Trait-based seams let the pipeline switch between Gemini and a local
//! Ollama server, and let tests substitute deterministic fakes.

pub mod embedding;
pub mod gemini;
mod http;
pub mod llm;
pub mod local;
pub mod ollama;
pub mod vector_store;

use std::sync::Arc;

use crate::config::{LlmBackend, LlmConfig};
use crate::error::Result;

pub use embedding::EmbeddingProvider;
pub use gemini::GeminiClient;
pub use llm::LlmProvider;
pub use local::LocalVectorStore;
pub use ollama::{OllamaClient, OllamaEmbedder, OllamaLlm};
pub use vector_store::{VectorSearchResult, VectorStoreProvider};

/// Build the configured LLM backend
pub fn build_llm(config: &LlmConfig) -> Result<Arc<dyn LlmProvider>> {
    let llm: Arc<dyn LlmProvider> = match config.provider {
        LlmBackend::Gemini => Arc::new(GeminiClient::from_config(config)?),
        LlmBackend::Ollama => Arc::new(OllamaLlm::new(config)?),
    };
    tracing::info!("Using LLM provider {} ({})", llm.name(), llm.model());
    Ok(llm)
}

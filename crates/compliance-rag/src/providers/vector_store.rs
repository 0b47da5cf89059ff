//! Vector store provider trait for storing and searching embeddings

use async_trait::async_trait;
use crate::error::Result;
use crate::types::ReferenceChunk;

/// Search result from vector store
#[derive(Debug, Clone)]
pub struct VectorSearchResult {
    /// The matched chunk (without its embedding)
    pub chunk: ReferenceChunk,
    /// Cosine similarity (-1.0 to 1.0, higher is more similar)
    pub similarity: f32,
}

/// Trait for vector storage and similarity search
///
/// Implementations:
/// - `LocalVectorStore`: directory-backed exact search
#[async_trait]
pub trait VectorStoreProvider: Send + Sync {
    /// Insert chunks; every chunk must carry an embedding
    async fn insert_chunks(&self, chunks: Vec<ReferenceChunk>) -> Result<()>;

    /// Search for the `top_k` most similar chunks
    async fn search(&self, query_embedding: &[f32], top_k: usize) -> Result<Vec<VectorSearchResult>>;

    /// Get total number of vectors stored
    async fn len(&self) -> Result<usize>;

    /// Check if store is empty
    async fn is_empty(&self) -> Result<bool> {
        Ok(self.len().await? == 0)
    }

    /// Flush the index to durable storage
    async fn persist(&self) -> Result<()>;

    /// Get provider name for logging
    fn name(&self) -> &str;
}

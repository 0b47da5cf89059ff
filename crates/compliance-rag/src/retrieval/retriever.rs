//! Top-K retrieval of reference chunks

use std::path::Path;
use std::sync::Arc;

use crate::error::Result;
use crate::providers::{EmbeddingProvider, LocalVectorStore, VectorSearchResult, VectorStoreProvider};
use crate::types::ReferenceChunk;

/// Embeds a query and searches the reference index
///
/// No re-ranking, filtering or caching happens here; results come back in the
/// order the vector store ranks them.
#[derive(Clone)]
pub struct Retriever {
    embedder: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn VectorStoreProvider>,
    top_k: usize,
}

impl Retriever {
    /// Create a retriever over an already opened store
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        store: Arc<dyn VectorStoreProvider>,
        top_k: usize,
    ) -> Self {
        Self {
            embedder,
            store,
            top_k,
        }
    }

    /// Open the persisted index at `index_dir`
    ///
    /// Fails with `IndexUnavailable` when the index has not been built.
    pub fn open(index_dir: &Path, embedder: Arc<dyn EmbeddingProvider>, top_k: usize) -> Result<Self> {
        let store = LocalVectorStore::open(index_dir)?;
        if store.embedding_model() != embedder.model() {
            tracing::warn!(
                "Index was built with embedding model '{}' but '{}' is configured",
                store.embedding_model(),
                embedder.model()
            );
        }
        Ok(Self::new(embedder, Arc::new(store), top_k))
    }

    /// Default number of chunks returned by `retrieve`
    pub fn top_k(&self) -> usize {
        self.top_k
    }

    /// Scored top-`k` search
    pub async fn search(&self, query: &str, k: usize) -> Result<Vec<VectorSearchResult>> {
        let embedding = self.embedder.embed(query).await?;
        let results = self.store.search(&embedding, k).await?;
        tracing::debug!("Retrieved {} reference chunks (k={})", results.len(), k);
        Ok(results)
    }

    /// Top-K reference chunks for `query`
    pub async fn retrieve(&self, query: &str) -> Result<Vec<ReferenceChunk>> {
        Ok(self
            .search(query, self.top_k)
            .await?
            .into_iter()
            .map(|r| r.chunk)
            .collect())
    }
}

//! Local directory-backed vector store
//!
//! The whole index lives in `<index_dir>/index.json` and is searched exactly
//! with cosine similarity. Reference corpora are small enough that a linear
//! scan per query is fine.

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::types::ReferenceChunk;

use super::vector_store::{VectorSearchResult, VectorStoreProvider};

const INDEX_FILE: &str = "index.json";

/// On-disk index layout
#[derive(Debug, Clone, Serialize, Deserialize)]
struct IndexData {
    embedding_model: String,
    dimensions: usize,
    chunks: Vec<ReferenceChunk>,
}

/// Cosine similarity; zero-norm vectors score 0
fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

/// Directory-backed vector index
pub struct LocalVectorStore {
    dir: PathBuf,
    data: Arc<RwLock<IndexData>>,
}

impl LocalVectorStore {
    /// Start a new, empty index that will be written to `dir` on `persist`
    pub fn create(dir: impl Into<PathBuf>, embedding_model: impl Into<String>, dimensions: usize) -> Self {
        Self {
            dir: dir.into(),
            data: Arc::new(RwLock::new(IndexData {
                embedding_model: embedding_model.into(),
                dimensions,
                chunks: Vec::new(),
            })),
        }
    }

    /// Open a persisted index; a missing directory or index file is `IndexUnavailable`
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        let path = dir.join(INDEX_FILE);
        if !dir.is_dir() || !path.is_file() {
            return Err(Error::IndexUnavailable(dir));
        }

        let file = std::fs::File::open(&path)?;
        let data: IndexData = serde_json::from_reader(BufReader::new(file))
            .map_err(|e| Error::vector_db(format!("Corrupt index {}: {}", path.display(), e)))?;

        tracing::info!(
            "Loaded reference index from {} ({} chunks, model {})",
            dir.display(),
            data.chunks.len(),
            data.embedding_model
        );

        Ok(Self {
            dir,
            data: Arc::new(RwLock::new(data)),
        })
    }

    /// Embedding model the index was built with
    pub fn embedding_model(&self) -> String {
        self.data.read().embedding_model.clone()
    }

    /// Embedding dimensions
    pub fn dimensions(&self) -> usize {
        self.data.read().dimensions
    }

    fn insert_sync(data: &RwLock<IndexData>, chunks: Vec<ReferenceChunk>) -> Result<()> {
        let mut data = data.write();
        for chunk in &chunks {
            if chunk.embedding.is_empty() {
                return Err(Error::vector_db(format!("Chunk {} has no embedding", chunk.id)));
            }
            if chunk.embedding.len() != data.dimensions {
                return Err(Error::vector_db(format!(
                    "Chunk {} has {} dimensions, index expects {}",
                    chunk.id,
                    chunk.embedding.len(),
                    data.dimensions
                )));
            }
        }
        data.chunks.extend(chunks);
        Ok(())
    }

    fn search_sync(data: &RwLock<IndexData>, query: &[f32], top_k: usize) -> Result<Vec<VectorSearchResult>> {
        let data = data.read();
        if query.len() != data.dimensions {
            return Err(Error::vector_db(format!(
                "Query has {} dimensions, index expects {}",
                query.len(),
                data.dimensions
            )));
        }

        let mut scored: Vec<(usize, f32)> = data
            .chunks
            .iter()
            .enumerate()
            .map(|(i, chunk)| (i, cosine_similarity(query, &chunk.embedding)))
            .collect();

        // Stable sort: equal scores keep insertion order
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        scored.truncate(top_k);

        Ok(scored
            .into_iter()
            .map(|(i, similarity)| VectorSearchResult {
                chunk: data.chunks[i].without_embedding(),
                similarity,
            })
            .collect())
    }

    fn persist_sync(dir: &Path, data: &RwLock<IndexData>) -> Result<()> {
        std::fs::create_dir_all(dir)?;

        let tmp = tempfile::NamedTempFile::new_in(dir)?;
        {
            let mut writer = BufWriter::new(tmp.as_file());
            serde_json::to_writer(&mut writer, &*data.read())?;
            writer.flush()?;
        }
        tmp.persist(dir.join(INDEX_FILE)).map_err(|e| Error::Io(e.error))?;

        tracing::info!("Persisted reference index to {}", dir.display());
        Ok(())
    }
}

#[async_trait]
impl VectorStoreProvider for LocalVectorStore {
    async fn insert_chunks(&self, chunks: Vec<ReferenceChunk>) -> Result<()> {
        let data = Arc::clone(&self.data);
        tokio::task::spawn_blocking(move || Self::insert_sync(&data, chunks))
            .await
            .map_err(|e| Error::Internal(format!("Task join error: {}", e)))?
    }

    async fn search(&self, query_embedding: &[f32], top_k: usize) -> Result<Vec<VectorSearchResult>> {
        let data = Arc::clone(&self.data);
        let query = query_embedding.to_vec();
        tokio::task::spawn_blocking(move || Self::search_sync(&data, &query, top_k))
            .await
            .map_err(|e| Error::Internal(format!("Task join error: {}", e)))?
    }

    async fn len(&self) -> Result<usize> {
        Ok(self.data.read().chunks.len())
    }

    async fn persist(&self) -> Result<()> {
        let data = Arc::clone(&self.data);
        let dir = self.dir.clone();
        tokio::task::spawn_blocking(move || Self::persist_sync(&dir, &data))
            .await
            .map_err(|e| Error::Internal(format!("Task join error: {}", e)))?
    }

    fn name(&self) -> &str {
        "local-exact"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(text: &str, category: &str, embedding: Vec<f32>) -> ReferenceChunk {
        ReferenceChunk::new(text, format!("{}_doc", category), category).with_embedding(embedding)
    }

    #[test]
    fn test_cosine_similarity() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-6);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-6);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
    }

    #[tokio::test]
    async fn test_search_orders_by_similarity() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalVectorStore::create(dir.path(), "test-model", 2);
        store
            .insert_chunks(vec![
                chunk("far", "policies", vec![0.0, 1.0]),
                chunk("near", "templates", vec![1.0, 0.1]),
                chunk("middle", "guidance", vec![1.0, 1.0]),
            ])
            .await
            .unwrap();

        let results = store.search(&[1.0, 0.0], 2).await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].chunk.text, "near");
        assert_eq!(results[1].chunk.text, "middle");
        assert!(results[0].chunk.embedding.is_empty());
    }

    #[tokio::test]
    async fn test_ties_keep_insertion_order() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalVectorStore::create(dir.path(), "test-model", 2);
        store
            .insert_chunks(vec![
                chunk("first", "a", vec![1.0, 0.0]),
                chunk("second", "b", vec![2.0, 0.0]),
            ])
            .await
            .unwrap();

        let results = store.search(&[1.0, 0.0], 1).await.unwrap();
        assert_eq!(results[0].chunk.text, "first");
    }

    #[tokio::test]
    async fn test_persist_and_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let index_dir = dir.path().join("embeddings");
        let store = LocalVectorStore::create(&index_dir, "all-minilm", 3);
        store
            .insert_chunks(vec![chunk("Model articles", "templates", vec![0.1, 0.2, 0.3])])
            .await
            .unwrap();
        store.persist().await.unwrap();

        let reopened = LocalVectorStore::open(&index_dir).unwrap();
        assert_eq!(reopened.len().await.unwrap(), 1);
        assert_eq!(reopened.embedding_model(), "all-minilm");
        assert_eq!(reopened.dimensions(), 3);

        let results = reopened.search(&[0.1, 0.2, 0.3], 5).await.unwrap();
        assert_eq!(results[0].chunk.category, "templates");
    }

    #[test]
    fn test_open_missing_index_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        assert!(matches!(LocalVectorStore::open(&missing), Err(Error::IndexUnavailable(_))));

        // Directory without index file
        assert!(matches!(LocalVectorStore::open(dir.path()), Err(Error::IndexUnavailable(_))));
    }

    #[tokio::test]
    async fn test_rejects_dimension_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalVectorStore::create(dir.path(), "test-model", 2);

        let err = store
            .insert_chunks(vec![chunk("bad", "a", vec![1.0, 0.0, 0.0])])
            .await
            .unwrap_err();
        assert!(matches!(err, Error::VectorDb(_)));

        let err = store
            .insert_chunks(vec![ReferenceChunk::new("no embedding", "a_doc", "a")])
            .await
            .unwrap_err();
        assert!(matches!(err, Error::VectorDb(_)));

        assert!(store.search(&[1.0], 1).await.is_err());
    }
}

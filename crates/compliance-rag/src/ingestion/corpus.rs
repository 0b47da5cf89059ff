//! Reference corpus builder: processed texts -> chunked, embedded index

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::ChunkingConfig;
use crate::error::{Error, Result};
use crate::providers::{EmbeddingProvider, LocalVectorStore, VectorStoreProvider};
use crate::types::ReferenceChunk;

use super::chunker::TextChunker;
use super::loader::CategoryManifest;

/// Counts reported after an index build
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CorpusStats {
    pub files: usize,
    pub chunks: usize,
}

/// Stem prefix before the first `_`, for processed texts the loader did not record
fn fallback_category(stem: &str) -> &str {
    stem.split('_').next().unwrap_or(stem)
}

/// Processed `*.txt` files in `dir`, sorted by name
pub fn processed_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && path.extension().is_some_and(|ext| ext == "txt"))
        .collect();
    files.sort();
    Ok(files)
}

/// Builds the persisted reference index
pub struct CorpusBuilder {
    embedder: Arc<dyn EmbeddingProvider>,
    chunker: TextChunker,
    batch_size: usize,
}

impl CorpusBuilder {
    /// Create a builder
    pub fn new(embedder: Arc<dyn EmbeddingProvider>, chunking: &ChunkingConfig, batch_size: usize) -> Self {
        Self {
            embedder,
            chunker: TextChunker::new(chunking.chunk_size, chunking.chunk_overlap),
            batch_size: batch_size.max(1),
        }
    }

    /// Chunk every processed text, tagging chunks with source stem and category
    pub fn collect_chunks(&self, processed_dir: &Path) -> Result<(usize, Vec<ReferenceChunk>)> {
        if !processed_dir.is_dir() {
            return Err(Error::Config(format!(
                "Processed texts directory not found: {}",
                processed_dir.display()
            )));
        }

        let files = processed_files(processed_dir)?;
        let manifest = CategoryManifest::load(processed_dir)?;
        let mut chunks = Vec::new();

        for path in &files {
            let stem = path
                .file_stem()
                .map(|s| s.to_string_lossy().to_string())
                .unwrap_or_default();
            let category = match manifest.category(&stem) {
                Some(category) => category.to_string(),
                None => {
                    tracing::warn!("{} is not in the category manifest, using its name prefix", stem);
                    fallback_category(&stem).to_string()
                }
            };
            let content = std::fs::read_to_string(path)?;

            let pieces = self.chunker.split(&content);
            tracing::debug!("{}: {} chunks (category {})", stem, pieces.len(), category);

            chunks.extend(
                pieces
                    .into_iter()
                    .map(|text| ReferenceChunk::new(text, stem.clone(), category.clone())),
            );
        }

        Ok((files.len(), chunks))
    }

    /// Embed all chunks in batches and persist a fresh index at `index_dir`
    ///
    /// `progress` is called with `(embedded, total)` after every batch.
    pub async fn build<F>(&self, processed_dir: &Path, index_dir: &Path, progress: F) -> Result<CorpusStats>
    where
        F: Fn(usize, usize),
    {
        let (files, chunks) = self.collect_chunks(processed_dir)?;
        if chunks.is_empty() {
            return Err(Error::vector_db(format!(
                "No reference text found in {}",
                processed_dir.display()
            )));
        }

        tracing::info!(
            "Embedding {} chunks from {} files with {}",
            chunks.len(),
            files,
            self.embedder.model()
        );

        let store = LocalVectorStore::create(index_dir, self.embedder.model(), self.embedder.dimensions());
        let total = chunks.len();
        let mut done = 0;

        let mut remaining = chunks.into_iter().peekable();
        while remaining.peek().is_some() {
            let batch: Vec<ReferenceChunk> = remaining.by_ref().take(self.batch_size).collect();
            let texts: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();
            let embeddings = self.embedder.embed_batch(&texts).await?;

            if embeddings.len() != batch.len() {
                return Err(Error::embedding(format!(
                    "Expected {} embeddings, got {}",
                    batch.len(),
                    embeddings.len()
                )));
            }

            let embedded: Vec<ReferenceChunk> = batch
                .into_iter()
                .zip(embeddings)
                .map(|(chunk, embedding)| chunk.with_embedding(embedding))
                .collect();
            done += embedded.len();
            store.insert_chunks(embedded).await?;
            progress(done, total);
        }

        store.persist().await?;
        tracing::info!("Vector index created with {} chunks at {}", total, index_dir.display());

        Ok(CorpusStats { files, chunks: total })
    }
}

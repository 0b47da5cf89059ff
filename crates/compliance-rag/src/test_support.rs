//! Deterministic fakes and fixtures shared by unit tests

use async_trait::async_trait;
use parking_lot::Mutex;
use std::path::Path;

use crate::error::{Error, Result};
use crate::providers::{EmbeddingProvider, LlmProvider, LocalVectorStore, VectorStoreProvider};
use crate::types::ReferenceChunk;

/// Write a minimal DOCX with one paragraph per entry
pub(crate) fn write_docx(path: &Path, paragraphs: &[&str]) {
    use docx_rs::{Docx, Paragraph, Run};

    let mut docx = Docx::new();
    for text in paragraphs {
        docx = docx.add_paragraph(Paragraph::new().add_run(Run::new().add_text(*text)));
    }
    let file = std::fs::File::create(path).unwrap();
    docx.build().pack(file).unwrap();
}

/// Write a one-page PDF in Courier 12pt, one line per entry, 72pt apart
pub(crate) fn write_pdf(path: &Path, lines: &[&str]) {
    use lopdf::content::{Content, Operation};
    use lopdf::{dictionary, Document, Object, Stream};

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
    });

    let mut operations = Vec::new();
    for (i, line) in lines.iter().enumerate() {
        let y = 720 - 72 * i as i64;
        operations.push(Operation::new("BT", vec![]));
        operations.push(Operation::new("Tf", vec!["F1".into(), 12.into()]));
        operations.push(Operation::new("Td", vec![72.into(), y.into()]));
        operations.push(Operation::new("Tj", vec![Object::string_literal(*line)]));
        operations.push(Operation::new("ET", vec![]));
    }
    let content = Content { operations };
    let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));

    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
    });
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
            "Resources" => dictionary! {
                "Font" => dictionary! { "F1" => font_id },
            },
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.save(path).unwrap();
}

/// Bag-of-words embedder: each lower-cased word bumps one FNV-hashed bucket
pub(crate) struct HashEmbedder {
    dims: usize,
    fail: bool,
}

impl HashEmbedder {
    pub(crate) fn new(dims: usize) -> Self {
        Self { dims, fail: false }
    }

    pub(crate) fn failing(dims: usize) -> Self {
        Self { dims, fail: true }
    }

    fn bucket(&self, word: &str) -> usize {
        let mut hash: u64 = 0xcbf29ce484222325;
        for byte in word.bytes() {
            hash ^= u64::from(byte);
            hash = hash.wrapping_mul(0x100000001b3);
        }
        (hash % self.dims as u64) as usize
    }
}

#[async_trait]
impl EmbeddingProvider for HashEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        if self.fail {
            return Err(Error::embedding("embedding backend unavailable"));
        }
        let mut vector = vec![0.0f32; self.dims];
        for word in text
            .to_lowercase()
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
        {
            vector[self.bucket(word)] += 1.0;
        }
        Ok(vector)
    }

    fn dimensions(&self) -> usize {
        self.dims
    }

    fn model(&self) -> &str {
        "hash-bow"
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(!self.fail)
    }

    fn name(&self) -> &str {
        "hash"
    }
}

/// LLM fake that returns a canned reply and records every prompt
pub(crate) struct ScriptedLlm {
    reply: Option<String>,
    fail_when: Option<String>,
    pub(crate) prompts: Mutex<Vec<String>>,
}

impl ScriptedLlm {
    /// Always answer `reply`
    pub(crate) fn replying(reply: &str) -> Self {
        Self {
            reply: Some(reply.to_string()),
            fail_when: None,
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Answer `reply`, except for prompts containing `needle`
    pub(crate) fn failing_when(reply: &str, needle: &str) -> Self {
        Self {
            reply: Some(reply.to_string()),
            fail_when: Some(needle.to_string()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn calls(&self) -> usize {
        self.prompts.lock().len()
    }
}

#[async_trait]
impl LlmProvider for ScriptedLlm {
    async fn complete(&self, prompt: &str) -> Result<String> {
        self.prompts.lock().push(prompt.to_string());
        if let Some(needle) = &self.fail_when {
            if prompt.contains(needle.as_str()) {
                return Err(Error::llm("model timed out"));
            }
        }
        self.reply
            .clone()
            .ok_or_else(|| Error::llm("model unavailable"))
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(self.reply.is_some())
    }

    fn name(&self) -> &str {
        "scripted"
    }

    fn model(&self) -> &str {
        "scripted-model"
    }
}

/// Build and persist an index at `dir` from `(text, source, category)` triples
pub(crate) async fn build_index(
    dir: &Path,
    embedder: &dyn EmbeddingProvider,
    docs: &[(&str, &str, &str)],
) -> LocalVectorStore {
    let store = LocalVectorStore::create(dir, embedder.model(), embedder.dimensions());
    let mut chunks = Vec::new();
    for (text, source, category) in docs {
        let embedding = embedder.embed(text).await.unwrap();
        chunks.push(ReferenceChunk::new(*text, *source, *category).with_embedding(embedding));
    }
    store.insert_chunks(chunks).await.unwrap();
    store.persist().await.unwrap();
    store
}

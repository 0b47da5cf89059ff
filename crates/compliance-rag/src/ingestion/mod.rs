//! Document ingestion: parsing, chunking and reference corpus construction

mod chunker;
pub mod corpus;
pub mod loader;
mod parser;

pub use chunker::TextChunker;
pub use corpus::{CorpusBuilder, CorpusStats};
pub use loader::{CategoryManifest, LoadSummary, ReferenceLoader};
pub use parser::FileParser;

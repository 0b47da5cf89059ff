//! Nearest-neighbour retrieval over the reference index

mod retriever;

pub use retriever::Retriever;

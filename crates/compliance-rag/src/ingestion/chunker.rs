//! Recursive character text splitter
//!
//! Splits on the first separator in `["\n\n", "\n", " ", ""]` that occurs in
//! the text, recursing into pieces that are still too large, then greedily
//! merges pieces back up to `chunk_size` characters with `overlap` characters
//! carried into the next chunk. Separators stay attached to the start of the
//! piece that follows them.

use unicode_segmentation::UnicodeSegmentation;

const SEPARATORS: [&str; 4] = ["\n\n", "\n", " ", ""];

fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// Text chunker with configurable size and overlap
pub struct TextChunker {
    /// Maximum chunk size in characters
    chunk_size: usize,
    /// Overlap between chunks in characters
    overlap: usize,
}

impl TextChunker {
    /// Create a new chunker
    pub fn new(chunk_size: usize, overlap: usize) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
            overlap: overlap.min(chunk_size.saturating_sub(1)),
        }
    }

    /// Split text into trimmed, non-empty chunks
    pub fn split(&self, text: &str) -> Vec<String> {
        self.split_recursive(text, &SEPARATORS)
            .into_iter()
            .filter(|c| !c.is_empty())
            .collect()
    }

    fn split_recursive(&self, text: &str, separators: &[&str]) -> Vec<String> {
        let mut separator = separators.last().copied().unwrap_or("");
        let mut remaining: &[&str] = &[];

        for (i, candidate) in separators.iter().enumerate() {
            if candidate.is_empty() {
                separator = candidate;
                break;
            }
            if text.contains(candidate) {
                separator = candidate;
                remaining = &separators[i + 1..];
                break;
            }
        }

        let mut chunks = Vec::new();
        let mut good_splits: Vec<String> = Vec::new();

        for piece in split_keeping_separator(text, separator) {
            if char_len(&piece) < self.chunk_size {
                good_splits.push(piece);
                continue;
            }

            if !good_splits.is_empty() {
                chunks.extend(self.merge_splits(&good_splits));
                good_splits.clear();
            }

            if remaining.is_empty() {
                chunks.push(piece);
            } else {
                chunks.extend(self.split_recursive(&piece, remaining));
            }
        }

        if !good_splits.is_empty() {
            chunks.extend(self.merge_splits(&good_splits));
        }

        chunks
    }

    /// Greedily merge pieces into chunks, keeping a tail of at most `overlap`
    /// characters as the start of the next chunk.
    fn merge_splits(&self, splits: &[String]) -> Vec<String> {
        let mut docs = Vec::new();
        let mut current: Vec<&str> = Vec::new();
        let mut total = 0usize;
        let mut head = 0usize;

        for piece in splits {
            let len = char_len(piece);

            if total + len > self.chunk_size && head < current.len() {
                let doc = current[head..].concat();
                let doc = doc.trim();
                if !doc.is_empty() {
                    docs.push(doc.to_string());
                }

                while head < current.len()
                    && (total > self.overlap || (total + len > self.chunk_size && total > 0))
                {
                    total -= char_len(current[head]);
                    head += 1;
                }
            }

            current.push(piece);
            total += len;
        }

        let doc = current[head..].concat();
        let doc = doc.trim();
        if !doc.is_empty() {
            docs.push(doc.to_string());
        }

        docs
    }
}

/// Split on `separator`, attaching it to the start of each following piece.
/// An empty separator splits into grapheme clusters.
fn split_keeping_separator(text: &str, separator: &str) -> Vec<String> {
    if separator.is_empty() {
        return text.graphemes(true).map(str::to_string).collect();
    }

    let mut pieces = Vec::new();
    for (i, part) in text.split(separator).enumerate() {
        let piece = if i == 0 {
            part.to_string()
        } else {
            format!("{}{}", separator, part)
        };
        if !piece.is_empty() {
            pieces.push(piece);
        }
    }
    pieces
}

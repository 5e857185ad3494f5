//! Text splitting for index building and for numbered citation sources.
//!
//! This module provides the [`Chunker`] trait and two implementations:
//!
//! - [`FixedSizeChunker`] - splits by character count with configurable overlap
//! - [`RecursiveChunker`] - splits hierarchically by paragraphs, sentences, then words
//!
//! All sizes are counted in characters and every split lands on a UTF-8
//! character boundary.

use crate::document::{Chunk, Document};

/// Separators tried in order by the recursive splitter.
const SEPARATORS: [&str; 5] = ["\n\n", ". ", "! ", "? ", " "];

/// A strategy for splitting documents into chunks.
///
/// Implementations produce [`Chunk`]s with text and metadata but no embeddings.
/// Embeddings are attached later by the [`IndexBuilder`](crate::IndexBuilder).
pub trait Chunker: Send + Sync {
    /// Split a document into chunks.
    ///
    /// Returns an empty `Vec` if the document has empty text.
    /// Each returned chunk has an empty embedding vector.
    fn chunk(&self, document: &Document) -> Vec<Chunk>;
}

/// Splits text into fixed-size chunks by character count with configurable overlap.
///
/// Chunk IDs are generated as `{document_id}_{chunk_index}`. Each chunk inherits
/// the parent document's metadata plus a `chunk_index` field.
#[derive(Debug, Clone)]
pub struct FixedSizeChunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl FixedSizeChunker {
    /// Create a new `FixedSizeChunker`.
    ///
    /// # Arguments
    ///
    /// * `chunk_size` - maximum number of characters per chunk
    /// * `chunk_overlap` - number of overlapping characters between consecutive chunks
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        Self { chunk_size, chunk_overlap }
    }
}

impl Chunker for FixedSizeChunker {
    fn chunk(&self, document: &Document) -> Vec<Chunk> {
        to_chunks(document, split_by_size(&document.text, self.chunk_size, self.chunk_overlap))
    }
}

/// Splits text hierarchically: paragraphs → sentences → words.
///
/// First splits by paragraph separators (`\n\n`). If a paragraph exceeds
/// `chunk_size`, splits by sentence boundaries (`. `, `! `, `? `). If a
/// sentence still exceeds `chunk_size`, splits by word boundaries, and
/// finally by characters with overlap.
#[derive(Debug, Clone)]
pub struct RecursiveChunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl RecursiveChunker {
    /// Create a new `RecursiveChunker`.
    ///
    /// # Arguments
    ///
    /// * `chunk_size` - maximum number of characters per chunk
    /// * `chunk_overlap` - number of overlapping characters between consecutive chunks
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        Self { chunk_size, chunk_overlap }
    }
}

impl Chunker for RecursiveChunker {
    fn chunk(&self, document: &Document) -> Vec<Chunk> {
        to_chunks(document, split_text(&document.text, self.chunk_size, self.chunk_overlap))
    }
}

fn to_chunks(document: &Document, texts: Vec<String>) -> Vec<Chunk> {
    texts
        .into_iter()
        .filter(|text| !text.trim().is_empty())
        .enumerate()
        .map(|(i, text)| {
            let mut metadata = document.metadata.clone();
            metadata.insert("chunk_index".to_string(), i.to_string());
            Chunk {
                id: format!("{}_{i}", document.id),
                text,
                embedding: Vec::new(),
                metadata,
                document_id: document.id.clone(),
            }
        })
        .collect()
}

/// Split text recursively so that no piece exceeds `chunk_size` characters.
pub fn split_text(text: &str, chunk_size: usize, chunk_overlap: usize) -> Vec<String> {
    if text.is_empty() || chunk_size == 0 {
        return Vec::new();
    }
    split_and_merge(text, chunk_size, chunk_overlap, &SEPARATORS)
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// Split text by a separator, then merge segments into chunks that respect
/// `chunk_size`. If a segment exceeds `chunk_size`, it is split further
/// using the next-level separator.
fn split_and_merge(
    text: &str,
    chunk_size: usize,
    chunk_overlap: usize,
    separators: &[&str],
) -> Vec<String> {
    if char_len(text) <= chunk_size || separators.is_empty() {
        return split_by_size(text, chunk_size, chunk_overlap);
    }

    let separator = separators[0];
    let remaining_separators = &separators[1..];
    let segments = split_keeping_separator(text, separator);

    let mut chunks = Vec::new();
    let mut current = String::new();

    let flush = |current: &mut String, chunks: &mut Vec<String>| {
        if current.is_empty() {
            return;
        }
        if char_len(current) > chunk_size {
            chunks.extend(split_and_merge(
                current,
                chunk_size,
                chunk_overlap,
                remaining_separators,
            ));
        } else {
            chunks.push(std::mem::take(current));
        }
        current.clear();
    };

    for segment in segments {
        if current.is_empty() || char_len(&current) + char_len(segment) <= chunk_size {
            current.push_str(segment);
        } else {
            flush(&mut current, &mut chunks);
            current.push_str(segment);
        }
    }
    flush(&mut current, &mut chunks);

    chunks
}

/// Split text at a separator while keeping the separator attached to the preceding segment.
fn split_keeping_separator<'a>(text: &'a str, separator: &str) -> Vec<&'a str> {
    let mut result = Vec::new();
    let mut start = 0;

    while let Some(pos) = text[start..].find(separator) {
        let end = start + pos + separator.len();
        result.push(&text[start..end]);
        start = end;
    }

    if start < text.len() {
        result.push(&text[start..]);
    }

    result
}

/// Character-based splitting with overlap.
fn split_by_size(text: &str, chunk_size: usize, chunk_overlap: usize) -> Vec<String> {
    if text.is_empty() || chunk_size == 0 {
        return Vec::new();
    }

    // Byte offset of every char, plus the end of the string.
    let offsets: Vec<usize> =
        text.char_indices().map(|(i, _)| i).chain(std::iter::once(text.len())).collect();
    let char_count = offsets.len() - 1;
    let step = chunk_size.saturating_sub(chunk_overlap);

    let mut chunks = Vec::new();
    let mut start = 0;
    while start < char_count {
        let end = (start + chunk_size).min(char_count);
        chunks.push(text[offsets[start]..offsets[end]].to_string());
        if end == char_count || step == 0 {
            break;
        }
        start += step;
    }

    chunks
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Metadata;

    fn document(text: &str) -> Document {
        Document {
            id: "case".to_string(),
            text: text.to_string(),
            metadata: Metadata::from([("case_number".to_string(), "7/2001".to_string())]),
        }
    }

    #[test]
    fn fixed_size_chunks_overlap() {
        let chunks = FixedSizeChunker::new(4, 1).chunk(&document("abcdefghij"));
        let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, ["abcd", "defg", "ghij"]);
        assert_eq!(chunks[2].id, "case_2");
        assert_eq!(chunks[2].metadata["case_number"], "7/2001");
        assert_eq!(chunks[2].metadata["chunk_index"], "2");
    }

    #[test]
    fn splits_on_char_boundaries() {
        let pieces = split_text("§§§§§ ₹₹₹₹₹", 3, 0);
        assert!(pieces.iter().all(|p| p.chars().count() <= 3));
        assert_eq!(pieces.concat(), "§§§§§ ₹₹₹₹₹");
    }

    #[test]
    fn recursive_prefers_sentence_boundaries() {
        let text = "The insurer denied the claim. The tribunal reversed. Costs were awarded.";
        let pieces = split_text(text, 32, 0);
        assert_eq!(pieces[0], "The insurer denied the claim. ");
        assert!(pieces.iter().all(|p| p.chars().count() <= 32));
    }

    #[test]
    fn empty_text_produces_no_chunks() {
        assert!(RecursiveChunker::new(10, 2).chunk(&document("")).is_empty());
    }
}

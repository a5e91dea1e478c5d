//! Document chunking
//!
//! Splits Markdown into bounded chunks before free-text extraction.

use text_splitter::{ChunkConfig, MarkdownSplitter};
use tracing::debug;

/// A chunk of a larger document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextChunk {
    /// The chunk content
    pub content: String,
    /// Index of this chunk in the document
    pub index: usize,
    /// Start byte offset in the original text
    pub start_pos: usize,
}

/// Split Markdown into chunks of at most `chunk_size` characters,
/// preferring heading, paragraph and sentence boundaries
pub fn chunk_markdown(text: &str, chunk_size: usize) -> Vec<TextChunk> {
    if text.trim().is_empty() {
        return Vec::new();
    }

    let splitter = MarkdownSplitter::new(ChunkConfig::new(chunk_size.max(1)));
    let chunks: Vec<TextChunk> = splitter
        .chunk_indices(text)
        .enumerate()
        .map(|(index, (start_pos, content))| TextChunk {
            content: content.to_string(),
            index,
            start_pos,
        })
        .collect();

    debug!(
        input_len = text.len(),
        chunk_count = chunks.len(),
        chunk_size,
        "Document chunked"
    );

    chunks
}

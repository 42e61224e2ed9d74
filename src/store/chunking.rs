//! # Markdown Chunking Module
//!
//! Splits Markdown documents into index-node texts. Documents are first cut at
//! `## ` (H2) section boundaries, then each section is windowed into chunks of
//! roughly `chunk_size` words with `overlap` words of overlap, each chunk
//! tagged with its section heading.
//!
//! Heading boundaries are located with pulldown-cmark rather than a text
//! search, so a literal `## ` inside a fenced code block does not split a
//! section.

use pulldown_cmark::{Event, HeadingLevel, Parser, Tag};
use serde::Serialize;
use tracing::{debug, instrument};

/// Configuration for chunking text
#[derive(Debug, Clone)]
pub struct ChunkOptions {
    /// Target chunk size in words
    pub chunk_size: usize,

    /// Overlap between consecutive chunks in words
    pub overlap: usize,
}

impl Default for ChunkOptions {
    fn default() -> Self {
        Self {
            chunk_size: 1024,
            overlap: 128,
        }
    }
}

/// A chunk of a source document, before embedding
#[derive(Debug, Clone, Serialize)]
pub struct NodeText {
    /// The text of the chunk
    pub text: String,

    /// Position of the chunk within its document
    pub position: usize,

    /// Heading of the section the chunk belongs to
    pub heading: Option<String>,
}

/// Chunk a Markdown document into node texts.
#[instrument(skip(markdown))]
pub fn chunk_markdown(markdown: &str, options: &ChunkOptions) -> Vec<NodeText> {
    let mut chunks = Vec::new();
    let mut position = 0;

    for section in split_sections(markdown) {
        let heading = section_heading(section);
        let words: Vec<&str> = section.split_inclusive([' ', '\n']).collect();

        // Consecutive windows advance by chunk_size - overlap words.
        let step = options.chunk_size.saturating_sub(options.overlap).max(1);
        let mut start = 0;
        while start < words.len() {
            let end = (start + options.chunk_size.max(1)).min(words.len());
            let text: String = words[start..end].concat();
            let text = text.trim().to_string();
            if !text.is_empty() {
                chunks.push(NodeText {
                    text,
                    position,
                    heading: heading.clone(),
                });
                position += 1;
            }
            if end == words.len() {
                break;
            }
            start += step;
        }
    }

    debug!("Created {} chunks", chunks.len());
    chunks
}

/// Split a document into sections at H2 heading boundaries.
///
/// The text before the first H2 forms its own section; a document without H2
/// headings is one section.
fn split_sections(markdown: &str) -> Vec<&str> {
    let mut boundaries = Vec::new();
    for (event, range) in Parser::new(markdown).into_offset_iter() {
        if let Event::Start(Tag::Heading { level, .. }) = event {
            if level == HeadingLevel::H2 {
                boundaries.push(range.start);
            }
        }
    }

    let mut sections = Vec::new();
    let mut prev = 0;
    for boundary in boundaries {
        if boundary > prev {
            sections.push(&markdown[prev..boundary]);
        }
        prev = boundary;
    }
    if prev < markdown.len() {
        sections.push(&markdown[prev..]);
    }
    sections
}

/// The H2 heading line of a section, when it starts with one.
fn section_heading(section: &str) -> Option<String> {
    let first_line = section.lines().next()?;
    first_line
        .strip_prefix("## ")
        .map(|h| h.trim().to_string())
        .filter(|h| !h.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options(chunk_size: usize, overlap: usize) -> ChunkOptions {
        ChunkOptions {
            chunk_size,
            overlap,
        }
    }

    #[test]
    fn test_small_document_is_one_chunk() {
        let chunks = chunk_markdown("just a few words here", &ChunkOptions::default());
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, "just a few words here");
        assert_eq!(chunks[0].position, 0);
        assert!(chunks[0].heading.is_none());
    }

    #[test]
    fn test_empty_document() {
        assert!(chunk_markdown("", &ChunkOptions::default()).is_empty());
        assert!(chunk_markdown("   \n  ", &ChunkOptions::default()).is_empty());
    }

    #[test]
    fn test_splits_at_h2_headings() {
        let doc = "intro text\n\n## First\n\nbody one\n\n## Second\n\nbody two\n";
        let chunks = chunk_markdown(doc, &ChunkOptions::default());
        assert_eq!(chunks.len(), 3);
        assert!(chunks[0].heading.is_none());
        assert_eq!(chunks[1].heading.as_deref(), Some("First"));
        assert!(chunks[1].text.contains("body one"));
        assert_eq!(chunks[2].heading.as_deref(), Some("Second"));
        assert!(chunks[2].text.contains("body two"));
    }

    #[test]
    fn test_heading_marker_in_code_block_does_not_split() {
        let doc = "## Real\n\n```text\n## not a heading\n```\nmore body\n";
        let chunks = chunk_markdown(doc, &ChunkOptions::default());
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].heading.as_deref(), Some("Real"));
        assert!(chunks[0].text.contains("## not a heading"));
    }

    #[test]
    fn test_overlap_windows() {
        // Ten words, windows of four, overlap of two: starts at 0, 2, 4, 6, 8.
        let doc = "w0 w1 w2 w3 w4 w5 w6 w7 w8 w9";
        let chunks = chunk_markdown(doc, &options(4, 2));
        assert_eq!(chunks.len(), 5);
        assert_eq!(chunks[0].text, "w0 w1 w2 w3");
        assert_eq!(chunks[1].text, "w2 w3 w4 w5");
        assert_eq!(chunks[4].text, "w8 w9");
        let positions: Vec<usize> = chunks.iter().map(|c| c.position).collect();
        assert_eq!(positions, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_positions_span_sections() {
        let doc = "## A\n\none\n\n## B\n\ntwo\n";
        let chunks = chunk_markdown(doc, &ChunkOptions::default());
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].position, 0);
        assert_eq!(chunks[1].position, 1);
    }

    #[test]
    fn test_degenerate_overlap_still_advances() {
        // overlap >= chunk_size must not loop forever
        let doc = "a b c d e f";
        let chunks = chunk_markdown(doc, &options(2, 5));
        assert!(chunks.len() >= 3);
    }
}

//! Fixed-size sliding-window text chunker.
//!
//! Splits loaded text blocks into overlapping windows of [`CHUNK_SIZE`]
//! characters, with [`CHUNK_OVERLAP`] characters repeated between
//! consecutive windows. Windows are computed over each block independently
//! and concatenated in block order; each chunk inherits its source block's
//! metadata.
//!
//! Window positions are computed over characters, never bytes, so multibyte
//! input cannot be split inside a code point.
//!
//! # Example
//!
//! A 1500-character block yields two chunks: characters `0..1000` and
//! `800..1500`, so the second chunk's first 200 characters repeat the first
//! chunk's last 200.

use crate::models::{NewChunk, TextBlock};

/// Window length in characters.
pub const CHUNK_SIZE: usize = 1000;

/// Characters repeated between consecutive windows of the same block.
pub const CHUNK_OVERLAP: usize = 200;

/// Split text blocks into chunks, in block order.
///
/// Blocks with no visible text contribute no chunks; an input whose total
/// text is empty produces an empty result (the caller treats that as
/// "no content extracted", not as an error).
pub fn split_blocks(blocks: &[TextBlock]) -> Vec<NewChunk> {
    let mut chunks = Vec::new();
    for block in blocks {
        if block.text.trim().is_empty() {
            continue;
        }
        for window in split_text(&block.text) {
            chunks.push(NewChunk {
                text: window,
                metadata: block.metadata.clone(),
                embedding: None,
            });
        }
    }
    chunks
}

/// Produce the sliding windows for a single block of text.
///
/// Every window is exactly [`CHUNK_SIZE`] characters except possibly the
/// last, and each window after the first starts [`CHUNK_OVERLAP`]
/// characters before its predecessor's end.
pub fn split_text(text: &str) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    if chars.is_empty() {
        return Vec::new();
    }

    let step = CHUNK_SIZE - CHUNK_OVERLAP;
    let mut windows = Vec::new();
    let mut start = 0usize;
    loop {
        let end = (start + CHUNK_SIZE).min(chars.len());
        windows.push(chars[start..end].iter().collect());
        if end == chars.len() {
            break;
        }
        start += step;
    }
    windows
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Map};

    fn block(text: &str) -> TextBlock {
        TextBlock {
            text: text.to_string(),
            metadata: Map::new(),
        }
    }

    fn repeated(len: usize) -> String {
        // Non-repeating enough that overlap checks are meaningful.
        (0..len)
            .map(|i| char::from(b'a' + (i % 23) as u8))
            .collect()
    }

    #[test]
    fn short_text_single_chunk() {
        let windows = split_text("hello world");
        assert_eq!(windows.len(), 1);
        assert_eq!(windows[0], "hello world");
    }

    #[test]
    fn empty_text_no_chunks() {
        assert!(split_text("").is_empty());
        assert!(split_blocks(&[block("")]).is_empty());
        assert!(split_blocks(&[block("   \n\t")]).is_empty());
    }

    #[test]
    fn exact_window_length_single_chunk() {
        let windows = split_text(&repeated(CHUNK_SIZE));
        assert_eq!(windows.len(), 1);
        assert_eq!(windows[0].chars().count(), CHUNK_SIZE);
    }

    #[test]
    fn fifteen_hundred_chars_two_overlapping_chunks() {
        let text = repeated(1500);
        let windows = split_text(&text);
        assert_eq!(windows.len(), 2);
        assert_eq!(windows[0].chars().count(), 1000);
        // The second window starts at 800 and runs to the end.
        assert_eq!(windows[1].chars().count(), 700);

        let tail: String = windows[0].chars().skip(800).collect();
        let head: String = windows[1].chars().take(200).collect();
        assert_eq!(tail, head);
    }

    #[test]
    fn no_window_exceeds_chunk_size() {
        let windows = split_text(&repeated(3473));
        for w in &windows {
            assert!(w.chars().count() <= CHUNK_SIZE);
            assert!(!w.is_empty());
        }
    }

    #[test]
    fn consecutive_windows_share_exact_overlap() {
        let windows = split_text(&repeated(2600));
        for pair in windows.windows(2) {
            let prev: Vec<char> = pair[0].chars().collect();
            let next: Vec<char> = pair[1].chars().collect();
            let tail: String = prev[prev.len() - CHUNK_OVERLAP..].iter().collect();
            let head: String = next[..CHUNK_OVERLAP].iter().collect();
            assert_eq!(tail, head);
        }
    }

    #[test]
    fn multibyte_input_splits_on_char_boundaries() {
        let text: String = "héllø wörld — ∂øcüménts ".repeat(80);
        let windows = split_text(&text);
        assert!(windows.len() > 1);
        let total_new: usize = windows
            .iter()
            .enumerate()
            .map(|(i, w)| {
                let n = w.chars().count();
                if i == 0 {
                    n
                } else {
                    n - CHUNK_OVERLAP
                }
            })
            .sum();
        assert_eq!(total_new, text.chars().count());
    }

    #[test]
    fn blocks_chunked_independently_in_order() {
        let blocks = vec![block(&repeated(1500)), block("tiny")];
        let chunks = split_blocks(&blocks);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[2].text, "tiny");
        // No window spans the block boundary.
        assert!(!chunks[1].text.contains("tiny"));
    }

    #[test]
    fn chunks_inherit_block_metadata() {
        let mut meta = Map::new();
        meta.insert("page".to_string(), json!(3));
        let blocks = vec![TextBlock {
            text: repeated(1200),
            metadata: meta,
        }];
        let chunks = split_blocks(&blocks);
        assert_eq!(chunks.len(), 2);
        for c in &chunks {
            assert_eq!(c.metadata["page"], json!(3));
            assert!(c.embedding.is_none());
        }
    }
}

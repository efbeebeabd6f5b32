//! Text chunking for the map-reduce summarizer.
//!
//! Splits a document into overlapping segments bounded by a maximum size,
//! measured in characters. Cuts prefer natural boundaries in this order:
//! paragraph break, sentence end, whitespace. When no boundary fits the
//! window the chunk is cut at exactly `max_size`.
//!
//! A text of `L` characters never yields more than
//! `ceil(L / (max_size - overlap))` chunks: a boundary is only taken when the
//! rest of the text still fits in the remaining chunk budget.

use crate::error::{BiblioError, Result};
use serde::Serialize;

/// A contiguous segment of the input text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Chunk {
    /// Position in the chunk sequence (0-based)
    pub index: usize,
    /// Character offset of the first character in the source text
    pub start: usize,
    /// Chunk content
    pub text: String,
}

impl Chunk {
    /// Character offset one past the last character.
    pub fn end(&self) -> usize {
        self.start + self.text.chars().count()
    }
}

/// Boundary classes, highest priority first.
#[derive(Debug, Clone, Copy)]
enum Boundary {
    Paragraph,
    Sentence,
    Whitespace,
}

impl Boundary {
    const PRIORITY: [Boundary; 3] = [Boundary::Paragraph, Boundary::Sentence, Boundary::Whitespace];

    /// True if a chunk may end right before `chars[end]`.
    fn ends_at(self, chars: &[char], end: usize) -> bool {
        match self {
            Boundary::Paragraph => end >= 2 && chars[end - 2] == '\n' && chars[end - 1] == '\n',
            Boundary::Sentence => {
                end >= 2
                    && chars[end - 1].is_whitespace()
                    && matches!(chars[end - 2], '.' | '!' | '?')
            }
            Boundary::Whitespace => end >= 1 && chars[end - 1].is_whitespace(),
        }
    }
}

/// Check that `max_size` and `overlap` allow forward progress.
pub fn validate_config(max_size: usize, overlap: usize) -> Result<()> {
    if max_size == 0 || overlap == 0 {
        return Err(BiblioError::InvalidConfiguration(format!(
            "chunk size and overlap must be positive (got size={}, overlap={})",
            max_size, overlap
        )));
    }
    if overlap >= max_size {
        return Err(BiblioError::InvalidConfiguration(format!(
            "chunk overlap ({}) must be smaller than chunk size ({})",
            overlap, max_size
        )));
    }
    Ok(())
}

/// Split `text` into overlapping chunks of at most `max_size` characters.
///
/// Consecutive chunks share at most `overlap` characters and every character
/// of `text` lands in at least one chunk. Empty text yields no chunks.
pub fn split(text: &str, max_size: usize, overlap: usize) -> Result<Vec<Chunk>> {
    validate_config(max_size, overlap)?;

    let chars: Vec<char> = text.chars().collect();
    let len = chars.len();
    let step = max_size - overlap;
    let budget = len.div_ceil(step);
    let mut chunks = Vec::new();
    let mut start = 0;

    while start < len {
        let window_end = (start + max_size).min(len);
        if window_end == len {
            chunks.push(make_chunk(&chars, chunks.len(), start, len));
            break;
        }

        // Shortest chunk a boundary may produce: longer than the overlap so
        // the cursor moves forward, at least half full, and leaving no more
        // text than the remaining chunks can hold with hard cuts.
        let remaining = budget.saturating_sub(chunks.len() + 1);
        let min_end = (start + (overlap + 1).max(max_size / 2))
            .max(len.saturating_sub(remaining * step));
        let end = find_boundary(&chars, min_end, window_end).unwrap_or(window_end);

        chunks.push(make_chunk(&chars, chunks.len(), start, end));
        start = end - overlap;
    }

    Ok(chunks)
}

/// Latest end position in `[min_end, window_end]` for the best boundary class present.
fn find_boundary(chars: &[char], min_end: usize, window_end: usize) -> Option<usize> {
    if min_end > window_end {
        return None;
    }
    Boundary::PRIORITY.iter().find_map(|boundary| {
        (min_end..=window_end)
            .rev()
            .find(|&end| boundary.ends_at(chars, end))
    })
}

fn make_chunk(chars: &[char], index: usize, start: usize, end: usize) -> Chunk {
    Chunk {
        index,
        start,
        text: chars[start..end].iter().collect(),
    }
}

//! Greedy word-wrap against a pixel-width budget.
//!
//! Measurement is a capability the caller provides; this module never touches
//! fonts or pixels itself.

use std::collections::VecDeque;

/// Marker appended as a final chunk when words are left over at capacity.
pub const ELLIPSIS: &str = "...";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FontKind {
    Lyric,
    Title,
}

/// Pixel width a string would occupy in the given font.
pub trait TextMeasure: Send + Sync {
    fn width(&self, font: FontKind, text: &str) -> u32;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Wrapped {
    pub chunks: Vec<String>,
    /// False once the chunk budget overflowed; used to gate the window
    /// extendability flags, since a full canvas cannot show more context.
    pub has_more_space: bool,
}

/// Accumulate words into chunks while the measured candidate stays under
/// `width_budget`.
///
/// Notes:
/// - A word carrying a trailing `\n` (the line-break marker produced by
///   joining excerpt lines with `"\n "`) force-closes its chunk.
/// - A single word that alone exceeds the budget still gets its own chunk;
///   words are never dropped or split mid-word.
/// - At `max_chunks` with words left over, a literal `...` chunk is appended
///   and `has_more_space` turns false.
pub fn wrap(
    text: &str,
    measure: &dyn TextMeasure,
    font: FontKind,
    width_budget: u32,
    max_chunks: usize,
) -> Wrapped {
    let mut words: VecDeque<&str> = text.trim().split(' ').collect();
    let mut chunks: Vec<String> = Vec::new();
    let mut has_more_space = true;

    while !words.is_empty() && chunks.len() < max_chunks {
        let mut chunk = String::new();
        while let Some(&next) = words.front() {
            let (word, forced_break) = match next.strip_suffix('\n') {
                Some(stripped) => (stripped, true),
                None => (next, false),
            };
            let candidate = if chunk.is_empty() {
                word.to_string()
            } else {
                format!("{chunk} {word}")
            };
            if !chunk.is_empty() && measure.width(font, &candidate) >= width_budget {
                break;
            }
            words.pop_front();
            chunk = candidate;
            if forced_break {
                break;
            }
        }
        chunks.push(chunk);

        if chunks.len() == max_chunks && !words.is_empty() {
            has_more_space = false;
            chunks.push(ELLIPSIS.to_string());
        }
    }

    Wrapped {
        chunks,
        has_more_space,
    }
}

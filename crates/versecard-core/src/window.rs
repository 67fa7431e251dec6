//! Context window selection around a matched line.
//!
//! Bounds are kept signed and unclamped so extendability checks see where the
//! user's offsets actually point; clamping happens only when slicing.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub start: i64,
    pub end: i64,
}

impl Window {
    /// `[match - before, match + 1 + after)`.
    pub fn around(match_index: usize, before: u32, after: u32) -> Self {
        let i = match_index as i64;
        Self {
            start: i - i64::from(before),
            end: i + 1 + i64::from(after),
        }
    }

    /// Slice `items` by the clamped bounds. Never reads out of range, even
    /// when the raw bounds are negative or past the end.
    pub fn slice<'a, T>(&self, items: &'a [T]) -> &'a [T] {
        let len = items.len() as i64;
        let start = self.start.clamp(0, len);
        let end = self.end.clamp(start, len);
        &items[start as usize..end as usize]
    }

    /// More unseen lines exist before the window.
    pub fn can_extend_before(&self) -> bool {
        self.start > 0
    }

    /// More unseen lines exist after the window.
    pub fn can_extend_after(&self, line_count: usize) -> bool {
        self.end < line_count as i64
    }
}

use serde::{Deserialize, Serialize};

/// A `[start, end)` span of canonical text, counted in Unicode scalar values.
///
/// Ranges are produced by the offset mapper and never adjusted afterwards.
/// `start <= end` holds for every constructed value; whether the range fits a
/// particular text is checked with [`TextRange::fits`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TextRange {
    pub start: usize,
    pub end: usize,
}

impl TextRange {
    /// Returns `None` when `start > end`.
    pub fn new(start: usize, end: usize) -> Option<Self> {
        (start <= end).then_some(Self { start, end })
    }

    /// Build a range from two boundary offsets in either order.
    pub fn spanning(a: usize, b: usize) -> Self {
        Self {
            start: a.min(b),
            end: a.max(b),
        }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// `0 <= start <= end <= char_len(text)`.
    pub fn fits(&self, text: &str) -> bool {
        self.start <= self.end && self.end <= char_len(text)
    }

    /// The canonical slice this range addresses, or `None` if it doesn't fit.
    pub fn slice<'t>(&self, text: &'t str) -> Option<&'t str> {
        if self.start > self.end {
            return None;
        }
        let from = byte_offset(text, self.start)?;
        let to = byte_offset(text, self.end)?;
        Some(&text[from..to])
    }
}

/// Length of `text` in the unit offsets are measured in.
pub fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// Byte index of the `chars`-th scalar value; `Some(text.len())` at the end.
pub fn byte_offset(text: &str, chars: usize) -> Option<usize> {
    if chars == 0 {
        return Some(0);
    }
    match text.char_indices().nth(chars) {
        Some((idx, _)) => Some(idx),
        None if char_len(text) == chars => Some(text.len()),
        None => None,
    }
}

//! Half-open intervals over the document in UTF-16 code units.

use std::fmt;
use std::ops::Range;

use super::edit::Edit;

/// A half-open interval `[start, start + len)`.
///
/// Ordering is by `start`, then `len`, which makes spans usable as sorted
/// map keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Span {
    pub start: usize,
    pub len: usize,
}

impl Span {
    pub const fn new(start: usize, len: usize) -> Self {
        Self { start, len }
    }

    /// Build a span from its bounds. An inverted pair yields an empty span at `start`.
    pub fn between(start: usize, end: usize) -> Self {
        Self {
            start,
            len: end.saturating_sub(start),
        }
    }

    /// Empty span at `offset`
    pub const fn point(offset: usize) -> Self {
        Self {
            start: offset,
            len: 0,
        }
    }

    pub const fn end(&self) -> usize {
        self.start + self.len
    }

    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn range(&self) -> Range<usize> {
        self.start..self.end()
    }

    pub fn contains_offset(&self, offset: usize) -> bool {
        self.start <= offset && offset < self.end()
    }

    /// True if `other` lies entirely within this span.
    pub fn contains(&self, other: &Span) -> bool {
        self.start <= other.start && other.end() <= self.end()
    }

    /// Half-open overlap test. Empty spans intersect nothing.
    pub fn intersects(&self, other: &Span) -> bool {
        !self.is_empty()
            && !other.is_empty()
            && self.start < other.end()
            && other.start < self.end()
    }

    /// Closed-interval test: overlapping or sharing a boundary.
    ///
    /// Edits use this to decide which runs they disturb, since inserting at
    /// the edge of a run can change how that run tokenizes.
    pub fn touches(&self, other: &Span) -> bool {
        self.start <= other.end() && other.start <= self.end()
    }

    pub fn intersection(&self, other: &Span) -> Option<Span> {
        if !self.intersects(other) {
            return None;
        }
        Some(Span::between(
            self.start.max(other.start),
            self.end().min(other.end()),
        ))
    }

    /// Smallest span covering both.
    pub fn union(&self, other: &Span) -> Span {
        Span::between(self.start.min(other.start), self.end().max(other.end()))
    }

    /// Clip to `[0, length)`, dropping the span if nothing remains.
    pub fn clamp_to(&self, length: usize) -> Option<Span> {
        let span = Span::between(self.start.min(length), self.end().min(length));
        (!span.is_empty()).then_some(span)
    }

    /// Map this span through an edit.
    ///
    /// - ends at or before the edit start: unchanged
    /// - starts at or after the edit end: translated by `delta`
    /// - overlaps the edit: extended to cover the edited range, then resized
    ///   by `delta`
    ///
    /// Returns `None` when a non-empty span collapses to nothing.
    pub fn shifted(&self, edit: &Edit) -> Option<Span> {
        let edit_start = edit.range.start;
        let edit_end = edit.range.end();

        let shifted = if self.end() <= edit_start {
            *self
        } else if self.start >= edit_end {
            Span::new(self.start.saturating_add_signed(edit.delta), self.len)
        } else {
            let covered = self.union(&edit.range);
            Span::between(
                covered.start,
                covered.end().saturating_add_signed(edit.delta),
            )
        };

        (!shifted.is_empty() || self.is_empty()).then_some(shifted)
    }

    /// Split into consecutive pieces of at most `max_len` units.
    pub fn chunks(&self, max_len: usize) -> impl Iterator<Item = Span> + use<> {
        let max_len = max_len.max(1);
        let end = self.end();
        let mut cursor = self.start;
        std::iter::from_fn(move || {
            if cursor >= end {
                return None;
            }
            let piece = Span::between(cursor, (cursor + max_len).min(end));
            cursor = piece.end();
            Some(piece)
        })
    }
}

impl From<Range<usize>> for Span {
    fn from(range: Range<usize>) -> Self {
        Span::between(range.start, range.end)
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end())
    }
}

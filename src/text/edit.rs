use super::span::Span;

/// A single content mutation.
///
/// `range` is the span that was replaced, in coordinates from *before* the
/// edit; `delta` is the net change in length. For the text `"abc"`:
///
/// - inserting `"d"` at the end: `range = 3..3`, `delta = 1`
/// - deleting the middle `"b"`: `range = 1..2`, `delta = -1`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Edit {
    pub range: Span,
    pub delta: isize,
}

impl Edit {
    /// Create an edit. A `delta` that would remove more than `range` covers
    /// is clamped so the replacement length never goes negative.
    pub fn new(range: Span, delta: isize) -> Self {
        let min_delta = -(range.len as isize);
        Self {
            range,
            delta: delta.max(min_delta),
        }
    }

    pub fn insertion(at: usize, len: usize) -> Self {
        Self::new(Span::point(at), len as isize)
    }

    pub fn deletion(range: Span) -> Self {
        Self::new(range, -(range.len as isize))
    }

    pub fn replacement(range: Span, new_len: usize) -> Self {
        Self::new(range, new_len as isize - range.len as isize)
    }

    /// Length of the text that replaced `range`.
    pub fn inserted_len(&self) -> usize {
        self.range.len.saturating_add_signed(self.delta)
    }

    /// Where the replacement text sits after the edit.
    pub fn post_edit_range(&self) -> Span {
        Span::new(self.range.start, self.inserted_len())
    }

    /// Clip the edit to a document of `length` units.
    ///
    /// Hosts occasionally report a range running past the end; the part
    /// beyond the document cannot have held anything, so it is dropped and
    /// the replacement length is preserved.
    pub fn clamped(&self, length: usize) -> Edit {
        let start = self.range.start.min(length);
        let end = self.range.end().min(length);
        Edit::replacement(Span::between(start, end), self.inserted_len())
    }
}

/// Adjust a sorted list of spans for an edit.
///
/// Spans wholly before the edit stay, spans after it move by `delta`, and
/// spans overlapping it are stretched over the edited text. Collapsed spans
/// are removed.
pub fn shift_spans(spans: &mut Vec<Span>, edit: &Edit) {
    let mut i = 0;
    while i < spans.len() {
        match spans[i].shifted(edit) {
            Some(shifted) => {
                spans[i] = shifted;
                i += 1;
            }
            None => {
                spans.remove(i);
            }
        }
    }
}
